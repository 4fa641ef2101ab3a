//! # Feed Dispatch
//!
//! A concurrent feed engine driven by a stream of JSON commands.
//!
//! Clients submit `ADD`, `REMOVE`, `CONTAINS` and `FEED` requests against a single
//! feed of posts kept in descending timestamp order, and terminate the stream with
//! `DONE`. Every request except `DONE` is answered with one JSON line.
//!
//! ## Building Blocks
//!
//! - **[`WorkQueue`]**: lock-free multi-producer/multi-consumer FIFO. Once closed it
//!   reports `DONE` to every consumer, forever.
//! - **[`BoundedRwLock`]**: reader-writer lock admitting at most a fixed number of
//!   concurrent readers (32 by default) or one writer.
//! - **[`Feed`]**: the ordered post list, guarded by a [`BoundedRwLock`].
//! - **[`Semaphore`]**: counting semaphore on the same mutex/condvar primitives.
//! - **[`Engine`]**: runs a command stream in direct mode (one thread) or pooled mode
//!   (one producer, N consumers, one response writer).
//!
//! ## Running the Engine
//!
//! ```
//! use feed_dispatch::{Engine, EngineConfig};
//!
//! let input = br#"{"command":"ADD","id":1,"timestamp":10,"body":"hello"}
//! {"command":"CONTAINS","id":2,"timestamp":10}
//! {"command":"DONE"}"#;
//!
//! let mut output = Vec::new();
//! let engine = Engine::new(EngineConfig::new())?;
//! let report = engine.run(&input[..], &mut output)?;
//!
//! assert_eq!(report.responses, 2);
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "{\"success\":true,\"id\":1}\n{\"success\":true,\"id\":2}\n",
//! );
//! # Ok::<(), feed_dispatch::EngineError>(())
//! ```
//!
//! The `feed_dispatch` binary wraps the same engine around stdin and stdout; see
//! [`config::EngineConfig::from_env`] for the variables it reads.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Engine configuration: execution mode, lock capacity and thread sizing.
pub mod config;
/// Work queue, feed, dispatch and the engine itself.
pub mod core;
/// JSON request/response records and their stream codec.
pub mod protocol;
/// Reader-writer lock with a cap on concurrent readers.
pub mod rwlock;
/// Counting semaphore.
pub mod semaphore;
/// Shared utilities.
pub mod util;

pub use crate::config::{EngineConfig, ExecutionMode};
pub use crate::core::{
    apply, AppResult, Dequeued, Engine, EngineError, Feed, Post, RequestCounts, RunReport,
    WorkQueue,
};
pub use crate::protocol::{Request, RequestId, Response};
pub use crate::rwlock::{
    BoundedReadGuard, BoundedRwLock, BoundedWriteGuard, DEFAULT_READER_CAPACITY,
};
pub use crate::semaphore::Semaphore;
pub use crate::util::init_tracing;
