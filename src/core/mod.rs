//! Core engine: work queue, ordered feed, dispatch and errors.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod feed;
pub mod queue;

pub use dispatch::{apply, RequestCounts, RunReport};
pub use engine::Engine;
pub use error::{AppResult, EngineError};
pub use feed::{Feed, Post};
pub use queue::{Dequeued, WorkQueue};
