//! Request dispatch in direct (single thread) or pooled (producer + consumers) mode.
//!
//! Both modes share [`apply`], which executes one request against the feed and
//! builds its response. Pooled mode additionally needs a way to park idle consumers:
//! [`WorkSignal`] pairs a `parking_lot` mutex with a condition variable, and every
//! consumer re-checks the queue under that mutex before sleeping so a wake issued
//! between a failed dequeue and the wait is never lost.
//!
//! # Ordering
//!
//! The producer enqueues requests in input order. With more than one consumer the
//! order in which responses are *written* is not guaranteed to match the input
//! order: consumers race for work and the first to finish answers first.

mod direct;
mod pooled;

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::config::ExecutionMode;
use crate::core::feed::Feed;
use crate::core::queue::WorkQueue;
use crate::protocol::{Request, RequestKind, Response};

pub(crate) use direct::run_direct;
pub(crate) use pooled::run_pooled;

/// Execute `request` against `feed`.
///
/// Returns the response to emit, or `None` for `DONE`, which has no response.
pub fn apply(feed: &Feed, request: Request) -> Option<Response> {
    match request {
        Request::Add { id, timestamp, body } => {
            feed.add(body, timestamp);
            Some(Response::Ack { success: true, id })
        }
        Request::Remove { id, timestamp } => Some(Response::Ack {
            success: feed.remove(timestamp),
            id,
        }),
        Request::Contains { id, timestamp } => Some(Response::Ack {
            success: feed.contains(timestamp),
            id,
        }),
        Request::Feed { id } => Some(Response::Feed {
            id,
            feed: feed.snapshot(),
        }),
        Request::Done => None,
    }
}

/// Per-kind request counts observed by one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    /// `ADD` requests.
    pub add: u64,
    /// `REMOVE` requests.
    pub remove: u64,
    /// `CONTAINS` requests.
    pub contains: u64,
    /// `FEED` requests.
    pub feed: u64,
    /// `DONE` requests.
    pub done: u64,
}

impl RequestCounts {
    /// Sum over every kind.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.add + self.remove + self.contains + self.feed + self.done
    }
}

/// Summary of a completed engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Unique id attached to every log line of the run.
    pub run_id: Uuid,
    /// Mode the run executed in.
    pub mode: ExecutionMode,
    /// Requests decoded from the input, by kind.
    pub requests: RequestCounts,
    /// Responses written to the output.
    pub responses: u64,
    /// Whether the input ended without an explicit `DONE`.
    pub implicit_done: bool,
}

/// What a mode-specific run hands back to the engine.
#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) requests: RequestCounts,
    pub(crate) responses: u64,
    pub(crate) implicit_done: bool,
}

/// Lock-free request counters shared by the producer side of a run.
#[derive(Debug, Default)]
pub(crate) struct RequestCounters {
    add: AtomicU64,
    remove: AtomicU64,
    contains: AtomicU64,
    feed: AtomicU64,
    done: AtomicU64,
}

impl RequestCounters {
    pub(crate) fn record(&self, kind: RequestKind) {
        let counter = match kind {
            RequestKind::Add => &self.add,
            RequestKind::Remove => &self.remove,
            RequestKind::Contains => &self.contains,
            RequestKind::Feed => &self.feed,
            RequestKind::Done => &self.done,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RequestCounts {
        RequestCounts {
            add: self.add.load(Ordering::Relaxed),
            remove: self.remove.load(Ordering::Relaxed),
            contains: self.contains.load(Ordering::Relaxed),
            feed: self.feed.load(Ordering::Relaxed),
            done: self.done.load(Ordering::Relaxed),
        }
    }
}

/// State guarded by the wake mutex.
#[derive(Debug, Default)]
struct WakeState {
    /// Consumers currently parked on the condvar.
    sleeping: usize,
}

/// Parks idle consumers until the producer publishes work or shuts down.
#[derive(Debug, Default)]
pub(crate) struct WorkSignal {
    state: Mutex<WakeState>,
    condvar: Condvar,
}

impl WorkSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Block while `queue` has nothing to hand out. Returns as soon as a dequeue
    /// would yield work or `DONE`; spurious wakes loop back into the wait.
    pub(crate) fn wait_for_work(&self, queue: &WorkQueue) {
        let mut state = self.state.lock();
        while queue.is_idle() {
            state.sleeping += 1;
            self.condvar.wait(&mut state);
            state.sleeping -= 1;
        }
    }

    /// Wake at most one parked consumer: one unit of work became available.
    pub(crate) fn notify_one(&self) {
        let state = self.state.lock();
        if state.sleeping > 0 {
            self.condvar.notify_one();
        }
    }

    /// Wake every parked consumer: the queue has been closed.
    pub(crate) fn notify_all(&self) {
        let _state = self.state.lock();
        self.condvar.notify_all();
    }

    #[cfg(test)]
    fn sleeping(&self) -> usize {
        self.state.lock().sleeping
    }
}
