//! Lock-free multi-producer/multi-consumer work queue.
//!
//! A linked list of reference-counted nodes whose `head`, `tail` and `next` links are
//! swapped with compare-and-swap (Michael-Scott queue). The head always points at a
//! dummy node; the live requests are its successors.
//!
//! Shutdown is a persistent terminal node: once a `DONE` request has been dequeued it
//! becomes the dummy head and is never removed, so every later [`WorkQueue::dequeue`]
//! from any consumer returns [`Dequeued::Done`].
//!
//! Nodes are reclaimed by `Arc` reference counting: a node is only freed once no
//! thread holds a snapshot of it, which rules out ABA on the CAS links. No `unsafe`
//! is involved.

use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::protocol::Request;

struct Node {
    payload: ArcSwapOption<Request>,
    terminal: bool,
    next: ArcSwapOption<Self>,
}

impl Node {
    fn dummy() -> Self {
        Self {
            payload: ArcSwapOption::empty(),
            terminal: false,
            next: ArcSwapOption::empty(),
        }
    }

    fn holding(request: Request) -> Self {
        let terminal = request.is_done();
        let payload = if terminal { None } else { Some(Arc::new(request)) };
        Self {
            payload: ArcSwapOption::new(payload),
            terminal,
            next: ArcSwapOption::empty(),
        }
    }

    /// Moves the request out. Only the thread that swung `head` onto this node calls
    /// it, so the payload is present exactly once.
    fn take_payload(&self) -> Option<Request> {
        self.payload
            .swap(None)
            .map(|shared| Arc::try_unwrap(shared).unwrap_or_else(|shared| Request::clone(&shared)))
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Unlink successors iteratively: a thread that held an old head for a while
        // keeps the whole dequeued chain alive, and dropping it recursively could
        // exhaust the stack.
        let mut next = self.next.swap(None);
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(owned) => next = owned.next.swap(None),
                Err(_) => break,
            }
        }
    }
}

/// Result of a non-blocking [`WorkQueue::dequeue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dequeued {
    /// The oldest pending request.
    Work(Request),
    /// Nothing to do yet; the caller should wait for a signal.
    Empty,
    /// The stream has terminated.
    Done,
}

/// Unbounded lock-free FIFO of [`Request`]s.
pub struct WorkQueue {
    head: ArcSwap<Node>,
    tail: ArcSwap<Node>,
}

impl WorkQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let dummy = Arc::new(Node::dummy());
        Self {
            head: ArcSwap::new(Arc::clone(&dummy)),
            tail: ArcSwap::new(dummy),
        }
    }

    /// Append a request at the tail. Never blocks and always succeeds.
    pub fn enqueue(&self, request: Request) {
        let node = Arc::new(Node::holding(request));
        let unlinked: Option<Arc<Node>> = None;
        loop {
            let tail = self.tail.load_full();
            if let Some(next) = tail.next.load_full() {
                // Tail lags behind the last linked node: swing it forward and retry.
                let _ = self.tail.compare_and_swap(&tail, next);
                continue;
            }
            let prev = tail.next.compare_and_swap(&unlinked, Some(Arc::clone(&node)));
            if prev.is_none() {
                // Best effort; a failed swing is repaired by the next enqueue or dequeue.
                let _ = self.tail.compare_and_swap(&tail, node);
                return;
            }
        }
    }

    /// Append the terminal `DONE` marker.
    pub fn close(&self) {
        self.enqueue(Request::Done);
    }

    /// Remove the oldest request without blocking.
    ///
    /// Returns [`Dequeued::Empty`] when nothing is queued yet, and [`Dequeued::Done`]
    /// once the terminal marker is reached. The terminal marker is never removed.
    pub fn dequeue(&self) -> Dequeued {
        loop {
            let head = self.head.load_full();
            if head.terminal {
                return Dequeued::Done;
            }
            let Some(next) = head.next.load_full() else {
                return Dequeued::Empty;
            };

            let tail = self.tail.load_full();
            if Arc::ptr_eq(&head, &tail) {
                // Head must never overtake tail.
                let _ = self.tail.compare_and_swap(&tail, Arc::clone(&next));
                continue;
            }

            let prev = self.head.compare_and_swap(&head, Arc::clone(&next));
            if !Arc::ptr_eq(&prev, &head) {
                continue;
            }
            if next.terminal {
                return Dequeued::Done;
            }
            if let Some(request) = next.take_payload() {
                return Dequeued::Work(request);
            }
        }
    }

    /// Whether a dequeue right now would return [`Dequeued::Empty`].
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let head = self.head.load();
        !head.terminal && head.next.load().is_none()
    }

    /// Whether the terminal marker has become the head.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.head.load().terminal
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("idle", &self.is_idle())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
