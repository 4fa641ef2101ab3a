//! Ordered feed of timestamped posts.
//!
//! Posts are kept most-recent-first. Every mutation takes the write side of a
//! [`BoundedRwLock`]; lookups and snapshots take the read side, so up to the lock's
//! reader capacity can scan concurrently.

use serde::{Deserialize, Serialize};

use crate::rwlock::{BoundedRwLock, DEFAULT_READER_CAPACITY};

/// A single post. Timestamps are unique within a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Post text.
    pub body: String,
    /// Unix timestamp of the post.
    pub timestamp: f64,
}

/// Concurrent feed sorted by descending timestamp.
#[derive(Debug)]
pub struct Feed {
    posts: BoundedRwLock<Vec<Post>>,
}

#[allow(clippy::float_cmp)]
fn same_instant(a: f64, b: f64) -> bool {
    a == b
}

impl Feed {
    /// Create an empty feed whose lock admits the default number of readers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_reader_capacity(DEFAULT_READER_CAPACITY)
    }

    /// Create an empty feed whose lock admits up to `capacity` concurrent readers.
    #[must_use]
    pub fn with_reader_capacity(capacity: usize) -> Self {
        Self {
            posts: BoundedRwLock::with_capacity(Vec::new(), capacity),
        }
    }

    /// Insert a post, keeping the feed ordered. The post lands before the first post
    /// whose timestamp is not greater than `timestamp`.
    ///
    /// Inserting a duplicate timestamp is a caller error; the relative order of the
    /// duplicates is unspecified.
    pub fn add(&self, body: impl Into<String>, timestamp: f64) {
        let post = Post {
            body: body.into(),
            timestamp,
        };
        let mut posts = self.posts.write();
        let at = posts
            .iter()
            .position(|p| p.timestamp <= timestamp)
            .unwrap_or(posts.len());
        posts.insert(at, post);
    }

    /// Remove the post with the given timestamp. Returns whether one was removed.
    pub fn remove(&self, timestamp: f64) -> bool {
        let mut posts = self.posts.write();
        match posts.iter().position(|p| same_instant(p.timestamp, timestamp)) {
            Some(at) => {
                posts.remove(at);
                true
            }
            None => false,
        }
    }

    /// Whether a post with the given timestamp exists.
    #[must_use]
    pub fn contains(&self, timestamp: f64) -> bool {
        self.posts
            .read()
            .iter()
            .any(|p| same_instant(p.timestamp, timestamp))
    }

    /// Copy of every post, most recent first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Post> {
        self.posts.read().clone()
    }

    /// Number of posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    /// Whether the feed has no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}
