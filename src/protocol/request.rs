//! Request records decoded from the input stream.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client-chosen identifier echoed back in the response.
pub type RequestId = i64;

/// A command applied to the feed.
///
/// Records are discriminated by their `command` field; unknown extra fields are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "UPPERCASE")]
pub enum Request {
    /// Insert a post.
    Add {
        /// Request identifier.
        id: RequestId,
        /// Post timestamp; unique within the feed.
        timestamp: f64,
        /// Post text.
        body: String,
    },
    /// Remove the post with the given timestamp.
    Remove {
        /// Request identifier.
        id: RequestId,
        /// Timestamp of the post to remove.
        timestamp: f64,
    },
    /// Check whether a post with the given timestamp exists.
    Contains {
        /// Request identifier.
        id: RequestId,
        /// Timestamp to look up.
        timestamp: f64,
    },
    /// Return every post, most recent first.
    Feed {
        /// Request identifier.
        id: RequestId,
    },
    /// End of the command stream.
    Done,
}

/// Discriminant of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `ADD`
    Add,
    /// `REMOVE`
    Remove,
    /// `CONTAINS`
    Contains,
    /// `FEED`
    Feed,
    /// `DONE`
    Done,
}

impl RequestKind {
    /// All kinds in wire order.
    pub const ALL: [Self; 5] = [Self::Add, Self::Remove, Self::Contains, Self::Feed, Self::Done];

    /// Wire name of the command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Contains => "CONTAINS",
            Self::Feed => "FEED",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Request {
    /// The command tag of this request.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Add { .. } => RequestKind::Add,
            Self::Remove { .. } => RequestKind::Remove,
            Self::Contains { .. } => RequestKind::Contains,
            Self::Feed { .. } => RequestKind::Feed,
            Self::Done => RequestKind::Done,
        }
    }

    /// The request identifier, absent for `DONE`.
    #[must_use]
    pub const fn id(&self) -> Option<RequestId> {
        match self {
            Self::Add { id, .. }
            | Self::Remove { id, .. }
            | Self::Contains { id, .. }
            | Self::Feed { id } => Some(*id),
            Self::Done => None,
        }
    }

    /// Whether this is the terminal `DONE` request.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}
