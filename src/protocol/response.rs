//! Response records written to the output stream.

use serde::{Deserialize, Serialize};

use crate::core::feed::Post;

use super::RequestId;

/// Outcome of a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Result of `ADD`, `REMOVE` or `CONTAINS`.
    Ack {
        /// Whether the operation succeeded or the post was found.
        success: bool,
        /// Identifier of the originating request.
        id: RequestId,
    },
    /// Result of `FEED`.
    Feed {
        /// Identifier of the originating request.
        id: RequestId,
        /// Posts ordered most recent first.
        feed: Vec<Post>,
    },
}

impl Response {
    /// Identifier of the originating request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        match self {
            Self::Ack { id, .. } | Self::Feed { id, .. } => *id,
        }
    }
}
