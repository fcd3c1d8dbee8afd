#![forbid(unsafe_code)]

//! The remote store, as seen by the comment engine.
//!
//! [`CommentBackend`] is the only seam to the network. Implementations own
//! transport, authentication, and response-shape sniffing; they hand back
//! typed receipts so the controllers never inspect raw payloads. Calls are
//! blocking; the runtime moves them off the update loop.
//!
//! Posts, reels, and startups route to different endpoint families but share
//! the same operation shapes, so the engine is parameterized over
//! [`ContentKind`] and nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::comment::{Comment, CommentId};
use crate::error::BackendError;

/// Which family of endpoints a thread talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Reel,
    Startup,
}

/// Path templates for one endpoint family. `{id}` is replaced by the
/// content id, `{comment}` by a comment id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointFamily {
    pub roots: &'static str,
    pub replies: &'static str,
    pub create: &'static str,
    pub delete_primary: &'static str,
    pub delete_fallback: &'static str,
}

impl ContentKind {
    /// Endpoint templates for this kind.
    #[must_use]
    pub fn routes(self) -> EndpointFamily {
        match self {
            Self::Post => EndpointFamily {
                roots: "/posts/{id}/comments",
                replies: "/posts/{id}/comments/{comment}/replies",
                create: "/posts/{id}/comments",
                delete_primary: "/posts/{id}/comments/{comment}",
                delete_fallback: "/comments/{comment}",
            },
            Self::Reel => EndpointFamily {
                roots: "/reels/{id}/comments",
                replies: "/reels/{id}/comments/{comment}/replies",
                create: "/reels/{id}/comments",
                delete_primary: "/reels/{id}/comments/{comment}",
                delete_fallback: "/reels/comments/{comment}",
            },
            Self::Startup => EndpointFamily {
                roots: "/startups/{id}/comments",
                replies: "/startups/{id}/comments/{comment}/replies",
                create: "/startups/{id}/comments",
                delete_primary: "/startups/{id}/comments/{comment}",
                delete_fallback: "/startups/comments/{comment}",
            },
        }
    }
}

impl EndpointFamily {
    /// Fill a template with a content id and optional comment id.
    #[must_use]
    pub fn resolve(template: &str, content_id: &str, comment: Option<&CommentId>) -> String {
        let path = template.replace("{id}", content_id);
        match comment {
            Some(c) => path.replace("{comment}", c.as_str()),
            None => path,
        }
    }
}

/// The piece of content a thread belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub kind: ContentKind,
    pub id: String,
}

impl Target {
    #[must_use]
    pub fn new(kind: ContentKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.id)
    }
}

/// Which delete endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteRoute {
    Primary,
    Fallback,
}

/// Successful create. `comment` is `None` when the server answered with a
/// bare acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReceipt {
    pub comment: Option<Comment>,
    /// New total comment count, when the server reports one.
    pub aggregate_count: Option<u64>,
}

/// Successful delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReceipt {
    /// New total comment count, when the server reports one.
    pub aggregate_count: Option<u64>,
}

/// Remote comment store.
pub trait CommentBackend: Send + Sync {
    /// Root comments for `target`, newest first.
    fn fetch_roots(&self, target: &Target) -> Result<Vec<Comment>, BackendError>;

    /// The complete reply list of one root comment, oldest first.
    fn fetch_replies(&self, target: &Target, parent: &CommentId) -> Result<Vec<Comment>, BackendError>;

    /// Create a root comment, or a reply when `parent` is set.
    fn create_comment(
        &self,
        target: &Target,
        text: &str,
        parent: Option<&CommentId>,
    ) -> Result<CreateReceipt, BackendError>;

    /// Delete one comment through the given route.
    fn delete_comment(
        &self,
        target: &Target,
        id: &CommentId,
        route: DeleteRoute,
    ) -> Result<DeleteReceipt, BackendError>;

    /// Id of the signed-in user, if any.
    fn current_user_id(&self) -> Result<Option<String>, BackendError>;
}

/// Delete through the primary route, then exactly once through the fallback
/// route if the primary failed.
pub fn delete_with_fallback(
    backend: &dyn CommentBackend,
    target: &Target,
    id: &CommentId,
) -> Result<DeleteReceipt, BackendError> {
    match backend.delete_comment(target, id, DeleteRoute::Primary) {
        Ok(receipt) => Ok(receipt),
        Err(err) => {
            tracing::debug!(comment_id = %id, error = %err, "primary delete failed, trying fallback");
            backend.delete_comment(target, id, DeleteRoute::Fallback)
        }
    }
}
