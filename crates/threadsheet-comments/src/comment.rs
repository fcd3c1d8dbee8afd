#![forbid(unsafe_code)]

//! Comments and their canonical identity.
//!
//! Servers are inconsistent about which id field they fill in, so identity is
//! resolved in exactly one place, [`Comment::key`]:
//!
//! 1. the primary id (`_id`) if present and non-empty,
//! 2. else the secondary id (`id`) if present and non-empty,
//! 3. else the creation timestamp, as `ts:<millis>`.
//!
//! Resolution is total and depends only on those three fields, so an
//! unmodified comment keeps its key across every re-projection.

use std::fmt;

/// Resolved identity of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(String);

impl CommentId {
    /// Wrap a raw id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CommentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who wrote a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    /// Account id; compared against the current user to gate deletes.
    pub id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Author {
    /// An author known only by id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name to show: username, then display name, then `"unknown"`.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.display_name.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("unknown")
    }
}

/// A single comment or reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    /// Primary server id (`_id`).
    pub primary_id: Option<String>,
    /// Secondary server id (`id`).
    pub secondary_id: Option<String>,
    pub author: Author,
    pub text: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: i64,
    /// Username a reply addresses, shown as `@name`.
    pub reply_to_username: Option<String>,
    /// Server-reported number of replies, if any.
    pub reply_count: Option<u32>,
}

impl Comment {
    /// A comment with a primary id.
    #[must_use]
    pub fn new(id: impl Into<String>, author: Author, text: impl Into<String>, created_at_ms: i64) -> Self {
        Self {
            primary_id: Some(id.into()),
            author,
            text: text.into(),
            created_at_ms,
            ..Self::default()
        }
    }

    /// Locally synthesized stand-in for a created comment whose response
    /// carried no usable body.
    #[must_use]
    pub fn stub(text: impl Into<String>, created_at_ms: i64) -> Self {
        Self {
            text: text.into(),
            created_at_ms,
            ..Self::default()
        }
    }

    /// Canonical identity.
    #[must_use]
    pub fn key(&self) -> CommentId {
        let non_empty = |id: &Option<String>| id.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        non_empty(&self.primary_id)
            .or_else(|| non_empty(&self.secondary_id))
            .map(CommentId)
            .unwrap_or_else(|| CommentId(format!("ts:{}", self.created_at_ms)))
    }

    /// Whether `user_id` wrote this comment.
    #[must_use]
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.author.id == user_id
    }
}
