#![forbid(unsafe_code)]

//! Reply loader: lazy, deduplicated fetching of reply buckets.
//!
//! Loading is split in two so the caller decides where the network call
//! runs: [`CommentThread::load_replies`] claims the parent and hands back a
//! [`ReplyFetch`] ticket; [`CommentThread::finish_reply_load`] applies the
//! result. While a ticket is outstanding, further requests for the same
//! parent are ignored. Different parents load independently and may finish
//! in any order.
//!
//! Buckets are fetched whole; there is no pagination.

use crate::comment::{Comment, CommentId};
use crate::error::{BackendError, Skip};
use crate::thread::CommentThread;

/// A claimed reply fetch. Must be passed back to
/// [`CommentThread::finish_reply_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ReplyFetch {
    pub parent: CommentId,
}

/// What a tap on "view replies" / "hide replies" did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The bucket was hidden; its cache is kept.
    Collapsed,
    /// A cached bucket was shown without fetching.
    Expanded,
    /// A fetch must be issued.
    Fetch(ReplyFetch),
    /// Nothing happened.
    Skipped(Skip),
}

impl CommentThread {
    /// Show or hide the replies of `parent`.
    pub fn toggle_replies(&mut self, parent: &CommentId) -> ToggleOutcome {
        if self.expanded.remove(parent) {
            self.bump();
            return ToggleOutcome::Collapsed;
        }
        if self.reply_buckets.contains_key(parent) {
            self.expanded.insert(parent.clone());
            self.bump();
            return ToggleOutcome::Expanded;
        }
        match self.load_replies(parent) {
            Ok(fetch) => ToggleOutcome::Fetch(fetch),
            Err(skip) => ToggleOutcome::Skipped(skip),
        }
    }

    /// Claim a reply fetch for `parent`.
    pub fn load_replies(&mut self, parent: &CommentId) -> Result<ReplyFetch, Skip> {
        if self.loading_replies.contains(parent) {
            tracing::debug!(parent_id = %parent, "reply load already pending");
            return Err(Skip::AlreadyLoading);
        }
        if !self.roots().iter().any(|c| &c.key() == parent) {
            return Err(Skip::UnknownComment);
        }
        self.loading_replies.insert(parent.clone());
        self.bump();
        Ok(ReplyFetch {
            parent: parent.clone(),
        })
    }

    /// Apply the result of a claimed fetch. Returns `true` if the bucket was
    /// stored and expanded.
    ///
    /// On failure nothing but the loading flag changes, so the affordance
    /// stays retryable.
    pub fn finish_reply_load(
        &mut self,
        fetch: ReplyFetch,
        result: Result<Vec<Comment>, BackendError>,
    ) -> bool {
        let ReplyFetch { parent } = fetch;
        if !self.loading_replies.remove(&parent) {
            return false;
        }
        self.bump();
        let replies = match result {
            Ok(replies) => replies,
            Err(err) => {
                tracing::warn!(parent_id = %parent, error = %err, "reply load failed");
                return false;
            }
        };
        if !self.roots().iter().any(|c| c.key() == parent) {
            tracing::debug!(parent_id = %parent, "replies arrived for a removed comment");
            return false;
        }
        tracing::debug!(parent_id = %parent, count = replies.len(), "replies loaded");
        self.reply_buckets.insert(parent.clone(), replies);
        self.expanded.insert(parent);
        true
    }
}
