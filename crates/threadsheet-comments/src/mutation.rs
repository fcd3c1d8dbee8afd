#![forbid(unsafe_code)]

//! Add and delete, committed only after the remote store confirms.
//!
//! Each mutation is split into a `begin_*` step that checks preconditions
//! and returns a request ticket, and a `finish_*` step that applies the
//! remote result. Nothing touches the comment lists before `finish_*` sees a
//! success, so a failure needs no rollback: the thread simply stays as it
//! was.
//!
//! Ordering is asymmetric on purpose. A new root comment is prepended
//! (roots are newest-first) while a new reply is appended (buckets are
//! oldest-first), matching how each endpoint orders its own lists.
//!
//! Deleting takes two steps from the user: a long-press arms the delete for
//! one comment the user wrote ([`MutationController::arm_delete`]), and a
//! second action confirms it ([`MutationController::begin_delete`]).

use crate::backend::{CreateReceipt, DeleteReceipt};
use crate::comment::{Comment, CommentId};
use crate::error::{BackendError, Skip};
use crate::thread::CommentThread;

/// How the host's total comment count should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountChange {
    /// The server reported the new total.
    Set(u64),
    Increment,
    /// Decrement, never below zero.
    Decrement,
}

impl CountChange {
    /// Apply to a current count.
    #[must_use]
    pub fn apply(self, count: u64) -> u64 {
        match self {
            Self::Set(n) => n,
            Self::Increment => count.saturating_add(1),
            Self::Decrement => count.saturating_sub(1),
        }
    }
}

/// An add that passed its preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CreateRequest {
    /// Trimmed text.
    pub text: String,
    /// Root to file the reply under; `None` for a root comment.
    pub parent: Option<CommentId>,
    /// Username the reply addresses.
    pub reply_to_username: Option<String>,
}

/// A delete that passed its preconditions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DeleteRequest {
    pub id: CommentId,
}

/// Compose state and mutation guards for one thread.
#[derive(Debug, Clone, Default)]
pub struct MutationController {
    compose: String,
    submitting: bool,
    armed_delete: Option<CommentId>,
    current_user: Option<String>,
}

impl MutationController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text in the compose bar.
    #[must_use]
    pub fn compose_text(&self) -> &str {
        &self.compose
    }

    pub fn set_compose_text(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    /// Whether an add is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Comment a long-press armed for deletion.
    #[must_use]
    pub fn armed_delete(&self) -> Option<&CommentId> {
        self.armed_delete.as_ref()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    /// Record the signed-in user; gates delete arming.
    pub fn set_current_user(&mut self, user_id: Option<String>) {
        self.current_user = user_id.filter(|id| !id.is_empty());
    }

    /// Whether the current user may delete `comment`.
    #[must_use]
    pub fn can_delete(&self, comment: &Comment) -> bool {
        self.current_user
            .as_deref()
            .is_some_and(|user| comment.is_authored_by(user))
    }

    /// Reply to `key`, threading under its root.
    pub fn begin_reply(&mut self, thread: &mut CommentThread, key: &CommentId) -> Result<(), Skip> {
        if thread.set_reply_target(key) {
            Ok(())
        } else {
            Err(Skip::UnknownComment)
        }
    }

    pub fn cancel_reply(&mut self, thread: &mut CommentThread) {
        thread.clear_reply_target();
    }

    /// Submit the compose text as a root comment or, if a reply target is
    /// set, as a reply to it.
    pub fn submit(&mut self, thread: &CommentThread) -> Result<CreateRequest, Skip> {
        let parent = thread.reply_target().map(|t| t.top_level_parent.clone());
        let text = self.compose.clone();
        self.begin_add(thread, &text, parent)
    }

    /// Start adding `text`, as a reply under `parent` when given.
    pub fn begin_add(
        &mut self,
        thread: &CommentThread,
        text: &str,
        parent: Option<CommentId>,
    ) -> Result<CreateRequest, Skip> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Skip::EmptyText);
        }
        if self.submitting {
            tracing::debug!("add ignored, another add in flight");
            return Err(Skip::AlreadySubmitting);
        }
        let reply_to_username = parent.as_ref().and_then(|parent| {
            match thread.reply_target() {
                Some(target) if &target.top_level_parent == parent => {
                    Some(target.display_username.clone())
                }
                _ => thread
                    .find(parent)
                    .map(|root| root.author.display_label().to_owned()),
            }
        });
        self.submitting = true;
        Ok(CreateRequest {
            text: text.to_owned(),
            parent,
            reply_to_username,
        })
    }

    /// Apply the result of a create call.
    ///
    /// Returns the count change to report, or `None` when the add failed.
    pub fn finish_add(
        &mut self,
        thread: &mut CommentThread,
        request: CreateRequest,
        result: Result<CreateReceipt, BackendError>,
        now_ms: i64,
    ) -> Option<CountChange> {
        self.submitting = false;
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(error = %err, parent_id = ?request.parent, "add comment failed");
                return None;
            }
        };
        let mut comment = receipt.comment.unwrap_or_else(|| {
            let mut stub = Comment::stub(request.text.clone(), now_ms);
            if let Some(user) = &self.current_user {
                stub.author.id = user.clone();
            }
            stub
        });
        match &request.parent {
            Some(parent) if !thread.roots().iter().any(|c| &c.key() == parent) => {
                tracing::debug!(parent_id = %parent, comment_id = %comment.key(), "reply committed for a removed comment");
            }
            Some(parent) => {
                if comment.reply_to_username.is_none() {
                    comment.reply_to_username = request.reply_to_username.clone();
                }
                tracing::debug!(parent_id = %parent, comment_id = %comment.key(), "reply committed");
                thread.append_reply(parent, comment);
            }
            None => {
                tracing::debug!(comment_id = %comment.key(), "comment committed");
                thread.insert_root(comment);
            }
        }
        self.compose.clear();
        thread.clear_reply_target();
        Some(
            receipt
                .aggregate_count
                .map_or(CountChange::Increment, CountChange::Set),
        )
    }

    /// Long-press: arm delete for `key` if the current user wrote it.
    pub fn arm_delete(&mut self, thread: &CommentThread, key: &CommentId) -> Result<(), Skip> {
        let comment = thread.find(key).ok_or(Skip::UnknownComment)?;
        if !self.can_delete(comment) {
            return Err(Skip::NotOwner);
        }
        self.armed_delete = Some(key.clone());
        Ok(())
    }

    pub fn disarm_delete(&mut self) {
        self.armed_delete = None;
    }

    /// Confirm an armed delete.
    pub fn begin_delete(
        &mut self,
        thread: &mut CommentThread,
        key: &CommentId,
    ) -> Result<DeleteRequest, Skip> {
        if thread.deleting().is_some() {
            tracing::debug!(comment_id = %key, "delete ignored, another delete in flight");
            return Err(Skip::DeleteInFlight);
        }
        if self.armed_delete.as_ref() != Some(key) {
            return Err(Skip::NotArmed);
        }
        let comment = thread.find(key).ok_or(Skip::UnknownComment)?;
        if !self.can_delete(comment) {
            return Err(Skip::NotOwner);
        }
        self.armed_delete = None;
        thread.set_deleting(Some(key.clone()));
        Ok(DeleteRequest { id: key.clone() })
    }

    /// Apply the result of a delete call (after any fallback attempt).
    ///
    /// Returns the count change to report, or `None` when the delete failed.
    /// A failure leaves the comment in place and raises nothing further.
    pub fn finish_delete(
        &mut self,
        thread: &mut CommentThread,
        request: DeleteRequest,
        result: Result<DeleteReceipt, BackendError>,
    ) -> Option<CountChange> {
        thread.set_deleting(None);
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(comment_id = %request.id, error = %err, "delete failed on both routes");
                return None;
            }
        };
        thread.remove(&request.id);
        tracing::debug!(comment_id = %request.id, "comment deleted");
        Some(
            receipt
                .aggregate_count
                .map_or(CountChange::Decrement, CountChange::Set),
        )
    }
}
