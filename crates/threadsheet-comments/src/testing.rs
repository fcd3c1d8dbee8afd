#![forbid(unsafe_code)]

//! In-memory backend with scripted failures and call counters.
//!
//! Enabled for this crate's tests and, through the `test-helpers` feature,
//! for downstream crates that drive the engine end to end.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::backend::{CommentBackend, CreateReceipt, DeleteReceipt, DeleteRoute, Target};
use crate::comment::{Author, Comment, CommentId};
use crate::error::BackendError;
use crate::wire;

/// Which backend operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    FetchRoots,
    FetchReplies,
    Create,
    DeletePrimary,
    DeleteFallback,
    CurrentUser,
}

/// Counts of calls made against a [`ScriptedBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub fetch_roots: usize,
    pub fetch_replies: usize,
    pub create: usize,
    pub delete_primary: usize,
    pub delete_fallback: usize,
}

#[derive(Debug, Default)]
struct State {
    roots: Vec<Comment>,
    replies: HashMap<CommentId, Vec<Comment>>,
    user: Option<String>,
    failures: HashMap<Op, VecDeque<BackendError>>,
    counts: CallCounts,
    next_id: u64,
    clock_ms: i64,
    report_counts: bool,
    bare_create: bool,
}

/// A [`CommentBackend`] over in-memory lists.
///
/// Creates get sequential ids (`n1`, `n2`, ...) and a timestamp that
/// advances by one second per create.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    state: Mutex<State>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the root list (newest first).
    #[must_use]
    pub fn with_roots(self, roots: Vec<Comment>) -> Self {
        self.with_state(|s| s.roots = roots)
    }

    /// Seed the replies of one root (oldest first).
    #[must_use]
    pub fn with_replies(self, parent: impl Into<CommentId>, replies: Vec<Comment>) -> Self {
        let parent = parent.into();
        self.with_state(|s| {
            s.replies.insert(parent, replies);
        })
    }

    /// Signed-in user id.
    #[must_use]
    pub fn with_user(self, user: impl Into<String>) -> Self {
        let user = user.into();
        self.with_state(|s| s.user = Some(user))
    }

    /// Report total counts in create/delete receipts.
    #[must_use]
    pub fn reporting_counts(self) -> Self {
        self.with_state(|s| s.report_counts = true)
    }

    /// Answer creates with a bare acknowledgement (no comment body).
    #[must_use]
    pub fn with_bare_create(self) -> Self {
        self.with_state(|s| s.bare_create = true)
    }

    /// Fail the next call of `op` with `err`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, op: Op, err: BackendError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    /// Calls made so far.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.lock().counts
    }

    /// Current server-side roots.
    #[must_use]
    pub fn roots(&self) -> Vec<Comment> {
        self.lock().roots.clone()
    }

    fn with_state(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.lock());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl State {
    fn take_failure(&mut self, op: Op) -> Result<(), BackendError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn total(&self) -> u64 {
        let replies: usize = self.replies.values().map(Vec::len).sum();
        (self.roots.len() + replies) as u64
    }

    fn remove(&mut self, id: &CommentId) -> bool {
        if let Some(index) = self.roots.iter().position(|c| &c.key() == id) {
            self.roots.remove(index);
            self.replies.remove(id);
            return true;
        }
        for bucket in self.replies.values_mut() {
            if let Some(index) = bucket.iter().position(|c| &c.key() == id) {
                bucket.remove(index);
                return true;
            }
        }
        false
    }
}

/// Server-side JSON for a stored comment, in the shape comment endpoints
/// return it.
fn comment_json(comment: &Comment) -> Value {
    let created_at = OffsetDateTime::from_unix_timestamp_nanos(
        i128::from(comment.created_at_ms) * 1_000_000,
    )
    .ok()
    .and_then(|t| t.format(&Rfc3339).ok())
    .map_or_else(|| json!(comment.created_at_ms), Value::String);
    let mut body = json!({
        "_id": comment.key().as_str(),
        "text": comment.text,
        "createdAt": created_at,
    });
    if !comment.author.id.is_empty() {
        body["user"] = json!(comment.author.id);
    }
    body
}

impl CommentBackend for ScriptedBackend {
    fn fetch_roots(&self, _target: &Target) -> Result<Vec<Comment>, BackendError> {
        let mut s = self.lock();
        s.counts.fetch_roots += 1;
        s.take_failure(Op::FetchRoots)?;
        Ok(s.roots.clone())
    }

    fn fetch_replies(&self, _target: &Target, parent: &CommentId) -> Result<Vec<Comment>, BackendError> {
        let mut s = self.lock();
        s.counts.fetch_replies += 1;
        s.take_failure(Op::FetchReplies)?;
        Ok(s.replies.get(parent).cloned().unwrap_or_default())
    }

    fn create_comment(
        &self,
        _target: &Target,
        text: &str,
        parent: Option<&CommentId>,
    ) -> Result<CreateReceipt, BackendError> {
        let mut s = self.lock();
        s.counts.create += 1;
        s.take_failure(Op::Create)?;
        s.next_id += 1;
        s.clock_ms += 1_000;
        let author = s.user.clone().map(Author::with_id).unwrap_or_default();
        let comment = Comment::new(format!("n{}", s.next_id), author, text, s.clock_ms);
        match parent {
            Some(parent) => s.replies.entry(parent.clone()).or_default().push(comment.clone()),
            None => s.roots.insert(0, comment.clone()),
        }
        let mut body = if s.bare_create {
            json!({ "success": true })
        } else {
            json!({ "comment": comment_json(&comment) })
        };
        if s.report_counts {
            body["commentCount"] = json!(s.total());
        }
        Ok(wire::parse_create_response(body, s.clock_ms))
    }

    fn delete_comment(
        &self,
        _target: &Target,
        id: &CommentId,
        route: DeleteRoute,
    ) -> Result<DeleteReceipt, BackendError> {
        let mut s = self.lock();
        let op = match route {
            DeleteRoute::Primary => {
                s.counts.delete_primary += 1;
                Op::DeletePrimary
            }
            DeleteRoute::Fallback => {
                s.counts.delete_fallback += 1;
                Op::DeleteFallback
            }
        };
        s.take_failure(op)?;
        if !s.remove(id) {
            return Err(BackendError::Status(404));
        }
        let body = if s.report_counts {
            json!({ "commentsCount": s.total() })
        } else {
            json!({})
        };
        Ok(wire::parse_delete_response(&body))
    }

    fn current_user_id(&self) -> Result<Option<String>, BackendError> {
        let mut s = self.lock();
        s.take_failure(Op::CurrentUser)?;
        Ok(s.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ContentKind, delete_with_fallback};

    fn target() -> Target {
        Target::new(ContentKind::Post, "p1")
    }

    #[test]
    fn scripted_failure_is_consumed_once() {
        let backend = ScriptedBackend::new();
        backend.fail_next(Op::FetchRoots, BackendError::Status(500));
        assert!(backend.fetch_roots(&target()).is_err());
        assert!(backend.fetch_roots(&target()).is_ok());
        assert_eq!(backend.counts().fetch_roots, 2);
    }

    #[test]
    fn fallback_delete_runs_once_after_primary_failure() {
        let backend = ScriptedBackend::new()
            .with_roots(vec![Comment::new("c1", Author::with_id("me"), "x", 0)]);
        backend.fail_next(Op::DeletePrimary, BackendError::Status(404));
        assert!(delete_with_fallback(&backend, &target(), &CommentId::from("c1")).is_ok());
        let counts = backend.counts();
        assert_eq!((counts.delete_primary, counts.delete_fallback), (1, 1));
        assert!(backend.roots().is_empty());
    }

    #[test]
    fn both_routes_failing_surfaces_fallback_error() {
        let backend = ScriptedBackend::new();
        backend.fail_next(Op::DeletePrimary, BackendError::Status(404));
        backend.fail_next(Op::DeleteFallback, BackendError::Status(403));
        let err = delete_with_fallback(&backend, &target(), &CommentId::from("c1")).unwrap_err();
        assert_eq!(err, BackendError::Status(403));
        assert_eq!(backend.counts().delete_fallback, 1);
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let backend = ScriptedBackend::new().with_user("me").reporting_counts();
        let a = backend.create_comment(&target(), "a", None).unwrap();
        let b = backend.create_comment(&target(), "b", None).unwrap();
        assert_eq!(a.comment.unwrap().key().as_str(), "n1");
        assert_eq!(b.comment.unwrap().author.id, "me");
        assert_eq!(b.aggregate_count, Some(2));
    }

    #[test]
    fn create_bodies_go_through_wire_normalization() {
        let wrapped = ScriptedBackend::new().with_user("me");
        let receipt = wrapped.create_comment(&target(), "hi", None).unwrap();
        let comment = receipt.comment.unwrap();
        assert_eq!(comment, wrapped.roots()[0]);
        assert_eq!(comment.created_at_ms, 1_000);

        let bare = ScriptedBackend::new().with_bare_create().reporting_counts();
        let receipt = bare.create_comment(&target(), "hi", None).unwrap();
        assert!(receipt.comment.is_none());
        assert_eq!(receipt.aggregate_count, Some(1));
    }
}
