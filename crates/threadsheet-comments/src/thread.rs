#![forbid(unsafe_code)]

//! The comment thread owned by one open overlay.
//!
//! A thread is a one-level tree expressed as a side table: an ordered list
//! of root comments plus, per root, a lazily fetched reply bucket. Replies
//! to replies are threaded under the same root.
//!
//! # Invariants
//!
//! 1. `roots` is newest-first; every reply bucket is oldest-first.
//! 2. Bucket keys and `expanded` members are root ids. `expanded` only
//!    contains ids that have a bucket.
//! 3. `reply_target.top_level_parent` always names a root.
//! 4. At most one comment is mid-delete.
//! 5. `revision` increases on every observable change.

use std::collections::{HashMap, HashSet};

use crate::backend::Target;
use crate::comment::{Comment, CommentId};
use crate::error::BackendError;

/// Whether the initial root fetch has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootsState {
    Loading,
    Ready,
}

/// Who the compose bar is currently replying to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// The comment the user tapped "reply" on (root or reply).
    pub target_comment: CommentId,
    /// Username shown as `@name` on the reply.
    pub display_username: String,
    /// Root the reply will be filed under.
    pub top_level_parent: CommentId,
}

/// Where a comment lives in a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Index into the roots.
    Root(usize),
    /// Index into the bucket of `parent`.
    Reply { parent: CommentId, index: usize },
}

/// Comment state for one overlay session.
#[derive(Debug, Clone)]
pub struct CommentThread {
    target: Target,
    roots_state: RootsState,
    roots: Vec<Comment>,
    pub(crate) reply_buckets: HashMap<CommentId, Vec<Comment>>,
    pub(crate) expanded: HashSet<CommentId>,
    pub(crate) loading_replies: HashSet<CommentId>,
    deleting: Option<CommentId>,
    reply_target: Option<ReplyTarget>,
    revision: u64,
}

impl CommentThread {
    /// An empty thread awaiting its initial root fetch.
    #[must_use]
    pub fn new(target: Target) -> Self {
        Self {
            target,
            roots_state: RootsState::Loading,
            roots: Vec::new(),
            reply_buckets: HashMap::new(),
            expanded: HashSet::new(),
            loading_replies: HashSet::new(),
            deleting: None,
            reply_target: None,
            revision: 0,
        }
    }

    /// The content this thread belongs to.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn roots_state(&self) -> RootsState {
        self.roots_state
    }

    /// Root comments, newest first.
    #[must_use]
    pub fn roots(&self) -> &[Comment] {
        &self.roots
    }

    /// Cached replies of `parent`, oldest first.
    #[must_use]
    pub fn replies(&self, parent: &CommentId) -> Option<&[Comment]> {
        self.reply_buckets.get(parent).map(Vec::as_slice)
    }

    #[must_use]
    pub fn is_expanded(&self, parent: &CommentId) -> bool {
        self.expanded.contains(parent)
    }

    #[must_use]
    pub fn is_loading_replies(&self, parent: &CommentId) -> bool {
        self.loading_replies.contains(parent)
    }

    /// Comment currently being deleted.
    #[must_use]
    pub fn deleting(&self) -> Option<&CommentId> {
        self.deleting.as_ref()
    }

    #[must_use]
    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        self.reply_target.as_ref()
    }

    /// Change counter for cheap re-projection checks.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of loaded comments, roots plus cached replies.
    #[must_use]
    pub fn loaded_len(&self) -> usize {
        self.roots.len() + self.reply_buckets.values().map(Vec::len).sum::<usize>()
    }

    /// Apply the result of the root fetch.
    ///
    /// A failed fetch degrades to an empty, ready thread so the overlay shows
    /// its empty state instead of an error. Reply loads still in flight keep
    /// their claim while their parent is still a root.
    pub fn apply_roots(&mut self, result: Result<Vec<Comment>, BackendError>) {
        match result {
            Ok(roots) => {
                tracing::debug!(target_id = %self.target, count = roots.len(), "roots loaded");
                self.roots = roots;
            }
            Err(err) => {
                tracing::warn!(target_id = %self.target, error = %err, "root fetch failed, showing empty thread");
                self.roots.clear();
            }
        }
        self.reply_buckets.clear();
        self.expanded.clear();
        let roots = &self.roots;
        self.loading_replies
            .retain(|parent| roots.iter().any(|c| &c.key() == parent));
        self.reply_target = None;
        self.roots_state = RootsState::Ready;
        self.bump();
    }

    /// Locate a comment by resolved identity.
    #[must_use]
    pub fn locate(&self, key: &CommentId) -> Option<Location> {
        if let Some(index) = self.roots.iter().position(|c| &c.key() == key) {
            return Some(Location::Root(index));
        }
        self.reply_buckets.iter().find_map(|(parent, bucket)| {
            bucket
                .iter()
                .position(|c| &c.key() == key)
                .map(|index| Location::Reply {
                    parent: parent.clone(),
                    index,
                })
        })
    }

    /// Look up a comment by resolved identity.
    #[must_use]
    pub fn find(&self, key: &CommentId) -> Option<&Comment> {
        match self.locate(key)? {
            Location::Root(index) => self.roots.get(index),
            Location::Reply { parent, index } => self.reply_buckets.get(&parent)?.get(index),
        }
    }

    /// Root a comment belongs to: itself for a root, its parent for a reply.
    #[must_use]
    pub fn root_of(&self, key: &CommentId) -> Option<CommentId> {
        match self.locate(key)? {
            Location::Root(_) => Some(key.clone()),
            Location::Reply { parent, .. } => Some(parent),
        }
    }

    /// Point the compose bar at `key`. Returns `false` if it is unknown.
    pub fn set_reply_target(&mut self, key: &CommentId) -> bool {
        let Some(parent) = self.root_of(key) else {
            return false;
        };
        let Some(comment) = self.find(key) else {
            return false;
        };
        self.reply_target = Some(ReplyTarget {
            target_comment: key.clone(),
            display_username: comment.author.display_label().to_owned(),
            top_level_parent: parent,
        });
        self.bump();
        true
    }

    pub fn clear_reply_target(&mut self) {
        if self.reply_target.take().is_some() {
            self.bump();
        }
    }

    /// Prepend a committed root comment.
    pub fn insert_root(&mut self, comment: Comment) {
        self.roots.insert(0, comment);
        self.bump();
    }

    /// Append a committed reply and expand its parent.
    pub fn append_reply(&mut self, parent: &CommentId, reply: Comment) {
        self.reply_buckets.entry(parent.clone()).or_default().push(reply);
        self.expanded.insert(parent.clone());
        if let Some(root) = self.roots.iter_mut().find(|c| &c.key() == parent) {
            root.reply_count = Some(root.reply_count.unwrap_or(0).saturating_add(1));
        }
        self.bump();
    }

    /// Remove a comment wherever it lives.
    ///
    /// Removing a root also drops its reply bucket and UI state. Removing the
    /// comment the compose bar replies to clears the reply target.
    pub fn remove(&mut self, key: &CommentId) -> Option<Comment> {
        let removed = match self.locate(key)? {
            Location::Root(index) => {
                let comment = self.roots.remove(index);
                self.reply_buckets.remove(key);
                self.expanded.remove(key);
                self.loading_replies.remove(key);
                comment
            }
            Location::Reply { parent, index } => {
                let bucket = self.reply_buckets.get_mut(&parent)?;
                let comment = bucket.remove(index);
                if let Some(root) = self.roots.iter_mut().find(|c| c.key() == parent) {
                    root.reply_count = root.reply_count.map(|n| n.saturating_sub(1));
                }
                comment
            }
        };
        if self.reply_target.as_ref().is_some_and(|t| {
            &t.target_comment == key || &t.top_level_parent == key
        }) {
            self.reply_target = None;
        }
        self.bump();
        Some(removed)
    }

    pub(crate) fn set_deleting(&mut self, key: Option<CommentId>) {
        self.deleting = key;
        self.bump();
    }

    pub(crate) fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ContentKind;
    use crate::comment::Author;

    fn comment(id: &str, user: &str, ts: i64) -> Comment {
        Comment::new(id, Author::with_id(user).username(user), format!("text {id}"), ts)
    }

    fn ready(roots: Vec<Comment>) -> CommentThread {
        let mut thread = CommentThread::new(Target::new(ContentKind::Reel, "r1"));
        thread.apply_roots(Ok(roots));
        thread
    }

    #[test]
    fn starts_loading_then_ready() {
        let mut thread = CommentThread::new(Target::new(ContentKind::Post, "p1"));
        assert_eq!(thread.roots_state(), RootsState::Loading);
        thread.apply_roots(Ok(vec![comment("c1", "ada", 1)]));
        assert_eq!(thread.roots_state(), RootsState::Ready);
        assert_eq!(thread.roots().len(), 1);
    }

    #[test]
    fn failed_root_fetch_degrades_to_empty() {
        let mut thread = CommentThread::new(Target::new(ContentKind::Post, "p1"));
        thread.apply_roots(Err(BackendError::Status(500)));
        assert_eq!(thread.roots_state(), RootsState::Ready);
        assert!(thread.roots().is_empty());
    }

    #[test]
    fn insert_root_prepends_and_reply_appends() {
        let mut thread = ready(vec![comment("c1", "ada", 1)]);
        thread.insert_root(comment("c2", "bob", 2));
        assert_eq!(thread.roots()[0].key().as_str(), "c2");

        let parent = CommentId::from("c1");
        thread.append_reply(&parent, comment("r1", "bob", 3));
        thread.append_reply(&parent, comment("r2", "cy", 4));
        let keys: Vec<_> = thread.replies(&parent).unwrap().iter().map(Comment::key).collect();
        assert_eq!(keys, vec![CommentId::from("r1"), CommentId::from("r2")]);
        assert!(thread.is_expanded(&parent));
        assert_eq!(thread.find(&parent).unwrap().reply_count, Some(2));
    }

    #[test]
    fn reply_target_on_reply_threads_under_root() {
        let mut thread = ready(vec![comment("c1", "ada", 1)]);
        let parent = CommentId::from("c1");
        thread.append_reply(&parent, comment("r1", "bob", 2));
        assert!(thread.set_reply_target(&CommentId::from("r1")));
        let target = thread.reply_target().unwrap();
        assert_eq!(target.top_level_parent, parent);
        assert_eq!(target.display_username, "bob");
        assert!(!thread.set_reply_target(&CommentId::from("missing")));
    }

    #[test]
    fn removing_root_drops_bucket_and_target() {
        let mut thread = ready(vec![comment("c1", "ada", 1), comment("c0", "bob", 0)]);
        let parent = CommentId::from("c1");
        thread.append_reply(&parent, comment("r1", "bob", 2));
        thread.set_reply_target(&CommentId::from("r1"));
        assert!(thread.remove(&parent).is_some());
        assert!(thread.replies(&parent).is_none());
        assert!(!thread.is_expanded(&parent));
        assert!(thread.reply_target().is_none());
        assert_eq!(thread.roots().len(), 1);
    }

    #[test]
    fn removing_reply_keeps_bucket() {
        let mut thread = ready(vec![comment("c1", "ada", 1)]);
        let parent = CommentId::from("c1");
        thread.append_reply(&parent, comment("r1", "bob", 2));
        let removed = thread.remove(&CommentId::from("r1")).unwrap();
        assert_eq!(removed.text, "text r1");
        assert_eq!(thread.replies(&parent).map(<[Comment]>::len), Some(0));
        assert_eq!(thread.find(&parent).unwrap().reply_count, Some(0));
    }

    #[test]
    fn revision_bumps_on_change() {
        let mut thread = ready(vec![]);
        let before = thread.revision();
        thread.insert_root(comment("c1", "ada", 1));
        assert!(thread.revision() > before);
        let before = thread.revision();
        thread.clear_reply_target();
        assert_eq!(thread.revision(), before);
    }
}
