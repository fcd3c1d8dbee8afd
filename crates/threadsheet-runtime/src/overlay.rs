#![forbid(unsafe_code)]

//! The comment overlay: one sheet, one thread, and the effects that connect
//! them to a [`CommentBackend`].
//!
//! # Lifecycle
//!
//! `Open` mounts the overlay, creates a fresh thread, springs the sheet to
//! Default, and issues the root fetch and current-user lookup. A backdrop tap
//! or the close button animates the sheet closed; once that animation
//! completes the overlay unmounts, discards the thread, and reports
//! [`OverlayEvent::Closed`].
//!
//! # Invariants
//!
//! 1. Task results carry the generation they were issued under. Results for
//!    an older generation, or arriving while unmounted, are dropped.
//! 2. Nothing in the thread changes before the backend confirms a mutation.
//! 3. The host's comment count only moves through [`OverlayEvent`]s.
//!
//! # Failure Modes
//!
//! Backend failures are logged and swallowed. A failed root fetch shows the
//! empty state; failed adds keep the compose text; failed deletes leave the
//! comment in place without surfacing an error.

use std::sync::Arc;
use std::time::Duration;

use threadsheet_comments::{
    BackendError, Comment, CommentBackend, CommentId, CommentThread, CountChange, CreateReceipt,
    CreateRequest, DeleteReceipt, DeleteRequest, MutationController, RenderContext, ReplyFetch,
    Row, Skip, Target, TimeStyle, ToggleOutcome, delete_with_fallback, project,
};
use threadsheet_core::{Recognizer, SheetEvent, SheetGestureController, SheetPosture};

use crate::config::OverlayConfig;
use crate::program::{Cmd, Model};

/// Wall clock in milliseconds since the Unix epoch.
pub type Clock = fn() -> i64;

/// The system clock.
#[must_use]
pub fn system_clock() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

/// Messages understood by [`CommentOverlay`].
#[derive(Debug)]
pub enum Msg {
    /// Mount and animate open.
    Open,
    /// Re-fetch root comments.
    Refresh,
    RootsLoaded {
        generation: u64,
        result: Result<Vec<Comment>, BackendError>,
    },
    UserResolved {
        generation: u64,
        result: Result<Option<String>, BackendError>,
    },

    /// Compose bar text changed.
    ComposeChanged(String),
    /// Send the compose text.
    Submit,
    Created {
        generation: u64,
        request: CreateRequest,
        result: Result<CreateReceipt, BackendError>,
    },
    /// Tap on "reply" under a comment.
    ReplyTo(CommentId),
    CancelReply,

    /// Tap on "view replies" / "hide replies".
    ToggleReplies(CommentId),
    RepliesLoaded {
        generation: u64,
        fetch: ReplyFetch,
        result: Result<Vec<Comment>, BackendError>,
    },

    /// Long-press on a comment; arms delete for the author.
    LongPress(CommentId),
    /// Tap outside the armed delete affordance.
    DismissDelete,
    /// Confirm the armed delete.
    ConfirmDelete(CommentId),
    Deleted {
        generation: u64,
        request: DeleteRequest,
        result: Result<DeleteReceipt, BackendError>,
    },

    /// A recognizer was granted the drag.
    DragGranted(Recognizer),
    /// Net vertical travel since the grant.
    DragMoved(f32),
    DragReleased(f32),
    DragCancelled,
    /// Frame tick.
    Tick(Duration),
    /// The viewport changed height.
    Resize(f32),
    BackdropTap,
    CloseButton,
}

/// Notifications for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayEvent {
    /// A comment or reply was committed.
    CommentAdded(CountChange),
    /// A comment or reply was deleted.
    CommentDeleted(CountChange),
    /// The close animation finished and the overlay unmounted.
    Closed,
}

/// Headless comment overlay for one piece of content.
pub struct CommentOverlay {
    backend: Arc<dyn CommentBackend>,
    target: Target,
    config: OverlayConfig,
    sheet: SheetGestureController,
    thread: Option<CommentThread>,
    mutations: MutationController,
    mounted: bool,
    generation: u64,
    comment_count: u64,
    events: Vec<OverlayEvent>,
    clock: Clock,
}

impl std::fmt::Debug for CommentOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentOverlay")
            .field("target", &self.target)
            .field("mounted", &self.mounted)
            .field("generation", &self.generation)
            .field("comment_count", &self.comment_count)
            .field("sheet_offset", &self.sheet.offset())
            .finish_non_exhaustive()
    }
}

impl CommentOverlay {
    /// A closed, unmounted overlay.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CommentBackend>,
        target: Target,
        viewport_height: f32,
        config: OverlayConfig,
    ) -> Self {
        let sheet = SheetGestureController::new(config.sheet.metrics(viewport_height));
        Self {
            backend,
            target,
            config,
            sheet,
            thread: None,
            mutations: MutationController::new(),
            mounted: false,
            generation: 0,
            comment_count: 0,
            events: Vec::new(),
            clock: system_clock,
        }
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the host's comment count.
    #[must_use]
    pub fn with_comment_count(mut self, count: u64) -> Self {
        self.comment_count = count;
        self
    }

    // -----------------------------------------------------------------------
    // Read-outs
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    #[must_use]
    pub fn sheet(&self) -> &SheetGestureController {
        &self.sheet
    }

    /// The live thread; `None` while unmounted.
    #[must_use]
    pub fn thread(&self) -> Option<&CommentThread> {
        self.thread.as_ref()
    }

    #[must_use]
    pub fn mutations(&self) -> &MutationController {
        &self.mutations
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Open counter; bumps on every mount.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Host-facing total comment count.
    #[must_use]
    pub fn comment_count(&self) -> u64 {
        self.comment_count
    }

    /// Whether `recognizer` should take a drag that has moved `dy`.
    #[must_use]
    pub fn should_claim(&self, recognizer: Recognizer, dy: f32, list_at_top: bool) -> bool {
        self.mounted && self.sheet.should_claim(recognizer, dy, list_at_top)
    }

    /// Display rows for the current thread.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        let Some(thread) = &self.thread else {
            return Vec::new();
        };
        let style = if self.config.relative_time {
            TimeStyle::Relative
        } else {
            TimeStyle::Absolute
        };
        let ctx = RenderContext::new((self.clock)())
            .viewer(self.mutations.current_user(), self.mutations.armed_delete())
            .time_style(style);
        project(thread, &ctx)
    }

    /// Take queued host notifications.
    pub fn drain_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    fn open(&mut self) -> Cmd<Msg> {
        if self.mounted && self.sheet.heading() != Some(SheetPosture::Closed) {
            tracing::debug!(target_id = %self.target, "open ignored, already mounted");
            return Cmd::none();
        }
        self.generation += 1;
        self.mounted = true;
        self.thread = Some(CommentThread::new(self.target.clone()));
        let current_user = self.mutations.current_user().map(str::to_owned);
        self.mutations = MutationController::new();
        self.mutations.set_current_user(current_user);
        self.sheet.open();
        tracing::debug!(target_id = %self.target, generation = self.generation, "overlay opened");
        Cmd::batch(vec![self.fetch_roots(), self.resolve_user()])
    }

    fn close(&mut self) -> Cmd<Msg> {
        if self.mounted && self.sheet.heading() != Some(SheetPosture::Closed) {
            self.sheet.close();
        }
        Cmd::none()
    }

    fn unmount(&mut self) {
        self.mounted = false;
        self.thread = None;
        self.mutations.disarm_delete();
        self.mutations.set_compose_text("");
        self.events.push(OverlayEvent::Closed);
        tracing::debug!(target_id = %self.target, generation = self.generation, "overlay closed");
    }

    fn is_current(&self, generation: u64, what: &str) -> bool {
        let current = self.mounted && generation == self.generation;
        if !current {
            tracing::debug!(
                generation,
                current = self.generation,
                mounted = self.mounted,
                what,
                "discarding late result"
            );
        }
        current
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    fn fetch_roots(&self) -> Cmd<Msg> {
        let backend = Arc::clone(&self.backend);
        let target = self.target.clone();
        let generation = self.generation;
        Cmd::task("fetch_roots", move || Msg::RootsLoaded {
            generation,
            result: backend.fetch_roots(&target),
        })
    }

    fn resolve_user(&self) -> Cmd<Msg> {
        let backend = Arc::clone(&self.backend);
        let generation = self.generation;
        Cmd::task("current_user", move || Msg::UserResolved {
            generation,
            result: backend.current_user_id(),
        })
    }

    fn create(&self, request: CreateRequest) -> Cmd<Msg> {
        let backend = Arc::clone(&self.backend);
        let target = self.target.clone();
        let generation = self.generation;
        Cmd::task("create_comment", move || {
            let result = backend.create_comment(&target, &request.text, request.parent.as_ref());
            Msg::Created {
                generation,
                request,
                result,
            }
        })
    }

    fn fetch_replies(&self, fetch: ReplyFetch) -> Cmd<Msg> {
        let backend = Arc::clone(&self.backend);
        let target = self.target.clone();
        let generation = self.generation;
        Cmd::task("fetch_replies", move || {
            let result = backend.fetch_replies(&target, &fetch.parent);
            Msg::RepliesLoaded {
                generation,
                fetch,
                result,
            }
        })
    }

    fn delete(&self, request: DeleteRequest) -> Cmd<Msg> {
        let backend = Arc::clone(&self.backend);
        let target = self.target.clone();
        let generation = self.generation;
        Cmd::task("delete_comment", move || {
            let result = delete_with_fallback(backend.as_ref(), &target, &request.id);
            Msg::Deleted {
                generation,
                request,
                result,
            }
        })
    }

    fn skipped(action: &str, skip: Skip) -> Cmd<Msg> {
        tracing::debug!(action, reason = %skip, "action skipped");
        Cmd::none()
    }

    fn report(&mut self, event: OverlayEvent) {
        let change = match event {
            OverlayEvent::CommentAdded(change) | OverlayEvent::CommentDeleted(change) => change,
            OverlayEvent::Closed => return,
        };
        self.comment_count = change.apply(self.comment_count);
        self.events.push(event);
    }

    // -----------------------------------------------------------------------
    // Sheet
    // -----------------------------------------------------------------------

    fn tick(&mut self, dt: Duration) -> Cmd<Msg> {
        self.sheet.tick(dt);
        for event in self.sheet.drain_events() {
            match event {
                SheetEvent::Closed => {
                    if self.mounted {
                        self.unmount();
                    }
                }
                SheetEvent::Settled(posture) => {
                    tracing::trace!(?posture, "sheet settled");
                }
            }
        }
        Cmd::none()
    }
}

impl Model for CommentOverlay {
    type Message = Msg;

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::Open => self.open(),
            Msg::Refresh => {
                if self.mounted {
                    self.fetch_roots()
                } else {
                    Cmd::none()
                }
            }
            Msg::RootsLoaded { generation, result } => {
                if self.is_current(generation, "roots") {
                    if let Some(thread) = self.thread.as_mut() {
                        thread.apply_roots(result);
                    }
                }
                Cmd::none()
            }
            Msg::UserResolved { generation, result } => {
                if self.is_current(generation, "current_user") {
                    match result {
                        Ok(user) => self.mutations.set_current_user(user),
                        Err(err) => tracing::warn!(error = %err, "current user lookup failed"),
                    }
                }
                Cmd::none()
            }

            Msg::ComposeChanged(text) => {
                self.mutations.set_compose_text(text);
                Cmd::none()
            }
            Msg::Submit => {
                let Some(thread) = self.thread.as_ref() else {
                    return Cmd::none();
                };
                match self.mutations.submit(thread) {
                    Ok(request) => self.create(request),
                    Err(skip) => Self::skipped("submit", skip),
                }
            }
            Msg::Created {
                generation,
                request,
                result,
            } => {
                if !self.is_current(generation, "create") {
                    return Cmd::none();
                }
                let now = (self.clock)();
                let Some(thread) = self.thread.as_mut() else {
                    return Cmd::none();
                };
                if let Some(change) = self.mutations.finish_add(thread, request, result, now) {
                    self.report(OverlayEvent::CommentAdded(change));
                }
                Cmd::none()
            }
            Msg::ReplyTo(key) => {
                let Some(thread) = self.thread.as_mut() else {
                    return Cmd::none();
                };
                match self.mutations.begin_reply(thread, &key) {
                    Ok(()) => Cmd::none(),
                    Err(skip) => Self::skipped("reply", skip),
                }
            }
            Msg::CancelReply => {
                if let Some(thread) = self.thread.as_mut() {
                    self.mutations.cancel_reply(thread);
                }
                Cmd::none()
            }

            Msg::ToggleReplies(parent) => {
                let Some(thread) = self.thread.as_mut() else {
                    return Cmd::none();
                };
                match thread.toggle_replies(&parent) {
                    ToggleOutcome::Fetch(fetch) => self.fetch_replies(fetch),
                    ToggleOutcome::Skipped(skip) => Self::skipped("toggle_replies", skip),
                    ToggleOutcome::Collapsed | ToggleOutcome::Expanded => Cmd::none(),
                }
            }
            Msg::RepliesLoaded {
                generation,
                fetch,
                result,
            } => {
                if self.is_current(generation, "replies") {
                    if let Some(thread) = self.thread.as_mut() {
                        thread.finish_reply_load(fetch, result);
                    }
                }
                Cmd::none()
            }

            Msg::LongPress(key) => {
                let Some(thread) = self.thread.as_ref() else {
                    return Cmd::none();
                };
                match self.mutations.arm_delete(thread, &key) {
                    Ok(()) => Cmd::none(),
                    Err(skip) => Self::skipped("arm_delete", skip),
                }
            }
            Msg::DismissDelete => {
                self.mutations.disarm_delete();
                Cmd::none()
            }
            Msg::ConfirmDelete(key) => {
                let Some(thread) = self.thread.as_mut() else {
                    return Cmd::none();
                };
                match self.mutations.begin_delete(thread, &key) {
                    Ok(request) => self.delete(request),
                    Err(skip) => Self::skipped("delete", skip),
                }
            }
            Msg::Deleted {
                generation,
                request,
                result,
            } => {
                if !self.is_current(generation, "delete") {
                    return Cmd::none();
                }
                let Some(thread) = self.thread.as_mut() else {
                    return Cmd::none();
                };
                if let Some(change) = self.mutations.finish_delete(thread, request, result) {
                    self.report(OverlayEvent::CommentDeleted(change));
                }
                Cmd::none()
            }

            Msg::DragGranted(recognizer) => {
                if self.mounted {
                    self.sheet.begin_drag(recognizer);
                }
                Cmd::none()
            }
            Msg::DragMoved(dy) => {
                self.sheet.drag_to(dy);
                Cmd::none()
            }
            Msg::DragReleased(dy) => {
                self.sheet.release(dy);
                Cmd::none()
            }
            Msg::DragCancelled => {
                self.sheet.cancel_drag();
                Cmd::none()
            }
            Msg::Tick(dt) => self.tick(dt),
            Msg::Resize(height) => {
                self.sheet.resize(height);
                Cmd::none()
            }
            Msg::BackdropTap | Msg::CloseButton => self.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadsheet_comments::ContentKind;
    use threadsheet_comments::testing::ScriptedBackend;

    fn overlay() -> CommentOverlay {
        CommentOverlay::new(
            Arc::new(ScriptedBackend::new()),
            Target::new(ContentKind::Post, "p1"),
            844.0,
            OverlayConfig::default(),
        )
        .with_clock(|| 0)
    }

    #[test]
    fn open_mounts_and_issues_two_tasks() {
        let mut o = overlay();
        let cmd = o.update(Msg::Open);
        assert!(o.is_mounted());
        assert_eq!(o.generation(), 1);
        assert_eq!(cmd.task_count(), 2);
        assert_eq!(o.rows(), vec![Row::Loading]);
    }

    #[test]
    fn second_open_is_ignored_while_mounted() {
        let mut o = overlay();
        let _ = o.update(Msg::Open);
        assert!(o.update(Msg::Open).is_none());
        assert_eq!(o.generation(), 1);
    }

    #[test]
    fn stale_generation_is_dropped() {
        let mut o = overlay();
        let _ = o.update(Msg::Open);
        let _ = o.update(Msg::RootsLoaded {
            generation: 0,
            result: Ok(vec![Comment::stub("old", 0)]),
        });
        assert_eq!(o.rows(), vec![Row::Loading]);
    }

    #[test]
    fn closed_overlay_has_no_rows() {
        let o = overlay();
        assert!(o.rows().is_empty());
        assert!(!o.should_claim(Recognizer::Handle, 5.0, true));
    }
}
