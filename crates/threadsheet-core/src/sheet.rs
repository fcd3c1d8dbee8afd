#![forbid(unsafe_code)]

//! Gesture-driven modal sheet controller.
//!
//! The sheet slides up from the bottom of the viewport and rests in one of
//! three postures. Its position is a single scalar, the *offset*: distance
//! from the fully open position.
//!
//! ```text
//!   offset 0 ........................ Full
//!   offset max - default_visible .... Default
//!   offset max (viewport height) .... Closed
//! ```
//!
//! # Design
//!
//! The offset lives in one [`AnimatedOffset`] register. Drags, release snaps,
//! and programmatic open/close all write to it, but only one at a time:
//! every driver first stops whatever animation is in flight and reads the
//! live value, then starts its own drive from there. A drag granted during a
//! release animation therefore picks up exactly where the sheet is on screen.
//!
//! Backdrop opacity and compose-bar translation are pure functions of the
//! offset, so they cannot drift from the sheet.
//!
//! # Invariants
//!
//! 1. The offset is always within `[0, max]`.
//! 2. Every release and cancel ends, once animations finish, exactly on one
//!    of the three rest offsets.
//! 3. [`SheetEvent::Closed`] is emitted only when an animation toward Closed
//!    completes, never when it starts.
//! 4. The compose bar is untranslated anywhere between Full and Default.

use std::time::Duration;

use crate::animation::{Animation, EasingFn, Spring, SpringConfig, Timing, ease_in_out};
use crate::gesture::{DragTracker, Recognizer};

// ---------------------------------------------------------------------------
// Posture and metrics
// ---------------------------------------------------------------------------

/// One of the three rest states of the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetPosture {
    /// Off-screen; backdrop fully transparent.
    Closed,
    /// Partially open at the overlay's configured height.
    Default,
    /// Fully open.
    Full,
}

/// Geometry and tuning for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetMetrics {
    /// Viewport height; the sheet's maximum offset.
    pub viewport_height: f32,
    /// Visible sheet height in the Default posture.
    pub default_visible_height: f32,
    /// Backdrop opacity when the sheet is Full.
    pub max_backdrop_opacity: f32,
    /// Downward travel the content recognizer needs before claiming a drag.
    pub content_drag_threshold: f32,
    /// Height of the pinned compose bar.
    pub compose_bar_height: f32,
    /// Duration of the close animation.
    pub close_duration: Duration,
    /// Easing of the close animation.
    pub close_easing: EasingFn,
    /// Spring used when opening to Default.
    pub open_spring: SpringConfig,
    /// Spring used when a release snaps back open.
    pub snap_spring: SpringConfig,
}

impl SheetMetrics {
    /// Metrics for a viewport, with the default tuning.
    #[must_use]
    pub fn new(viewport_height: f32, default_visible_height: f32) -> Self {
        Self {
            viewport_height: viewport_height.max(0.0),
            default_visible_height: default_visible_height.max(0.0),
            max_backdrop_opacity: 0.5,
            content_drag_threshold: 10.0,
            compose_bar_height: 64.0,
            close_duration: Duration::from_millis(250),
            close_easing: ease_in_out,
            open_spring: SpringConfig {
                stiffness: 120.0,
                damping: 20.0,
                ..SpringConfig::default()
            },
            snap_spring: SpringConfig::default(),
        }
    }

    /// Largest offset: the sheet is fully off-screen.
    #[must_use]
    pub fn max_offset(&self) -> f32 {
        self.viewport_height.max(0.0)
    }

    /// Offset of the Default posture.
    #[must_use]
    pub fn default_offset(&self) -> f32 {
        let max = self.max_offset();
        (max - self.default_visible_height).clamp(0.0, max)
    }

    /// Offset of a rest posture.
    #[must_use]
    pub fn offset_for(&self, posture: SheetPosture) -> f32 {
        match posture {
            SheetPosture::Closed => self.max_offset(),
            SheetPosture::Default => self.default_offset(),
            SheetPosture::Full => 0.0,
        }
    }

    /// Rest posture nearest to `offset`. Ties prefer the more open posture.
    #[must_use]
    pub fn nearest_posture(&self, offset: f32) -> SheetPosture {
        [SheetPosture::Full, SheetPosture::Default, SheetPosture::Closed]
            .into_iter()
            .fold((SheetPosture::Full, f32::INFINITY), |best, posture| {
                let distance = (self.offset_for(posture) - offset).abs();
                if distance < best.1 {
                    (posture, distance)
                } else {
                    best
                }
            })
            .0
    }
}

// ---------------------------------------------------------------------------
// AnimatedOffset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Drive {
    Timing(Timing),
    Spring(Spring),
}

impl Drive {
    fn animation(&mut self) -> &mut dyn Animation {
        match self {
            Self::Timing(t) => t,
            Self::Spring(s) => s,
        }
    }
}

/// The shared offset register.
///
/// Holds the live value and at most one in-flight drive. Starting a new
/// drive or setting the value directly always stops the previous drive
/// first.
#[derive(Debug, Clone)]
pub struct AnimatedOffset {
    value: f32,
    max: f32,
    drive: Option<Drive>,
}

impl AnimatedOffset {
    /// A resting register clamped to `[0, max]`.
    #[must_use]
    pub fn new(value: f32, max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            value: value.clamp(0.0, max),
            max,
            drive: None,
        }
    }

    /// Live value, including any in-flight animation.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Upper bound of the register.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether a drive is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.drive.is_some()
    }

    /// Target of the in-flight drive, if any.
    #[must_use]
    pub fn animation_target(&self) -> Option<f32> {
        self.drive.map(|mut d| d.animation().target())
    }

    /// Stop the in-flight drive and return the live value.
    pub fn stop(&mut self) -> f32 {
        self.drive = None;
        self.value
    }

    /// Stop any drive and jump to `value`.
    pub fn set(&mut self, value: f32) {
        self.stop();
        if value.is_finite() {
            self.value = value.clamp(0.0, self.max);
        }
    }

    /// Change the upper bound, clamping the live value into it.
    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.value = self.value.clamp(0.0, self.max);
    }

    /// Spring from the live value toward `to`.
    pub fn spring_to(&mut self, to: f32, config: SpringConfig) {
        let from = self.stop();
        self.drive = Some(Drive::Spring(Spring::new(from, self.clamp(to), config)));
    }

    /// Animate from the live value to `to` over `duration`.
    pub fn timing_to(&mut self, to: f32, duration: Duration, easing: EasingFn) {
        let from = self.stop();
        self.drive = Some(Drive::Timing(
            Timing::new(from, self.clamp(to), duration).easing(easing),
        ));
    }

    /// Advance the drive. Returns the settled value when the drive completes
    /// during this tick.
    pub fn tick(&mut self, dt: Duration) -> Option<f32> {
        let drive = self.drive.as_mut()?;
        let animation = drive.animation();
        animation.tick(dt);
        let complete = animation.is_complete();
        let value = if complete {
            animation.target()
        } else {
            animation.value()
        };
        self.value = self.clamp(value);
        if complete {
            self.drive = None;
            Some(self.value)
        } else {
            None
        }
    }

    fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(0.0, self.max)
        } else {
            self.value
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Milestones produced by [`SheetGestureController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetEvent {
    /// An animation finished at Default or Full.
    Settled(SheetPosture),
    /// An animation finished at Closed. The host may now unmount.
    Closed,
}

/// Resolves drags and programmatic open/close into rest postures.
///
/// Feed it gestures ([`begin_drag`](Self::begin_drag),
/// [`drag_to`](Self::drag_to), [`release`](Self::release)) and frame ticks,
/// then read [`offset`](Self::offset), [`backdrop_opacity`](Self::backdrop_opacity)
/// and [`compose_bar_translation`](Self::compose_bar_translation) for layout.
/// Milestones are queued and retrieved with [`drain_events`](Self::drain_events).
#[derive(Debug, Clone)]
pub struct SheetGestureController {
    metrics: SheetMetrics,
    offset: AnimatedOffset,
    drag: Option<DragTracker>,
    heading: Option<SheetPosture>,
    events: Vec<SheetEvent>,
}

impl SheetGestureController {
    /// A closed sheet.
    #[must_use]
    pub fn new(metrics: SheetMetrics) -> Self {
        let max = metrics.max_offset();
        Self {
            metrics,
            offset: AnimatedOffset::new(max, max),
            drag: None,
            heading: None,
            events: Vec::new(),
        }
    }

    /// Current geometry and tuning.
    #[must_use]
    pub fn metrics(&self) -> &SheetMetrics {
        &self.metrics
    }

    /// Live offset from the fully open position.
    #[must_use]
    pub fn offset(&self) -> f32 {
        self.offset.value()
    }

    /// Rest posture nearest to the live offset.
    #[must_use]
    pub fn posture(&self) -> SheetPosture {
        self.metrics.nearest_posture(self.offset.value())
    }

    /// Posture an in-flight animation is heading to.
    #[must_use]
    pub fn heading(&self) -> Option<SheetPosture> {
        self.heading
    }

    /// Whether the offset sits exactly on a rest posture with nothing moving.
    #[must_use]
    pub fn is_at_rest(&self) -> bool {
        self.drag.is_none()
            && !self.offset.is_animating()
            && self.offset.value() == self.metrics.offset_for(self.posture())
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether an open, close, or snap animation is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.offset.is_animating()
    }

    /// Backdrop opacity for the live offset.
    #[must_use]
    pub fn backdrop_opacity(&self) -> f32 {
        let max = self.metrics.max_offset();
        if max <= 0.0 {
            return 0.0;
        }
        let openness = 1.0 - self.offset.value() / max;
        (openness * self.metrics.max_backdrop_opacity).clamp(0.0, self.metrics.max_backdrop_opacity)
    }

    /// Downward translation of the pinned compose bar.
    ///
    /// Zero from Full through Default; grows linearly to the bar's height as
    /// the sheet travels from Default to Closed.
    #[must_use]
    pub fn compose_bar_translation(&self) -> f32 {
        let bar = self.metrics.compose_bar_height.max(0.0);
        let start = self.metrics.default_offset();
        let end = self.metrics.max_offset();
        let value = self.offset.value();
        if value <= start {
            return 0.0;
        }
        let span = end - start;
        if span <= 0.0 {
            return bar;
        }
        ((value - start) / span * bar).clamp(0.0, bar)
    }

    /// Whether the compose bar is fully on screen.
    #[must_use]
    pub fn compose_usable(&self) -> bool {
        self.compose_bar_translation() == 0.0
    }

    /// Whether `recognizer` should take ownership of a drag that has moved
    /// `dy` so far.
    #[must_use]
    pub fn should_claim(&self, recognizer: Recognizer, dy: f32, list_at_top: bool) -> bool {
        recognizer.claims(dy, list_at_top, self.metrics.content_drag_threshold)
    }

    /// Animate from the live offset to Default.
    pub fn open(&mut self) {
        self.drag = None;
        self.heading = Some(SheetPosture::Default);
        self.offset
            .spring_to(self.metrics.default_offset(), self.metrics.open_spring);
        crate::debug!(from = self.offset.value(), "sheet opening");
    }

    /// Animate to Closed. [`SheetEvent::Closed`] follows on completion.
    pub fn close(&mut self) {
        self.drag = None;
        self.heading = Some(SheetPosture::Closed);
        self.offset.timing_to(
            self.metrics.max_offset(),
            self.metrics.close_duration,
            self.metrics.close_easing,
        );
        crate::debug!(from = self.offset.value(), "sheet closing");
    }

    /// Grant a drag to `recognizer`, snapshotting the live offset.
    pub fn begin_drag(&mut self, recognizer: Recognizer) {
        let start = self.offset.stop();
        self.heading = None;
        self.drag = Some(DragTracker::new(recognizer, start));
        crate::trace!(?recognizer, start, "sheet drag granted");
    }

    /// Move the active drag to net delta `dy` from the grant point.
    pub fn drag_to(&mut self, dy: f32) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let next = drag.update(dy);
        self.offset.set(next);
    }

    /// Release the active drag at net delta `dy` and start the snap
    /// animation. Returns the posture it resolves to.
    pub fn release(&mut self, dy: f32) -> Option<SheetPosture> {
        self.drag_to(dy);
        let drag = self.drag.take()?;
        let target = drag.recognizer().release_target(drag.delta());
        crate::debug!(
            recognizer = ?drag.recognizer(),
            dy = drag.delta(),
            ?target,
            "sheet drag released"
        );
        self.settle_to(target);
        Some(target)
    }

    /// Abort the active drag, settling at the nearest rest posture.
    pub fn cancel_drag(&mut self) -> Option<SheetPosture> {
        self.drag.take()?;
        let target = self.posture();
        self.settle_to(target);
        Some(target)
    }

    /// Adopt a new viewport height.
    ///
    /// A resting sheet jumps to its posture's new offset; a moving one is
    /// re-aimed at the same posture.
    pub fn resize(&mut self, viewport_height: f32) {
        let posture = self.heading.unwrap_or_else(|| self.posture());
        let animating = self.offset.is_animating();
        self.metrics.viewport_height = viewport_height.max(0.0);
        self.offset.set_max(self.metrics.max_offset());
        if animating {
            self.settle_to(posture);
        } else if self.drag.is_none() {
            self.offset.set(self.metrics.offset_for(posture));
        }
    }

    /// Advance animations by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        if self.offset.tick(dt).is_none() {
            return;
        }
        let Some(posture) = self.heading.take() else {
            return;
        };
        crate::trace!(?posture, "sheet settled");
        self.events.push(match posture {
            SheetPosture::Closed => SheetEvent::Closed,
            other => SheetEvent::Settled(other),
        });
    }

    /// Take all queued milestones.
    pub fn drain_events(&mut self) -> Vec<SheetEvent> {
        std::mem::take(&mut self.events)
    }

    fn settle_to(&mut self, posture: SheetPosture) {
        match posture {
            SheetPosture::Closed => self.close(),
            open => {
                self.heading = Some(open);
                self.offset
                    .spring_to(self.metrics.offset_for(open), self.metrics.snap_spring);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn metrics() -> SheetMetrics {
        SheetMetrics::new(800.0, 480.0)
    }

    fn run(sheet: &mut SheetGestureController, frames: usize) {
        for _ in 0..frames {
            sheet.tick(FRAME);
        }
    }

    fn opened() -> SheetGestureController {
        let mut sheet = SheetGestureController::new(metrics());
        sheet.open();
        run(&mut sheet, 200);
        sheet.drain_events();
        sheet
    }

    #[test]
    fn starts_closed_and_transparent() {
        let sheet = SheetGestureController::new(metrics());
        assert_eq!(sheet.offset(), 800.0);
        assert_eq!(sheet.posture(), SheetPosture::Closed);
        assert_eq!(sheet.backdrop_opacity(), 0.0);
        assert!(sheet.is_at_rest());
    }

    #[test]
    fn open_settles_at_default() {
        let mut sheet = SheetGestureController::new(metrics());
        sheet.open();
        let mut min_seen = f32::MAX;
        for _ in 0..200 {
            sheet.tick(FRAME);
            min_seen = min_seen.min(sheet.offset());
        }
        assert_eq!(sheet.offset(), 320.0);
        assert!(min_seen > 0.0, "open overshot past Full");
        assert_eq!(
            sheet.drain_events(),
            vec![SheetEvent::Settled(SheetPosture::Default)]
        );
    }

    #[test]
    fn close_event_only_after_animation_completes() {
        let mut sheet = opened();
        sheet.close();
        sheet.tick(FRAME);
        assert!(sheet.drain_events().is_empty());
        run(&mut sheet, 30);
        assert_eq!(sheet.offset(), 800.0);
        assert_eq!(sheet.drain_events(), vec![SheetEvent::Closed]);
    }

    #[test]
    fn drag_tracks_finger_and_backdrop_synchronously() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        sheet.drag_to(-120.0);
        assert_eq!(sheet.offset(), 200.0);
        let expected = (1.0 - 200.0 / 800.0) * 0.5;
        assert!((sheet.backdrop_opacity() - expected).abs() < 1e-6);
    }

    #[test]
    fn drag_clamps_to_bounds() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        sheet.drag_to(-5000.0);
        assert_eq!(sheet.offset(), 0.0);
        sheet.drag_to(5000.0);
        assert_eq!(sheet.offset(), 800.0);
    }

    #[test]
    fn grant_mid_animation_snapshots_live_value() {
        let mut sheet = opened();
        sheet.close();
        run(&mut sheet, 5);
        let live = sheet.offset();
        assert!(live > 320.0 && live < 800.0);
        sheet.begin_drag(Recognizer::Handle);
        assert!(!sheet.is_animating());
        assert_eq!(sheet.offset(), live);
        sheet.drag_to(0.0);
        assert_eq!(sheet.offset(), live);
    }

    #[test]
    fn handle_upward_release_snaps_full() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        sheet.drag_to(-300.0);
        assert_eq!(sheet.release(-300.0), Some(SheetPosture::Full));
        run(&mut sheet, 200);
        assert_eq!(sheet.offset(), 0.0);
        assert_eq!(
            sheet.drain_events(),
            vec![SheetEvent::Settled(SheetPosture::Full)]
        );
    }

    #[test]
    fn handle_still_release_closes() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        assert_eq!(sheet.release(0.0), Some(SheetPosture::Closed));
        run(&mut sheet, 30);
        assert_eq!(sheet.drain_events(), vec![SheetEvent::Closed]);
    }

    #[test]
    fn content_upward_release_restores_full() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        sheet.release(-400.0);
        run(&mut sheet, 200);
        sheet.begin_drag(Recognizer::Content);
        sheet.drag_to(30.0);
        assert_eq!(sheet.release(-2.0), Some(SheetPosture::Full));
        run(&mut sheet, 200);
        assert_eq!(sheet.offset(), 0.0);
    }

    #[test]
    fn release_without_drag_is_ignored() {
        let mut sheet = opened();
        assert_eq!(sheet.release(-50.0), None);
        assert_eq!(sheet.offset(), 320.0);
    }

    #[test]
    fn cancel_settles_at_nearest() {
        let mut sheet = opened();
        sheet.begin_drag(Recognizer::Handle);
        sheet.drag_to(-30.0);
        assert_eq!(sheet.cancel_drag(), Some(SheetPosture::Default));
        run(&mut sheet, 200);
        assert_eq!(sheet.offset(), 320.0);
    }

    #[test]
    fn compose_bar_is_pinned_between_full_and_default() {
        let mut sheet = opened();
        assert_eq!(sheet.compose_bar_translation(), 0.0);
        sheet.begin_drag(Recognizer::Handle);
        sheet.drag_to(-320.0);
        assert_eq!(sheet.compose_bar_translation(), 0.0);
        assert!(sheet.compose_usable());
        sheet.drag_to(240.0);
        assert!((sheet.compose_bar_translation() - 32.0).abs() < 1e-4);
        sheet.drag_to(480.0);
        assert_eq!(sheet.compose_bar_translation(), 64.0);
    }

    #[test]
    fn resize_keeps_resting_posture() {
        let mut sheet = opened();
        sheet.resize(1000.0);
        assert_eq!(sheet.offset(), 520.0);
        assert_eq!(sheet.posture(), SheetPosture::Default);
    }

    #[test]
    fn default_taller_than_viewport_collapses_to_full() {
        let m = SheetMetrics::new(300.0, 480.0);
        assert_eq!(m.default_offset(), 0.0);
        assert_eq!(m.nearest_posture(0.0), SheetPosture::Full);
    }

    #[test]
    fn offset_register_stop_reads_live_value() {
        let mut offset = AnimatedOffset::new(800.0, 800.0);
        offset.timing_to(0.0, Duration::from_millis(100), crate::animation::linear);
        offset.tick(Duration::from_millis(50));
        let live = offset.stop();
        assert!((live - 400.0).abs() < 1.0);
        assert!(!offset.is_animating());
        assert_eq!(offset.tick(FRAME), None);
    }
}
