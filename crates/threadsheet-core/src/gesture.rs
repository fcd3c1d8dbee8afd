#![forbid(unsafe_code)]

//! Drag recognizers for the comment sheet.
//!
//! Two recognizers coexist on a sheet:
//!
//! - [`Recognizer::Handle`] sits on the grab bar and claims every vertical
//!   drag that starts there.
//! - [`Recognizer::Content`] sits on the scrollable comment list and claims a
//!   drag only when the list is already scrolled to its top and the finger is
//!   moving down past a small threshold. Anything else stays an ordinary
//!   list scroll.
//!
//! # Invariants
//!
//! 1. A drag is well-formed: one grant, zero or more moves, then exactly one
//!    release or cancel.
//! 2. Deltas are measured from the grant point; positive is downward, toward
//!    Closed.
//! 3. Release decisions depend on the sign of the net delta only, never on
//!    velocity or distance.

use crate::sheet::SheetPosture;

/// Which surface a drag started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recognizer {
    /// The grab bar at the top of the sheet.
    Handle,
    /// The scrollable comment list.
    Content,
}

impl Recognizer {
    /// Whether this recognizer takes ownership of a drag.
    ///
    /// `dy` is the movement so far (positive = downward), `list_at_top`
    /// whether the inner list is scrolled to its first row.
    #[must_use]
    pub fn claims(self, dy: f32, list_at_top: bool, threshold: f32) -> bool {
        match self {
            Self::Handle => true,
            Self::Content => list_at_top && dy > threshold,
        }
    }

    /// Rest posture a release with net delta `dy` resolves to.
    ///
    /// The handle snaps open on any upward delta and closes otherwise. The
    /// content area closes on any downward delta and restores Full otherwise.
    #[must_use]
    pub fn release_target(self, dy: f32) -> SheetPosture {
        match self {
            Self::Handle if dy < 0.0 => SheetPosture::Full,
            Self::Handle => SheetPosture::Closed,
            Self::Content if dy > 0.0 => SheetPosture::Closed,
            Self::Content => SheetPosture::Full,
        }
    }
}

/// An active drag: where it started and how far it has moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragTracker {
    recognizer: Recognizer,
    start_offset: f32,
    dy: f32,
}

impl DragTracker {
    /// Start tracking from the live offset at grant time.
    #[must_use]
    pub fn new(recognizer: Recognizer, start_offset: f32) -> Self {
        Self {
            recognizer,
            start_offset,
            dy: 0.0,
        }
    }

    /// The recognizer that owns this drag.
    #[must_use]
    pub fn recognizer(&self) -> Recognizer {
        self.recognizer
    }

    /// Offset snapshot taken at grant.
    #[must_use]
    pub fn start_offset(&self) -> f32 {
        self.start_offset
    }

    /// Net delta since grant.
    #[must_use]
    pub fn delta(&self) -> f32 {
        self.dy
    }

    /// Record a move and return the unclamped offset it implies.
    pub fn update(&mut self, dy: f32) -> f32 {
        if dy.is_finite() {
            self.dy = dy;
        }
        self.start_offset + self.dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_claims_unconditionally() {
        assert!(Recognizer::Handle.claims(0.0, false, 10.0));
        assert!(Recognizer::Handle.claims(-40.0, false, 10.0));
    }

    #[test]
    fn content_needs_top_and_downward_threshold() {
        assert!(!Recognizer::Content.claims(50.0, false, 10.0));
        assert!(!Recognizer::Content.claims(10.0, true, 10.0));
        assert!(!Recognizer::Content.claims(-50.0, true, 10.0));
        assert!(Recognizer::Content.claims(10.5, true, 10.0));
    }

    #[test]
    fn handle_release_policy() {
        assert_eq!(Recognizer::Handle.release_target(-1.0), SheetPosture::Full);
        assert_eq!(Recognizer::Handle.release_target(0.0), SheetPosture::Closed);
        assert_eq!(Recognizer::Handle.release_target(80.0), SheetPosture::Closed);
    }

    #[test]
    fn content_release_policy() {
        assert_eq!(Recognizer::Content.release_target(1.0), SheetPosture::Closed);
        assert_eq!(Recognizer::Content.release_target(0.0), SheetPosture::Full);
        assert_eq!(Recognizer::Content.release_target(-30.0), SheetPosture::Full);
    }

    #[test]
    fn tracker_ignores_non_finite_moves() {
        let mut drag = DragTracker::new(Recognizer::Handle, 300.0);
        assert_eq!(drag.update(-20.0), 280.0);
        assert_eq!(drag.update(f32::NAN), 280.0);
        assert_eq!(drag.delta(), -20.0);
    }
}
