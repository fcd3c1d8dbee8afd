//! Arbitrary message sequences always leave the sheet at a rest offset and
//! the host count consistent with the server.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use threadsheet_comments::testing::ScriptedBackend;
use threadsheet_comments::{ContentKind, Target};
use threadsheet_core::Recognizer;
use threadsheet_runtime::{CommentOverlay, Msg, OverlayConfig, OverlaySimulator};

const VIEWPORT: f32 = 844.0;
const REST: [f32; 3] = [0.0, 324.0, 844.0];

#[derive(Debug, Clone)]
enum Step {
    Open,
    Close,
    Grant(bool),
    Move(f32),
    Release(f32),
    Cancel,
    Tick(u8),
    Submit(String),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Open),
        Just(Step::Close),
        any::<bool>().prop_map(Step::Grant),
        (-1500.0f32..1500.0).prop_map(Step::Move),
        (-1500.0f32..1500.0).prop_map(Step::Release),
        Just(Step::Cancel),
        (1u8..30).prop_map(Step::Tick),
        "[a-z ]{0,6}".prop_map(Step::Submit),
    ]
}

fn to_msgs(step: Step) -> Vec<Msg> {
    match step {
        Step::Open => vec![Msg::Open],
        Step::Close => vec![Msg::BackdropTap],
        Step::Grant(handle) => vec![Msg::DragGranted(if handle {
            Recognizer::Handle
        } else {
            Recognizer::Content
        })],
        Step::Move(dy) => vec![Msg::DragMoved(dy)],
        Step::Release(dy) => vec![Msg::DragReleased(dy)],
        Step::Cancel => vec![Msg::DragCancelled],
        Step::Tick(n) => (0..n).map(|_| Msg::Tick(Duration::from_millis(16))).collect(),
        Step::Submit(text) => vec![Msg::ComposeChanged(text), Msg::Submit],
    }
}

proptest! {
    #[test]
    fn sheet_always_comes_to_rest(steps in prop::collection::vec(step(), 0..40)) {
        let backend = Arc::new(ScriptedBackend::new().with_user("me").reporting_counts());
        let overlay = CommentOverlay::new(
            backend.clone(),
            Target::new(ContentKind::Post, "p1"),
            VIEWPORT,
            OverlayConfig::default(),
        );
        let mut sim = OverlaySimulator::inline(overlay);
        for step in steps {
            sim.send_all(to_msgs(step));
        }
        sim.send(Msg::DragCancelled);
        sim.settle(Duration::from_secs(10));

        let offset = sim.model().sheet().offset();
        prop_assert!(REST.contains(&offset), "offset {} is not a rest offset", offset);
        prop_assert!(!sim.model().sheet().is_animating());
        prop_assert_eq!(sim.model().comment_count(), backend.roots().len() as u64);
    }
}
