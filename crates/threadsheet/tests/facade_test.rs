//! The facade exposes a working overlay through the prelude alone.

use std::sync::Arc;

use threadsheet::comments::testing::ScriptedBackend;
use threadsheet::prelude::*;
use threadsheet::runtime::OverlaySimulator;

#[test]
fn prelude_is_enough_to_open_an_overlay() {
    let backend = Arc::new(ScriptedBackend::new());
    let config = threadsheet::load_config(Some("{}")).unwrap();
    let overlay = CommentOverlay::new(backend, Target::new(ContentKind::Post, "p1"), 844.0, config);
    let mut sim = OverlaySimulator::inline(overlay);
    sim.send(Msg::Open);
    assert_eq!(sim.model().rows(), vec![Row::Empty]);
}

#[test]
fn config_errors_convert() {
    let err = threadsheet::load_config(Some("[1, 2")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().starts_with("invalid overlay config"));
}

#[test]
fn fetch_thread_surfaces_backend_errors() {
    use threadsheet::comments::testing::Op;

    let backend = ScriptedBackend::new()
        .with_roots(vec![Comment::new("c1", threadsheet::Author::with_id("ada"), "hi", 0)]);
    let thread = fetch_thread(&backend, Target::new(ContentKind::Reel, "r1")).unwrap();
    assert_eq!(thread.roots().len(), 1);

    backend.fail_next(Op::FetchRoots, threadsheet::BackendError::Unauthorized);
    let err = fetch_thread(&backend, Target::new(ContentKind::Reel, "r1")).unwrap_err();
    assert!(matches!(err, Error::Backend(threadsheet::BackendError::Unauthorized)));
    assert_eq!(err.to_string(), "not signed in");
    assert!(std::error::Error::source(&err).is_some());
}
