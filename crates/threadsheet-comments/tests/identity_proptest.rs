#![forbid(unsafe_code)]

//! Identity is total and stable across re-projection.

use proptest::prelude::*;
use threadsheet_comments::{
    Author, Comment, CommentThread, ContentKind, RenderContext, Row, Target, project,
};

fn id_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-z0-9]{1,8}".prop_map(Some),
    ]
}

fn comment() -> impl Strategy<Value = Comment> {
    (id_field(), id_field(), any::<i64>(), "[a-z ]{0,20}").prop_map(|(p, s, ts, text)| Comment {
        primary_id: p,
        secondary_id: s,
        author: Author::with_id("u"),
        text,
        created_at_ms: ts,
        ..Comment::default()
    })
}

proptest! {
    #[test]
    fn key_is_never_empty_and_deterministic(c in comment()) {
        let key = c.key();
        prop_assert!(!key.as_str().is_empty());
        prop_assert_eq!(&key, &c.clone().key());
    }

    #[test]
    fn key_follows_precedence(c in comment()) {
        let key = c.key();
        let primary = c.primary_id.as_deref().filter(|s| !s.is_empty());
        let secondary = c.secondary_id.as_deref().filter(|s| !s.is_empty());
        let expected = match (primary, secondary) {
            (Some(p), _) => p.to_owned(),
            (None, Some(s)) => s.to_owned(),
            (None, None) => format!("ts:{}", c.created_at_ms),
        };
        prop_assert_eq!(key.as_str(), expected.as_str());
    }

    #[test]
    fn reprojection_keeps_keys(roots in prop::collection::vec(comment(), 0..12)) {
        let mut thread = CommentThread::new(Target::new(ContentKind::Post, "p"));
        thread.apply_roots(Ok(roots));
        let ctx = RenderContext::new(0);
        let keys = |rows: Vec<Row>| -> Vec<String> {
            rows.into_iter()
                .filter_map(|r| match r {
                    Row::Comment(c) => Some(c.key.as_str().to_owned()),
                    _ => None,
                })
                .collect()
        };
        let first = keys(project(&thread, &ctx));
        let second = keys(project(&thread, &ctx));
        prop_assert_eq!(first, second);
    }
}
