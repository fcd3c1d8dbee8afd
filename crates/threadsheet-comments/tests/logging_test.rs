#![forbid(unsafe_code)]

//! Failures are swallowed at the mutation boundary but must still leave a
//! structured log line behind.

use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

use threadsheet_comments::testing::{Op, ScriptedBackend};
use threadsheet_comments::{
    Author, BackendError, Comment, CommentBackend, CommentId, CommentThread, ContentKind,
    MutationController, Target, delete_with_fallback,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Captured {
    level: tracing::Level,
    message: String,
    comment_id: Option<String>,
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    comment_id: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "comment_id" {
            self.comment_id = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "comment_id" => self.comment_id = Some(format!("{value:?}").trim_matches('"').to_string()),
            _ => {}
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.message,
            comment_id: visitor.comment_id,
        });
    }
}

fn capture() -> (tracing::dispatcher::DefaultGuard, Arc<Mutex<Vec<Captured>>>) {
    let layer = CaptureLayer::default();
    let events = layer.events.clone();
    let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
    tracing::callsite::rebuild_interest_cache();
    (guard, events)
}

#[test]
fn double_delete_failure_logs_fallback_and_warning() {
    let (_guard, events) = capture();
    let target = Target::new(ContentKind::Startup, "s1");
    let backend = ScriptedBackend::new()
        .with_user("me")
        .with_roots(vec![Comment::new("c1", Author::with_id("me"), "x", 0)]);
    backend.fail_next(Op::DeletePrimary, BackendError::Status(404));
    backend.fail_next(Op::DeleteFallback, BackendError::Status(404));

    let mut thread = CommentThread::new(target.clone());
    thread.apply_roots(backend.fetch_roots(&target));
    let mut mutations = MutationController::new();
    mutations.set_current_user(Some("me".into()));
    let key = CommentId::from("c1");
    mutations.arm_delete(&thread, &key).unwrap();
    let request = mutations.begin_delete(&mut thread, &key).unwrap();
    let result = delete_with_fallback(&backend, &target, &request.id);
    mutations.finish_delete(&mut thread, request, result);

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| e.level == tracing::Level::DEBUG
        && e.message.contains("trying fallback")
        && e.comment_id.as_deref() == Some("c1")));
    assert!(events.iter().any(|e| e.level == tracing::Level::WARN
        && e.message.contains("delete failed")
        && e.comment_id.as_deref() == Some("c1")));
}

#[test]
fn root_fetch_failure_warns() {
    let (_guard, events) = capture();
    let mut thread = CommentThread::new(Target::new(ContentKind::Post, "p1"));
    thread.apply_roots(Err(BackendError::Unauthorized));
    let events = events.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|e| e.level == tracing::Level::WARN && e.message.contains("root fetch failed"))
    );
}
