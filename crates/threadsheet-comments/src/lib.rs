#![forbid(unsafe_code)]

//! Comment thread engine: state, reply loading, confirmed mutations, and
//! row projection for a comment overlay.
//!
//! The crate is headless and synchronous. Every remote interaction is split
//! into a `begin_*` / `finish_*` pair around a [`CommentBackend`] call so the
//! host decides where that call runs.
//!
//! # Example
//!
//! ```
//! use threadsheet_comments::{
//!     CommentThread, ContentKind, MutationController, RenderContext, Row, Target, project,
//! };
//!
//! let mut thread = CommentThread::new(Target::new(ContentKind::Reel, "r1"));
//! thread.apply_roots(Ok(vec![]));
//!
//! let mut mutations = MutationController::new();
//! mutations.set_compose_text("first!");
//! let request = mutations.submit(&thread).unwrap();
//! mutations.finish_add(&mut thread, request, Ok(Default::default()), 0);
//!
//! let ctx = RenderContext::new(0);
//! assert!(matches!(&project(&thread, &ctx)[0], Row::Comment(row) if row.text == "first!"));
//! ```

pub mod backend;
pub mod comment;
pub mod error;
pub mod mutation;
pub mod render;
pub mod replies;
pub mod thread;
pub mod wire;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use backend::{
    CommentBackend, ContentKind, CreateReceipt, DeleteReceipt, DeleteRoute, EndpointFamily,
    Target, delete_with_fallback,
};
pub use comment::{Author, Comment, CommentId};
pub use error::{BackendError, Skip};
pub use mutation::{CountChange, CreateRequest, DeleteRequest, MutationController};
pub use render::{
    CommentRow, RenderContext, RepliesAffordance, Row, TimeStyle, absolute_date, project,
    project_comment, relative_time,
};
pub use replies::{ReplyFetch, ToggleOutcome};
pub use thread::{CommentThread, Location, ReplyTarget, RootsState};
