#![forbid(unsafe_code)]

//! Stateless projection of a [`CommentThread`] into display rows.
//!
//! Rows are rebuilt from scratch whenever the thread's revision changes.
//! Root comments are emitted in thread order; an expanded root is followed
//! by its replies, one level deep.

use time::OffsetDateTime;

use crate::comment::{Comment, CommentId};
use crate::thread::{CommentThread, RootsState};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Short relative age: `now`, `5m`, `3h`, `2d`, `4w`.
///
/// Timestamps in the future (clock skew) read as `now`.
#[must_use]
pub fn relative_time(now_ms: i64, created_at_ms: i64) -> String {
    let age = now_ms.saturating_sub(created_at_ms);
    match age {
        a if a < MINUTE_MS => "now".to_owned(),
        a if a < HOUR_MS => format!("{}m", a / MINUTE_MS),
        a if a < DAY_MS => format!("{}h", a / HOUR_MS),
        a if a < WEEK_MS => format!("{}d", a / DAY_MS),
        a => format!("{}w", a / WEEK_MS),
    }
}

/// Calendar date (`2023-11-14`, UTC) of a timestamp.
#[must_use]
pub fn absolute_date(created_at_ms: i64) -> String {
    match OffsetDateTime::from_unix_timestamp_nanos(i128::from(created_at_ms) * 1_000_000) {
        Ok(at) => {
            let date = at.date();
            format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
        }
        Err(_) => String::new(),
    }
}

/// How ages are labelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeStyle {
    /// `now`, `5m`, `3h`, ...
    #[default]
    Relative,
    /// `2023-11-14`.
    Absolute,
}

/// Per-frame inputs the projection needs besides the thread.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub now_ms: i64,
    pub current_user: Option<&'a str>,
    pub armed_delete: Option<&'a CommentId>,
    pub time_style: TimeStyle,
}

impl<'a> RenderContext<'a> {
    /// Context for an anonymous viewer with relative ages.
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms,
            current_user: None,
            armed_delete: None,
            time_style: TimeStyle::Relative,
        }
    }

    #[must_use]
    pub fn viewer(mut self, current_user: Option<&'a str>, armed_delete: Option<&'a CommentId>) -> Self {
        self.current_user = current_user;
        self.armed_delete = armed_delete;
        self
    }

    #[must_use]
    pub fn time_style(mut self, style: TimeStyle) -> Self {
        self.time_style = style;
        self
    }

    fn time_label(&self, created_at_ms: i64) -> String {
        match self.time_style {
            TimeStyle::Relative => relative_time(self.now_ms, created_at_ms),
            TimeStyle::Absolute => absolute_date(created_at_ms),
        }
    }
}

/// The replies control under a root comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepliesAffordance {
    /// No replies to show.
    None,
    /// "View replies", with the count when known.
    View { count: Option<u32> },
    /// A fetch is pending.
    Loading,
    /// "Hide replies".
    Hide,
}

/// One rendered comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRow {
    pub key: CommentId,
    pub is_reply: bool,
    /// Root this reply belongs to.
    pub parent_id: Option<CommentId>,
    /// Author label of the root this reply belongs to.
    pub parent_author: Option<String>,
    pub author: String,
    pub avatar_url: Option<String>,
    pub text: String,
    pub time_label: String,
    /// `@name` prefix for replies that address someone.
    pub reply_tag: Option<String>,
    pub replies: RepliesAffordance,
    pub can_delete: bool,
    pub delete_armed: bool,
    pub deleting: bool,
    pub is_reply_target: bool,
}

/// A row of the comment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// The initial fetch has not resolved.
    Loading,
    /// Ready with no comments: "no comments yet".
    Empty,
    Comment(CommentRow),
}

/// Project a single comment.
#[must_use]
pub fn project_comment(
    thread: &CommentThread,
    comment: &Comment,
    is_reply: bool,
    parent: Option<(&CommentId, &str)>,
    ctx: &RenderContext<'_>,
) -> CommentRow {
    let key = comment.key();
    let replies = if is_reply {
        RepliesAffordance::None
    } else if thread.is_loading_replies(&key) {
        RepliesAffordance::Loading
    } else if thread.is_expanded(&key) {
        RepliesAffordance::Hide
    } else {
        let cached = thread.replies(&key).map_or(0, <[Comment]>::len);
        match comment.reply_count {
            Some(n) if n > 0 => RepliesAffordance::View { count: Some(n) },
            _ if cached > 0 => RepliesAffordance::View {
                count: u32::try_from(cached).ok(),
            },
            _ => RepliesAffordance::None,
        }
    };
    let can_delete = ctx
        .current_user
        .is_some_and(|user| comment.is_authored_by(user));
    CommentRow {
        is_reply,
        parent_id: parent.map(|(id, _)| id.clone()),
        parent_author: parent.map(|(_, name)| name.to_owned()),
        author: comment.author.display_label().to_owned(),
        avatar_url: comment.author.avatar_url.clone(),
        text: comment.text.clone(),
        time_label: ctx.time_label(comment.created_at_ms),
        reply_tag: comment
            .reply_to_username
            .as_ref()
            .map(|name| format!("@{name}")),
        replies,
        can_delete,
        delete_armed: ctx.armed_delete == Some(&key),
        deleting: thread.deleting() == Some(&key),
        is_reply_target: thread
            .reply_target()
            .is_some_and(|t| t.target_comment == key),
        key,
    }
}

/// Project the whole thread.
#[must_use]
pub fn project(thread: &CommentThread, ctx: &RenderContext<'_>) -> Vec<Row> {
    if thread.roots_state() == RootsState::Loading {
        return vec![Row::Loading];
    }
    if thread.roots().is_empty() {
        return vec![Row::Empty];
    }
    let mut rows = Vec::with_capacity(thread.roots().len());
    for root in thread.roots() {
        let key = root.key();
        rows.push(Row::Comment(project_comment(thread, root, false, None, ctx)));
        if !thread.is_expanded(&key) {
            continue;
        }
        let parent_author = root.author.display_label();
        for reply in thread.replies(&key).unwrap_or_default() {
            rows.push(Row::Comment(project_comment(
                thread,
                reply,
                true,
                Some((&key, parent_author)),
                ctx,
            )));
        }
    }
    rows
}
