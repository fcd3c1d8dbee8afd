#![forbid(unsafe_code)]

//! JSON shapes used by comment endpoints, normalized into engine types.
//!
//! Backend adapters call these helpers so shape sniffing stays at the
//! adapter boundary. Tolerated variations:
//!
//! - identity in `_id` and/or `id` (string or number);
//! - `createdAt` as RFC 3339 text, numeric text, or epoch milliseconds;
//! - author under `user` or `author`, as a bare id or a profile object;
//! - lists either bare or wrapped in `comments` / `replies` / `data`;
//! - create responses either `{ comment: {...} }`, the comment itself, or a
//!   bare acknowledgement, optionally with a total count.

use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::backend::{CreateReceipt, DeleteReceipt};
use crate::comment::{Author, Comment};
use crate::error::BackendError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn to_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(ms) => Some(*ms),
            Self::Text(text) => text.parse::<i64>().ok().or_else(|| {
                OffsetDateTime::parse(text, &Rfc3339)
                    .ok()
                    .and_then(|t| i64::try_from(t.unix_timestamp_nanos() / 1_000_000).ok())
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    #[serde(rename = "_id", default)]
    primary_id: Option<RawId>,
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "fullName")]
    name: Option<String>,
    #[serde(default, alias = "avatar")]
    profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAuthor {
    Id(RawId),
    Profile(RawProfile),
}

impl From<RawAuthor> for Author {
    fn from(raw: RawAuthor) -> Self {
        match raw {
            RawAuthor::Id(id) => Author::with_id(id.into_string()),
            RawAuthor::Profile(p) => Author {
                id: p
                    .primary_id
                    .or(p.id)
                    .map(RawId::into_string)
                    .unwrap_or_default(),
                username: p.username,
                display_name: p.name,
                avatar_url: p.profile_pic,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComment {
    #[serde(rename = "_id", default)]
    primary_id: Option<RawId>,
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default, alias = "content")]
    text: Option<String>,
    #[serde(default)]
    created_at: Option<RawTimestamp>,
    #[serde(default, alias = "author")]
    user: Option<RawAuthor>,
    #[serde(default)]
    reply_to_username: Option<String>,
    #[serde(default, alias = "repliesCount")]
    reply_count: Option<u32>,
}

impl RawComment {
    fn into_comment(self, now_ms: i64) -> Comment {
        Comment {
            primary_id: self.primary_id.map(RawId::into_string),
            secondary_id: self.id.map(RawId::into_string),
            author: self.user.map(Author::from).unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            created_at_ms: self
                .created_at
                .as_ref()
                .and_then(RawTimestamp::to_millis)
                .unwrap_or(now_ms),
            reply_to_username: self.reply_to_username.filter(|s| !s.is_empty()),
            reply_count: self.reply_count,
        }
    }
}

/// Parse one comment object. A missing `createdAt` becomes `now_ms`.
pub fn parse_comment(value: Value, now_ms: i64) -> Result<Comment, BackendError> {
    let raw: RawComment = serde_json::from_value(value)?;
    Ok(raw.into_comment(now_ms))
}

/// Parse a list of comments, bare or wrapped.
pub fn parse_comment_list(value: Value, now_ms: i64) -> Result<Vec<Comment>, BackendError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match ["comments", "replies", "data"]
            .iter()
            .find_map(|key| map.remove(*key))
        {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(BackendError::Decode(format!("expected list, got {other}"))),
            None => return Err(BackendError::Decode("no comment list in response".into())),
        },
        other => return Err(BackendError::Decode(format!("expected list, got {other}"))),
    };
    items
        .into_iter()
        .map(|item| parse_comment(item, now_ms))
        .collect()
}

fn aggregate_count(value: &Value) -> Option<u64> {
    ["commentCount", "commentsCount", "count"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_u64))
}

fn looks_like_comment(value: &Value) -> bool {
    value.is_object() && ["_id", "id", "text"].iter().any(|key| value.get(*key).is_some())
}

/// Normalize a create response into a receipt.
///
/// `comment` is `None` when no comment body can be found; the controller
/// then synthesizes a stub.
#[must_use]
pub fn parse_create_response(value: Value, now_ms: i64) -> CreateReceipt {
    let aggregate_count = aggregate_count(&value);
    let body = if let Some(inner) = value.get("comment").filter(|v| v.is_object()) {
        Some(inner.clone())
    } else if looks_like_comment(&value) {
        Some(value)
    } else {
        None
    };
    let comment = body.and_then(|body| match parse_comment(body, now_ms) {
        Ok(comment) => Some(comment),
        Err(err) => {
            tracing::debug!(error = %err, "create response body unreadable, using stub");
            None
        }
    });
    CreateReceipt {
        comment,
        aggregate_count,
    }
}

/// Normalize a delete response into a receipt.
#[must_use]
pub fn parse_delete_response(value: &Value) -> DeleteReceipt {
    DeleteReceipt {
        aggregate_count: aggregate_count(value),
    }
}
