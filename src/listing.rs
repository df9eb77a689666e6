//! JSON shapes returned by the Reddit API.
//!
//! Comment listings look like:
//! `{ "kind": "Listing", "data": { "children": [ { "kind": "t1", "data": {...} } ] } }`
//! Only the fields the bot reads are modelled; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::comment::{Comment, COMMENT_KIND};
use crate::error::{BotError, Result};

/// Reddit's placeholder author for deleted accounts
const DELETED_AUTHOR: &str = "[deleted]";

/// Top-level listing wrapper
#[derive(Debug, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

/// A typed child of a listing
#[derive(Debug, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: serde_json::Value,
}

/// The `data` object of a `t1` thing
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: String,
    /// `null` on some removed comments
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    pub subreddit: String,
    pub created_utc: f64,
}

impl TryFrom<RawComment> for Comment {
    type Error = BotError;

    fn try_from(raw: RawComment) -> Result<Self> {
        let created = DateTime::<Utc>::from_timestamp(raw.created_utc as i64, 0).ok_or_else(|| {
            BotError::ApiResponse(format!(
                "comment {} has invalid created_utc {}",
                raw.id, raw.created_utc
            ))
        })?;

        Ok(Comment {
            id: raw.id,
            body: raw.body.unwrap_or_default(),
            author: raw.author.filter(|a| a != DELETED_AUTHOR),
            channel: raw.subreddit,
            created,
        })
    }
}

impl Listing {
    /// Parse a listing body into comments, newest first as the API returns them.
    ///
    /// Children that are not comments are skipped.
    pub fn parse_comments(body: &str) -> Result<Vec<Comment>> {
        let listing: Listing =
            serde_json::from_str(body).map_err(|e| BotError::ApiResponse(e.to_string()))?;
        Ok(listing.into_comments())
    }

    /// Comments that fail to parse are logged and left out of the batch
    pub fn into_comments(self) -> Vec<Comment> {
        self.data
            .children
            .into_iter()
            .filter(|thing| thing.kind == COMMENT_KIND)
            .filter_map(|thing| {
                let parsed = serde_json::from_value::<RawComment>(thing.data)
                    .map_err(|e| BotError::ApiResponse(e.to_string()))
                    .and_then(Comment::try_from);
                match parsed {
                    Ok(comment) => Some(comment),
                    Err(e) => {
                        warn!("Skipping unreadable comment in listing: {}", e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Response from `/api/v1/me`
#[derive(Debug, Deserialize)]
pub struct Account {
    pub name: String,
}

/// Response from `/api/comment` with `api_type=json`
#[derive(Debug, Default, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub json: SubmitJson,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitJson {
    /// Each error is `[code, message, field]`
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
}

impl SubmitResponse {
    /// Join the reported errors into one message, `None` if there were none
    pub fn error_message(&self) -> Option<String> {
        if self.json.errors.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .json
            .errors
            .iter()
            .map(|err| {
                err.iter()
                    .filter_map(|v| v.as_str())
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect();
        Some(parts.join("; "))
    }
}

/// Response from the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}
