use chrono::{DateTime, Utc};

/// Kind prefix Reddit uses for comment fullnames
pub const COMMENT_KIND: &str = "t1";

/// A comment observed on the platform. Read-only from the bot's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Base-36 comment id, e.g. `k3x9z1a`
    pub id: String,
    /// Body text as written by the author
    pub body: String,
    /// Author account name, `None` for deleted accounts
    pub author: Option<String>,
    /// Subreddit the comment was posted in
    pub channel: String,
    /// Creation time reported by the platform
    pub created: DateTime<Utc>,
}

impl Comment {
    /// The `t1_` prefixed name the API uses to address this comment
    pub fn fullname(&self) -> String {
        format!("{}_{}", COMMENT_KIND, self.id)
    }

    /// Whether the comment was written by `account`
    pub fn is_authored_by(&self, account: &str) -> bool {
        self.author.as_deref() == Some(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(author: Option<&str>) -> Comment {
        Comment {
            id: "abc123".to_string(),
            body: "hello".to_string(),
            author: author.map(String::from),
            channel: "rust".to_string(),
            created: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_fullname_has_comment_prefix() {
        assert_eq!(comment(None).fullname(), "t1_abc123");
    }

    #[test]
    fn test_author_comparison_is_exact() {
        let c = comment(Some("reply_bot"));
        assert!(c.is_authored_by("reply_bot"));
        assert!(!c.is_authored_by("Reply_Bot"));
        assert!(!comment(None).is_authored_by("reply_bot"));
    }
}
