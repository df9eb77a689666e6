use thiserror::Error;

/// Errors that can occur in the reply bot
#[derive(Error, Debug)]
pub enum BotError {
    /// Credentials were rejected or the token endpoint could not be reached
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The account behind the session could not be resolved
    #[error("could not resolve own account: {0}")]
    SelfIdentityLookup(String),

    /// The platform refused a reply
    #[error("reply to comment {comment_id} rejected: {reason}")]
    ReplyRejected { comment_id: String, reason: String },

    /// The comment stream stopped producing comments
    #[error("comment stream ended")]
    StreamEnded,

    /// Transport-level failure talking to the platform
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform is overloaded or throttling us; worth retrying later
    #[error("platform temporarily unavailable: {0}")]
    Unavailable(String),

    /// The platform answered with something we could not interpret
    #[error("unexpected API response: {0}")]
    ApiResponse(String),

    /// A required credential was not supplied
    #[error("missing credential: {0} (pass it as a flag or set the matching REDDIT_* variable)")]
    MissingCredential(&'static str),

    /// A channel name is not a valid subreddit name
    #[error("invalid channel name: {0:?}")]
    InvalidChannel(String),

    /// The trigger phrase is blank after trimming
    #[error("trigger phrase must not be empty")]
    EmptyTrigger,

    /// Any other invalid configuration value
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Shutdown was requested (e.g., via Ctrl+C)
    #[error("shutdown requested")]
    ShutdownRequested,
}

impl BotError {
    /// Whether the same request may succeed if repeated after a pause
    pub fn is_transient(&self) -> bool {
        match self {
            BotError::Unavailable(_) => true,
            BotError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}


/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;
