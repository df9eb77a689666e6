//! Reddit Reply Bot: watches new comments for a trigger phrase and replies
//! to each match.
//!
//! This crate provides the session initializer, the comment monitor loop and
//! the Reddit API adapter they run on.

pub mod channels;
pub mod comment;
pub mod config;
pub mod error;
pub mod listing;
pub mod monitor;
pub mod platform;
pub mod reddit;
pub mod state;
pub mod stream;
pub mod trigger;

pub use channels::ChannelSet;
pub use comment::Comment;
pub use config::{Config, Credentials, MonitorSettings, Throttle};
pub use error::{BotError, Result};
pub use monitor::{CommentMonitor, CommentOutcome};
pub use platform::{CommentStream, Platform};
pub use reddit::{authenticate, authenticate_with_timeout, Endpoints, RedditSession};
pub use stream::CommentSource;
pub use trigger::TriggerPhrase;
