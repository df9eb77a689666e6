//! The seam between the monitor loop and the social platform.
//!
//! The monitor only needs four things from a platform: who it is logged in
//! as, a way to reply, and a lazy stream of new comments. [`RedditSession`]
//! is the production implementation; tests substitute scripted ones.
//!
//! [`RedditSession`]: crate::reddit::RedditSession

use async_trait::async_trait;

use crate::comment::Comment;
use crate::error::Result;

/// A pull-based, possibly infinite sequence of new comments
#[async_trait]
pub trait CommentStream: Send {
    /// Wait for the next comment.
    ///
    /// `Ok(None)` means the platform closed the stream. Errors also end the
    /// stream; callers are not expected to keep polling after either.
    async fn next_comment(&mut self) -> Result<Option<Comment>>;
}

/// Operations the monitor needs from an authenticated session
#[async_trait]
pub trait Platform: Send + Sync {
    type Stream: CommentStream;

    /// Resolve the account name the session is authenticated as
    async fn own_identity(&self) -> Result<String>;

    /// Post `text` as a reply to `comment`
    async fn reply(&self, comment: &Comment, text: &str) -> Result<()>;

    /// Open a stream of comments posted to `target`.
    ///
    /// With `skip_existing`, comments created before the stream was opened
    /// are never yielded.
    fn comments(&self, target: &str, skip_existing: bool) -> Self::Stream;
}
