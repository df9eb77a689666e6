//! The comment monitor loop.
//!
//! One comment is handled at a time, in arrival order. Handling a comment
//! (including any reply and the pause after it) finishes before the next
//! comment is requested from the stream.

use std::convert::Infallible;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::comment::Comment;
use crate::config::{MonitorSettings, Throttle};
use crate::error::{BotError, Result};
use crate::platform::{CommentStream, Platform};
use crate::state::MonitorStats;

/// What happened to a single comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    /// Written by the bot's own account, ignored
    SelfAuthored,
    /// Body does not match the trigger
    NoMatch,
    /// Matched and the reply was posted
    Replied,
    /// Matched but posting the reply failed
    ReplyFailed,
}

impl Throttle {
    /// How long to pause after a comment with this outcome
    pub fn delay_for(&self, outcome: CommentOutcome) -> Option<Duration> {
        match outcome {
            CommentOutcome::Replied => Some(self.reply_delay),
            CommentOutcome::ReplyFailed => Some(self.failure_delay),
            CommentOutcome::SelfAuthored | CommentOutcome::NoMatch => None,
        }
    }
}

/// Watches a comment stream and replies to comments matching the trigger
pub struct CommentMonitor<P: Platform> {
    platform: P,
    settings: MonitorSettings,
    /// Cached once resolved; the account cannot change during a run
    own_identity: Option<String>,
    stats: MonitorStats,
}

impl<P: Platform> CommentMonitor<P> {
    /// Create a new CommentMonitor
    pub fn new(platform: P, settings: MonitorSettings) -> Self {
        Self {
            platform,
            settings,
            own_identity: None,
            stats: MonitorStats::default(),
        }
    }

    /// Get the counters for this run so far
    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Get a reference to the settings
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Monitor the configured channels until the stream terminates.
    ///
    /// Only returns when the stream ends or fails; per-comment errors are
    /// logged and swallowed. There is no reconnect.
    pub async fn run(&mut self) -> Result<Infallible> {
        let target = self.settings.channels.target();

        info!(
            "Starting comment stream for r/{}; trigger phrase='{}'",
            target, self.settings.trigger
        );
        if self.settings.reply_text.trim().is_empty() {
            warn!("Reply text is empty");
        }

        let mut stream = self.platform.comments(&target, true);

        loop {
            let comment = match stream.next_comment().await {
                Ok(Some(comment)) => comment,
                Ok(None) => {
                    warn!("Comment stream for r/{} ended ({})", target, self.stats);
                    return Err(BotError::StreamEnded);
                }
                Err(e) => {
                    error!("Comment stream for r/{} failed: {} ({})", target, e, self.stats);
                    return Err(e);
                }
            };

            let outcome = self.handle_comment(&comment).await;
            if let Some(delay) = self.settings.throttle.delay_for(outcome) {
                debug!("Pausing {:?} after {:?}", delay, outcome);
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Filter one comment and reply to it if it matches. Never fails.
    pub async fn handle_comment(&mut self, comment: &Comment) -> CommentOutcome {
        self.stats.comments_seen += 1;

        if let Some(me) = self.resolve_own_identity().await {
            if comment.is_authored_by(&me) {
                debug!("Skipping own comment {}", comment.id);
                self.stats.self_authored += 1;
                return CommentOutcome::SelfAuthored;
            }
        }

        if !self.settings.trigger.matches(&comment.body) {
            return CommentOutcome::NoMatch;
        }
        self.stats.matched += 1;

        info!(
            "Replying to comment id={} in r/{}",
            comment.id, comment.channel
        );
        match self
            .platform
            .reply(comment, &self.settings.reply_text)
            .await
        {
            Ok(()) => {
                self.stats.replies_sent += 1;
                CommentOutcome::Replied
            }
            Err(e) => {
                error!("Failed to reply to comment {}: {}", comment.id, e);
                self.stats.replies_failed += 1;
                CommentOutcome::ReplyFailed
            }
        }
    }

    /// The bot's account name, or `None` if it cannot be resolved right now
    async fn resolve_own_identity(&mut self) -> Option<String> {
        if let Some(me) = &self.own_identity {
            return Some(me.clone());
        }
        match self.platform.own_identity().await {
            Ok(me) => {
                debug!("Resolved own account: {}", me);
                self.own_identity = Some(me.clone());
                Some(me)
            }
            Err(e) => {
                debug!("Own account lookup failed, treating comment as foreign: {}", e);
                None
            }
        }
    }
}
