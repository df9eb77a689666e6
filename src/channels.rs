//! The set of subreddits a monitor subscribes to.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BotError, Result};

/// Sentinel channel name meaning every subreddit
pub const ALL_CHANNELS: &str = "all";

fn channel_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_]{1,20}$").expect("valid channel regex"))
}

/// Channels combined into one subscription target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelSet {
    /// Every channel on the platform
    #[default]
    All,
    /// A non-empty ordered list of distinct channel names
    Named(Vec<String>),
}

impl ChannelSet {
    /// Build a channel set from user-supplied names.
    ///
    /// A leading `r/` or `/r/` is stripped. Duplicates (compared
    /// case-insensitively) keep their first position. Any `all` entry
    /// collapses the set to [`ChannelSet::All`].
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut channels: Vec<String> = Vec::new();

        for name in names {
            let name = name.as_ref().trim();
            let name = name
                .strip_prefix("/r/")
                .or_else(|| name.strip_prefix("r/"))
                .unwrap_or(name);

            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case(ALL_CHANNELS) {
                return Ok(ChannelSet::All);
            }
            if !channel_name_regex().is_match(name) {
                return Err(BotError::InvalidChannel(name.to_string()));
            }
            if !channels.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                channels.push(name.to_string());
            }
        }

        if channels.is_empty() {
            return Err(BotError::ConfigError(
                "at least one channel is required".to_string(),
            ));
        }

        Ok(ChannelSet::Named(channels))
    }

    /// The combined subscription target, names joined with `+`
    pub fn target(&self) -> String {
        match self {
            ChannelSet::All => ALL_CHANNELS.to_string(),
            ChannelSet::Named(names) => names.join("+"),
        }
    }

    /// Whether this set covers every channel
    pub fn is_all(&self) -> bool {
        matches!(self, ChannelSet::All)
    }
}

impl std::fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r/{}", self.target())
    }
}
