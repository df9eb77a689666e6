use std::time::Duration;

use secrecy::Secret;

use crate::channels::ChannelSet;
use crate::error::{BotError, Result};
use crate::reddit::Endpoints;
use crate::trigger::TriggerPhrase;

/// Pause after a successful reply, to stay under the rate limit
pub const REPLY_DELAY: Duration = Duration::from_secs(2);

/// Pause after a failed reply, to avoid a tight failure loop
pub const FAILURE_DELAY: Duration = Duration::from_secs(5);

/// Credentials for Reddit's password grant
#[derive(Debug)]
pub struct Credentials {
    /// OAuth application id
    pub client_id: String,
    /// OAuth application secret
    pub client_secret: Secret<String>,
    /// Bot account name
    pub username: String,
    /// Bot account password
    pub password: Secret<String>,
    /// Descriptive user agent, should include contact info
    pub user_agent: String,
}

/// Build the user agent Reddit's API rules ask for
pub fn default_user_agent(username: &str) -> String {
    format!(
        "rust:{}:v{} (by /u/{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        username
    )
}

/// Delays applied after handling a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub reply_delay: Duration,
    pub failure_delay: Duration,
}

impl Default for Throttle {
    fn default() -> Self {
        Self {
            reply_delay: REPLY_DELAY,
            failure_delay: FAILURE_DELAY,
        }
    }
}

impl Throttle {
    /// The failure backoff must be strictly longer than the success pause
    pub fn validate(&self) -> Result<()> {
        if self.failure_delay <= self.reply_delay {
            return Err(BotError::ConfigError(format!(
                "failure delay ({:?}) must be longer than reply delay ({:?})",
                self.failure_delay, self.reply_delay
            )));
        }
        Ok(())
    }
}

/// What the monitor watches for and how it answers
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub channels: ChannelSet,
    pub trigger: TriggerPhrase,
    /// Sent verbatim as the reply body
    pub reply_text: String,
    pub throttle: Throttle,
}

fn default_channels() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_trigger_phrase() -> String {
    "New response just dropped".to_string()
}

fn default_reply_text() -> String {
    "Actual Zombie".to_string()
}

/// Main configuration for the bot, before validation
#[derive(Debug)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<Secret<String>>,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    /// Falls back to [`default_user_agent`]
    pub user_agent: Option<String>,
    pub channels: Vec<String>,
    pub trigger_phrase: String,
    pub reply_text: String,
    pub throttle: Throttle,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: None,
            channels: default_channels(),
            trigger_phrase: default_trigger_phrase(),
            reply_text: default_reply_text(),
            throttle: Throttle::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Values that can override the defaults, typically from the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
    pub channels: Vec<String>,
    pub trigger_phrase: Option<String>,
    pub reply_text: Option<String>,
    pub reply_delay_secs: Option<u64>,
    pub failure_delay_secs: Option<u64>,
    pub api_url: Option<String>,
    pub auth_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Merge overrides into this configuration.
    /// Overrides take precedence; blank strings count as unset.
    pub fn merge(&mut self, overrides: Overrides) {
        if let Some(id) = non_blank(overrides.client_id) {
            self.client_id = Some(id);
        }
        if let Some(secret) = non_blank(overrides.client_secret) {
            self.client_secret = Some(Secret::new(secret));
        }
        if let Some(user) = non_blank(overrides.username) {
            self.username = Some(user);
        }
        if let Some(password) = non_blank(overrides.password) {
            self.password = Some(Secret::new(password));
        }
        if let Some(ua) = non_blank(overrides.user_agent) {
            self.user_agent = Some(ua);
        }
        if !overrides.channels.is_empty() {
            self.channels = overrides.channels;
        }
        if let Some(trigger) = overrides.trigger_phrase {
            self.trigger_phrase = trigger;
        }
        if let Some(reply) = overrides.reply_text {
            self.reply_text = reply;
        }
        if let Some(secs) = overrides.reply_delay_secs {
            self.throttle.reply_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.failure_delay_secs {
            self.throttle.failure_delay = Duration::from_secs(secs);
        }
        if let Some(url) = non_blank(overrides.api_url) {
            self.endpoints.api_url = url;
        }
        if let Some(url) = non_blank(overrides.auth_url) {
            self.endpoints.auth_url = url;
        }
    }

    /// Validate and split into what the initializer and the monitor need
    pub fn into_parts(self) -> Result<(Credentials, MonitorSettings, Endpoints)> {
        let settings = MonitorSettings {
            channels: ChannelSet::new(&self.channels)?,
            trigger: TriggerPhrase::new(self.trigger_phrase)?,
            reply_text: self.reply_text,
            throttle: self.throttle,
        };
        settings.throttle.validate()?;

        let client_id = self
            .client_id
            .ok_or(BotError::MissingCredential("client id"))?;
        let client_secret = self
            .client_secret
            .ok_or(BotError::MissingCredential("client secret"))?;
        let username = self
            .username
            .ok_or(BotError::MissingCredential("username"))?;
        let password = self
            .password
            .ok_or(BotError::MissingCredential("password"))?;
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| default_user_agent(&username));

        let credentials = Credentials {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        };

        Ok((credentials, settings, self.endpoints))
    }
}
