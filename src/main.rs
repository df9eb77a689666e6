use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use reddit_reply_bot::config::{Config, Overrides};
use reddit_reply_bot::error::BotError;
use reddit_reply_bot::monitor::CommentMonitor;
use reddit_reply_bot::reddit::authenticate;

/// Reddit Reply Bot: reply to comments that say exactly the trigger phrase
#[derive(Parser, Debug)]
#[command(name = "reddit-reply-bot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// OAuth application id
    #[arg(long = "client-id", env = "REDDIT_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth application secret
    #[arg(long = "client-secret", env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Bot account name
    #[arg(long = "username", env = "REDDIT_USERNAME")]
    username: Option<String>,

    /// Bot account password
    #[arg(long = "password", env = "REDDIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// User agent sent with every request (should include contact info)
    #[arg(long = "user-agent", env = "REDDIT_USER_AGENT")]
    user_agent: Option<String>,

    /// Subreddits to watch, repeatable or comma-separated (default: all)
    #[arg(
        short = 's',
        long = "channel",
        env = "REDDIT_CHANNELS",
        value_delimiter = ','
    )]
    channels: Vec<String>,

    /// Comment text that triggers a reply (default: "New response just dropped")
    #[arg(short = 't', long = "trigger", env = "REDDIT_TRIGGER_PHRASE")]
    trigger: Option<String>,

    /// Reply body (default: "Actual Zombie")
    #[arg(short = 'r', long = "reply", env = "REDDIT_REPLY_TEXT")]
    reply: Option<String>,

    /// Seconds to pause after a successful reply (default: 2)
    #[arg(long = "reply-delay-secs")]
    reply_delay_secs: Option<u64>,

    /// Seconds to pause after a failed reply (default: 5)
    #[arg(long = "failure-delay-secs")]
    failure_delay_secs: Option<u64>,

    /// Override the API host (default: https://oauth.reddit.com)
    #[arg(long = "api-url", env = "REDDIT_API_URL", hide = true)]
    api_url: Option<String>,

    /// Override the token host (default: https://www.reddit.com)
    #[arg(long = "auth-url", env = "REDDIT_AUTH_URL", hide = true)]
    auth_url: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Cli {
    fn overrides(self) -> Overrides {
        Overrides {
            client_id: self.client_id,
            client_secret: self.client_secret,
            username: self.username,
            password: self.password,
            user_agent: self.user_agent,
            channels: self.channels,
            trigger_phrase: self.trigger,
            reply_text: self.reply,
            reply_delay_secs: self.reply_delay_secs,
            failure_delay_secs: self.failure_delay_secs,
            api_url: self.api_url,
            auth_url: self.auth_url,
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("reddit_reply_bot=debug,info")
    } else {
        EnvFilter::new("reddit_reply_bot=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(config: Config, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), BotError> {
    let (credentials, settings, endpoints) = config.into_parts()?;

    let session = authenticate(credentials, endpoints).await?;
    let mut monitor = CommentMonitor::new(session, settings);

    tokio::select! {
        result = monitor.run() => match result {
            Ok(never) => match never {},
            Err(e) => Err(e),
        },
        _ = shutdown_rx.recv() => {
            warn!("Shutdown signal received");
            Err(BotError::ShutdownRequested)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    // Setup shutdown signal handling
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down...");
        let _ = shutdown_tx.send(());
    });

    let mut config = Config::default();
    config.merge(cli.overrides());

    match run(config, shutdown_rx).await {
        Ok(()) => std::process::exit(0),
        Err(BotError::ShutdownRequested) => {
            println!("\n{} Shutdown requested", "INTERRUPTED:".yellow().bold());
            std::process::exit(130);
        }
        Err(BotError::StreamEnded) => {
            println!(
                "\n{} Comment stream ended, restart to resume monitoring",
                "STOPPED:".red().bold()
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
