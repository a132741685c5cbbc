//! chat-relay - relay between a chat widget and a generative-language API
//!
//! Runs the relay server, validates its configuration, or drives the chat
//! widget from a terminal.

use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay::client::{run_terminal, ChatWidget, HttpTransport};
use chat_relay::config::Config;
use chat_relay::relay::run_server;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "chat-relay")]
#[command(about = "Relay chat messages to a generative-language API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: String,
    },

    /// Chat with the relay from the terminal
    Chat {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: String,

        /// Override relay URL
        #[arg(short, long)]
        url: Option<String>,
    },
}

/// Load the config file, falling back to defaults when the default path is absent.
fn load_config(path: &str) -> anyhow::Result<Config> {
    if path == DEFAULT_CONFIG && !Path::new(path).exists() {
        return Ok(Config::default());
    }
    Ok(Config::from_file(path)?)
}

fn init_tracing(level: &str) {
    let fallback = format!("chat_relay={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut cfg = load_config(&config)?;
            init_tracing(&cfg.logging.level);
            tracing::info!(config = %config, "Loaded configuration");

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                cfg.server.listen = addr;
            }

            run_server(cfg).await
        }

        Commands::Check { config } => {
            let cfg = load_config(&config)?;
            init_tracing(&cfg.logging.level);

            let credentials = cfg.upstream.credential_source();
            tracing::info!(
                listen = %cfg.server.listen,
                relay_path = %cfg.server.relay_path,
                upstream = %cfg.upstream.generate_url(),
                timeout_secs = cfg.upstream.timeout_secs,
                "Configuration is valid"
            );

            let source = credentials.source();
            if credentials.api_key().is_some() {
                tracing::info!(source = %source, "Upstream credential available");
            } else {
                tracing::warn!(
                    source = %source,
                    "No upstream credential available; relay calls will fall back"
                );
            }
            Ok(())
        }

        Commands::Chat { config, url } => {
            let cfg = load_config(&config)?;
            init_tracing(&cfg.logging.level);

            let url = url.unwrap_or(cfg.client.url);
            let timeout = cfg.client.timeout_secs.map(Duration::from_secs);
            let transport = HttpTransport::new(url, timeout)?;
            tracing::info!(url = %transport.url(), "Chatting with relay");

            let widget = ChatWidget::new(transport);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_terminal(widget, stdin, tokio::io::stdout()).await?;
            Ok(())
        }
    }
}
