use std::{process::ExitCode, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatbot_client::{
    config::{ClientConfig, DEFAULT_ENDPOINT},
    services::chat_client::HttpChatClient,
    state::{ChatView, Settlement},
    view::{render::render_message, terminal},
};

/// Terminal client for the chatbot service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Chat endpoint that accepts `{"message": ...}` and answers `{"reply": ...}`
    #[arg(long, env = "CHAT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in seconds, 0 for none
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value_t = 0)]
    timeout_secs: u64,

    /// Send a single message, print the reply and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "warn,chatbot_client=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::new(&cli.endpoint, cli.timeout_secs)?;
    let client = HttpChatClient::new(&config)?;
    info!(endpoint = %client.endpoint(), "chat client ready");

    match cli.message {
        Some(text) => one_shot(&client, text).await,
        None => {
            terminal::run(Arc::new(client)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn one_shot(client: &HttpChatClient, text: String) -> Result<ExitCode> {
    let mut view = ChatView::new();
    view.set_input(text);

    match view.send(client).await? {
        Settlement::Replied(id) => {
            if let Some(reply) = view.messages().iter().find(|m| m.id == id) {
                println!("{}", render_message(reply));
            }
            Ok(ExitCode::SUCCESS)
        }
        Settlement::Failed(_) | Settlement::Stale => Ok(ExitCode::FAILURE),
    }
}
