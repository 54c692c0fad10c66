mod cli;
mod gemini_client;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Message to send to the chat
    #[arg(short, long)]
    input: Option<String>,

    /// Gemini API key (falls back to the GEMINI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Message to send to the chat
        #[arg(short, long)]
        input: Option<String>,

        /// Gemini API key (falls back to the GEMINI_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (input, api_key, verbose) = match cli.command {
        Some(Commands::Chat {
            input,
            api_key,
            verbose,
        }) => (
            input.or(cli.input),
            api_key.or(cli.api_key),
            verbose || cli.verbose,
        ),
        None => (cli.input, cli.api_key, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Starting Mental Health Support Chat CLI");

    let mut chat_context = ChatContext::new(Box::new(io::stdout()), input, true, api_key);
    chat_context.run().await
}
