//! tagdock CLI - image tag editor with a token budget and auto-captioning.
//!
//! # Usage
//!
//! ```bash
//! # Edit the tags of a session interactively
//! tagdock edit session.json
//!
//! # Check a caption against the token budget
//! tagdock tokens "sky, cloud, sea"
//!
//! # Caption images and add the captions to a session
//! tagdock caption img/*.jpg --session session.json
//!
//! # View configuration
//! tagdock config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// tagdock - image tag editor with a token budget and auto-captioning.
#[derive(Parser, Debug)]
#[command(name = "tagdock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit image tags interactively
    Edit(cli::edit::EditArgs),

    /// Count the tokens of a caption
    Tokens(cli::tokens::TokensArgs),

    /// Generate captions with the captioning model
    Caption(cli::caption::CaptionArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match tagdock_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tagdock config path`."
            );
            tagdock_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("tagdock v{}", tagdock_core::VERSION);

    match cli.command {
        Commands::Edit(args) => cli::edit::execute(args, &config).await,
        Commands::Tokens(args) => cli::tokens::execute(args, &config).await,
        Commands::Caption(args) => cli::caption::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
