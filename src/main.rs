use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "pagelens")]
#[command(version, about = "AI debugging companion for Chrome DevTools data")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive panel against a debuggable Chrome instance
    Panel {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Remote debugging port (start Chrome with --remote-debugging-port)
        #[arg(short, long, default_value = "9222")]
        port: u16,

        /// Attach to the first page whose URL or title contains this string
        #[arg(long)]
        target: Option<String>,

        #[arg(long, default_value = pagelens::gemini::DEFAULT_MODEL)]
        model: String,
    },
    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Summarize an exported HAR file
    Summarize {
        /// Path to the HAR file exported from the DevTools Network panel
        #[arg(long)]
        har: PathBuf,
    },
    /// Build the analysis prompt from exported data and print it
    Prompt {
        #[arg(long)]
        har: Option<PathBuf>,

        /// JSON-lines export of captured console entries
        #[arg(long)]
        logs: Option<PathBuf>,
    },
    /// Build the analysis prompt and send it to Gemini
    Analyze {
        #[arg(long)]
        har: Option<PathBuf>,

        /// JSON-lines export of captured console entries
        #[arg(long)]
        logs: Option<PathBuf>,

        #[arg(long, default_value = pagelens::gemini::DEFAULT_MODEL)]
        model: String,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Save the API key
    Set { key: String },
    /// Remove the saved API key
    Clear,
    /// Report whether an API key is saved
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "pagelens=debug" } else { "pagelens=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Panel {
            host,
            port,
            target,
            model,
        } => {
            cmd::cmd_panel(host.clone(), *port, target.clone(), model.clone()).await?;
        }
        Commands::Key { command } => cmd::cmd_key(command)?,
        Commands::Summarize { har } => cmd::cmd_summarize(har)?,
        Commands::Prompt { har, logs } => cmd::cmd_prompt(har.as_deref(), logs.as_deref())?,
        Commands::Analyze { har, logs, model } => {
            cmd::cmd_analyze(har.as_deref(), logs.as_deref(), model).await?;
        }
    }

    Ok(())
}
