use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "Confab - conversational session manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default)
    Chat,
    /// List conversations, most recent first
    List,
    /// Rename a conversation
    Rename { id: String, title: String },
    /// Delete a conversation
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => commands::chat::run().await?,
        Commands::List => commands::conversations::list().await?,
        Commands::Rename { id, title } => commands::conversations::rename(&id, &title).await?,
        Commands::Delete { id } => commands::conversations::delete(&id).await?,
    }

    Ok(())
}
