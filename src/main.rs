//! Notes MCP Server
//!
//! A Model Context Protocol server that lets AI assistants read text and PDF
//! notes from a local folder and manage Google Calendar events.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notes_mcp_server::calendar::auth::Authenticator;
use notes_mcp_server::calendar::client::CalendarClient;
use notes_mcp_server::config::Config;
use notes_mcp_server::error::Result;
use notes_mcp_server::mcp::server::McpServer;
use notes_mcp_server::mcp::tools::ToolHandler;
use notes_mcp_server::notes::store::NoteStore;

/// Notes MCP Server
#[derive(Parser)]
#[command(name = "notes-mcp-server")]
#[command(author, version, about = "Notes MCP Server - A Model Context Protocol server for local notes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Authenticate with Google Calendar
    Auth,
    /// Print the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::new()?;

    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await?,
        Commands::Auth => {
            let authenticator = Authenticator::new(config.calendar.clone()).await?;
            authenticator.authenticate_interactive().await?;
            eprintln!("Authentication completed successfully!");
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    if !config.notes_folder_ready() {
        tracing::warn!(
            "Notes folder '{}' does not exist or is not a directory",
            config.notes_folder.display()
        );
    }

    let notes = NoteStore::from_config(&config);
    let calendar = connect_calendar(&config).await;

    let tool_handler = ToolHandler::new(notes, calendar);
    let mut server = McpServer::new(
        config.server_name.clone(),
        config.server_version.clone(),
        tool_handler,
    );
    server.run_stdio().await?;

    Ok(())
}

/// Calendar tools are optional; the notes tools work without them
async fn connect_calendar(config: &Config) -> Option<Arc<CalendarClient>> {
    if !config.calendar.has_client() {
        tracing::info!("No Google OAuth client configured, calendar tools disabled");
        return None;
    }

    match Authenticator::new(config.calendar.clone()).await {
        Ok(authenticator) => {
            if !authenticator.is_authenticated().await {
                tracing::warn!("Google Calendar not authenticated. Run 'notes-mcp-server auth' first.");
            }
            Some(Arc::new(CalendarClient::new(
                Arc::new(authenticator),
                &config.calendar,
            )))
        }
        Err(e) => {
            tracing::warn!("Calendar tools disabled: {}", e);
            None
        }
    }
}
