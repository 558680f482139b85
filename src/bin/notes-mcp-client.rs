//! Notes MCP Client
//!
//! Launches the notes MCP server over stdio and calls its tools, for manual
//! testing.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use notes_mcp_server::client::config::ClientConfig;
use notes_mcp_server::client::display;
use notes_mcp_server::client::interactive::{self, Command};
use notes_mcp_server::client::session::McpClient;

/// Notes MCP Client
#[derive(Parser)]
#[command(name = "notes-mcp-client")]
#[command(author, version, about = "Simple MCP client for testing the notes server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available tools from the server
    ListTools,
    /// List notes from the server
    ListNotes,
    /// Read a specific note
    ReadNote { filename: String },
    /// Read a specific PDF file
    ReadPdf { filename: String },
    /// List upcoming events from Google Calendar
    ListEvents {
        #[arg(long, default_value_t = 10)]
        max_results: u32,
    },
    /// Create an event in Google Calendar
    CreateEvent {
        summary: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Start time in ISO format, e.g. 2024-01-15T14:00:00
        #[arg(long)]
        start_time: Option<String>,
        /// End time in ISO format
        #[arg(long)]
        end_time: Option<String>,
        #[arg(long, default_value = "")]
        location: String,
    },
    /// Start interactive mode
    Interactive,
    /// Print the client configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::new()?;

    let (tool, arguments) = match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
            return Ok(());
        }
        Commands::ListTools => {
            let mut client = connect(&config).await?;
            let tools = client.list_tools().await?;
            display::print_tools(&tools);
            client.disconnect().await?;
            return Ok(());
        }
        Commands::Interactive => return run_interactive(&config).await,
        Commands::ListNotes => ("list_notes", json!({})),
        Commands::ReadNote { filename } => ("read_note", json!({ "filename": filename })),
        Commands::ReadPdf { filename } => ("read_pdf", json!({ "filename": filename })),
        Commands::ListEvents { max_results } => {
            ("list_calendar_events", json!({ "max_results": max_results }))
        }
        Commands::CreateEvent {
            summary,
            description,
            start_time,
            end_time,
            location,
        } => (
            "create_calendar_event",
            json!({
                "summary": summary,
                "description": description,
                "start_time": start_time,
                "end_time": end_time,
                "location": location,
            }),
        ),
    };

    let mut client = connect(&config).await?;
    let result = call_and_print(&mut client, tool, arguments).await;
    client.disconnect().await?;
    result
}

async fn connect(config: &ClientConfig) -> anyhow::Result<McpClient> {
    display::print_info(format!("Connecting to MCP server via stdio ({})...", config.command));
    let client = McpClient::connect(config)
        .await
        .with_context(|| format!("failed to connect to '{}'", config.command))?;
    if let Some(info) = client.server_info() {
        display::print_info(format!("Connected to {} {}", info.name, info.version));
    }
    Ok(client)
}

async fn call_and_print(client: &mut McpClient, tool: &str, arguments: Value) -> anyhow::Result<()> {
    let result = client
        .call_tool(tool, arguments)
        .await
        .with_context(|| format!("failed to call tool {}", tool))?;
    display::print_result(tool, &result);
    Ok(())
}

async fn run_interactive(config: &ClientConfig) -> anyhow::Result<()> {
    let mut client = connect(config).await?;
    let tools = client.list_tools().await?;
    display::print_tools(&tools);
    display::print_info("\nInteractive mode - type 'help' for commands, 'quit' to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match interactive::parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{}", interactive::HELP),
            Command::Tools => display::print_tools(&tools),
            Command::Invalid(message) => display::print_error(message),
            Command::Call { tool, arguments } => {
                // Keep the session alive after a failed call.
                if let Err(e) = call_and_print(&mut client, &tool, arguments).await {
                    display::print_error(format!("{:#}", e));
                }
            }
        }
    }

    client.disconnect().await?;
    Ok(())
}
