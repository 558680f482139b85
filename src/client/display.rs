//! Terminal output for the test client

use colored::Colorize;

use crate::mcp::types::{CallToolResult, Tool, ToolResultContent};

/// Print the tool list as an aligned table
pub fn print_tools(tools: &[Tool]) {
    if tools.is_empty() {
        println!("{}", "No tools available".red());
        return;
    }

    println!("{}", format!("Available Tools ({})", tools.len()).bold());
    let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for tool in tools {
        let params = tool.parameter_names();
        let params = if params.is_empty() {
            "None".to_string()
        } else {
            params.join(", ")
        };
        println!(
            "  {:<width$}  {}  {}",
            tool.name.cyan(),
            tool.description.as_deref().unwrap_or("No description"),
            format!("[{}]", params).yellow(),
            width = width
        );
    }
}

/// Print a tool result under a heading
pub fn print_result(tool_name: &str, result: &CallToolResult) {
    let heading = format!("Result from {}", tool_name);
    if result.is_error {
        println!("{}", heading.red().bold());
    } else {
        println!("{}", heading.green().bold());
    }

    for item in &result.content {
        match item {
            ToolResultContent::Text { text } => println!("{}", text),
            ToolResultContent::Image { mime_type, data } => {
                println!("{}", format!("[image {}, {} bytes base64]", mime_type, data.len()).dimmed())
            }
        }
    }
}

pub fn print_error(message: impl std::fmt::Display) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn print_info(message: impl std::fmt::Display) {
    eprintln!("{}", message.to_string().blue());
}
