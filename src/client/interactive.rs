//! Interactive mode command parsing

use serde_json::{json, Value};

pub const HELP: &str = "\
Available commands:
- list_notes: List all available notes
- read_note <filename>: Read a specific note
- read_pdf <filename>: Read a specific PDF file
- list_calendar_events [max_results]: List upcoming calendar events
- create_calendar_event <summary>: Create a calendar event starting in an hour
- call <tool> [json arguments]: Call any tool
- tools: Show available tools
- quit/exit: Exit interactive mode";

/// One parsed line of interactive input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Tools,
    Quit,
    Empty,
    /// Invoke `tool` with `arguments`
    Call { tool: String, arguments: Value },
    /// Input that could not be understood, with a usage hint
    Invalid(String),
}

/// Parse a line typed at the prompt
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let head = head.to_lowercase().replace('-', "_");

    match head.as_str() {
        "help" | "?" => Command::Help,
        "tools" => Command::Tools,
        "quit" | "exit" => Command::Quit,
        "list_notes" => call("list_notes", json!({})),
        "read_note" | "read_pdf" => {
            if rest.is_empty() {
                Command::Invalid(format!("Usage: {} <filename>", head))
            } else {
                call(&head, json!({ "filename": rest }))
            }
        }
        "list_calendar_events" => {
            if rest.is_empty() {
                call("list_calendar_events", json!({}))
            } else {
                match rest.parse::<u32>() {
                    Ok(n) => call("list_calendar_events", json!({ "max_results": n })),
                    Err(_) => Command::Invalid("Usage: list_calendar_events [max_results]".to_string()),
                }
            }
        }
        "create_calendar_event" => {
            if rest.is_empty() {
                Command::Invalid("Usage: create_calendar_event <summary>".to_string())
            } else {
                call("create_calendar_event", json!({ "summary": rest }))
            }
        }
        "call" => parse_generic_call(rest),
        _ => Command::Invalid("Unknown command. Type 'help' for available commands.".to_string()),
    }
}

fn parse_generic_call(rest: &str) -> Command {
    let (tool, raw_args) = match rest.split_once(char::is_whitespace) {
        Some((tool, args)) => (tool, args.trim()),
        None => (rest, ""),
    };
    if tool.is_empty() {
        return Command::Invalid("Usage: call <tool> [json arguments]".to_string());
    }
    if raw_args.is_empty() {
        return call(tool, json!({}));
    }
    match serde_json::from_str::<Value>(raw_args) {
        Ok(arguments) if arguments.is_object() => call(tool, arguments),
        Ok(_) => Command::Invalid("Arguments must be a JSON object".to_string()),
        Err(e) => Command::Invalid(format!("Invalid JSON arguments: {}", e)),
    }
}

fn call(tool: &str, arguments: Value) -> Command {
    Command::Call {
        tool: tool.to_string(),
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filenames_keep_case_and_spaces() {
        assert_eq!(
            parse_command("read_note My Notes.txt"),
            call("read_note", json!({"filename": "My Notes.txt"}))
        );
        assert_eq!(
            parse_command("READ-PDF Paper.PDF"),
            call("read_pdf", json!({"filename": "Paper.PDF"}))
        );
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("exit"), Command::Quit);
        assert_eq!(parse_command("tools"), Command::Tools);
        assert_eq!(parse_command("list-notes"), call("list_notes", json!({})));
        assert_eq!(
            parse_command("list_calendar_events 3"),
            call("list_calendar_events", json!({"max_results": 3}))
        );
        assert!(matches!(parse_command("read_note"), Command::Invalid(_)));
        assert!(matches!(parse_command("list_calendar_events many"), Command::Invalid(_)));
        assert!(matches!(parse_command("frobnicate"), Command::Invalid(_)));
    }

    #[test]
    fn test_generic_call() {
        assert_eq!(
            parse_command(r#"call read_note {"filename": "a.txt"}"#),
            call("read_note", json!({"filename": "a.txt"}))
        );
        assert!(matches!(parse_command("call read_note [1]"), Command::Invalid(_)));
        assert!(matches!(parse_command("call"), Command::Invalid(_)));
    }
}
