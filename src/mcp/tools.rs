//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::calendar::client::CalendarClient;
use crate::calendar::types::{EventQuery, NewEvent};
use crate::mcp::types::{CallToolResult, Tool};
use crate::notes::store::NoteStore;

const CALENDAR_UNAVAILABLE: &str =
    "Google Calendar service not available. Please check credentials.";

/// Tool handler
pub struct ToolHandler {
    notes: NoteStore,
    calendar: Option<Arc<CalendarClient>>,
}

impl ToolHandler {
    /// Create a new tool handler; calendar tools fail cleanly without a client
    pub fn new(notes: NoteStore, calendar: Option<Arc<CalendarClient>>) -> Self {
        Self { notes, calendar }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                "list_notes",
                "List all available text and PDF files in the notes folder",
                json!({"type": "object", "properties": {}}),
            ),
            tool_def(
                "read_note",
                "Read a note from the notes folder; PDF files are returned as extracted text",
                filename_schema("Name of the file to read, e.g. 'ideas.txt'"),
            ),
            tool_def(
                "read_pdf",
                "Read the text content of a PDF file from the notes folder",
                filename_schema("Name of the PDF file to read"),
            ),
            tool_def(
                "create_calendar_event",
                "Create an event in Google Calendar",
                create_calendar_event_schema(),
            ),
            tool_def(
                "list_calendar_events",
                "List upcoming events from Google Calendar",
                list_calendar_events_schema(),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        tracing::debug!("Calling tool {}", name);
        match name {
            "list_notes" => self.handle_list_notes(),
            "read_note" => self.handle_read(args, NoteStore::read_note),
            "read_pdf" => self.handle_read(args, NoteStore::read_pdf),
            "create_calendar_event" => self.handle_create_event(args).await,
            "list_calendar_events" => self.handle_list_events(args).await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    // ==================== Tool Handlers ====================

    fn handle_list_notes(&self) -> CallToolResult {
        match self.notes.list_notes() {
            Ok(notes) => match serde_json::to_string_pretty(&notes) {
                Ok(text) => CallToolResult::text(text),
                Err(e) => CallToolResult::error(e.to_string()),
            },
            Err(e) => CallToolResult::error(format!("Error listing notes: {}", e)),
        }
    }

    fn handle_read<F>(&self, args: Value, read: F) -> CallToolResult
    where
        F: Fn(&NoteStore, &str) -> Result<String, crate::error::NoteError>,
    {
        #[derive(Deserialize)]
        struct Args {
            filename: String,
        }

        let args: Args = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        match read(&self.notes, &args.filename) {
            Ok(content) => CallToolResult::text(content),
            Err(e) => {
                tracing::debug!("Read of '{}' failed: {}", args.filename, e);
                CallToolResult::error(e.to_string())
            }
        }
    }

    async fn handle_create_event(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            summary: String,
            #[serde(default)]
            description: String,
            #[serde(default)]
            start_time: Option<String>,
            #[serde(default)]
            end_time: Option<String>,
            #[serde(default)]
            location: String,
        }

        let Some(calendar) = &self.calendar else {
            return CallToolResult::error(CALENDAR_UNAVAILABLE);
        };

        let args: Args = match parse_args(args) {
            Ok(a) => a,
            Err(e) => return e,
        };

        let event = NewEvent {
            summary: args.summary,
            description: args.description,
            location: args.location,
            start_time: args.start_time,
            end_time: args.end_time,
        };

        match calendar.create_event(event).await {
            Ok(created) => {
                let mut text = format!("Event created successfully with ID: {}\n", created.id);
                text.push_str(&format!("Summary: {}\n", created.summary));
                if let Some(start) = &created.start.date_time {
                    text.push_str(&format!("Start: {}\n", start));
                }
                if let Some(end) = &created.end.date_time {
                    text.push_str(&format!("End: {}\n", end));
                }
                if let Some(link) = &created.html_link {
                    text.push_str(&format!("Link: {}\n", link));
                }
                CallToolResult::text(text)
            }
            Err(e) => CallToolResult::error(format!("Failed to create calendar event: {}", e)),
        }
    }

    async fn handle_list_events(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize, Default)]
        struct Args {
            max_results: Option<u32>,
            time_min: Option<String>,
            time_max: Option<String>,
        }

        let Some(calendar) = &self.calendar else {
            return CallToolResult::error(CALENDAR_UNAVAILABLE);
        };

        let args: Args = if args.is_null() {
            Args::default()
        } else {
            match parse_args(args) {
                Ok(a) => a,
                Err(e) => return e,
            }
        };

        let query = EventQuery {
            max_results: args.max_results,
            time_min: args.time_min,
            time_max: args.time_max,
        };

        match calendar.list_events(query).await {
            Ok(events) => match serde_json::to_string_pretty(&events) {
                Ok(text) => CallToolResult::text(text),
                Err(e) => CallToolResult::error(e.to_string()),
            },
            Err(e) => CallToolResult::error(format!("Failed to list calendar events: {}", e)),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CallToolResult> {
    serde_json::from_value(args)
        .map_err(|e| CallToolResult::error(format!("Invalid arguments: {}", e)))
}

// ==================== Tool Schemas ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn filename_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "filename": {
                "type": "string",
                "description": description
            }
        },
        "required": ["filename"]
    })
}

fn create_calendar_event_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {
                "type": "string",
                "description": "Event title"
            },
            "description": {
                "type": "string",
                "description": "Event description"
            },
            "start_time": {
                "type": "string",
                "description": "Start time in ISO format (e.g. '2024-01-15T14:00:00'); defaults to one hour from now"
            },
            "end_time": {
                "type": "string",
                "description": "End time in ISO format; defaults to one hour after start"
            },
            "location": {
                "type": "string",
                "description": "Event location"
            }
        },
        "required": ["summary"]
    })
}

fn list_calendar_events_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "max_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": 2500,
                "description": "Maximum number of events to return (default: 10)"
            },
            "time_min": {
                "type": "string",
                "description": "Only events ending after this ISO time (default: now)"
            },
            "time_max": {
                "type": "string",
                "description": "Only events starting before this ISO time"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn handler(dir: &TempDir) -> ToolHandler {
        let store = NoteStore::new(
            dir.path(),
            vec![".txt".to_string(), ".pdf".to_string()],
            64,
            encoding_rs::UTF_8,
        );
        ToolHandler::new(store, None)
    }

    #[test]
    fn test_every_tool_declares_object_schema() {
        let dir = TempDir::new().unwrap();
        let tools = handler(&dir).list_tools();
        assert_eq!(tools.len(), 5);
        for tool in tools {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn test_read_note_tool() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hello.txt"), "hi there").unwrap();
        let handler = handler(&dir);

        let ok = handler.call_tool("read_note", json!({"filename": "hello.txt"})).await;
        assert!(!ok.is_error);
        assert_eq!(ok.joined_text(), "hi there");

        let missing = handler.call_tool("read_note", json!({})).await;
        assert!(missing.is_error);
        assert!(missing.joined_text().contains("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_calendar_tools_without_client() {
        let dir = TempDir::new().unwrap();
        let result = handler(&dir)
            .call_tool("create_calendar_event", json!({"summary": "x"}))
            .await;
        assert!(result.is_error);
        assert!(result.joined_text().contains("not available"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let result = handler(&dir).call_tool("write_note", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.joined_text(), "Error: Unknown tool: write_note");
    }
}
