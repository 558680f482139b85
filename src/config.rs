//! Configuration management for the Notes MCP Server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::{ConfigError, NotesMcpError, Result};

/// Default server name reported during `initialize`
pub const DEFAULT_SERVER_NAME: &str = "Simple Note Reader";

/// Default maximum note size (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Configuration for the Notes MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Name reported to clients
    pub server_name: String,

    /// Version reported to clients
    pub server_version: String,

    /// Directory holding the readable notes
    pub notes_folder: PathBuf,

    /// Allowed extensions, lower-case with a leading dot
    pub supported_extensions: Vec<String>,

    /// Maximum note size in bytes
    pub max_file_size: u64,

    /// Text encoding for non-PDF notes
    pub encoding: &'static encoding_rs::Encoding,

    /// Force debug logging
    pub debug: bool,

    /// Log level used when RUST_LOG is unset
    pub log_level: String,

    /// Google Calendar settings
    pub calendar: CalendarConfig,
}

/// Google Calendar and OAuth settings
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// OAuth client id from the environment
    pub client_id: Option<String>,

    /// OAuth client secret from the environment
    pub client_secret: Option<String>,

    /// Path to the OAuth client secrets file
    pub credentials_path: PathBuf,

    /// Path to stored credentials (access/refresh tokens)
    pub token_path: PathBuf,

    /// OAuth scopes
    pub scopes: Vec<String>,

    /// OAuth callback port (0 picks a free port)
    pub oauth_callback_port: u16,

    /// Calendar API base URL
    pub api_base_url: String,

    /// Calendar the tools operate on
    pub calendar_id: String,

    /// Time zone attached to created events
    pub time_zone: String,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn new() -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supported_extensions = parse_extensions(
            &var("SUPPORTED_EXTENSIONS").unwrap_or_else(|| ".txt,.pdf".to_string()),
        );
        if supported_extensions.is_empty() {
            return Err(invalid("SUPPORTED_EXTENSIONS", "no extensions configured"));
        }

        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("MAX_FILE_SIZE", &format!("'{}': {}", raw, e)))?,
            None => DEFAULT_MAX_FILE_SIZE,
        };

        let encoding_label = var("ENCODING").unwrap_or_else(|| "utf-8".to_string());
        let encoding = encoding_rs::Encoding::for_label(encoding_label.trim().as_bytes())
            .ok_or_else(|| invalid("ENCODING", &format!("unknown encoding '{}'", encoding_label)))?;

        let debug = var("DEBUG")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            server_name: var("SERVER_NAME").unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            server_version: var("SERVER_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            notes_folder: PathBuf::from(var("NOTES_FOLDER").unwrap_or_else(|| "notes".to_string())),
            supported_extensions,
            max_file_size,
            encoding,
            debug,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            calendar: CalendarConfig::from_lookup(&var)?,
        })
    }

    /// Effective tracing filter directive
    pub fn log_directive(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.to_lowercase()
        }
    }

    /// Check that the notes folder exists and is a directory
    pub fn notes_folder_ready(&self) -> bool {
        self.notes_folder.is_dir()
    }

    /// Summary of the active configuration, without secrets
    pub fn summary(&self) -> Value {
        json!({
            "server_name": self.server_name,
            "server_version": self.server_version,
            "notes_folder": self.notes_folder.display().to_string(),
            "supported_extensions": self.supported_extensions,
            "max_file_size": self.max_file_size,
            "encoding": self.encoding.name(),
            "debug": self.debug,
            "log_level": self.log_level,
            "calendar": {
                "client_id_set": self.calendar.client_id.is_some(),
                "credentials_file": self.calendar.credentials_path.display().to_string(),
                "token_file": self.calendar.token_path.display().to_string(),
                "scopes": self.calendar.scopes,
                "calendar_id": self.calendar.calendar_id,
                "time_zone": self.calendar.time_zone,
            }
        })
    }
}

impl CalendarConfig {
    fn from_lookup<F>(var: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials_path = match var("GOOGLE_CREDENTIALS_FILE") {
            Some(path) => PathBuf::from(path),
            None => {
                let local = PathBuf::from("credentials.json");
                if local.exists() {
                    local
                } else {
                    config_dir()?.join("credentials.json")
                }
            }
        };

        let token_path = match var("GOOGLE_TOKEN_FILE") {
            Some(path) => PathBuf::from(path),
            None => config_dir()?.join("token.json"),
        };

        let oauth_callback_port = match var("GOOGLE_OAUTH_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| invalid("GOOGLE_OAUTH_PORT", &format!("'{}': {}", raw, e)))?,
            None => 0,
        };

        let scopes: Vec<String> = var("GOOGLE_SCOPES")
            .unwrap_or_else(|| google::CALENDAR_SCOPE.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            client_id: var("GOOGLE_CLIENT_ID"),
            client_secret: var("GOOGLE_CLIENT_SECRET"),
            credentials_path,
            token_path,
            scopes,
            oauth_callback_port,
            api_base_url: var("GOOGLE_CALENDAR_API_URL")
                .unwrap_or_else(|| google::API_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            calendar_id: var("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            time_zone: var("CALENDAR_TIMEZONE").unwrap_or_else(|| "Europe/Berlin".to_string()),
        })
    }

    /// Whether any OAuth client source is available
    pub fn has_client(&self) -> bool {
        (self.client_id.is_some() && self.client_secret.is_some()) || self.credentials_path.exists()
    }
}

/// Per-user directory for tokens and client secrets
fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".notes-mcp"))
        .ok_or_else(|| {
            NotesMcpError::Config(ConfigError::DirNotFound {
                path: "~".to_string(),
            })
        })
}

fn invalid(var: &str, message: &str) -> NotesMcpError {
    NotesMcpError::Config(ConfigError::InvalidValue {
        var: var.to_string(),
        message: message.to_string(),
    })
}

/// Normalise a comma-separated extension list to `.ext` lower-case entries
pub fn parse_extensions(raw: &str) -> Vec<String> {
    let mut extensions: Vec<String> = Vec::new();
    for item in raw.split(',') {
        let item = item.trim().trim_start_matches('.').to_lowercase();
        if item.is_empty() {
            continue;
        }
        let ext = format!(".{}", item);
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }
    extensions
}

/// Extension of `path` in the normalised `.ext` form
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

/// Google API constants
pub mod google {
    /// Base URL for the Calendar API
    pub const API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

    /// Default OAuth scope
    pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

    /// OAuth endpoints used when the client comes from the environment
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        map.entry("GOOGLE_CREDENTIALS_FILE".to_string())
            .or_insert_with(|| "/nonexistent/credentials.json".to_string());
        map.entry("GOOGLE_TOKEN_FILE".to_string())
            .or_insert_with(|| "/nonexistent/token.json".to_string());
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.notes_folder, PathBuf::from("notes"));
        assert_eq!(config.supported_extensions, vec![".txt", ".pdf"]);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.encoding, encoding_rs::UTF_8);
        assert_eq!(config.calendar.scopes, vec![google::CALENDAR_SCOPE]);
        assert_eq!(config.calendar.calendar_id, "primary");
        assert!(!config.debug);
    }

    #[test]
    fn test_extensions_normalised() {
        assert_eq!(parse_extensions(" TXT, .md ,,.txt"), vec![".txt", ".md"]);
        assert!(parse_extensions(" , ").is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Config::from_lookup(lookup(&[("MAX_FILE_SIZE", "ten")])).unwrap_err();
        assert!(matches!(err, NotesMcpError::Config(_)));

        let err = Config::from_lookup(lookup(&[("ENCODING", "klingon")])).unwrap_err();
        assert!(err.to_string().contains("ENCODING"));

        let err = Config::from_lookup(lookup(&[("SUPPORTED_EXTENSIONS", ",")]));
        assert!(err.is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let config =
            Config::from_lookup(lookup(&[("DEBUG", "TRUE"), ("LOG_LEVEL", "WARN")])).unwrap();
        assert_eq!(config.log_directive(), "debug");

        let config = Config::from_lookup(lookup(&[("LOG_LEVEL", "WARN")])).unwrap();
        assert_eq!(config.log_directive(), "warn");
    }

    #[test]
    fn test_summary_hides_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "very-secret"),
        ]))
        .unwrap();
        assert!(config.calendar.has_client());
        let summary = config.summary().to_string();
        assert!(!summary.contains("very-secret"));
        assert!(summary.contains("\"client_id_set\":true"));
    }
}
