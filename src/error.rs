//! Error types for the Notes MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Notes MCP Server
#[derive(Error, Debug)]
pub enum NotesMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Google Calendar API errors
    #[error("Calendar API error: {0}")]
    Calendar(#[from] CalendarApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Note access errors
    #[error("{0}")]
    Note(#[from] NoteError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised while listing or reading notes
#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Notes folder '{path}' is not available: {message}")]
    FolderUnavailable { path: String, message: String },

    #[error("Invalid filename '{name}': {reason}")]
    InvalidFilename { name: String, reason: String },

    #[error("Filename '{name}' resolves outside the notes folder")]
    PathTraversal { name: String },

    #[error("Unsupported file type for '{name}' (allowed: {allowed})")]
    UnsupportedExtension { name: String, allowed: String },

    #[error("File '{name}' not found in notes folder")]
    NotFound { name: String },

    #[error("File '{name}' is too large ({size} bytes > {max} bytes)")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("Failed to decode '{name}' as {encoding}")]
    Decode { name: String, encoding: String },

    #[error("Failed to extract text from PDF '{name}': {message}")]
    Pdf { name: String, message: String },

    #[error("Error reading file '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No OAuth client configured: set GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET or provide {path}")]
    ClientNotConfigured { path: String },

    #[error("Invalid OAuth keys format: expected 'installed' or 'web' credentials")]
    InvalidKeysFormat,

    #[error("Token file not found: {path}. Run 'notes-mcp-server auth' first")]
    CredentialsNotFound { path: String },

    #[error("Credentials rejected by Google ({status}): {message}")]
    InvalidCredentials { status: u16, message: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Google Calendar API errors
#[derive(Error, Debug)]
pub enum CalendarApiError {
    #[error("API request failed: {message}")]
    RequestFailed { message: String },

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Server returned error {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },

    #[error("Timed out after {secs}s waiting for {method}")]
    Timeout { method: String, secs: u64 },
}

/// Result type alias for Notes MCP operations
pub type Result<T> = std::result::Result<T, NotesMcpError>;

impl NotesMcpError {
    /// Whether this error means the user must (re)authenticate
    pub fn is_auth(&self) -> bool {
        matches!(self, NotesMcpError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NoteError::TooLarge {
            name: "big.txt".to_string(),
            size: 20,
            max: 10,
        };
        assert_eq!(err.to_string(), "File 'big.txt' is too large (20 bytes > 10 bytes)");
    }

    #[test]
    fn test_error_conversion() {
        let auth_err = AuthError::NoAuthCode;
        let err: NotesMcpError = auth_err.into();
        assert!(err.is_auth());

        let note_err: NotesMcpError = NoteError::NotFound {
            name: "x.txt".to_string(),
        }
        .into();
        assert!(!note_err.is_auth());
        assert!(note_err.to_string().contains("not found"));
    }
}
