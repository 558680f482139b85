//! OAuth authentication for the Google Calendar API
//!
//! Handles OAuth 2.0 authentication flow including:
//! - Loading client credentials (environment or client secrets file)
//! - Interactive browser-based authentication
//! - Token storage (owner-only file permissions) and refresh

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::{google, CalendarConfig};
use crate::error::{AuthError, NotesMcpError, Result};

/// Seconds before expiry at which a token is refreshed
const REFRESH_MARGIN_SECS: i64 = 300;

/// OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Auth URI
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    /// Token URI
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    google::AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    google::TOKEN_URI.to_string()
}

impl OAuthKeys {
    /// Client with Google's standard endpoints
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
        }
    }

    /// Resolve the client from the environment first, then the secrets file
    pub fn resolve(config: &CalendarConfig) -> Result<Self> {
        if let (Some(id), Some(secret)) = (&config.client_id, &config.client_secret) {
            return Ok(Self::new(id.clone(), secret.clone()));
        }

        let path = &config.credentials_path;
        if !path.exists() {
            return Err(NotesMcpError::Auth(AuthError::ClientNotConfigured {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path)?;
        let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

        keys_file
            .installed
            .ok_or(NotesMcpError::Auth(AuthError::InvalidKeysFormat))
    }
}

/// OAuth keys file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Stored credentials (tokens)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Access token
    #[serde(alias = "token")]
    pub access_token: String,

    /// Refresh token
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Scopes
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredCredentials {
    fn needs_refresh(&self, now: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - now < REFRESH_MARGIN_SECS)
            .unwrap_or(false)
    }
}

/// Token response from OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

impl TokenResponse {
    fn into_credentials(self, fallback_refresh: Option<String>) -> StoredCredentials {
        StoredCredentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            token_type: self.token_type,
            expiry_date: self.expires_in.map(|e| unix_now() + e),
            scope: self.scope,
        }
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// OAuth authenticator
pub struct Authenticator {
    /// Calendar configuration
    config: CalendarConfig,

    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth client credentials
    keys: OAuthKeys,

    /// Current credentials (tokens)
    credentials: Arc<RwLock<Option<StoredCredentials>>>,
}

impl Authenticator {
    /// Create a new authenticator, loading any stored token
    pub async fn new(config: CalendarConfig) -> Result<Self> {
        let keys = OAuthKeys::resolve(&config)?;

        let mut credentials = None;
        if config.token_path.exists() {
            match load_credentials(&config.token_path).await {
                Ok(creds) => credentials = Some(creds),
                Err(e) => tracing::warn!(
                    "Ignoring unreadable token file {}: {}",
                    config.token_path.display(),
                    e
                ),
            }
        }

        Ok(Self::with_credentials(config, keys, credentials))
    }

    /// Create an authenticator from already-known keys and tokens
    pub fn with_credentials(
        config: CalendarConfig,
        keys: OAuthKeys,
        credentials: Option<StoredCredentials>,
    ) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            keys,
            credentials: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Save credentials to the token file, readable by the owner only
    async fn save_credentials(&self, credentials: &StoredCredentials) -> Result<()> {
        let content = serde_json::to_string_pretty(credentials)?;
        write_private(&self.config.token_path, content.as_bytes()).await?;
        tracing::debug!("Saved token to {}", self.config.token_path.display());
        Ok(())
    }

    /// Check if we have credentials
    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        let creds = self.credentials.read().await.clone();

        match creds {
            Some(creds) if creds.needs_refresh(unix_now()) => {
                tracing::debug!("Access token expired or expiring soon, refreshing");
                self.refresh_token(creds.refresh_token).await
            }
            Some(creds) => Ok(creds.access_token),
            None => Err(NotesMcpError::Auth(AuthError::CredentialsNotFound {
                path: self.config.token_path.display().to_string(),
            })),
        }
    }

    /// Refresh the access token using the refresh token
    async fn refresh_token(&self, refresh_token: Option<String>) -> Result<String> {
        let refresh_token = refresh_token.ok_or_else(|| {
            NotesMcpError::Auth(AuthError::TokenRefreshFailed {
                message: "No refresh token available".to_string(),
            })
        })?;

        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotesMcpError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let new_credentials = token_response.into_credentials(Some(refresh_token));

        self.save_credentials(&new_credentials).await?;
        let access_token = new_credentials.access_token.clone();
        *self.credentials.write().await = Some(new_credentials);

        Ok(access_token)
    }

    /// Generate the authorization URL
    pub fn generate_auth_url(&self, redirect_uri: &str) -> String {
        let scopes = self.config.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.keys.auth_uri,
            urlencoding::encode(&self.keys.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes)
        )
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<StoredCredentials> {
        let params = [
            ("client_id", self.keys.client_id.as_str()),
            ("client_secret", self.keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&self.keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotesMcpError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let token_response: TokenResponse = response.json().await?;
        let credentials = token_response.into_credentials(None);

        self.save_credentials(&credentials).await?;
        *self.credentials.write().await = Some(credentials.clone());

        Ok(credentials)
    }

    /// Run interactive authentication flow with local HTTP server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use tokio::sync::oneshot;

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}/oauth2callback", port);

        let auth_url = self.generate_auth_url(&redirect_uri);
        eprintln!("\nPlease visit this URL to authenticate:");
        eprintln!("{}\n", auth_url);

        // Try to open in browser
        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        // Create channel for receiving the auth code
        let (tx, rx) = oneshot::channel::<std::result::Result<String, String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let callback_handler = move |Query(params): Query<HashMap<String, String>>| {
            let tx = tx.clone();
            async move {
                let outcome = match (params.get("code"), params.get("error")) {
                    (Some(code), _) => Ok(code.clone()),
                    (None, Some(error)) => Err(error.clone()),
                    (None, None) => Err("no authorization code received".to_string()),
                };
                let page = match &outcome {
                    Ok(_) => Html("<html><body><h1>Authentication successful!</h1><p>You can close this window.</p></body></html>"),
                    Err(_) => Html("<html><body><h1>Authentication failed</h1><p>No authorization code received.</p></body></html>"),
                };
                if let Some(tx) = tx.lock().ok().and_then(|mut guard| guard.take()) {
                    let _ = tx.send(outcome);
                }
                page
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback_handler));

        eprintln!("Waiting for authentication callback on port {}...", port);

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    return Err(NotesMcpError::Auth(AuthError::CallbackError {
                        message: e.to_string(),
                    }));
                }
            }
            code = rx => {
                match code {
                    Ok(Ok(code)) => {
                        eprintln!("Received authorization code, exchanging for tokens...");
                        self.exchange_code(&code, &redirect_uri).await?;
                        tracing::info!("Token saved to {}", self.config.token_path.display());
                    }
                    Ok(Err(message)) => {
                        return Err(NotesMcpError::Auth(AuthError::CallbackError { message }));
                    }
                    Err(_) => {
                        return Err(NotesMcpError::Auth(AuthError::NoAuthCode));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Load stored credentials from file
async fn load_credentials(path: &Path) -> Result<StoredCredentials> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `bytes` to `path` with owner-only permissions, creating parent directories
pub async fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;

    // `mode` only applies on creation; tighten a pre-existing file before writing.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }

    file.write_all(bytes).await?;
    file.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn calendar_config(dir: &Path) -> CalendarConfig {
        CalendarConfig {
            client_id: None,
            client_secret: None,
            credentials_path: dir.join("credentials.json"),
            token_path: dir.join("tokens").join("token.json"),
            scopes: vec![google::CALENDAR_SCOPE.to_string()],
            oauth_callback_port: 0,
            api_base_url: google::API_BASE_URL.to_string(),
            calendar_id: "primary".to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    #[test]
    fn test_oauth_keys_deserialize() {
        let json = r#"{
            "web": {
                "client_id": "test-client-id",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let keys_file: OAuthKeysFile = serde_json::from_str(json).unwrap();
        let keys = keys_file.installed.unwrap();
        assert_eq!(keys.client_id, "test-client-id");
        assert_eq!(keys.token_uri, google::TOKEN_URI);
    }

    #[test]
    fn test_keys_prefer_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = calendar_config(dir.path());
        assert!(matches!(
            OAuthKeys::resolve(&config),
            Err(NotesMcpError::Auth(AuthError::ClientNotConfigured { .. }))
        ));

        config.client_id = Some("env-id".to_string());
        config.client_secret = Some("env-secret".to_string());
        assert_eq!(OAuthKeys::resolve(&config).unwrap().client_id, "env-id");
    }

    #[test]
    fn test_stored_credentials_accepts_token_alias() {
        let json = r#"{"token": "abc", "refresh_token": "def"}"#;
        let creds: StoredCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.access_token, "abc");
        assert_eq!(creds.token_type, "Bearer");
        assert!(!creds.needs_refresh(unix_now()));
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let auth = Authenticator::with_credentials(
            calendar_config(dir.path()),
            OAuthKeys::new("id", "secret"),
            None,
        );
        assert!(!auth.is_authenticated().await);
        let err = auth.get_access_token().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let creds = StoredCredentials {
            access_token: "stale".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry_date: Some(unix_now() - 10),
            scope: String::new(),
        };
        let auth = Authenticator::with_credentials(
            calendar_config(dir.path()),
            OAuthKeys::new("id", "secret"),
            Some(creds),
        );
        assert!(matches!(
            auth.get_access_token().await,
            Err(NotesMcpError::Auth(AuthError::TokenRefreshFailed { .. }))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("nested").join("token.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&path, b"{}").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
