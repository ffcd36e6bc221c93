//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// The application's OAuth 2.0 client identity.
///
/// This identifies the application (not the user) to Google. Operators
/// download it from the Google Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Creates new client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads client credentials from a Google Cloud Console JSON file.
    ///
    /// A missing file is reported as `ConfigMissing`, an unreadable or
    /// malformed one as `ConfigInvalid`.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            let message = format!("cannot read credentials file {}: {}", path.display(), e);
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::config_missing(message)
            } else {
                ProviderError::config_invalid(message)
            }
        })?;
        Self::from_json(&content).map_err(|e| {
            ProviderError::config_invalid(format!("{}: {}", path.display(), e))
        })
    }

    /// Parses client credentials from a Google credentials JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level".to_string())
    }

    /// Validates that the credentials appear to be correctly formatted.
    ///
    /// This checks that:
    /// - Client ID ends with `.apps.googleusercontent.com`
    /// - Client secret is non-empty
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path of the token store.
    pub token_path: PathBuf,

    /// OAuth scopes to request.
    ///
    /// Defaults to `["https://www.googleapis.com/auth/calendar.readonly"]`.
    pub scopes: Vec<String>,

    /// Per-request timeout.
    pub timeout: Duration,

    /// How long to wait for the user to finish the consent screen.
    pub consent_timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    ///
    /// The consent flow binds the first free port in this range.
    /// Defaults to (8080, 8090).
    pub loopback_port_range: (u16, u16),

    /// Google Calendar API v3 base URL.
    pub api_base: Url,

    /// OAuth consent page.
    pub auth_url: Url,

    /// OAuth token endpoint.
    pub token_url: Url,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default consent wait in seconds.
    pub const DEFAULT_CONSENT_TIMEOUT_SECS: u64 = 300;

    /// Default OAuth scope for read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    /// Base URL for Google Calendar API v3.
    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Google OAuth consent endpoint.
    pub const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google OAuth token endpoint.
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Creates a new Google configuration storing tokens at `token_path`.
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            consent_timeout: Duration::from_secs(Self::DEFAULT_CONSENT_TIMEOUT_SECS),
            user_agent: format!("fetch-todays-calendar/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            api_base: parse_const_url(Self::DEFAULT_API_BASE),
            auth_url: parse_const_url(Self::DEFAULT_AUTH_URL),
            token_url: parse_const_url(Self::DEFAULT_TOKEN_URL),
        }
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how long the consent flow waits for the browser callback.
    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Points API requests at a different base URL.
    pub fn with_api_base(mut self, url: Url) -> Self {
        self.api_base = url;
        self
    }

    /// Points token requests at a different endpoint.
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.scopes.is_empty() {
            return Err(ProviderError::config_invalid(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::config_invalid(format!(
                "invalid loopback port range {}-{}",
                self.loopback_port_range.0, self.loopback_port_range.1
            )));
        }

        Ok(())
    }
}

fn parse_const_url(url: &'static str) -> Url {
    Url::parse(url).unwrap_or_else(|e| unreachable!("built-in URL {url} is invalid: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validation() {
        let valid = ClientCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        assert!(valid.validate().is_ok());

        let empty_id = ClientCredentials::new("", "secret");
        assert!(empty_id.validate().is_err());

        let bad_id = ClientCredentials::new("bad-id", "secret");
        assert!(bad_id.validate().is_err());

        let empty_secret = ClientCredentials::new("test.apps.googleusercontent.com", "");
        assert!(empty_secret.validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = GoogleConfig::new("/tmp/token.json");
        assert_eq!(config.token_path, PathBuf::from("/tmp/token.json"));
        assert_eq!(config.scopes, vec![GoogleConfig::DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.loopback_port_range, (8080, 8090));
        assert_eq!(config.api_base.as_str(), GoogleConfig::DEFAULT_API_BASE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let no_scopes = GoogleConfig::new("token.json").with_scopes(vec![]);
        assert!(no_scopes.validate().is_err());

        let bad_ports = GoogleConfig::new("token.json").with_loopback_port_range(9000, 8000);
        let err = bad_ports.validate().unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigInvalid);
    }

    #[test]
    fn config_builder_methods() {
        let config = GoogleConfig::new("a.json")
            .with_token_path("b.json")
            .with_timeout(Duration::from_secs(60))
            .with_consent_timeout(Duration::from_secs(10))
            .with_loopback_port_range(9000, 9010)
            .with_api_base(Url::parse("http://127.0.0.1:1234/calendar/v3").unwrap());

        assert_eq!(config.token_path, PathBuf::from("b.json"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.consent_timeout, Duration::from_secs(10));
        assert_eq!(config.loopback_port_range, (9000, 9010));
        assert_eq!(config.api_base.port(), Some(1234));
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{
            "web": {
                "client_id": "web-id.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{
            "type": "authorized_user",
            "client_id": "flat-id.apps.googleusercontent.com",
            "client_secret": "flat-secret",
            "refresh_token": "some-refresh-token"
        }"#;

        let creds = ClientCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "flat-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "flat-secret");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let result = ClientCredentials::from_json(r#"{ "other": {} }"#);
        assert!(result.unwrap_err().contains("client_id"));

        let result = ClientCredentials::from_json("not json");
        assert!(result.unwrap_err().contains("parse"));
    }

    #[test]
    fn credentials_from_missing_file_is_config_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ClientCredentials::from_file(tmp.path().join("credentials.json")).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigMissing);
        assert!(err.message().contains("credentials.json"));
    }

    #[test]
    fn credentials_from_corrupt_file_is_config_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = ClientCredentials::from_file(&path).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigInvalid);
    }
}
