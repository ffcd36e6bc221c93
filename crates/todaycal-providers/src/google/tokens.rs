//! OAuth token types and the on-disk token store.
//!
//! The store holds a single `authorized_user` record: the client identity
//! plus the refresh token. Access tokens are short-lived and never written.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::ClientCredentials;

/// Record discriminator written to the token store.
const AUTHORIZED_USER: &str = "authorized_user";

/// Seconds subtracted from the reported lifetime so tokens are refreshed
/// before the server starts rejecting them.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// A short-lived bearer token for API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The bearer token.
    pub token: String,
    /// When the token should be considered expired.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates an access token from a token endpoint response.
    pub fn new(token: impl Into<String>, expires_in_secs: Option<i64>) -> Self {
        let expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS));
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Returns true if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }
}

/// Credentials proving the user authorized this application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    /// Access token, present only right after a consent flow or refresh.
    pub access_token: Option<AccessToken>,
    /// Long-lived token used to mint access tokens.
    pub refresh_token: Option<String>,
    /// The client identity the token was issued to.
    pub client: ClientCredentials,
}

impl AuthorizationToken {
    /// Creates a token from a persisted refresh token.
    pub fn from_refresh_token(refresh_token: impl Into<String>, client: ClientCredentials) -> Self {
        Self {
            access_token: None,
            refresh_token: Some(refresh_token.into()),
            client,
        }
    }

    /// Returns true if the token can be refreshed without user interaction.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// The serialized token store record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    /// Always `authorized_user`.
    #[serde(rename = "type")]
    pub kind: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// The refresh token.
    pub refresh_token: String,
}

impl StoredToken {
    /// Builds the record for a refresh token and the client it belongs to.
    pub fn new(client: &ClientCredentials, refresh_token: impl Into<String>) -> Self {
        Self {
            kind: AUTHORIZED_USER.to_string(),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            refresh_token: refresh_token.into(),
        }
    }

    fn into_token(self) -> Result<AuthorizationToken, String> {
        if self.kind != AUTHORIZED_USER {
            return Err(format!("unexpected record type '{}'", self.kind));
        }
        if self.refresh_token.is_empty() {
            return Err("record has an empty refresh token".to_string());
        }
        Ok(AuthorizationToken::from_refresh_token(
            self.refresh_token,
            ClientCredentials::new(self.client_id, self.client_secret),
        ))
    }
}

/// File-backed token store.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a token store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if a token file exists, valid or not.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the stored token.
    ///
    /// Never fails: a missing, unreadable or malformed store yields `None`
    /// (with a warning for the latter two) so the caller falls back to the
    /// consent flow.
    pub fn load(&self) -> Option<AuthorizationToken> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no token file at {:?}", self.path);
                return None;
            }
            Err(e) => {
                warn!("cannot read token file {:?}: {}", self.path, e);
                return None;
            }
        };

        let record: StoredToken = match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("ignoring malformed token file {:?}: {}", self.path, e);
                return None;
            }
        };

        match record.into_token() {
            Ok(token) => {
                debug!("loaded token from {:?}", self.path);
                Some(token)
            }
            Err(reason) => {
                warn!("ignoring token file {:?}: {}", self.path, reason);
                None
            }
        }
    }

    /// Writes `record`, replacing any previous content.
    ///
    /// The file is written to a sibling temp file and renamed into place; on
    /// Unix it is only readable by the owner.
    pub fn save(&self, record: &StoredToken) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::token_store(format!(
                    "failed to create token directory {}: {}",
                    parent.display(),
                    e
                ))
                .with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| ProviderError::internal(format!("failed to serialize token: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::token_store(format!(
                "failed to write token file {}: {}",
                temp_path.display(),
                e
            ))
            .with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            if let Err(e) = fs::set_permissions(&temp_path, perms) {
                warn!("cannot restrict permissions of {:?}: {}", temp_path, e);
            }
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            ProviderError::token_store(format!(
                "failed to move token file into {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        info!("saved token to {:?}", self.path);
        Ok(())
    }
}
