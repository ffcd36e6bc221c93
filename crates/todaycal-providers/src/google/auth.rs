//! Credential management: load a persisted token or run the consent flow.
//!
//! [`CredentialManager::authorize`] walks a small state machine:
//!
//! ```text
//! NoToken ──load ok──▶ TokenLoaded ─────────────────────────▶ session
//!    │
//!    └──credentials──▶ AwaitingConsent ──▶ TokenMinted ──persist──▶ session
//! ```
//!
//! A loaded token yields a session without any network call or write.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::{ClientCredentials, GoogleConfig};
use super::oauth::OAuthClient;
use super::tokens::{AccessToken, AuthorizationToken, StoredToken, TokenStore};

/// Where the credential manager is in acquiring a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing loaded yet.
    NoToken,
    /// A token was read from the store.
    TokenLoaded,
    /// The user is being asked for consent.
    AwaitingConsent,
    /// A consent flow produced a fresh token.
    TokenMinted,
}

/// An interactive authorization that yields a token.
pub trait ConsentFlow: Send + Sync {
    /// Asks the user to authorize `scopes` for the given client.
    fn request_consent<'a>(
        &'a self,
        scopes: &'a [String],
        credentials: &'a ClientCredentials,
    ) -> BoxFuture<'a, ProviderResult<AuthorizationToken>>;
}

impl ConsentFlow for OAuthClient {
    fn request_consent<'a>(
        &'a self,
        scopes: &'a [String],
        credentials: &'a ClientCredentials,
    ) -> BoxFuture<'a, ProviderResult<AuthorizationToken>> {
        Box::pin(self.authorize(scopes, credentials))
    }
}

/// Loads, acquires and persists authorization tokens.
pub struct CredentialManager {
    store: TokenStore,
    oauth: Arc<OAuthClient>,
    consent: Arc<dyn ConsentFlow>,
}

impl CredentialManager {
    /// Creates a manager using the browser consent flow.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let oauth = Arc::new(OAuthClient::new(config)?);
        Ok(Self {
            store: TokenStore::new(&config.token_path),
            consent: oauth.clone(),
            oauth,
        })
    }

    /// Replaces the consent flow.
    pub fn with_consent_flow(mut self, consent: Arc<dyn ConsentFlow>) -> Self {
        self.consent = consent;
        self
    }

    /// Returns the token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Reads the persisted token, if there is a usable one.
    pub fn load_token(&self) -> Option<AuthorizationToken> {
        self.store.load()
    }

    /// Runs the consent flow.
    pub async fn authorize_interactively(
        &self,
        scopes: &[String],
        credentials: &ClientCredentials,
    ) -> ProviderResult<AuthorizationToken> {
        if let Err(reason) = credentials.validate() {
            warn!("client credentials look malformed: {}", reason);
        }
        self.consent.request_consent(scopes, credentials).await
    }

    /// Writes the token's refresh token to the store.
    pub fn persist_token(
        &self,
        token: &AuthorizationToken,
        credentials: &ClientCredentials,
    ) -> ProviderResult<()> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::token_store("refusing to persist a token without a refresh token")
            })?;
        self.store.save(&StoredToken::new(credentials, refresh_token))
    }

    /// Returns an authorized session, asking for consent only when no usable
    /// token is stored.
    ///
    /// # Errors
    ///
    /// - `ConfigMissing` if there is neither a stored token nor client
    ///   credentials
    /// - AuthFlow errors from the consent flow
    /// - `TokenStoreWrite` if the minted token cannot be persisted
    pub async fn authorize(
        &self,
        scopes: &[String],
        credentials: Option<&ClientCredentials>,
    ) -> ProviderResult<AuthorizedSession> {
        debug!(state = ?AuthState::NoToken, path = ?self.store.path(), "authorizing");

        if let Some(token) = self.load_token() {
            debug!(state = ?AuthState::TokenLoaded, "using stored token");
            return Ok(AuthorizedSession::new(
                token,
                AuthState::TokenLoaded,
                self.oauth.clone(),
            ));
        }

        let credentials = credentials.ok_or_else(|| {
            ProviderError::config_missing(
                "no client credentials found and no stored token to fall back on",
            )
        })?;
        self.mint(scopes, credentials).await
    }

    /// Asks for consent even when a token is stored.
    ///
    /// The stored token is only replaced once the new one is persisted, so a
    /// declined or failed consent leaves it usable.
    pub async fn reauthorize(
        &self,
        scopes: &[String],
        credentials: &ClientCredentials,
    ) -> ProviderResult<AuthorizedSession> {
        debug!(path = ?self.store.path(), "re-authorizing");
        self.mint(scopes, credentials).await
    }

    async fn mint(
        &self,
        scopes: &[String],
        credentials: &ClientCredentials,
    ) -> ProviderResult<AuthorizedSession> {
        debug!(state = ?AuthState::AwaitingConsent, "requesting consent");
        let token = self.authorize_interactively(scopes, credentials).await?;

        debug!(state = ?AuthState::TokenMinted, "consent granted");
        if token.has_refresh_token() {
            self.persist_token(&token, credentials)?;
        } else {
            warn!("authorization returned no refresh token; the next run will ask for consent again");
        }

        info!("authorization complete");
        Ok(AuthorizedSession::new(
            token,
            AuthState::TokenMinted,
            self.oauth.clone(),
        ))
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// An authorized handle for calendar API calls.
///
/// The access token is minted lazily from the refresh token on first use and
/// cached until it expires.
pub struct AuthorizedSession {
    token: AuthorizationToken,
    state: AuthState,
    oauth: Arc<OAuthClient>,
    access: Mutex<Option<AccessToken>>,
}

impl AuthorizedSession {
    /// Wraps a token in a session.
    pub fn new(token: AuthorizationToken, state: AuthState, oauth: Arc<OAuthClient>) -> Self {
        let access = token.access_token.clone();
        Self {
            token,
            state,
            oauth,
            access: Mutex::new(access),
        }
    }

    /// Returns how the session's token was obtained.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Returns the client ID the token was issued to.
    pub fn client_id(&self) -> &str {
        &self.token.client.client_id
    }

    /// Returns a valid bearer token, refreshing it if needed.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut access = self.access.lock().await;
        if let Some(token) = access.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.token.clone());
        }

        let refresh_token = self.token.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::unauthorized("access token expired and no refresh token is available")
        })?;

        debug!("minting access token from refresh token");
        let token = self
            .oauth
            .refresh_access_token(&self.token.client, refresh_token)
            .await?;
        let bearer = token.token.clone();
        *access = Some(token);
        Ok(bearer)
    }
}

impl fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("state", &self.state)
            .field("client_id", &self.token.client.client_id)
            .finish_non_exhaustive()
    }
}
