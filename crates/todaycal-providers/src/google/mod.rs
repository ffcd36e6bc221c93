//! Google Calendar provider implementation.
//!
//! # Authentication Flow
//!
//! 1. The user downloads an OAuth client (`credentials.json`) from the
//!    Google Cloud Console
//! 2. [`CredentialManager`] looks for a stored refresh token first
//! 3. Without one, it starts a loopback server on the first free port of a
//!    range and opens the browser on Google's consent page with a PKCE
//!    challenge
//! 4. Google redirects to the loopback server with the authorization code
//! 5. The code is exchanged for tokens and the refresh token is persisted
//! 6. [`AuthorizedSession`] mints access tokens from the refresh token on
//!    demand
//!
//! # Example
//!
//! ```ignore
//! use todaycal_providers::google::{ClientCredentials, CredentialManager, GoogleCalendarClient, GoogleConfig};
//! use todaycal_providers::EventQueryEngine;
//!
//! let config = GoogleConfig::new(paths.token_file());
//! let credentials = ClientCredentials::from_file(paths.credentials_file()).ok();
//!
//! let session = CredentialManager::new(&config)?
//!     .authorize(&config.scopes, credentials.as_ref())
//!     .await?;
//! let engine = EventQueryEngine::new(GoogleCalendarClient::new(&config, session)?);
//! let report = engine.list_all_events().await?;
//! ```

mod auth;
mod client;
mod config;
mod oauth;
mod tokens;

pub use auth::{AuthState, AuthorizedSession, ConsentFlow, CredentialManager};
pub use client::{CalendarListEntry, GoogleCalendarClient};
pub use config::{ClientCredentials, GoogleConfig};
pub use oauth::{OAuthClient, PkceFlow};
pub use tokens::{AccessToken, AuthorizationToken, StoredToken, TokenStore};
