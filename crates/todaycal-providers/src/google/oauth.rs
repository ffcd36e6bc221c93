//! OAuth 2.0 PKCE flow implementation for Google APIs.
//!
//! This module implements the Authorization Code flow with PKCE (Proof Key for
//! Code Exchange) extension, using a loopback redirect for desktop applications.
//!
//! # Flow Overview
//!
//! 1. Generate a cryptographic code verifier and its SHA-256 challenge
//! 2. Start a local HTTP server on the first free port of a range
//! 3. Build the authorization URL with the challenge
//! 4. Open the user's browser to Google's consent page
//! 5. User grants permission; Google redirects to our local server
//! 6. Extract the authorization code from the redirect
//! 7. Exchange the code (with verifier) for access and refresh tokens
//!
//! # Security
//!
//! - PKCE prevents authorization code interception attacks
//! - The loopback server only listens on 127.0.0.1
//! - State parameter prevents CSRF attacks

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::{ClientCredentials, GoogleConfig};
use super::tokens::{AccessToken, AuthorizationToken};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Path the consent screen redirects to.
const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization Successful</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h1>Authorization Failed</h1>\
    <p>You can close this window.</p></body></html>";

/// Builds the HTTP client shared by the OAuth and Calendar API clients.
pub(crate) fn build_http_client(config: &GoogleConfig) -> ProviderResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone());

    // Local endpoints must not be routed through a system proxy.
    if is_loopback(&config.api_base) && is_loopback(&config.token_url) {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))
}

fn is_loopback(url: &Url) -> bool {
    matches!(url.host_str(), Some("127.0.0.1" | "localhost" | "[::1]"))
}

/// OAuth client for Google APIs.
///
/// Runs the consent flow and mints access tokens from refresh tokens. It
/// holds no credentials itself; callers pass the client identity per call.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http_client: reqwest::Client,
    auth_url: Url,
    token_url: Url,
    port_range: (u16, u16),
    callback_timeout: Duration,
}

impl OAuthClient {
    /// Creates a new OAuth client from the provider configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            http_client: build_http_client(config)?,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            port_range: config.loopback_port_range,
            callback_timeout: config.consent_timeout,
        })
    }

    /// Runs the OAuth PKCE consent flow and returns the minted token.
    ///
    /// This will:
    /// 1. Start a local HTTP server
    /// 2. Open the user's browser to Google's authorization page
    /// 3. Wait for the callback with the authorization code
    /// 4. Exchange the code for tokens
    ///
    /// # Errors
    ///
    /// - `ConfigInvalid` if no port is available in the configured range
    /// - `ConsentDeclined` if the user denies authorization
    /// - `AuthFlowTimeout` if the browser never comes back
    /// - `AuthFlowFailed` on a state mismatch or a rejected code exchange
    pub async fn authorize(
        &self,
        scopes: &[String],
        credentials: &ClientCredentials,
    ) -> ProviderResult<AuthorizationToken> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(self.port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let auth_url = pkce.build_auth_url(
            &self.auth_url,
            &credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        } else {
            eprintln!("Waiting for authorization in your browser...");
        }

        let (code, received_state) =
            Self::wait_for_callback(listener, self.callback_timeout).await?;

        if received_state != pkce.state {
            return Err(ProviderError::auth_flow(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens...");

        self.exchange_code(credentials, &code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Mints a new access token from a refresh token.
    ///
    /// A rejected refresh (revoked or expired grant) is reported as
    /// `Unauthorized`.
    pub async fn refresh_access_token(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> ProviderResult<AccessToken> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token_request(&params).await?;
        let token_response = match response {
            Ok(token_response) => token_response,
            Err((status, reason)) => {
                return Err(ProviderError::unauthorized(format!(
                    "token refresh failed ({}): {}",
                    status, reason
                )));
            }
        };

        debug!("refreshed access token");
        Ok(AccessToken::new(
            token_response.access_token,
            token_response.expires_in,
        ))
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<AuthorizationToken> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = match self.post_token_request(&params).await? {
            Ok(token_response) => token_response,
            Err((status, reason)) => {
                return Err(ProviderError::auth_flow(format!(
                    "token exchange failed ({}): {}",
                    status, reason
                )));
            }
        };

        info!("successfully obtained tokens");
        Ok(AuthorizationToken {
            access_token: Some(AccessToken::new(
                token_response.access_token,
                token_response.expires_in,
            )),
            refresh_token: token_response.refresh_token.filter(|t| !t.is_empty()),
            client: credentials.clone(),
        })
    }

    /// Posts a form to the token endpoint.
    ///
    /// The outer result carries transport failures; the inner one carries
    /// the status and reason of a rejection so each grant can classify it.
    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
    ) -> ProviderResult<Result<TokenResponse, (reqwest::StatusCode, String)>> {
        let response = self
            .http_client
            .post(self.token_url.clone())
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("token request failed: {}", e)).with_source(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or(body);
            return Ok(Err((status, reason)));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })?;
        Ok(Ok(token_response))
    }

    /// Binds the first free port in the given range on 127.0.0.1.
    async fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            match TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => {
                    debug!("bound loopback server on port {}", port);
                    return Ok((listener, port));
                }
                Err(e) => debug!("port {} unavailable: {}", port, e),
            }
        }
        Err(ProviderError::loopback_unavailable(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits for the OAuth callback and extracts the authorization code and
    /// state.
    ///
    /// Requests for other paths (such as the favicon) are answered
    /// and ignored. The listener is dropped when this returns, on success,
    /// failure or timeout alike.
    async fn wait_for_callback(
        listener: TcpListener,
        timeout: Duration,
    ) -> ProviderResult<(String, String)> {
        let accept_loop = async {
            loop {
                let (stream, peer) = listener.accept().await.map_err(|e| {
                    ProviderError::auth_flow(format!("failed to accept connection: {}", e))
                })?;
                debug!(%peer, "loopback connection");
                if let Some(result) = Self::handle_callback(stream).await {
                    return result;
                }
            }
        };

        match tokio::time::timeout(timeout, accept_loop).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::auth_timeout(format!(
                "no authorization received within {} seconds",
                timeout.as_secs()
            ))),
        }
    }

    /// Handles one incoming HTTP request on the callback server.
    ///
    /// Returns `None` if the request was not the OAuth callback.
    async fn handle_callback(stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();

        if reader.read_line(&mut request_line).await.is_err() {
            return None;
        }

        // Drain the headers so closing the socket doesn't reset the reply.
        let mut header = String::new();
        loop {
            header.clear();
            match reader.read_line(&mut header).await {
                Ok(0) | Err(_) => break,
                Ok(_) if header.trim_end().is_empty() => break,
                Ok(_) => {}
            }
        }

        let params = CallbackParams::parse(&request_line);
        let (status, page) = match &params {
            None => ("404 Not Found", FAILURE_PAGE),
            Some(p) if p.error.is_some() || p.code.is_none() => ("400 Bad Request", FAILURE_PAGE),
            Some(_) => ("200 OK", SUCCESS_PAGE),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            page.len(),
            page
        );
        let mut stream = reader.into_inner();
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        params.map(CallbackParams::into_result)
    }
}

/// Query parameters of the OAuth redirect.
#[derive(Debug, Default, PartialEq, Eq)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    /// Parses `GET /callback?code=...&state=... HTTP/1.1`.
    fn parse(request_line: &str) -> Option<Self> {
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 || parts[0] != "GET" {
            return None;
        }

        let (path, query) = parts[1].split_once('?').unwrap_or((parts[1], ""));
        if path != CALLBACK_PATH {
            return None;
        }

        let mut params = Self::default();
        for param in query.split('&') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(&value.replace('+', " "))
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => params.code = Some(value),
                "state" => params.state = Some(value),
                "error" => params.error = Some(value),
                _ => {}
            }
        }
        Some(params)
    }

    fn into_result(self) -> ProviderResult<(String, String)> {
        if let Some(error) = self.error {
            return Err(if error == "access_denied" {
                ProviderError::consent_declined("authorization was declined in the browser")
            } else {
                ProviderError::auth_flow(format!("authorization failed: {}", error))
            });
        }

        match self.code {
            Some(code) => Ok((code, self.state.unwrap_or_default())),
            None => Err(ProviderError::auth_flow(
                "missing authorization code in callback",
            )),
        }
    }
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Generates a cryptographically random code verifier.
    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Generates a random state string for CSRF protection.
    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the consent page URL.
    ///
    /// `access_type=offline` and `prompt=consent` make Google issue a
    /// refresh token every time.
    pub fn build_auth_url(
        &self,
        auth_url: &Url,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
