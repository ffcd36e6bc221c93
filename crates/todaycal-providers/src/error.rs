//! Error types for credential and calendar operations.
//!
//! Every failure carries a [`ProviderErrorCode`]; codes group into an
//! [`ErrorCategory`] so the CLI can tell "you haven't set up credentials"
//! apart from "you declined consent" and "the API call failed".

use std::fmt;
use thiserror::Error;

/// The broad class of an error, which decides how the user fixes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client credentials or config files are missing or invalid.
    Config,
    /// The interactive consent flow did not produce a token.
    AuthFlow,
    /// The token store could not be written.
    TokenStore,
    /// A calendar provider request failed.
    Api,
    /// Unexpected local failure.
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::AuthFlow => "auth_flow",
            Self::TokenStore => "token_store",
            Self::Api => "api",
            Self::Internal => "internal",
        }
    }
}

/// The specific kind of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Client credentials are absent and no token exists.
    ConfigMissing,
    /// A credentials or configuration file could not be parsed.
    ConfigInvalid,
    /// The user declined the consent screen.
    ConsentDeclined,
    /// The consent callback never arrived.
    AuthFlowTimeout,
    /// The consent flow failed (bad client credentials, state mismatch, ...).
    AuthFlowFailed,
    /// No port in the loopback range could be bound for the consent callback.
    LoopbackUnavailable,
    /// The token store could not be written.
    TokenStoreWrite,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    Network,
    /// The provider rejected the credentials (401, or refresh rejected).
    Unauthorized,
    /// The user lacks access to the resource (403).
    Forbidden,
    /// Rate limit or quota exceeded (429).
    RateLimited,
    /// Resource not found (404).
    NotFound,
    /// Request was rejected as malformed (other 4xx).
    BadRequest,
    /// Server returned an error (5xx).
    Server,
    /// The response could not be parsed.
    InvalidResponse,
    /// Internal error - unexpected state, bug.
    Internal,
}

impl ProviderErrorCode {
    /// Returns the category this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigMissing | Self::ConfigInvalid => ErrorCategory::Config,
            Self::ConsentDeclined
            | Self::AuthFlowTimeout
            | Self::AuthFlowFailed
            | Self::LoopbackUnavailable => ErrorCategory::AuthFlow,
            Self::TokenStoreWrite => ErrorCategory::TokenStore,
            Self::Network
            | Self::Unauthorized
            | Self::Forbidden
            | Self::RateLimited
            | Self::NotFound
            | Self::BadRequest
            | Self::Server
            | Self::InvalidResponse => ErrorCategory::Api,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns a machine-friendly name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::ConfigInvalid => "config_invalid",
            Self::ConsentDeclined => "consent_declined",
            Self::AuthFlowTimeout => "auth_flow_timeout",
            Self::AuthFlowFailed => "auth_flow_failed",
            Self::LoopbackUnavailable => "loopback_unavailable",
            Self::TokenStoreWrite => "token_store_write",
            Self::Network => "network_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Server => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while authorizing or talking to the provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The calendar the error relates to, if any.
    calendar: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            calendar: None,
            source: None,
        }
    }

    /// Creates a missing-configuration error.
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigMissing, message)
    }

    /// Creates an invalid-configuration error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigInvalid, message)
    }

    /// Creates a declined-consent error.
    pub fn consent_declined(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConsentDeclined, message)
    }

    /// Creates a consent timeout error.
    pub fn auth_timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthFlowTimeout, message)
    }

    /// Creates a generic consent-flow error.
    pub fn auth_flow(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthFlowFailed, message)
    }

    /// Creates an error for a loopback port range with no free port.
    pub fn loopback_unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::LoopbackUnavailable, message)
    }

    /// Creates a token store write error.
    pub fn token_store(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenStoreWrite, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Network, message)
    }

    /// Creates an authentication error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Unauthorized, message)
    }

    /// Creates an authorization error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Forbidden, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Server, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Internal, message)
    }

    /// Sets the calendar this error relates to.
    pub fn with_calendar(mut self, calendar: impl Into<String>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error category.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the calendar name, if set.
    pub fn calendar(&self) -> Option<&str> {
        self.calendar.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref calendar) = self.calendar {
            write!(f, "[{}] ", calendar)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
