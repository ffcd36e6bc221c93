//! Client error types.

use std::fmt;

use todaycal_providers::{ErrorCategory, ProviderError, ProviderErrorCode};

use crate::config::ConfigError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Path resolution or `config.toml` error.
    Config(ConfigError),
    /// Credential, token store or calendar API error.
    Provider(ProviderError),
    /// IO error.
    Io(std::io::Error),
    /// The report could not be serialized.
    Render(serde_json::Error),
}

impl ClientError {
    /// Returns the process exit code for this error.
    ///
    /// 2 config, 3 auth flow, 4 API, 5 token store or local IO, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Provider(err) => match err.category() {
                ErrorCategory::Config => 2,
                ErrorCategory::AuthFlow => 3,
                ErrorCategory::Api => 4,
                ErrorCategory::TokenStore => 5,
                ErrorCategory::Internal => 1,
            },
            Self::Io(_) => 5,
            Self::Render(_) => 1,
        }
    }

    /// Returns a short suggestion on how to fix the error, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(ConfigError::NoHomeDir) => {
                Some("set HOME or pass --config-dir and --data-dir explicitly")
            }
            Self::Config(_) => Some("check config.toml in the config directory"),
            Self::Provider(err) => match err.code() {
                ProviderErrorCode::ConfigMissing => Some(
                    "download an OAuth client (Desktop app) from the Google Cloud Console \
                     and save it as credentials.json in the config directory",
                ),
                ProviderErrorCode::ConfigInvalid => {
                    Some("re-download credentials.json from the Google Cloud Console")
                }
                ProviderErrorCode::ConsentDeclined => {
                    Some("run again and grant calendar access on the consent screen")
                }
                ProviderErrorCode::AuthFlowTimeout => {
                    Some("run again and complete the consent screen in your browser")
                }
                ProviderErrorCode::LoopbackUnavailable => {
                    Some("free a port or set loopback_port_range in config.toml")
                }
                ProviderErrorCode::Unauthorized => Some(
                    "the stored token was rejected; run `fetch-todays-calendar auth --force`",
                ),
                ProviderErrorCode::Forbidden => {
                    Some("enable the Google Calendar API for your Cloud project")
                }
                ProviderErrorCode::RateLimited => Some("wait a moment and try again"),
                ProviderErrorCode::Network => Some("check your network connection"),
                ProviderErrorCode::TokenStoreWrite => {
                    Some("check the permissions of the config directory")
                }
                _ => None,
            },
            Self::Io(_) => Some("check the permissions of the config and data directories"),
            Self::Render(_) => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {}", err),
            Self::Provider(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Render(err) => write!(f, "failed to render events: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Render(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_category() {
        let cases = [
            (ProviderError::config_missing("x"), 2),
            (ProviderError::config_invalid("x"), 2),
            (ProviderError::consent_declined("x"), 3),
            (ProviderError::auth_timeout("x"), 3),
            (ProviderError::auth_flow("x"), 3),
            (ProviderError::unauthorized("x"), 4),
            (ProviderError::server("x"), 4),
            (ProviderError::network("x"), 4),
            (ProviderError::token_store("x"), 5),
            (ProviderError::internal("x"), 1),
        ];
        for (err, code) in cases {
            let label = err.to_string();
            assert_eq!(ClientError::from(err).exit_code(), code, "{}", label);
        }

        assert_eq!(ClientError::from(ConfigError::NoHomeDir).exit_code(), 2);
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(ClientError::from(io).exit_code(), 5);
    }

    #[test]
    fn missing_credentials_has_a_hint() {
        let err = ClientError::from(ProviderError::config_missing("no credentials"));
        assert!(err.hint().unwrap().contains("credentials.json"));
    }

    #[test]
    fn busy_loopback_points_at_the_port_range() {
        let err = ClientError::from(ProviderError::loopback_unavailable(
            "no available port in range 8080-8090",
        ));
        assert_eq!(err.exit_code(), 3);
        assert!(err.hint().unwrap().contains("loopback_port_range"));
    }

    #[test]
    fn provider_errors_display_as_is() {
        let err = ProviderError::forbidden("access denied").with_calendar("Work");
        let expected = err.to_string();
        assert_eq!(ClientError::from(err).to_string(), expected);
    }

    #[test]
    fn source_is_preserved() {
        use std::error::Error;
        let err = ClientError::from(ProviderError::server("boom"));
        assert!(err.source().is_some());
    }
}
