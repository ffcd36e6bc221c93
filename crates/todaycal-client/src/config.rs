//! Client configuration.
//!
//! Two directories drive everything the CLI reads and writes:
//!
//! - the config directory (`~/.config/fetch-todays-calendar` by default)
//!   holds `credentials.json`, `token.json` and an optional `config.toml`
//! - the data directory (`~/.local/share/fetch-todays-calendar` by default)
//!   holds the `events.json` snapshot
//!
//! Each directory can be moved with a CLI flag or with `APP_CONFIG_DIR` /
//! `APP_DATA_DIR`; environment values are resolved relative to the home
//! directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use todaycal_providers::google::GoogleConfig;

/// Directory name used under the platform config and data roots.
pub const APP_NAME: &str = "fetch-todays-calendar";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "APP_CONFIG_DIR";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "APP_DATA_DIR";

/// Errors raised while resolving paths or reading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home directory could not be determined.
    #[error("cannot determine the home directory; pass --config-dir and --data-dir")]
    NoHomeDir,

    /// A file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `config.toml` is not valid.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// AppPaths
// ---------------------------------------------------------------------------

/// Resolved locations of every file the CLI touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    /// Creates paths from explicit directories.
    pub fn new(config_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Resolves the directories from CLI flags, the process environment and
    /// the user's home directory.
    pub fn from_env(
        cli_config_dir: Option<PathBuf>,
        cli_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        Self::resolve(
            cli_config_dir,
            cli_data_dir,
            |key| std::env::var_os(key).map(PathBuf::from),
            dirs::home_dir(),
        )
    }

    /// Resolves the directories.
    ///
    /// Precedence per directory: CLI flag, then the environment variable
    /// (joined to `home`), then the default under `home`. The home directory
    /// is only required when a flag is missing.
    pub fn resolve<F>(
        cli_config_dir: Option<PathBuf>,
        cli_data_dir: Option<PathBuf>,
        env: F,
        home: Option<PathBuf>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let resolve_one = |cli: Option<PathBuf>, key: &str, default: &str| {
            if let Some(dir) = cli {
                return Ok(dir);
            }
            let home = home.as_deref().ok_or(ConfigError::NoHomeDir)?;
            Ok(match env(key).filter(|v| !v.as_os_str().is_empty()) {
                Some(relative) => home.join(relative),
                None => home.join(default),
            })
        };

        Ok(Self {
            config_dir: resolve_one(
                cli_config_dir,
                CONFIG_DIR_ENV,
                &format!(".config/{}", APP_NAME),
            )?,
            data_dir: resolve_one(
                cli_data_dir,
                DATA_DIR_ENV,
                &format!(".local/share/{}", APP_NAME),
            )?,
        })
    }

    /// Returns the config directory.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the token store path.
    pub fn token_file(&self) -> PathBuf {
        self.config_dir.join("token.json")
    }

    /// Returns the client credentials path.
    pub fn credentials_file(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }

    /// Returns the settings file path.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Returns the events snapshot path.
    pub fn events_file(&self) -> PathBuf {
        self.data_dir.join("events.json")
    }

    /// Creates both directories if they don't exist yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)
    }
}

// ---------------------------------------------------------------------------
// AppSettings (config.toml)
// ---------------------------------------------------------------------------

/// Optional settings from `<config_dir>/config.toml`.
///
/// Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// OAuth scopes to request. Changing them requires deleting token.json.
    pub scopes: Option<Vec<String>>,

    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// First and last port tried for the consent callback server.
    pub loopback_port_range: Option<(u16, u16)>,

    /// Continue past calendars that cannot be read.
    pub skip_failed_calendars: bool,

    /// Default for `--calendar`.
    pub calendar: Option<String>,
}

impl AppSettings {
    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scopes) = &self.scopes
            && scopes.is_empty()
        {
            return Err(ConfigError::Invalid {
                key: "scopes",
                message: "at least one scope is required".to_string(),
            });
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some((start, end)) = self.loopback_port_range
            && start > end
        {
            return Err(ConfigError::Invalid {
                key: "loopback_port_range",
                message: format!("{} is greater than {}", start, end),
            });
        }
        Ok(())
    }

    /// Builds the provider configuration for these settings.
    pub fn google_config(&self, paths: &AppPaths) -> GoogleConfig {
        let mut config = GoogleConfig::new(paths.token_file());
        if let Some(scopes) = &self.scopes {
            config = config.with_scopes(scopes.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some((start, end)) = self.loopback_port_range {
            config = config.with_loopback_port_range(start, end);
        }
        config
    }
}
