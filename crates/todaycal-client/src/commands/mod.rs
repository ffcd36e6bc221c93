//! Command implementations.

pub mod auth;
pub mod today;

use tracing::warn;

use todaycal_providers::google::{ClientCredentials, CredentialManager, GoogleConfig};
use todaycal_providers::{ProviderErrorCode, ProviderResult};

use crate::config::{AppPaths, AppSettings};

/// Everything a command needs, resolved once in `main`.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: AppPaths,
    pub settings: AppSettings,
}

impl Context {
    pub fn new(paths: AppPaths, settings: AppSettings) -> Self {
        Self { paths, settings }
    }

    /// Builds the provider configuration.
    pub fn google_config(&self) -> GoogleConfig {
        self.settings.google_config(&self.paths)
    }

    /// Reads `credentials.json`.
    ///
    /// A missing file is only an error when there is no stored token to fall
    /// back on; otherwise a warning is logged and `None` returned.
    pub fn load_credentials(
        &self,
        manager: &CredentialManager,
    ) -> ProviderResult<Option<ClientCredentials>> {
        let path = self.paths.credentials_file();
        match ClientCredentials::from_file(&path) {
            Ok(credentials) => Ok(Some(credentials)),
            Err(e) if e.code() == ProviderErrorCode::ConfigMissing && manager.store().exists() => {
                warn!(
                    path = %path.display(),
                    "client credentials not found, continuing with the stored token"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
