//! Authentication command.

use tracing::info;

use todaycal_providers::ProviderError;
use todaycal_providers::google::{AuthState, CredentialManager};

use crate::commands::Context;
use crate::error::ClientResult;

/// Runs only the credential manager: reuse the stored token or ask for
/// consent and persist the result.
///
/// `force` asks for consent even when a token is stored. The stored token is
/// kept until a new one has been persisted.
pub async fn run(ctx: &Context, force: bool) -> ClientResult<()> {
    let config = ctx.google_config();
    let manager = CredentialManager::new(&config)?;
    let state = authorize(ctx, &manager, force).await?;
    let token_path = ctx.paths.token_file();
    println!("{}", message_for(state, &token_path.display().to_string()));
    Ok(())
}

/// Authorizes with `manager`, returning how the token was obtained.
pub async fn authorize(
    ctx: &Context,
    manager: &CredentialManager,
    force: bool,
) -> ClientResult<AuthState> {
    let scopes = ctx.google_config().scopes;
    let credentials = ctx.load_credentials(manager)?;

    let session = if force {
        let credentials = credentials.ok_or_else(|| {
            ProviderError::config_missing(format!(
                "re-authorizing needs client credentials at {}; the stored token was kept",
                ctx.paths.credentials_file().display()
            ))
        })?;
        info!("asking for consent again");
        manager.reauthorize(&scopes, &credentials).await?
    } else {
        manager.authorize(&scopes, credentials.as_ref()).await?
    };
    Ok(session.state())
}

fn message_for(state: AuthState, token_path: &str) -> String {
    match state {
        AuthState::TokenMinted => format!("Authorization successful. Token saved to {}", token_path),
        _ => format!(
            "Already authorized (token at {}). Use --force to authorize again.",
            token_path
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use todaycal_providers::google::{
        AccessToken, AuthorizationToken, ClientCredentials, ConsentFlow, StoredToken,
    };
    use todaycal_providers::{BoxFuture, ProviderErrorCode, ProviderResult};

    use super::*;
    use crate::config::{AppPaths, AppSettings};
    use crate::error::ClientError;

    struct CountingConsent {
        calls: AtomicUsize,
        declines: bool,
    }

    impl ConsentFlow for CountingConsent {
        fn request_consent<'a>(
            &'a self,
            _scopes: &'a [String],
            credentials: &'a ClientCredentials,
        ) -> BoxFuture<'a, ProviderResult<AuthorizationToken>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.declines {
                Err(ProviderError::consent_declined("access_denied"))
            } else {
                Ok(AuthorizationToken {
                    access_token: Some(AccessToken::new("ya29.test", Some(3600))),
                    refresh_token: Some(format!("refresh-{}", n)),
                    client: credentials.clone(),
                })
            };
            Box::pin(async move { result })
        }
    }

    fn setup(dir: &std::path::Path) -> (Context, CredentialManager, Arc<CountingConsent>) {
        setup_with(dir, false)
    }

    fn setup_with(
        dir: &std::path::Path,
        declines: bool,
    ) -> (Context, CredentialManager, Arc<CountingConsent>) {
        let ctx = Context::new(AppPaths::new(dir, dir), AppSettings::default());
        std::fs::write(
            ctx.paths.credentials_file(),
            r#"{"installed":{"client_id":"id.apps.googleusercontent.com","client_secret":"s"}}"#,
        )
        .unwrap();
        let consent = Arc::new(CountingConsent {
            calls: AtomicUsize::new(0),
            declines,
        });
        let manager = CredentialManager::new(&ctx.google_config())
            .unwrap()
            .with_consent_flow(consent.clone());
        (ctx, manager, consent)
    }

    #[tokio::test]
    async fn first_run_mints_then_reuses() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, manager, consent) = setup(tmp.path());

        assert_eq!(
            authorize(&ctx, &manager, false).await.unwrap(),
            AuthState::TokenMinted
        );
        assert_eq!(
            authorize(&ctx, &manager, false).await.unwrap(),
            AuthState::TokenLoaded
        );
        assert_eq!(consent.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_asks_again_and_replaces_token() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, manager, consent) = setup(tmp.path());

        authorize(&ctx, &manager, false).await.unwrap();
        let state = authorize(&ctx, &manager, true).await.unwrap();

        assert_eq!(state, AuthState::TokenMinted);
        assert_eq!(consent.calls.load(Ordering::SeqCst), 2);
        let stored = manager.store().load().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn no_credentials_and_no_token_fails_without_consent() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, manager, consent) = setup(tmp.path());
        std::fs::remove_file(ctx.paths.credentials_file()).unwrap();

        let err = authorize(&ctx, &manager, false).await.unwrap_err();
        match err {
            ClientError::Provider(e) => assert_eq!(e.code(), ProviderErrorCode::ConfigMissing),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(consent.calls.load(Ordering::SeqCst), 0);
    }

    fn store_token(manager: &CredentialManager, refresh_token: &str) {
        let creds = ClientCredentials::new("id.apps.googleusercontent.com", "s");
        manager
            .store()
            .save(&StoredToken::new(&creds, refresh_token))
            .unwrap();
    }

    #[tokio::test]
    async fn force_without_credentials_keeps_stored_token() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, manager, consent) = setup(tmp.path());
        std::fs::remove_file(ctx.paths.credentials_file()).unwrap();
        store_token(&manager, "1//working");

        let err = authorize(&ctx, &manager, true).await.unwrap_err();

        match err {
            ClientError::Provider(e) => assert_eq!(e.code(), ProviderErrorCode::ConfigMissing),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(consent.calls.load(Ordering::SeqCst), 0);
        let stored = manager.store().load().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("1//working"));
    }

    #[tokio::test]
    async fn declined_force_keeps_stored_token() {
        let tmp = tempfile::tempdir().unwrap();
        let (ctx, manager, consent) = setup_with(tmp.path(), true);
        store_token(&manager, "1//working");

        let err = authorize(&ctx, &manager, true).await.unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert_eq!(consent.calls.load(Ordering::SeqCst), 1);
        let stored = manager.store().load().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("1//working"));
    }

    #[test]
    fn messages() {
        assert!(message_for(AuthState::TokenMinted, "/t").contains("successful"));
        assert!(message_for(AuthState::TokenLoaded, "/t").contains("--force"));
    }
}
