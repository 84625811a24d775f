//! Register, login and identify on top of the credential store, hasher and token issuer.

use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::db::CredentialStore;
use crate::error::{AppError, AppResult};
use crate::models::User;

/// Longest accepted username; matches the `VARCHAR(50)` column.
pub const MAX_USERNAME_LEN: usize = 50;

/// Longest accepted password, in characters. Bounds the work handed to Argon2.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Orchestrates the auth use cases. Holds no per-request state; cloning is cheap.
///
/// This is the only place that decides which failures collapse into
/// `AppError::Unauthenticated`. Storage errors are passed through untouched.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<User> {
        validate_credentials(username, password)?;

        // Fast path only; the store's uniqueness check is authoritative.
        if self.store.find_by_username(username).await?.is_some() {
            return Err(AppError::DuplicateUser(username.to_string()));
        }

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash task: {}", e)))??;

        let row = self.store.insert(username, &password_hash).await?;
        info!(user_id = %row.id, username = %row.username, "user registered");
        Ok(row.into())
    }

    /// Returns a bearer token. Unknown user and wrong password are the same error.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<String> {
        // Such input can never have been registered; rejecting it here keeps the
        // answer independent of the storage backend.
        if !is_storable_username(username) || password.chars().count() > MAX_PASSWORD_LEN {
            debug!("login rejected: credentials outside accepted bounds");
            return Err(AppError::Unauthenticated);
        }

        let row = self.store.find_by_username(username).await?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let stored_hash = row.as_ref().map(|r| r.password_hash.clone());
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("verify task: {}", e)))?;

        let row = match row {
            Some(row) if verified => row,
            _ => {
                debug!(username = %username, "login rejected");
                return Err(AppError::Unauthenticated);
            }
        };

        let token = self.tokens.issue(&row.username)?;
        info!(user_id = %row.id, "login succeeded");
        Ok(token)
    }

    /// Resolves a bearer token to a user that still exists in the store.
    pub async fn identify(&self, token: &str) -> AppResult<User> {
        let subject = self.tokens.verify(token).map_err(|reason| {
            debug!(%reason, "token rejected");
            AppError::Unauthenticated
        })?;
        if !is_storable_username(&subject) {
            debug!("token subject is not a valid username");
            return Err(AppError::Unauthenticated);
        }

        match self.store.find_by_username(&subject).await? {
            Some(row) => Ok(row.into()),
            None => {
                debug!(subject = %subject, "token subject no longer exists");
                Err(AppError::Unauthenticated)
            }
        }
    }
}

/// Non-blank, within the column width, and free of control characters
/// (PostgreSQL rejects NUL in text columns).
fn is_storable_username(username: &str) -> bool {
    !username.trim().is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && !username.chars().any(char::is_control)
}

fn validate_credentials(username: &str, password: &str) -> AppResult<()> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("username must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "username must not contain control characters".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password must not be empty".to_string()));
    }
    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryCredentialStore;
    use crate::models::UserRow;
    use async_trait::async_trait;
    use chrono::Duration;

    fn service_with(store: Arc<dyn CredentialStore>) -> AuthService {
        AuthService::new(
            store,
            PasswordHasher::new(1).unwrap(),
            TokenIssuer::new("service-test-secret", Duration::minutes(15)),
        )
    }

    fn service() -> AuthService {
        service_with(Arc::new(InMemoryCredentialStore::new()))
    }

    #[tokio::test]
    async fn alice_scenario() {
        let auth = service();

        let user = auth.register("alice", "pw123").await.unwrap();
        assert_eq!(user.username, "alice");

        let dup = auth.register("alice", "other").await.unwrap_err();
        assert!(matches!(dup, AppError::DuplicateUser(_)));

        let token = auth.login("alice", "pw123").await.unwrap();
        assert_eq!(auth.identify(&token).await.unwrap(), user);

        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn duplicate_register_keeps_original_password() {
        let auth = service();
        auth.register("alice", "pw123").await.unwrap();
        let _ = auth.register("alice", "other").await;
        assert!(auth.login("alice", "pw123").await.is_ok());
        assert!(auth.login("alice", "other").await.is_err());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let auth = service();
        auth.register("alice", "pw123").await.unwrap();
        let unknown = auth.login("mallory", "pw123").await.unwrap_err();
        let wrong = auth.login("alice", "nope").await.unwrap_err();
        assert!(matches!(unknown, AppError::Unauthenticated));
        assert!(matches!(wrong, AppError::Unauthenticated));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        let auth = service();
        auth.register("alice", "pw123").await.unwrap();
        let token = auth
            .tokens()
            .issue_with_ttl("alice", Duration::zero())
            .unwrap();
        assert!(matches!(
            auth.identify(&token).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn tampered_token_is_unauthenticated() {
        let auth = service();
        auth.register("alice", "pw123").await.unwrap();
        let token = auth.login("alice", "pw123").await.unwrap();
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        bytes[sig_start] = if bytes[sig_start] == b'x' { b'y' } else { b'x' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(matches!(
            auth.identify(&tampered).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unauthenticated() {
        let auth = service();
        let token = auth.tokens().issue("ghost").unwrap();
        assert!(matches!(
            auth.identify(&token).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn rejects_empty_or_long_usernames() {
        let auth = service();
        assert!(matches!(
            auth.register("", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register("   ", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register(&"a".repeat(MAX_USERNAME_LEN + 1), "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register("alice", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_registration_has_one_winner() {
        let auth = service();
        let a = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.register("carol", "pw-a").await })
        };
        let b = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.register("carol", "pw-b").await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::DuplicateUser(_)))));
    }

    #[tokio::test]
    async fn control_characters_are_rejected_before_storage() {
        // DownStore fails every call, so reaching the store would surface StorageUnavailable.
        let auth = service_with(Arc::new(DownStore));
        assert!(matches!(
            auth.register("ali\0ce", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.register("bob\n", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            auth.login("ali\0ce", "pw").await,
            Err(AppError::Unauthenticated)
        ));
        let token = auth.tokens().issue("ali\0ce").unwrap();
        assert!(matches!(
            auth.identify(&token).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn oversized_password_is_rejected_without_hashing() {
        let huge = "p".repeat(MAX_PASSWORD_LEN + 1);
        let auth = service_with(Arc::new(DownStore));
        assert!(matches!(
            auth.login("alice", &huge).await,
            Err(AppError::Unauthenticated)
        ));

        let auth = service();
        assert!(matches!(
            auth.register("alice", &huge).await,
            Err(AppError::Validation(_))
        ));
        let at_limit = "p".repeat(MAX_PASSWORD_LEN);
        auth.register("alice", &at_limit).await.unwrap();
        assert!(auth.login("alice", &at_limit).await.is_ok());
    }

    struct DownStore;

    #[async_trait]
    impl CredentialStore for DownStore {
        async fn find_by_username(&self, _username: &str) -> AppResult<Option<UserRow>> {
            Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut))
        }

        async fn insert(&self, _username: &str, _password_hash: &str) -> AppResult<UserRow> {
            Err(AppError::StorageUnavailable(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn storage_failure_is_not_masked() {
        let auth = service_with(Arc::new(DownStore));
        assert!(matches!(
            auth.login("alice", "pw").await,
            Err(AppError::StorageUnavailable(_))
        ));
        let token = auth.tokens().issue("alice").unwrap();
        assert!(matches!(
            auth.identify(&token).await,
            Err(AppError::StorageUnavailable(_))
        ));
        assert!(matches!(
            auth.register("alice", "pw").await,
            Err(AppError::StorageUnavailable(_))
        ));
    }
}
