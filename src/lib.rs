//! Minimal authentication service built with Rust.
//!
//! Registers users with Argon2id password hashes, verifies credentials and issues
//! short-lived HS256 bearer tokens asserting the username.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use services::AuthService;

use std::sync::Arc;

use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use auth::{PasswordHasher, TokenIssuer};
use db::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};

/// Build the API router (auth, current user, health). Used by main and by integration tests.
///
/// `/register` and `/login` take form-encoded credentials (OAuth2 password flow);
/// the same operations under `/auth` take JSON.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    axum::Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(auth::register_form))
        .route("/login", post(auth::login_form))
        .route("/users/me", get(auth::me))
        .nest("/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the store, hasher and token issuer described by `config`.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            let store = PgCredentialStore::new(pool);
            store.ensure_schema().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory only");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let hasher = PasswordHasher::new(config.hash_cost_factor)?;
    let tokens = TokenIssuer::new(&config.signing_secret, chrono::Duration::from_std(config.token_ttl)?)
        .with_leeway(chrono::Duration::from_std(config.token_leeway)?);

    Ok(AppState::new(AuthService::new(store, hasher, tokens)))
}
