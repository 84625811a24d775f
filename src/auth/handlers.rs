//! Auth HTTP handlers: register, login, current user.
//!
//! Credentials arrive either as JSON (`/auth/*`) or form-encoded in the OAuth2
//! password-flow style (`/register`, `/login`).

use axum::{extract::State, http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::User;

#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = register_user(&state, body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /register (form-encoded)
pub async fn register_form(
    State(state): State<AppState>,
    Form(body): Form<CredentialsRequest>,
) -> Result<Json<User>, AppError> {
    let user = register_user(&state, body).await?;
    Ok(Json(user))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    login_user(&state, body).await.map(Json)
}

/// POST /login (form-encoded, OAuth2 password flow)
pub async fn login_form(
    State(state): State<AppState>,
    Form(body): Form<CredentialsRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    login_user(&state, body).await.map(Json)
}

/// GET /users/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn register_user(state: &AppState, body: CredentialsRequest) -> AppResult<User> {
    body.validate()
        .map_err(|e| AppError::Validation(validation_message(&e)))?;
    state
        .auth_service()
        .register(&body.username, &body.password)
        .await
}

async fn login_user(state: &AppState, body: CredentialsRequest) -> AppResult<LoginResponse> {
    // Out-of-bounds credentials cannot match a registered user.
    if body.validate().is_err() {
        return Err(AppError::Unauthenticated);
    }
    let access_token = state
        .auth_service()
        .login(&body.username, &body.password)
        .await?;
    Ok(LoginResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.auth_service().tokens().ttl().num_seconds(),
    })
}

/// Names the offending fields, e.g. `invalid field(s): password, username`.
fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    format!("invalid field(s): {}", fields.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields_only() {
        let body = CredentialsRequest {
            username: String::new(),
            password: "p".repeat(2000),
        };
        let errors = body.validate().unwrap_err();
        assert_eq!(
            validation_message(&errors),
            "invalid field(s): password, username"
        );
    }

    #[test]
    fn valid_credentials_pass() {
        let body = CredentialsRequest {
            username: "alice".to_string(),
            password: "pw123".to_string(),
        };
        assert!(body.validate().is_ok());
    }
}
