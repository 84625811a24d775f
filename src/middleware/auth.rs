//! Auth extractor: resolves `Authorization: Bearer <token>` to a user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::User;

/// Extractor: the user identified by the request's bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthenticated)?;
        let user = state.auth_service().identify(bearer.token()).await?;
        Ok(AuthUser(user))
    }
}
