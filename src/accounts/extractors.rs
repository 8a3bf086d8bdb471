use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::{
    accounts::{credentials::parse_basic, services::LoginOutcome},
    error::ApiError,
    state::AppState,
};

/// Authenticated caller's user id.
///
/// Accepts `Bearer <jwt>` or the legacy `Basic <base64(email:password)>` token,
/// which is re-checked against storage on every request.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
        {
            let claims = state.jwt.verify(token).map_err(|_| {
                warn!("invalid or expired token");
                ApiError::Unauthorized("invalid or expired token".into())
            })?;
            return Ok(AuthUser(claims.sub));
        }

        let (email, password) = parse_basic(auth)
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;
        match state.accounts.verify_credentials(&email, &password).await? {
            LoginOutcome::Authenticated(session) => Ok(AuthUser(session.id)),
            LoginOutcome::UnknownEmail | LoginOutcome::WrongPassword => {
                Err(ApiError::Unauthorized("Invalid credentials".into()))
            }
        }
    }
}
