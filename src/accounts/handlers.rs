use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    accounts::{
        dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, UpdateProfileRequest},
        extractors::AuthUser,
        repo_types::DEFAULT_ROLE,
        services::{LoginOutcome, ProfileUpdate, RegisterOutcome, Registration, UpdateOutcome},
    },
    error::ApiError,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users", put(update_profile))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// The `Basic` token splits on the first `:`, so emails must not contain one.
pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s:]+@[^@\s:]+\.[^@\s:]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    if !is_valid_email(&payload.email) {
        warn!("invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".into()));
    }

    let candidate = Registration {
        email: payload.email,
        full_name: payload.full_name,
        password: payload.password,
        role: payload
            .role
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
    };

    match state.accounts.register(candidate).await? {
        RegisterOutcome::Created(user) => Ok((StatusCode::CREATED, Json(user.into()))),
        RegisterOutcome::DuplicateEmail => {
            Err(ApiError::Conflict("Email already registered".into()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = match state
        .accounts
        .verify_credentials(&payload.email, &payload.password)
        .await?
    {
        LoginOutcome::Authenticated(session) => session,
        LoginOutcome::UnknownEmail | LoginOutcome::WrongPassword => {
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    let access_token = state.jwt.sign_access(session.id)?;
    Ok(Json(LoginResponse::new(session, access_token)))
}

#[instrument(skip(state, payload), fields(user_id = %payload.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if caller != payload.id {
        warn!(caller = %caller, "attempt to edit another account");
        return Err(ApiError::Forbidden("Cannot edit another account".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".into()));
    }

    let update = ProfileUpdate {
        id: payload.id,
        full_name: payload.full_name,
        password: payload.password,
    };
    match state.accounts.update_profile(update).await? {
        UpdateOutcome::Updated(user) => Ok(Json(user.into())),
        UpdateOutcome::NotFound => Err(ApiError::NotFound("User not found".into())),
    }
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .accounts
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user.into()))
}
