use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::{repo_types::UserRecord, services::Session};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for a profile edit. Email and role are not editable.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub id: Uuid,
    pub full_name: String,
    pub password: String,
}

/// Returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Legacy `Basic` credential.
    pub token: String,
    /// Signed, time-limited JWT carrying only the user id.
    pub access_token: String,
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

impl LoginResponse {
    pub fn new(session: Session, access_token: String) -> Self {
        Self {
            token: session.token,
            access_token,
            id: session.id,
            email: session.email,
            full_name: session.full_name,
            role: session.role,
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role,
            created_at: u.created_at,
        }
    }
}
