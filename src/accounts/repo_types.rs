use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "customer";

/// User account row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,                   // assigned by storage
    pub email: String,              // unique, stored as given
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 PHC string
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Account about to be inserted; the id and timestamps come from storage.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
}
