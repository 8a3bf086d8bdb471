use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::repo_types::{NewUser, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for user accounts. Email uniqueness is enforced here, not by callers.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepoError>;
    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, RepoError>;
}

/// Unique violations on insert come from `users_email_key`.
fn insert_error(e: sqlx::Error) -> RepoError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::DuplicateEmail,
        other => RepoError::Database(other),
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, full_name, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, email, full_name, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let created = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (email, full_name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .fetch_one(&self.db)
        .await
        .map_err(insert_error)?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let updated = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET full_name = $2, password_hash = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, email, full_name, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(updated)
    }
}

/// Process-local store; the email check and the write share one lock.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn count_by_email(&self, email: &str) -> usize {
        self.users
            .read()
            .await
            .values()
            .filter(|u| u.email == email)
            .count()
    }

    #[cfg(test)]
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.full_name = full_name.to_string();
        user.password_hash = password_hash.to_string();
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}
