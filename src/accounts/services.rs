use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::accounts::{
    credentials::basic_token,
    password::{hash_password, verify_dummy, verify_password},
    repo::{RepoError, UserRepository},
    repo_types::{NewUser, UserRecord},
};

/// Candidate account as submitted for registration, password still in clear.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub id: Uuid,
    pub full_name: String,
    pub password: String,
}

/// Result of a successful credential check.
#[derive(Debug, Clone)]
pub struct Session {
    /// `Basic` credential built from the submitted email and password.
    pub token: String,
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug)]
pub enum RegisterOutcome {
    Created(UserRecord),
    DuplicateEmail,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(Session),
    UnknownEmail,
    WrongPassword,
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(UserRecord),
    NotFound,
}

impl RegisterOutcome {
    pub fn into_option(self) -> Option<UserRecord> {
        match self {
            Self::Created(user) => Some(user),
            Self::DuplicateEmail => None,
        }
    }
}

impl LoginOutcome {
    pub fn into_option(self) -> Option<Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::UnknownEmail | Self::WrongPassword => None,
        }
    }
}

impl UpdateOutcome {
    pub fn into_option(self) -> Option<UserRecord> {
        match self {
            Self::Updated(user) => Some(user),
            Self::NotFound => None,
        }
    }
}

/// Registration, login and profile edits over an injected [`UserRepository`].
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    #[instrument(skip(self, candidate), fields(email = %candidate.email))]
    pub async fn register(&self, candidate: Registration) -> anyhow::Result<RegisterOutcome> {
        if self
            .users
            .find_by_email(&candidate.email)
            .await
            .context("look up user by email")?
            .is_some()
        {
            warn!("email already registered");
            return Ok(RegisterOutcome::DuplicateEmail);
        }

        let password_hash = hash_password(&candidate.password)?;
        let new_user = NewUser {
            email: candidate.email,
            full_name: candidate.full_name,
            password_hash,
            role: candidate.role,
        };

        match self.users.insert(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "user registered");
                Ok(RegisterOutcome::Created(user))
            }
            // lost a race with a concurrent registration for the same email
            Err(RepoError::DuplicateEmail) => {
                warn!("email registered concurrently");
                Ok(RegisterOutcome::DuplicateEmail)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user")),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> anyhow::Result<LoginOutcome> {
        let Some(user) = self
            .users
            .find_by_email(email)
            .await
            .context("look up user by email")?
        else {
            debug!("login unknown email");
            verify_dummy(password);
            return Ok(LoginOutcome::UnknownEmail);
        };

        if !verify_password(password, &user.password_hash)
            .with_context(|| format!("verify password for user {}", user.id))?
        {
            warn!(user_id = %user.id, "login invalid password");
            return Ok(LoginOutcome::WrongPassword);
        }

        info!(user_id = %user.id, "user authenticated");
        Ok(LoginOutcome::Authenticated(Session {
            token: basic_token(email, password),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            role: user.role,
        }))
    }

    #[instrument(skip(self, update), fields(user_id = %update.id))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> anyhow::Result<UpdateOutcome> {
        if self
            .users
            .find_by_id(update.id)
            .await
            .context("look up user by id")?
            .is_none()
        {
            debug!("profile update for unknown id");
            return Ok(UpdateOutcome::NotFound);
        }

        let password_hash = hash_password(&update.password)?;
        let updated = self
            .users
            .update_profile(update.id, &update.full_name, &password_hash)
            .await
            .context("update user profile")?;

        Ok(match updated {
            Some(user) => {
                info!("profile updated");
                UpdateOutcome::Updated(user)
            }
            None => UpdateOutcome::NotFound,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UserRecord>> {
        self.users
            .find_by_id(id)
            .await
            .context("look up user by id")
    }
}
