use std::sync::Arc;

use tracing::warn;

use crate::accounts::{
    jwt::JwtKeys,
    repo::{MemoryUserRepository, PgUserRepository, UserRepository},
    services::AccountService,
};
use crate::config::AppConfig;
use crate::db;
use crate::products::repo::{MemoryProductRepository, PgProductRepository, ProductRepository};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
    pub products: Arc<dyn ProductRepository>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, products): (Arc<dyn UserRepository>, Arc<dyn ProductRepository>) =
            match config.database_url.as_deref() {
                Some(url) => {
                    let pool = db::connect(&config, url).await?;
                    db::migrate(&pool).await?;
                    (
                        Arc::new(PgUserRepository::new(pool.clone())),
                        Arc::new(PgProductRepository::new(pool)),
                    )
                }
                None => {
                    warn!("DATABASE_URL not set; using in-memory storage");
                    (
                        Arc::new(MemoryUserRepository::new()),
                        Arc::new(MemoryProductRepository::new()),
                    )
                }
            };

        Ok(Self::from_parts(config, users, products))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        let jwt = JwtKeys::from_config(&config.jwt);
        Self {
            config,
            accounts: AccountService::new(users),
            products,
            jwt,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryProductRepository::new()),
        )
    }
}
