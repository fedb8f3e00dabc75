use crate::auth::{
    jwt::JwtKeys,
    password::HashingPool,
    repo::{MemoryUserStore, PgUserStore, UserStore},
};
use crate::config::AppConfig;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtKeys,
    pub hasher: HashingPool,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let users = match config.database_url.as_deref() {
            Some(url) => {
                Arc::new(PgUserStore::connect(url, config.database_max_connections).await?)
                    as Arc<dyn UserStore>
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let state = Self::from_parts(config, users)?;
        info!(
            hash_concurrency = state.config.hashing.max_concurrency,
            jwt_ttl_minutes = state.config.jwt.ttl_minutes,
            "app state ready"
        );
        Ok(state)
    }

    pub fn from_parts(config: AppConfig, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let jwt = JwtKeys::new(&config.jwt);
        let hasher = HashingPool::new(&config.hashing)?;
        Ok(Self {
            config: Arc::new(config),
            users,
            jwt,
            hasher,
        })
    }

    /// In-memory store, test secrets and cheap Argon2 parameters.
    pub fn fake() -> Self {
        Self::from_parts(AppConfig::for_tests(), Arc::new(MemoryUserStore::new()))
            .expect("test config is valid")
    }
}
