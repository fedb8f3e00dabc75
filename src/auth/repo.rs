use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auth::repo_types::{NewUser, User};

/// Persistence for user records, keyed by canonical MSISDN.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_msisdn(&self, msisdn: &str) -> anyhow::Result<Option<User>>;

    /// Only returns users whose `is_active` flag is set.
    async fn find_active_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;

    /// Atomically inserts the user unless the MSISDN is already taken.
    /// `Ok(None)` means another record owns the MSISDN.
    async fn insert_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("postgres user store ready");
        Ok(Self::new(db))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_msisdn(&self, msisdn: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, msisdn, password_hash, is_active, created_at
            FROM users
            WHERE msisdn = $1
            "#,
        )
        .bind(msisdn)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_active_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, msisdn, password_hash, is_active, created_at
            FROM users
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, msisdn, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (msisdn) DO NOTHING
            RETURNING id, name, msisdn, password_hash, is_active, created_at
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.msisdn)
        .bind(&new_user.password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    by_id: HashMap<i64, User>,
    id_by_msisdn: HashMap<String, i64>,
}

/// Process-local store for development and tests.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips the active flag; returns false if the id is unknown.
    pub async fn set_active(&self, id: i64, active: bool) -> bool {
        let mut inner = self.inner.write().await;
        match inner.by_id.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_msisdn(&self, msisdn: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .id_by_msisdn
            .get(msisdn)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_active_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id).filter(|u| u.is_active).cloned())
    }

    async fn insert_if_absent(&self, new_user: NewUser) -> anyhow::Result<Option<User>> {
        // Check and insert under a single write guard.
        let mut inner = self.inner.write().await;
        if inner.id_by_msisdn.contains_key(&new_user.msisdn) {
            debug!(msisdn = %new_user.msisdn, "memory store: msisdn taken");
            return Ok(None);
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            name: new_user.name,
            msisdn: new_user.msisdn,
            password_hash: new_user.password_hash,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.id_by_msisdn.insert(user.msisdn.clone(), user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(Some(user))
    }
}
