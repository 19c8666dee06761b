use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod dialect;
pub mod error;
pub mod repositories;
pub mod schema;

pub use dialect::Dialect;
pub use error::DbError;
pub use repositories::auth_log::AuthLogEntry;
pub use repositories::user::{NewUser, User};

pub use crate::entities::auth_logs::Model as AuthLog;
pub use crate::entities::auth_tokens::Model as AuthToken;

pub struct Store {
    pub conn: DatabaseConnection,
    dialect: Dialect,
}

impl Store {
    /// Opens a pool for the configured dialect. Nothing is created yet; call
    /// [`Store::initialize_schema`] for that.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let dialect = config.dialect()?;
        let pool = &config.pool;

        let conn = Database::connect(pool_options(config)?)
            .await
            .map_err(|source| DbError::Connection { dialect, source })?;

        info!(
            "Connected to {} database (pool: {}-{})",
            dialect, pool.min_connections, pool.max_connections
        );

        Ok(Self { conn, dialect })
    }

    /// Wraps an existing connection. The dialect must match its backend.
    pub fn from_connection(conn: DatabaseConnection) -> Result<Self, DbError> {
        let backend = conn.get_database_backend();
        let dialect = Dialect::from_backend(backend)
            .ok_or_else(|| DbError::UnsupportedDialect(format!("{backend:?}").to_lowercase()))?;
        Ok(Self { conn, dialect })
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn initialize_schema(&self) -> Result<(), DbError> {
        schema::create_tables_for(&self.conn, self.dialect).await
    }

    fn auth_log_repo(&self) -> repositories::auth_log::AuthLogRepository<'_> {
        repositories::auth_log::AuthLogRepository::new(&self.conn)
    }

    fn auth_token_repo(&self) -> repositories::auth_token::AuthTokenRepository<'_> {
        repositories::auth_token::AuthTokenRepository::new(&self.conn)
    }

    fn user_repo(&self) -> repositories::user::UserRepository<'_> {
        repositories::user::UserRepository::new(&self.conn)
    }

    pub async fn record_auth_log(&self, entry: &AuthLogEntry) -> Result<i64> {
        self.auth_log_repo().record(entry).await
    }

    pub async fn get_auth_log(&self, id: i64) -> Result<Option<AuthLog>> {
        self.auth_log_repo().get(id).await
    }

    pub async fn list_auth_logs_for_user(&self, user_id: i64, limit: u64) -> Result<Vec<AuthLog>> {
        self.auth_log_repo().list_for_user(user_id, limit).await
    }

    pub async fn count_auth_logs_by_action(&self, action: &str) -> Result<u64> {
        self.auth_log_repo().count_by_action(action).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<i64> {
        self.user_repo().create(user).await
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn record_login(&self, user_id: i64) -> Result<()> {
        self.user_repo().record_login(user_id).await
    }

    pub async fn issue_token(
        &self,
        user_id: i64,
        ttl: Duration,
        device_info: Option<&str>,
    ) -> Result<AuthToken> {
        self.auth_token_repo()
            .issue(user_id, ttl, device_info)
            .await
    }

    pub async fn find_token(&self, token: &str) -> Result<Option<AuthToken>> {
        self.auth_token_repo().find(token).await
    }

    pub async fn revoke_token(&self, token: &str) -> Result<bool> {
        self.auth_token_repo().revoke(token).await
    }

    pub async fn list_active_tokens(&self, user_id: i64) -> Result<Vec<AuthToken>> {
        self.auth_token_repo().list_active(user_id).await
    }
}

fn pool_options(config: &DatabaseConfig) -> Result<ConnectOptions> {
    let pool = &config.pool;

    let mut opt = ConnectOptions::new(config.connection_url()?);
    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(Duration::from_secs(pool.connect_timeout_seconds))
        .acquire_timeout(Duration::from_secs(pool.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(pool.idle_timeout_seconds))
        .max_lifetime(Duration::from_secs(pool.max_lifetime_seconds))
        .sqlx_logging(false);

    Ok(opt)
}
