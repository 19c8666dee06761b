use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{auth_logs, prelude::*};

/// One audit record to be written to `auth_logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLogEntry {
    /// `None` for events not tied to a known user (e.g. unknown username).
    pub user_id: Option<i64>,
    pub action: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status_code: i32,
    pub description: Option<String>,
}

impl AuthLogEntry {
    /// Entry stamped with the current time; the optional fields start empty.
    pub fn new(
        user_id: Option<i64>,
        action: impl Into<String>,
        ip_address: impl Into<String>,
        status_code: i32,
    ) -> Self {
        Self {
            user_id,
            action: action.into(),
            ip_address: ip_address.into(),
            user_agent: None,
            timestamp: Utc::now(),
            status_code,
            description: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub struct AuthLogRepository<'a> {
    conn: &'a DatabaseConnection,
}

impl<'a> AuthLogRepository<'a> {
    #[must_use]
    pub const fn new(conn: &'a DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts one row and returns its generated id. Parameters are bound by
    /// the driver, so the same call works for both dialects.
    pub async fn record(&self, entry: &AuthLogEntry) -> Result<i64> {
        let active_model = auth_logs::ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action.clone()),
            ip_address: Set(entry.ip_address.clone()),
            user_agent: Set(entry.user_agent.clone()),
            timestamp: Set(Some(entry.timestamp.naive_utc())),
            status_code: Set(entry.status_code),
            description: Set(entry.description.clone()),
            ..Default::default()
        };

        let result = AuthLogs::insert(active_model)
            .exec(self.conn)
            .await
            .with_context(|| format!("Failed to insert auth log '{}'", entry.action))?;

        Ok(result.last_insert_id)
    }

    pub async fn get(&self, id: i64) -> Result<Option<auth_logs::Model>> {
        AuthLogs::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query auth log by ID")
    }

    /// Most recent entries for a user, newest first.
    pub async fn list_for_user(&self, user_id: i64, limit: u64) -> Result<Vec<auth_logs::Model>> {
        AuthLogs::find()
            .filter(auth_logs::Column::UserId.eq(user_id))
            .order_by_desc(auth_logs::Column::Timestamp)
            .order_by_desc(auth_logs::Column::Id)
            .limit(limit)
            .all(self.conn)
            .await
            .context("Failed to list auth logs for user")
    }

    pub async fn count_by_action(&self, action: &str) -> Result<u64> {
        AuthLogs::find()
            .filter(auth_logs::Column::Action.eq(action))
            .count(self.conn)
            .await
            .context("Failed to count auth logs by action")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};

    fn sample_entry() -> AuthLogEntry {
        AuthLogEntry {
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            ..AuthLogEntry::new(Some(42), "login", "10.0.0.1", 200)
                .with_user_agent("curl/8.0")
                .with_description("password login")
        }
    }

    fn sample_row(id: i64) -> auth_logs::Model {
        let entry = sample_entry();
        auth_logs::Model {
            id,
            user_id: entry.user_id,
            action: entry.action,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            timestamp: Some(entry.timestamp.naive_utc()),
            status_code: entry.status_code,
            description: entry.description,
        }
    }

    #[tokio::test]
    async fn test_record_binds_mysql_placeholders() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 7,
                rows_affected: 1,
            }])
            .into_connection();

        let id = AuthLogRepository::new(&db)
            .record(&sample_entry())
            .await
            .unwrap();
        assert_eq!(id, 7);

        let entry = sample_entry();
        assert_eq!(
            db.into_transaction_log(),
            [Transaction::from_sql_and_values(
                DatabaseBackend::MySql,
                "INSERT INTO `auth_logs` (`user_id`, `action`, `ip_address`, `user_agent`, `timestamp`, `status_code`, `description`) VALUES (?, ?, ?, ?, ?, ?, ?)",
                [
                    Value::from(Some(42i64)),
                    "login".into(),
                    "10.0.0.1".into(),
                    Value::from(Some("curl/8.0".to_string())),
                    Value::from(Some(entry.timestamp.naive_utc())),
                    200i32.into(),
                    Value::from(Some("password login".to_string())),
                ],
            )]
        );
    }

    #[tokio::test]
    async fn test_record_uses_numbered_placeholders_on_postgres() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[sample_row(15)]])
            .into_connection();

        let id = AuthLogRepository::new(&db)
            .record(&sample_entry())
            .await
            .unwrap();
        assert_eq!(id, 15);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("$7"), "{log}");
        assert!(!log.contains('?'), "{log}");
    }

    #[tokio::test]
    async fn test_get_returns_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[sample_row(3)]])
            .into_connection();

        let row = AuthLogRepository::new(&db).get(3).await.unwrap().unwrap();
        assert_eq!(row.user_id, Some(42));
        assert_eq!(row.action, "login");
        assert_eq!(row.status_code, 200);
    }

    #[tokio::test]
    async fn test_record_surfaces_insert_failure() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_errors([sea_orm::DbErr::Custom(
                "Cannot add or update a child row".to_string(),
            )])
            .into_connection();

        let err = AuthLogRepository::new(&db)
            .record(&sample_entry())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to insert auth log 'login'"));
        assert!(format!("{err:#}").contains("Cannot add or update a child row"));
    }
}
