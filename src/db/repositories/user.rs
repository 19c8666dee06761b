use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::users;

/// Fields required to register a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
}

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub last_login: Option<chrono::NaiveDateTime>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            is_active: model.is_active.unwrap_or(true),
            last_login: model.last_login,
        }
    }
}

pub struct UserRepository<'a> {
    conn: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(conn: &'a DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a user and returns the generated id.
    pub async fn create(&self, user: &NewUser) -> Result<i64> {
        let active = users::ActiveModel {
            username: Set(user.username.clone()),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            full_name: Set(user.full_name.clone()),
            ..Default::default()
        };

        let result = users::Entity::insert(active)
            .exec(self.conn)
            .await
            .with_context(|| format!("Failed to create user: {}", user.username))?;

        Ok(result.last_insert_id)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Deletes a user. Tokens go with it; log rows keep existing with a NULL user.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn record_login(&self, id: i64) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query user for login update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let now = chrono::Utc::now().naive_utc();

        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(now));
        active.updated_at = Set(Some(now));
        active.update(self.conn).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn row(id: i64, username: &str) -> users::Model {
        users::Model {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$2b$12$".to_string() + &"a".repeat(53),
            full_name: None,
            created_at: None,
            updated_at: None,
            is_active: None,
            last_login: None,
        }
    }

    #[tokio::test]
    async fn test_get_by_username_hides_hash_and_defaults_active() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[row(1, "alice")]])
            .into_connection();

        let user = UserRepository::new(&db)
            .get_by_username("alice")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let repo = UserRepository::new(&db);
        assert!(repo.delete(1).await.unwrap());
        assert!(!repo.delete(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_login_requires_existing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<users::Model>::new()])
            .into_connection();

        let err = UserRepository::new(&db).record_login(9).await.unwrap_err();
        assert!(err.to_string().contains("User not found: 9"));
    }
}
