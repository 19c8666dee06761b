use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::time::Duration;

use crate::entities::{auth_tokens, prelude::*};

pub struct AuthTokenRepository<'a> {
    conn: &'a DatabaseConnection,
}

impl<'a> AuthTokenRepository<'a> {
    #[must_use]
    pub const fn new(conn: &'a DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issues a fresh random token for `user_id` valid for `ttl`.
    pub async fn issue(
        &self,
        user_id: i64,
        ttl: Duration,
        device_info: Option<&str>,
    ) -> Result<auth_tokens::Model> {
        let ttl = chrono::Duration::from_std(ttl).context("Token TTL out of range")?;
        let now = Utc::now().naive_utc();

        let active = auth_tokens::ActiveModel {
            user_id: Set(user_id),
            token: Set(generate_token()),
            created_at: Set(Some(now)),
            expires_at: Set(now + ttl),
            is_revoked: Set(Some(false)),
            device_info: Set(device_info.map(str::to_string)),
            ..Default::default()
        };

        active
            .insert(self.conn)
            .await
            .with_context(|| format!("Failed to issue token for user {user_id}"))
    }

    pub async fn find(&self, token: &str) -> Result<Option<auth_tokens::Model>> {
        AuthTokens::find()
            .filter(auth_tokens::Column::Token.eq(token))
            .one(self.conn)
            .await
            .context("Failed to query auth token")
    }

    /// Marks a token revoked. Returns `false` if no such token exists.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let Some(model) = self.find(token).await? else {
            return Ok(false);
        };

        let mut active: auth_tokens::ActiveModel = model.into();
        active.is_revoked = Set(Some(true));
        active
            .update(self.conn)
            .await
            .context("Failed to revoke auth token")?;

        Ok(true)
    }

    /// Unrevoked, unexpired tokens for a user, newest first.
    pub async fn list_active(&self, user_id: i64) -> Result<Vec<auth_tokens::Model>> {
        let now = Utc::now().naive_utc();

        AuthTokens::find()
            .filter(auth_tokens::Column::UserId.eq(user_id))
            .filter(
                Condition::any()
                    .add(auth_tokens::Column::IsRevoked.eq(false))
                    .add(auth_tokens::Column::IsRevoked.is_null()),
            )
            .filter(auth_tokens::Column::ExpiresAt.gt(now))
            .order_by_desc(auth_tokens::Column::CreatedAt)
            .all(self.conn)
            .await
            .context("Failed to list active auth tokens")
    }
}

/// Generate a random token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
