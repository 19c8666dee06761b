//! Dialect-aware creation of the `users`, `auth_tokens` and `auth_logs` tables.
//!
//! Each table maps to a [`TablePlan`]: one `CREATE TABLE IF NOT EXISTS`
//! statement plus, on PostgreSQL, its `CREATE INDEX IF NOT EXISTS` statements.
//! MySQL declares the same indexes inline and uses the InnoDB engine so the
//! foreign keys are enforced.
//!
//! All plans run inside a single transaction in [`SchemaTable::CREATION_ORDER`].

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use sea_orm_migration::prelude::*;
use tracing::{debug, error, info, warn};

use super::{DbError, Dialect};

/// The tables this crate owns, in foreign-key dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaTable {
    Users,
    AuthTokens,
    AuthLogs,
}

impl SchemaTable {
    /// `users` is referenced by the other two tables and must come first.
    pub const CREATION_ORDER: [Self; 3] = [Self::Users, Self::AuthTokens, Self::AuthLogs];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::AuthTokens => "auth_tokens",
            Self::AuthLogs => "auth_logs",
        }
    }

    #[must_use]
    pub fn plan(self, dialect: Dialect) -> TablePlan {
        match self {
            Self::Users => users_plan(dialect),
            Self::AuthTokens => auth_tokens_plan(dialect),
            Self::AuthLogs => auth_logs_plan(dialect),
        }
    }
}

/// The statements that create one table for one dialect.
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub table: TableCreateStatement,
    pub indexes: Vec<IndexCreateStatement>,
}

impl TablePlan {
    async fn execute(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager.create_table(self.table.clone()).await?;
        for index in &self.indexes {
            manager.create_index(index.clone()).await?;
        }
        Ok(())
    }

    /// Renders the plan as SQL text for `dialect`.
    #[must_use]
    pub fn to_sql(&self, dialect: Dialect) -> Vec<String> {
        let backend = dialect.backend();
        std::iter::once(backend.build(&self.table).sql)
            .chain(self.indexes.iter().map(|index| backend.build(index).sql))
            .collect()
    }
}

/// Parses `dialect_tag` and creates the schema. An unsupported tag fails
/// before anything is sent to the database.
pub async fn create_tables(db: &DatabaseConnection, dialect_tag: &str) -> Result<(), DbError> {
    let dialect: Dialect = dialect_tag.parse()?;
    create_tables_for(db, dialect).await
}

/// Creates all tables in one transaction. Every statement is guarded with
/// `IF NOT EXISTS`, so running this against an existing schema is a no-op.
///
/// On failure the transaction is rolled back and the error names the table
/// whose statements failed.
pub async fn create_tables_for(db: &DatabaseConnection, dialect: Dialect) -> Result<(), DbError> {
    let backend = db.get_database_backend();
    if Dialect::from_backend(backend) != Some(dialect) {
        return Err(DbError::BackendMismatch { dialect, backend });
    }

    let txn = db.begin().await.map_err(DbError::Transaction)?;

    if let Err((table, source)) = execute_plans(&txn, dialect).await {
        error!(table = table.name(), %dialect, "Table creation failed: {source}");
        if let Err(rollback_err) = txn.rollback().await {
            warn!("Rollback after failed table creation also failed: {rollback_err}");
        }
        return Err(DbError::CreateTable {
            table: table.name(),
            source,
        });
    }

    txn.commit().await.map_err(DbError::Transaction)?;
    info!(%dialect, "Schema ready: users, auth_tokens, auth_logs");
    Ok(())
}

async fn execute_plans(
    txn: &DatabaseTransaction,
    dialect: Dialect,
) -> Result<(), (SchemaTable, DbErr)> {
    let manager = SchemaManager::new(txn);

    for table in SchemaTable::CREATION_ORDER {
        table
            .plan(dialect)
            .execute(&manager)
            .await
            .map_err(|source| (table, source))?;
        debug!(table = table.name(), "Table ensured");
    }

    Ok(())
}

/// Renders every statement of the schema for `dialect`, in execution order.
#[must_use]
pub fn schema_sql(dialect: Dialect) -> Vec<String> {
    SchemaTable::CREATION_ORDER
        .into_iter()
        .flat_map(|table| table.plan(dialect).to_sql(dialect))
        .collect()
}

fn users_plan(dialect: Dialect) -> TablePlan {
    let mut updated_at = ColumnDef::new(Users::UpdatedAt);
    updated_at.timestamp().default(Expr::current_timestamp());
    if dialect == Dialect::MySql {
        updated_at.extra("ON UPDATE CURRENT_TIMESTAMP");
    }

    let table = Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Users::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Users::Username)
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(Users::Email)
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Users::PasswordHash).char_len(60).not_null())
        .col(ColumnDef::new(Users::FullName).string_len(255).null())
        .col(
            ColumnDef::new(Users::CreatedAt)
                .timestamp()
                .default(Expr::current_timestamp()),
        )
        .col(&mut updated_at)
        .col(ColumnDef::new(Users::IsActive).boolean().default(true))
        .col(ColumnDef::new(Users::LastLogin).timestamp().null())
        .to_owned();

    finish_plan(
        dialect,
        table,
        vec![
            index("idx_username", Users::Table, [Users::Username]),
            index("idx_email", Users::Table, [Users::Email]),
        ],
    )
}

fn auth_tokens_plan(dialect: Dialect) -> TablePlan {
    let table = Table::create()
        .table(AuthTokens::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AuthTokens::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(AuthTokens::UserId).big_integer().not_null())
        .col(
            ColumnDef::new(AuthTokens::Token)
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(AuthTokens::CreatedAt)
                .timestamp()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(AuthTokens::ExpiresAt).timestamp().not_null())
        .col(ColumnDef::new(AuthTokens::IsRevoked).boolean().default(false))
        .col(ColumnDef::new(AuthTokens::DeviceInfo).text())
        .foreign_key(
            ForeignKey::create()
                .name("fk_auth_tokens_user")
                .from(AuthTokens::Table, AuthTokens::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned();

    finish_plan(
        dialect,
        table,
        vec![
            index("idx_token", AuthTokens::Table, [AuthTokens::Token]),
            index(
                "idx_user_tokens",
                AuthTokens::Table,
                [AuthTokens::UserId, AuthTokens::IsRevoked],
            ),
        ],
    )
}

fn auth_logs_plan(dialect: Dialect) -> TablePlan {
    let table = Table::create()
        .table(AuthLogs::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AuthLogs::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        // Nullable: log rows outlive the user they describe.
        .col(ColumnDef::new(AuthLogs::UserId).big_integer().null())
        .col(ColumnDef::new(AuthLogs::Action).string_len(50).not_null())
        .col(ColumnDef::new(AuthLogs::IpAddress).string_len(45).not_null())
        .col(ColumnDef::new(AuthLogs::UserAgent).text())
        .col(
            ColumnDef::new(AuthLogs::Timestamp)
                .timestamp()
                .default(Expr::current_timestamp()),
        )
        .col(ColumnDef::new(AuthLogs::StatusCode).integer().not_null())
        .col(ColumnDef::new(AuthLogs::Description).text())
        .foreign_key(
            ForeignKey::create()
                .name("fk_auth_logs_user")
                .from(AuthLogs::Table, AuthLogs::UserId)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::SetNull),
        )
        .to_owned();

    finish_plan(
        dialect,
        table,
        vec![
            index(
                "idx_user_logs",
                AuthLogs::Table,
                [AuthLogs::UserId, AuthLogs::Timestamp],
            ),
            index("idx_action", AuthLogs::Table, [AuthLogs::Action]),
            index("idx_timestamp", AuthLogs::Table, [AuthLogs::Timestamp]),
        ],
    )
}

fn index<T, C, I>(name: &str, table: T, columns: I) -> IndexCreateStatement
where
    T: Iden + 'static,
    C: Iden + 'static,
    I: IntoIterator<Item = C>,
{
    let mut index = Index::create();
    index.name(name).table(table);
    for column in columns {
        index.col(column);
    }
    index
}

/// MySQL takes the indexes inside `CREATE TABLE`; PostgreSQL needs separate
/// guarded `CREATE INDEX` statements.
fn finish_plan(
    dialect: Dialect,
    mut table: TableCreateStatement,
    indexes: Vec<IndexCreateStatement>,
) -> TablePlan {
    match dialect {
        Dialect::MySql => {
            for mut index in indexes {
                table.index(&mut index);
            }
            table.engine("InnoDB");
            TablePlan {
                table,
                indexes: Vec::new(),
            }
        }
        Dialect::Postgres => TablePlan {
            table,
            indexes: indexes
                .into_iter()
                .map(|mut index| {
                    index.if_not_exists();
                    index
                })
                .collect(),
        },
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FullName,
    CreatedAt,
    UpdatedAt,
    IsActive,
    LastLogin,
}

#[derive(Iden)]
enum AuthTokens {
    Table,
    Id,
    UserId,
    Token,
    CreatedAt,
    ExpiresAt,
    IsRevoked,
    DeviceInfo,
}

#[derive(Iden)]
enum AuthLogs {
    Table,
    Id,
    UserId,
    Action,
    IpAddress,
    UserAgent,
    Timestamp,
    StatusCode,
    Description,
}
