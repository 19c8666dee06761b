//! Errors raised while connecting to the database and creating the schema.

use sea_orm::{DatabaseBackend, DbErr};
use thiserror::Error;

use super::Dialect;

#[derive(Debug, Error)]
pub enum DbError {
    /// The configured dialect tag is not one of `mysql` or `postgres`.
    #[error("unsupported database type: {0}")]
    UnsupportedDialect(String),

    /// The connection speaks a different dialect than the one configured.
    #[error("dialect {dialect} does not match connection backend {backend:?}")]
    BackendMismatch {
        dialect: Dialect,
        backend: DatabaseBackend,
    },

    #[error("failed to connect to {dialect} database: {source}")]
    Connection {
        dialect: Dialect,
        #[source]
        source: DbErr,
    },

    #[error("failed to create {table} table: {source}")]
    CreateTable {
        table: &'static str,
        #[source]
        source: DbErr,
    },

    /// Beginning, committing or rolling back the schema transaction failed.
    #[error("schema transaction error: {0}")]
    Transaction(#[source] DbErr),
}
