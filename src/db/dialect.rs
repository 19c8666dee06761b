use sea_orm::DatabaseBackend;
use std::fmt;
use std::str::FromStr;

use super::DbError;

/// The relational database products this crate can bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    pub const ALL: [Self; 2] = [Self::MySql, Self::Postgres];

    /// Configuration tag, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    #[must_use]
    pub const fn backend(self) -> DatabaseBackend {
        match self {
            Self::MySql => DatabaseBackend::MySql,
            Self::Postgres => DatabaseBackend::Postgres,
        }
    }

    #[must_use]
    pub const fn url_scheme(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::MySql => 3306,
            Self::Postgres => 5432,
        }
    }

    /// Maps a connection backend back to a dialect. `None` for backends this
    /// crate has no DDL for.
    #[must_use]
    pub const fn from_backend(backend: DatabaseBackend) -> Option<Self> {
        match backend {
            DatabaseBackend::MySql => Some(Self::MySql),
            DatabaseBackend::Postgres => Some(Self::Postgres),
            _ => None,
        }
    }
}

impl FromStr for Dialect {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::MySql),
            "postgres" => Ok(Self::Postgres),
            other => Err(DbError::UnsupportedDialect(other.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_tags() {
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::Postgres);
    }

    #[test]
    fn test_parse_is_exact() {
        for tag in ["", "MySQL", "postgresql", "sqlite", " mysql"] {
            let err = tag.parse::<Dialect>().unwrap_err();
            assert!(
                matches!(&err, DbError::UnsupportedDialect(t) if t == tag),
                "unexpected error for {tag:?}: {err}"
            );
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.to_string().parse::<Dialect>().unwrap(), dialect);
            assert_eq!(Dialect::from_backend(dialect.backend()), Some(dialect));
        }
        assert_eq!(Dialect::from_backend(DatabaseBackend::Sqlite), None);
    }
}
