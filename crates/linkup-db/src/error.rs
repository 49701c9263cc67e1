//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// A stored value could not be mapped to its domain type
    #[error("invalid stored value: {0}")]
    Decode(String),

    /// Unique constraint violated
    #[error("duplicate record: {0}")]
    Duplicate(String),
}

impl DbError {
    /// Map a unique-violation into [`DbError::Duplicate`], passing other errors through
    pub fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return Self::Duplicate(db.message().to_string());
            }
        }
        Self::Sqlx(err)
    }
}

impl From<linkup_types::ParseEnumError> for DbError {
    fn from(err: linkup_types::ParseEnumError) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result alias for repository operations
pub type DbResult<T> = Result<T, DbError>;
