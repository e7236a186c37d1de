//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(#[source] sqlx::Error),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write. `constraint` lists the columns,
    /// e.g. `participants.conversation_id, participants.user_id`.
    #[error("Duplicate entity: {constraint}")]
    Duplicate { constraint: String },

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatabaseError {
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Whether this is a unique violation raised by a constraint on `table`.
    pub fn is_duplicate_on(&self, table: &str) -> bool {
        match self {
            Self::Duplicate { constraint } => constraint
                .split(',')
                .any(|column| column.trim().starts_with(&format!("{table}."))),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let message = db_err.message();
                let constraint = message
                    .strip_prefix("UNIQUE constraint failed: ")
                    .unwrap_or(message)
                    .to_string();
                Self::Duplicate { constraint }
            }
            other => Self::QueryError(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_matches_owning_table() {
        let err = DatabaseError::Duplicate {
            constraint: "participants.conversation_id, participants.user_id".to_string(),
        };

        assert!(err.is_duplicate());
        assert!(err.is_duplicate_on("participants"));
        assert!(!err.is_duplicate_on("invitations"));
    }

    #[test]
    fn row_not_found_is_a_query_error() {
        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DatabaseError::QueryError(_)));
        assert!(!err.is_duplicate());
    }
}
