//! Error types for sqlmason

use thiserror::Error;

/// Result type alias for sqlmason operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for statement construction and execution
#[derive(Debug, Error)]
pub enum SqlError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Statement construction rejected bad input
    #[error("Validation error: {0}")]
    Validation(String),

    /// The security scan found a forbidden token in rendered SQL
    #[error("Security violation: forbidden token '{0}'")]
    Security(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A bulk insert failed; carries the statement template for diagnosis
    #[error("Batch insert failed for template '{template}': {message}")]
    BatchInsert { template: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a security violation error for a matched token
    pub fn security(token: impl Into<String>) -> Self {
        Self::Security(token.into())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a security violation
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Security(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific SqlError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                _ => {}
            }
        }
        Self::Query(err)
    }
}
