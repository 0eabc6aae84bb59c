//! Error types for pgstanza

use thiserror::Error;

/// Result type alias for pgstanza operations
pub type StanzaResult<T> = Result<T, StanzaError>;

/// Error types for statement building and database operations
#[derive(Debug, Error)]
pub enum StanzaError {
    /// Neither the definition nor its scheme names a table
    #[error("no table name: neither the definition nor its scheme names one")]
    MissingTable,

    /// A write verb was given without a field list or data map
    #[error("{verb} requires a field list or a data map")]
    MissingFieldList { verb: &'static str },

    /// REPLACE needs a scheme primary key to build its conflict target
    #[error("REPLACE requires a scheme primary key for table '{0}'")]
    MissingPrimaryKey(String),

    /// Malformed filter clause or parameter map
    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    /// A placeholder in the SQL has no bound value
    #[error("no value bound for placeholder ':{0}'")]
    MissingParameter(String),

    /// Database connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("check constraint violation: {0}")]
    CheckViolation(String),

    /// Row not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Value serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),
}

impl StanzaError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a configuration error raised while building a statement
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTable
                | Self::MissingFieldList { .. }
                | Self::MissingPrimaryKey(_)
                | Self::MalformedFilter(_)
                | Self::MissingParameter(_)
        )
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Parse a tokio_postgres error into a more specific StanzaError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}
