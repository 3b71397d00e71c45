use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Username \"{username}\" already exists")]
    UsernameTaken { username: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("User \"{username}\" is inactive")]
    Inactive { username: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl ServiceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Whether `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &DatabaseError) -> bool {
    match err {
        DatabaseError::BackendError(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
