use crate::event::Signal;
use crate::repository::error::DatabaseError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SubscriberError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Payload of \"{signal}\" is missing {field}")]
    MissingPayload { signal: Signal, field: &'static str },

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl SubscriberError {
    /// Whether the dispatcher may retry the handler.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DatabaseError(err) => err.is_transient(),
            Self::NotFound { .. } | Self::MissingPayload { .. } => false,
        }
    }
}
