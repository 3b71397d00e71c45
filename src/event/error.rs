use crate::subscriber::error::SubscriberError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EventError {
    #[error("Unknown signal \"{name}\"")]
    UnknownSignal { name: String },
}

/// Why a handler did not complete during dispatch.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Failed(#[from] SubscriberError),

    #[error("Handler panicked: {message}")]
    Panicked { message: String },
}
