//! Application-level errors raised during startup.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Configuration error: {msg}")]
    ConfigurationError { msg: String },
}
