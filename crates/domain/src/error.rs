use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid class metadata: {0}")]
    InvalidMetadata(String),
    #[error("unknown emotion label {0:?}")]
    UnknownLabel(String),
}

impl DomainError {
    pub fn invalid_metadata<T: Into<String>>(message: T) -> Self {
        Self::InvalidMetadata(message.into())
    }
}
