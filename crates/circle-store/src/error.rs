use thiserror::Error;

/// Failures a user can cause. Storage trouble is never surfaced here: the
/// stores log it and keep their in-memory state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("An account with this email already exists.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("{0}")]
    NotSignedIn(&'static str),

    #[error("Please share something before posting.")]
    EmptyPost,

    #[error("Messages cannot be empty.")]
    EmptyMessage,
}

pub type StoreResult<T> = Result<T, StoreError>;
