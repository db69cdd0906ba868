use thiserror::Error;

/// Stable classification of a [`SocialError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,
    InvalidState,
    Precondition,
    InvalidOperation,
    Unauthorized,
    ServerFault,
}

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{0}")]
    InvalidInput(&'static str),

    /// Names the missing document kind, e.g. `"User"`.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    AlreadyExists(&'static str),

    #[error("{0}")]
    InvalidState(&'static str),

    #[error("{0}")]
    Precondition(&'static str),

    #[error("{0}")]
    InvalidOperation(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    /// Persistence failure. The message never includes the cause.
    #[error("Server error")]
    Server(#[from] anyhow::Error),
}

impl SocialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Server(_) => ErrorKind::ServerFault,
        }
    }
}
