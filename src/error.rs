//! Errors surfaced by the chat operations.
//!
//! Every variant is shown to the participant as a short inline message.
//! `Transient` wraps storage, network and filesystem failures; they are
//! logged and never retried.

use axum::http::StatusCode;
use thiserror::Error;

pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("Username already taken")]
    DuplicateUsername,

    /// Bad credentials. The cause is never distinguished.
    #[error("Invalid login")]
    AuthenticationFailure,

    /// Only the author of a message may delete it.
    #[error("Only owner can delete")]
    Unauthorized,

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        ChatError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ChatError::NotFound { entity, id: id.into() }
    }

    pub fn status(&self) -> StatusCode {
        use ChatError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            DuplicateUsername => StatusCode::CONFLICT,
            AuthenticationFailure => StatusCode::UNAUTHORIZED,
            Unauthorized => StatusCode::FORBIDDEN,
            NotFound { .. } => StatusCode::NOT_FOUND,
            Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the participant can act on this error by changing their input.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ChatError::Transient(_))
    }
}

macro_rules! transient_impl {
    ($E:ty) => {
        impl From<$E> for ChatError {
            fn from(err: $E) -> Self {
                Self::Transient(anyhow::Error::from(err))
            }
        }
    };
}

transient_impl!(sqlx::Error);
transient_impl!(std::io::Error);
transient_impl!(reqwest::Error);
transient_impl!(serde_json::Error);
