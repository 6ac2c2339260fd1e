use domain::user::UserError;
use thiserror::Error;

/// Application level failures.
///
/// Messages are safe to show to an operator; technical detail is logged
/// where the error is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Credential(String),
    #[error("{0}")]
    Persistence(String),
    #[error("{0}")]
    Unauthorized(String),
}

impl AppError {
    /// Maps a store failure, keeping not-found distinct from everything else.
    pub fn from_user_error(err: UserError, persistence_msg: &str) -> Self {
        match err {
            UserError::UserNotFound(id) => AppError::NotFound(format!("user {}", id)),
            UserError::InvalidUserType(t) => AppError::Validation(format!("invalid user type: {}", t)),
            _ => AppError::Persistence(persistence_msg.to_string()),
        }
    }
}
