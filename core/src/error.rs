//! Error taxonomy shared by every core operation.

use thiserror::Error;

/// Stable machine-readable classification of a [`CoreError`].
///
/// The HTTP layer maps each kind to a status code; clients branch on the
/// kind string rather than parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyRegistered,
    Conflict,
    Unauthorized,
    NothingToWithdraw,
    DependencyFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyRegistered => "already_registered",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NothingToWithdraw => "nothing_to_withdraw",
            ErrorKind::DependencyFailure => "dependency_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("address {0} is already registered")]
    AlreadyRegistered(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("no pending rewards to withdraw for {0}")]
    NothingToWithdraw(String),

    #[error("settlement failed: {0}")]
    Settlement(#[from] crate::settlement::SettlementError),

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::NothingToWithdraw(_) => ErrorKind::NothingToWithdraw,
            CoreError::Settlement(_) => ErrorKind::DependencyFailure,
            CoreError::Internal(_) | CoreError::Database(_) | CoreError::Migration(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
