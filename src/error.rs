use thiserror::Error;

use crate::db::DataAccessError;

/// Failures a handler turns into a flash message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub const UNAUTHORIZED: &str = "Unauthorized";
pub const UNAUTHORIZED_OR_MISSING: &str = "Unauthorized or not found";

/// Ownership check: the record's owner column must be the principal.
pub fn ensure_owner(owner: Option<i64>, principal: i64, message: &'static str) -> Result<(), AppError> {
    if owner == Some(principal) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(message))
    }
}
