//! Request context, flash messages and page rendering.

pub mod context;
pub mod flash;
pub mod format;
pub mod render;

pub use context::{PageResult, RequestContext};
pub use flash::FlashLevel;

use crate::error::AppError;

/// Form value that is present and not blank.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Optional integer form field: blank means absent.
pub fn optional_int(value: &Option<String>, field: &str) -> Result<Option<i64>, AppError> {
    non_empty(value)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| AppError::Invalid(format!("{field} must be a whole number")))
        })
        .transpose()
}

/// Required integer form field.
pub fn required_int(value: &Option<String>, field: &str) -> Result<i64, AppError> {
    optional_int(value, field)?.ok_or_else(|| AppError::Invalid(format!("{field} is required")))
}

/// Required decimal form field.
pub fn required_float(value: &Option<String>, field: &str) -> Result<f64, AppError> {
    let raw = non_empty(value).ok_or_else(|| AppError::Invalid(format!("{field} is required")))?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::Invalid(format!("{field} must be a number")))
}
