//! Convenience result type alias for Parlor.

use crate::error::AppError;

/// A specialized `Result` type for Parlor operations.
pub type AppResult<T> = Result<T, AppError>;
