use thiserror::Error;

use super::element::ElementType;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ElementType,
        found: ElementType,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed matrix: {0}")]
    MalformedMatrix(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Selection cancelled")]
    Cancelled,
}

impl From<std::collections::TryReserveError> for SelectError {
    fn from(error: std::collections::TryReserveError) -> Self {
        SelectError::AllocationFailed(error.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for SelectError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        SelectError::ThreadPool(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SelectError>;
