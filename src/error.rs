//! Error types for the image cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// An argument was rejected before any state was touched
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine has been disposed and no longer accepts operations
    #[error("Cache has been disposed")]
    Disposed,

    /// The memory budget source could not report a ceiling
    #[error("Memory budget unavailable: {0}")]
    BudgetUnavailable(String),
}

// == Result Type Alias ==
/// Convenience Result type for the image cache.
pub type Result<T> = std::result::Result<T, CacheError>;
