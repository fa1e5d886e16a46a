//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. A missing or expired key is
//! never an error; lookups report it as `Ok(None)`.

use thiserror::Error;

use crate::config::BackendType;

// == Cache Error Enum ==
/// Unified error type for every backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration could not be resolved (unknown backend, bad duration)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The backend could not open its storage handle
    #[error("Failed to initialize {backend} backend: {reason}")]
    Init {
        backend: BackendType,
        reason: String,
    },

    /// An operation was issued before `init`
    #[error("The {0} backend has not been initialized")]
    NotInitialized(BackendType),

    /// Failure inside the embedded engine
    #[error("Embedded storage error: {0}")]
    Embedded(#[from] redb::Error),

    /// Failure talking to the networked store
    #[error("Network storage error: {0}")]
    Network(#[from] redis::RedisError),

    /// No pooled connection could be checked out
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored record could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Builds an `Init` error from anything displayable.
    pub fn init(backend: BackendType, reason: impl std::fmt::Display) -> Self {
        CacheError::Init {
            backend,
            reason: reason.to_string(),
        }
    }
}

// redb splits its errors by phase; funnel each through `redb::Error`.
macro_rules! embedded_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CacheError {
                fn from(err: $source) -> Self {
                    CacheError::Embedded(err.into())
                }
            }
        )*
    };
}

embedded_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
