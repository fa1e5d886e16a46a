//! Backend Dispatch
//!
//! Turns a configuration into exactly one initialized backend. The returned
//! handle is owned by the caller; there is no process-wide instance.

use tracing::{info, instrument};

use crate::backend::{CacheBackend, EmbeddedBackend, MemoryBackend, NetworkBackend};
use crate::config::{BackendType, CacheConfig, CacheOverrides};
use crate::error::Result;

/// Owned handle to whichever backend the configuration selected.
pub type Cache = Box<dyn CacheBackend>;

// == Open Backend ==
/// Constructs the backend named by `config.backend_type` and initializes it.
///
/// Initialization failures are returned as-is. There is no retry and no
/// fallback to a different backend type.
#[instrument(skip(config), fields(backend = %config.backend_type))]
pub fn open_backend(config: CacheConfig) -> Result<Cache> {
    let mut backend: Cache = match config.backend_type {
        BackendType::InMemory => Box::new(MemoryBackend::new(config)),
        BackendType::EmbeddedKv => Box::new(EmbeddedBackend::new(config)),
        BackendType::NetworkedKv => Box::new(NetworkBackend::new(config)),
    };
    backend.init()?;

    info!("Cache backend opened: {}", backend.config().backend_type);
    Ok(backend)
}

// == Init Cache ==
/// Resolves `overrides` against the defaults and opens the selected backend.
///
/// An unknown backend type or malformed duration fails with
/// [`CacheError::Config`](crate::error::CacheError::Config) before any
/// backend is constructed.
pub fn init_cache(overrides: CacheOverrides) -> Result<Cache> {
    let config = CacheConfig::resolve(overrides)?;
    open_backend(config)
}
