//! Backend Module
//!
//! The uniform cache contract and its three storage strategies.
//!
//! # Backends
//! - [`MemoryBackend`] - process-local moka cache, native expiration
//! - [`EmbeddedBackend`] - redb database on disk, expiration emulated here
//! - [`NetworkBackend`] - Redis, native expiration

mod embedded;
mod memory;
mod network;


use chrono::TimeDelta;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

pub use embedded::EmbeddedBackend;
pub use memory::MemoryBackend;
pub use network::NetworkBackend;

// == Cache Backend ==
/// Operations every backend implements with identical observable behavior.
///
/// A backend is constructed from a [`CacheConfig`], then opened with
/// [`init`](CacheBackend::init). After that it is shared through `&self`;
/// concurrency safety is provided by the underlying storage library.
///
/// Missing and expired keys are reported as `Ok(None)`, never as errors.
pub trait CacheBackend: Send + Sync {
    /// Opens the underlying storage handle.
    ///
    /// Calling `init` on an already initialized backend does nothing.
    fn init(&mut self) -> Result<()>;

    /// Returns the content stored under `key` if the entry is live.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `content` under `key`, expiring after the configured default TTL.
    ///
    /// Any existing entry is overwritten unconditionally.
    fn set(&self, key: &str, content: &[u8]) -> Result<()>;

    /// Returns the time left before `key` expires.
    ///
    /// The duration may be zero or negative when an expired entry has not been
    /// reaped yet. Use [`get`](CacheBackend::get) for a strict liveness check.
    fn get_ttl(&self, key: &str) -> Result<Option<TimeDelta>>;

    /// Restarts the lifetime of `key`, storing `content` as its value.
    ///
    /// This is a plain [`set`](CacheBackend::set): content the caller wants to
    /// keep must be passed again.
    fn extend_ttl(&self, key: &str, content: &[u8]) -> Result<()> {
        self.set(key, content)
    }

    /// Removes `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// The configuration this backend was built with.
    fn config(&self) -> &CacheConfig;
}

/// The configured default TTL as a signed offset for expiry arithmetic.
fn lifetime(config: &CacheConfig) -> Result<TimeDelta> {
    TimeDelta::from_std(config.default_ttl).map_err(|_| {
        CacheError::Config(format!(
            "default_ttl {:?} is out of range",
            config.default_ttl
        ))
    })
}
