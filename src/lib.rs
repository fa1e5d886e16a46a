//! Polycache - One cache contract, three storage backends
//!
//! Provides get/set/TTL operations over a process-local moka cache, an
//! embedded redb database with emulated expiration, or a Redis server.
//! The backend is chosen by configuration and hidden behind [`CacheBackend`].

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;

pub use backend::CacheBackend;
pub use config::{BackendType, CacheConfig, CacheOverrides};
pub use dispatch::{init_cache, open_backend, Cache};
pub use error::{CacheError, Result};
