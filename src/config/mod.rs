//! Configuration Module
//!
//! Resolves the cache configuration from defaults and optional overrides.
//! Overrides can come from environment variables, JSON, or be built directly.

mod duration;

pub use duration::{parse_duration, DurationParseError};

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CacheError, Result};

// == Defaults ==
/// Default lifetime applied by `set`
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Default Redis endpoint
pub const DEFAULT_NETWORK_ADDRESS: &str = "127.0.0.1:6379";

/// Default on-disk location for the embedded backend
pub const DEFAULT_STORAGE_PATH: &str = "/tmp/polycache";

/// Default capacity bound for the in-memory backend
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Default number of pooled Redis connections
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Default time allowed to establish a Redis connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// == Backend Type ==
/// The closed set of storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendType {
    /// Process-local store with native expiration
    InMemory,
    /// Embedded on-disk engine, expiration emulated by this crate
    EmbeddedKv,
    /// Redis, native expiration
    NetworkedKv,
}

impl BackendType {
    /// Canonical name, as used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::InMemory => "in-memory",
            BackendType::EmbeddedKv => "embedded-kv",
            BackendType::NetworkedKv => "networked-kv",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(BackendType::InMemory),
            "embedded-kv" | "embedded" | "file" | "redb" => Ok(BackendType::EmbeddedKv),
            "networked-kv" | "network" | "redis" => Ok(BackendType::NetworkedKv),
            other => Err(CacheError::Config(format!(
                "unknown backend type '{}'",
                other
            ))),
        }
    }
}

// == Cache Config ==
/// Fully resolved configuration for one backend instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheConfig {
    /// Which backend to construct
    pub backend_type: BackendType,
    /// Lifetime applied to every write
    #[serde(serialize_with = "serialize_millis")]
    pub default_ttl: Duration,
    /// `host:port` of the Redis server
    pub network_address: String,
    /// Redis logical database
    pub network_database_index: i64,
    /// Directory holding the embedded database file
    pub storage_path: PathBuf,
    /// Capacity bound for the in-memory backend
    pub max_entries: u64,
    /// Pooled Redis connections
    pub network_pool_size: u32,
    /// Time allowed to establish a Redis connection
    #[serde(serialize_with = "serialize_millis")]
    pub network_connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend_type: BackendType::InMemory,
            default_ttl: DEFAULT_TTL,
            network_address: DEFAULT_NETWORK_ADDRESS.to_string(),
            network_database_index: 0,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            max_entries: DEFAULT_MAX_ENTRIES,
            network_pool_size: DEFAULT_POOL_SIZE,
            network_connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl CacheConfig {
    // == Merge ==
    /// Applies `overrides` on top of `defaults`.
    ///
    /// Every field present in `overrides` replaces the default. String fields
    /// are parsed here, so an unknown backend type or a malformed duration
    /// fails before any backend exists.
    pub fn merge(defaults: CacheConfig, overrides: CacheOverrides) -> Result<CacheConfig> {
        let backend_type = match overrides.backend_type {
            Some(raw) => raw.parse()?,
            None => defaults.backend_type,
        };

        let default_ttl = match overrides.default_ttl {
            Some(raw) => parse_config_duration("default_ttl", &raw)?,
            None => defaults.default_ttl,
        };

        let network_connect_timeout = match overrides.network_connect_timeout {
            Some(raw) => parse_config_duration("network_connect_timeout", &raw)?,
            None => defaults.network_connect_timeout,
        };

        let network_pool_size = overrides
            .network_pool_size
            .unwrap_or(defaults.network_pool_size);
        if network_pool_size == 0 {
            return Err(CacheError::Config(
                "network_pool_size must be at least 1".to_string(),
            ));
        }

        Ok(CacheConfig {
            backend_type,
            default_ttl,
            network_address: overrides
                .network_address
                .unwrap_or(defaults.network_address),
            network_database_index: overrides
                .network_database_index
                .unwrap_or(defaults.network_database_index),
            storage_path: overrides.storage_path.unwrap_or(defaults.storage_path),
            max_entries: overrides.max_entries.unwrap_or(defaults.max_entries),
            network_pool_size,
            network_connect_timeout,
        })
    }

    /// Resolves `overrides` against the built-in defaults.
    pub fn resolve(overrides: CacheOverrides) -> Result<CacheConfig> {
        Self::merge(CacheConfig::default(), overrides)
    }
}

fn parse_config_duration(field: &str, raw: &str) -> Result<Duration> {
    parse_duration(raw).map_err(|e| CacheError::Config(format!("{}: {}", field, e)))
}

fn serialize_millis<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

// == Cache Overrides ==
/// Partial configuration; unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverrides {
    pub backend_type: Option<String>,
    pub default_ttl: Option<String>,
    pub network_address: Option<String>,
    pub network_database_index: Option<i64>,
    pub storage_path: Option<PathBuf>,
    pub max_entries: Option<u64>,
    pub network_pool_size: Option<u32>,
    pub network_connect_timeout: Option<String>,
}

impl CacheOverrides {
    /// Loads overrides from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - Backend type (`memory`, `embedded`, `redis`, ...)
    /// - `CACHE_TTL` - Default TTL as a duration string (e.g. `10m`)
    /// - `CACHE_REDIS_ADDRESS` - Redis `host:port`
    /// - `CACHE_REDIS_DB` - Redis logical database
    /// - `CACHE_PATH` - Directory for the embedded database
    /// - `CACHE_MAX_ENTRIES` - In-memory capacity bound
    /// - `CACHE_REDIS_POOL_SIZE` - Pooled Redis connections
    /// - `CACHE_REDIS_CONNECT_TIMEOUT` - Redis connect timeout (duration string)
    ///
    /// Numeric variables that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            backend_type: lookup("CACHE_BACKEND"),
            default_ttl: lookup("CACHE_TTL"),
            network_address: lookup("CACHE_REDIS_ADDRESS"),
            network_database_index: lookup("CACHE_REDIS_DB").and_then(|v| v.parse().ok()),
            storage_path: lookup("CACHE_PATH").map(PathBuf::from),
            max_entries: lookup("CACHE_MAX_ENTRIES").and_then(|v| v.parse().ok()),
            network_pool_size: lookup("CACHE_REDIS_POOL_SIZE").and_then(|v| v.parse().ok()),
            network_connect_timeout: lookup("CACHE_REDIS_CONNECT_TIMEOUT"),
        }
    }

    /// Parses overrides from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Field-wise layering: values in `self` win, gaps are filled from `fallback`.
    pub fn or(self, fallback: CacheOverrides) -> CacheOverrides {
        CacheOverrides {
            backend_type: self.backend_type.or(fallback.backend_type),
            default_ttl: self.default_ttl.or(fallback.default_ttl),
            network_address: self.network_address.or(fallback.network_address),
            network_database_index: self
                .network_database_index
                .or(fallback.network_database_index),
            storage_path: self.storage_path.or(fallback.storage_path),
            max_entries: self.max_entries.or(fallback.max_entries),
            network_pool_size: self.network_pool_size.or(fallback.network_pool_size),
            network_connect_timeout: self
                .network_connect_timeout
                .or(fallback.network_connect_timeout),
        }
    }
}
