//! Network Backend
//!
//! Redis-backed cache. Redis tracks expiration natively, so this adapter only
//! translates the contract into `SET PX`, `GET`, `PTTL` and `DEL`. Connections
//! come from an r2d2 pool created during `init`.

use chrono::TimeDelta;
use r2d2::{Pool, PooledConnection};
use tracing::{debug, info, instrument};

use super::CacheBackend;
use crate::config::{BackendType, CacheConfig};
use crate::error::{CacheError, Result};

/// `PTTL` reply for a key that does not exist
const PTTL_MISSING: i64 = -2;
/// `PTTL` reply for a key that exists without an expiry
const PTTL_PERSISTENT: i64 = -1;

// == Network Backend ==
/// Native-TTL backend talking to a Redis server.
pub struct NetworkBackend {
    config: CacheConfig,
    pool: Option<Pool<redis::Client>>,
}

impl NetworkBackend {
    // == Constructor ==
    /// Creates an unconnected backend; call `init` before use.
    pub fn new(config: CacheConfig) -> Self {
        Self { config, pool: None }
    }

    /// Connection URL built from the configured address and database.
    pub fn connection_url(&self) -> String {
        format!(
            "redis://{}/{}",
            self.config.network_address, self.config.network_database_index
        )
    }

    fn connection(&self) -> Result<PooledConnection<redis::Client>> {
        let pool = self
            .pool
            .as_ref()
            .ok_or(CacheError::NotInitialized(BackendType::NetworkedKv))?;
        Ok(pool.get()?)
    }

    /// Default TTL in whole milliseconds; Redis rejects `PX 0`.
    fn ttl_millis(&self) -> u64 {
        let millis = self.config.default_ttl.as_millis().max(1);
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Maps a `PTTL` reply onto the contract's remaining-lifetime result.
fn remaining_from_pttl(reply: i64) -> Option<TimeDelta> {
    match reply {
        PTTL_MISSING => None,
        PTTL_PERSISTENT => Some(TimeDelta::MAX),
        millis => Some(TimeDelta::milliseconds(millis)),
    }
}

impl CacheBackend for NetworkBackend {
    #[instrument(skip(self), fields(backend = "networked-kv"))]
    fn init(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let url = self.connection_url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CacheError::init(BackendType::NetworkedKv, format!("{}: {}", url, e)))?;

        // build() waits for the initial connections, so an unreachable server fails here
        let pool = Pool::builder()
            .max_size(self.config.network_pool_size)
            .connection_timeout(self.config.network_connect_timeout)
            .build(client)
            .map_err(|e| CacheError::init(BackendType::NetworkedKv, format!("{}: {}", url, e)))?;
        self.pool = Some(pool);

        info!(
            "Redis cache ready: address={}, db={}, default_ttl={:?}",
            self.config.network_address,
            self.config.network_database_index,
            self.config.default_ttl
        );
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "networked-kv"))]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection()?;
        let content: Option<Vec<u8>> = redis::cmd("GET").arg(key).query(&mut *conn)?;

        if content.is_some() {
            debug!("Cache hit: {}", key);
        } else {
            debug!("Cache miss: {}", key);
        }
        Ok(content)
    }

    #[instrument(skip(self, content), fields(backend = "networked-kv", len = content.len()))]
    fn set(&self, key: &str, content: &[u8]) -> Result<()> {
        let mut conn = self.connection()?;
        redis::cmd("SET")
            .arg(key)
            .arg(content)
            .arg("PX")
            .arg(self.ttl_millis())
            .query::<()>(&mut *conn)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "networked-kv"))]
    fn get_ttl(&self, key: &str) -> Result<Option<TimeDelta>> {
        let mut conn = self.connection()?;
        let reply: i64 = redis::cmd("PTTL").arg(key).query(&mut *conn)?;
        Ok(remaining_from_pttl(reply))
    }

    #[instrument(skip(self), fields(backend = "networked-kv"))]
    fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection()?;
        redis::cmd("DEL").arg(key).query::<i64>(&mut *conn)?;
        Ok(())
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_connection_url() {
        let config = CacheConfig {
            network_address: "cache.internal:6380".to_string(),
            network_database_index: 5,
            ..CacheConfig::default()
        };

        let backend = NetworkBackend::new(config);
        assert_eq!(backend.connection_url(), "redis://cache.internal:6380/5");
    }

    #[test]
    fn test_pttl_mapping() {
        assert_eq!(remaining_from_pttl(-2), None);
        assert_eq!(remaining_from_pttl(-1), Some(TimeDelta::MAX));
        assert_eq!(remaining_from_pttl(0), Some(TimeDelta::zero()));
        assert_eq!(
            remaining_from_pttl(599_000),
            Some(TimeDelta::milliseconds(599_000))
        );
    }

    #[test]
    fn test_ttl_millis_never_zero() {
        let config = CacheConfig {
            default_ttl: Duration::from_micros(10),
            ..CacheConfig::default()
        };

        assert_eq!(NetworkBackend::new(config).ttl_millis(), 1);
    }

    #[test]
    fn test_network_requires_init() {
        let backend = NetworkBackend::new(CacheConfig::default());
        assert!(matches!(
            backend.get("key"),
            Err(CacheError::NotInitialized(BackendType::NetworkedKv))
        ));
    }

    #[test]
    fn test_network_init_rejects_malformed_address() {
        let config = CacheConfig {
            network_address: "localhost:notaport".to_string(),
            network_connect_timeout: Duration::from_millis(200),
            ..CacheConfig::default()
        };

        let mut backend = NetworkBackend::new(config);
        assert!(matches!(
            backend.init(),
            Err(CacheError::Init {
                backend: BackendType::NetworkedKv,
                ..
            })
        ));
    }

    #[test]
    fn test_network_init_fails_when_unreachable() {
        // Port 1 on localhost is not expected to run Redis
        let config = CacheConfig {
            network_address: "127.0.0.1:1".to_string(),
            network_connect_timeout: Duration::from_millis(500),
            network_pool_size: 1,
            ..CacheConfig::default()
        };

        let mut backend = NetworkBackend::new(config);
        assert!(matches!(backend.init(), Err(CacheError::Init { .. })));
    }
}
