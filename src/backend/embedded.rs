//! Embedded Backend
//!
//! Persistent cache on top of redb. redb has no notion of expiration, so every
//! logical key is stored as two records written and removed together:
//!
//! - `<key>#content` - the payload
//! - `<key>#ttl` - the absolute expiry, Unix milliseconds as big-endian `i64`
//!
//! Liveness is checked on every read. Expired entries are reaped by the `get`
//! that detects them.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{debug, info, instrument, warn};

use super::{lifetime, CacheBackend};
use crate::config::{BackendType, CacheConfig};
use crate::error::{CacheError, Result};

/// Single table holding both record kinds
const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("cache_entries");

/// File created inside the configured storage directory
pub const DATABASE_FILE: &str = "cache.redb";

const CONTENT_SUFFIX: &str = "#content";
const TTL_SUFFIX: &str = "#ttl";

// == Record Keys ==
fn content_key(key: &str) -> String {
    format!("{}{}", key, CONTENT_SUFFIX)
}

fn ttl_key(key: &str) -> String {
    format!("{}{}", key, TTL_SUFFIX)
}

// == Expiry Encoding ==
fn encode_expiry(expires_at: DateTime<Utc>) -> [u8; 8] {
    expires_at.timestamp_millis().to_be_bytes()
}

fn decode_expiry(bytes: &[u8]) -> Result<DateTime<Utc>> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        CacheError::Serialization(format!(
            "expiry record has {} bytes, expected 8",
            bytes.len()
        ))
    })?;
    let millis = i64::from_be_bytes(raw);
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        CacheError::Serialization(format!("expiry {} is out of range", millis))
    })
}

// == Embedded Backend ==
/// Emulated-TTL backend stored in a redb database file.
pub struct EmbeddedBackend {
    config: CacheConfig,
    ttl: TimeDelta,
    db: Option<Database>,
}

impl EmbeddedBackend {
    // == Constructor ==
    /// Creates an unopened backend; call `init` before use.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            ttl: TimeDelta::zero(),
            db: None,
        }
    }

    /// Location of the database file inside `storage_path`.
    pub fn database_path(&self) -> PathBuf {
        self.config.storage_path.join(DATABASE_FILE)
    }

    fn db(&self) -> Result<&Database> {
        self.db
            .as_ref()
            .ok_or(CacheError::NotInitialized(BackendType::EmbeddedKv))
    }

    // == Remove Records ==
    /// Deletes both records of `key` in one transaction.
    fn remove_records(&self, key: &str) -> Result<()> {
        let txn = self.db()?.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES)?;
            table.remove(content_key(key).as_str())?;
            table.remove(ttl_key(key).as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    // == Reap ==
    /// Deletes `key` if its expiry record is still in the past.
    ///
    /// The expiry is read again inside the write transaction, so an entry
    /// rewritten since the stale read survives.
    fn reap(&self, key: &str) -> Result<bool> {
        let txn = self.db()?.begin_write()?;
        let reaped = {
            let mut table = txn.open_table(ENTRIES)?;
            let still_stale = match table.get(ttl_key(key).as_str())? {
                Some(guard) => decode_expiry(guard.value())? <= Utc::now(),
                None => false,
            };
            if still_stale {
                table.remove(content_key(key).as_str())?;
                table.remove(ttl_key(key).as_str())?;
            }
            still_stale
        };
        txn.commit()?;
        Ok(reaped)
    }
}

fn create_table(db: &Database) -> Result<()> {
    let txn = db.begin_write()?;
    txn.open_table(ENTRIES)?;
    txn.commit()?;
    Ok(())
}

/// Answer for a `get` that found an expired entry.
///
/// The entry is already reported missing, so a failed reap is only logged.
fn expired_read(key: &str, reaped: Result<bool>) -> Option<Vec<u8>> {
    match reaped {
        Ok(true) => debug!("Reaped expired entry: {}", key),
        Ok(false) => debug!("Expired entry {} was rewritten before reaping", key),
        Err(err) => warn!("Failed to reap expired entry {}: {}", key, err),
    }
    None
}

impl CacheBackend for EmbeddedBackend {
    #[instrument(skip(self), fields(backend = "embedded-kv"))]
    fn init(&mut self) -> Result<()> {
        if self.db.is_some() {
            return Ok(());
        }

        self.ttl = lifetime(&self.config)?;

        let dir = &self.config.storage_path;
        fs::create_dir_all(dir).map_err(|e| {
            CacheError::init(
                BackendType::EmbeddedKv,
                format!("cannot create {}: {}", dir.display(), e),
            )
        })?;

        let path = self.database_path();
        let db = Database::create(&path).map_err(|e| {
            CacheError::init(
                BackendType::EmbeddedKv,
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;

        // Create the table up front so readers never see it missing
        create_table(&db).map_err(|e| {
            CacheError::init(
                BackendType::EmbeddedKv,
                format!("cannot prepare {}: {}", path.display(), e),
            )
        })?;

        self.db = Some(db);
        info!(
            "Embedded cache ready: path={}, default_ttl={:?}",
            path.display(),
            self.config.default_ttl
        );
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "embedded-kv"))]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        {
            let txn = self.db()?.begin_read()?;
            let table = txn.open_table(ENTRIES)?;

            let expires_at = match table.get(ttl_key(key).as_str())? {
                Some(guard) => decode_expiry(guard.value())?,
                None => {
                    debug!("Cache miss: {}", key);
                    return Ok(None);
                }
            };

            if expires_at > Utc::now() {
                return match table.get(content_key(key).as_str())? {
                    Some(guard) => {
                        debug!("Cache hit: {}", key);
                        Ok(Some(guard.value().to_vec()))
                    }
                    None => {
                        warn!("Expiry record without content for key {}", key);
                        Ok(None)
                    }
                };
            }
        }

        // Stale: the read transaction is closed, reap outside of it
        Ok(expired_read(key, self.reap(key)))
    }

    #[instrument(skip(self, content), fields(backend = "embedded-kv", len = content.len()))]
    fn set(&self, key: &str, content: &[u8]) -> Result<()> {
        let expires_at = Utc::now().checked_add_signed(self.ttl).ok_or_else(|| {
            CacheError::Config(format!(
                "default_ttl {:?} overflows the expiry timestamp",
                self.config.default_ttl
            ))
        })?;
        let expiry = encode_expiry(expires_at);

        // An error before commit drops the transaction, which aborts it
        let txn = self.db()?.begin_write()?;
        {
            let mut table = txn.open_table(ENTRIES)?;
            table.insert(content_key(key).as_str(), content)?;
            table.insert(ttl_key(key).as_str(), expiry.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "embedded-kv"))]
    fn get_ttl(&self, key: &str) -> Result<Option<TimeDelta>> {
        let txn = self.db()?.begin_read()?;
        let table = txn.open_table(ENTRIES)?;

        let remaining = match table.get(ttl_key(key).as_str())? {
            Some(guard) => Some(decode_expiry(guard.value())? - Utc::now()),
            None => None,
        };
        Ok(remaining)
    }

    #[instrument(skip(self), fields(backend = "embedded-kv"))]
    fn delete(&self, key: &str) -> Result<()> {
        self.remove_records(key)
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }
}
