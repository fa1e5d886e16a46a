//! Command-Line Interface
//!
//! Clap definitions for the `polycache` binary. Global flags map onto
//! `CacheOverrides` and take precedence over `CACHE_*` environment variables.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use polycache::CacheOverrides;

#[derive(Debug, Parser)]
#[command(name = "polycache")]
#[command(about = "Inspect and seed a cache through the uniform backend contract")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Backend type (memory, embedded, redis). Overrides CACHE_BACKEND
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Default TTL, e.g. 10m or 1h30m. Overrides CACHE_TTL
    #[arg(long, global = true)]
    pub ttl: Option<String>,

    /// Redis host:port. Overrides CACHE_REDIS_ADDRESS
    #[arg(long, global = true)]
    pub redis_address: Option<String>,

    /// Redis logical database. Overrides CACHE_REDIS_DB
    #[arg(long, global = true)]
    pub redis_db: Option<i64>,

    /// Directory of the embedded database. Overrides CACHE_PATH
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,
}

impl Cli {
    /// Overrides given on the command line; unset flags stay `None`.
    pub fn overrides(&self) -> CacheOverrides {
        CacheOverrides {
            backend_type: self.backend.clone(),
            default_ttl: self.ttl.clone(),
            network_address: self.redis_address.clone(),
            network_database_index: self.redis_db,
            storage_path: self.path.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the content stored under a key
    Get {
        key: String,
    },

    /// Store a value under a key with the default TTL
    Set {
        key: String,
        value: String,
    },

    /// Rewrite a key with a fresh TTL
    Extend {
        key: String,
        value: String,
    },

    /// Print the remaining lifetime of a key in milliseconds
    Ttl {
        key: String,
    },

    /// Remove a key
    Delete {
        key: String,
    },

    /// Print the resolved configuration as JSON
    Config,
}
