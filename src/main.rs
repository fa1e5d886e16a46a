//! Polycache command-line front end
//!
//! Runs one contract operation against the backend selected by flags and
//! `CACHE_*` environment variables. Most useful with the embedded and Redis
//! backends, whose contents outlive the process.

mod cli;

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use polycache::{open_backend, CacheConfig, CacheOverrides};
use tracing::debug;

use cli::{Cli, Command};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polycache=info".into()),
        )
        .init();

    let overrides = cli.overrides().or(CacheOverrides::from_env());
    let config = CacheConfig::resolve(overrides).context("invalid cache configuration")?;
    debug!("Resolved configuration: {:?}", config);

    if let Command::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let cache = open_backend(config).context("failed to open cache backend")?;

    match cli.command {
        Command::Get { key } => match cache.get(&key)? {
            Some(content) => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&content)?;
                stdout.write_all(b"\n")?;
            }
            None => {
                eprintln!("not found: {}", key);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Set { key, value } => cache.set(&key, value.as_bytes())?,
        Command::Extend { key, value } => cache.extend_ttl(&key, value.as_bytes())?,
        Command::Ttl { key } => match cache.get_ttl(&key)? {
            Some(remaining) => println!("{}", remaining.num_milliseconds()),
            None => {
                eprintln!("not found: {}", key);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Delete { key } => cache.delete(&key)?,
        // printed before the backend was opened
        Command::Config => {}
    }

    Ok(ExitCode::SUCCESS)
}
