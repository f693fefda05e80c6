//! knownfs: mount an OpenSSH `known_hosts` file as a read-only filesystem.
//!
//! Each host in the file becomes a directory containing a `fingerprint`
//! file with the host key's legacy MD5 fingerprint.
//!
//! # Examples
//!
//! ```bash
//! # Expose ~/.ssh/known_hosts
//! knownfs /mnt/hosts
//! cat /mnt/hosts/github.com/fingerprint
//!
//! # Expose another file with debug logging
//! knownfs --config /etc/ssh/ssh_known_hosts -v /mnt/hosts
//! ```

use anyhow::Result;
use clap::Parser;
use knownfs::{Cli, ExitCode, MountConfig};
use knownfs_core::{HostIndexCache, VirtualPathResolver};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let exit_code = run(&cli)?;

    std::process::exit(exit_code.as_i32());
}

/// Initializes logging infrastructure.
///
/// `--verbose` forces debug level; otherwise `RUST_LOG` is honoured with
/// `info` as the fallback.
///
/// # Errors
///
/// Returns an error if logging initialization fails.
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Validates the configuration and serves the mount until it is unmounted.
///
/// # Errors
///
/// Returns an error if the mount itself fails.
fn run(cli: &Cli) -> Result<ExitCode> {
    let config = match MountConfig::from_cli(cli).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err:#}");
            return Ok(ExitCode::ERROR);
        }
    };

    let cache = Arc::new(HostIndexCache::new(&config.source));
    if let Some(err) = cache.current_index().error() {
        // Not fatal: the cache retries on the next request.
        tracing::warn!(error = %err, "initial known_hosts read failed");
    }

    knownfs::mount(&config, VirtualPathResolver::new(cache))?;
    tracing::info!("unmounted");

    Ok(ExitCode::SUCCESS)
}
