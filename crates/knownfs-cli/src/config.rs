//! Mount configuration resolved from the command line.

use crate::cli::Cli;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Duration;

/// Location of the known-hosts file relative to the home directory.
const DEFAULT_SOURCE: &str = ".ssh/known_hosts";

/// Everything needed to mount one known-hosts file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    /// known-hosts file being exposed
    pub source: PathBuf,
    /// Directory the filesystem is mounted on
    pub mountpoint: PathBuf,
    /// How long the kernel may cache attributes and entries
    pub attr_ttl: Duration,
    /// Pass `allow_other` to the mount
    pub allow_other: bool,
    /// Pass `auto_unmount` to the mount
    pub auto_unmount: bool,
}

impl MountConfig {
    /// Builds a configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if `--config` was not given and the home directory
    /// cannot be determined.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let source = match &cli.config {
            Some(path) => path.clone(),
            None => default_source()?,
        };

        Ok(Self {
            source,
            mountpoint: cli.mountpoint.clone(),
            attr_ttl: Duration::from_secs(cli.ttl),
            allow_other: cli.allow_other,
            auto_unmount: cli.auto_unmount,
        })
    }

    /// Checks the paths before mounting.
    ///
    /// The source file must be stat-able and the mount point must be an
    /// existing directory. Later disappearance of the source is tolerated by
    /// the cache; this check only catches typos at startup.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first path that fails its check.
    pub fn validate(&self) -> Result<()> {
        std::fs::metadata(&self.source)
            .with_context(|| format!("cannot stat known_hosts file {}", self.source.display()))?;

        let meta = std::fs::metadata(&self.mountpoint)
            .with_context(|| format!("cannot stat mount point {}", self.mountpoint.display()))?;
        if !meta.is_dir() {
            bail!("mount point {} is not a directory", self.mountpoint.display());
        }

        Ok(())
    }
}

/// Returns `~/.ssh/known_hosts` for the current user.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_source() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_SOURCE))
        .context("cannot determine home directory; pass --config")
}
