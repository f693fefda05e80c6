//! Command-line arguments and process exit codes.
//!
//! # Examples
//!
//! ```
//! use clap::Parser;
//! use knownfs::{Cli, ExitCode};
//!
//! let cli = Cli::parse_from(["knownfs", "/mnt/hosts"]);
//! assert_eq!(cli.mountpoint.to_str(), Some("/mnt/hosts"));
//! assert_eq!(cli.ttl, 1);
//!
//! assert!(ExitCode::SUCCESS.is_success());
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Mount an OpenSSH `known_hosts` file as a read-only filesystem.
///
/// Every host recorded in the file becomes a directory holding a single
/// `fingerprint` file with the host key's legacy MD5 fingerprint.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "knownfs")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to mount the filesystem on
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// known_hosts file to expose (default: ~/.ssh/known_hosts)
    #[arg(short, long, value_name = "FILE", env = "KNOWNFS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds the kernel may cache attributes and lookups
    #[arg(long, value_name = "SECS", default_value_t = 1)]
    pub ttl: u64,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long)]
    pub auto_unmount: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Process exit code with semantic meaning.
///
/// # Examples
///
/// ```
/// use knownfs::ExitCode;
///
/// assert_eq!(ExitCode::ERROR.as_i32(), 1);
/// assert!(!ExitCode::INVALID_INPUT.is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Successful execution (exit code 0).
    pub const SUCCESS: Self = Self(0);

    /// Startup or runtime failure (exit code 1).
    pub const ERROR: Self = Self(1);

    /// Invalid arguments (exit code 2).
    pub const INVALID_INPUT: Self = Self(2);

    /// Returns the raw exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mountpoint_is_required() {
        let err = Cli::try_parse_from(["knownfs"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), ExitCode::INVALID_INPUT.as_i32());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["knownfs", "/mnt"]).unwrap();
        assert_eq!(cli.mountpoint, PathBuf::from("/mnt"));
        assert_eq!(cli.ttl, 1);
        assert!(!cli.allow_other);
        assert!(!cli.auto_unmount);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "knownfs",
            "--config",
            "/tmp/hosts",
            "--ttl",
            "30",
            "--allow-other",
            "--auto-unmount",
            "-v",
            "/mnt",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/hosts")));
        assert_eq!(cli.ttl, 30);
        assert!(cli.allow_other);
        assert!(cli.auto_unmount);
        assert!(cli.verbose);
    }

    #[test]
    fn test_invalid_ttl_rejected() {
        let err = Cli::try_parse_from(["knownfs", "--ttl", "soon", "/mnt"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::default(), ExitCode::SUCCESS);
        assert_eq!(i32::from(ExitCode::ERROR), 1);
        assert!(!ExitCode::ERROR.is_success());
    }
}
