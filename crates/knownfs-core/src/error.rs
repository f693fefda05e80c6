//! Error types for knownfs.
//!
//! Every failure the index layer can report is a variant of [`Error`].
//! The filesystem layer never forwards these to the transport; it
//! downgrades them to [`FsError::NotFound`](crate::FsError::NotFound).
//!
//! # Examples
//!
//! ```
//! use knownfs_core::{Error, Result};
//!
//! fn require_three_fields(line: &str) -> Result<()> {
//!     if line.split(' ').count() != 3 {
//!         return Err(Error::MalformedEntry {
//!             line: 1,
//!             reason: "expected three fields".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = require_three_fields("only two").unwrap_err();
//! assert!(err.is_malformed_entry());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for knownfs.
#[derive(Error, Debug)]
pub enum Error {
    /// The known-hosts file could not be stat'ed, opened or read.
    ///
    /// Returned together with whatever index the cache currently holds;
    /// callers must not assume the index is empty.
    #[error("known_hosts source unavailable: {}", path.display())]
    SourceUnavailable {
        /// Path of the source file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A line with exactly three fields is not a valid key line.
    ///
    /// Aborts the rebuild that encountered it.
    #[error("malformed known_hosts entry on line {line}: {reason}")]
    MalformedEntry {
        /// 1-based line number in the source file
        line: usize,
        /// Description of what failed to parse
        reason: String,
    },

    /// A single host token could not have its port stripped.
    ///
    /// Never aborts a rebuild; the token is skipped.
    #[error("cannot split host token '{token}': {reason}")]
    TokenSplit {
        /// The offending token
        token: String,
        /// Why the token was rejected
        reason: &'static str,
    },
}

impl Error {
    /// Returns `true` if this is a source-unavailable error.
    ///
    /// # Examples
    ///
    /// ```
    /// use knownfs_core::Error;
    /// use std::io;
    ///
    /// let err = Error::SourceUnavailable {
    ///     path: "/nope".into(),
    ///     source: io::Error::from(io::ErrorKind::NotFound),
    /// };
    /// assert!(err.is_source_unavailable());
    /// ```
    #[must_use]
    pub const fn is_source_unavailable(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }

    /// Returns `true` if this is a malformed-entry error.
    #[must_use]
    pub const fn is_malformed_entry(&self) -> bool {
        matches!(self, Self::MalformedEntry { .. })
    }

    /// Returns `true` if this is a host-token split error.
    ///
    /// # Examples
    ///
    /// ```
    /// use knownfs_core::split_host_token;
    ///
    /// let err = split_host_token("[unterminated").unwrap_err();
    /// assert!(err.is_token_split());
    /// ```
    #[must_use]
    pub const fn is_token_split(&self) -> bool {
        matches!(self, Self::TokenSplit { .. })
    }
}

/// Type alias for knownfs results.
pub type Result<T> = std::result::Result<T, Error>;
