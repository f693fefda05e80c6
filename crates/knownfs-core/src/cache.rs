//! Modification-time driven cache of the known-hosts index.
//!
//! [`HostIndexCache`] owns the path of the known-hosts file, the time of
//! the last successful parse, and the index that parse produced. Each call
//! to [`HostIndexCache::current_index`] stats the file and only reparses it
//! when its modification time has moved past the last successful read.
//!
//! The whole check-and-rebuild runs under one mutex. A rebuilt index is
//! assembled off to the side and swapped in as a fresh `Arc`, so snapshots
//! already handed out are never mutated.
//!
//! # Examples
//!
//! ```
//! use knownfs_core::HostIndexCache;
//! # use std::io::Write;
//! # let mut file = tempfile::NamedTempFile::new().unwrap();
//! # writeln!(file, "[a]:2222,[b]:2222 ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBH+761batAEA5KM7JQUrKeNyKftdnRd49E03snPA/j8nP6u7vJlIzf9S2MZlbZyHeh5Hr2wIVwpJF1n5ycg1rG4=").unwrap();
//!
//! let cache = HostIndexCache::new(file.path());
//! let snapshot = cache.current_index();
//!
//! assert!(snapshot.error().is_none());
//! assert_eq!(snapshot.index().len(), 2);
//! assert_eq!(snapshot.index().get("a"), snapshot.index().get("b"));
//! ```

use crate::error::{Error, Result};
use crate::host::split_host_token;
use crate::keyline::parse_known_host_line;
use crate::types::{HostEntry, HostIndex};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Result of one [`HostIndexCache::current_index`] call.
///
/// Always carries an index. When [`error`](Self::error) is `Some`, the
/// index may be stale (source unavailable) or empty (failed rebuild) and
/// should not be trusted.
#[derive(Debug)]
pub struct IndexSnapshot {
    index: Arc<HostIndex>,
    error: Option<Error>,
}

impl IndexSnapshot {
    /// The index returned by the call.
    #[must_use]
    pub fn index(&self) -> &Arc<HostIndex> {
        &self.index
    }

    /// The error that accompanied the index, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns `true` if no error accompanied the index.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts into a `Result`, discarding the index on error.
    ///
    /// # Errors
    ///
    /// Returns the accompanying error, if any.
    pub fn into_result(self) -> Result<Arc<HostIndex>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.index),
        }
    }
}

/// Counters describing how the cache has served requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the held index without file I/O
    pub hits: u64,
    /// Successful full parses
    pub rebuilds: u64,
    /// Calls that returned an error
    pub failures: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Wall-clock time the last successful parse completed; `None` until
    /// the first one.
    last_read: Option<SystemTime>,
    index: Arc<HostIndex>,
    stats: CacheStats,
}

/// Cache of the host → fingerprint index for one known-hosts file.
///
/// # Thread Safety
///
/// `HostIndexCache` is `Send + Sync`; share it behind an `Arc`. Concurrent
/// callers are serialized, so at most one rebuild runs at a time.
#[derive(Debug)]
pub struct HostIndexCache {
    source: PathBuf,
    state: Mutex<CacheState>,
}

impl HostIndexCache {
    /// Creates an empty cache for the given known-hosts file.
    ///
    /// Nothing is read until the first [`current_index`](Self::current_index).
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Path of the known-hosts file backing this cache.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the current index, reparsing the file if it changed.
    ///
    /// - If the file cannot be stat'ed, the previously held index is
    ///   returned with [`Error::SourceUnavailable`].
    /// - If the file has not been modified since the last successful
    ///   parse, the held index is returned without touching the file.
    /// - Otherwise the file is parsed in full. On success the new index
    ///   replaces the old one entirely. On failure the held index is
    ///   cleared and the error is returned; the next call retries.
    pub fn current_index(&self) -> IndexSnapshot {
        let mut state = self.lock_state();

        let modified = match fs::metadata(&self.source).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(source) => {
                state.stats.failures += 1;
                return IndexSnapshot {
                    index: Arc::clone(&state.index),
                    error: Some(Error::SourceUnavailable {
                        path: self.source.clone(),
                        source,
                    }),
                };
            }
        };

        if matches!(state.last_read, Some(last_read) if modified <= last_read) {
            state.stats.hits += 1;
            tracing::debug!("{} unchanged, serving cached index", self.source.display());
            return IndexSnapshot {
                index: Arc::clone(&state.index),
                error: None,
            };
        }

        tracing::debug!("Reparsing {}", self.source.display());
        match read_index(&self.source) {
            Ok(index) => {
                tracing::info!(
                    "Loaded {} hosts from {}",
                    index.len(),
                    self.source.display()
                );
                state.index = Arc::new(index);
                state.last_read = Some(SystemTime::now());
                state.stats.rebuilds += 1;
                IndexSnapshot {
                    index: Arc::clone(&state.index),
                    error: None,
                }
            }
            Err(err) => {
                tracing::debug!("Rebuild of {} failed: {err}", self.source.display());
                state.index = Arc::new(HostIndex::new());
                state.stats.failures += 1;
                IndexSnapshot {
                    index: Arc::clone(&state.index),
                    error: Some(err),
                }
            }
        }
    }

    /// Returns a copy of the request counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.lock_state().stats
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // The state is only replaced wholesale, so a poisoned guard still
        // holds a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_index(path: &Path) -> Result<HostIndex> {
    let file = File::open(path).map_err(|source| Error::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    parse_index(BufReader::new(file)).map_err(|err| match err {
        Error::SourceUnavailable { source, .. } => Error::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parses known-hosts text into a fresh index.
///
/// Blank lines, `#` comments and lines that do not split into exactly
/// three space-separated fields are skipped. A three-field line that is not a valid
/// key line aborts the parse. Host tokens whose port cannot be stripped
/// are skipped individually. Later occurrences of a host win.
///
/// # Errors
///
/// Returns [`Error::MalformedEntry`] for the first invalid key line or a
/// line that is not UTF-8, and [`Error::SourceUnavailable`] if reading
/// fails.
///
/// # Examples
///
/// ```
/// use knownfs_core::parse_index;
///
/// let index = parse_index("# comment\n\nnot a key line at all\n".as_bytes()).unwrap();
/// assert!(index.is_empty());
///
/// assert!(parse_index("moi kissa tes\n".as_bytes()).is_err());
/// ```
pub fn parse_index(reader: impl BufRead) -> Result<HostIndex> {
    let mut index = HostIndex::new();

    for (number, line) in reader.lines().enumerate() {
        let number = number + 1;
        let line = line.map_err(|source| {
            if source.kind() == io::ErrorKind::InvalidData {
                Error::MalformedEntry {
                    line: number,
                    reason: "line is not valid UTF-8".to_string(),
                }
            } else {
                Error::SourceUnavailable {
                    path: PathBuf::new(),
                    source,
                }
            }
        })?;
        let line = line.strip_suffix('\r').unwrap_or(&line);

        if line.trim().is_empty() || line.starts_with('#') || line.split(' ').count() != 3 {
            continue;
        }

        let parsed = parse_known_host_line(line).map_err(|err| Error::MalformedEntry {
            line: number,
            reason: err.to_string(),
        })?;
        let fingerprint = parsed.fingerprint();

        for token in &parsed.hosts {
            match split_host_token(token) {
                Ok(host) => index.insert(HostEntry::new(host, fingerprint.clone())),
                Err(err) => tracing::debug!("Skipping host token on line {number}: {err}"),
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const KEY: &str = "ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBH+761batAEA5KM7JQUrKeNyKftdnRd49E03snPA/j8nP6u7vJlIzf9S2MZlbZyHeh5Hr2wIVwpJF1n5ycg1rG4=";

    fn write_source(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("known_hosts");
        fs::write(&path, content).unwrap();
        path
    }

    fn bump_mtime(path: &Path) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    #[test]
    fn test_parse_index_skips_non_three_field_lines() {
        let text = format!("\n   \nhost {KEY} trailing-comment\n@cert-authority *.example {KEY}\n");
        let index = parse_index(text.as_bytes()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_parse_index_skips_comments() {
        let index = parse_index("# three word comment\n".as_bytes()).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_parse_index_handles_crlf() {
        let text = format!("host.example {KEY}\r\n");
        let index = parse_index(text.as_bytes()).unwrap();
        assert!(index.contains_host("host.example"));
    }

    #[test]
    fn test_parse_index_reports_line_number() {
        let text = format!("ok.example {KEY}\nmoi kissa tes\n");
        match parse_index(text.as_bytes()) {
            Err(Error::MalformedEntry { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected MalformedEntry, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_index_skips_bad_tokens_only() {
        let text = format!("[broken,good.example {KEY}\n");
        let index = parse_index(text.as_bytes()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains_host("good.example"));
    }

    #[test]
    fn test_parse_index_later_line_wins() {
        let other = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl";
        let text = format!("dup.example {KEY}\ndup.example {other}\n");
        let index = parse_index(text.as_bytes()).unwrap();
        assert_eq!(index.len(), 1);
        assert_ne!(
            index.get("dup.example").unwrap().as_str(),
            "c8:ca:c2:44:66:98:31:2a:c1:c2:91:e0:fc:b3:91:b2"
        );
    }

    #[test]
    fn test_first_call_parses() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &format!("a.example {KEY}\n"));

        let cache = HostIndexCache::new(&path);
        let snapshot = cache.current_index();

        assert!(snapshot.is_ok());
        assert_eq!(snapshot.index().len(), 1);
        assert_eq!(cache.stats().rebuilds, 1);
    }

    #[test]
    fn test_unchanged_file_is_not_reparsed() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &format!("a.example {KEY}\n"));

        let cache = HostIndexCache::new(&path);
        let first = cache.current_index();
        let second = cache.current_index();

        assert!(Arc::ptr_eq(first.index(), second.index()));
        let stats = cache.stats();
        assert_eq!(stats.rebuilds, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_empty_file_parsed_once() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "");

        let cache = HostIndexCache::new(&path);
        assert!(cache.current_index().is_ok());
        assert!(cache.current_index().is_ok());

        assert_eq!(cache.stats().rebuilds, 1);
    }

    #[test]
    fn test_modified_file_replaces_index() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &format!("old.example {KEY}\n"));

        let cache = HostIndexCache::new(&path);
        assert!(cache.current_index().index().contains_host("old.example"));

        fs::write(&path, format!("new.example {KEY}\n")).unwrap();
        bump_mtime(&path);

        let snapshot = cache.current_index();
        assert!(snapshot.is_ok());
        assert!(snapshot.index().contains_host("new.example"));
        assert!(!snapshot.index().contains_host("old.example"));
        assert_eq!(cache.stats().rebuilds, 2);
    }

    #[test]
    fn test_missing_file_returns_previous_index() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &format!("a.example {KEY}\n"));

        let cache = HostIndexCache::new(&path);
        assert!(cache.current_index().is_ok());

        fs::remove_file(&path).unwrap();
        let snapshot = cache.current_index();

        assert!(snapshot.error().unwrap().is_source_unavailable());
        assert!(snapshot.index().contains_host("a.example"));
    }

    #[test]
    fn test_failed_rebuild_clears_index_and_retries() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &format!("a.example {KEY}\n"));

        let cache = HostIndexCache::new(&path);
        assert!(cache.current_index().is_ok());

        fs::write(&path, format!("b.example {KEY}\nmoi kissa tes\n")).unwrap();
        bump_mtime(&path);

        let failed = cache.current_index();
        assert!(failed.error().unwrap().is_malformed_entry());
        assert!(failed.index().is_empty());

        // The timestamp did not advance, so the next call parses again.
        let again = cache.current_index();
        assert!(again.error().is_some());
        assert_eq!(cache.stats().failures, 2);
    }

    #[test]
    fn test_into_result() {
        let dir = TempDir::new().unwrap();
        let cache = HostIndexCache::new(dir.path().join("absent"));
        let err = cache.current_index().into_result().unwrap_err();
        assert!(err.is_source_unavailable());
    }
}
