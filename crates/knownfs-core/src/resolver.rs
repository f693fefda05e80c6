//! Virtual path resolution over the host index.
//!
//! The virtual tree is never stored. Every request asks the
//! [`HostIndexCache`] for the current index and classifies the path
//! against it:
//!
//! ```text
//! ""                      Root
//! "<host>"                HostDirectory
//! "<host>/fingerprint"    FingerprintFile
//! anything else           Unknown
//! ```
//!
//! Paths are relative to the mount root and carry no leading slash.
//!
//! # Examples
//!
//! ```
//! use knownfs_core::{FileSystemView, FsError, HostIndexCache, VirtualPathResolver};
//! use std::sync::Arc;
//! # use std::io::Write;
//! # let mut file = tempfile::NamedTempFile::new().unwrap();
//! # writeln!(file, "h ecdsa-sha2-nistp256 AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBH+761batAEA5KM7JQUrKeNyKftdnRd49E03snPA/j8nP6u7vJlIzf9S2MZlbZyHeh5Hr2wIVwpJF1n5ycg1rG4=").unwrap();
//!
//! let resolver = VirtualPathResolver::new(Arc::new(HostIndexCache::new(file.path())));
//!
//! let root = resolver.open_dir("").unwrap();
//! assert_eq!(root.len(), 1);
//! assert_eq!(root[0].name, "h");
//! assert_eq!(
//!     resolver.open("h/fingerprint", false).unwrap(),
//!     b"c8:ca:c2:44:66:98:31:2a:c1:c2:91:e0:fc:b3:91:b2\n"
//! );
//! assert_eq!(resolver.get_attr("nope"), Err(FsError::NotFound));
//! ```

use crate::cache::HostIndexCache;
use crate::types::HostIndex;
use std::sync::Arc;
use thiserror::Error;

/// Name of the single file inside every host directory.
pub const FINGERPRINT_FILE: &str = "fingerprint";

/// Permission bits reported for directories.
pub const DIR_PERMISSIONS: u16 = 0o755;

/// Permission bits reported for fingerprint files.
pub const FILE_PERMISSIONS: u16 = 0o444;

/// Failure answers the filesystem layer can give.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// The path does not exist, or the index could not be loaded.
    #[error("no such file or directory")]
    NotFound,

    /// Write access was requested.
    #[error("operation not permitted")]
    PermissionDenied,

    /// A directory was opened as a file.
    #[error("is a directory")]
    IsDirectory,
}

/// Classification of a virtual path against one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualPath {
    /// The mount root
    Root,
    /// The directory of a host present in the index
    HostDirectory(String),
    /// The fingerprint file of a host present in the index
    FingerprintFile(String),
    /// Not part of the tree
    Unknown,
}

impl VirtualPath {
    /// Classifies `path` against `index`.
    ///
    /// # Examples
    ///
    /// ```
    /// use knownfs_core::{Fingerprint, HostEntry, HostIndex, VirtualPath};
    ///
    /// let index: HostIndex = [HostEntry::new("h", Fingerprint::legacy_md5(b"k"))]
    ///     .into_iter()
    ///     .collect();
    ///
    /// assert_eq!(VirtualPath::classify("", &index), VirtualPath::Root);
    /// assert_eq!(
    ///     VirtualPath::classify("h/fingerprint", &index),
    ///     VirtualPath::FingerprintFile("h".to_string())
    /// );
    /// assert_eq!(VirtualPath::classify("h/other", &index), VirtualPath::Unknown);
    /// ```
    #[must_use]
    pub fn classify(path: &str, index: &HostIndex) -> Self {
        if path.is_empty() {
            return Self::Root;
        }
        if index.contains_host(path) {
            return Self::HostDirectory(path.to_string());
        }
        match path.rsplit_once('/') {
            Some((host, FINGERPRINT_FILE)) if index.contains_host(host) => {
                Self::FingerprintFile(host.to_string())
            }
            _ => Self::Unknown,
        }
    }
}

/// Kind of node a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Root or host directory
    Directory,
    /// Fingerprint file
    File,
}

/// Attributes of a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attrs {
    /// Node kind
    pub kind: NodeKind,
    /// Size in bytes; zero for directories
    pub size: u64,
    /// Permission bits
    pub permissions: u16,
}

impl Attrs {
    /// Attributes of a directory.
    #[must_use]
    pub const fn directory() -> Self {
        Self {
            kind: NodeKind::Directory,
            size: 0,
            permissions: DIR_PERMISSIONS,
        }
    }

    /// Attributes of a read-only file of `size` bytes.
    #[must_use]
    pub const fn file(size: u64) -> Self {
        Self {
            kind: NodeKind::File,
            size,
            permissions: FILE_PERMISSIONS,
        }
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, without any path prefix
    pub name: String,
    /// Kind of the entry
    pub kind: NodeKind,
}

/// The capability contract a filesystem transport consumes.
///
/// Paths follow the conventions described in the
/// [module documentation](self).
pub trait FileSystemView: Send + Sync {
    /// Looks up the attributes of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the path is not in the tree.
    fn get_attr(&self, path: &str) -> Result<Attrs, FsError>;

    /// Lists the entries of the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if the path is not a directory.
    fn open_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Opens `path` for reading and returns its full content.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PermissionDenied`] if `write_requested` is set,
    /// [`FsError::IsDirectory`] for directories and [`FsError::NotFound`]
    /// for unknown paths.
    fn open(&self, path: &str, write_requested: bool) -> Result<Vec<u8>, FsError>;
}

/// Answers filesystem queries from the live host index.
///
/// Holds no tree of its own; every operation consults the cache afresh.
/// If the cache reports an error, the affected path is reported as absent.
#[derive(Debug, Clone)]
pub struct VirtualPathResolver {
    cache: Arc<HostIndexCache>,
}

impl VirtualPathResolver {
    /// Creates a resolver backed by `cache`.
    #[must_use]
    pub const fn new(cache: Arc<HostIndexCache>) -> Self {
        Self { cache }
    }

    /// The cache this resolver reads from.
    #[must_use]
    pub const fn cache(&self) -> &Arc<HostIndexCache> {
        &self.cache
    }

    /// Classifies `path` against the current index.
    ///
    /// Yields [`VirtualPath::Unknown`] when the index cannot be loaded.
    #[must_use]
    pub fn classify(&self, path: &str) -> VirtualPath {
        self.resolve(path)
            .map_or(VirtualPath::Unknown, |(resolved, _)| resolved)
    }

    /// Attributes of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] for unknown paths or when the index
    /// cannot be loaded.
    pub fn attributes_of(&self, path: &str) -> Result<Attrs, FsError> {
        let (resolved, index) = self.resolve(path).ok_or(FsError::NotFound)?;
        match resolved {
            VirtualPath::Root | VirtualPath::HostDirectory(_) => Ok(Attrs::directory()),
            VirtualPath::FingerprintFile(host) => {
                let fingerprint = index.get(&host).ok_or(FsError::NotFound)?;
                Ok(Attrs::file(fingerprint.as_str().len() as u64 + 1))
            }
            VirtualPath::Unknown => Err(FsError::NotFound),
        }
    }

    /// Entry names of the directory at `path`, in unspecified order.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::NotFound`] if `path` is not a directory or the
    /// index cannot be loaded.
    pub fn list_directory(&self, path: &str) -> Result<Vec<String>, FsError> {
        let (resolved, index) = self.resolve(path).ok_or(FsError::NotFound)?;
        match resolved {
            VirtualPath::Root => Ok(index.hosts().map(str::to_string).collect()),
            VirtualPath::HostDirectory(_) => Ok(vec![FINGERPRINT_FILE.to_string()]),
            VirtualPath::FingerprintFile(_) | VirtualPath::Unknown => Err(FsError::NotFound),
        }
    }

    /// Content of the file at `path`: its fingerprint plus a newline.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PermissionDenied`] whenever `write_requested`
    /// is set, regardless of path. Otherwise [`FsError::IsDirectory`] for
    /// directories and [`FsError::NotFound`] for unknown paths or when the
    /// index cannot be loaded.
    pub fn open_for_read(&self, path: &str, write_requested: bool) -> Result<Vec<u8>, FsError> {
        if write_requested {
            return Err(FsError::PermissionDenied);
        }
        let (resolved, index) = self.resolve(path).ok_or(FsError::NotFound)?;
        match resolved {
            VirtualPath::FingerprintFile(host) => index
                .get(&host)
                .map(crate::Fingerprint::file_content)
                .ok_or(FsError::NotFound),
            VirtualPath::Root | VirtualPath::HostDirectory(_) => Err(FsError::IsDirectory),
            VirtualPath::Unknown => Err(FsError::NotFound),
        }
    }

    fn resolve(&self, path: &str) -> Option<(VirtualPath, Arc<HostIndex>)> {
        let snapshot = self.cache.current_index();
        if let Some(err) = snapshot.error() {
            tracing::warn!("Reporting '{path}' as missing: {err}");
            return None;
        }
        let index = Arc::clone(snapshot.index());
        Some((VirtualPath::classify(path, &index), index))
    }
}

impl FileSystemView for VirtualPathResolver {
    fn get_attr(&self, path: &str) -> Result<Attrs, FsError> {
        self.attributes_of(path)
    }

    fn open_dir(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        // Root holds host directories; a host directory holds its file.
        let kind = if path.is_empty() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        Ok(self
            .list_directory(path)?
            .into_iter()
            .map(|name| DirEntry { name, kind })
            .collect())
    }

    fn open(&self, path: &str, write_requested: bool) -> Result<Vec<u8>, FsError> {
        self.open_for_read(path, write_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fingerprint, HostEntry};

    fn index_of(hosts: &[&str]) -> HostIndex {
        hosts
            .iter()
            .map(|h| HostEntry::new(*h, Fingerprint::legacy_md5(h.as_bytes())))
            .collect()
    }

    #[test]
    fn test_classify_root() {
        assert_eq!(VirtualPath::classify("", &HostIndex::new()), VirtualPath::Root);
    }

    #[test]
    fn test_classify_host_directory() {
        let index = index_of(&["h"]);
        assert_eq!(
            VirtualPath::classify("h", &index),
            VirtualPath::HostDirectory("h".to_string())
        );
    }

    #[test]
    fn test_classify_fingerprint_file() {
        let index = index_of(&["10.0.0.1"]);
        assert_eq!(
            VirtualPath::classify("10.0.0.1/fingerprint", &index),
            VirtualPath::FingerprintFile("10.0.0.1".to_string())
        );
    }

    #[test]
    fn test_classify_unknown() {
        let index = index_of(&["h"]);
        assert_eq!(VirtualPath::classify("nope", &index), VirtualPath::Unknown);
        assert_eq!(VirtualPath::classify("nope/fingerprint", &index), VirtualPath::Unknown);
        assert_eq!(VirtualPath::classify("h/fingerprint/x", &index), VirtualPath::Unknown);
        assert_eq!(VirtualPath::classify("/h", &index), VirtualPath::Unknown);
    }

    #[test]
    fn test_host_named_fingerprint() {
        let index = index_of(&["fingerprint"]);
        assert_eq!(
            VirtualPath::classify("fingerprint", &index),
            VirtualPath::HostDirectory("fingerprint".to_string())
        );
        assert_eq!(
            VirtualPath::classify("fingerprint/fingerprint", &index),
            VirtualPath::FingerprintFile("fingerprint".to_string())
        );
    }

    #[test]
    fn test_attrs_constructors() {
        let dir = Attrs::directory();
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
        assert_eq!(dir.permissions, 0o755);

        let file = Attrs::file(48);
        assert!(!file.is_dir());
        assert_eq!(file.size, 48);
        assert_eq!(file.permissions, 0o444);
    }

    #[test]
    fn test_write_always_denied() {
        let resolver = VirtualPathResolver::new(Arc::new(HostIndexCache::new("/nonexistent")));
        assert_eq!(resolver.open_for_read("", true), Err(FsError::PermissionDenied));
        assert_eq!(
            resolver.open_for_read("anything/fingerprint", true),
            Err(FsError::PermissionDenied)
        );
    }

    #[test]
    fn test_missing_source_is_not_found() {
        let resolver = VirtualPathResolver::new(Arc::new(HostIndexCache::new("/nonexistent")));
        assert_eq!(resolver.attributes_of(""), Err(FsError::NotFound));
        assert_eq!(resolver.list_directory(""), Err(FsError::NotFound));
        assert_eq!(resolver.open_for_read("", false), Err(FsError::NotFound));
        assert_eq!(resolver.classify(""), VirtualPath::Unknown);
    }
}
