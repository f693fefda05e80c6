//! Domain types for the host index.
//!
//! - [`Fingerprint`]: colon-separated hex rendering of a key digest
//! - [`HostEntry`]: one host identifier with its fingerprint
//! - [`HostIndex`]: the host → fingerprint mapping built from one parse
//!
//! # Examples
//!
//! ```
//! use knownfs_core::{Fingerprint, HostEntry, HostIndex};
//!
//! let fp = Fingerprint::legacy_md5(b"key blob");
//! let index: HostIndex = [HostEntry::new("example.org", fp.clone())]
//!     .into_iter()
//!     .collect();
//!
//! assert_eq!(index.get("example.org"), Some(&fp));
//! assert!(index.get("missing.org").is_none());
//! ```

use md5::{Digest, Md5};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

/// Legacy (MD5) fingerprint of an SSH public key.
///
/// Rendered as sixteen lowercase hex octets joined by colons, the format
/// `ssh-keygen -E md5 -l` prints.
///
/// # Examples
///
/// ```
/// use knownfs_core::Fingerprint;
///
/// let fp = Fingerprint::legacy_md5(b"");
/// assert_eq!(fp.as_str(), "d4:1d:8c:d9:8f:00:b2:04:e9:80:09:98:ec:f8:42:7e");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the legacy fingerprint of a wire-format key blob.
    #[must_use]
    pub fn legacy_md5(key_blob: &[u8]) -> Self {
        let digest = Md5::digest(key_blob);
        let mut rendered = String::with_capacity(digest.len() * 3);
        for (i, octet) in digest.iter().enumerate() {
            if i > 0 {
                rendered.push(':');
            }
            // Writing to a String cannot fail.
            let _ = write!(rendered, "{octet:02x}");
        }
        Self(rendered)
    }

    /// Returns the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the bytes served for a fingerprint file: the fingerprint
    /// followed by a single newline.
    ///
    /// # Examples
    ///
    /// ```
    /// use knownfs_core::Fingerprint;
    ///
    /// let fp = Fingerprint::legacy_md5(b"abc");
    /// let content = fp.file_content();
    /// assert_eq!(content.len(), fp.as_str().len() + 1);
    /// assert_eq!(content.last(), Some(&b'\n'));
    /// ```
    #[must_use]
    pub fn file_content(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(self.0.len() + 1);
        content.extend_from_slice(self.0.as_bytes());
        content.push(b'\n');
        content
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host identifier paired with its fingerprint.
///
/// The host has already had any `[host]:port` notation stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Hostname or literal IP address
    pub host: String,
    /// Fingerprint of the host's key
    pub fingerprint: Fingerprint,
}

impl HostEntry {
    /// Creates a new host entry.
    #[must_use]
    pub fn new(host: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            host: host.into(),
            fingerprint,
        }
    }
}

/// Mapping from host identifier to fingerprint.
///
/// Keys are unique; inserting an existing host replaces its fingerprint.
/// Iteration order is unspecified and may differ between two indexes
/// holding the same entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIndex {
    entries: HashMap<String, Fingerprint>,
}

impl HostIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing any previous fingerprint for the host.
    pub fn insert(&mut self, entry: HostEntry) {
        self.entries.insert(entry.host, entry.fingerprint);
    }

    /// Returns the fingerprint recorded for `host`.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<&Fingerprint> {
        self.entries.get(host)
    }

    /// Returns `true` if `host` is a key of the index.
    #[must_use]
    pub fn contains_host(&self, host: &str) -> bool {
        self.entries.contains_key(host)
    }

    /// Iterates over host identifiers in unspecified order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(host, fingerprint)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.entries.iter().map(|(h, f)| (h.as_str(), f))
    }

    /// Returns the number of hosts in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index holds no hosts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<HostEntry> for HostIndex {
    fn from_iter<I: IntoIterator<Item = HostEntry>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl Extend<HostEntry> for HostIndex {
    fn extend<I: IntoIterator<Item = HostEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_format() {
        let fp = Fingerprint::legacy_md5(b"hello");
        let octets: Vec<&str> = fp.as_str().split(':').collect();
        assert_eq!(octets.len(), 16);
        assert!(
            octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
        );
        assert_eq!(fp.as_str(), fp.as_str().to_lowercase());
    }

    #[test]
    fn test_fingerprint_display_matches_as_str() {
        let fp = Fingerprint::legacy_md5(b"hello");
        assert_eq!(format!("{fp}"), fp.as_str());
    }

    #[test]
    fn test_file_content_appends_newline() {
        let fp = Fingerprint::legacy_md5(b"x");
        let content = fp.file_content();
        assert_eq!(&content[..content.len() - 1], fp.as_str().as_bytes());
        assert_eq!(content[content.len() - 1], b'\n');
    }

    #[test]
    fn test_insert_overwrites() {
        let first = Fingerprint::legacy_md5(b"first");
        let second = Fingerprint::legacy_md5(b"second");

        let mut index = HostIndex::new();
        index.insert(HostEntry::new("h", first));
        index.insert(HostEntry::new("h", second.clone()));

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("h"), Some(&second));
    }

    #[test]
    fn test_shared_fingerprints_allowed() {
        let fp = Fingerprint::legacy_md5(b"shared");
        let index: HostIndex = [HostEntry::new("a", fp.clone()), HostEntry::new("b", fp)]
            .into_iter()
            .collect();

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("a"), index.get("b"));
    }

    #[test]
    fn test_hosts_membership() {
        let fp = Fingerprint::legacy_md5(b"k");
        let index: HostIndex = ["x", "y", "z"]
            .into_iter()
            .map(|h| HostEntry::new(h, fp.clone()))
            .collect();

        let mut hosts: Vec<&str> = index.hosts().collect();
        hosts.sort_unstable();
        assert_eq!(hosts, vec!["x", "y", "z"]);
        assert!(index.contains_host("y"));
        assert!(!index.contains_host("w"));
    }

    #[test]
    fn test_empty_index() {
        let index = HostIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
    }
}
