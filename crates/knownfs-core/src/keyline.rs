//! Key line parsing.
//!
//! Turns one `<hosts> <key-type> <base64-key>` line into its host tokens
//! and decoded key blob. The blob is validated as an SSH public key and
//! its algorithm must match the declared key type.
//!
//! # Examples
//!
//! ```
//! use knownfs_core::parse_known_host_line;
//!
//! let line = "[deagol.vpn]:2222,[10.10.10.100]:2222 ecdsa-sha2-nistp256 \
//!     AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBH+761batAEA5KM7JQUrKeNyKftdnRd49E03snPA/j8nP6u7vJlIzf9S2MZlbZyHeh5Hr2wIVwpJF1n5ycg1rG4=";
//! let parsed = parse_known_host_line(line).unwrap();
//!
//! assert_eq!(parsed.hosts, vec!["[deagol.vpn]:2222", "[10.10.10.100]:2222"]);
//! assert_eq!(parsed.key_type, "ecdsa-sha2-nistp256");
//! assert_eq!(
//!     parsed.fingerprint().as_str(),
//!     "c8:ca:c2:44:66:98:31:2a:c1:c2:91:e0:fc:b3:91:b2"
//! );
//! ```

use crate::types::Fingerprint;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ssh_key::PublicKey;
use thiserror::Error;

/// Why a key line was rejected.
#[derive(Error, Debug)]
pub enum KeyLineError {
    /// The line does not have exactly three space-separated fields.
    #[error("expected 3 space-separated fields, found {0}")]
    FieldCount(usize),

    /// The host field is empty.
    #[error("empty host list")]
    NoHosts,

    /// The key material is not valid base64.
    #[error("invalid base64 key material: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded blob is not a valid SSH public key.
    #[error("invalid public key: {0}")]
    Key(#[from] ssh_key::Error),

    /// The blob encodes a different algorithm than the line declares.
    #[error("key type mismatch: line declares '{declared}', key is '{actual}'")]
    TypeMismatch {
        /// Key type named by the line
        declared: String,
        /// Algorithm found inside the blob
        actual: String,
    },
}

/// One parsed known-hosts key line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHostLine {
    /// Raw host tokens, ports not yet stripped
    pub hosts: Vec<String>,
    /// Declared key type, e.g. `ssh-ed25519`
    pub key_type: String,
    /// Decoded wire-format key blob
    pub key_blob: Vec<u8>,
}

impl KnownHostLine {
    /// Legacy fingerprint of the key blob.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::legacy_md5(&self.key_blob)
    }
}

/// Parses a three-field known-hosts line.
///
/// # Errors
///
/// Returns a [`KeyLineError`] describing the first problem found.
pub fn parse_known_host_line(line: &str) -> Result<KnownHostLine, KeyLineError> {
    let fields: Vec<&str> = line.split(' ').collect();
    let [hosts, key_type, encoded] = fields[..] else {
        return Err(KeyLineError::FieldCount(fields.len()));
    };

    let hosts: Vec<String> = hosts
        .split(',')
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect();
    if hosts.is_empty() {
        return Err(KeyLineError::NoHosts);
    }

    let key_blob = STANDARD.decode(encoded)?;
    let key = PublicKey::from_bytes(&key_blob)?;

    let actual = key.algorithm();
    if actual.as_str() != key_type {
        return Err(KeyLineError::TypeMismatch {
            declared: key_type.to_string(),
            actual: actual.as_str().to_string(),
        });
    }

    Ok(KnownHostLine {
        hosts,
        key_type: key_type.to_string(),
        key_blob,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NISTP256_KEY: &str = "AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBH+761batAEA5KM7JQUrKeNyKftdnRd49E03snPA/j8nP6u7vJlIzf9S2MZlbZyHeh5Hr2wIVwpJF1n5ycg1rG4=";

    #[test]
    fn test_parse_valid_line() {
        let line = format!("example.org ecdsa-sha2-nistp256 {NISTP256_KEY}");
        let parsed = parse_known_host_line(&line).unwrap();
        assert_eq!(parsed.hosts, vec!["example.org"]);
        assert_eq!(
            parsed.fingerprint().as_str(),
            "c8:ca:c2:44:66:98:31:2a:c1:c2:91:e0:fc:b3:91:b2"
        );
    }

    #[test]
    fn test_parse_bogus_line() {
        let err = parse_known_host_line("moi kissa tes").unwrap_err();
        assert!(matches!(err, KeyLineError::Base64(_)));
    }

    #[test]
    fn test_parse_valid_base64_not_a_key() {
        // "hello world" encoded; decodes fine but is no SSH key
        let err = parse_known_host_line("host ssh-ed25519 aGVsbG8gd29ybGQ=").unwrap_err();
        assert!(matches!(err, KeyLineError::Key(_)));
    }

    #[test]
    fn test_parse_type_mismatch() {
        let line = format!("host ssh-ed25519 {NISTP256_KEY}");
        let err = parse_known_host_line(&line).unwrap_err();
        assert!(matches!(err, KeyLineError::TypeMismatch { .. }));
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let err = parse_known_host_line("a b").unwrap_err();
        assert!(matches!(err, KeyLineError::FieldCount(2)));
    }

    #[test]
    fn test_parse_empty_host_list() {
        let line = format!(", ecdsa-sha2-nistp256 {NISTP256_KEY}");
        let err = parse_known_host_line(&line).unwrap_err();
        assert!(matches!(err, KeyLineError::NoHosts));
    }
}
