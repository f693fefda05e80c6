//! Host token handling.
//!
//! A known-hosts line names its hosts as a comma-separated list. Each
//! token is a bare hostname or IP address, or the bracketed
//! `[host]:port` form OpenSSH writes for non-default ports.

use crate::error::{Error, Result};

/// Strips an optional port from a host token, returning the host.
///
/// | token               | host            |
/// |---------------------|-----------------|
/// | `example.org`       | `example.org`   |
/// | `[example.org]:2222`| `example.org`   |
/// | `[::1]:22`          | `::1`           |
/// | `10.0.0.1:22`       | `10.0.0.1`      |
/// | `fe80::1`           | `fe80::1`       |
///
/// # Errors
///
/// Returns [`Error::TokenSplit`] for an empty host, an unterminated
/// bracket, anything other than `:port` after the closing bracket, a
/// non-numeric port, or a hashed (`|1|...`) token.
///
/// # Examples
///
/// ```
/// use knownfs_core::split_host_token;
///
/// assert_eq!(split_host_token("[deagol.vpn]:2222").unwrap(), "deagol.vpn");
/// assert_eq!(split_host_token("github.com").unwrap(), "github.com");
/// assert!(split_host_token("[broken").is_err());
/// ```
pub fn split_host_token(token: &str) -> Result<&str> {
    let fail = |reason| Error::TokenSplit {
        token: token.to_string(),
        reason,
    };

    if token.starts_with('|') {
        return Err(fail("hashed hostnames are not supported"));
    }

    let host = if let Some(rest) = token.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| fail("unterminated bracket"))?;
        if !tail.is_empty() {
            let port = tail
                .strip_prefix(':')
                .ok_or_else(|| fail("expected ':port' after ']'"))?;
            validate_port(port).map_err(fail)?;
        }
        host
    } else {
        match token.split_once(':') {
            // More than one colon without brackets: a bare IPv6 literal.
            Some((_, rest)) if rest.contains(':') => token,
            Some((host, port)) => {
                validate_port(port).map_err(fail)?;
                host
            }
            None => token,
        }
    };

    if host.is_empty() {
        return Err(fail("empty host"));
    }
    Ok(host)
}

fn validate_port(port: &str) -> std::result::Result<(), &'static str> {
    if port.is_empty() {
        return Err("missing port");
    }
    port.parse::<u16>().map(|_| ()).map_err(|_| "invalid port")
}
