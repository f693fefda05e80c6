//! Core of knownfs: a cached known-hosts index and a virtual path resolver.
//!
//! knownfs exposes the hosts recorded in an OpenSSH `known_hosts` file as
//! a read-only tree with one directory per host, each holding a single
//! `fingerprint` file.
//!
//! # Architecture
//!
//! - [`HostIndexCache`]: parses the file into a [`HostIndex`], reparsing
//!   only when the file's modification time advances
//! - [`VirtualPathResolver`]: answers attribute, listing and read queries
//!   against the live index through the [`FileSystemView`] trait
//! - [`parse_known_host_line`] and [`split_host_token`]: the line-level
//!   grammar the cache consumes
//!
//! The crate has no knowledge of any particular filesystem transport and
//! never reads the process environment; the source path is always passed
//! in by the caller.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod cache;
mod error;
mod host;
mod keyline;
mod resolver;
mod types;

pub use cache::{CacheStats, HostIndexCache, IndexSnapshot, parse_index};
pub use error::{Error, Result};
pub use host::split_host_token;
pub use keyline::{KeyLineError, KnownHostLine, parse_known_host_line};
pub use resolver::{
    Attrs, DIR_PERMISSIONS, DirEntry, FILE_PERMISSIONS, FINGERPRINT_FILE, FileSystemView, FsError, NodeKind,
    VirtualPath, VirtualPathResolver,
};
pub use types::{Fingerprint, HostEntry, HostIndex};
