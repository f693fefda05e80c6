//! knownfs command-line library.
//!
//! Wires the [`knownfs_core`] resolver to a FUSE session. The modules are
//! exposed so the argument parsing, configuration checks and inode
//! bookkeeping can be tested without mounting anything.

pub mod cli;
pub mod config;
pub mod fuse;
pub mod inode;

pub use cli::{Cli, ExitCode};
pub use config::MountConfig;
pub use fuse::{KnownFs, mount};
pub use inode::{InodeTable, ROOT_INODE};
