//! Mapping between FUSE inode numbers and virtual paths.
//!
//! The resolver speaks in slash-separated paths relative to the mount root
//! (`""`, `"host"`, `"host/fingerprint"`) while the kernel speaks in inode
//! numbers. Numbers are handed out on first sight of a path and stay bound
//! to it for the life of the mount, so a host that disappears and comes
//! back keeps its inode.

use std::collections::HashMap;

/// Inode number of the mount root.
pub const ROOT_INODE: u64 = 1;

/// Bidirectional inode/path table.
#[derive(Debug)]
pub struct InodeTable {
    by_ino: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    /// Creates a table holding only the root.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            by_ino: HashMap::new(),
            by_path: HashMap::new(),
            next: ROOT_INODE + 1,
        };
        table.by_ino.insert(ROOT_INODE, String::new());
        table.by_path.insert(String::new(), ROOT_INODE);
        table
    }

    /// Returns the path bound to `ino`.
    #[must_use]
    pub fn path_of(&self, ino: u64) -> Option<&str> {
        self.by_ino.get(&ino).map(String::as_str)
    }

    /// Returns the inode bound to `path`, allocating one if needed.
    pub fn inode_for(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_ino.insert(ino, path.to_owned());
        self.by_path.insert(path.to_owned(), ino);
        ino
    }

    /// Number of bound inodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_ino.len()
    }

    /// Always `false`; the root is bound at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_ino.is_empty()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Joins a directory path and an entry name.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the directory containing `path`. The root is its own parent.
#[must_use]
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}
