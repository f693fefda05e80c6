//! FUSE adapter over a [`FileSystemView`].
//!
//! Translates kernel requests into path queries against the view and maps
//! [`FsError`] onto errno values. Open file handles hold a snapshot of the
//! file content taken at open time, so a rebuild of the index between
//! `open` and `read` never changes bytes under a reader.

use crate::config::MountConfig;
use crate::inode::{InodeTable, child_path, parent_path};
use anyhow::{Context, Result};
use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, Request,
};
use knownfs_core::{Attrs, FileSystemView, FsError, NodeKind};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::time::{Duration, SystemTime};

const BLOCK_SIZE: u32 = 512;
const MAX_NAME_LEN: u32 = 255;

/// Open flags that signal an intent to modify the file.
const WRITE_FLAGS: i32 = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_CREAT | libc::O_TRUNC;

/// Returns `true` if the open flags request any kind of write access.
#[must_use]
pub const fn has_write_intent(flags: i32) -> bool {
    flags & WRITE_FLAGS != 0
}

/// Maps a resolver error onto the errno returned to the kernel.
#[must_use]
pub const fn errno(err: FsError) -> i32 {
    match err {
        FsError::NotFound => libc::ENOENT,
        FsError::PermissionDenied => libc::EPERM,
        FsError::IsDirectory => libc::EISDIR,
    }
}

const fn file_type(kind: NodeKind) -> FileType {
    match kind {
        NodeKind::Directory => FileType::Directory,
        NodeKind::File => FileType::RegularFile,
    }
}

/// Read-only filesystem serving a [`FileSystemView`].
#[derive(Debug)]
pub struct KnownFs<V> {
    view: V,
    inodes: InodeTable,
    handles: HashMap<u64, Vec<u8>>,
    next_fh: u64,
    ttl: Duration,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl<V: FileSystemView> KnownFs<V> {
    /// Creates a filesystem serving `view` with the given attribute TTL.
    ///
    /// Every node is reported as owned by the mounting user.
    pub fn new(view: V, ttl: Duration) -> Self {
        // SAFETY: getuid and getgid have no preconditions and cannot fail.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            view,
            inodes: InodeTable::new(),
            handles: HashMap::new(),
            next_fh: 1,
            ttl,
            uid,
            gid,
            mounted_at: SystemTime::now(),
        }
    }

    /// Number of currently open file handles.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    fn file_attr(&self, ino: u64, attrs: Attrs) -> FileAttr {
        let kind = file_type(attrs.kind);
        FileAttr {
            ino,
            size: attrs.size,
            blocks: attrs.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind,
            perm: attrs.permissions,
            nlink: if kind == FileType::Directory { 2 } else { 1 },
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn stat(&self, ino: u64) -> Result<Attrs, FsError> {
        let path = self.inodes.path_of(ino).ok_or(FsError::NotFound)?;
        self.view.get_attr(path)
    }

    fn lookup_child(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, FsError> {
        let parent = self.inodes.path_of(parent).ok_or(FsError::NotFound)?;
        let name = name.to_str().ok_or(FsError::NotFound)?;
        let path = child_path(parent, name);

        let attrs = self.view.get_attr(&path)?;
        let ino = self.inodes.inode_for(&path);
        Ok(self.file_attr(ino, attrs))
    }

    fn list(&mut self, ino: u64) -> Result<Vec<(u64, FileType, String)>, FsError> {
        let path = self.inodes.path_of(ino).ok_or(FsError::NotFound)?.to_owned();
        let listing = self.view.open_dir(&path)?;

        let parent = self.inodes.inode_for(parent_path(&path));
        let mut entries = Vec::with_capacity(listing.len() + 2);
        entries.push((ino, FileType::Directory, ".".to_owned()));
        entries.push((parent, FileType::Directory, "..".to_owned()));
        for entry in listing {
            let child = self.inodes.inode_for(&child_path(&path, &entry.name));
            entries.push((child, file_type(entry.kind), entry.name));
        }
        Ok(entries)
    }

    fn open_file(&mut self, ino: u64, flags: i32) -> Result<u64, FsError> {
        let path = self.inodes.path_of(ino).ok_or(FsError::NotFound)?;
        let content = self.view.open(path, has_write_intent(flags))?;

        let fh = self.next_fh;
        self.next_fh += 1;
        self.handles.insert(fh, content);
        Ok(fh)
    }

    fn read_handle(&self, fh: u64, offset: i64, size: u32) -> Option<&[u8]> {
        let content = self.handles.get(&fh)?;
        let start = usize::try_from(offset).ok()?.min(content.len());
        let len = usize::try_from(size).unwrap_or(usize::MAX);
        let end = start.saturating_add(len).min(content.len());
        Some(&content[start..end])
    }
}

impl<V: FileSystemView> Filesystem for KnownFs<V> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.lookup_child(parent, name) {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.stat(ino) {
            Ok(attrs) => reply.attr(&self.ttl, &self.file_attr(ino, attrs)),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.stat(ino) {
            Ok(attrs) if attrs.is_dir() => reply.opened(0, 0),
            Ok(_) => reply.error(libc::ENOTDIR),
            Err(err) => reply.error(errno(err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        match self.stat(ino) {
            Ok(attrs) if attrs.is_dir() => {}
            Ok(_) => {
                reply.error(libc::ENOTDIR);
                return;
            }
            Err(err) => {
                reply.error(errno(err));
                return;
            }
        }

        let entries = match self.list(ino) {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(errno(err));
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.iter().enumerate().skip(skip) {
            let next = i64::try_from(i + 1).unwrap_or(i64::MAX);
            if reply.add(*entry_ino, next, *kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match self.open_file(ino, flags) {
            Ok(fh) => {
                tracing::debug!(ino, fh, "opened fingerprint");
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(errno(err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_handle(fh, offset, size) {
            Some(data) => reply.data(data),
            None => reply.error(libc::EBADF),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(&fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let files = u64::try_from(self.inodes.len()).unwrap_or(u64::MAX);
        reply.statfs(0, 0, 0, files, 0, BLOCK_SIZE, MAX_NAME_LEN, 0);
    }
}

/// Builds the mount options for `config`.
#[must_use]
pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![MountOption::RO, MountOption::FSName("knownfs".into())];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    if config.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    options
}

/// Mounts `view` at the configured mount point and serves requests until
/// the filesystem is unmounted.
///
/// # Errors
///
/// Returns an error if the mount fails or the session ends abnormally.
pub fn mount<V: FileSystemView + 'static>(config: &MountConfig, view: V) -> Result<()> {
    let fs = KnownFs::new(view, config.attr_ttl);
    tracing::info!(
        mountpoint = %config.mountpoint.display(),
        source = %config.source.display(),
        "mounting known_hosts filesystem"
    );
    fuser::mount2(fs, &config.mountpoint, &mount_options(config))
        .with_context(|| format!("failed to mount at {}", config.mountpoint.display()))
}
