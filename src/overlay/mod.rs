mod convert;
mod types;

pub mod adapter;
pub mod mount;
pub mod path_resolver;

pub use adapter::{ArchiveAdapter, ArchiveOperations, DirEntries, ItemAttr};
pub use mount::mount_archive;
pub use path_resolver::{LayerType, PathResolver, ResolvedPath};

use convert::{error_to_libc, io_error_to_libc, item_attr_to_fileattr, metadata_to_fileattr};
use types::{InodeOrigin, InodeTable};

use fuser::{
    FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, FUSE_ROOT_ID,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// FUSE binding for an [`ArchiveOperations`] implementation.
///
/// The kernel speaks in inode numbers; this type keeps the inode <-> path map
/// and forwards every request to the path-based operations. Attribute and
/// entry TTLs are zero so the kernel asks again on every access.
pub struct IaFs<A: ArchiveOperations> {
    ops: A,
    root_dir: PathBuf,
    inodes: InodeTable,
    file_handles: HashMap<u64, File>,
    next_fh: u64,
    ttl: Duration,
}

impl<A: ArchiveOperations> IaFs<A> {
    /// `root_dir` is the local directory whose attributes the mount root reports.
    pub fn new(ops: A, root_dir: PathBuf) -> Self {
        IaFs {
            ops,
            root_dir,
            inodes: InodeTable::new(),
            file_handles: HashMap::new(),
            next_fh: 1,
            ttl: Duration::ZERO,
        }
    }

    fn alloc_fh(&mut self) -> u64 {
        let fh = self.next_fh;
        self.next_fh = self.next_fh.wrapping_add(1);
        fh
    }

    fn inode_path(&self, ino: u64) -> Option<PathBuf> {
        self.inodes.path(ino).map(Path::to_path_buf)
    }

    fn local_attr(&self, path: &Path, ino: u64) -> Result<FileAttr, i32> {
        fs::metadata(path)
            .map(|meta| metadata_to_fileattr(&meta, ino))
            .map_err(|e| io_error_to_libc(&e))
    }

    fn attr_for(&self, ino: u64) -> Result<FileAttr, i32> {
        if ino == FUSE_ROOT_ID {
            return self.local_attr(&self.root_dir, ino);
        }

        let inode = self.inodes.get(ino).ok_or(libc::ENOENT)?;
        match inode.origin {
            InodeOrigin::Local => {
                let resolved = self.ops.resolve_local(&inode.path);
                self.local_attr(&resolved, ino)
            }
            InodeOrigin::Item => self
                .ops
                .read_metadata(&inode.path)
                .map(|attr| item_attr_to_fileattr(&attr, ino))
                .map_err(|e| error_to_libc(&e)),
        }
    }

    /// Attributes for `name` under `parent`, registering the inode.
    ///
    /// Archive items win; a name the archive does not know but that exists in
    /// one of the local roots is served as a local file.
    fn entry_for(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, i32> {
        let parent_path = self.inode_path(parent).ok_or(libc::ENOENT)?;
        let path = parent_path.join(name);

        // Files created through the mount are never archive items.
        if let Some(ino) = self.inodes.lookup_child(parent, name) {
            if self.inodes.get(ino).map(|i| i.origin) == Some(InodeOrigin::Local) {
                return self.attr_for(ino);
            }
        }

        match self.ops.read_metadata(&path) {
            Ok(attr) => {
                let ino = self
                    .inodes
                    .get_or_insert_child(parent, name, InodeOrigin::Item)
                    .ok_or(libc::ENOENT)?;
                Ok(item_attr_to_fileattr(&attr, ino))
            }
            Err(e) => {
                let local = self.ops.resolve_local(&path);
                if !local.exists() {
                    tracing::debug!("lookup: {:?} -> {}", path, e);
                    return Err(error_to_libc(&e));
                }
                let ino = self
                    .inodes
                    .get_or_insert_child(parent, name, InodeOrigin::Local)
                    .ok_or(libc::ENOENT)?;
                self.local_attr(&local, ino)
            }
        }
    }
}

impl<A: ArchiveOperations> Filesystem for IaFs<A> {
    fn init(
        &mut self,
        _req: &Request,
        _config: &mut KernelConfig,
    ) -> std::result::Result<(), libc::c_int> {
        tracing::info!("iafs filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("iafs filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        tracing::debug!("lookup(parent={}, name={:?})", parent, name);
        match self.entry_for(parent, name) {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(errno) => reply.error(errno),
        }
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        tracing::trace!("getattr(ino={})", ino);
        match self.attr_for(ino) {
            Ok(attr) => reply.attr(&self.ttl, &attr),
            Err(errno) => reply.error(errno),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        tracing::debug!("readdir(ino={}, offset={})", ino, offset);
        let Some(inode) = self.inodes.get(ino).cloned() else {
            reply.error(libc::ENOENT);
            return;
        };

        let entries = match self.ops.list_entries(&inode.path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("readdir: listing {:?} failed: {}", inode.path, e);
                reply.error(error_to_libc(&e));
                return;
            }
        };

        for (idx, name) in entries.enumerate().skip(offset.max(0) as usize) {
            let child_ino = match name.as_str() {
                "." => ino,
                ".." => inode.parent,
                _ => match self.inodes.get_or_insert_child(
                    ino,
                    OsStr::new(&name),
                    InodeOrigin::Item,
                ) {
                    Some(child) => child,
                    None => continue,
                },
            };

            if reply.add(child_ino, (idx + 1) as i64, FileType::Directory, &name) {
                break;
            }
        }

        reply.ok();
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        tracing::debug!("open(ino={}, flags={:#x})", ino, flags);
        let Some(path) = self.inode_path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.ops.open(&path, flags) {
            Ok(file) => {
                let fh = self.alloc_fh();
                self.file_handles.insert(fh, file);
                reply.opened(fh, 0);
            }
            Err(e) => {
                tracing::debug!("open: {:?} -> {}", path, e);
                reply.error(error_to_libc(&e));
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        tracing::debug!("read(ino={}, fh={}, offset={}, size={})", ino, fh, offset, size);
        let Some(file) = self.file_handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        match self.ops.read(file, offset.max(0) as u64, size as usize) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                tracing::error!("read: {}", e);
                reply.error(error_to_libc(&e));
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        tracing::debug!(
            "write(ino={}, fh={}, offset={}, len={})",
            ino,
            fh,
            offset,
            data.len()
        );
        let Some(file) = self.file_handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        match self.ops.write(file, offset.max(0) as u64, data) {
            Ok(n) => reply.written(n as u32),
            Err(e) => {
                tracing::error!("write: {}", e);
                reply.error(error_to_libc(&e));
            }
        }
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        tracing::debug!("create(parent={}, name={:?})", parent, name);
        let Some(parent_path) = self.inode_path(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = parent_path.join(name);

        let file = match self.ops.create(&path, mode & !umask & 0o7777, flags) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("create: {:?} -> {}", path, e);
                reply.error(error_to_libc(&e));
                return;
            }
        };

        let Some(ino) = self
            .inodes
            .get_or_insert_child(parent, name, InodeOrigin::Local)
        else {
            reply.error(libc::ENOENT);
            return;
        };

        let attr = match file.metadata() {
            Ok(meta) => metadata_to_fileattr(&meta, ino),
            Err(e) => {
                reply.error(io_error_to_libc(&e));
                return;
            }
        };

        let fh = self.alloc_fh();
        self.file_handles.insert(fh, file);
        reply.created(&self.ttl, &attr, 0, fh, 0);
    }

    fn flush(&mut self, _req: &Request, _ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let Some(file) = self.file_handles.get(&fh) else {
            reply.error(libc::EBADF);
            return;
        };

        match file.sync_all() {
            Ok(()) => reply.ok(),
            // Read-only handles on some filesystems refuse fsync
            Err(e) if e.raw_os_error() == Some(libc::EBADF) => reply.ok(),
            Err(e) => reply.error(io_error_to_libc(&e)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.file_handles.remove(&fh);
        reply.ok();
    }
}
