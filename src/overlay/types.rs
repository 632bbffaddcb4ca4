use fuser::FUSE_ROOT_ID;
use fxhash::hash64;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Where an inode's attributes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InodeOrigin {
    /// Looked up or listed through the archive.
    Item,
    /// Created through the mount; attributes come from the local file.
    Local,
}

#[derive(Debug, Clone)]
pub(crate) struct InodeData {
    pub inode: u64,
    pub parent: u64,
    pub name: OsString,
    /// Mount-relative path with a leading separator, e.g. `/nasa/apollo`.
    pub path: PathBuf,
    pub origin: InodeOrigin,
}

/// Inode number <-> path bookkeeping for the kernel protocol.
///
/// Holds names only, never attributes: every attribute request goes back to
/// the archive or the local roots.
#[derive(Debug)]
pub(crate) struct InodeTable {
    inodes: HashMap<u64, InodeData>,
    children: HashMap<u64, HashMap<u64, u64>>,
    next_ino: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut table = InodeTable {
            inodes: HashMap::new(),
            children: HashMap::new(),
            // FUSE reserves inode 1 (FUSE_ROOT_ID) for the root directory
            next_ino: FUSE_ROOT_ID + 1,
        };
        table.inodes.insert(
            FUSE_ROOT_ID,
            InodeData {
                inode: FUSE_ROOT_ID,
                parent: FUSE_ROOT_ID,
                name: OsString::new(),
                path: PathBuf::from("/"),
                origin: InodeOrigin::Item,
            },
        );
        table
    }

    pub fn get(&self, ino: u64) -> Option<&InodeData> {
        self.inodes.get(&ino)
    }

    pub fn path(&self, ino: u64) -> Option<&Path> {
        self.inodes.get(&ino).map(|i| i.path.as_path())
    }

    pub fn lookup_child(&self, parent: u64, name: &OsStr) -> Option<u64> {
        let name_hash = hash64(name.as_bytes());
        self.children
            .get(&parent)
            .and_then(|map| map.get(&name_hash).copied())
    }

    /// Return the inode for `name` under `parent`, allocating one if needed.
    ///
    /// An existing inode keeps its number; its origin is updated.
    pub fn get_or_insert_child(
        &mut self,
        parent: u64,
        name: &OsStr,
        origin: InodeOrigin,
    ) -> Option<u64> {
        if let Some(ino) = self.lookup_child(parent, name) {
            if let Some(inode) = self.inodes.get_mut(&ino) {
                inode.origin = origin;
            }
            return Some(ino);
        }

        let parent_path = self.path(parent)?.to_path_buf();
        let ino = self.next_ino;
        self.next_ino = self.next_ino.wrapping_add(1);

        self.inodes.insert(
            ino,
            InodeData {
                inode: ino,
                parent,
                name: name.to_os_string(),
                path: parent_path.join(name),
                origin,
            },
        );
        self.children
            .entry(parent)
            .or_default()
            .insert(hash64(name.as_bytes()), ino);
        Some(ino)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inodes.len()
    }
}
