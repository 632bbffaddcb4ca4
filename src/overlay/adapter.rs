use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::client::{ArchiveClient, SearchResults};
use crate::error::{IafsError, Result};
use crate::overlay::path_resolver::PathResolver;

/// Stat-like attributes of a remote item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAttr {
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
}

/// Directory listing: `.` and `..` followed by every search hit.
///
/// The search runs once when the listing is built; iterating consumes it and
/// it cannot be rewound.
pub struct DirEntries {
    dots: std::array::IntoIter<&'static str, 2>,
    results: SearchResults,
}

impl DirEntries {
    fn new(results: SearchResults) -> Self {
        DirEntries {
            dots: [".", ".."].into_iter(),
            results,
        }
    }
}

impl Iterator for DirEntries {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.dots.next() {
            Some(dot) => Some(dot.to_string()),
            None => self.results.next(),
        }
    }
}

/// The filesystem operations the FUSE layer needs, expressed on mount-relative paths.
pub trait ArchiveOperations {
    /// Local path a request for `path` would use, without touching the archive.
    fn resolve_local(&self, path: &Path) -> PathBuf;
    fn read_metadata(&self, path: &Path) -> Result<ItemAttr>;
    fn list_entries(&self, path: &Path) -> Result<DirEntries>;
    fn open(&self, path: &Path, flags: i32) -> Result<File>;
    /// Create `path` with the caller's open flags. `O_EXCL` refuses an existing
    /// file; an existing file is only truncated with `O_TRUNC`.
    fn create(&self, path: &Path, mode: u32, flags: i32) -> Result<File>;
    fn read(&self, file: &File, offset: u64, size: usize) -> Result<Vec<u8>>;
    fn write(&self, file: &File, offset: u64, data: &[u8]) -> Result<usize>;
}

/// Maps filesystem requests onto the archive client and the two local roots.
pub struct ArchiveAdapter<C: ArchiveClient> {
    client: C,
    resolver: PathResolver,
}

impl<C: ArchiveClient> ArchiveAdapter<C> {
    pub fn new(client: C, resolver: PathResolver) -> Self {
        ArchiveAdapter { client, resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    fn resolved_string(&self, path: &Path) -> String {
        self.resolver
            .resolve(path, false)
            .path
            .to_string_lossy()
            .into_owned()
    }
}

impl<C: ArchiveClient> ArchiveOperations for ArchiveAdapter<C> {
    fn resolve_local(&self, path: &Path) -> PathBuf {
        self.resolver.resolve(path, false).path
    }

    fn read_metadata(&self, path: &Path) -> Result<ItemAttr> {
        let identifier = self.resolved_string(path);

        let item = match self.client.get_item(&identifier) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!("read_metadata: lookup of {:?} failed: {}", identifier, e);
                return Err(IafsError::ItemNotFound(identifier));
            }
        };
        if !item.exists() {
            return Err(IafsError::ItemNotFound(identifier));
        }

        let created = item
            .created
            .as_ref()
            .map(|t| t.to_system_time())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let updated = item
            .updated
            .as_ref()
            .map(|t| t.to_system_time())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        Ok(ItemAttr {
            atime: created,
            ctime: created,
            mtime: updated,
            size: item.item_size.unwrap_or(0),
            uid: 0,
            gid: 0,
        })
    }

    fn list_entries(&self, path: &Path) -> Result<DirEntries> {
        let query = self.resolved_string(path);
        tracing::debug!("list_entries: searching for {:?}", query);
        let results = self.client.search_items(&query)?;
        Ok(DirEntries::new(results))
    }

    fn open(&self, path: &Path, flags: i32) -> Result<File> {
        let resolved = self.resolver.resolve(path, false);
        let access = flags & libc::O_ACCMODE;

        let file = OpenOptions::new()
            .read(access == libc::O_RDONLY || access == libc::O_RDWR)
            .write(access == libc::O_WRONLY || access == libc::O_RDWR)
            .custom_flags(flags & !libc::O_ACCMODE)
            .open(&resolved.path)?;
        Ok(file)
    }

    fn create(&self, path: &Path, mode: u32, flags: i32) -> Result<File> {
        let write_intent = self.resolver.is_write_intent(path);
        let resolved = self.resolver.resolve(path, false);
        tracing::debug!(
            "create: {:?} -> {} ({:?}, write_intent={})",
            path,
            resolved.path.display(),
            resolved.layer,
            write_intent
        );

        let exclusive = flags & libc::O_EXCL != 0;
        let passthrough = flags & !(libc::O_ACCMODE | libc::O_CREAT | libc::O_EXCL | libc::O_TRUNC);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(!exclusive)
            .create_new(exclusive)
            .truncate(flags & libc::O_TRUNC != 0)
            .custom_flags(passthrough)
            .mode(mode)
            .open(&resolved.path)?;
        Ok(file)
    }

    fn read(&self, file: &File, offset: u64, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size];
        let n = file.read_at(&mut buf, offset)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn write(&self, file: &File, offset: u64, data: &[u8]) -> Result<usize> {
        Ok(file.write_at(data, offset)?)
    }
}
