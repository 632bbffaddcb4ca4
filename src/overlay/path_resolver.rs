use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Primary,
    Fallback,
}

/// Outcome of resolving a mount-relative path against the two local roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub layer: LayerType,
}

impl ResolvedPath {
    fn primary(path: PathBuf) -> Self {
        ResolvedPath {
            path,
            layer: LayerType::Primary,
        }
    }

    fn fallback(path: PathBuf) -> Self {
        ResolvedPath {
            path,
            layer: LayerType::Fallback,
        }
    }
}

/// Decides which local root a filesystem request targets.
///
/// The primary root shadows the fallback root. A path found in neither root is
/// treated as a write and lands in the primary root unless only the fallback
/// root has the parent directory for it. Nothing is cached: every call looks
/// at the local filesystem again.
#[derive(Debug, Clone)]
pub struct PathResolver {
    pub(crate) primary_root: PathBuf,
    pub(crate) fallback_root: PathBuf,
}

/// Strip exactly one leading separator. A second one is kept, which makes the
/// remainder absolute and lets it replace the root when joined.
fn strip_leading_separator(partial: &Path) -> &Path {
    let bytes = partial.as_os_str().as_bytes();
    match bytes.strip_prefix(b"/") {
        Some(rest) => Path::new(OsStr::from_bytes(rest)),
        None => partial,
    }
}

fn parent_exists(path: &Path) -> bool {
    path.parent().is_some_and(|p| p.exists())
}

impl PathResolver {
    pub fn new(primary_root: PathBuf, fallback_root: PathBuf) -> Self {
        PathResolver {
            primary_root,
            fallback_root,
        }
    }

    pub fn primary_root(&self) -> &Path {
        &self.primary_root
    }

    pub fn fallback_root(&self) -> &Path {
        &self.fallback_root
    }

    /// Get the primary root path for a mount-relative path.
    pub fn primary_path(&self, partial: &Path) -> PathBuf {
        self.primary_root.join(strip_leading_separator(partial))
    }

    /// Get the fallback root path for a mount-relative path.
    pub fn fallback_path(&self, partial: &Path) -> PathBuf {
        self.fallback_root.join(strip_leading_separator(partial))
    }

    /// Resolve `partial` to the local path a request should use.
    ///
    /// With `use_fallback` the fallback root is returned unconditionally.
    pub fn resolve(&self, partial: &Path, use_fallback: bool) -> ResolvedPath {
        if use_fallback {
            return ResolvedPath::fallback(self.fallback_path(partial));
        }

        let primary = self.primary_path(partial);
        if primary.exists() {
            tracing::trace!("resolve: {} found in primary root", primary.display());
            return ResolvedPath::primary(primary);
        }

        let fallback = self.fallback_path(partial);
        if fallback.exists() {
            tracing::trace!("resolve: {} found in fallback root", fallback.display());
            return ResolvedPath::fallback(fallback);
        }

        // Neither root has it, so this is a write.
        // TODO: upload newly written files to the archive once a write-through
        // target for items is defined; writes only land locally for now.
        tracing::debug!(
            "resolve: {:?} missing from both roots, treating as write",
            partial
        );

        if parent_exists(&primary) || !parent_exists(&fallback) {
            ResolvedPath::primary(primary)
        } else {
            ResolvedPath::fallback(fallback)
        }
    }

    /// Whether `partial` exists in neither root.
    pub fn is_write_intent(&self, partial: &Path) -> bool {
        !self.primary_path(partial).exists() && !self.fallback_path(partial).exists()
    }
}
