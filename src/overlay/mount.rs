use std::path::Path;

use crate::client::ArchiveClient;
use crate::config::MountConfig;
use crate::error::{IafsError, Result};
use crate::overlay::{ArchiveAdapter, IaFs, PathResolver};

/// Build the mount options for a session.
pub fn mount_options(config: &MountConfig) -> Vec<fuser::MountOption> {
    let mut options = vec![
        fuser::MountOption::FSName(config.get_fs_name()),
        fuser::MountOption::Subtype("iafs".to_string()),
        fuser::MountOption::DefaultPermissions,
    ];
    if config.get_allow_other() {
        options.push(fuser::MountOption::AllowOther);
    }
    options
}

/// Mount the archive filesystem at `mount_point` and serve it until unmounted.
///
/// Runs in the foreground on the calling thread; the session handles one
/// request at a time.
///
/// # Arguments
/// * `client` - Remote archive client used for metadata lookups and searches
/// * `primary_root` - Local directory checked first and used for new files
/// * `fallback_root` - Local directory checked when the primary root misses
/// * `mount_point` - Existing directory where the filesystem is mounted
pub fn mount_archive<C: ArchiveClient>(
    client: C,
    primary_root: &Path,
    fallback_root: &Path,
    mount_point: &Path,
    config: &MountConfig,
) -> Result<()> {
    let resolver = PathResolver::new(primary_root.to_path_buf(), fallback_root.to_path_buf());
    let adapter = ArchiveAdapter::new(client, resolver);
    let fs = IaFs::new(adapter, primary_root.to_path_buf());

    tracing::info!(
        "Mounting iafs at {} (primary={}, fallback={})",
        mount_point.display(),
        primary_root.display(),
        fallback_root.display()
    );

    fuser::mount2(fs, mount_point, &mount_options(config)).map_err(|e| {
        tracing::error!("FUSE mount error: {}", e);
        IafsError::Fuse(format!("Failed to mount at {}: {}", mount_point.display(), e))
    })?;

    tracing::info!("iafs unmounted from {}", mount_point.display());
    Ok(())
}
