use crate::cli::validate_mount_args;
use crate::client::HttpArchiveClient;
use crate::config::load_config;
use crate::error::Result;
use crate::overlay::mount_archive;

/// Run `iafs mount`, blocking until the filesystem is unmounted.
pub fn run_mount(primary_root: &str, fallback_root: &str, mount_point: &str) -> Result<i32> {
    let paths = validate_mount_args(primary_root, fallback_root, mount_point)?;
    let config = load_config()?;
    let client = HttpArchiveClient::new(&config.archive)?;

    if !paths.fallback_root.exists() {
        tracing::warn!(
            "Fallback root {} does not exist; only the primary root will be used",
            paths.fallback_root.display()
        );
    }

    mount_archive(
        client,
        &paths.primary_root,
        &paths.fallback_root,
        &paths.mount_point,
        &config.mount,
    )?;
    Ok(0)
}
