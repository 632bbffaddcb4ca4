use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::cli::MetadataArgs;
use crate::config::expand_tilde;
use crate::error::{IafsError, Result};

pub const METADATA_USAGE: &str = "\
usage:
    iafs metadata <identifier>... [--modify=<key:value>...] [--target=<target>]
                                  [--priority=<priority>]
    iafs metadata <identifier>... [--append=<key:value>...] [--priority=<priority>]
    iafs metadata <identifier>... [--exists | --formats]
    iafs metadata --spreadsheet=<metadata.csv> [--priority=<priority>]
                                               [--modify=<key:value>...]
    iafs metadata --help";

/// Turn `key:value` tokens into a field mapping.
///
/// Values are split on the first `:`. A key given more than once collects its
/// distinct values into a list, in the order given.
pub fn parse_metadata_tokens(tokens: &[String]) -> Result<Map<String, Value>> {
    let mut collected: Vec<(String, Vec<String>)> = Vec::new();

    for token in tokens {
        let Some((key, value)) = token.split_once(':') else {
            return Err(IafsError::Validation(format!(
                "Invalid metadata '{}': expected <key:value>",
                token
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(IafsError::Validation(format!(
                "Invalid metadata '{}': key cannot be empty",
                token
            )));
        }

        match collected.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
            None => collected.push((key.to_string(), vec![value.to_string()])),
        }
    }

    Ok(collected
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect())
}

/// Check metadata arguments before anything is sent to the archive.
pub fn validate_metadata_args(args: &MetadataArgs) -> Result<()> {
    if args.identifiers.is_empty() && args.spreadsheet.is_none() {
        return Err(IafsError::Validation(
            "At least one <identifier> is required".to_string(),
        ));
    }

    if let Some(identifier) = args.identifiers.iter().find(|i| i.trim().is_empty()) {
        return Err(IafsError::Validation(format!(
            "Invalid identifier {:?}: cannot be empty",
            identifier
        )));
    }

    if let Some(path) = &args.spreadsheet {
        if !path.exists() {
            return Err(IafsError::Validation(format!(
                "{} should be a readable file or directory.",
                path.display()
            )));
        }
    }

    parse_metadata_tokens(args.edit_tokens())?;
    Ok(())
}

/// Local paths of a mount invocation, with `~` expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPaths {
    pub primary_root: PathBuf,
    pub fallback_root: PathBuf,
    pub mount_point: PathBuf,
}

fn require_dir(label: &str, path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(IafsError::Validation(format!(
            "{} {} is not an existing directory",
            label,
            path.display()
        )));
    }
    Ok(())
}

pub fn validate_mount_args(
    primary_root: &str,
    fallback_root: &str,
    mount_point: &str,
) -> Result<MountPaths> {
    let paths = MountPaths {
        primary_root: expand_tilde(primary_root),
        fallback_root: expand_tilde(fallback_root),
        mount_point: expand_tilde(mount_point),
    };

    require_dir("Primary root", &paths.primary_root)?;
    require_dir("Mount point", &paths.mount_point)?;

    if paths.mount_point == paths.primary_root || paths.mount_point == paths.fallback_root {
        return Err(IafsError::Validation(
            "Mount point must differ from both roots".to_string(),
        ));
    }

    Ok(paths)
}
