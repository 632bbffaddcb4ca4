use crate::error::{IafsError, Result};
use serde::{Deserialize, Serialize};

/// Connection settings for the remote archive service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Number of identifiers requested from a single search. Results past this
    /// count are not fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_rows: Option<u32>,
}

impl ArchiveConfig {
    pub fn get_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(super::default_base_url)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or_else(super::default_timeout_secs)
    }

    pub fn get_search_rows(&self) -> u32 {
        self.search_rows.unwrap_or_else(super::default_search_rows)
    }

    /// Returns the (access, secret) pair when both halves are configured.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_other: Option<bool>,
}

impl MountConfig {
    pub fn get_fs_name(&self) -> String {
        self.fs_name.clone().unwrap_or_else(super::default_fs_name)
    }

    pub fn get_allow_other(&self) -> bool {
        self.allow_other.unwrap_or_else(super::default_allow_other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub mount: MountConfig,
}

pub fn validate_config(config: &Config) -> Result<()> {
    let base_url = config.archive.get_base_url();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(IafsError::Config(format!(
            "Invalid base_url '{}': must start with http:// or https://",
            base_url
        )));
    }

    if config.archive.get_search_rows() == 0 {
        return Err(IafsError::Config(
            "search_rows must be greater than zero".to_string(),
        ));
    }

    if config.archive.access_key.is_some() != config.archive.secret_key.is_some() {
        tracing::warn!(
            "Only one of access_key/secret_key is set; \
             metadata writes will be sent without credentials"
        );
    }

    Ok(())
}
