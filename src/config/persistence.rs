use crate::error::{IafsError, Result};

use crate::config::paths::*;
use crate::config::schema::*;

/// Load `config.toml` from the config directory, falling back to defaults when
/// the file does not exist. Credentials from `IA_ACCESS_KEY` / `IA_SECRET_KEY`
/// take precedence over the file.
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;

    let mut config = if config_path.exists() {
        let toml_content = std::fs::read_to_string(&config_path)
            .map_err(|e| IafsError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&toml_content)
            .map_err(|e| IafsError::Config(format!("Failed to parse config: {}", e)))?
    } else {
        tracing::debug!(
            "No config file at {}, using defaults",
            config_path.display()
        );
        Config::default()
    };

    apply_env_overrides(&mut config);
    validate_config(&config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(access) = std::env::var("IA_ACCESS_KEY") {
        config.archive.access_key = Some(access);
    }
    if let Ok(secret) = std::env::var("IA_SECRET_KEY") {
        config.archive.secret_key = Some(secret);
    }
}
