pub mod schema;

pub use schema::{FinchatConfig, Secret};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Name of the config file inside the finchat home directory.
pub const CONFIG_FILE: &str = "finchat.toml";

/// Newest config layout this build understands.
pub const CONFIG_VERSION: u32 = 1;

/// Default finchat home directory (~/.finchat).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".finchat"))
        .unwrap_or_else(|| PathBuf::from(".finchat"))
}

/// Resolve a path that may start with `~`.
pub fn resolve_home(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<FinchatConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read finchat config file")?;
        let config: FinchatConfig =
            toml::from_str(&contents).context("Failed to parse finchat config (TOML)")?;
        if config.version > CONFIG_VERSION {
            bail!(
                "Config version {} is newer than supported version {}",
                config.version,
                CONFIG_VERSION
            );
        }
        Ok(config)
    } else {
        Ok(FinchatConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &FinchatConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}
