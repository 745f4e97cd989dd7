//! Config and state file I/O
//!
//! YAML configs never fail to load: a missing or broken file yields the
//! type's defaults with a warning, so a bad edit can't keep the host from
//! starting. State files are opaque bytes and report errors to the caller.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load a YAML config, falling back to `T::default()`
///
/// ```ignore
/// let config: HostConfig = load_config(&default_config_path("host.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return T::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_config: Failed to read {:?}: {}, using defaults", path, e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&contents) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("load_config: Failed to parse {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save a config as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    log::info!("save_config: Saving to {:?}", path);
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    write_with_parents(path, yaml.as_bytes())
}

/// Read a saved engine state file
pub fn read_state_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read state file: {:?}", path))
}

/// Write an engine state file, creating parent directories
pub fn write_state_file(path: &Path, bytes: &[u8]) -> Result<()> {
    log::info!("write_state_file: {} bytes to {:?}", bytes.len(), path);
    write_with_parents(path, bytes)
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write file: {:?}", path))
}
