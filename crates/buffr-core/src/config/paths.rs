//! Default locations of buffr files

use std::path::PathBuf;

/// File name of the engine state saved on exit
pub const STATE_FILE_NAME: &str = "state.bin";

/// Directory holding buffr config and state
///
/// Returns: `<platform config dir>/buffr` (e.g. `~/.config/buffr`), or
/// `./buffr` when the platform has no config dir.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("buffr")
}

/// Path of a file inside [`config_dir`]
pub fn default_config_path(filename: &str) -> PathBuf {
    config_dir().join(filename)
}

/// Default path of the saved engine state
pub fn default_state_path() -> PathBuf {
    default_config_path(STATE_FILE_NAME)
}
