//! Configuration files and persisted state
//!
//! - Generic YAML config loading/saving (falls back to defaults on error)
//! - Binary engine-state files (see [`crate::state`] for the layout)
//! - Default locations under the platform config dir
//!
//! ```ignore
//! use buffr_core::config::{default_config_path, load_config, save_config};
//!
//! let path = default_config_path("host.yaml");
//! let config: HostConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;

pub use io::{load_config, read_state_file, save_config, write_state_file};
pub use paths::{config_dir, default_config_path, default_state_path, STATE_FILE_NAME};
