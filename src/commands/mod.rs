//! Subcommand implementations

pub mod monitor;
pub mod validate;

use anyhow::{Context, Result};
use breakout_tracker::Config;

/// Config from `path`, or defaults when no file is given.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::from_file(path).with_context(|| format!("Failed to load config from {}", path))
        }
        None => Ok(Config::default()),
    }
}
