//! CLI command implementations.

pub mod check;
pub mod migrate;
pub mod serve;

use anyhow::Context;
use campus_core::CampusConfig;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "campus.yaml";

/// Load the configuration from `path`, or from `./campus.yaml` when no path is
/// given. With neither, the built-in defaults apply.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<CampusConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
        None => return Ok(CampusConfig::default()),
    };
    CampusConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
