//! # Configuration Loading
//!
//! The engine configuration is read from an optional TOML file:
//!
//! ```toml
//! [engine]
//! canon_version = "1.0"
//! strict = true
//! allow_bypass = false
//! cache_capacity = 1024
//! disabled_rules = ["symmetry_declaration"]
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use crate::cli::read_input_file;
use canon_core::{CanonError, EngineConfig};
use serde::Deserialize;
use std::path::Path;

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    engine: EngineConfig,
}

/// Values set on the command line.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub lenient: bool,
    pub canon_version: Option<String>,
}

/// Parse a TOML configuration document.
fn parse_config(contents: &str) -> Result<EngineConfig, CanonError> {
    let file: ConfigFile = toml::from_str(contents)
        .map_err(|e| CanonError::Config(format!("Invalid configuration: {}", e)))?;
    Ok(file.engine)
}

/// Load the configuration file (if any), apply overrides, and validate.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<EngineConfig, CanonError> {
    let mut config = match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {:?}", path);
            let bytes = read_input_file(path, MAX_CONFIG_FILE_SIZE)?;
            let contents = String::from_utf8(bytes)
                .map_err(|_| CanonError::Config("Configuration is not valid UTF-8".to_string()))?;
            parse_config(&contents)?
        }
        None => EngineConfig::default(),
    };

    if overrides.lenient {
        config.strict = false;
    }
    if let Some(version) = &overrides.canon_version {
        config.canon_version.clone_from(version);
    }

    config.validate()?;
    Ok(config)
}
