//! Loading optimizer specs from YAML files

use super::schema::OptimSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse and validate a spec from a YAML string
pub fn parse_config(yaml: &str) -> Result<OptimSpec> {
    let spec: OptimSpec = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {}", e)))?;

    validate_config(&spec).map_err(|e| Error::ConfigError(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Load an optimizer spec from a YAML file
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<OptimSpec> {
    let yaml_content = fs::read_to_string(config_path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            config_path.as_ref().display(),
            e
        ))
    })?;

    let spec = parse_config(&yaml_content)?;
    debug!(
        path = %config_path.as_ref().display(),
        groups = spec.optimizer.param_groups.len(),
        "loaded optimizer config"
    );
    Ok(spec)
}
