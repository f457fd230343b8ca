//! State loading

use super::format::StateFormat;
use crate::optim::StateDict;
use crate::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parse a state dict from a string in the given format
pub fn state_dict_from_str(content: &str, format: StateFormat) -> Result<StateDict> {
    match format {
        StateFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
        StateFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
    }
}

/// Load an optimizer state dict from a file
///
/// The format is detected from the file extension.
pub fn load_state_dict(path: impl AsRef<Path>) -> Result<StateDict> {
    let path = path.as_ref();
    let format = StateFormat::from_path(path)?;

    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;

    state_dict_from_str(&content, format)
}
