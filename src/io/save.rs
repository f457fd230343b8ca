//! State saving

use super::format::{SaveConfig, StateFormat};
use crate::optim::StateDict;
use crate::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Serialize a state dict to a string
pub fn state_dict_to_string(state: &StateDict, config: &SaveConfig) -> Result<String> {
    match config.format {
        StateFormat::Json => {
            if config.pretty {
                serde_json::to_string_pretty(state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))
            } else {
                serde_json::to_string(state)
                    .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))
            }
        }
        StateFormat::Yaml => serde_yaml::to_string(state)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}"))),
    }
}

/// Save an optimizer state dict to a file
///
/// # Example
///
/// ```no_run
/// use aprendiz::io::{save_state_dict, SaveConfig, StateFormat};
/// use aprendiz::optim::{SgdOptions, SGD};
///
/// let optimizer = SGD::with_params(2, SgdOptions::new(0.1).momentum(0.9)).unwrap();
/// let config = SaveConfig::new(StateFormat::Json);
///
/// save_state_dict(&optimizer.state_dict(), "state.json", &config).unwrap();
/// ```
pub fn save_state_dict(state: &StateDict, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();
    let data = state_dict_to_string(state, config)?;

    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;

    debug!(
        path = %path.display(),
        params = state.num_params(),
        "saved optimizer state"
    );
    Ok(())
}
