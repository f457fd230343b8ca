//! Serializable optimizer state

use super::SgdOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of an optimizer: hyperparameters per group and per-parameter buffers
///
/// Parameters are identified by packed ids: ids are assigned in order of
/// appearance across groups, so the first parameter of group 0 is id 0 and
/// so on. `state` is keyed by those ids. Loading pairs saved ids with the
/// receiving optimizer's parameters group by group, position by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDict {
    pub state: BTreeMap<usize, ParamState>,
    pub param_groups: Vec<GroupState>,
}

/// Per-parameter optimizer buffers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum_buffer: Option<Vec<f32>>,
}

/// A bound parameter group: resolved hyperparameters plus its parameter ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub options: SgdOptions,
    pub params: Vec<usize>,
}

impl StateDict {
    /// Total number of parameters across groups
    pub fn num_params(&self) -> usize {
        self.param_groups.iter().map(|g| g.params.len()).sum()
    }
}
