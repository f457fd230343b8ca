//! YAML schema definitions for optimizer configuration

use crate::optim::{ParamGroup, SgdOptions};
use serde::{Deserialize, Serialize};

/// Complete run specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimSpec {
    /// Optimizer configuration
    pub optimizer: OptimizerSpec,

    /// Rosenbrock run settings
    #[serde(default)]
    pub rosenbrock: RosenbrockSpec,
}

/// Optimizer hyperparameters and parameter groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSpec {
    /// Optimizer name; only "sgd" is supported
    pub name: String,

    /// Default learning rate
    pub lr: f32,

    #[serde(default)]
    pub momentum: f32,

    #[serde(default)]
    pub dampening: f32,

    #[serde(default)]
    pub weight_decay: f32,

    #[serde(default)]
    pub nesterov: bool,

    /// Parameter groups; empty means all parameters in one group
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub param_groups: Vec<ParamGroup>,
}

impl OptimizerSpec {
    /// Default hyperparameters shared by all groups
    pub fn defaults(&self) -> SgdOptions {
        SgdOptions {
            lr: self.lr,
            momentum: self.momentum,
            dampening: self.dampening,
            weight_decay: self.weight_decay,
            nesterov: self.nesterov,
        }
    }
}

/// Settings for the Rosenbrock benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RosenbrockSpec {
    /// Starting point
    #[serde(default = "default_start")]
    pub start: [f32; 2],

    /// Number of optimizer steps
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

fn default_start() -> [f32; 2] {
    [1.5, 1.5]
}

fn default_iterations() -> usize {
    2000
}

impl Default for RosenbrockSpec {
    fn default() -> Self {
        Self {
            start: default_start(),
            iterations: default_iterations(),
        }
    }
}
