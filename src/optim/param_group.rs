//! SGD hyperparameters and parameter groups

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hyperparameters of [`SGD`](super::SGD)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdOptions {
    /// Learning rate
    pub lr: f32,
    /// Momentum factor
    #[serde(default)]
    pub momentum: f32,
    /// Dampening applied to the gradient when folding it into momentum
    #[serde(default)]
    pub dampening: f32,
    /// L2 penalty added to the gradient
    #[serde(default)]
    pub weight_decay: f32,
    /// Use Nesterov momentum
    #[serde(default)]
    pub nesterov: bool,
}

impl SgdOptions {
    /// Plain SGD with the given learning rate
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            momentum: 0.0,
            dampening: 0.0,
            weight_decay: 0.0,
            nesterov: false,
        }
    }

    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn dampening(mut self, dampening: f32) -> Self {
        self.dampening = dampening;
        self
    }

    pub fn weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    /// Check value ranges
    ///
    /// Nesterov momentum needs a positive momentum and zero dampening.
    pub fn validate(&self) -> Result<()> {
        if !self.lr.is_finite() || self.lr < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "invalid learning rate: {}",
                self.lr
            )));
        }
        if !self.momentum.is_finite() || self.momentum < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "invalid momentum value: {}",
                self.momentum
            )));
        }
        if !self.dampening.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "invalid dampening value: {}",
                self.dampening
            )));
        }
        if !self.weight_decay.is_finite() || self.weight_decay < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "invalid weight_decay value: {}",
                self.weight_decay
            )));
        }
        if self.nesterov && (self.momentum <= 0.0 || self.dampening != 0.0) {
            return Err(Error::InvalidParameter(
                "Nesterov momentum requires a momentum and zero dampening".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SgdOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys in alphabetical order
        writeln!(f, "    dampening: {}", self.dampening)?;
        writeln!(f, "    lr: {}", self.lr)?;
        writeln!(f, "    momentum: {}", self.momentum)?;
        writeln!(f, "    nesterov: {}", self.nesterov)?;
        writeln!(f, "    weight_decay: {}", self.weight_decay)
    }
}

/// A set of parameters (by position) with optional per-group overrides
///
/// Unset fields fall back to the optimizer defaults when the group is bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
    pub params: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lr: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dampening: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_decay: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nesterov: Option<bool>,
}

impl ParamGroup {
    /// Group over the given parameter positions
    pub fn new(params: Vec<usize>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn lr(mut self, lr: f32) -> Self {
        self.lr = Some(lr);
        self
    }

    pub fn momentum(mut self, momentum: f32) -> Self {
        self.momentum = Some(momentum);
        self
    }

    pub fn dampening(mut self, dampening: f32) -> Self {
        self.dampening = Some(dampening);
        self
    }

    pub fn weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = Some(weight_decay);
        self
    }

    pub fn nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = Some(nesterov);
        self
    }

    /// Fill unset fields from `defaults`
    pub fn resolve(&self, defaults: &SgdOptions) -> SgdOptions {
        SgdOptions {
            lr: self.lr.unwrap_or(defaults.lr),
            momentum: self.momentum.unwrap_or(defaults.momentum),
            dampening: self.dampening.unwrap_or(defaults.dampening),
            weight_decay: self.weight_decay.unwrap_or(defaults.weight_decay),
            nesterov: self.nesterov.unwrap_or(defaults.nesterov),
        }
    }
}

impl From<Vec<usize>> for ParamGroup {
    fn from(params: Vec<usize>) -> Self {
        Self::new(params)
    }
}
