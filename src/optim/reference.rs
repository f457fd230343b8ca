//! Functional SGD used as a cross-check for [`SGD`](super::SGD)
//!
//! The optimizer is a plain function over a flat parameter vector: the caller
//! owns the hyperparameters and the mutable state, and passes an `opfunc`
//! returning `(loss, gradient)` at the current point.

use crate::{Error, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Hyperparameters of the functional SGD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdConfig {
    pub learning_rate: f32,
    /// Learning rate after n evaluations is `learning_rate / (1 + n * decay)`
    #[serde(default)]
    pub learning_rate_decay: f32,
    #[serde(default)]
    pub weight_decay: f32,
    #[serde(default)]
    pub momentum: f32,
    /// Defaults to `momentum` when unset
    #[serde(default)]
    pub dampening: Option<f32>,
    #[serde(default)]
    pub nesterov: bool,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            learning_rate_decay: 0.0,
            weight_decay: 0.0,
            momentum: 0.0,
            dampening: None,
            nesterov: false,
        }
    }
}

impl SgdConfig {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            ..Default::default()
        }
    }

    /// Effective dampening
    pub fn dampening(&self) -> f32 {
        self.dampening.unwrap_or(self.momentum)
    }
}

/// State carried between calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SgdState {
    pub eval_counter: u64,
    pub dfdx: Option<Array1<f32>>,
}

/// One SGD step on `x`, returning the loss `opfunc` reported before the update
pub fn sgd<F>(opfunc: F, x: &mut Array1<f32>, config: &SgdConfig, state: &mut SgdState) -> Result<f32>
where
    F: FnOnce(&Array1<f32>) -> (f32, Array1<f32>),
{
    let lr = config.learning_rate;
    let lrd = config.learning_rate_decay;
    let wd = config.weight_decay;
    let mom = config.momentum;
    let damp = config.dampening();

    if config.nesterov && (mom <= 0.0 || damp != 0.0) {
        return Err(Error::InvalidParameter(
            "Nesterov momentum requires a momentum and zero dampening".to_string(),
        ));
    }

    let (fx, mut dfdx) = opfunc(x);
    if dfdx.len() != x.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![x.len()],
            got: vec![dfdx.len()],
        });
    }

    if wd != 0.0 {
        dfdx = &dfdx + &(&*x * wd);
    }

    if mom != 0.0 {
        let buf = match state.dfdx.take() {
            Some(buf) => buf * mom + &(&dfdx * (1.0 - damp)),
            None => dfdx.clone(),
        };
        if config.nesterov {
            dfdx = &dfdx + &(&buf * mom);
        } else {
            dfdx = buf.clone();
        }
        state.dfdx = Some(buf);
    }

    let clr = lr / (1.0 + state.eval_counter as f32 * lrd);
    *x = &*x - &(&dfdx * clr);

    state.eval_counter += 1;
    Ok(fx)
}
