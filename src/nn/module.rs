//! Layer trait

use crate::{Result, Tensor};

/// A differentiable layer with optional trainable parameters
///
/// Layers start in training mode.
pub trait Module {
    /// Apply the layer
    fn forward(&mut self, input: &Tensor) -> Result<Tensor>;

    /// Trainable parameters, in a stable order
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// Mutable trainable parameters, in the same order as `parameters`
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Switch between training and evaluation behaviour
    fn set_training(&mut self, training: bool);

    fn is_training(&self) -> bool;

    fn train(&mut self) {
        self.set_training(true);
    }

    fn eval(&mut self) {
        self.set_training(false);
    }

    /// Total number of scalar parameters
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}
