//! Optimizer trait

use crate::{Result, Tensor};
use std::borrow::{Borrow, BorrowMut};

/// Trait for optimization algorithms
///
/// Parameters are passed to every call as a slice; an optimizer refers to
/// them by their position in that slice. Both `&mut [Tensor]` and
/// `&mut [&mut Tensor]` are accepted.
pub trait Optimizer {
    /// Perform a single optimization step using the gradients already stored
    /// on the parameters
    fn step<P: BorrowMut<Tensor>>(&mut self, params: &mut [P]) -> Result<()>;

    /// Clear gradients, evaluate `closure` to recompute loss and gradients,
    /// then step. Returns the loss reported by the closure.
    fn step_with<P, F>(&mut self, params: &mut [P], mut closure: F) -> Result<f32>
    where
        P: BorrowMut<Tensor>,
        F: FnMut(&mut [P]) -> f32,
    {
        self.zero_grad(params);
        let loss = closure(params);
        self.step(params)?;
        Ok(loss)
    }

    /// Zero out all gradients
    fn zero_grad<P: Borrow<Tensor>>(&self, params: &[P]) {
        for param in params {
            let param: &Tensor = param.borrow();
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}
