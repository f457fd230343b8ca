//! Tape-free, closure-chained autograd engine
//!
//! Each result holds a backward op that pushes its gradient into its inputs
//! and then runs their ops in turn. Graphs must be trees: an intermediate
//! result feeding two consumers is back-propagated twice, so write
//! `scale(&y, 2.0)` rather than `add(&y, &y)`.

mod backward;
mod ops;
mod sparse;
mod tensor;


pub use backward::BackwardOp;
pub use ops::*;
pub use sparse::SparseTensor;
pub use tensor::{GradCell, Tensor};

/// Perform backward pass on a tensor
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        // Initialize with ones for scalar loss
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
