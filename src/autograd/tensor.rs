//! Tensor type with gradient tracking

use super::{BackwardOp, SparseTensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared gradient slot, written by backward operations
pub type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Tensor with automatic differentiation support
///
/// Clones share the gradient cells, so a gradient written through any clone
/// (for example by a backward op holding one) is visible from all of them.
/// The data itself is owned per clone.
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: GradCell,
    sparse_grad: Rc<RefCell<Option<SparseTensor>>>,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a new tensor with data
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            sparse_grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    /// Create a tensor filled with ones
    pub fn ones(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::ones(size), requires_grad)
    }

    /// Detached copy: same data, fresh gradient cells, no graph history
    pub fn detach(&self) -> Self {
        Self::new(self.data.clone(), self.requires_grad)
    }

    /// Get reference to data
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Get mutable reference to data
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Get dense gradient (if computed)
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Set dense gradient, discarding any sparse gradient
    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.sparse_grad.borrow_mut() = None;
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Accumulate gradient (for when tensor is used multiple times)
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing = &*existing + &grad;
        } else {
            *grad_ref = Some(grad);
        }
    }

    /// Get sparse gradient (if one was assigned)
    pub fn sparse_grad(&self) -> Option<SparseTensor> {
        self.sparse_grad.borrow().clone()
    }

    /// Replace the gradient with a sparse one, discarding any dense gradient
    pub fn set_sparse_grad(&self, grad: SparseTensor) {
        *self.grad.borrow_mut() = None;
        *self.sparse_grad.borrow_mut() = Some(grad);
    }

    /// Zero out gradient (dense and sparse)
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
        *self.sparse_grad.borrow_mut() = None;
    }

    /// Check if requires gradient
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Get reference to gradient cell (for backward operations)
    pub fn grad_cell(&self) -> GradCell {
        self.grad.clone()
    }

    /// Set backward operation
    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Get backward operation
    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Euclidean distance between the data of two tensors
    pub fn dist(&self, other: &Tensor) -> f32 {
        assert_eq!(self.len(), other.len(), "dist requires equal lengths");
        let diff = &self.data - &other.data;
        diff.mapv(|d| d * d).sum().sqrt()
    }

    /// Get size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.data)
            .field("grad", &self.grad.borrow())
            .field("sparse_grad", &self.sparse_grad.borrow())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
