//! Backward operation trait

/// Pushes a result's gradient into its inputs, then chains into their ops
pub trait BackwardOp {
    /// Perform backward pass
    fn backward(&self);
}
