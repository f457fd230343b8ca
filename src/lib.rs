//! # Aprendiz: layers and SGD on a small autograd engine
//!
//! Aprendiz provides a tape-free, closure-chained autograd engine over 1D
//! tensors, a handful of hand-written layers, and an SGD optimizer with
//! parameter groups, sparse gradients and serializable state.
//!
//! ## Architecture
//!
//! - **autograd**: Tensors, sparse gradients and differentiable ops
//! - **nn**: Linear, ReLU, ELU, Dropout, Dropout2d, BCE/NLL losses, `Net`
//! - **optim**: SGD, parameter groups, state dicts, the reference SGD
//! - **config**: Declarative YAML optimizer configuration and CLI
//! - **io**: Optimizer state saving and loading (JSON, YAML formats)

pub mod autograd;
pub mod config;
pub mod io;
pub mod nn;
pub mod optim;

pub mod error;

// Re-export commonly used types
pub use autograd::{backward, Tensor};
pub use error::{Error, Result};
