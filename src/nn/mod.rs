//! Neural network layers
//!
//! Layers operate on flattened 1D tensors; shapes such as `N × in` or
//! `N × C × H × W` are carried by the layer configuration.

mod activation;
mod dropout;
mod linear;
mod loss;
mod module;
mod net;

pub use activation::{elu, relu, ELU, ReLU};
pub use dropout::{Dropout, Dropout2d};
pub use linear::Linear;
pub use loss::{BCELoss, LossFn, NLLLoss, Reduction};
pub use module::Module;
pub use net::{check_net, random_batch, Net, CLASSES, HIDDEN_FEATURES, INPUT_FEATURES};
