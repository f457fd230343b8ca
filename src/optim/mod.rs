//! Optimizers for training neural networks

mod benchmark;
mod optimizer;
mod param_group;
pub mod reference;
mod sgd;
mod state;


pub use benchmark::{drosenbrock, rosenbrock};
pub use optimizer::Optimizer;
pub use param_group::{ParamGroup, SgdOptions};
pub use sgd::SGD;
pub use state::{GroupState, ParamState, StateDict};
