//! Declarative YAML configuration
//!
//! # Example
//!
//! ```yaml
//! optimizer:
//!   name: sgd
//!   lr: 0.001
//!   momentum: 0.9
//!   param_groups:
//!     - params: [0]
//!     - params: [1]
//!       lr: 0.01
//!
//! rosenbrock:
//!   start: [1.5, 1.5]
//!   iterations: 2000
//! ```

mod builder;
mod cli;
mod load;
mod run;
mod schema;
mod validate;



pub use builder::build_optimizer;
pub use cli::{
    apply_overrides, parse_args, CheckNetArgs, Cli, Command, RosenbrockArgs, ValidateArgs,
};
pub use load::{load_config, parse_config};
pub use run::{rosenbrock_from_yaml, run_rosenbrock, RosenbrockRun};
pub use schema::{OptimSpec, OptimizerSpec, RosenbrockSpec};
pub use validate::{validate_config, ValidationError};
