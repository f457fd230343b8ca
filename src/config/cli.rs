//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! aprendiz rosenbrock sgd.yaml
//! aprendiz rosenbrock sgd.yaml --iterations 500 --save-state state.json
//! aprendiz validate sgd.yaml
//! aprendiz check-net --seed 7
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aprendiz: hand-written layers and SGD on a small autograd engine
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "aprendiz")]
#[command(version)]
#[command(about = "Neural network layers and SGD with a minimal autograd engine")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Minimise the Rosenbrock function with an optimizer from YAML
    Rosenbrock(RosenbrockArgs),

    /// Validate an optimizer configuration file
    Validate(ValidateArgs),

    /// Run one training step of the MNIST-shaped network on random data
    CheckNet(CheckNetArgs),
}

/// Arguments for the rosenbrock command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RosenbrockArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override number of iterations
    #[arg(short, long)]
    pub iterations: Option<usize>,

    /// Write the final optimizer state (JSON or YAML by extension)
    #[arg(long, value_name = "PATH")]
    pub save_state: Option<PathBuf>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the check-net command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct CheckNetArgs {
    /// Random seed for weights, dropout and the input batch
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// Learning rate of the training step
    #[arg(long, default_value = "0.1")]
    pub lr: f32,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to an OptimSpec
pub fn apply_overrides(spec: &mut super::OptimSpec, args: &RosenbrockArgs) {
    if let Some(iterations) = args.iterations {
        spec.rosenbrock.iterations = iterations;
    }
}
