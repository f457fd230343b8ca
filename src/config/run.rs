//! Single-command Rosenbrock runs from configuration

use super::builder::build_optimizer;
use super::load::load_config;
use super::schema::OptimSpec;
use crate::error::Result;
use crate::optim::{drosenbrock, rosenbrock, Optimizer, StateDict};
use crate::Tensor;
use ndarray::arr1;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of a Rosenbrock run
#[derive(Debug, Clone)]
pub struct RosenbrockRun {
    pub start: [f32; 2],
    pub point: [f32; 2],
    pub initial_loss: f32,
    pub final_loss: f32,
    pub iterations: usize,
    /// Optimizer state after the last step
    pub state: StateDict,
}

impl RosenbrockRun {
    /// Distance from the final point to the minimum at (1, 1)
    pub fn distance_to_minimum(&self) -> f32 {
        let [x, y] = self.point;
        ((x - 1.0).powi(2) + (y - 1.0).powi(2)).sqrt()
    }
}

/// Minimise the Rosenbrock function with the optimizer described by `spec`
///
/// The point (x, y) is a single parameter, so parameter groups may only
/// reference position 0.
pub fn run_rosenbrock(spec: &OptimSpec) -> Result<RosenbrockRun> {
    let mut optimizer = build_optimizer(&spec.optimizer, 1)?;
    let start = spec.rosenbrock.start;
    let mut params = vec![Tensor::new(arr1(&start), true)];
    let initial_loss = rosenbrock(params[0].data());

    let mut final_loss = initial_loss;
    for i in 0..spec.rosenbrock.iterations {
        let loss = optimizer.step_with(&mut params, |p| {
            let point = p[0].data().clone();
            p[0].set_grad(drosenbrock(&point));
            rosenbrock(&point)
        })?;
        if i % 500 == 0 {
            debug!(step = i, loss, "rosenbrock");
        }
        final_loss = rosenbrock(params[0].data());
    }

    let data = params[0].data();
    let run = RosenbrockRun {
        start,
        point: [data[0], data[1]],
        initial_loss,
        final_loss,
        iterations: spec.rosenbrock.iterations,
        state: optimizer.state_dict(),
    };
    info!(
        x = run.point[0],
        y = run.point[1],
        loss = run.final_loss,
        "rosenbrock run finished"
    );
    Ok(run)
}

/// Load a YAML config and run it
pub fn rosenbrock_from_yaml<P: AsRef<Path>>(config_path: P) -> Result<RosenbrockRun> {
    let spec = load_config(config_path)?;
    run_rosenbrock(&spec)
}
