//! Build optimizers from configuration

use super::schema::OptimizerSpec;
use crate::error::{Error, Result};
use crate::optim::SGD;

/// Build an optimizer over `num_params` parameters
///
/// Without explicit groups every parameter goes into a single group. With
/// groups, every referenced position must be below `num_params`; positions
/// not listed in any group are left untouched by the optimizer.
pub fn build_optimizer(spec: &OptimizerSpec, num_params: usize) -> Result<SGD> {
    match spec.name.to_lowercase().as_str() {
        "sgd" => {
            let defaults = spec.defaults();
            if spec.param_groups.is_empty() {
                return SGD::with_params(num_params, defaults);
            }

            if let Some(&bad) = spec
                .param_groups
                .iter()
                .flat_map(|g| g.params.iter())
                .find(|&&p| p >= num_params)
            {
                return Err(Error::ConfigError(format!(
                    "Parameter group references parameter {bad}, but only {num_params} exist"
                )));
            }

            SGD::new(spec.param_groups.clone(), defaults)
        }
        name => Err(Error::ConfigError(format!(
            "Unknown optimizer: {name}. Supported: sgd"
        ))),
    }
}
