//! Configuration validation

use super::schema::OptimSpec;
use std::collections::BTreeSet;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid optimizer: {0} (must be: sgd)")]
    InvalidOptimizer(String),

    /// `group` is `None` for the top-level defaults
    #[error("Invalid hyperparameters ({}): {source}", scope(.group))]
    InvalidHyperparameters {
        group: Option<usize>,
        #[source]
        source: crate::Error,
    },

    #[error("Parameter group {0} is empty")]
    EmptyParamGroup(usize),

    #[error("Parameter {0} appears in more than one parameter group")]
    DuplicateParam(usize),

    #[error("Invalid iterations: {0} (must be > 0)")]
    InvalidIterations(usize),
}

fn scope(group: &Option<usize>) -> String {
    match group {
        Some(i) => format!("group {i}"),
        None => "defaults".to_string(),
    }
}

/// Validate an optimizer specification
///
/// Checks:
/// - The optimizer name is known
/// - Hyperparameters of the defaults and every group are in range
/// - Groups are non-empty and disjoint
pub fn validate_config(spec: &OptimSpec) -> Result<(), ValidationError> {
    let optimizer = &spec.optimizer;

    if !optimizer.name.eq_ignore_ascii_case("sgd") {
        return Err(ValidationError::InvalidOptimizer(optimizer.name.clone()));
    }

    // Same rules the optimizer applies when binding groups
    let defaults = optimizer.defaults();
    defaults
        .validate()
        .map_err(|source| ValidationError::InvalidHyperparameters {
            group: None,
            source,
        })?;
    for (i, group) in optimizer.param_groups.iter().enumerate() {
        group.resolve(&defaults).validate().map_err(|source| {
            ValidationError::InvalidHyperparameters {
                group: Some(i),
                source,
            }
        })?;
    }

    let mut seen = BTreeSet::new();
    for (i, group) in optimizer.param_groups.iter().enumerate() {
        if group.params.is_empty() {
            return Err(ValidationError::EmptyParamGroup(i));
        }
        for &param in &group.params {
            if !seen.insert(param) {
                return Err(ValidationError::DuplicateParam(param));
            }
        }
    }

    if spec.rosenbrock.iterations == 0 {
        return Err(ValidationError::InvalidIterations(0));
    }

    Ok(())
}
