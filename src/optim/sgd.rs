//! Stochastic Gradient Descent optimizer

use super::{GroupState, Optimizer, ParamGroup, ParamState, SgdOptions, StateDict};
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use std::borrow::{Borrow, BorrowMut};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace};

/// SGD with momentum, dampening, weight decay, and Nesterov momentum
///
/// For a parameter `p` with gradient `g`, each step computes
///
/// ```text
/// d   = g + weight_decay * p
/// buf = d                                           (first step)
/// buf = momentum * buf + (1 - dampening) * d        (later steps)
/// d   = d + momentum * buf    if nesterov, else buf (when momentum != 0)
/// p   = p - lr * d
/// ```
///
/// Sparse gradients are supported for plain SGD only (no momentum, no
/// weight decay). They are coalesced before being applied.
///
/// # Example
///
/// ```
/// use aprendiz::optim::{Optimizer, ParamGroup, SgdOptions, SGD};
/// use aprendiz::Tensor;
///
/// let mut params = vec![
///     Tensor::from_vec(vec![1.0, 2.0], true),
///     Tensor::from_vec(vec![0.5], true),
/// ];
/// let groups = vec![ParamGroup::new(vec![0]), ParamGroup::new(vec![1]).lr(0.1)];
/// let mut sgd = SGD::new(groups, SgdOptions::new(0.01)).unwrap();
///
/// params[0].set_grad(ndarray::arr1(&[1.0, 1.0]));
/// params[1].set_grad(ndarray::arr1(&[1.0]));
/// sgd.step(&mut params).unwrap();
///
/// assert!((params[0].data()[0] - 0.99).abs() < 1e-6);
/// assert!((params[1].data()[0] - 0.4).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SGD {
    defaults: SgdOptions,
    groups: Vec<GroupState>,
    momentum_buffers: BTreeMap<usize, Array1<f32>>,
}

impl SGD {
    /// Bind parameter groups with default hyperparameters
    ///
    /// Groups must be non-empty and must not share parameters.
    pub fn new(groups: Vec<ParamGroup>, defaults: SgdOptions) -> Result<Self> {
        defaults.validate()?;
        if groups.is_empty() {
            return Err(Error::InvalidParameter(
                "optimizer got an empty parameter list".to_string(),
            ));
        }

        let mut sgd = Self {
            defaults,
            groups: Vec::with_capacity(groups.len()),
            momentum_buffers: BTreeMap::new(),
        };
        for group in groups {
            sgd.add_param_group(group)?;
        }

        debug!(
            groups = sgd.groups.len(),
            lr = defaults.lr,
            momentum = defaults.momentum,
            "SGD constructed"
        );
        Ok(sgd)
    }

    /// Bind parameters `0..num_params` as a single group
    pub fn with_params(num_params: usize, options: SgdOptions) -> Result<Self> {
        Self::new(vec![ParamGroup::new((0..num_params).collect())], options)
    }

    /// Add another parameter group, resolving unset options from the defaults
    pub fn add_param_group(&mut self, group: ParamGroup) -> Result<()> {
        if group.params.is_empty() {
            return Err(Error::InvalidParameter(
                "parameter group has no parameters".to_string(),
            ));
        }

        let mut seen: BTreeSet<usize> = self
            .groups
            .iter()
            .flat_map(|g| g.params.iter().copied())
            .collect();
        for &idx in &group.params {
            if !seen.insert(idx) {
                return Err(Error::InvalidParameter(format!(
                    "parameter {idx} appears in more than one parameter group"
                )));
            }
        }

        let options = group.resolve(&self.defaults);
        options.validate()?;
        self.groups.push(GroupState {
            options,
            params: group.params,
        });
        Ok(())
    }

    /// Bound groups with their resolved options
    pub fn param_groups(&self) -> &[GroupState] {
        &self.groups
    }

    /// Momentum buffer of a parameter, if one has been created
    pub fn momentum_buffer(&self, param: usize) -> Option<&Array1<f32>> {
        self.momentum_buffers.get(&param)
    }

    /// Snapshot of hyperparameters and buffers, using packed ids
    pub fn state_dict(&self) -> StateDict {
        let mut state = BTreeMap::new();
        let mut param_groups = Vec::with_capacity(self.groups.len());
        let mut next_id = 0;

        for group in &self.groups {
            let mut ids = Vec::with_capacity(group.params.len());
            for &idx in &group.params {
                if let Some(buf) = self.momentum_buffers.get(&idx) {
                    state.insert(
                        next_id,
                        ParamState {
                            momentum_buffer: Some(buf.to_vec()),
                        },
                    );
                }
                ids.push(next_id);
                next_id += 1;
            }
            param_groups.push(GroupState {
                options: group.options,
                params: ids,
            });
        }

        StateDict {
            state,
            param_groups,
        }
    }

    /// Restore hyperparameters and buffers from a snapshot
    ///
    /// The snapshot must have the same number of groups with the same number
    /// of parameters in each. Saved hyperparameters replace the current ones.
    /// On error the optimizer is left unchanged.
    pub fn load_state_dict(&mut self, state_dict: &StateDict) -> Result<()> {
        if state_dict.param_groups.len() != self.groups.len() {
            return Err(Error::StateDict(format!(
                "loaded state dict has {} parameter groups, optimizer has {}",
                state_dict.param_groups.len(),
                self.groups.len()
            )));
        }

        let mut groups = self.groups.clone();
        let mut buffers = BTreeMap::new();
        for (gi, (saved, current)) in state_dict
            .param_groups
            .iter()
            .zip(groups.iter_mut())
            .enumerate()
        {
            if saved.params.len() != current.params.len() {
                return Err(Error::StateDict(format!(
                    "parameter group {gi} has {} parameters in the state dict, {} in the optimizer",
                    saved.params.len(),
                    current.params.len()
                )));
            }
            saved.options.validate()?;

            for (&id, &idx) in saved.params.iter().zip(current.params.iter()) {
                if let Some(buf) = state_dict
                    .state
                    .get(&id)
                    .and_then(|s| s.momentum_buffer.as_ref())
                {
                    buffers.insert(idx, Array1::from(buf.clone()));
                }
            }
            current.options = saved.options;
        }

        debug!(
            groups = groups.len(),
            buffers = buffers.len(),
            "loaded SGD state dict"
        );
        self.groups = groups;
        self.momentum_buffers = buffers;
        Ok(())
    }

    fn check_params<P: Borrow<Tensor>>(&self, params: &[P]) -> Result<()> {
        for group in &self.groups {
            let opts = &group.options;
            for &idx in &group.params {
                let param = params.get(idx).ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "optimizer is bound to parameter {idx}, but only {} were passed",
                        params.len()
                    ))
                })?;
                let param: &Tensor = param.borrow();

                if let Some(buf) = self.momentum_buffers.get(&idx) {
                    if buf.len() != param.len() {
                        return Err(Error::StateDict(format!(
                            "momentum buffer of parameter {idx} has {} elements, parameter has {}",
                            buf.len(),
                            param.len()
                        )));
                    }
                }

                if let Some(sparse) = param.sparse_grad() {
                    if opts.momentum != 0.0 || opts.weight_decay != 0.0 {
                        return Err(Error::InvalidGradient(
                            "SGD does not support sparse gradients with momentum or weight decay"
                                .to_string(),
                        ));
                    }
                    if sparse.size() != param.len() {
                        return Err(Error::ShapeMismatch {
                            expected: vec![param.len()],
                            got: vec![sparse.size()],
                        });
                    }
                } else if let Some(grad) = param.grad() {
                    if grad.len() != param.len() {
                        return Err(Error::ShapeMismatch {
                            expected: vec![param.len()],
                            got: vec![grad.len()],
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Optimizer for SGD {
    fn step<P: BorrowMut<Tensor>>(&mut self, params: &mut [P]) -> Result<()> {
        self.check_params(params)?;

        for group in &self.groups {
            let SgdOptions {
                lr,
                momentum,
                dampening,
                weight_decay,
                nesterov,
            } = group.options;

            for &idx in &group.params {
                let param: &mut Tensor = params[idx].borrow_mut();

                if let Some(sparse) = param.sparse_grad() {
                    // p[i] -= lr * v over the coalesced entries
                    let coalesced = sparse.coalesce();
                    let data = param.data_mut();
                    for (&i, &v) in coalesced.indices().iter().zip(coalesced.values().iter()) {
                        data[i] = data[i] - v * lr;
                    }
                    trace!(param = idx, nnz = coalesced.nnz(), "sparse SGD update");
                    continue;
                }

                let Some(grad) = param.grad() else {
                    continue;
                };

                let mut d_p = grad;
                if weight_decay != 0.0 {
                    d_p = &d_p + &(param.data() * weight_decay);
                }

                if momentum != 0.0 {
                    let buf = match self.momentum_buffers.remove(&idx) {
                        Some(buf) => buf * momentum + &(&d_p * (1.0 - dampening)),
                        None => d_p.clone(),
                    };
                    if nesterov {
                        d_p = &d_p + &(&buf * momentum);
                    } else {
                        d_p = buf.clone();
                    }
                    self.momentum_buffers.insert(idx, buf);
                }

                *param.data_mut() = param.data() - &(&d_p * lr);
            }
        }

        Ok(())
    }

    /// Learning rate of the first group
    fn lr(&self) -> f32 {
        self.groups.first().map_or(self.defaults.lr, |g| g.options.lr)
    }

    /// Set the learning rate of every group
    fn set_lr(&mut self, lr: f32) {
        self.defaults.lr = lr;
        for group in &mut self.groups {
            group.options.lr = lr;
        }
    }
}

impl fmt::Display for SGD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SGD (")?;
        for (i, group) in self.groups.iter().enumerate() {
            writeln!(f, "Parameter Group {i}")?;
            write!(f, "{}", group.options)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::SparseTensor;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_plain_step() {
        let mut params = vec![Tensor::from_vec(vec![1.0, -2.0], true)];
        let mut sgd = SGD::with_params(1, SgdOptions::new(0.1)).unwrap();

        params[0].set_grad(arr1(&[1.0, -1.0]));
        sgd.step(&mut params).unwrap();

        assert_abs_diff_eq!(params[0].data()[0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].data()[1], -1.9, epsilon = 1e-6);
        assert!(sgd.momentum_buffer(0).is_none());
    }

    #[test]
    fn test_momentum_buffer_accumulates() {
        let mut params = vec![Tensor::from_vec(vec![0.0], true)];
        let opts = SgdOptions::new(1.0).momentum(0.5).dampening(0.5);
        let mut sgd = SGD::with_params(1, opts).unwrap();

        params[0].set_grad(arr1(&[1.0]));
        sgd.step(&mut params).unwrap();
        // First step: buf = g
        assert_abs_diff_eq!(sgd.momentum_buffer(0).unwrap()[0], 1.0);
        assert_abs_diff_eq!(params[0].data()[0], -1.0);

        params[0].set_grad(arr1(&[1.0]));
        sgd.step(&mut params).unwrap();
        // buf = 0.5 * 1 + 0.5 * 1
        assert_abs_diff_eq!(sgd.momentum_buffer(0).unwrap()[0], 1.0);
        assert_abs_diff_eq!(params[0].data()[0], -2.0);
    }

    #[test]
    fn test_nesterov_and_weight_decay() {
        let mut params = vec![Tensor::from_vec(vec![2.0], true)];
        let opts = SgdOptions::new(0.1)
            .momentum(0.9)
            .weight_decay(0.5)
            .nesterov(true);
        let mut sgd = SGD::with_params(1, opts).unwrap();

        params[0].set_grad(arr1(&[1.0]));
        sgd.step(&mut params).unwrap();

        // d = 1 + 0.5 * 2 = 2; buf = 2; d = 2 + 0.9 * 2 = 3.8; p = 2 - 0.38
        assert_abs_diff_eq!(params[0].data()[0], 1.62, epsilon = 1e-6);
    }

    #[test]
    fn test_params_without_grad_are_skipped() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        let mut sgd = SGD::with_params(2, SgdOptions::new(0.1)).unwrap();

        params[1].set_grad(arr1(&[1.0]));
        sgd.step(&mut params).unwrap();

        assert_eq!(params[0].data()[0], 1.0);
        assert_abs_diff_eq!(params[1].data()[0], 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_unbound_params_are_untouched() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        let mut sgd = SGD::new(vec![ParamGroup::new(vec![1])], SgdOptions::new(0.1)).unwrap();

        params[0].set_grad(arr1(&[1.0]));
        params[1].set_grad(arr1(&[1.0]));
        sgd.step(&mut params).unwrap();

        assert_eq!(params[0].data()[0], 1.0);
        assert_abs_diff_eq!(params[1].data()[0], 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_construction_errors() {
        assert!(SGD::new(vec![], SgdOptions::new(0.1)).is_err());
        assert!(SGD::new(vec![ParamGroup::new(vec![])], SgdOptions::new(0.1)).is_err());
        assert!(SGD::new(
            vec![ParamGroup::new(vec![0, 1]), ParamGroup::new(vec![1])],
            SgdOptions::new(0.1)
        )
        .is_err());
        assert!(SGD::new(
            vec![ParamGroup::new(vec![0]).lr(-1.0)],
            SgdOptions::new(0.1)
        )
        .is_err());
    }

    #[test]
    fn test_step_with_too_few_params_fails() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut sgd = SGD::with_params(2, SgdOptions::new(0.1)).unwrap();
        assert!(matches!(
            sgd.step(&mut params),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_gradient_shape_mismatch_fails() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        let mut sgd = SGD::with_params(1, SgdOptions::new(0.1)).unwrap();
        params[0].set_grad(arr1(&[1.0]));
        assert!(matches!(
            sgd.step(&mut params),
            Err(Error::ShapeMismatch { .. })
        ));
        assert_eq!(params[0].data()[0], 1.0);
    }

    #[test]
    fn test_sparse_grad_matches_dense() {
        let mut sparse_params = vec![Tensor::from_vec(vec![1.0, 1.0, 1.0], true)];
        let mut dense_params = vec![Tensor::from_vec(vec![1.0, 1.0, 1.0], true)];
        let mut sparse_sgd = SGD::with_params(1, SgdOptions::new(0.1)).unwrap();
        let mut dense_sgd = SGD::with_params(1, SgdOptions::new(0.1)).unwrap();

        let grad = SparseTensor::new(vec![2, 0, 2], arr1(&[0.25, 1.0, 0.75]), 3).unwrap();
        dense_params[0].set_grad(grad.to_dense());
        sparse_params[0].set_sparse_grad(grad);

        sparse_sgd.step(&mut sparse_params).unwrap();
        dense_sgd.step(&mut dense_params).unwrap();

        assert_eq!(sparse_params[0].data(), dense_params[0].data());
        assert_eq!(sparse_params[0].data()[1], 1.0);
    }

    #[test]
    fn test_sparse_grad_with_momentum_fails() {
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        let mut sgd = SGD::with_params(1, SgdOptions::new(0.1).momentum(0.9)).unwrap();
        params[0].set_sparse_grad(SparseTensor::new(vec![0], arr1(&[1.0]), 1).unwrap());
        assert!(matches!(
            sgd.step(&mut params),
            Err(Error::InvalidGradient(_))
        ));
    }

    #[test]
    fn test_step_with_closure_zeroes_and_returns_loss() {
        let mut params = vec![Tensor::from_vec(vec![3.0], true)];
        let mut sgd = SGD::with_params(1, SgdOptions::new(0.25)).unwrap();
        params[0].set_grad(arr1(&[100.0]));

        let loss = sgd
            .step_with(&mut params, |p| {
                // Stale gradient was cleared
                assert!(p[0].grad().is_none());
                let x = p[0].data()[0];
                p[0].set_grad(arr1(&[2.0 * x]));
                x * x
            })
            .unwrap();

        assert_abs_diff_eq!(loss, 9.0);
        assert_abs_diff_eq!(params[0].data()[0], 1.5);
    }

    #[test]
    fn test_set_lr_updates_all_groups() {
        let groups = vec![ParamGroup::new(vec![0]), ParamGroup::new(vec![1]).lr(1.0)];
        let mut sgd = SGD::new(groups, SgdOptions::new(0.1)).unwrap();
        assert_eq!(sgd.lr(), 0.1);

        sgd.set_lr(0.01);
        assert!(sgd.param_groups().iter().all(|g| g.options.lr == 0.01));
    }

    #[test]
    fn test_display_lists_groups() {
        let groups = vec![ParamGroup::new(vec![0]), ParamGroup::new(vec![1]).lr(0.01)];
        let sgd = SGD::new(groups, SgdOptions::new(0.001)).unwrap();
        let repr = sgd.to_string();

        assert!(repr.starts_with("SGD ("));
        assert!(repr.contains("Parameter Group 0"));
        assert!(repr.contains("Parameter Group 1"));
        assert!(repr.contains("lr: 0.01"));
        assert!(repr.ends_with(')'));
    }

    #[test]
    fn test_state_dict_packs_ids() {
        let groups = vec![ParamGroup::new(vec![3]), ParamGroup::new(vec![0, 1])];
        let mut sgd = SGD::new(groups, SgdOptions::new(0.1).momentum(0.9)).unwrap();
        let mut params: Vec<Tensor> = (0..4).map(|_| Tensor::from_vec(vec![1.0], true)).collect();
        for p in &params {
            p.set_grad(arr1(&[1.0]));
        }
        sgd.step(&mut params).unwrap();

        let sd = sgd.state_dict();
        assert_eq!(sd.param_groups[0].params, vec![0]);
        assert_eq!(sd.param_groups[1].params, vec![1, 2]);
        assert_eq!(sd.num_params(), 3);
        assert_eq!(sd.state.len(), 3);
        assert_eq!(sd.state[&0].momentum_buffer, Some(vec![1.0]));
    }

    #[test]
    fn test_load_state_dict_rejects_mismatched_groups() {
        let source = SGD::with_params(2, SgdOptions::new(0.1)).unwrap();
        let mut target = SGD::with_params(3, SgdOptions::new(0.5)).unwrap();

        let err = target.load_state_dict(&source.state_dict()).unwrap_err();
        assert!(matches!(err, Error::StateDict(_)));
        // Unchanged on error
        assert_eq!(target.lr(), 0.5);

        let mut two_groups = SGD::new(
            vec![ParamGroup::new(vec![0]), ParamGroup::new(vec![1])],
            SgdOptions::new(0.1),
        )
        .unwrap();
        assert!(two_groups.load_state_dict(&source.state_dict()).is_err());
    }

    #[test]
    fn test_load_state_dict_adopts_options_and_buffers() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 2.0], true)];
        let mut source = SGD::with_params(1, SgdOptions::new(0.05).momentum(0.9)).unwrap();
        params[0].set_grad(arr1(&[1.0, 1.0]));
        source.step(&mut params).unwrap();

        let mut target = SGD::with_params(1, SgdOptions::new(1.0)).unwrap();
        target.load_state_dict(&source.state_dict()).unwrap();

        assert_eq!(target.lr(), 0.05);
        assert_eq!(target.param_groups()[0].options.momentum, 0.9);
        assert_eq!(target.momentum_buffer(0), source.momentum_buffer(0));
    }

    #[test]
    fn test_step_rejects_loaded_buffer_of_wrong_length() {
        let mut target = SGD::with_params(1, SgdOptions::new(0.1).momentum(0.9)).unwrap();
        for buf in [vec![1.0, 2.0, 3.0], vec![5.0]] {
            let mut state = target.state_dict();
            state.state.insert(
                0,
                ParamState {
                    momentum_buffer: Some(buf),
                },
            );
            target.load_state_dict(&state).unwrap();

            let mut params = vec![Tensor::from_vec(vec![1.0, 1.0], true)];
            params[0].set_grad(arr1(&[1.0, 1.0]));
            let err = target.step(&mut params).unwrap_err();
            assert!(matches!(err, Error::StateDict(_)));
            assert_eq!(params[0].data().to_vec(), vec![1.0, 1.0]);
        }
    }
}
