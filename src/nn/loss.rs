//! Loss functions

use crate::autograd::{BackwardOp, GradCell};
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Trait for loss functions
pub trait LossFn {
    /// Compute a scalar loss; the result backpropagates into `predictions`
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor>;

    /// Name of the loss function
    fn name(&self) -> &str;
}

/// How per-element losses are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
}

impl Reduction {
    fn factor(self, n: usize) -> f32 {
        match self {
            Reduction::Mean => 1.0 / n.max(1) as f32,
            Reduction::Sum => 1.0,
        }
    }
}

/// Scalar loss whose gradient with respect to `input` is fixed at forward time
fn scalar_loss(value: f32, input: &Tensor, grad: Array1<f32>) -> Tensor {
    let requires_grad = input.requires_grad();
    let mut loss = Tensor::from_vec(vec![value], requires_grad);

    if requires_grad {
        loss.set_backward_op(Rc::new(LossBackward {
            input: input.clone(),
            grad,
            result_grad: loss.grad_cell(),
        }));
    }

    loss
}

struct LossBackward {
    input: Tensor,
    grad: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for LossBackward {
    fn backward(&self) {
        if let Some(upstream) = self.result_grad.borrow().as_ref() {
            self.input.accumulate_grad(&self.grad * upstream[0]);

            if let Some(op) = self.input.backward_op() {
                op.backward();
            }
        }
    }
}

/// Binary cross entropy between probabilities and targets
///
/// l_i = -w_i [t_i log(x_i) + (1 - t_i) log(1 - x_i)]
///
/// Log terms are clamped to be `>= -100` so that `x = 0` or `x = 1` give a
/// finite loss.
#[derive(Debug, Clone, Default)]
pub struct BCELoss {
    weight: Option<Array1<f32>>,
    reduction: Reduction,
}

const LOG_CLAMP: f32 = -100.0;
const GRAD_EPS: f32 = 1e-12;

impl BCELoss {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-element rescaling weight, must match the input length
    pub fn with_weight(mut self, weight: Array1<f32>) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }
}

impl LossFn for BCELoss {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let n = predictions.len();
        if targets.len() != n {
            return Err(Error::ShapeMismatch {
                expected: vec![n],
                got: vec![targets.len()],
            });
        }
        if let Some(w) = &self.weight {
            if w.len() != n {
                return Err(Error::ShapeMismatch {
                    expected: vec![n],
                    got: vec![w.len()],
                });
            }
        }
        if let Some(bad) = predictions.data().iter().find(|x| !(0.0..=1.0).contains(*x)) {
            return Err(Error::InvalidParameter(format!(
                "BCELoss input must be between 0 and 1, got {bad}"
            )));
        }

        let x = predictions.data();
        let t = targets.data();
        let weight = |i: usize| self.weight.as_ref().map_or(1.0, |w| w[i]);
        let factor = self.reduction.factor(n);

        let mut total = 0.0;
        let mut grad = Array1::zeros(n);
        for i in 0..n {
            let log_x = x[i].ln().max(LOG_CLAMP);
            let log_1mx = (1.0 - x[i]).ln().max(LOG_CLAMP);
            total += -weight(i) * (t[i] * log_x + (1.0 - t[i]) * log_1mx);

            // ∂l/∂x = w (x - t) / (x (1 - x))
            let denom = (x[i] * (1.0 - x[i])).max(GRAD_EPS);
            grad[i] = weight(i) * (x[i] - t[i]) / denom * factor;
        }

        Ok(scalar_loss(total * factor, predictions, grad))
    }

    fn name(&self) -> &str {
        "BCE"
    }
}

/// Negative log-likelihood over a `batch × classes` matrix of log-probabilities
#[derive(Debug, Clone, Copy)]
pub struct NLLLoss {
    classes: usize,
}

impl NLLLoss {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }

    /// Mean of `-log_probs[n, targets[n]]` over the batch
    pub fn forward_indices(&self, log_probs: &Tensor, targets: &[usize]) -> Result<Tensor> {
        let batch = targets.len();
        if batch == 0 || log_probs.len() != batch * self.classes {
            return Err(Error::ShapeMismatch {
                expected: vec![batch, self.classes],
                got: vec![log_probs.len()],
            });
        }
        if let Some(&bad) = targets.iter().find(|&&c| c >= self.classes) {
            return Err(Error::InvalidParameter(format!(
                "target {bad} is out of bounds for {} classes",
                self.classes
            )));
        }

        let x = log_probs.data();
        let scale = 1.0 / batch as f32;
        let mut total = 0.0;
        let mut grad = Array1::zeros(log_probs.len());
        for (n, &class) in targets.iter().enumerate() {
            let at = n * self.classes + class;
            total -= x[at];
            grad[at] = -scale;
        }

        Ok(scalar_loss(total * scale, log_probs, grad))
    }
}

impl LossFn for NLLLoss {
    /// Targets hold class indices stored as floats
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let mut classes = Vec::with_capacity(targets.len());
        for &t in targets.data().iter() {
            if t < 0.0 || t.fract() != 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "NLLLoss target must be a class index, got {t}"
                )));
            }
            classes.push(t as usize);
        }
        self.forward_indices(predictions, &classes)
    }

    fn name(&self) -> &str {
        "NLL"
    }
}
