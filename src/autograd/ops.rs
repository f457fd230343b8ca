//! Autograd operations with backward passes

use super::{BackwardOp, GradCell, Tensor};
use ndarray::Array1;
use std::rc::Rc;

/// Add two tensors
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    let data = a.data() + b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad.clone());
            }

            // Recursively call backward on inputs
            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b.backward_op() {
                op.backward();
            }
        }
    }
}

/// Scale tensor by a scalar
pub fn scale(a: &Tensor, factor: f32) -> Tensor {
    let data = a.data() * factor;
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor: Array1::from_elem(a.len(), factor),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

/// Multiply by a constant (non-differentiable) mask
///
/// Dropout builds its mask with the survivor scaling already folded in.
pub fn mask_scale(a: &Tensor, mask: &Array1<f32>) -> Tensor {
    assert_eq!(a.len(), mask.len(), "Mask size mismatch");

    let data = a.data() * mask;
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ScaleBackward {
            a: a.clone(),
            factor: mask.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ScaleBackward {
    a: Tensor,
    factor: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for ScaleBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad * &self.factor);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Element-wise square
pub fn square(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x * x);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SquareBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SquareBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for SquareBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * 2a
                self.a.accumulate_grad(grad * &self.a.data().mapv(|x| 2.0 * x));
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * (a > 0)
                let grad_a = grad * &self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// ELU activation
///
/// ELU(x) = x for x > 0, alpha * (e^x - 1) otherwise
pub fn elu(a: &Tensor, alpha: f32) -> Tensor {
    let data = a
        .data()
        .mapv(|x| if x > 0.0 { x } else { alpha * x.exp_m1() });
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(EluBackward {
            a: a.clone(),
            alpha,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct EluBackward {
    a: Tensor,
    alpha: f32,
    result_grad: GradCell,
}

impl BackwardOp for EluBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂ELU/∂x = 1 for x > 0, alpha * e^x otherwise
                let alpha = self.alpha;
                let local = self
                    .a
                    .data()
                    .mapv(|x| if x > 0.0 { 1.0 } else { alpha * x.exp() });
                self.a.accumulate_grad(grad * &local);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Logistic sigmoid
pub fn sigmoid(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| 1.0 / (1.0 + (-x).exp()));
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(SigmoidBackward {
            a: a.clone(),
            output: result.data().clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct SigmoidBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for SigmoidBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂σ/∂x = σ(x) * (1 - σ(x))
                let local = self.output.mapv(|y| y * (1.0 - y));
                self.a.accumulate_grad(grad * &local);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Row-wise log-softmax over a `rows × cols` matrix stored flattened
pub fn log_softmax(a: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(a.len(), rows * cols, "log_softmax size mismatch");

    let x = a.data();
    let mut out = vec![0.0; rows * cols];
    let mut probs = vec![0.0; rows * cols];
    for r in 0..rows {
        let row: Vec<f32> = (0..cols).map(|c| x[r * cols + c]).collect();
        let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = row.iter().map(|&v| (v - max_val).exp()).sum::<f32>().ln();
        for (c, &v) in row.iter().enumerate() {
            let lv = v - max_val - log_sum;
            out[r * cols + c] = lv;
            probs[r * cols + c] = lv.exp();
        }
    }

    let requires_grad = a.requires_grad();
    let mut result = Tensor::from_vec(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LogSoftmaxBackward {
            a: a.clone(),
            probs: Array1::from(probs),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LogSoftmaxBackward {
    a: Tensor,
    probs: Array1<f32>,
    rows: usize,
    cols: usize,
    result_grad: GradCell,
}

impl BackwardOp for LogSoftmaxBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂x_j = g_j - softmax_j * Σ_k g_k  (per row)
                let mut grad_a = vec![0.0; self.rows * self.cols];
                for r in 0..self.rows {
                    let base = r * self.cols;
                    let row_sum: f32 = (0..self.cols).map(|c| grad_output[base + c]).sum();
                    for c in 0..self.cols {
                        grad_a[base + c] = grad_output[base + c] - self.probs[base + c] * row_sum;
                    }
                }
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Sum all elements
pub fn sum(a: &Tensor) -> Tensor {
    reduce(a, a.data().sum(), 1.0)
}

/// Mean of all elements
pub fn mean(a: &Tensor) -> Tensor {
    let n = a.len().max(1) as f32;
    reduce(a, a.data().sum() / n, 1.0 / n)
}

fn reduce(a: &Tensor, value: f32, weight: f32) -> Tensor {
    let requires_grad = a.requires_grad();
    let mut result = Tensor::from_vec(vec![value], requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ReduceBackward {
            a: a.clone(),
            weight,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ReduceBackward {
    a: Tensor,
    weight: f32,
    result_grad: GradCell,
}

impl BackwardOp for ReduceBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂L/∂a = ∂L/∂out * weight (broadcast)
                let grad_a = Array1::from_elem(self.a.len(), grad[0] * self.weight);
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}

/// Affine map `y = x Wᵀ + b` over a batch
///
/// - `x` is batch×in_features (flattened)
/// - `weight` is out_features×in_features (flattened, row-major)
/// - `bias`, if present, has length out_features
/// - `y` is batch×out_features (flattened)
pub fn linear(
    x: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    batch: usize,
    in_features: usize,
    out_features: usize,
) -> Tensor {
    assert_eq!(x.len(), batch * in_features, "Input size mismatch");
    assert_eq!(
        weight.len(),
        out_features * in_features,
        "Weight size mismatch"
    );
    if let Some(b) = bias {
        assert_eq!(b.len(), out_features, "Bias size mismatch");
    }

    let xd = x.data();
    let wd = weight.data();
    let mut out = vec![0.0; batch * out_features];
    for n in 0..batch {
        for o in 0..out_features {
            let mut acc = 0.0;
            for i in 0..in_features {
                acc += xd[n * in_features + i] * wd[o * in_features + i];
            }
            if let Some(b) = bias {
                acc += b.data()[o];
            }
            out[n * out_features + o] = acc;
        }
    }

    let requires_grad = x.requires_grad()
        || weight.requires_grad()
        || bias.is_some_and(|b| b.requires_grad());
    let mut result = Tensor::from_vec(out, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(LinearBackward {
            x: x.clone(),
            weight: weight.clone(),
            bias: bias.cloned(),
            batch,
            in_features,
            out_features,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct LinearBackward {
    x: Tensor,
    weight: Tensor,
    bias: Option<Tensor>,
    batch: usize,
    in_features: usize,
    out_features: usize,
    result_grad: GradCell,
}

impl BackwardOp for LinearBackward {
    fn backward(&self) {
        if let Some(g) = self.result_grad.borrow().as_ref() {
            let (nb, ni, no) = (self.batch, self.in_features, self.out_features);

            if self.x.requires_grad() {
                // ∂L/∂x[n,i] = Σ_o g[n,o] W[o,i]
                let w = self.weight.data();
                let mut grad_x = vec![0.0; nb * ni];
                for n in 0..nb {
                    for i in 0..ni {
                        let mut acc = 0.0;
                        for o in 0..no {
                            acc += g[n * no + o] * w[o * ni + i];
                        }
                        grad_x[n * ni + i] = acc;
                    }
                }
                self.x.accumulate_grad(Array1::from(grad_x));
            }

            if self.weight.requires_grad() {
                // ∂L/∂W[o,i] = Σ_n g[n,o] x[n,i]
                let x = self.x.data();
                let mut grad_w = vec![0.0; no * ni];
                for o in 0..no {
                    for i in 0..ni {
                        let mut acc = 0.0;
                        for n in 0..nb {
                            acc += g[n * no + o] * x[n * ni + i];
                        }
                        grad_w[o * ni + i] = acc;
                    }
                }
                self.weight.accumulate_grad(Array1::from(grad_w));
            }

            if let Some(bias) = self.bias.as_ref().filter(|b| b.requires_grad()) {
                // ∂L/∂b[o] = Σ_n g[n,o]
                let mut grad_b = vec![0.0; no];
                for n in 0..nb {
                    for o in 0..no {
                        grad_b[o] += g[n * no + o];
                    }
                }
                bias.accumulate_grad(Array1::from(grad_b));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.weight.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.as_ref().and_then(Tensor::backward_op) {
                op.backward();
            }
        }
    }
}
