//! Activation layers

use super::Module;
use crate::autograd;
use crate::{Error, Result, Tensor};

/// Functional ReLU
pub fn relu(input: &Tensor) -> Tensor {
    autograd::relu(input)
}

/// Functional ELU
pub fn elu(input: &Tensor, alpha: f32) -> Tensor {
    autograd::elu(input, alpha)
}

/// Rectified linear unit, `max(0, x)`
#[derive(Debug, Clone, Copy)]
pub struct ReLU {
    training: bool,
}

impl ReLU {
    pub fn new() -> Self {
        Self { training: true }
    }
}

impl Default for ReLU {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for ReLU {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        Ok(relu(input))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}

/// Exponential linear unit
///
/// ELU(x) = x for x > 0, alpha * (e^x - 1) otherwise
#[derive(Debug, Clone, Copy)]
pub struct ELU {
    alpha: f32,
    training: bool,
}

impl ELU {
    pub fn new(alpha: f32) -> Result<Self> {
        if !alpha.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "ELU alpha must be finite, got {alpha}"
            )));
        }
        Ok(Self {
            alpha,
            training: true,
        })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl Default for ELU {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            training: true,
        }
    }
}

impl Module for ELU {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        Ok(elu(input, self.alpha))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::backward;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_relu_function_and_module_agree() {
        let x = Tensor::from_vec(vec![-2.0, -0.0, 0.5, 3.0], false);
        let f = relu(&x);
        let m = ReLU::new().forward(&x).unwrap();

        assert_eq!(f.data(), m.data());
        assert_eq!(f.data().to_vec(), vec![0.0, 0.0, 0.5, 3.0]);
        assert_eq!(ReLU::new().num_parameters(), 0);
    }

    #[test]
    fn test_relu_module_backward() {
        let x = Tensor::from_vec(vec![-1.0, 2.0], true);
        let mut y = ReLU::new().forward(&x).unwrap();
        backward(&mut y, None);
        assert_eq!(x.grad().unwrap().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_elu_default_alpha() {
        let mut layer = ELU::default();
        assert_eq!(layer.alpha(), 1.0);

        let x = Tensor::from_vec(vec![-1.0, 1.0], false);
        let y = layer.forward(&x).unwrap();
        assert_abs_diff_eq!(y.data()[0], (-1.0f32).exp() - 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y.data()[1], 1.0);
    }

    #[test]
    fn test_elu_saturates_at_minus_alpha() {
        let mut layer = ELU::new(0.5).unwrap();
        let x = Tensor::from_vec(vec![-50.0], false);
        let y = layer.forward(&x).unwrap();
        assert_abs_diff_eq!(y.data()[0], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_elu_rejects_non_finite_alpha() {
        assert!(ELU::new(f32::NAN).is_err());
        assert!(ELU::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_eval_mode_does_not_change_activations() {
        let mut layer = ELU::default();
        layer.eval();
        assert!(!layer.is_training());
        let x = Tensor::from_vec(vec![-1.0, 1.0], false);
        assert_eq!(layer.forward(&x).unwrap().data(), elu(&x, 1.0).data());
    }

    #[test]
    fn test_relu_tracks_mode() {
        let mut layer = ReLU::new();
        assert!(layer.is_training());
        layer.eval();
        assert!(!layer.is_training());
        layer.train();
        assert!(layer.is_training());
    }
}
