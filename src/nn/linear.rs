//! Fully connected layer
//!
//! For weight W ∈ ℝ^(out × in) and bias b ∈ ℝ^out, a batch of inputs
//! X ∈ ℝ^(n × in) maps to Y = X Wᵀ + b ∈ ℝ^(n × out). All matrices are
//! stored flattened, row-major.

use super::Module;
use crate::autograd::linear;
use crate::{Error, Result, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Affine layer `y = x Wᵀ + b`
pub struct Linear {
    /// Weight stored as 1D [out_features * in_features]
    weight: Tensor,
    /// Optional bias [out_features]
    bias: Option<Tensor>,
    in_features: usize,
    out_features: usize,
    training: bool,
}

impl Linear {
    /// Create a layer with weights drawn from U(-k, k), k = 1/sqrt(in_features)
    pub fn new(in_features: usize, out_features: usize, bias: bool) -> Result<Self> {
        Self::with_rng(in_features, out_features, bias, &mut StdRng::from_os_rng())
    }

    /// Same as `new`, with a seeded generator
    pub fn with_seed(in_features: usize, out_features: usize, bias: bool, seed: u64) -> Result<Self> {
        Self::with_rng(
            in_features,
            out_features,
            bias,
            &mut StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng<R: Rng>(in_features: usize, out_features: usize, bias: bool, rng: &mut R) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidParameter(format!(
                "Linear needs positive dimensions, got {in_features}x{out_features}"
            )));
        }

        let bound = 1.0 / (in_features as f32).sqrt();
        let weight: Vec<f32> = (0..in_features * out_features)
            .map(|_| rng.random_range(-bound..bound))
            .collect();
        let bias = bias.then(|| {
            let data: Vec<f32> = (0..out_features)
                .map(|_| rng.random_range(-bound..bound))
                .collect();
            Tensor::from_vec(data, true)
        });

        Ok(Self {
            weight: Tensor::from_vec(weight, true),
            bias,
            in_features,
            out_features,
            training: true,
        })
    }

    /// Build from explicit parameters
    pub fn from_parameters(
        weight: Tensor,
        bias: Option<Tensor>,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        if weight.len() != in_features * out_features {
            return Err(Error::ShapeMismatch {
                expected: vec![out_features, in_features],
                got: vec![weight.len()],
            });
        }
        if let Some(b) = &bias {
            if b.len() != out_features {
                return Err(Error::ShapeMismatch {
                    expected: vec![out_features],
                    got: vec![b.len()],
                });
            }
        }
        Ok(Self {
            weight,
            bias,
            in_features,
            out_features,
            training: true,
        })
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }
}

impl Module for Linear {
    /// Input length must be a multiple of `in_features`; the batch size is inferred
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        if input.is_empty() || input.len() % self.in_features != 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![self.in_features],
                got: vec![input.len()],
            });
        }
        let batch = input.len() / self.in_features;
        Ok(linear(
            input,
            &self.weight,
            self.bias.as_ref(),
            batch,
            self.in_features,
            self.out_features,
        ))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = vec![&self.weight];
        params.extend(self.bias.as_ref());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = vec![&mut self.weight];
        params.extend(self.bias.as_mut());
        params
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}
