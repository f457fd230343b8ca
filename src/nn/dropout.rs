//! Dropout layers
//!
//! In training mode each unit is zeroed with probability `p` and survivors
//! are scaled by `1 / (1 - p)` so the expected activation is unchanged.
//! In evaluation mode both layers are the identity.

use super::Module;
use crate::autograd::mask_scale;
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn check_probability(p: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(Error::InvalidParameter(format!(
            "dropout probability has to be between 0 and 1, but got {p}"
        )));
    }
    Ok(())
}

/// Value kept units are multiplied by
fn keep_scale(p: f32) -> f32 {
    if p < 1.0 {
        1.0 / (1.0 - p)
    } else {
        0.0
    }
}

/// Element-wise dropout
pub struct Dropout {
    p: f32,
    training: bool,
    rng: StdRng,
}

impl Dropout {
    pub fn new(p: f32) -> Result<Self> {
        check_probability(p)?;
        Ok(Self {
            p,
            training: true,
            rng: StdRng::from_os_rng(),
        })
    }

    pub fn with_seed(p: f32, seed: u64) -> Result<Self> {
        check_probability(p)?;
        Ok(Self {
            p,
            training: true,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn p(&self) -> f32 {
        self.p
    }
}

impl Module for Dropout {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        if !self.training || self.p == 0.0 {
            return Ok(input.clone());
        }

        let scale = keep_scale(self.p);
        let p = self.p;
        let rng = &mut self.rng;
        let mask = Array1::from_shape_fn(input.len(), |_| {
            if rng.random::<f32>() < p {
                0.0
            } else {
                scale
            }
        });
        Ok(mask_scale(input, &mask))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}

/// Channel-wise dropout for `N × C × H × W` inputs
///
/// Whole `H × W` planes are dropped together.
pub struct Dropout2d {
    p: f32,
    channels: usize,
    training: bool,
    rng: StdRng,
}

impl Dropout2d {
    /// `channels` is C; the plane size and batch are inferred from the input
    pub fn new(p: f32, channels: usize) -> Result<Self> {
        Self::build(p, channels, StdRng::from_os_rng())
    }

    pub fn with_seed(p: f32, channels: usize, seed: u64) -> Result<Self> {
        Self::build(p, channels, StdRng::seed_from_u64(seed))
    }

    fn build(p: f32, channels: usize, rng: StdRng) -> Result<Self> {
        check_probability(p)?;
        if channels == 0 {
            return Err(Error::InvalidParameter(
                "Dropout2d needs at least one channel".to_string(),
            ));
        }
        Ok(Self {
            p,
            channels,
            training: true,
            rng,
        })
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    /// Forward with an explicit plane size (H * W)
    pub fn forward_planes(&mut self, input: &Tensor, plane: usize) -> Result<Tensor> {
        let per_item = self.channels * plane;
        if plane == 0 || input.is_empty() || input.len() % per_item != 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![self.channels, plane],
                got: vec![input.len()],
            });
        }
        if !self.training || self.p == 0.0 {
            return Ok(input.clone());
        }

        let planes = input.len() / plane;
        let scale = keep_scale(self.p);
        let keep: Vec<f32> = (0..planes)
            .map(|_| {
                if self.rng.random::<f32>() < self.p {
                    0.0
                } else {
                    scale
                }
            })
            .collect();
        let mask = Array1::from_shape_fn(input.len(), |i| keep[i / plane]);
        Ok(mask_scale(input, &mask))
    }
}

impl Module for Dropout2d {
    /// Treats the input as a single item: plane size = len / channels
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        if input.len() % self.channels != 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![self.channels],
                got: vec![input.len()],
            });
        }
        let plane = input.len() / self.channels;
        self.forward_planes(input, plane)
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }
}
