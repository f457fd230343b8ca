//! Small MNIST-shaped classifier

use super::{Dropout, Linear, Module, NLLLoss, ReLU};
use crate::autograd::{backward, log_softmax};
use crate::optim::{Optimizer, SgdOptions, SGD};
use crate::{Error, Result, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

pub const INPUT_FEATURES: usize = 28 * 28;
pub const HIDDEN_FEATURES: usize = 64;
pub const CLASSES: usize = 10;

/// `Linear(784, 64) → ReLU → Dropout(0.5) → Linear(64, 10) → log_softmax`
pub struct Net {
    fc1: Linear,
    relu: ReLU,
    dropout: Dropout,
    fc2: Linear,
}

impl Net {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fc1: Linear::new(INPUT_FEATURES, HIDDEN_FEATURES, true)?,
            relu: ReLU::new(),
            dropout: Dropout::new(0.5)?,
            fc2: Linear::new(HIDDEN_FEATURES, CLASSES, true)?,
        })
    }

    /// Deterministic initialisation and dropout masks
    pub fn with_seed(seed: u64) -> Result<Self> {
        Ok(Self {
            fc1: Linear::with_seed(INPUT_FEATURES, HIDDEN_FEATURES, true, seed)?,
            relu: ReLU::new(),
            dropout: Dropout::with_seed(0.5, seed.wrapping_add(1))?,
            fc2: Linear::with_seed(HIDDEN_FEATURES, CLASSES, true, seed.wrapping_add(2))?,
        })
    }

    /// One optimisation step on a batch, returning the loss before the update
    pub fn train_step<O: Optimizer>(
        &mut self,
        optimizer: &mut O,
        input: &Tensor,
        targets: &[usize],
    ) -> Result<f32> {
        optimizer.zero_grad(&self.parameters());

        let output = self.forward(input)?;
        let mut loss = NLLLoss::new(CLASSES).forward_indices(&output, targets)?;
        let value = loss.data()[0];
        backward(&mut loss, None);

        optimizer.step(&mut self.parameters_mut())?;
        debug!(loss = value, batch = targets.len(), "net train step");
        Ok(value)
    }
}

impl Module for Net {
    /// Input is `N × 1 × 28 × 28` flattened; output is `N × 10` log-probabilities
    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        if input.is_empty() || input.len() % INPUT_FEATURES != 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![1, 28, 28],
                got: vec![input.len()],
            });
        }
        let batch = input.len() / INPUT_FEATURES;

        let x = self.fc1.forward(input)?;
        let x = self.relu.forward(&x)?;
        let x = self.dropout.forward(&x)?;
        let x = self.fc2.forward(&x)?;
        Ok(log_softmax(&x, batch, CLASSES))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        let mut params = self.fc1.parameters();
        params.extend(self.fc2.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = self.fc1.parameters_mut();
        params.extend(self.fc2.parameters_mut());
        params
    }

    fn set_training(&mut self, training: bool) {
        self.fc1.set_training(training);
        self.relu.set_training(training);
        self.dropout.set_training(training);
        self.fc2.set_training(training);
    }

    fn is_training(&self) -> bool {
        self.dropout.is_training()
    }
}

/// One SGD step of a freshly initialised `Net` on a random batch of two
///
/// Returns the loss before and after the update, both measured in
/// evaluation mode so dropout does not affect the comparison.
pub fn check_net(seed: u64, lr: f32) -> Result<(f32, f32)> {
    let mut net = Net::with_seed(seed)?;
    let (input, targets) = random_batch(2, seed.wrapping_add(3));
    let mut optimizer = SGD::with_params(net.parameters().len(), SgdOptions::new(lr))?;

    let nll = NLLLoss::new(CLASSES);
    net.eval();
    let before = nll.forward_indices(&net.forward(&input)?, &targets)?.data()[0];

    net.train();
    net.train_step(&mut optimizer, &input, &targets)?;

    net.eval();
    let after = nll.forward_indices(&net.forward(&input)?, &targets)?.data()[0];
    Ok((before, after))
}

/// Random `batch × 1 × 28 × 28` images in [0, 1) with random class labels
pub fn random_batch(batch: usize, seed: u64) -> (Tensor, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let pixels: Vec<f32> = (0..batch * INPUT_FEATURES).map(|_| rng.random()).collect();
    let targets = (0..batch).map(|_| rng.random_range(0..CLASSES)).collect();
    (Tensor::from_vec(pixels, false), targets)
}
