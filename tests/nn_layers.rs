//! End-to-end checks for the layers in `aprendiz::nn`.
//!
//! Forward values are compared against closed forms and gradients against
//! central finite differences.

use aprendiz::autograd::{backward, sigmoid, sum};
use aprendiz::nn::{
    check_net, elu, random_batch, relu, BCELoss, Dropout, Dropout2d, Linear, LossFn, Module, Net,
    NLLLoss, Reduction, ELU, ReLU, CLASSES,
};
use aprendiz::optim::{Optimizer, SgdOptions, SGD};
use aprendiz::Tensor;
use approx::assert_abs_diff_eq;
use ndarray::Array1;

fn finite_difference<F>(f: F, x: &[f32], epsilon: f32) -> Vec<f32>
where
    F: Fn(&[f32]) -> f32,
{
    let mut grad = vec![0.0; x.len()];
    let mut x_plus = x.to_vec();
    let mut x_minus = x.to_vec();

    for i in 0..x.len() {
        x_plus[i] = x[i] + epsilon;
        x_minus[i] = x[i] - epsilon;
        grad[i] = (f(&x_plus) - f(&x_minus)) / (2.0 * epsilon);
        x_plus[i] = x[i];
        x_minus[i] = x[i];
    }

    grad
}

/// Gradient of `Σ layer(x)` with respect to `x`
fn input_gradient<M: Module>(layer: &mut M, x: &[f32]) -> Vec<f32> {
    let input = Tensor::from_vec(x.to_vec(), true);
    let mut loss = sum(&layer.forward(&input).unwrap());
    backward(&mut loss, None);
    input.grad().unwrap().to_vec()
}

fn assert_close(actual: &[f32], expected: &[f32], epsilon: f32) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_abs_diff_eq!(*a, *e, epsilon = epsilon);
    }
}

#[test]
fn test_dropout() {
    let p = 0.2;
    let mut layer = Dropout::with_seed(p, 1234).unwrap();
    let input = Tensor::ones(1000, true);
    let output = layer.forward(&input).unwrap();

    let mut loss = sum(&output);
    backward(&mut loss, None);
    let grad = input.grad().unwrap();

    // Output and gradient share the mask since the input is all ones
    assert_eq!(output.data(), &grad);
    assert!(output.data().iter().all(|&v| v == 0.0 || (v - 1.0 / (1.0 - p)).abs() < 1e-6));

    let dropped = output.data().iter().filter(|&&v| v == 0.0).count() as f32 / 1000.0;
    assert!((dropped - p).abs() < 0.05, "dropped fraction {dropped}");

    layer.eval();
    assert_eq!(layer.forward(&input).unwrap().data(), input.data());
}

#[test]
fn test_dropout2d() {
    let (n, c, h, w) = (2, 128, 2, 2);
    let plane = h * w;
    let p = 0.2;
    let mut layer = Dropout2d::with_seed(p, c, 99).unwrap();
    let input = Tensor::ones(n * c * plane, true);
    let output = layer.forward_planes(&input, plane).unwrap();

    let mut dropped = 0;
    for chunk in output.data().as_slice().unwrap().chunks(plane) {
        assert!(chunk.iter().all(|&v| v == chunk[0]));
        if chunk[0] == 0.0 {
            dropped += 1;
        } else {
            assert_abs_diff_eq!(chunk[0], 1.0 / (1.0 - p), epsilon = 1e-6);
        }
    }
    let fraction = dropped as f32 / (n * c) as f32;
    assert!((fraction - p).abs() < 0.1, "dropped fraction {fraction}");

    let mut loss = sum(&output);
    backward(&mut loss, None);
    assert_eq!(&input.grad().unwrap(), output.data());

    assert!(Dropout2d::new(-0.5, c).is_err());
}

#[test]
fn test_linear() {
    let (batch, in_features, out_features) = (3, 4, 2);
    let mut layer = Linear::with_seed(in_features, out_features, true, 17).unwrap();
    let x: Vec<f32> = (0..batch * in_features).map(|i| (i as f32 * 0.37).sin()).collect();

    let w = layer.weight().data().clone();
    let b = layer.bias().unwrap().data().clone();
    let forward = |x: &[f32]| -> f32 {
        let mut total = 0.0;
        for n in 0..batch {
            for o in 0..out_features {
                let mut y = b[o];
                for i in 0..in_features {
                    y += x[n * in_features + i] * w[o * in_features + i];
                }
                total += y;
            }
        }
        total
    };

    let input = Tensor::from_vec(x.clone(), true);
    let output = layer.forward(&input).unwrap();
    assert_eq!(output.len(), batch * out_features);
    assert_abs_diff_eq!(output.data().sum(), forward(&x), epsilon = 1e-4);

    let mut loss = sum(&output);
    backward(&mut loss, None);
    let numeric = finite_difference(forward, &x, 1e-2);
    assert_close(&input.grad().unwrap().to_vec(), &numeric, 1e-2);

    // Σy is linear in b with slope `batch`
    assert_close(
        &layer.bias().unwrap().grad().unwrap().to_vec(),
        &vec![batch as f32; out_features],
        1e-6,
    );
}

#[test]
fn test_relu_function() {
    let x = vec![-1.5, -0.3, 0.2, 2.0];
    let y = relu(&Tensor::from_vec(x.clone(), false));
    assert_eq!(y.data().to_vec(), vec![0.0, 0.0, 0.2, 2.0]);

    let analytic = input_gradient(&mut ReLU::new(), &x);
    let numeric = finite_difference(|v| v.iter().map(|a| a.max(0.0)).sum(), &x, 1e-3);
    assert_close(&analytic, &numeric, 1e-2);
}

#[test]
fn test_relu_class() {
    let mut layer = ReLU::new();
    let input = Tensor::from_vec(vec![-1.0, 0.0, 1.0], true);
    let output = layer.forward(&input).unwrap();
    assert_eq!(output.data().to_vec(), vec![0.0, 0.0, 1.0]);
    assert_eq!(layer.num_parameters(), 0);

    let mut loss = sum(&output);
    backward(&mut loss, None);
    assert_eq!(input.grad().unwrap().to_vec(), vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_elu() {
    let alpha = 0.7;
    let x = vec![-2.0, -0.5, 0.3, 1.7];
    let expected: Vec<f32> = x
        .iter()
        .map(|&v: &f32| if v > 0.0 { v } else { alpha * (v.exp() - 1.0) })
        .collect();

    let y = elu(&Tensor::from_vec(x.clone(), false), alpha);
    assert_close(&y.data().to_vec(), &expected, 1e-6);

    let mut layer = ELU::new(alpha).unwrap();
    let analytic = input_gradient(&mut layer, &x);
    let numeric = finite_difference(
        |v| {
            v.iter()
                .map(|&a| if a > 0.0 { a } else { alpha * (a.exp() - 1.0) })
                .sum()
        },
        &x,
        1e-3,
    );
    assert_close(&analytic, &numeric, 1e-2);
}

#[test]
fn test_bce() {
    let target = Tensor::from_vec(vec![1.0, 0.0, 1.0, 0.0], false);
    let t = target.data().clone();
    let bce = |x: &[f32]| -> f32 {
        x.iter()
            .zip(t.iter())
            .map(|(&p, &y)| -(y * p.ln() + (1.0 - y) * (1.0 - p).ln()))
            .sum::<f32>()
            / x.len() as f32
    };

    let x = vec![0.9, 0.2, 0.6, 0.45];
    let input = Tensor::from_vec(x.clone(), true);
    let mut loss = BCELoss::new().forward(&input, &target).unwrap();
    assert_abs_diff_eq!(loss.data()[0], bce(&x), epsilon = 1e-6);

    backward(&mut loss, None);
    let numeric = finite_difference(bce, &x, 1e-3);
    assert_close(&input.grad().unwrap().to_vec(), &numeric, 1e-2);

    // Weighted sum reduction
    let weight = Array1::from(vec![1.0, 2.0, 0.5, 0.0]);
    let summed = BCELoss::new()
        .with_weight(weight.clone())
        .with_reduction(Reduction::Sum)
        .forward(&Tensor::from_vec(x.clone(), false), &target)
        .unwrap();
    let expected: f32 = x
        .iter()
        .zip(t.iter())
        .zip(weight.iter())
        .map(|((&p, &y), &w)| -w * (y * p.ln() + (1.0 - y) * (1.0 - p).ln()))
        .sum();
    assert_abs_diff_eq!(summed.data()[0], expected, epsilon = 1e-5);
}

#[test]
fn test_bce_after_sigmoid_trains() {
    let logits = Tensor::from_vec(vec![0.0, 0.0], true);
    let target = Tensor::from_vec(vec![1.0, 0.0], false);
    let mut params = vec![logits];
    let mut optimizer = SGD::with_params(1, SgdOptions::new(1.0)).unwrap();

    let mut losses = Vec::new();
    for _ in 0..20 {
        let loss = optimizer
            .step_with(&mut params, |p| {
                let mut loss = BCELoss::new().forward(&sigmoid(&p[0]), &target).unwrap();
                backward(&mut loss, None);
                loss.data()[0]
            })
            .unwrap();
        losses.push(loss);
    }

    assert!(losses.windows(2).all(|w| w[1] < w[0]));
    assert!(params[0].data()[0] > 0.0 && params[0].data()[1] < 0.0);
}

#[test]
fn test_nll_rejects_out_of_range_target() {
    let log_probs = Tensor::from_vec(vec![-1.0; CLASSES], false);
    assert!(NLLLoss::new(CLASSES).forward_indices(&log_probs, &[CLASSES]).is_err());
}

#[test]
fn test_check_net() {
    let mut net = Net::with_seed(1).unwrap();
    let mut optimizer = SGD::with_params(net.parameters().len(), SgdOptions::new(0.1)).unwrap();
    let (input, targets) = random_batch(2, 2);

    let output = net.forward(&input).unwrap();
    assert_eq!(output.len(), 2 * CLASSES);

    let loss = net.train_step(&mut optimizer, &input, &targets).unwrap();
    assert!(loss.is_finite());

    let (before, after) = check_net(1, 0.1).unwrap();
    assert!(before.is_finite() && after.is_finite());
}
