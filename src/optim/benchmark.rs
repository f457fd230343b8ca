//! Synthetic objectives for optimizer testing

use ndarray::Array1;

/// Rosenbrock function `(1 - x)² + 100 (y - x²)²`, minimum 0 at `(1, 1)`
pub fn rosenbrock(point: &Array1<f32>) -> f32 {
    let (x, y) = (point[0], point[1]);
    (1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2)
}

/// Analytic gradient of [`rosenbrock`]
pub fn drosenbrock(point: &Array1<f32>) -> Array1<f32> {
    let (x, y) = (point[0], point[1]);
    Array1::from(vec![
        -400.0 * x * (y - x * x) - 2.0 * (1.0 - x),
        200.0 * (y - x * x),
    ])
}
