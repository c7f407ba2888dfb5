//! Helpers for numeric testing of the hand-written gradients.

use crate::{Backend, Error, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Tensor of standard normal samples from a fixed seed.
pub fn random_tensor<B: Backend>(shape: &[usize], seed: u64) -> Result<Tensor<B>, Error> {
    let size = crate::util::checked_numel(shape)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..size).map(|_| StandardNormal.sample(&mut rng)).collect();
    Tensor::from_vec(data, shape)
}

/// Central finite-difference gradient of a scalar function of one tensor.
///
/// # Arguments
/// * `func`: A closure mapping the input to a scalar.
/// * `input`: The point at which to differentiate.
/// * `epsilon`: The perturbation size (e.g., 1e-3 for f32).
pub fn numerical_gradient<B, F>(func: F, input: &Tensor<B>, epsilon: f32) -> Result<Vec<f32>, Error>
where
    B: Backend,
    F: Fn(&Tensor<B>) -> Result<f32, Error>,
{
    let shape = input.shape().to_vec();
    let base = input.to_vec()?;
    let mut grad = Vec::with_capacity(base.len());

    for i in 0..base.len() {
        let mut plus = base.clone();
        plus[i] += epsilon;
        let loss_plus = func(&Tensor::from_vec(plus, &shape)?)?;

        let mut minus = base.clone();
        minus[i] -= epsilon;
        let loss_minus = func(&Tensor::from_vec(minus, &shape)?)?;

        grad.push((loss_plus - loss_minus) / (2.0 * epsilon));
    }
    Ok(grad)
}

/// Compares an analytical gradient with the finite-difference one.
///
/// # Returns
/// * `Ok(())` if every element matches within `tolerance` (absolute, or
///   relative for large magnitudes).
/// * `Err(Error::GradientCheckError)` describing the worst element otherwise.
pub fn check_gradient<B, F>(
    func: F,
    input: &Tensor<B>,
    analytical: &[f32],
    epsilon: f32,
    tolerance: f32,
) -> Result<(), Error>
where
    B: Backend,
    F: Fn(&Tensor<B>) -> Result<f32, Error>,
{
    let numerical = numerical_gradient(func, input, epsilon)?;
    if numerical.len() != analytical.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![numerical.len()],
            actual: vec![analytical.len()],
        });
    }

    let mut max_abs_error = 0.0f32;
    let mut max_rel_error = 0.0f32;
    let mut at_index = 0;
    for (i, (a, n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let abs_error = (a - n).abs();
        let rel_error = abs_error / a.abs().max(n.abs()).max(1e-8);
        if abs_error > max_abs_error {
            max_abs_error = abs_error;
            max_rel_error = rel_error;
            at_index = i;
        }
    }

    if max_abs_error > tolerance && max_rel_error > tolerance {
        return Err(Error::GradientCheckError {
            analytical: analytical.to_vec(),
            numerical,
            max_rel_error,
            max_abs_error,
            at_index,
        });
    }
    Ok(())
}

/// Panics with the first offending index unless `actual` and `expected`
/// agree elementwise within `tolerance`.
pub fn assert_all_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "length mismatch: {} vs {}",
        actual.len(),
        expected.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let scale = e.abs().max(1.0);
        assert!(
            (a - e).abs() <= tolerance * scale,
            "index {}: {} vs {} (tolerance {})",
            i,
            a,
            e,
            tolerance
        );
    }
}

/// Dot product of two tensors' contents, used to build scalar test losses.
pub fn weighted_sum<B: Backend>(t: &Tensor<B>, weights: &Tensor<B>) -> Result<f32, Error> {
    if t.shape() != weights.shape() {
        return Err(Error::ShapeMismatch {
            expected: weights.shape().to_vec(),
            actual: t.shape().to_vec(),
        });
    }
    let a = t.to_vec()?;
    let b = weights.to_vec()?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}
