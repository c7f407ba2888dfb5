//! Fused normalize-activate operator and its hand-derived backward pass.
//!
//! Forward, for three equally shaped `(B, C, L)` inputs:
//!
//! ```text
//! combined  = c0 * c1 + c2
//! centered  = combined - mean_c(combined)
//! inv_scale = 1 / (||centered||_c * sqrt(1 / C) + 1e-6)
//! activated = leaky_relu(centered * inv_scale, 0.02)
//! ```
//!
//! The backward pass is a closed-form approximation, not the exact gradient.
//! It drops the dependence of the channel mean and of `inv_scale` on
//! `combined`, and stands in for the activation derivative with the forward
//! leaky ReLU evaluated at slope `1 / 0.02`. Callers relying on the numeric
//! behaviour of the fused kernel depend on exactly this approximation.

use crate::backend::Backend;
use crate::error::Error;
use crate::ops;
use crate::tensor::Tensor;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Additive term keeping `inv_scale` finite when a channel column is constant.
pub const NORM_EPSILON: f32 = 1e-6;
/// Slope applied to non-positive values by the forward activation.
pub const NEGATIVE_SLOPE: f32 = 0.02;
/// Axis holding channels in `(batch, channels, length)` tensors.
pub const CHANNEL_AXIS: usize = 1;
/// Axis holding sequence positions in `(batch, channels, length)` tensors.
pub const LENGTH_AXIS: usize = 2;

/// Three equally shaped inputs to the fused operator.
///
/// `c0` and `c1` are multiplied together, `c2` is added, so the order matters.
#[derive(Debug, Clone)]
pub struct ChunkTriple<B: Backend> {
    pub c0: Tensor<B>,
    pub c1: Tensor<B>,
    pub c2: Tensor<B>,
}

impl<B: Backend> ChunkTriple<B> {
    pub fn new(c0: Tensor<B>, c1: Tensor<B>, c2: Tensor<B>) -> Self {
        Self { c0, c1, c2 }
    }

    /// Splits `x` into three equal parts along the channel axis.
    ///
    /// # Errors
    /// * `Error::ShapeError` if the channel count is not a multiple of 3
    pub fn split(x: &Tensor<B>) -> Result<Self, Error> {
        let mut parts = ops::chunk(x, 3, CHANNEL_AXIS)?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(c0), Some(c1), Some(c2)) => Ok(Self { c0, c1, c2 }),
            _ => Err(Error::ShapeError(format!(
                "Expected three channel chunks from shape {:?}",
                x.shape()
            ))),
        }
    }
}

/// Everything the backward pass needs from one forward call.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(bound = ""))]
pub struct NormalizeState<B: Backend> {
    /// Output of the activation.
    pub activated: Tensor<B>,
    pub chunk0: Tensor<B>,
    pub chunk1: Tensor<B>,
    /// Per-column reciprocal scale, shape `(B, 1, L)`, always positive.
    pub inv_scale: Tensor<B>,
}

/// Gradients with respect to the three fused inputs.
#[derive(Debug, Clone)]
pub struct NormGradients<B: Backend> {
    pub d_chunk0: Tensor<B>,
    pub d_chunk1: Tensor<B>,
    pub d_chunk2: Tensor<B>,
}

impl<B: Backend> NormGradients<B> {
    /// Joins the three gradients along the channel axis in input order.
    pub fn concat(&self) -> Result<Tensor<B>, Error> {
        ops::concat(&[&self.d_chunk0, &self.d_chunk1, &self.d_chunk2], CHANNEL_AXIS)
    }
}

/// Runs the fused combine / center / scale / activate step.
///
/// # Errors
/// Shape errors from the elementwise substrate ops propagate unchanged.
pub fn norm_forward<B: Backend>(chunks: ChunkTriple<B>) -> Result<NormalizeState<B>, Error> {
    let ChunkTriple { c0, c1, c2 } = chunks;

    let combined = ops::add(&ops::mul(&c0, &c1)?, &c2)?;
    let centered = ops::sub(&combined, &ops::mean(&combined, CHANNEL_AXIS, true)?)?;

    let channels = centered.dim(CHANNEL_AXIS)?;
    let norm = ops::l2_norm(&centered, CHANNEL_AXIS, true)?;
    let rms_scale = (1.0 / channels as f32).sqrt();
    let inv_scale = ops::reciprocal(&ops::add_scalar(
        &ops::mul_scalar(&norm, rms_scale)?,
        NORM_EPSILON,
    )?)?;

    let activated = ops::leaky_relu(&ops::mul(&centered, &inv_scale)?, NEGATIVE_SLOPE)?;

    Ok(NormalizeState {
        activated,
        chunk0: c0,
        chunk1: c1,
        inv_scale,
    })
}

/// Closed-form approximate backward of [`norm_forward`].
///
/// ```text
/// g    = d_out * inv_scale - leaky_relu(activated, 1 / 0.02) * inv_scale * mean_c(d_out)
/// d_c0 = g * c1
/// d_c1 = g * c0
/// d_c2 = g
/// ```
///
/// `d_out` is used as given. It is not centred by `mean_c(activated)` first.
pub fn norm_backward<B: Backend>(
    state: &NormalizeState<B>,
    d_out: &Tensor<B>,
) -> Result<NormGradients<B>, Error> {
    let d_mean = ops::mean(d_out, CHANNEL_AXIS, true)?;
    let slope_term = ops::leaky_relu(&state.activated, 1.0 / NEGATIVE_SLOPE)?;

    let direct = ops::mul(d_out, &state.inv_scale)?;
    let correction = ops::mul(&ops::mul(&slope_term, &state.inv_scale)?, &d_mean)?;
    let grad = ops::sub(&direct, &correction)?;

    Ok(NormGradients {
        d_chunk0: ops::mul(&grad, &state.chunk1)?,
        d_chunk1: ops::mul(&grad, &state.chunk0)?,
        d_chunk2: grad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuBackend;

    fn t(data: Vec<f32>, shape: &[usize]) -> Tensor<CpuBackend> {
        Tensor::from_vec(data, shape).unwrap()
    }

    #[test]
    fn test_constant_column_hits_epsilon() {
        let c0 = Tensor::<CpuBackend>::ones(&[1, 3, 1]).unwrap();
        let c1 = t(vec![2.0, 2.0, 2.0], &[1, 3, 1]);
        let c2 = Tensor::<CpuBackend>::zeros(&[1, 3, 1]).unwrap();
        let state = norm_forward(ChunkTriple::new(c0, c1, c2)).unwrap();

        assert_eq!(state.inv_scale.shape(), &[1, 1, 1]);
        let inv = state.inv_scale.to_vec().unwrap()[0];
        assert!((inv - 1e6).abs() / 1e6 < 1e-4, "inv_scale = {}", inv);
        assert_eq!(state.activated.to_vec().unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_split_requires_multiple_of_three() {
        let x = Tensor::<CpuBackend>::zeros(&[2, 5, 4]).unwrap();
        assert!(matches!(ChunkTriple::split(&x), Err(Error::ShapeError(_))));
    }

    #[test]
    fn test_gradients_concat_order() {
        let grads = NormGradients {
            d_chunk0: t(vec![1.0], &[1, 1, 1]),
            d_chunk1: t(vec![2.0], &[1, 1, 1]),
            d_chunk2: t(vec![3.0], &[1, 1, 1]),
        };
        let joined = grads.concat().unwrap();
        assert_eq!(joined.shape(), &[1, 3, 1]);
        assert_eq!(joined.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    }
}
