//! Three-stage causal convolution pipeline and its mirrored gradient pipeline.
//!
//! Forward:
//!
//! ```text
//! conv(w0) -> split 3, causal mean on chunk 0 -> norm
//!          -> left pad, conv(w1) -> split 3 -> norm
//!          -> conv(w2)
//! ```
//!
//! Backward runs the same stages in reverse with channel-transposed kernels.

use crate::backend::Backend;
use crate::config::BlockConfig;
use crate::error::Error;
use crate::init;
use crate::norm::{self, ChunkTriple, NormalizeState, LENGTH_AXIS};
use crate::ops;
use crate::tensor::Tensor;
use rand::Rng;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Convolution kernels of one block, each `[C_out, C_in, K]`. Read-only here.
#[derive(Debug, Clone)]
pub struct Weights<B: Backend> {
    pub w0: Tensor<B>,
    pub w1: Tensor<B>,
    pub w2: Tensor<B>,
}

impl<B: Backend> Weights<B> {
    pub fn new(w0: Tensor<B>, w1: Tensor<B>, w2: Tensor<B>) -> Self {
        Self { w0, w1, w2 }
    }

    /// Orthogonally initialised kernels for `config`.
    ///
    /// `w0` and `w1` use gain `1 / activation_std`, `w2` uses `init_scale`.
    pub fn init<R: Rng + ?Sized>(config: &BlockConfig, rng: &mut R) -> Result<Self, Error> {
        config.validate()?;
        let [s0, s1, s2] = config.weight_shapes();
        let hidden_gain = 1.0 / config.activation_std;
        let w0 = init::orthogonal(&s0, hidden_gain, rng)?;
        let w1 = init::orthogonal(&s1, hidden_gain, rng)?;
        let w2 = init::orthogonal(&s2, config.init_scale, rng)?;
        Ok(Self {
            w0: Tensor::new(B::from_vec(w0.into_raw_vec(), &s0)?),
            w1: Tensor::new(B::from_vec(w1.into_raw_vec(), &s1)?),
            w2: Tensor::new(B::from_vec(w2.into_raw_vec(), &s2)?),
        })
    }

    /// Left padding that makes the `w1` convolution causal: `kernel_width(w1) - 1`.
    pub fn causal_padding(&self) -> Result<usize, Error> {
        let width = self.w1.dim(2)?;
        width.checked_sub(1).ok_or_else(|| {
            Error::ShapeError("w1 must have a kernel width of at least 1".to_string())
        })
    }

    fn all(&self) -> [&Tensor<B>; 3] {
        [&self.w0, &self.w1, &self.w2]
    }
}

/// Forward intermediates sufficient to run [`pipeline_backward`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(bound = ""))]
pub struct Trace<B: Backend> {
    pub state0: NormalizeState<B>,
    pub state1: NormalizeState<B>,
    /// Output of the final convolution.
    pub output: Tensor<B>,
}

impl<B: Backend> Trace<B> {
    pub fn output(&self) -> &Tensor<B> {
        &self.output
    }

    /// Flattens into the ordered 9-tuple
    /// `(act0, chunk00, chunk01, inv0, act1, chunk10, chunk11, inv1, output)`.
    pub fn into_parts(self) -> [Tensor<B>; 9] {
        let Trace {
            state0,
            state1,
            output,
        } = self;
        [
            state0.activated,
            state0.chunk0,
            state0.chunk1,
            state0.inv_scale,
            state1.activated,
            state1.chunk0,
            state1.chunk1,
            state1.inv_scale,
            output,
        ]
    }

    /// Inverse of [`Trace::into_parts`].
    pub fn from_parts(parts: [Tensor<B>; 9]) -> Self {
        let [a0, c00, c01, s0, a1, c10, c11, s1, output] = parts;
        Trace {
            state0: NormalizeState {
                activated: a0,
                chunk0: c00,
                chunk1: c01,
                inv_scale: s0,
            },
            state1: NormalizeState {
                activated: a1,
                chunk0: c10,
                chunk1: c11,
                inv_scale: s1,
            },
            output,
        }
    }
}

/// Running mean along the length axis: position `i` holds the sum of
/// positions `0..=i` divided by `i + 1`.
pub fn causal_mean<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    let length = x.dim(LENGTH_AXIS)?;
    let divisor = Tensor::<B>::from_vec(
        (1..=length).map(|i| i as f32).collect(),
        &[1, 1, length],
    )?;
    ops::div(&ops::cumsum(x, LENGTH_AXIS)?, &divisor)
}

/// Runs the three convolution stages and records the trace.
///
/// # Arguments
/// * `x1` - Input of shape `[B, C_in, L]`
/// * `weights` - `w0: [3C, C_in, K0]`, `w1: [3D, C, K1]`, `w2: [C_out, D, K2]`
///
/// # Errors
/// * `Error::ShapeError` if a channel count entering a split is not a multiple of 3
/// * Convolution shape errors from the substrate
pub fn pipeline_forward<B: Backend>(
    x1: &Tensor<B>,
    weights: &Weights<B>,
) -> Result<Trace<B>, Error> {
    let hidden = ops::conv1d(x1, &weights.w0)?;
    debug_println!("pipeline_forward: conv0 {:?} -> {:?}", x1.shape(), hidden.shape());

    let mut chunks = ChunkTriple::split(&hidden)?;
    chunks.c0 = causal_mean(&chunks.c0)?;
    let state0 = norm::norm_forward(chunks)?;

    let padded = ops::pad(&state0.activated, LENGTH_AXIS, weights.causal_padding()?, 0)?;
    let hidden = ops::conv1d(&padded, &weights.w1)?;
    debug_println!("pipeline_forward: conv1 {:?} -> {:?}", padded.shape(), hidden.shape());

    let state1 = norm::norm_forward(ChunkTriple::split(&hidden)?)?;
    let output = ops::conv1d(&state1.activated, &weights.w2)?;
    debug_println!("pipeline_forward: conv2 -> {:?}", output.shape());

    Ok(Trace {
        state0,
        state1,
        output,
    })
}

/// Propagates `dy` back through a recorded trace, returning the gradient
/// with respect to the pipeline input `x1`.
///
/// Each convolution is reversed by convolving with the kernel whose in/out
/// channels are swapped. For chunk 0 of the first stage the causal mean is
/// applied again in place of its exact transpose.
pub fn pipeline_backward<B: Backend>(
    trace: &Trace<B>,
    dy: &Tensor<B>,
    weights: &Weights<B>,
) -> Result<Tensor<B>, Error> {
    let w2_t = ops::transpose(&weights.w2, 0, 1)?;
    let d_tmp = ops::conv1d(dy, &w2_t)?;
    let d_tmp = norm::norm_backward(&trace.state1, &d_tmp)?.concat()?;
    debug_println!("pipeline_backward: stage1 grad {:?}", d_tmp.shape());

    let w1_t = ops::transpose(&weights.w1, 0, 1)?;
    let padded = ops::pad(&d_tmp, LENGTH_AXIS, weights.causal_padding()?, 0)?;
    let d_tmp = ops::conv1d(&padded, &w1_t)?;

    let mut d_norm = norm::norm_backward(&trace.state0, &d_tmp)?;
    d_norm.d_chunk0 = causal_mean(&d_norm.d_chunk0)?;
    let d_tmp = d_norm.concat()?;
    debug_println!("pipeline_backward: stage0 grad {:?}", d_tmp.shape());

    let w0_t = ops::transpose(&weights.w0, 0, 1)?;
    ops::conv1d(&d_tmp, &w0_t)
}

/// Checks that every weight and activation shares a device.
pub(crate) fn check_devices<B: Backend>(
    tensors: &[&Tensor<B>],
    weights: &Weights<B>,
) -> Result<(), Error> {
    let mut all: Vec<&Tensor<B>> = tensors.to_vec();
    all.extend(weights.all());
    ops::check_same_device(&all)
}
