//! Residual wrapper around the convolution pipeline.
//!
//! `forward` adds the skip input `x0` to the pipeline output. `backward`
//! only produces the gradient for the pipeline branch; the skip branch's
//! identity gradient is left to the caller.

use crate::backend::Backend;
use crate::error::Error;
use crate::ops;
use crate::pipeline::{self, Trace, Weights};
use crate::tensor::Tensor;

/// Result of [`backward`].
#[derive(Debug, Clone)]
pub struct BackwardOutput<B: Backend> {
    /// `y1 - pipeline(x1)`. Not a gradient. When `y1` is the output of
    /// [`forward`] for the same `x1` and weights this recovers `x0` up to
    /// rounding.
    pub residual: Tensor<B>,
    /// Gradient with respect to the pipeline input `x1`.
    pub grad_x1: Tensor<B>,
}

impl<B: Backend> BackwardOutput<B> {
    pub fn into_tuple(self) -> (Tensor<B>, Tensor<B>) {
        (self.residual, self.grad_x1)
    }
}

/// `pipeline(x1) + x0`.
///
/// # Errors
/// * `Error::DeviceMismatch` if the arguments live on different devices
/// * Shape errors from the pipeline, or from the residual add when the
///   pipeline output does not match `x0`
pub fn forward<B: Backend>(
    x0: &Tensor<B>,
    x1: &Tensor<B>,
    weights: &Weights<B>,
) -> Result<Tensor<B>, Error> {
    pipeline::check_devices(&[x0, x1], weights)?;
    let trace = pipeline::pipeline_forward(x1, weights)?;
    residual_add(trace.output(), x0)
}

/// Gradient of the block, recomputing the forward trace from `x1`.
pub fn backward<B: Backend>(
    y1: &Tensor<B>,
    x1: &Tensor<B>,
    dy: &Tensor<B>,
    weights: &Weights<B>,
) -> Result<BackwardOutput<B>, Error> {
    pipeline::check_devices(&[y1, x1, dy], weights)?;
    debug_println!("block::backward: recomputing trace for x1 {:?}", x1.shape());
    let trace = pipeline::pipeline_forward(x1, weights)?;
    backward_with_trace(y1, &trace, dy, weights)
}

/// Gradient of the block from a trace the caller kept from an earlier
/// [`pipeline::pipeline_forward`] call.
pub fn backward_with_trace<B: Backend>(
    y1: &Tensor<B>,
    trace: &Trace<B>,
    dy: &Tensor<B>,
    weights: &Weights<B>,
) -> Result<BackwardOutput<B>, Error> {
    pipeline::check_devices(&[y1, dy, trace.output()], weights)?;
    let grad_x1 = pipeline::pipeline_backward(trace, dy, weights)?;
    let residual = ops::sub(y1, trace.output())?;
    Ok(BackwardOutput { residual, grad_x1 })
}

fn residual_add<B: Backend>(output: &Tensor<B>, x0: &Tensor<B>) -> Result<Tensor<B>, Error> {
    if output.shape() != x0.shape() {
        return Err(Error::ShapeMismatch {
            expected: x0.shape().to_vec(),
            actual: output.shape().to_vec(),
        });
    }
    ops::add(output, x0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuBackend;

    #[test]
    fn test_residual_add_rejects_broadcast() {
        let out = Tensor::<CpuBackend>::zeros(&[1, 2, 1]).unwrap();
        let x0 = Tensor::<CpuBackend>::zeros(&[1, 2, 3]).unwrap();
        assert!(matches!(
            residual_add(&out, &x0),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
