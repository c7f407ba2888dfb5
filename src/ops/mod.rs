//! Generic tensor operations that dispatch to backend implementations.
//!
//! These are the substrate primitives the fused operator is assembled from.
//! None of them record a graph: the only backward pass in this crate is the
//! hand-written one in [`crate::norm`] and [`crate::pipeline`].

use crate::backend::Backend;
use crate::error::Error;
use crate::tensor::Tensor;

// Declare CPU-specific implementation modules (used by CpuBackend)
pub mod cpu_ops;

// --- Elementwise Operations ---

/// Element-wise multiplication with broadcasting.
pub fn mul<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::mul(a.data(), b.data())?))
}

/// Element-wise addition with broadcasting.
pub fn add<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::add(a.data(), b.data())?))
}

/// Element-wise subtraction with broadcasting.
pub fn sub<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::sub(a.data(), b.data())?))
}

/// Element-wise division with broadcasting.
pub fn div<B: Backend>(a: &Tensor<B>, b: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::div(a.data(), b.data())?))
}

pub fn mul_scalar<B: Backend>(x: &Tensor<B>, scalar: f32) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::mul_scalar(x.data(), scalar)?))
}

pub fn add_scalar<B: Backend>(x: &Tensor<B>, scalar: f32) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::map(x.data(), move |v| v + scalar)?))
}

/// `1 / x` elementwise. Zeros map to infinity.
pub fn reciprocal<B: Backend>(x: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::map(x.data(), |v| 1.0 / v)?))
}

/// Leaky ReLU: `x` where `x > 0`, `x * negative_slope` elsewhere.
///
/// The slope is not restricted to `(0, 1)`; the fused backward pass calls this
/// with the reciprocal of the forward slope.
pub fn leaky_relu<B: Backend>(x: &Tensor<B>, negative_slope: f32) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::leaky_relu(x.data(), negative_slope)?))
}

// --- Reduction Operations ---

/// Computes the mean along `axis`.
///
/// # Arguments
/// * `x` - The input tensor
/// * `axis` - The axis to reduce
/// * `keep_dim` - When true the reduced axis is kept with length 1, so the
///   result broadcasts back against `x`
///
/// # Errors
/// * `Error::InvalidIndex` if `axis` is out of range
pub fn mean<B: Backend>(x: &Tensor<B>, axis: usize, keep_dim: bool) -> Result<Tensor<B>, Error> {
    let reduced = B::mean(x.data(), Some(axis))?;
    if keep_dim {
        Ok(Tensor::new(B::expand_dims(&reduced, axis)?))
    } else {
        Ok(Tensor::new(reduced))
    }
}

/// Euclidean norm along `axis`: `sqrt(sum(x^2))`.
pub fn l2_norm<B: Backend>(x: &Tensor<B>, axis: usize, keep_dim: bool) -> Result<Tensor<B>, Error> {
    let squared = B::square(x.data())?;
    let summed = B::sum_along_axis(&squared, axis)?;
    let norm = B::sqrt(&summed)?;
    if keep_dim {
        Ok(Tensor::new(B::expand_dims(&norm, axis)?))
    } else {
        Ok(Tensor::new(norm))
    }
}

/// Running sum along `axis`; the shape is preserved.
pub fn cumsum<B: Backend>(x: &Tensor<B>, axis: usize) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::cumsum(x.data(), axis)?))
}

// --- Layout Operations ---

/// Splits `x` into `parts` equal contiguous pieces along `axis`.
///
/// # Errors
/// * `Error::ShapeError` if the axis length is not divisible by `parts`; the
///   split never truncates.
pub fn chunk<B: Backend>(x: &Tensor<B>, parts: usize, axis: usize) -> Result<Vec<Tensor<B>>, Error> {
    let len = x.dim(axis)?;
    if parts == 0 || len % parts != 0 {
        return Err(Error::ShapeError(format!(
            "Cannot split axis {} of length {} into {} equal chunks (shape {:?})",
            axis,
            len,
            parts,
            x.shape()
        )));
    }
    let step = len / parts;
    let mut ranges: Vec<std::ops::Range<usize>> = x.shape().iter().map(|&d| 0..d).collect();
    (0..parts)
        .map(|i| {
            ranges[axis] = i * step..(i + 1) * step;
            Ok(Tensor::new(B::slice(x.data(), &ranges)?))
        })
        .collect()
}

/// Concatenates tensors along `axis`.
pub fn concat<B: Backend>(tensors: &[&Tensor<B>], axis: usize) -> Result<Tensor<B>, Error> {
    let storages: Vec<&B::Storage> = tensors.iter().map(|t| t.data()).collect();
    Ok(Tensor::new(B::concat(&storages, axis)?))
}

/// Zero padding along one axis.
pub fn pad<B: Backend>(
    x: &Tensor<B>,
    axis: usize,
    before: usize,
    after: usize,
) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::pad(x.data(), axis, before, after, 0.0)?))
}

/// Swaps two axes (`transpose(w, 0, 1)` exchanges a kernel's in/out channels).
pub fn transpose<B: Backend>(x: &Tensor<B>, axis_a: usize, axis_b: usize) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::swap_axes(x.data(), axis_a, axis_b)?))
}

// --- Convolution ---

/// Valid (unpadded) stride-1 1D convolution.
///
/// # Arguments
/// * `x` - Input of shape `[N, C_in, L]`
/// * `w` - Kernel of shape `[C_out, C_in, K]`
///
/// # Returns
/// Output of shape `[N, C_out, L - K + 1]`.
///
/// # Errors
/// * `Error::ShapeError` if either argument is not rank 3 or `L < K`
/// * `Error::IncompatibleShapes` if the channel counts disagree
pub fn conv1d<B: Backend>(x: &Tensor<B>, w: &Tensor<B>) -> Result<Tensor<B>, Error> {
    Ok(Tensor::new(B::conv1d(x.data(), w.data())?))
}

/// Fails with `Error::DeviceMismatch` unless every tensor is on the same device.
pub fn check_same_device<B: Backend>(tensors: &[&Tensor<B>]) -> Result<(), Error> {
    if let Some(first) = tensors.first() {
        let expected = first.device();
        if let Some(other) = tensors.iter().find(|t| t.device() != expected) {
            return Err(Error::DeviceMismatch {
                expected,
                actual: other.device(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuBackend;

    #[test]
    fn test_chunk_not_divisible() {
        let x = Tensor::<CpuBackend>::zeros(&[1, 4, 2]).unwrap();
        assert!(matches!(chunk(&x, 3, 1), Err(Error::ShapeError(_))));
    }

    #[test]
    fn test_mean_keep_dim_broadcasts() {
        let x = Tensor::<CpuBackend>::from_vec(vec![1.0, 2.0, 3.0, 5.0], &[1, 2, 2]).unwrap();
        let m = mean(&x, 1, true).unwrap();
        assert_eq!(m.shape(), &[1, 1, 2]);
        assert_eq!(m.to_vec().unwrap(), vec![2.0, 3.5]);
        let centered = sub(&x, &m).unwrap();
        assert_eq!(centered.to_vec().unwrap(), vec![-1.0, -1.5, 1.0, 1.5]);
    }
}
