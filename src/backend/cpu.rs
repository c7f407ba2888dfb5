//! CPU backend implementation using `ndarray`.

use crate::array::Array; // The storage type for this backend
use crate::backend::Backend;
use crate::error::Error;
use crate::ops::cpu_ops;
use rand::Rng;
use rand_distr::Normal;
use std::fmt::{self, Debug, Display};

/// Marker struct for the CPU backend.
/// Implements the `Backend` trait using `ndarray` operations via the `Array` wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    type Storage = Array;

    // --- Factory Methods ---
    fn zeros(shape: &[usize]) -> Result<Self::Storage, Error> {
        Ok(Array::zeros(shape))
    }

    fn ones(shape: &[usize]) -> Result<Self::Storage, Error> {
        Ok(Array::ones(shape))
    }

    fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self::Storage, Error> {
        Array::from_vec(data, shape)
    }

    fn random_normal(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self::Storage, Error> {
        let size = crate::util::checked_numel(shape)?;
        if size == 0 {
            return Ok(Array::zeros(shape));
        }
        let dist = Normal::new(mean, std_dev).map_err(|_| Error::InitializationError)?;
        let mut rng = rand::rng();
        let data: Vec<f32> = (0..size).map(|_| rng.sample(dist)).collect();
        Array::from_vec(data, shape)
    }

    // --- Shape/Data Access ---
    fn device(_storage: &Self::Storage) -> crate::Device {
        crate::Device::Cpu
    }

    fn shape(storage: &Self::Storage) -> &[usize] {
        storage.shape()
    }

    fn size(storage: &Self::Storage) -> usize {
        storage.size()
    }

    fn into_raw_vec(storage: Self::Storage) -> Result<Vec<f32>, Error> {
        Ok(storage.into_raw_vec())
    }

    fn copy_to_host(storage: &Self::Storage) -> Result<Vec<f32>, Error> {
        Ok(storage.get_data().iter().copied().collect())
    }

    // --- Elementwise ---
    fn mul(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::mul(a, b)
    }

    fn add(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::add(a, b)
    }

    fn sub(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::sub(a, b)
    }

    fn div(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::div(a, b)
    }

    fn mul_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error> {
        Ok(Array::new(x.get_data() * scalar))
    }

    fn sqrt(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::sqrt(x)
    }

    fn square(x: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::square(x)
    }

    fn map<F>(x: &Self::Storage, f: F) -> Result<Self::Storage, Error>
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        Ok(Array::new(x.get_data().mapv(f)))
    }

    fn leaky_relu(x: &Self::Storage, negative_slope: f32) -> Result<Self::Storage, Error> {
        cpu_ops::leaky_relu(x, negative_slope)
    }

    // --- Reduction Operations ---
    fn mean(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error> {
        cpu_ops::mean(x, axis)
    }

    fn sum_along_axis(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error> {
        x.sum_along_axis(axis)
    }

    fn cumsum(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error> {
        cpu_ops::cumsum(x, axis)
    }

    // --- Layout Operations ---
    fn expand_dims(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error> {
        cpu_ops::expand_dims(x, axis)
    }

    fn slice(x: &Self::Storage, ranges: &[std::ops::Range<usize>]) -> Result<Self::Storage, Error> {
        cpu_ops::slice(x, ranges)
    }

    fn concat(tensors_data: &[&Self::Storage], axis: usize) -> Result<Self::Storage, Error> {
        cpu_ops::concat(tensors_data, axis)
    }

    fn pad(
        x: &Self::Storage,
        axis: usize,
        before: usize,
        after: usize,
        value: f32,
    ) -> Result<Self::Storage, Error> {
        cpu_ops::pad(x, axis, before, after, value)
    }

    fn swap_axes(x: &Self::Storage, axis_a: usize, axis_b: usize) -> Result<Self::Storage, Error> {
        cpu_ops::swap_axes(x, axis_a, axis_b)
    }

    fn conv1d(input: &Self::Storage, weights: &Self::Storage) -> Result<Self::Storage, Error> {
        cpu_ops::conv1d(input, weights)
    }
}

// --- Implement Debug, Display for Array ---
// These are needed to satisfy the Backend::Storage trait bounds for Array.

impl Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_data())
    }
}

impl Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Array(shape={:?}, data={:?})",
            self.shape(),
            self.get_data()
        )
    }
}
