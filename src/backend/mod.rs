//! Backend trait definition and module structure.
//!
//! The backend is the tensor substrate underneath the fused kernel: storage,
//! elementwise arithmetic, reductions, layout changes and convolution. The
//! fused operator and the pipeline are written against this trait only.

use crate::error::Error;
use std::fmt::{Debug, Display};

pub mod cpu;

pub type CpuTensor = crate::tensor::Tensor<cpu::CpuBackend>;

pub trait Backend: Sized + Debug + Clone {
    type Storage: Clone + Debug + Display;

    // --- Factory Methods (Creating Storage) ---

    /// Creates new storage filled with zeros.
    fn zeros(shape: &[usize]) -> Result<Self::Storage, Error>;
    /// Creates new storage filled with ones.
    fn ones(shape: &[usize]) -> Result<Self::Storage, Error>;
    /// Creates new storage from a flat vector and a shape.
    fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self::Storage, Error>;

    #[cfg(feature = "serialization")]
    /// Creates new storage from a host vector, shape, and device.
    /// This is used for deserialization to create storage on the appropriate device.
    fn from_host_vec(
        data: Vec<f32>,
        shape: &[usize],
        _device: crate::Device,
    ) -> Result<Self::Storage, Error> {
        Self::from_vec(data, shape)
    }

    // --- Random Generation Methods ---
    /// Creates new storage filled with values from a normal distribution N(mean, std_dev^2).
    fn random_normal(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self::Storage, Error>;

    // --- Shape/Data Access ---

    /// Returns the device of the storage.
    fn device(storage: &Self::Storage) -> crate::Device;
    /// Returns the shape of the storage.
    fn shape(storage: &Self::Storage) -> &[usize];
    /// Returns the total number of elements in the storage.
    fn size(storage: &Self::Storage) -> usize;
    /// Consumes the storage and returns its data as a flat `Vec<f32>`.
    fn into_raw_vec(storage: Self::Storage) -> Result<Vec<f32>, Error>;
    /// Copies the storage to a host vector in row-major order.
    fn copy_to_host(storage: &Self::Storage) -> Result<Vec<f32>, Error>;

    // --- Elementwise Operations (numpy broadcasting) ---

    fn mul(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn add(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn sub(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn div(a: &Self::Storage, b: &Self::Storage) -> Result<Self::Storage, Error>;
    fn mul_scalar(x: &Self::Storage, scalar: f32) -> Result<Self::Storage, Error>;
    fn sqrt(x: &Self::Storage) -> Result<Self::Storage, Error>;
    fn square(x: &Self::Storage) -> Result<Self::Storage, Error>;

    /// Applies an arbitrary function elementwise.
    fn map<F>(x: &Self::Storage, f: F) -> Result<Self::Storage, Error>
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static;

    /// Leaky ReLU with a caller-chosen slope for non-positive inputs.
    fn leaky_relu(x: &Self::Storage, negative_slope: f32) -> Result<Self::Storage, Error>;

    // --- Reduction Operations ---

    /// Computes the mean along `axis` (removing it), or the global mean if `None`.
    fn mean(x: &Self::Storage, axis: Option<usize>) -> Result<Self::Storage, Error>;
    /// Sums along `axis`, removing it.
    fn sum_along_axis(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error>;
    /// Running sum along `axis`, shape preserved.
    fn cumsum(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error>;

    // --- Layout Operations ---

    /// Inserts a new dimension of size 1 at the specified axis.
    fn expand_dims(x: &Self::Storage, axis: usize) -> Result<Self::Storage, Error>;

    /// Extracts a slice from a tensor along specified dimensions.
    ///
    /// # Arguments
    /// * `x` - The input tensor storage
    /// * `ranges` - One range per dimension
    fn slice(x: &Self::Storage, ranges: &[std::ops::Range<usize>]) -> Result<Self::Storage, Error>;

    /// Concatenates multiple tensors along a specified axis.
    fn concat(tensors_data: &[&Self::Storage], axis: usize) -> Result<Self::Storage, Error>;

    /// Constant padding along a single axis.
    fn pad(
        x: &Self::Storage,
        axis: usize,
        before: usize,
        after: usize,
        value: f32,
    ) -> Result<Self::Storage, Error>;

    /// Swaps two axes, returning contiguous storage.
    fn swap_axes(x: &Self::Storage, axis_a: usize, axis_b: usize) -> Result<Self::Storage, Error>;

    // --- Convolution ---

    /// 1D convolution (NCL format), stride 1, no padding, no bias.
    /// input: [N, C_in, L]
    /// weights: [C_out, C_in, K]
    /// output: [N, C_out, L - K + 1]
    fn conv1d(input: &Self::Storage, weights: &Self::Storage) -> Result<Self::Storage, Error>;
}
