use crate::{backend::Backend, error::Error, Device};

#[cfg(feature = "serialization")]
use serde::de;
#[cfg(feature = "serialization")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
#[cfg(feature = "serialization")]
use std::fs::File;
#[cfg(feature = "serialization")]
use std::io::{BufReader, BufWriter};
#[cfg(feature = "serialization")]
use std::path::Path;

// Define a serializable representation of a tensor
#[cfg(feature = "serialization")]
#[derive(Serialize, Deserialize)]
struct SerializableTensor {
    data: Vec<f32>,
    shape: Vec<usize>,
    device: Device,
}

/// A dense, immutable multi-dimensional array living on one device.
///
/// Every operation produces a new tensor; nothing is mutated across calls. The
/// fused kernel only ever sees rank-3 `(batch, channels, length)` tensors and
/// rank-3 `(out_channels, in_channels, kernel_width)` convolution weights, but
/// the type itself is rank-agnostic.
///
/// # Example
/// ```rust
/// use fused_norm_lib::{CpuBackend, Tensor};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let x = Tensor::<CpuBackend>::from_vec(vec![1.0, 2.0, 3.0], &[1, 3, 1])?;
///     assert_eq!(x.shape(), &[1, 3, 1]);
///     assert_eq!(x.to_vec()?, vec![1.0, 2.0, 3.0]);
///     Ok(())
/// }
/// ```
///
/// # Type Parameters
/// * `B` - The backend type that implements the `Backend` trait
pub struct Tensor<B: Backend> {
    data: B::Storage,
    device: Device,
}

impl<B: Backend> Clone for Tensor<B> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            device: self.device,
        }
    }
}

impl<B: Backend> std::fmt::Debug for Tensor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &B::shape(&self.data))
            .field("device", &self.device)
            .field("data", &self.data)
            .finish()
    }
}

impl<B: Backend> Tensor<B> {
    /// Wraps backend storage, recording the device it lives on.
    pub fn new(data: B::Storage) -> Self {
        let device = B::device(&data);
        Self { data, device }
    }

    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, Error> {
        Ok(Self::new(B::from_vec(data, shape)?))
    }

    pub fn zeros(shape: &[usize]) -> Result<Self, Error> {
        Ok(Self::new(B::zeros(shape)?))
    }

    pub fn ones(shape: &[usize]) -> Result<Self, Error> {
        Ok(Self::new(B::ones(shape)?))
    }

    /// Tensor with every element drawn from N(mean, std_dev^2).
    pub fn randn(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self, Error> {
        Ok(Self::new(B::random_normal(shape, mean, std_dev)?))
    }

    pub fn shape(&self) -> &[usize] {
        B::shape(&self.data)
    }

    /// Length of a single dimension.
    pub fn dim(&self, axis: usize) -> Result<usize, Error> {
        self.shape()
            .get(axis)
            .copied()
            .ok_or_else(|| Error::InvalidIndex(vec![axis]))
    }

    pub fn size(&self) -> usize {
        B::size(&self.data)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn data(&self) -> &B::Storage {
        &self.data
    }

    /// Copies the elements to a host vector in row-major order.
    pub fn to_vec(&self) -> Result<Vec<f32>, Error> {
        B::copy_to_host(&self.data)
    }

    /// Bitwise equality of shape and contents.
    pub fn bit_eq(&self, other: &Self) -> Result<bool, Error> {
        if self.shape() != other.shape() {
            return Ok(false);
        }
        let a = self.to_vec()?;
        let b = other.to_vec()?;
        Ok(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()))
    }

    #[cfg(feature = "serialization")]
    /// Saves the tensor to a JSON file.
    ///
    /// # Errors
    /// * Returns an error if the file cannot be created or written
    /// * Returns an error if serialization fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path)
            .map_err(|e| Error::IoErrorString(format!("Failed to create file: {}", e)))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)
            .map_err(|e| Error::SerializationError(format!("Failed to serialize tensor: {}", e)))
    }

    #[cfg(feature = "serialization")]
    /// Loads a tensor previously written by `save_to_file`.
    ///
    /// # Errors
    /// * Returns an error if the file cannot be opened or read
    /// * Returns an error if deserialization fails or the device does not match `B`
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)
            .map_err(|e| Error::IoErrorString(format!("Failed to open file: {}", e)))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            Error::DeserializationError(format!("Failed to deserialize tensor: {}", e))
        })
    }
}

#[cfg(feature = "serialization")]
impl<B: Backend> Serialize for Tensor<B> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let serializable = SerializableTensor {
            data: B::copy_to_host(&self.data).map_err(|e| {
                serde::ser::Error::custom(format!("Failed to convert tensor data to vec: {}", e))
            })?,
            shape: B::shape(&self.data).to_vec(),
            device: self.device,
        };
        serializable.serialize(serializer)
    }
}

#[cfg(feature = "serialization")]
impl<'de, B: Backend> Deserialize<'de> for Tensor<B> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let serializable = SerializableTensor::deserialize(deserializer)?;

        // Check device compatibility by creating a small tensor and checking its device
        let temp_storage = B::zeros(&[1])
            .map_err(|e| de::Error::custom(format!("Failed to create temporary storage: {}", e)))?;
        let expected_device = B::device(&temp_storage);
        if serializable.device != expected_device {
            return Err(de::Error::custom(format!(
                "Device mismatch: tensor was serialized with device {:?} but trying to deserialize with {:?}",
                serializable.device, expected_device
            )));
        }

        let data = B::from_host_vec(serializable.data, &serializable.shape, serializable.device)
            .map_err(|e| de::Error::custom(format!("Failed to create tensor storage: {}", e)))?;
        Ok(Tensor::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuBackend;

    #[test]
    fn test_dim_out_of_range() {
        let t = Tensor::<CpuBackend>::zeros(&[2, 3, 4]).unwrap();
        assert_eq!(t.dim(1).unwrap(), 3);
        assert!(matches!(t.dim(3), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let result = Tensor::<CpuBackend>::from_vec(vec![1.0, 2.0], &[1, 3, 1]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_randn_shape_and_bad_std() {
        let t = Tensor::<CpuBackend>::randn(&[4, 8], 0.0, 1.0).unwrap();
        assert_eq!(t.size(), 32);
        assert!(t.to_vec().unwrap().iter().all(|v| v.is_finite()));
        assert!(matches!(
            Tensor::<CpuBackend>::randn(&[2], 0.0, -1.0),
            Err(Error::InitializationError)
        ));
    }

    #[test]
    fn test_bit_eq() {
        let a = Tensor::<CpuBackend>::from_vec(vec![1.0, -0.0], &[2]).unwrap();
        let b = Tensor::<CpuBackend>::from_vec(vec![1.0, 0.0], &[2]).unwrap();
        assert!(a.bit_eq(&a.clone()).unwrap());
        assert!(!a.bit_eq(&b).unwrap());
    }
}
