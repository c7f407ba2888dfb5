//! Shape and initialisation parameters for one feed-forward block.

use crate::error::Error;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serialization")]
use std::path::Path;

/// Parameters describing one block.
///
/// The block maps `(B, features, L)` to `(B, features, L)`: `w0` widens to
/// three chunks of `intermediate()` channels, `w1` is the causal kernel of
/// width `kernel_size`, `w2` projects back to `features`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct BlockConfig {
    pub features: usize,
    pub intermediate_factor: f32,
    pub kernel_size: usize,
    /// Expected activation standard deviation; hidden kernels use gain `1 / activation_std`.
    pub activation_std: f32,
    /// Gain for the output kernel `w2`.
    pub init_scale: f32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            features: 16,
            intermediate_factor: 2.0,
            kernel_size: 3,
            activation_std: 1.0,
            init_scale: 1.0,
        }
    }
}

impl BlockConfig {
    /// Creates a config and validates it.
    pub fn new(
        features: usize,
        intermediate_factor: f32,
        kernel_size: usize,
        activation_std: f32,
        init_scale: f32,
    ) -> Result<Self, Error> {
        let config = Self {
            features,
            intermediate_factor,
            kernel_size,
            activation_std,
            init_scale,
        };
        config.validate()?;
        Ok(config)
    }

    /// Width of each of the three hidden chunks.
    pub fn intermediate(&self) -> usize {
        (self.features as f32 * self.intermediate_factor) as usize
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.features == 0 {
            return Err(Error::InvalidConfig("features must be non-zero".to_string()));
        }
        if self.kernel_size == 0 {
            return Err(Error::InvalidConfig("kernel_size must be non-zero".to_string()));
        }
        if !(self.intermediate_factor.is_finite() && self.intermediate_factor > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "intermediate_factor must be positive, got {}",
                self.intermediate_factor
            )));
        }
        if self.intermediate() == 0 {
            return Err(Error::InvalidConfig(format!(
                "features * intermediate_factor = {} * {} leaves no hidden channels",
                self.features, self.intermediate_factor
            )));
        }
        if !(self.activation_std.is_finite() && self.activation_std > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "activation_std must be positive, got {}",
                self.activation_std
            )));
        }
        if !(self.init_scale.is_finite() && self.init_scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "init_scale must be positive, got {}",
                self.init_scale
            )));
        }
        Ok(())
    }

    /// Shapes of `w0`, `w1`, `w2`.
    pub fn weight_shapes(&self) -> [Vec<usize>; 3] {
        let hidden = self.intermediate();
        [
            vec![3 * hidden, self.features, 1],
            vec![3 * hidden, hidden, self.kernel_size],
            vec![self.features, hidden, 1],
        ]
    }

    #[cfg(feature = "serialization")]
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            Error::DeserializationError(format!("Failed to parse block config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serialization")]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    #[cfg(feature = "serialization")]
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::SerializationError(format!("Failed to serialize block config: {}", e))
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
