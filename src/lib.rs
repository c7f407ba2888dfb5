//! A fused normalize-activate kernel with a hand-written gradient, threaded
//! through a three-stage causal convolution block.
//!
//! This library provides:
//! - A small tensor substrate (`Backend` trait, `ndarray`-backed CPU backend)
//! - The fused operator `norm_forward` / `norm_backward`
//! - The convolution pipeline with a recordable `Trace`
//! - A residual block and an exported two-function entry-point table
//!
//! # Features
//! - `debug_logs` - Prints stage shapes through `debug_println!`
//! - `serialization` - serde support for tensors, traces and `BlockConfig`
//! - `cpu_openblas` - OpenBLAS-backed matrix products for convolution
//!
//! # Example
//! ```rust
//! use fused_norm_lib::{block, BlockConfig, CpuBackend, Tensor, Weights};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BlockConfig::new(4, 1.0, 2, 1.0, 1.0)?;
//!     let weights = Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(0))?;
//!
//!     let x0 = Tensor::<CpuBackend>::zeros(&[2, 4, 5])?;
//!     let x1 = Tensor::<CpuBackend>::ones(&[2, 4, 5])?;
//!     let y = block::forward(&x0, &x1, &weights)?;
//!     assert_eq!(y.shape(), x0.shape());
//!
//!     let dy = Tensor::<CpuBackend>::ones(y.shape())?;
//!     let grads = block::backward(&y, &x1, &dy, &weights)?;
//!     assert_eq!(grads.grad_x1.shape(), x1.shape());
//!     Ok(())
//! }
//! ```

// --- Central debug_println macro definition ---
/// Conditional logging macro. Prints if 'debug_logs' feature is enabled.
#[cfg(feature = "debug_logs")]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        ::std::println!("[DEBUG {}] {}", module_path!(), ::std::format_args!($($arg)*))
    };
}

/// Conditional logging macro (disabled version). Does nothing.
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {};
}

pub mod array;
pub mod backend;
pub mod block;
pub mod config;
pub mod error;
pub mod init;
pub mod kernels;
pub mod norm;
pub mod ops;
pub mod pipeline;
pub mod tensor;
pub mod util;

pub mod test_utils;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Represents the device where a tensor's data resides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Device {
    /// CPU device
    Cpu,
}

// Re-export the public types for easier use by consumers of the library
pub use array::Array;
pub use backend::cpu::CpuBackend;
pub use backend::Backend;
pub use backend::CpuTensor;
pub use block::BackwardOutput;
pub use config::BlockConfig;
pub use error::Error;
pub use kernels::{KernelTable, CPU_KERNELS};
pub use norm::{norm_backward, norm_forward, ChunkTriple, NormGradients, NormalizeState};
pub use pipeline::{causal_mean, pipeline_backward, pipeline_forward, Trace, Weights};
pub use tensor::Tensor;
