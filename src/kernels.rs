//! Exported entry-point table.
//!
//! Hosts see exactly two functions, `forward` and `backward`, taking the
//! weights as loose tensors in the order `w0, w1, w2`.

use crate::backend::cpu::CpuBackend;
use crate::backend::Backend;
use crate::block;
use crate::error::Error;
use crate::pipeline::Weights;
use crate::tensor::Tensor;
use lazy_static::lazy_static;

/// `forward(x0, x1, w0, w1, w2) -> output`
pub type ForwardFn<B> = fn(
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
) -> Result<Tensor<B>, Error>;

/// `backward(y1, x1, dy, w0, w1, w2) -> (residual, grad_x1)`
pub type BackwardFn<B> = fn(
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
    &Tensor<B>,
) -> Result<(Tensor<B>, Tensor<B>), Error>;

/// One of the two exported functions.
pub enum EntryPoint<B: Backend> {
    Forward(ForwardFn<B>),
    Backward(BackwardFn<B>),
}

pub struct KernelTable<B: Backend> {
    pub forward: ForwardFn<B>,
    pub backward: BackwardFn<B>,
}

impl<B: Backend> KernelTable<B> {
    pub fn new() -> Self {
        Self {
            forward: forward_entry::<B>,
            backward: backward_entry::<B>,
        }
    }

    pub fn names(&self) -> [&'static str; 2] {
        ["forward", "backward"]
    }

    pub fn lookup(&self, name: &str) -> Option<EntryPoint<B>> {
        match name {
            "forward" => Some(EntryPoint::Forward(self.forward)),
            "backward" => Some(EntryPoint::Backward(self.backward)),
            _ => None,
        }
    }
}

impl<B: Backend> Default for KernelTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// The CPU table, built on first access.
    pub static ref CPU_KERNELS: KernelTable<CpuBackend> = {
        debug_println!("registering CPU kernel entry points");
        KernelTable::new()
    };
}

fn forward_entry<B: Backend>(
    x0: &Tensor<B>,
    x1: &Tensor<B>,
    w0: &Tensor<B>,
    w1: &Tensor<B>,
    w2: &Tensor<B>,
) -> Result<Tensor<B>, Error> {
    let weights = Weights::new(w0.clone(), w1.clone(), w2.clone());
    block::forward(x0, x1, &weights)
}

fn backward_entry<B: Backend>(
    y1: &Tensor<B>,
    x1: &Tensor<B>,
    dy: &Tensor<B>,
    w0: &Tensor<B>,
    w1: &Tensor<B>,
    w2: &Tensor<B>,
) -> Result<(Tensor<B>, Tensor<B>), Error> {
    let weights = Weights::new(w0.clone(), w1.clone(), w2.clone());
    Ok(block::backward(y1, x1, dy, &weights)?.into_tuple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_exposes_exactly_two_entries() {
        let table = &*CPU_KERNELS;
        assert_eq!(table.names(), ["forward", "backward"]);
        assert!(matches!(table.lookup("forward"), Some(EntryPoint::Forward(_))));
        assert!(matches!(table.lookup("backward"), Some(EntryPoint::Backward(_))));
        assert!(table.lookup("norm").is_none());
    }
}
