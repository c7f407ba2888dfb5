use crate::error::Error;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use ndarray::{ArrayD, Axis, IxDyn, ShapeError};

#[derive(Clone)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Array {
    pub(crate) data: ArrayD<f32>,
}

impl Array {
    pub fn new(data: ArrayD<f32>) -> Self {
        Self { data }
    }

    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, Error> {
        let actual_len = data.len();
        let map_err = |_e: ShapeError| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![actual_len],
        };
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(map_err)?;
        Ok(Self { data: array })
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::ones(IxDyn(shape)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the array contains no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Flattens the array in logical (row-major) order.
    pub fn into_raw_vec(self) -> Vec<f32> {
        if self.data.is_standard_layout() {
            self.data.into_raw_vec_and_offset().0
        } else {
            self.data.iter().copied().collect()
        }
    }

    pub(crate) fn sum_along_axis(&self, axis: usize) -> Result<Array, Error> {
        if axis >= self.data.ndim() {
            return Err(Error::InvalidIndex(vec![axis]));
        }
        Ok(Array::new(self.data.sum_axis(Axis(axis))))
    }

    /// Running sum along `axis`; element `i` holds the sum of elements `0..=i`.
    pub(crate) fn cumsum_along_axis(&self, axis: usize) -> Result<Array, Error> {
        if axis >= self.data.ndim() {
            return Err(Error::InvalidIndex(vec![axis]));
        }
        let mut out = self.data.as_standard_layout().into_owned();
        out.accumulate_axis_inplace(Axis(axis), |&prev, curr| *curr += prev);
        Ok(Array::new(out))
    }
}
