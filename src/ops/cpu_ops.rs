use crate::array::Array;
use crate::error::Error;
use crate::util::broadcast_shapes;
use ndarray::{s, ArrayD, Axis, Ix3, IxDyn, SliceInfoElem, Zip};

/// Applies `f` elementwise after broadcasting `a` and `b` to a common shape.
fn broadcast_binary<F>(op: &str, a: &Array, b: &Array, f: F) -> Result<Array, Error>
where
    F: Fn(f32, f32) -> f32,
{
    let a_data = a.get_data();
    let b_data = b.get_data();
    let shape = broadcast_shapes(op, a_data.shape(), b_data.shape())?;
    let incompatible = || Error::IncompatibleShapes {
        op: op.to_string(),
        shape_a: a_data.shape().to_vec(),
        shape_b: b_data.shape().to_vec(),
    };
    let a_broadcast = a_data.broadcast(IxDyn(&shape)).ok_or_else(incompatible)?;
    let b_broadcast = b_data.broadcast(IxDyn(&shape)).ok_or_else(incompatible)?;
    Ok(Array::new(
        Zip::from(&a_broadcast)
            .and(&b_broadcast)
            .map_collect(|&x, &y| f(x, y)),
    ))
}

/// Element-wise multiplication of two tensors with broadcasting support
pub fn mul(a: &Array, b: &Array) -> Result<Array, Error> {
    broadcast_binary("mul", a, b, |x, y| x * y)
}

/// Element-wise addition of two tensors with broadcasting support
pub fn add(a: &Array, b: &Array) -> Result<Array, Error> {
    broadcast_binary("add", a, b, |x, y| x + y)
}

/// Element-wise subtraction of two tensors with broadcasting support
pub fn sub(a: &Array, b: &Array) -> Result<Array, Error> {
    broadcast_binary("sub", a, b, |x, y| x - y)
}

/// Element-wise division of two tensors with broadcasting support.
/// Division by zero follows IEEE semantics (inf / nan).
pub fn div(a: &Array, b: &Array) -> Result<Array, Error> {
    broadcast_binary("div", a, b, |x, y| x / y)
}

/// Mean of tensor along specified axis
pub fn mean(a: &Array, axis: Option<usize>) -> Result<Array, Error> {
    let a_data = a.get_data();

    match axis {
        Some(ax) => {
            if ax >= a_data.ndim() {
                return Err(Error::InvalidIndex(vec![ax]));
            }
            // mean_axis returns None when the axis has length 0
            a_data
                .mean_axis(Axis(ax))
                .map(Array::new)
                .ok_or_else(|| Error::InvalidOperation(format!("Mean failed along axis {}", ax)))
        }
        None => a_data
            .mean()
            .map(|mean_val| Array::new(ArrayD::from_elem(vec![], mean_val)))
            .ok_or(Error::EmptyTensor),
    }
}

/// Leaky ReLU: positive values pass through, the rest are scaled by `negative_slope`.
pub fn leaky_relu(a: &Array, negative_slope: f32) -> Result<Array, Error> {
    let a_data = a.get_data();
    if a_data.is_empty() {
        return Ok(Array::zeros(a.shape()));
    }
    Ok(Array::new(a_data.mapv(|x| {
        if x > 0.0 {
            x
        } else {
            x * negative_slope
        }
    })))
}

/// Element-wise square root function. Returns a new Array with the square root of each element in the input.
pub fn sqrt(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(a.get_data().mapv(f32::sqrt)))
}

pub fn square(a: &Array) -> Result<Array, Error> {
    Ok(Array::new(a.get_data().mapv(|x| x * x)))
}

/// Running sum along `axis`.
pub fn cumsum(a: &Array, axis: usize) -> Result<Array, Error> {
    a.cumsum_along_axis(axis)
}

/// Inserts a new dimension of size 1 at the specified axis.
pub fn expand_dims(a: &Array, axis: usize) -> Result<Array, Error> {
    if axis > a.get_data().ndim() {
        return Err(Error::InvalidIndex(vec![axis]));
    }
    Ok(Array::new(a.get_data().clone().insert_axis(Axis(axis))))
}

/// Extracts a slice from a tensor along specified dimensions.
pub fn slice(a: &Array, ranges: &[std::ops::Range<usize>]) -> Result<Array, Error> {
    let a_data = a.get_data();
    if ranges.len() != a_data.ndim() {
        return Err(Error::InvalidOperation(
            "Slice ranges do not match input dimensionality".to_string(),
        ));
    }
    for (r, &len) in ranges.iter().zip(a_data.shape()) {
        if r.start > r.end || r.end > len {
            return Err(Error::ShapeError(format!(
                "Slice range {:?} out of bounds for dimension of length {}",
                r, len
            )));
        }
    }

    let slice_info: Vec<SliceInfoElem> = ranges.iter().cloned().map(SliceInfoElem::from).collect();
    Ok(Array::new(a_data.slice(slice_info.as_slice()).to_owned()))
}

/// Concatenates multiple arrays along a specified axis.
pub fn concat(arrays: &[&Array], axis: usize) -> Result<Array, Error> {
    let first = arrays.first().ok_or_else(|| {
        Error::InvalidOperation("Cannot concat empty list of storages".to_string())
    })?;
    if axis >= first.get_data().ndim() {
        return Err(Error::InvalidIndex(vec![axis]));
    }

    let views: Vec<_> = arrays.iter().map(|s| s.get_data().view()).collect();
    ndarray::concatenate(Axis(axis), &views)
        .map(Array::new)
        .map_err(|e| Error::ShapeError(format!("ndarray::concatenate failed: {}", e)))
}

/// Constant padding along one axis: `before` values ahead of the data, `after` values behind it.
pub fn pad(a: &Array, axis: usize, before: usize, after: usize, value: f32) -> Result<Array, Error> {
    let a_data = a.get_data();
    if axis >= a_data.ndim() {
        return Err(Error::InvalidIndex(vec![axis]));
    }
    let mut padded_shape = a_data.shape().to_vec();
    padded_shape[axis] += before + after;
    let mut out = ArrayD::<f32>::from_elem(IxDyn(&padded_shape), value);

    let slice_info: Vec<SliceInfoElem> = a_data
        .shape()
        .iter()
        .enumerate()
        .map(|(d, &len)| {
            if d == axis {
                SliceInfoElem::from(before..before + len)
            } else {
                SliceInfoElem::from(0..len)
            }
        })
        .collect();
    out.slice_mut(slice_info.as_slice()).assign(a_data);
    Ok(Array::new(out))
}

/// Swaps two axes and returns a contiguous copy.
pub fn swap_axes(a: &Array, axis_a: usize, axis_b: usize) -> Result<Array, Error> {
    let ndim = a.get_data().ndim();
    if axis_a >= ndim || axis_b >= ndim {
        return Err(Error::InvalidIndex(vec![axis_a, axis_b]));
    }
    let mut view = a.get_data().view();
    view.swap_axes(axis_a, axis_b);
    Ok(Array::new(view.as_standard_layout().into_owned()))
}

/// 1D convolution (NCL, im2col+matmul implementation), stride 1, no padding, no bias.
///
/// input: [N, C_in, L], weights: [C_out, C_in, K], output: [N, C_out, L - K + 1]
pub fn conv1d(input: &Array, weights: &Array) -> Result<Array, Error> {
    let input_shape = input.shape();
    let weight_shape = weights.shape();
    if input_shape.len() != 3 || weight_shape.len() != 3 {
        return Err(Error::ShapeError(format!(
            "conv1d expects 3D input and weights, got {:?} and {:?}",
            input_shape, weight_shape
        )));
    }
    let (n, c_in, len) = (input_shape[0], input_shape[1], input_shape[2]);
    let (c_out, c_in_w, k) = (weight_shape[0], weight_shape[1], weight_shape[2]);
    if c_in != c_in_w {
        return Err(Error::IncompatibleShapes {
            op: "conv1d".to_string(),
            shape_a: input_shape.to_vec(),
            shape_b: weight_shape.to_vec(),
        });
    }
    if k == 0 || len < k {
        return Err(Error::ShapeError(format!(
            "conv1d: input length {} is shorter than kernel width {}",
            len, k
        )));
    }
    let l_out = len - k + 1;

    let input_nd = input
        .get_data()
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|e| Error::ShapeError(e.to_string()))?;

    // im2col: [N, C_in * K, L_out]
    let mut cols = ndarray::Array3::<f32>::zeros((n, c_in * k, l_out));
    for b in 0..n {
        let mut col = cols.slice_mut(s![b, .., ..]);
        for c in 0..c_in {
            for kx in 0..k {
                let row = c * k + kx;
                col.slice_mut(s![row, ..])
                    .assign(&input_nd.slice(s![b, c, kx..kx + l_out]));
            }
        }
    }

    // Reshape weights to [C_out, C_in * K]
    let weights_2d = weights
        .get_data()
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((c_out, c_in * k))
        .map_err(|e| Error::ShapeError(e.to_string()))?;

    let mut out = ndarray::Array3::<f32>::zeros((n, c_out, l_out));
    for b in 0..n {
        let result = weights_2d.dot(&cols.slice(s![b, .., ..]));
        out.slice_mut(s![b, .., ..]).assign(&result);
    }
    Ok(Array::new(out.into_dyn()))
}
