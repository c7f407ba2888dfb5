use crate::array::Array;
use crate::error::Error;
use crate::util::checked_numel;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

const MAX_RESAMPLES: usize = 8;

/// Initialize weights using Kaiming uniform initialization.
/// Returns an `Array` suitable for `CpuBackend`.
pub fn kaiming_uniform(fan_in: usize, shape: &[usize]) -> Result<Array, Error> {
    if shape.is_empty() {
        return Err(Error::InvalidOperation(
            "Cannot initialize tensor with empty shape".to_string(),
        ));
    }

    // Check for zero dimensions - return empty array if found
    if shape.iter().any(|&dim| dim == 0) {
        return Ok(Array::zeros(shape));
    }

    if fan_in == 0 {
        return Err(Error::InvalidOperation(
            "Fan-in cannot be zero for Kaiming initialization".to_string(),
        ));
    }

    // bound = sqrt(6 / fan_in)
    let bound = (6.0 / fan_in as f32).sqrt();
    if bound.is_nan() || bound.is_infinite() {
        return Err(Error::InitializationError);
    }
    let dist = Uniform::new(-bound, bound).map_err(|_| Error::InitializationError)?;

    let size = checked_numel(shape)?;
    let mut rng = rand::rng();
    let data: Vec<f32> = (0..size).map(|_| dist.sample(&mut rng)).collect();
    Array::from_vec(data, shape)
}

/// Orthogonal initialization.
///
/// The tensor is viewed as a `[shape[0], prod(shape[1..])]` matrix. The
/// shorter side is filled with orthonormal vectors (Gram-Schmidt over
/// standard normal samples), then everything is scaled by `gain`. For a
/// convolution kernel `[C_out, C_in, K]` the rows are the output filters.
pub fn orthogonal<R: Rng + ?Sized>(shape: &[usize], gain: f32, rng: &mut R) -> Result<Array, Error> {
    if shape.len() < 2 {
        return Err(Error::InvalidOperation(format!(
            "Orthogonal initialization needs at least 2 dimensions, got {:?}",
            shape
        )));
    }
    if !gain.is_finite() {
        return Err(Error::InitializationError);
    }
    let rows = shape[0];
    let cols = checked_numel(&shape[1..])?;
    if rows == 0 || cols == 0 {
        return Ok(Array::zeros(shape));
    }

    let (count, len) = if rows <= cols { (rows, cols) } else { (cols, rows) };
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(count);
    for _ in 0..count {
        let v = next_orthonormal(&basis, len, rng)?;
        basis.push(v);
    }

    let mut data = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let value = if rows <= cols { basis[r][c] } else { basis[c][r] };
            data[r * cols + c] = value as f32 * gain;
        }
    }
    Array::from_vec(data, shape)
}

fn next_orthonormal<R: Rng + ?Sized>(
    basis: &[Vec<f64>],
    len: usize,
    rng: &mut R,
) -> Result<Vec<f64>, Error> {
    for _ in 0..MAX_RESAMPLES {
        let mut v: Vec<f64> = (0..len).map(|_| StandardNormal.sample(rng)).collect();
        for q in basis {
            let proj: f64 = v.iter().zip(q).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(q).for_each(|(a, b)| *a -= proj * b);
        }
        let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
        if norm > 1e-8 {
            v.iter_mut().for_each(|a| *a /= norm);
            return Ok(v);
        }
    }
    Err(Error::InitializationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_kaiming_uniform_basic() {
        let fan_in = 784;
        let shape = &[128, fan_in];
        let array = kaiming_uniform(fan_in, shape).unwrap();

        assert_eq!(array.shape(), shape);
        let bound = (6.0 / fan_in as f32).sqrt();
        let data_vec = array.into_raw_vec();
        assert_eq!(data_vec.len(), 128 * 784);
        for &value in &data_vec {
            assert!(
                value >= -bound && value <= bound,
                "Value {} out of bound {}",
                value,
                bound
            );
        }
    }

    #[test]
    fn test_kaiming_uniform_zero_fan_in() {
        assert!(matches!(
            kaiming_uniform(0, &[10, 10]),
            Err(Error::InvalidOperation(_))
        ));
    }

    fn gram(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
        let mut g = vec![0.0; rows * rows];
        for i in 0..rows {
            for j in 0..rows {
                g[i * rows + j] = (0..cols).map(|k| data[i * cols + k] * data[j * cols + k]).sum();
            }
        }
        g
    }

    #[test]
    fn test_orthogonal_rows_are_orthonormal() {
        let mut rng = StdRng::seed_from_u64(7);
        let gain = 2.0;
        let array = orthogonal(&[4, 3, 3], gain, &mut rng).unwrap();
        let data = array.into_raw_vec();
        let g = gram(&data, 4, 9);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { gain * gain } else { 0.0 };
                assert!((g[i * 4 + j] - expected).abs() < 1e-4, "G[{}][{}] = {}", i, j, g[i * 4 + j]);
            }
        }
    }

    #[test]
    fn test_orthogonal_tall_matrix_columns() {
        let mut rng = StdRng::seed_from_u64(11);
        let array = orthogonal(&[6, 2, 1], 1.0, &mut rng).unwrap();
        let data = array.into_raw_vec();
        // columns of a 6x2 matrix
        let dot = |a: usize, b: usize| -> f32 { (0..6).map(|r| data[r * 2 + a] * data[r * 2 + b]).sum() };
        assert!((dot(0, 0) - 1.0).abs() < 1e-5);
        assert!((dot(1, 1) - 1.0).abs() < 1e-5);
        assert!(dot(0, 1).abs() < 1e-5);
    }

    #[test]
    fn test_orthogonal_seeded_is_reproducible() {
        let a = orthogonal(&[3, 2, 2], 1.0, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = orthogonal(&[3, 2, 2], 1.0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a.into_raw_vec(), b.into_raw_vec());
    }

    #[test]
    fn test_orthogonal_rejects_vector_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            orthogonal(&[5], 1.0, &mut rng),
            Err(Error::InvalidOperation(_))
        ));
    }
}
