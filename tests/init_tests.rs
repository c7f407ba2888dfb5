// tests/init_tests.rs
use fused_norm_lib::{
    init::{kaiming_uniform, orthogonal},
    BlockConfig, CpuBackend, Error, Weights,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn row_dot(data: &[f32], cols: usize, a: usize, b: usize) -> f32 {
    (0..cols).map(|c| data[a * cols + c] * data[b * cols + c]).sum()
}

#[test]
fn test_kaiming_uniform_zero_dim() {
    let array = kaiming_uniform(10, &[10, 0, 5]).unwrap();
    assert_eq!(array.shape(), &[10, 0, 5]);
    assert_eq!(array.size(), 0);
}

#[test]
fn test_orthogonal_rows_are_orthonormal() {
    let mut rng = StdRng::seed_from_u64(7);
    // wide: 6 rows of length 4 * 3 = 12
    let data = orthogonal(&[6, 4, 3], 1.0, &mut rng).unwrap().into_raw_vec();
    for a in 0..6 {
        for b in 0..6 {
            let expected = if a == b { 1.0 } else { 0.0 };
            let dot = row_dot(&data, 12, a, b);
            assert!((dot - expected).abs() < 1e-4, "rows {} {}: {}", a, b, dot);
        }
    }
}

#[test]
fn test_orthogonal_tall_columns_are_orthonormal() {
    let mut rng = StdRng::seed_from_u64(8);
    let data = orthogonal(&[8, 2, 1], 1.0, &mut rng).unwrap().into_raw_vec();
    for a in 0..2 {
        for b in 0..2 {
            let dot: f32 = (0..8).map(|r| data[r * 2 + a] * data[r * 2 + b]).sum();
            let expected = if a == b { 1.0 } else { 0.0 };
            assert!((dot - expected).abs() < 1e-4);
        }
    }
}

#[test]
fn test_orthogonal_gain_scales_norms() {
    let mut rng = StdRng::seed_from_u64(9);
    let data = orthogonal(&[3, 5, 1], 0.5, &mut rng).unwrap().into_raw_vec();
    for r in 0..3 {
        assert!((row_dot(&data, 5, r, r) - 0.25).abs() < 1e-4);
    }
}

#[test]
fn test_orthogonal_rejects_vectors() {
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(
        orthogonal(&[4], 1.0, &mut rng),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_weights_init_shapes_follow_config() {
    let config = BlockConfig::new(6, 1.5, 4, 2.0, 0.1).unwrap();
    let weights = Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(config.intermediate(), 9);
    assert_eq!(weights.w0.shape(), &[27, 6, 1]);
    assert_eq!(weights.w1.shape(), &[27, 9, 4]);
    assert_eq!(weights.w2.shape(), &[6, 9, 1]);
    assert_eq!(weights.causal_padding().unwrap(), 3);
}

#[test]
fn test_weights_init_is_seeded() {
    let config = BlockConfig::default();
    let a = Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(3)).unwrap();
    let b = Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(3)).unwrap();
    assert!(a.w1.bit_eq(&b.w1).unwrap());
    assert!(a.w2.bit_eq(&b.w2).unwrap());
}

#[test]
fn test_weights_init_output_gain() {
    // w2 is [4, 8]: four orthonormal rows scaled by init_scale
    let config = BlockConfig::new(4, 2.0, 1, 1.0, 0.3).unwrap();
    let weights = Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(5)).unwrap();
    let data = weights.w2.to_vec().unwrap();
    for r in 0..4 {
        assert!((row_dot(&data, 8, r, r) - 0.09).abs() < 1e-4);
    }
}

#[test]
fn test_config_validation() {
    assert!(matches!(
        BlockConfig::new(0, 1.0, 3, 1.0, 1.0),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        BlockConfig::new(4, 1.0, 0, 1.0, 1.0),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        BlockConfig::new(4, 0.1, 3, 1.0, 1.0),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        BlockConfig::new(4, 1.0, 3, 0.0, 1.0),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        BlockConfig::new(4, 1.0, 3, 1.0, f32::NAN),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_init_rejects_invalid_config() {
    let config = BlockConfig {
        kernel_size: 0,
        ..BlockConfig::default()
    };
    assert!(matches!(
        Weights::<CpuBackend>::init(&config, &mut StdRng::seed_from_u64(0)),
        Err(Error::InvalidConfig(_))
    ));
}
