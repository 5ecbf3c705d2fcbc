use once_cell::sync::Lazy;
use proptest::collection::vec;
use proptest::prelude::*;
use std::error::Error;

pub type TestError = Box<dyn Error>;
pub type TestResult = Result<(), TestError>;

/// A 3x4 grid of readings with a few dropouts, as `(data, mask, shape)`.
///
/// Mask entries are `true` where the reading is missing.
pub static READINGS: Lazy<(Vec<f64>, Vec<bool>, Vec<usize>)> = Lazy::new(|| {
    let data = vec![
        1.5, 2.0, -3.25, 4.0, //
        0.0, 7.5, 8.0, -1.0, //
        9.0, 3.0, 2.5, 6.0,
    ];
    let mask = vec![
        false, true, false, false, //
        false, false, false, true, //
        true, true, true, true,
    ];
    (data, mask, vec![3, 4])
});

/// Small integer series with a masked head and tail, as `(data, mask)`.
pub static SERIES: Lazy<(Vec<i32>, Vec<bool>)> = Lazy::new(|| {
    (
        vec![40, 3, 1, 4, 1, 5, 9, 2, 6, 50],
        vec![true, false, false, false, false, false, false, false, false, true],
    )
});

/// Strategy producing equal-length `(data, mask)` pairs of finite values.
pub fn masked_f64(max_len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<bool>)> {
    (1..=max_len).prop_flat_map(|n| (vec(-1.0e6f64..1.0e6, n), vec(any::<bool>(), n)))
}

/// Strategy producing equal-length `(data, mask)` pairs of small integers.
pub fn masked_i32(max_len: usize) -> impl Strategy<Value = (Vec<i32>, Vec<bool>)> {
    (1..=max_len).prop_flat_map(|n| (vec(-1000i32..1000, n), vec(any::<bool>(), n)))
}

/// Strategy producing a row-major 2-d `(data, mask, shape)` triple.
pub fn masked_grid(max_side: usize) -> impl Strategy<Value = (Vec<f64>, Vec<bool>, Vec<usize>)> {
    (1..=max_side, 1..=max_side).prop_flat_map(|(r, c)| {
        (
            vec(-100.0f64..100.0, r * c),
            vec(any::<bool>(), r * c),
            Just(vec![r, c]),
        )
    })
}
