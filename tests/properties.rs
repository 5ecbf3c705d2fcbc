use masked_cells::{CellArray, CellType, CellValue, MaskedArray, MinMax};
use masked_cells_testkit::{masked_f64, masked_grid, masked_i32, TestResult, READINGS, SERIES};
use proptest::prelude::*;

fn ints(data: &[i32], mask: &[bool]) -> MaskedArray {
    MaskedArray::new(CellArray::from(data.to_vec()), mask.to_vec()).unwrap()
}

fn floats(data: &[f64], mask: &[bool]) -> MaskedArray {
    MaskedArray::new(CellArray::from(data.to_vec()), mask.to_vec()).unwrap()
}

fn valid<T: Copy>(data: &[T], mask: &[bool]) -> Vec<T> {
    data.iter().zip(mask).filter(|(_, m)| !**m).map(|(v, _)| *v).collect()
}

#[test]
fn series_summary() -> TestResult {
    let (data, mask) = &*SERIES;
    let a = ints(data, mask);
    assert_eq!(a.count(), 8);
    let total = a.sum(None, false)?.into_scalar()?;
    assert_eq!(total.value(), Some(CellValue::Int64(31)));
    let top = a.max(None, false)?.into_scalar()?;
    assert_eq!(top.value(), Some(CellValue::Int32(9)));
    let mid = a.median(None, false)?.into_scalar()?;
    assert_eq!(mid.value(), Some(CellValue::Float64(3.5)));
    Ok(())
}

#[test]
fn readings_by_axis() -> TestResult {
    let (data, mask, shape) = &*READINGS;
    let grid = MaskedArray::new(
        CellArray::from_vec(shape, data.clone())?,
        ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(shape), mask.clone())?,
    )?;
    assert_eq!(grid.count(), 7);

    let cols = grid.mean(Some(0), false)?.into_array();
    assert_eq!(cols.shape(), &[4]);
    assert!(!cols.mask().any());
    let means: Vec<f64> = (0..4).map(|c| cols.data().get(&[c]).and_then(|v| v.get::<f64>().ok()).unwrap()).collect();
    assert_eq!(means, vec![0.75, 7.5, 2.375, 4.0]);

    let rows = grid.mean(Some(1), false)?.into_array();
    assert_eq!(rows.mask().iter().collect::<Vec<_>>(), vec![false, false, true]);

    let spread = grid.var(Some(0), 0, false)?.into_array();
    assert_eq!(spread.data().get(&[0]).and_then(|v| v.get::<f64>().ok()), Some(0.5625));
    Ok(())
}

proptest! {
    /// Elementwise results are masked wherever either operand is.
    #[test]
    fn binary_mask_is_union(
        (l, lm) in masked_i32(16),
        (r, rm) in masked_i32(16),
    ) {
        let n = l.len().min(r.len());
        let a = ints(&l[..n], &lm[..n]);
        let b = ints(&r[..n], &rm[..n]);
        let c = &a + &b;
        let expected: Vec<bool> = lm[..n].iter().zip(&rm[..n]).map(|(x, y)| *x || *y).collect();
        prop_assert_eq!(c.mask().iter().collect::<Vec<_>>(), expected);
        let sums = c.filled(0).to_vec::<i32>().unwrap();
        for i in 0..n {
            if !(lm[i] || rm[i]) {
                prop_assert_eq!(sums[i], l[i] + r[i]);
            }
        }
    }

    /// Sums only see unmasked cells; a fully masked input sums to the masked scalar.
    #[test]
    fn sum_skips_masked((data, mask) in masked_i32(32)) {
        let a = ints(&data, &mask);
        let total = a.sum(None, false).unwrap().into_scalar().unwrap();
        let kept = valid(&data, &mask);
        if kept.is_empty() {
            prop_assert!(total.is_masked());
        } else {
            let expected: i64 = kept.iter().map(|v| *v as i64).sum();
            prop_assert_eq!(total.value(), Some(CellValue::Int64(expected)));
        }
    }

    /// Sorting keeps the valid cells ascending and moves masked ones to the end.
    #[test]
    fn sort_orders_valid_cells((data, mask) in masked_i32(32)) {
        let a = ints(&data, &mask);
        let s = a.sorted(None).unwrap();
        let count = a.count();
        let mut kept = valid(&data, &mask);
        kept.sort_unstable();
        let m: Vec<bool> = s.mask().iter().collect();
        prop_assert!(m[..count].iter().all(|x| !x));
        prop_assert!(m[count..].iter().all(|x| *x));
        let sorted = s.data().to_vec::<i32>().unwrap();
        prop_assert_eq!(&sorted[..count], kept.as_slice());

        let order = a.argsort(None).unwrap().to_vec::<i64>().unwrap();
        let gathered: Vec<i32> = order[..count].iter().map(|&i| data[i as usize]).collect();
        prop_assert_eq!(gathered, kept);
    }

    /// Filling replaces masked cells and leaves the rest alone.
    #[test]
    fn filled_replaces_masked((data, mask) in masked_f64(32)) {
        let a = floats(&data, &mask);
        let f = a.filled(-7.5).to_vec::<f64>().unwrap();
        for (i, v) in f.iter().enumerate() {
            prop_assert_eq!(*v, if mask[i] { -7.5 } else { data[i] });
        }
        let lo = a.filled(MinMax::Min).to_vec::<f64>().unwrap();
        prop_assert!(lo.iter().zip(&mask).filter(|(_, m)| **m).all(|(v, _)| *v == f64::INFINITY));
    }

    /// The mean matches the arithmetic mean of the unmasked cells.
    #[test]
    fn mean_of_valid_cells((data, mask) in masked_f64(32)) {
        let a = floats(&data, &mask);
        let mean = a.mean(None, false).unwrap().into_scalar().unwrap();
        let kept = valid(&data, &mask);
        match mean.value() {
            None => prop_assert!(kept.is_empty()),
            Some(CellValue::Float64(m)) => {
                let expected = kept.iter().sum::<f64>() / kept.len() as f64;
                prop_assert!((m - expected).abs() <= 1e-6 * expected.abs().max(1.0));
            }
            Some(other) => prop_assert!(false, "unexpected mean {:?}", other),
        }
    }

    /// Column reductions are masked exactly where a whole column is.
    #[test]
    fn column_sums_mask((data, mask, shape) in masked_grid(6)) {
        let grid = MaskedArray::new(
            CellArray::from_vec(&shape, data).unwrap(),
            ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&shape), mask.clone()).unwrap(),
        )
        .unwrap();
        let sums = grid.sum(Some(0), false).unwrap().into_array();
        prop_assert_eq!(sums.shape(), &shape[1..]);
        let (rows, cols) = (shape[0], shape[1]);
        for c in 0..cols {
            let all = (0..rows).all(|r| mask[r * cols + c]);
            prop_assert_eq!(sums.mask().get(&[c]), all);
        }

        let t = grid.transpose(None).unwrap();
        prop_assert_eq!(t.count(), grid.count());
        prop_assert_eq!(t.dtype(), CellType::Float64);
    }
}
