/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Reductions, accumulations and the other ufunc methods.

use super::{along, all_masked, binary, reduced, reduced_plain};
use crate::array::{normalize_axis, normalize_index, on_array, scatter};
use crate::dispatch::{weak_type, Operand};
use crate::error::{Error, Result};
use crate::kernel::{self, UFunc};
use crate::masked::{positions, unmasked_indices};
use crate::{CellArray, CellType, CellValue, Element, Fill, Idx, Mask, Masked, MaskedArray, MinMax};
use ndarray::{ArrayD, Axis};
use std::cmp::Ordering;

fn identity(op: UFunc, cell_type: CellType, method: &'static str) -> Result<CellValue> {
    op.identity(cell_type)
        .ok_or(Error::OperationNotSupported { op: op.name(), method })
}

/// Lanes of `mask` along `axis` replaced by their running logical `and`.
fn running_all(mask: &Mask, axis: usize) -> ArrayD<bool> {
    let mut out = mask.as_array().clone();
    for mut lane in out.lanes_mut(Axis(axis)) {
        let mut acc = true;
        for m in lane.iter_mut() {
            acc &= *m;
            *m = acc;
        }
    }
    out
}

fn fold(
    op: UFunc,
    a: &MaskedArray,
    acc: Option<CellType>,
    axis: Option<isize>,
    keepdims: bool,
) -> Result<Masked> {
    let id = identity(op, a.dtype(), "reduce")?;
    let (src, ax) = along(a, axis)?;
    let mut data = src.filled(id);
    if let Some(ct) = acc {
        data = data.astype(ct);
    }
    let data = kernel::reduce(op, &data, ax)?;
    reduced(a, data, all_masked(src.mask(), ax), axis, keepdims)
}

fn running(op: UFunc, a: &MaskedArray, acc: Option<CellType>, axis: Option<isize>) -> Result<MaskedArray> {
    let id = identity(op, a.dtype(), "accumulate")?;
    let (src, ax) = along(a, axis)?;
    let mut data = src.filled(id);
    if let Some(ct) = acc {
        data = data.astype(ct);
    }
    let data = kernel::accumulate(op, &data, ax)?;
    let mask = running_all(src.mask(), ax);
    Ok(MaskedArray::from_parts(data, Mask::new(mask), a.flavor()))
}

/// Fold `a` along `axis` with `op`, treating masked cells as the identity of `op`.
///
/// A result cell is masked when every cell folded into it is. `None` folds the
/// flattened array.
pub fn reduce(op: UFunc, a: &MaskedArray, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
    fold(op, a, None, axis, keepdims)
}

/// Running fold of `a` along `axis`.
///
/// A result cell is masked until the first unmasked cell of its lane.
pub fn accumulate(op: UFunc, a: &MaskedArray, axis: isize) -> Result<MaskedArray> {
    running(op, a, None, Some(axis))
}

/// `op` applied to every pair of cells from `lhs` and `rhs`; masked when either cell is.
pub fn outer(op: UFunc, lhs: &MaskedArray, rhs: &MaskedArray) -> Result<MaskedArray> {
    let flavor = lhs.flavor().most_derived(rhs.flavor())?;
    let l = lhs.filled(identity(op, lhs.dtype(), "outer")?);
    let r = rhs.filled(identity(op, rhs.dtype(), "outer")?);
    let data = kernel::outer(op, &l, &r)?;
    let lm = CellArray::from(lhs.mask().as_array().clone());
    let rm = CellArray::from(rhs.mask().as_array().clone());
    let mask = kernel::outer(UFunc::LogicalOr, &lm, &rm)?.to_bool();
    Ok(MaskedArray::from_parts(data, Mask::new(mask), flavor))
}

/// Reduce the segments of `a` along `axis` starting at each of `indices`.
///
/// A segment is masked when all of its cells are.
pub fn reduceat(op: UFunc, a: &MaskedArray, indices: &[usize], axis: isize) -> Result<MaskedArray> {
    let id = identity(op, a.dtype(), "reduceat")?;
    let ax = normalize_axis(axis, a.ndim())?;
    let data = kernel::reduceat(op, &a.filled(id), indices, ax)?;
    let mask = CellArray::from(a.mask().as_array().clone());
    let mask = kernel::reduceat(UFunc::LogicalAnd, &mask, indices, ax)?.to_bool();
    Ok(MaskedArray::from_parts(data, Mask::new(mask), a.flavor()))
}

/// Apply `op` in place at `indices` along the first axis of `a`.
///
/// Application is unbuffered, so an index that occurs twice is operated on twice.
/// Binary kernels take their second operand from `b`, broadcast over the selected
/// cells, and OR its mask into `a`. Masked indices are rejected.
pub fn at(op: UFunc, a: &mut MaskedArray, indices: &MaskedArray, b: Option<Operand<'_>>) -> Result<()> {
    a.check_writeable()?;
    let idx = unmasked_indices(indices)?;
    let Some(&len) = a.shape().first() else {
        return Err(Error::invalid("`at` needs an array with at least one dimension"));
    };
    let idx = idx
        .iter()
        .map(|&i| normalize_index(i, len))
        .collect::<Result<Vec<_>>>()?;
    match (op.arity(), b) {
        (1, None) => {
            for &i in &idx {
                let pos = positions(a.shape(), &[Idx::At(i as isize)])?;
                let data = kernel::unary(op, a.gather_at(&pos).data())?;
                a.parts_mut().0.scatter(&pos, &data)?;
            }
            Ok(())
        }
        (2, Some(b)) => {
            let target = weak_type(&[Operand::from(&*a), b.clone()]);
            let b = match b {
                Operand::Value(_) | Operand::Masked => b.to_masked(target)?,
                _ => b.to_masked(None)?,
            };
            let mut shape = vec![idx.len()];
            shape.extend_from_slice(&a.shape()[1..]);
            let b = b.broadcast_to(&shape)?;
            for (k, &i) in idx.iter().enumerate() {
                let pos = positions(a.shape(), &[Idx::At(i as isize)])?;
                let rhs = b.get(&[Idx::At(k as isize)])?.into_array();
                let r = binary(op, &a.gather_at(&pos), &rhs)?;
                let (data, mask) = a.parts_mut();
                data.scatter(&pos, r.data())?;
                scatter(mask.as_array_mut(), &pos, r.mask().as_array())?;
            }
            Ok(())
        }
        (n, _) => Err(Error::invalid(format!(
            "`{}` takes {n} operand(s) in `at`",
            op.name()
        ))),
    }
}

/// Position of the first extremum in each lane along `axis`.
fn arg_extreme(data: &CellArray, axis: usize, wanted: Ordering) -> Result<ArrayD<i64>> {
    if data.shape()[axis] == 0 {
        return Err(Error::invalid("attempt to get the extremum of an empty sequence"));
    }
    Ok(on_array!(data, a => a.map_axis(Axis(axis), |lane| {
        let mut best = 0;
        for (i, v) in lane.iter().enumerate() {
            if v.sort_cmp(&lane[best]) == wanted {
                best = i;
            }
        }
        best as i64
    })))
}

impl MaskedArray {
    /// Sum of the unmasked cells, accumulated in [`CellType::accumulator`].
    pub fn sum(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        fold(UFunc::Add, self, Some(self.dtype().accumulator()), axis, keepdims)
    }

    /// Product of the unmasked cells, accumulated in [`CellType::accumulator`].
    pub fn prod(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        fold(UFunc::Multiply, self, Some(self.dtype().accumulator()), axis, keepdims)
    }

    pub fn cumsum(&self, axis: Option<isize>) -> Result<MaskedArray> {
        running(UFunc::Add, self, Some(self.dtype().accumulator()), axis)
    }

    pub fn cumprod(&self, axis: Option<isize>) -> Result<MaskedArray> {
        running(UFunc::Multiply, self, Some(self.dtype().accumulator()), axis)
    }

    pub fn max(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        fold(UFunc::Maximum, self, None, axis, keepdims)
    }

    pub fn min(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        fold(UFunc::Minimum, self, None, axis, keepdims)
    }

    /// Peak to peak: `max - min`.
    pub fn ptp(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        let hi = self.max(axis, keepdims)?.into_array();
        let lo = self.min(axis, keepdims)?.into_array();
        Ok(Masked::from_array(binary(UFunc::Subtract, &hi, &lo)?))
    }

    /// Determine if every unmasked cell is truthy. Masked cells count as `true`.
    pub fn all(&self, axis: Option<isize>, keepdims: bool) -> Result<CellArray> {
        self.truth(axis, keepdims, true)
    }

    /// Determine if any unmasked cell is truthy. Masked cells count as `false`.
    pub fn any(&self, axis: Option<isize>, keepdims: bool) -> Result<CellArray> {
        self.truth(axis, keepdims, false)
    }

    fn truth(&self, axis: Option<isize>, keepdims: bool, all: bool) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        let truth = src.filled(all).to_bool();
        let r = truth.map_axis(Axis(ax), |lane| {
            if all {
                lane.iter().all(|v| *v)
            } else {
                lane.iter().any(|v| *v)
            }
        });
        reduced_plain(self, r.into(), axis, keepdims)
    }

    /// Index of the largest unmasked cell along `axis`, as `Int64`.
    pub fn argmax(&self, axis: Option<isize>) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        Ok(arg_extreme(&src.filled(MinMax::Max), ax, Ordering::Greater)?.into())
    }

    /// Index of the smallest unmasked cell along `axis`, as `Int64`.
    pub fn argmin(&self, axis: Option<isize>) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        Ok(arg_extreme(&src.filled(MinMax::Min), ax, Ordering::Less)?.into())
    }

    /// Number of unmasked, non-zero cells along `axis`, as `Int64`.
    pub fn count_nonzero(&self, axis: Option<isize>) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        let truth = src.filled(Fill::Default).to_bool();
        let counts = truth.map_axis(Axis(ax), |lane| lane.iter().filter(|v| **v).count() as i64);
        Ok(counts.into())
    }
}
