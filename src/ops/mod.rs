/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Mask-aware operations.
//!
//! Each operation decides the mask of its result, neutralizes masked input with a
//! filler, and hands the data to a plain kernel. Masked data is never read into a result.

mod arith;
mod combine;
mod linalg;
mod reduce;
mod shape;
mod sort;
mod stats;

pub use arith::*;
pub use combine::*;
pub use linalg::*;
pub use reduce::*;
pub use shape::*;
pub use sort::*;
pub use stats::*;

use crate::array::{map_array, normalize_axis, reshape};
use crate::error::Result;
use crate::{CellArray, Mask, Masked, MaskedArray};
use ndarray::{ArrayD, Axis};
use std::borrow::Cow;

/// `a` prepared for folding along `axis`. `None` folds the flattened array along axis 0.
pub(crate) fn along(a: &MaskedArray, axis: Option<isize>) -> Result<(Cow<'_, MaskedArray>, usize)> {
    match axis {
        None => Ok((Cow::Owned(a.ravel()), 0)),
        Some(ax) => Ok((Cow::Borrowed(a), normalize_axis(ax, a.ndim())?)),
    }
}

/// Cells that are masked in every position along `axis`.
pub(crate) fn all_masked(mask: &Mask, axis: usize) -> ArrayD<bool> {
    mask.as_array().map_axis(Axis(axis), |lane| lane.iter().all(|m| *m))
}

/// Put back the axis removed by a reduction of an `ndim`-dimensional array.
pub(crate) fn keep_dims<T: Clone>(
    r: ArrayD<T>,
    ndim: usize,
    axis: Option<isize>,
    keepdims: bool,
) -> Result<ArrayD<T>> {
    if !keepdims {
        return Ok(r);
    }
    match axis {
        Some(ax) => Ok(r.insert_axis(Axis(normalize_axis(ax, ndim)?))),
        None => reshape(r.view(), &vec![1; ndim]),
    }
}

/// Pair the reduced `data` and `mask` of `src`, applying `keepdims`.
pub(crate) fn reduced(
    src: &MaskedArray,
    data: CellArray,
    mask: ArrayD<bool>,
    axis: Option<isize>,
    keepdims: bool,
) -> Result<Masked> {
    let ndim = src.ndim();
    let data = map_array!(data, a => keep_dims(a, ndim, axis, keepdims)?);
    let mask = keep_dims(mask, ndim, axis, keepdims)?;
    Ok(Masked::from_array(MaskedArray::from_parts(data, Mask::new(mask), src.flavor())))
}

/// Apply `keepdims` to a plain result.
pub(crate) fn reduced_plain(
    src: &MaskedArray,
    data: CellArray,
    axis: Option<isize>,
    keepdims: bool,
) -> Result<CellArray> {
    let ndim = src.ndim();
    Ok(map_array!(data, a => keep_dims(a, ndim, axis, keepdims)?))
}
