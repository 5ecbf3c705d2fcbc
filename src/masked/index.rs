/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Indexing and assignment, applied to data and mask in lockstep.

use crate::array::{gather, normalize_axis, normalize_index, scatter};
use crate::error::{Error, Result};
use crate::masked::Masked;
use crate::{with_et, CellArray, CellValue, Fill, Mask, MaskedArray, MaskedInput, MaskedScalar};
use ndarray::{Array1, ArrayD, Axis, IxDyn};
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

/// One component of a basic index expression.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Idx {
    /// A single position; negative values count from the end. Removes the axis.
    At(isize),
    /// Slice with optional bounds and a non-zero step; negative bounds count from the end.
    Slice { start: Option<isize>, end: Option<isize>, step: isize },
    /// Insert a unit axis.
    NewAxis,
    /// Keep the whole axis.
    Full,
}

impl Idx {
    pub fn slice(start: Option<isize>, end: Option<isize>, step: isize) -> Self {
        Idx::Slice { start, end, step }
    }
}

impl From<isize> for Idx {
    fn from(value: isize) -> Self {
        Idx::At(value)
    }
}

impl From<Range<isize>> for Idx {
    fn from(value: Range<isize>) -> Self {
        Idx::slice(Some(value.start), Some(value.end), 1)
    }
}

impl From<RangeFrom<isize>> for Idx {
    fn from(value: RangeFrom<isize>) -> Self {
        Idx::slice(Some(value.start), None, 1)
    }
}

impl From<RangeTo<isize>> for Idx {
    fn from(value: RangeTo<isize>) -> Self {
        Idx::slice(None, Some(value.end), 1)
    }
}

impl From<RangeFull> for Idx {
    fn from(_: RangeFull) -> Self {
        Idx::Full
    }
}

/// Right hand side of an assignment into a [`MaskedArray`].
#[derive(Debug, Clone)]
pub enum Assign {
    /// Mask the target cells, leaving their data alone.
    Sentinel,
    /// Write data and unmask.
    Plain(CellArray),
    /// Copy both data and mask.
    Masked(MaskedArray),
}

impl From<MaskedInput> for Assign {
    fn from(_: MaskedInput) -> Self {
        Assign::Sentinel
    }
}

impl From<CellValue> for Assign {
    fn from(value: CellValue) -> Self {
        Assign::Plain(CellArray::from_value(value))
    }
}

impl From<CellArray> for Assign {
    fn from(value: CellArray) -> Self {
        Assign::Plain(value)
    }
}

impl From<MaskedArray> for Assign {
    fn from(value: MaskedArray) -> Self {
        Assign::Masked(value)
    }
}

impl From<&MaskedArray> for Assign {
    fn from(value: &MaskedArray) -> Self {
        Assign::Masked(value.clone())
    }
}

impl From<MaskedScalar> for Assign {
    fn from(value: MaskedScalar) -> Self {
        Assign::Masked(value.to_array())
    }
}

macro_rules! assign_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl From<$p> for Assign {
            fn from(value: $p) -> Self {
                CellValue::$id(value).into()
            }
        }
    )* };
}
with_et!(assign_from);

impl Assign {
    /// Shape of the values, `None` for the sentinel.
    fn shape(&self) -> Option<&[usize]> {
        match self {
            Assign::Sentinel => None,
            Assign::Plain(a) => Some(a.shape()),
            Assign::Masked(a) => Some(a.shape()),
        }
    }

    /// The values at the flat `positions` of `self`.
    fn gather(&self, positions: &ArrayD<usize>) -> Self {
        match self {
            Assign::Sentinel => Assign::Sentinel,
            Assign::Plain(a) => Assign::Plain(a.gather(positions)),
            Assign::Masked(a) => {
                let mask = gather(a.mask().as_array(), positions);
                Assign::Masked(MaskedArray::from_parts(
                    a.data().gather(positions),
                    Mask::new(mask),
                    a.flavor(),
                ))
            }
        }
    }
}

/// Indices selected by a slice over an axis of length `len`.
fn slice_indices(len: usize, start: Option<isize>, end: Option<isize>, step: isize) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(Error::invalid("slice step cannot be zero"));
    }
    let n = len as isize;
    let (lo, hi) = if step > 0 { (0, n) } else { (-1, n - 1) };
    let clamp = |v: isize| (if v < 0 { v + n } else { v }).clamp(lo, hi);
    let mut i = start.map_or(if step > 0 { lo } else { hi }, clamp);
    let stop = end.map_or(if step > 0 { hi } else { lo }, clamp);
    let mut out = Vec::new();
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i as usize);
        i += step;
    }
    Ok(out)
}

/// Row-major positions of `shape`, laid out in `shape`.
pub(crate) fn arange(shape: &[usize]) -> ArrayD<usize> {
    let mut next = 0;
    ArrayD::from_shape_simple_fn(IxDyn(shape), || {
        next += 1;
        next - 1
    })
}

/// Flat positions of the elements selected by `index` within an array of `shape`.
pub(crate) fn positions(shape: &[usize], index: &[Idx]) -> Result<ArrayD<usize>> {
    let indexed = index.iter().filter(|i| !matches!(i, Idx::NewAxis)).count();
    if indexed > shape.len() {
        return Err(Error::invalid(format!(
            "too many indices: array is {}-dimensional, but {indexed} were indexed",
            shape.len()
        )));
    }
    let mut pos = arange(shape);
    let mut axis = 0;
    for idx in index {
        match *idx {
            Idx::At(i) => {
                let i = normalize_index(i, pos.shape()[axis])?;
                pos = pos.index_axis_move(Axis(axis), i);
            }
            Idx::Slice { start, end, step } => {
                let picks = slice_indices(pos.shape()[axis], start, end, step)?;
                pos = pos.select(Axis(axis), &picks);
                axis += 1;
            }
            Idx::NewAxis => {
                pos = pos.insert_axis(Axis(axis));
                axis += 1;
            }
            Idx::Full => axis += 1,
        }
    }
    Ok(pos)
}

/// Flat positions where `cond` is true; masked condition cells count as false.
fn true_positions(shape: &[usize], cond: &MaskedArray) -> Result<ArrayD<usize>> {
    if cond.shape() != shape {
        return Err(Error::Shape(format!(
            "boolean index of shape {:?} does not match array of shape {shape:?}",
            cond.shape()
        )));
    }
    let truth = cond.filled(Fill::Default).to_bool();
    let picks: Vec<usize> = truth
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.then_some(i))
        .collect();
    Ok(Array1::from_vec(picks).into_dyn())
}

/// Integer indices held by `indices`, rejecting masked ones.
pub(crate) fn unmasked_indices(indices: &MaskedArray) -> Result<ArrayD<isize>> {
    if indices.mask().any() {
        return Err(Error::IndexMask);
    }
    indices.data().to_indices()
}

impl MaskedArray {
    pub(crate) fn gather_at(&self, positions: &ArrayD<usize>) -> MaskedArray {
        let mask = gather(self.mask().as_array(), positions);
        MaskedArray::from_parts(self.data().gather(positions), Mask::new(mask), self.flavor())
    }

    pub(crate) fn check_writeable(&self) -> Result<()> {
        if self.is_writeable() {
            Ok(())
        } else {
            Err(Error::ReadOnly("masked array"))
        }
    }

    pub(crate) fn assign_at(&mut self, positions: &ArrayD<usize>, value: Assign) -> Result<()> {
        self.check_writeable()?;
        let (data, mask) = self.parts_mut();
        let flag = |b: bool| ArrayD::from_elem(IxDyn(&[]), b);
        match value {
            Assign::Sentinel => scatter(mask.as_array_mut(), positions, &flag(true)),
            Assign::Plain(v) => {
                data.scatter(positions, &v)?;
                scatter(mask.as_array_mut(), positions, &flag(false))
            }
            Assign::Masked(v) => {
                data.scatter(positions, v.data())?;
                scatter(mask.as_array_mut(), positions, v.mask().as_array())
            }
        }
    }

    /// Basic indexing. Zero-dimensional results come back as [`Masked::Scalar`].
    ///
    /// ```
    /// use masked_cells::{masked_array, Idx, X};
    /// let a = masked_array![[1, X, 3], [4, 5, 6]];
    /// let row = a.get(&[Idx::At(-1)]).unwrap();
    /// assert_eq!(row.shape(), &[3]);
    /// let cell = a.get(&[Idx::At(0), Idx::At(1)]).unwrap().into_scalar().unwrap();
    /// assert!(cell.is_masked());
    /// ```
    pub fn get(&self, index: &[Idx]) -> Result<Masked> {
        let pos = positions(self.shape(), index)?;
        Ok(Masked::from_array(self.gather_at(&pos)))
    }

    /// Assign `value` to the cells selected by `index`.
    pub fn set(&mut self, index: &[Idx], value: impl Into<Assign>) -> Result<()> {
        self.check_writeable()?;
        let pos = positions(self.shape(), index)?;
        self.assign_at(&pos, value.into())
    }

    /// One-dimensional selection of the cells where `cond` is true.
    pub fn select(&self, cond: &MaskedArray) -> Result<MaskedArray> {
        let pos = true_positions(self.shape(), cond)?;
        Ok(self.gather_at(&pos))
    }

    /// Assign `value` where `cond` is true.
    ///
    /// A value shaped like `self` contributes its own cells at the selected positions;
    /// anything else is broadcast over the selection.
    pub fn set_where(&mut self, cond: &MaskedArray, value: impl Into<Assign>) -> Result<()> {
        self.check_writeable()?;
        let pos = true_positions(self.shape(), cond)?;
        let value = value.into();
        let value = match value.shape() {
            Some(s) if s == self.shape() && !s.is_empty() => value.gather(&pos),
            _ => value,
        };
        self.assign_at(&pos, value)
    }

    /// Elements at integer `indices` along `axis`, or over the flattened array when `None`.
    ///
    /// The selected axis is replaced by the shape of `indices`.
    pub fn take(&self, indices: &MaskedArray, axis: Option<isize>) -> Result<MaskedArray> {
        let idx = unmasked_indices(indices)?;
        let (pos, ax) = match axis {
            None => (Array1::from_iter(0..self.len()).into_dyn(), 0),
            Some(a) => (arange(self.shape()), normalize_axis(a, self.ndim())?),
        };
        let len = pos.shape()[ax];
        let picks = idx
            .iter()
            .map(|&i| normalize_index(i, len))
            .collect::<Result<Vec<_>>>()?;
        let picked = pos.select(Axis(ax), &picks);
        let mut shape = picked.shape()[..ax].to_vec();
        shape.extend_from_slice(idx.shape());
        shape.extend_from_slice(&picked.shape()[ax + 1..]);
        let picked = crate::array::reshape(picked.view(), &shape)?;
        Ok(self.gather_at(&picked))
    }

    /// Write `values` at flat `indices`, repeating `values` as needed.
    pub fn put(&mut self, indices: &MaskedArray, values: impl Into<Assign>) -> Result<()> {
        self.check_writeable()?;
        let idx = unmasked_indices(indices)?;
        let flat = idx
            .iter()
            .map(|&i| normalize_index(i, self.len()))
            .collect::<Result<Vec<_>>>()?;
        let pos = Array1::from_vec(flat).into_dyn();
        let value = match values.into() {
            Assign::Sentinel => Assign::Sentinel,
            v => {
                let n = v.shape().map_or(1, |s| s.iter().product::<usize>());
                if n == 0 {
                    return Ok(());
                }
                v.gather(&Array1::from_iter((0..pos.len()).map(|i| i % n)).into_dyn())
            }
        };
        self.assign_at(&pos, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, CellType, X};

    #[test]
    fn slices() {
        assert_eq!(slice_indices(5, None, None, 1).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(slice_indices(5, Some(-2), None, 1).unwrap(), vec![3, 4]);
        assert_eq!(slice_indices(5, None, None, -2).unwrap(), vec![4, 2, 0]);
        assert_eq!(slice_indices(5, Some(10), Some(-10), -1).unwrap(), vec![4, 3, 2, 1, 0]);
        assert!(slice_indices(5, None, None, 0).is_err());
    }

    #[test]
    fn basic_get() {
        let a = masked_array![[1, X, 3], [4, 5, 6]];
        let col = a.get(&[Idx::Full, Idx::At(1)]).unwrap().into_array();
        assert_eq!(col.shape(), &[2]);
        assert_eq!(col.mask(), &Mask::from_vec(vec![true, false]));

        let rev = a.get(&[Idx::At(0), Idx::slice(None, None, -1)]).unwrap().into_array();
        assert_eq!(rev.filled(0).to_vec::<i32>().unwrap(), vec![3, 0, 1]);

        let expanded = a.get(&[Idx::NewAxis, Idx::from(..1isize)]).unwrap();
        assert_eq!(expanded.shape(), &[1, 1, 3]);

        let s = a.get(&[Idx::At(1), Idx::At(-1)]).unwrap().into_scalar().unwrap();
        assert_eq!(s, MaskedScalar::new(6i32, false));
        assert!(a.get(&[Idx::At(0); 3]).is_err());
        assert!(matches!(a.get(&[Idx::At(2)]), Err(Error::IndexOutOfBounds { .. })));
    }

    #[test]
    fn assignment() {
        let mut a = masked_array![1.0, 2.0, 3.0, 4.0];
        a.set(&[Idx::At(1)], X).unwrap();
        assert_eq!(a.mask(), &Mask::from_vec(vec![false, true, false, false]));
        assert_eq!(a.data().get(&[1]), Some(CellValue::Float64(2.0)));

        a.set(&[Idx::from(2isize..)], 9.0).unwrap();
        assert_eq!(a.filled(0.0).to_vec::<f64>().unwrap(), vec![1.0, 0.0, 9.0, 9.0]);

        a.set(&[Idx::from(..2isize)], masked_array![X, 7.0]).unwrap();
        assert_eq!(a.mask(), &Mask::from_vec(vec![true, false, false, false]));
        assert_eq!(a.filled(0.0).to_vec::<f64>().unwrap(), vec![0.0, 7.0, 9.0, 9.0]);
    }

    #[test]
    fn readonly() {
        let mut b = masked_array![1, 2].broadcast_to(&[2, 2]).unwrap();
        assert!(matches!(b.set(&[Idx::At(0)], 3), Err(Error::ReadOnly(_))));
        let mut c = masked_array![1, 2].into_readonly();
        assert!(matches!(c.set(&[Idx::At(0)], X), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn boolean() {
        let a = masked_array![10, 20, X, 40];
        let cond = masked_array![true, X, true, true];
        let s = a.select(&cond).unwrap();
        assert_eq!(s.shape(), &[3]);
        assert_eq!(s.mask(), &Mask::from_vec(vec![false, true, false]));

        let mut b = a.clone();
        b.set_where(&cond, masked_array![0, 0, 0, X]).unwrap();
        assert_eq!(b.mask(), &Mask::from_vec(vec![false, false, false, true]));
        assert_eq!(b.data().get(&[1]), Some(CellValue::Int32(20)));
        assert!(a.select(&masked_array![true]).is_err());
    }

    #[test]
    fn take_and_put() {
        let a = masked_array![[1, 2, X], [4, 5, 6]];
        let idx = MaskedArray::from(CellArray::from(vec![2i64, 0]));
        let t = a.take(&idx, Some(1)).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.mask(), &Mask::new(ndarray::arr2(&[[true, false], [false, false]]).into_dyn()));
        let flat = a.take(&idx, None).unwrap();
        assert_eq!(flat.filled(-1).to_vec::<i32>().unwrap(), vec![-1, 1]);

        let bad = masked_array![0i64, X];
        assert_eq!(a.take(&bad, None), Err(Error::IndexMask));

        let mut p = MaskedArray::masked_all(&[4], CellType::Int16);
        let idx = MaskedArray::from(CellArray::from(vec![0i64, 1, -1]));
        p.put(&idx, CellArray::from(vec![7i16, 8])).unwrap();
        assert_eq!(p.filled(0).to_vec::<i16>().unwrap(), vec![7, 8, 0, 7]);
    }
}
