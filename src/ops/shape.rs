/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Shape manipulation. Every transformation moves data and mask together.

use super::{along, binary, pick};
use crate::array::{broadcast_shape, broadcast_view, flatten, normalize_axis, normalize_index, reshape, Structural};
use crate::dispatch::{coerce, weak_type, Operand};
use crate::error::{ConstructionError, Error, Result};
use crate::flavor::resolve_flavors;
use crate::kernel::UFunc;
use crate::masked::unmasked_indices;
use crate::{Assign, CellArray, CellType, CellValue, Element, Mask, MaskedArray};
use ndarray::{concatenate as join_axis, stack as stack_axis, Array1, ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use std::ops::Range;

/// A shape transformation shared by the data and mask of an array.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Layout {
    Reshape(Vec<usize>),
    Permute(Vec<usize>),
    Flip(Vec<usize>),
    Roll { shift: isize, axis: usize },
    /// Keep the listed positions along `axis`, in order. Positions may repeat.
    Select { axis: usize, keep: Vec<usize> },
    /// Fill `shape` by cycling through the cells in row-major order.
    Resize(Vec<usize>),
    Diagonal { offset: isize, axis1: usize, axis2: usize },
    InsertAxis(usize),
    /// Drop length-one axes, listed in ascending order.
    RemoveAxes(Vec<usize>),
}

impl Structural for Layout {
    fn apply<T: Element>(&self, array: ArrayViewD<'_, T>) -> Result<ArrayD<T>> {
        match self {
            Layout::Reshape(shape) => reshape(array, shape),
            Layout::Permute(axes) => Ok(array.permuted_axes(IxDyn(axes)).to_owned()),
            Layout::Flip(axes) => {
                let mut v = array;
                for &ax in axes {
                    v.invert_axis(Axis(ax));
                }
                Ok(v.to_owned())
            }
            Layout::Roll { shift, axis } => {
                let n = array.len_of(Axis(*axis));
                if n == 0 {
                    return Ok(array.to_owned());
                }
                let cut = n - shift.rem_euclid(n as isize) as usize;
                Ok(join_axis(
                    Axis(*axis),
                    &[
                        array.slice_axis(Axis(*axis), Slice::from(cut..)),
                        array.slice_axis(Axis(*axis), Slice::from(..cut)),
                    ],
                )?)
            }
            Layout::Select { axis, keep } => Ok(array.select(Axis(*axis), keep)),
            Layout::Resize(shape) => {
                let total = shape.iter().product::<usize>();
                let cells: Vec<T> = array.iter().copied().cycle().take(total).collect();
                if cells.len() < total {
                    return Err(Error::invalid("cannot resize an empty array"));
                }
                Ok(ArrayD::from_shape_vec(IxDyn(shape), cells)?)
            }
            Layout::Diagonal { offset, axis1, axis2 } => {
                let mut order: Vec<usize> = (0..array.ndim()).filter(|d| d != axis1 && d != axis2).collect();
                let outer = order.len();
                order.extend([*axis1, *axis2]);
                let v = array.permuted_axes(IxDyn(&order));
                let (rows, cols) = (v.shape()[outer], v.shape()[outer + 1]);
                let (r0, c0) = if *offset >= 0 {
                    (0, offset.unsigned_abs())
                } else {
                    (offset.unsigned_abs(), 0)
                };
                let len = rows.saturating_sub(r0).min(cols.saturating_sub(c0));
                let mut shape = v.shape()[..outer].to_vec();
                shape.push(len);
                Ok(ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
                    let mut at: Vec<usize> = (0..outer).map(|d| ix[d]).collect();
                    at.push(r0 + ix[outer]);
                    at.push(c0 + ix[outer]);
                    v[at.as_slice()]
                }))
            }
            Layout::InsertAxis(axis) => Ok(array.insert_axis(Axis(*axis)).to_owned()),
            Layout::RemoveAxes(axes) => {
                let mut v = array;
                for &ax in axes.iter().rev() {
                    v = v.index_axis_move(Axis(ax), 0);
                }
                Ok(v.to_owned())
            }
        }
    }
}

/// Join masked arrays along an existing `axis`, promoting to a common cell type.
pub(super) fn join(axis: usize, arrays: &[MaskedArray]) -> Result<MaskedArray> {
    let flavor = resolve_flavors(arrays.iter().map(MaskedArray::flavor))?;
    let data: Vec<CellArray> = arrays.iter().map(|a| a.data().clone()).collect();
    let masks: Vec<ArrayViewD<'_, bool>> = arrays.iter().map(|a| a.mask().view()).collect();
    let mask = join_axis(Axis(axis), &masks)?;
    Ok(MaskedArray::from_parts(CellArray::concatenate(axis, &data)?, Mask::new(mask), flavor))
}

fn with_len(shape: &[usize], axis: usize, len: usize) -> Vec<usize> {
    let mut s = shape.to_vec();
    s[axis] = len;
    s
}

/// Row-major positions into an array of `shape` picked by `indices` along `axis`.
///
/// Dimensions other than `axis` broadcast between the array and `indices`. `None`
/// treats the array as flattened.
fn along_positions(shape: &[usize], indices: &MaskedArray, axis: Option<isize>) -> Result<ArrayD<usize>> {
    let idx = unmasked_indices(indices)?;
    let (shape, ax) = match axis {
        None => (vec![shape.iter().product()], 0),
        Some(a) => (shape.to_vec(), normalize_axis(a, shape.len())?),
    };
    if idx.ndim() != shape.len() {
        return Err(Error::invalid("`indices` and `arr` must have the same number of dimensions"));
    }
    let n = shape[ax];
    let out_shape = with_len(
        &broadcast_shape(&with_len(&shape, ax, 1), &with_len(idx.shape(), ax, 1))?,
        ax,
        idx.shape()[ax],
    );
    let picks = broadcast_view(&idx, &out_shape)?
        .iter()
        .map(|&i| normalize_index(i, n))
        .collect::<Result<Vec<_>>>()?;
    let picks = ArrayD::from_shape_vec(IxDyn(&out_shape), picks)?;
    let mut strides = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    Ok(ArrayD::from_shape_fn(picks.raw_dim(), |ix| {
        let p = picks[&ix];
        (0..shape.len())
            .map(|d| {
                let i = match d {
                    d if d == ax => p,
                    d if shape[d] == 1 => 0,
                    d => ix[d],
                };
                i * strides[d]
            })
            .sum::<usize>()
    }))
}

impl MaskedArray {
    pub(crate) fn restructure(&self, layout: &Layout) -> Result<MaskedArray> {
        let data = self.data().restructure(layout)?;
        let mask = layout.apply(self.mask().view())?;
        Ok(MaskedArray::from_parts(data, Mask::new(mask), self.flavor()))
    }

    /// The cells covering `range` along `axis`.
    pub(crate) fn part(&self, axis: usize, range: Range<usize>) -> MaskedArray {
        let mask = self
            .mask()
            .view()
            .slice_axis(Axis(axis), Slice::from(range.clone()))
            .to_owned();
        MaskedArray::from_parts(self.data().slice_axis(axis, range), Mask::new(mask), self.flavor())
    }

    /// `self` with length-one axes prepended up to `ndim` dimensions.
    pub(crate) fn with_ndim(&self, ndim: usize) -> Result<MaskedArray> {
        if self.ndim() >= ndim {
            return Ok(self.clone());
        }
        let mut shape = vec![1; ndim - self.ndim()];
        shape.extend_from_slice(self.shape());
        self.reshape(&shape)
    }

    /// Writeable copy of data and mask.
    pub fn copy(&self) -> MaskedArray {
        MaskedArray::from_parts(self.data().clone(), self.mask().clone(), self.flavor())
    }

    /// One-dimensional copy in row-major order.
    pub fn ravel(&self) -> MaskedArray {
        MaskedArray::from_parts(self.data().ravel(), Mask::new(flatten(self.mask().view())), self.flavor())
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<MaskedArray> {
        self.restructure(&Layout::Reshape(shape.to_vec()))
    }

    /// Permute the axes; `None` reverses them.
    pub fn transpose(&self, axes: Option<&[usize]>) -> Result<MaskedArray> {
        let ndim = self.ndim();
        let axes = match axes {
            None => (0..ndim).rev().collect(),
            Some(a) => {
                let mut seen = vec![false; ndim];
                if a.len() != ndim || a.iter().any(|&d| d >= ndim || std::mem::replace(&mut seen[d], true)) {
                    return Err(Error::invalid("axes don't match array"));
                }
                a.to_vec()
            }
        };
        self.restructure(&Layout::Permute(axes))
    }

    pub fn swapaxes(&self, axis1: isize, axis2: isize) -> Result<MaskedArray> {
        let (a, b) = (normalize_axis(axis1, self.ndim())?, normalize_axis(axis2, self.ndim())?);
        let mut axes: Vec<usize> = (0..self.ndim()).collect();
        axes.swap(a, b);
        self.restructure(&Layout::Permute(axes))
    }

    /// Move axis `source` to position `destination`, keeping the order of the others.
    pub fn moveaxis(&self, source: isize, destination: isize) -> Result<MaskedArray> {
        let (s, d) = (normalize_axis(source, self.ndim())?, normalize_axis(destination, self.ndim())?);
        let mut axes: Vec<usize> = (0..self.ndim()).filter(|&a| a != s).collect();
        axes.insert(d, s);
        self.restructure(&Layout::Permute(axes))
    }

    pub fn expand_dims(&self, axis: isize) -> Result<MaskedArray> {
        self.restructure(&Layout::InsertAxis(normalize_axis(axis, self.ndim() + 1)?))
    }

    /// Remove length-one axes: all of them, or only `axis`.
    pub fn squeeze(&self, axis: Option<isize>) -> Result<MaskedArray> {
        let axes = match axis {
            None => (0..self.ndim()).filter(|&d| self.shape()[d] == 1).collect(),
            Some(ax) => {
                let d = normalize_axis(ax, self.ndim())?;
                if self.shape()[d] != 1 {
                    return Err(Error::invalid(
                        "cannot select an axis to squeeze out which has size not equal to one",
                    ));
                }
                vec![d]
            }
        };
        self.restructure(&Layout::RemoveAxes(axes))
    }

    /// Reverse the order of cells along `axis`, or along every axis.
    pub fn flip(&self, axis: Option<isize>) -> Result<MaskedArray> {
        let axes = match axis {
            None => (0..self.ndim()).collect(),
            Some(ax) => vec![normalize_axis(ax, self.ndim())?],
        };
        self.restructure(&Layout::Flip(axes))
    }

    /// Shift cells by `shift` along `axis`, wrapping around. `None` rolls the flattened
    /// array and restores the shape.
    pub fn roll(&self, shift: isize, axis: Option<isize>) -> Result<MaskedArray> {
        match axis {
            None => self
                .ravel()
                .restructure(&Layout::Roll { shift, axis: 0 })?
                .reshape(self.shape()),
            Some(ax) => self.restructure(&Layout::Roll { shift, axis: normalize_axis(ax, self.ndim())? }),
        }
    }

    /// Repeat every cell along `axis`. `repeats` holds one count for all cells or one per cell.
    pub fn repeat(&self, repeats: &[usize], axis: Option<isize>) -> Result<MaskedArray> {
        let (src, ax) = along(self, axis)?;
        let n = src.shape()[ax];
        let counts = match repeats {
            [r] => vec![*r; n],
            r if r.len() == n => r.to_vec(),
            r => {
                return Err(Error::Shape(format!(
                    "operands could not be broadcast together with shape ({n},) ({},)",
                    r.len()
                )))
            }
        };
        let keep = counts
            .iter()
            .enumerate()
            .flat_map(|(i, &c)| std::iter::repeat(i).take(c))
            .collect();
        src.restructure(&Layout::Select { axis: ax, keep })
    }

    /// A new array of `shape` filled by repeating the cells of `self`.
    ///
    /// An empty array resizes to unmasked zeros.
    pub fn resized(&self, shape: &[usize]) -> Result<MaskedArray> {
        if self.is_empty() {
            return Ok(MaskedArray::from_parts(
                CellArray::zeros(shape, self.dtype()),
                Mask::fill(shape, false),
                self.flavor(),
            ));
        }
        self.restructure(&Layout::Resize(shape.to_vec()))
    }

    /// Change the shape in place. Cells beyond the current size are unmasked zeros.
    pub fn resize(&mut self, shape: &[usize]) -> Result<()> {
        self.check_writeable()?;
        let total = shape.iter().product::<usize>();
        let keep = self.len().min(total);
        let head = self.ravel().part(0, 0..keep);
        let pad = MaskedArray::from_parts(
            CellArray::zeros(&[total - keep], self.dtype()),
            Mask::fill(&[total - keep], false),
            self.flavor(),
        );
        let (data, mask) = join(0, &[head, pad])?.reshape(shape)?.into_parts();
        let (d, m) = self.parts_mut();
        *d = data;
        *m = mask;
        Ok(())
    }

    /// Cells on the diagonal of `axis1` and `axis2` with `offset`, moved to a new last axis.
    pub fn diagonal(&self, offset: isize, axis1: isize, axis2: isize) -> Result<MaskedArray> {
        if self.ndim() < 2 {
            return Err(Error::invalid("diag requires an array of at least two dimensions"));
        }
        let (axis1, axis2) = (normalize_axis(axis1, self.ndim())?, normalize_axis(axis2, self.ndim())?);
        if axis1 == axis2 {
            return Err(Error::invalid("axis1 and axis2 cannot be the same"));
        }
        self.restructure(&Layout::Diagonal { offset, axis1, axis2 })
    }

    fn triangle(&self, keep: impl Fn(isize) -> bool) -> Result<MaskedArray> {
        let nd = self.ndim();
        if nd < 2 {
            return Err(Error::invalid("triangle requires an array of at least two dimensions"));
        }
        let cond = ArrayD::from_shape_fn(IxDyn(self.shape()), |ix| {
            keep(ix[nd - 1] as isize - ix[nd - 2] as isize)
        });
        Ok(pick(&cond, self, &self.zeros_like(None)))
    }

    /// Lower triangle of the last two axes. Cells above diagonal `k` become unmasked zeros.
    pub fn tril(&self, k: isize) -> Result<MaskedArray> {
        self.triangle(|d| d <= k)
    }

    /// Upper triangle of the last two axes. Cells below diagonal `k` become unmasked zeros.
    pub fn triu(&self, k: isize) -> Result<MaskedArray> {
        self.triangle(|d| d >= k)
    }

    /// Slices along `axis` where `cond` is true. A masked condition counts as false.
    pub fn compress<'c>(&self, cond: impl Into<Operand<'c>>, axis: Option<isize>) -> Result<MaskedArray> {
        let cond = cond.into().to_masked(Some(CellType::Bool))?;
        if cond.ndim() != 1 {
            return Err(Error::invalid("condition must be a 1-d array"));
        }
        let (src, ax) = along(self, axis)?;
        let n = src.shape()[ax];
        let keep: Vec<usize> = cond
            .filled(false)
            .to_bool()
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect();
        if let Some(&i) = keep.iter().find(|&&i| i >= n) {
            return Err(Error::IndexOutOfBounds { index: i as isize, len: n });
        }
        src.restructure(&Layout::Select { axis: ax, keep })
    }

    /// Drop the slices at `indices` along `axis`.
    pub fn delete(&self, indices: &[isize], axis: Option<isize>) -> Result<MaskedArray> {
        let (src, ax) = along(self, axis)?;
        let n = src.shape()[ax];
        let mut dropped = vec![false; n];
        for &i in indices {
            dropped[normalize_index(i, n)?] = true;
        }
        let keep = (0..n).filter(|&i| !dropped[i]).collect();
        src.restructure(&Layout::Select { axis: ax, keep })
    }

    /// Insert `values` before `index` along `axis`.
    ///
    /// The values take the cell type of `self` and stay unmasked unless they are masked.
    /// A one-dimensional target takes every value; otherwise the values are broadcast
    /// to a single slice.
    pub fn insert<'v>(&self, index: isize, values: impl Into<Operand<'v>>, axis: Option<isize>) -> Result<MaskedArray> {
        let (src, ax) = along(self, axis)?;
        let n = src.shape()[ax];
        let at = if index < 0 { index + n as isize } else { index };
        if at < 0 || at > n as isize {
            return Err(Error::IndexOutOfBounds { index, len: n });
        }
        let at = at as usize;
        let values = values.into().to_masked(Some(self.dtype()))?.astype(self.dtype());
        let values = if src.ndim() == 1 {
            values.ravel()
        } else {
            values.broadcast_to(&with_len(src.shape(), ax, 1))?.copy()
        };
        join(ax, &[src.part(ax, 0..at), values, src.part(ax, at..n)])
    }

    /// Cells at `indices` along `axis`, matched lane by lane.
    pub fn take_along_axis(&self, indices: &MaskedArray, axis: Option<isize>) -> Result<MaskedArray> {
        Ok(self.gather_at(&along_positions(self.shape(), indices, axis)?))
    }

    /// Write `values` at `indices` along `axis`, matched lane by lane.
    ///
    /// Masked values write their mask too; plain values only replace data.
    pub fn put_along_axis<'v>(
        &mut self,
        indices: &MaskedArray,
        values: impl Into<Operand<'v>>,
        axis: Option<isize>,
    ) -> Result<()> {
        self.check_writeable()?;
        let pos = along_positions(self.shape(), indices, axis)?;
        match values.into() {
            Operand::Masked => self.assign_at(&pos, Assign::Sentinel),
            values => {
                let v = values.to_masked(Some(self.dtype()))?;
                if v.mask().any() || values.is_masked_type() {
                    self.assign_at(&pos, Assign::Masked(v))
                } else {
                    self.parts_mut().0.scatter(&pos, v.data())
                }
            }
        }
    }

    /// `n`-th discrete difference along `axis`.
    ///
    /// `prepend` and `append` are joined to the array first; zero-dimensional ones are
    /// broadcast to a single slice. A difference is masked where either neighbour is.
    pub fn diff<'v>(
        &self,
        n: usize,
        axis: isize,
        prepend: Option<Operand<'v>>,
        append: Option<Operand<'v>>,
    ) -> Result<MaskedArray> {
        if n == 0 {
            return Ok(self.clone());
        }
        if self.ndim() == 0 {
            return Err(Error::invalid("diff requires input that is at least one dimensional"));
        }
        let ax = normalize_axis(axis, self.ndim())?;
        let edge = |o: Operand<'v>| -> Result<MaskedArray> {
            let m = o.to_masked(Some(self.dtype()))?;
            if m.ndim() == 0 {
                Ok(m.broadcast_to(&with_len(self.shape(), ax, 1))?.copy())
            } else {
                Ok(m)
            }
        };
        let mut cur = match (prepend, append) {
            (None, None) => self.clone(),
            (p, a) => {
                let mut parts = Vec::with_capacity(3);
                if let Some(p) = p {
                    parts.push(edge(p)?);
                }
                parts.push(self.clone());
                if let Some(a) = a {
                    parts.push(edge(a)?);
                }
                join(ax, &parts)?
            }
        };
        let op = if cur.dtype().is_bool() { UFunc::NotEqual } else { UFunc::Subtract };
        for _ in 0..n {
            let len = cur.shape()[ax];
            let hi = cur.part(ax, len.min(1)..len);
            let lo = cur.part(ax, 0..len.saturating_sub(1));
            cur = binary(op, &hi, &lo)?;
        }
        Ok(cur)
    }

    /// Unmasked array shaped like `self`, holding `value` cast to `dtype` or the type of `self`.
    pub fn full_like(&self, value: CellValue, dtype: Option<CellType>) -> MaskedArray {
        let ct = dtype.unwrap_or(self.dtype());
        MaskedArray::from_parts(
            CellArray::full(self.shape(), value.cast(ct)),
            Mask::fill(self.shape(), false),
            self.flavor(),
        )
    }

    /// Overwrite cells of `self` with `src` where `cond` holds, or everywhere without one.
    ///
    /// `src` and `cond` broadcast to the shape of `self`; copied cells take the mask of `src`.
    pub fn copyto<'a>(&mut self, src: impl Into<Operand<'a>>, cond: Option<&CellArray>) -> Result<()> {
        self.check_writeable()?;
        let dtype = self.dtype();
        let src = src.into().to_masked(Some(dtype))?.astype(dtype).broadcast_to(self.shape())?;
        let cond = match cond {
            Some(c) => broadcast_view(&c.to_bool(), self.shape())?.to_owned(),
            None => ArrayD::from_elem(IxDyn(self.shape()), true),
        };
        self.overwrite(&cond, &src);
        Ok(())
    }

    /// Overwrite flat cell `i` of `self` with `values[i % len(values)]` where `cond` holds.
    ///
    /// `cond` must have as many cells as `self`. Empty `values` change nothing.
    pub fn putmask<'a>(&mut self, cond: &CellArray, values: impl Into<Operand<'a>>) -> Result<()> {
        self.check_writeable()?;
        if cond.len() != self.len() {
            return Err(Error::invalid("putmask: mask and data must be the same size"));
        }
        let dtype = self.dtype();
        let values = values.into().to_masked(Some(dtype))?.astype(dtype).ravel();
        let n = values.len();
        if n == 0 {
            return Ok(());
        }
        let cycled = values
            .gather_at(&ArrayD::from_shape_fn(IxDyn(&[self.len()]), |ix| ix[0] % n))
            .reshape(self.shape())?;
        let cond = ArrayD::from_shape_vec(IxDyn(self.shape()), cond.to_bool().iter().copied().collect())?;
        self.overwrite(&cond, &cycled);
        Ok(())
    }

    fn overwrite(&mut self, cond: &ArrayD<bool>, src: &MaskedArray) {
        let (data, mask) = pick(cond, src, self).into_parts();
        let (d, m) = self.parts_mut();
        *d = data;
        *m = mask;
    }

    pub fn zeros_like(&self, dtype: Option<CellType>) -> MaskedArray {
        self.full_like(dtype.unwrap_or(self.dtype()).zero(), dtype)
    }

    pub fn ones_like(&self, dtype: Option<CellType>) -> MaskedArray {
        self.full_like(dtype.unwrap_or(self.dtype()).one(), dtype)
    }
}

/// A two-dimensional array with `v` on diagonal `k` from a one-dimensional `v`, or
/// diagonal `k` of a two-dimensional `v`.
///
/// Cells off the diagonal of a built array are unmasked zeros.
pub fn diag(v: &MaskedArray, k: isize) -> Result<MaskedArray> {
    match v.ndim() {
        1 => {
            let len = v.len();
            let n = len + k.unsigned_abs();
            let (r0, c0) = if k >= 0 { (0, k.unsigned_abs()) } else { (k.unsigned_abs(), 0) };
            let pos = Array1::from_iter((0..len).map(|i| (r0 + i) * n + c0 + i)).into_dyn();
            let mut out = MaskedArray::from_parts(
                CellArray::zeros(&[n, n], v.dtype()),
                Mask::fill(&[n, n], false),
                v.flavor(),
            );
            out.assign_at(&pos, Assign::Masked(v.clone()))?;
            Ok(out)
        }
        2 => v.diagonal(k, 0, 1),
        _ => Err(Error::invalid("Input must be 1- or 2-d.")),
    }
}

/// A two-dimensional array with the flattened `v` on diagonal `k`.
pub fn diagflat(v: &MaskedArray, k: isize) -> Result<MaskedArray> {
    diag(&v.ravel(), k)
}

/// Join `arrays` along `axis`, or their flattened cells when `None`.
pub fn concatenate(arrays: &[Operand<'_>], axis: Option<isize>) -> Result<MaskedArray> {
    let arrays = coerce(arrays)?;
    let first = arrays
        .first()
        .ok_or_else(|| Error::invalid("need at least one array to concatenate"))?;
    match axis {
        None => join(0, &arrays.iter().map(MaskedArray::ravel).collect::<Vec<_>>()),
        Some(ax) => join(normalize_axis(ax, first.ndim())?, &arrays),
    }
}

/// Join equally shaped `arrays` along a new `axis`.
pub fn stack(arrays: &[Operand<'_>], axis: isize) -> Result<MaskedArray> {
    let arrays = coerce(arrays)?;
    let first = arrays
        .first()
        .ok_or_else(|| Error::invalid("need at least one array to stack"))?;
    if arrays.iter().any(|a| a.shape() != first.shape()) {
        return Err(Error::Shape("all input arrays must have the same shape".into()));
    }
    let ax = normalize_axis(axis, first.ndim() + 1)?;
    let flavor = resolve_flavors(arrays.iter().map(MaskedArray::flavor))?;
    let data: Vec<CellArray> = arrays.iter().map(|a| a.data().clone()).collect();
    let masks: Vec<ArrayViewD<'_, bool>> = arrays.iter().map(|a| a.mask().view()).collect();
    let mask = stack_axis(Axis(ax), &masks)?;
    Ok(MaskedArray::from_parts(CellArray::stack(ax, &data)?, Mask::new(mask), flavor))
}

/// `values` joined to the end of `a` along `axis`, or to its flattened cells when `None`.
pub fn append<'a>(
    a: impl Into<Operand<'a>>,
    values: impl Into<Operand<'a>>,
    axis: Option<isize>,
) -> Result<MaskedArray> {
    let arrays = coerce(&[a.into(), values.into()])?;
    match axis {
        None => join(0, &arrays.iter().map(MaskedArray::ravel).collect::<Vec<_>>()),
        Some(ax) => join(normalize_axis(ax, arrays[0].ndim())?, &arrays),
    }
}

/// Read-only views of `arrays` broadcast to their common shape.
pub fn broadcast_arrays(arrays: &[Operand<'_>]) -> Result<Vec<MaskedArray>> {
    let arrays = coerce(arrays)?;
    let shape = arrays
        .iter()
        .try_fold(Vec::new(), |acc, a| broadcast_shape(&acc, a.shape()))?;
    arrays.iter().map(|a| a.broadcast_to(&shape)).collect()
}

/// Cell type an operation over `operands` produces, typing plain values weakly.
pub fn result_type(operands: &[Operand<'_>]) -> Result<CellType> {
    Ok(weak_type(operands).ok_or(ConstructionError::AmbiguousDtype)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, X};

    fn mask(a: &MaskedArray) -> Vec<bool> {
        a.mask().iter().collect()
    }

    #[test]
    fn reshaping() {
        let a = masked_array![[1, X, 3], [4, 5, X]];
        let t = a.transpose(None).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(mask(&t), vec![false, false, true, false, false, true]);
        assert_eq!(t.data().to_vec::<i32>().unwrap()[..2], [1, 4]);
        assert!(a.transpose(Some(&[0, 0])).is_err());

        let r = a.reshape(&[3, 2]).unwrap();
        assert_eq!(mask(&r), mask(&a));
        assert!(a.reshape(&[4]).is_err());

        assert_eq!(a.ravel().shape(), &[6]);
        assert_eq!(a.swapaxes(0, -1).unwrap(), t);
        assert_eq!(a.moveaxis(0, 1).unwrap(), t);

        let e = a.expand_dims(1).unwrap();
        assert_eq!(e.shape(), &[2, 1, 3]);
        assert_eq!(e.squeeze(None).unwrap(), a);
        assert!(a.squeeze(Some(0)).is_err());
    }

    #[test]
    fn flips_and_rolls() {
        let a = masked_array![1, X, 3, 4];
        let f = a.flip(None).unwrap();
        assert_eq!(f.data().to_vec::<i32>().unwrap()[..2], [4, 3]);
        assert_eq!(mask(&f), vec![false, false, true, false]);

        let r = a.roll(1, None).unwrap();
        assert_eq!(r.data().to_vec::<i32>().unwrap()[0], 4);
        assert_eq!(mask(&r), vec![false, false, true, false]);
        assert_eq!(a.roll(-3, Some(0)).unwrap(), r);

        let g = masked_array![[1, 2], [X, 4]];
        let rolled = g.roll(1, None).unwrap();
        assert_eq!(rolled.shape(), &[2, 2]);
        assert_eq!(mask(&rolled), vec![false, false, false, true]);
    }

    #[test]
    fn repeats_and_resizes() {
        let a = masked_array![1, X];
        let r = a.repeat(&[2], None).unwrap();
        assert_eq!(mask(&r), vec![false, false, true, true]);
        assert_eq!(a.repeat(&[0, 3], None).unwrap().count_masked(), 3);
        assert!(a.repeat(&[1, 2, 3], None).is_err());

        let big = a.resized(&[2, 3]).unwrap();
        assert_eq!(mask(&big), vec![false, true, false, true, false, true]);

        let mut m = masked_array![1, X, 3];
        m.resize(&[5]).unwrap();
        assert_eq!(m.data().to_vec::<i32>().unwrap()[3..], [0, 0]);
        assert_eq!(mask(&m), vec![false, true, false, false, false]);
        let mut ro = masked_array![1].into_readonly();
        assert!(ro.resize(&[2]).is_err());
    }

    #[test]
    fn diagonals() {
        let a = masked_array![[1, 2, 3], [4, X, 6], [7, 8, 9]];
        let d = a.diagonal(0, 0, 1).unwrap();
        assert_eq!(mask(&d), vec![false, true, false]);
        assert_eq!(a.diagonal(1, 0, 1).unwrap().data().to_vec::<i32>().unwrap(), vec![2, 6]);
        assert_eq!(a.diagonal(-2, 0, 1).unwrap().data().to_vec::<i32>().unwrap(), vec![7]);
        assert!(a.diagonal(0, 1, -1).is_err());

        let v = masked_array![1.0, X];
        let built = diag(&v, 1).unwrap();
        assert_eq!(built.shape(), &[3, 3]);
        assert_eq!(built.count_masked(), 1);
        assert!(built.mask().get(&[1, 2]));
        assert_eq!(built.data().get(&[0, 1]), Some(CellValue::Float64(1.0)));
        assert_eq!(diag(&built, 1).unwrap().count_masked(), 1);
        assert!(diag(&masked_array![[[1]]], 0).is_err());

        let flat = diagflat(&masked_array![[1, X], [3, 4]], -1).unwrap();
        assert_eq!(flat.shape(), &[5, 5]);
        assert!(flat.mask().get(&[2, 1]));
        assert_eq!(flat.data().get(&[4, 3]), Some(CellValue::Int32(4)));
        assert_eq!(flat.count_masked(), 1);
    }

    #[test]
    fn copies_into() {
        let mut a = masked_array![[1, 2], [3, X]];
        a.copyto(&masked_array![9, X], None).unwrap();
        assert_eq!(a.data().get(&[0, 0]), Some(CellValue::Int32(9)));
        assert_eq!(a.data().get(&[1, 0]), Some(CellValue::Int32(9)));
        assert_eq!(mask(&a), vec![false, true, false, true]);

        let mut b = masked_array![1.0, 2.0, X];
        let cond = CellArray::from(vec![false, true, true]);
        b.copyto(7, Some(&cond)).unwrap();
        assert_eq!(b.data().to_vec::<f64>().unwrap(), vec![1.0, 7.0, 7.0]);
        assert_eq!(mask(&b), vec![false; 3]);

        assert!(b.copyto(&masked_array![1.0, 2.0], None).is_err());
        let mut ro = masked_array![1].into_readonly();
        assert!(ro.copyto(2, None).is_err());
    }

    #[test]
    fn puts_by_mask() {
        let mut a = masked_array![[0, 1, 2], [3, X, 5]];
        let cond = CellArray::from_vec(&[2, 3], vec![true, false, true, false, true, true]).unwrap();
        a.putmask(&cond, &masked_array![10, X]).unwrap();
        assert_eq!(a.data().get(&[0, 0]), Some(CellValue::Int32(10)));
        assert_eq!(a.data().get(&[0, 2]), Some(CellValue::Int32(10)));
        assert_eq!(a.data().get(&[1, 1]), Some(CellValue::Int32(10)));
        assert_eq!(mask(&a), vec![false, false, false, false, false, true]);

        let before = a.clone();
        a.putmask(&cond, &CellArray::from(Vec::<i32>::new())).unwrap();
        assert_eq!(a, before);
        assert!(a.putmask(&CellArray::from(vec![true]), 1).is_err());
    }

    #[test]
    fn triangles() {
        let a = masked_array![[X, 2], [3, X]];
        let lo = a.tril(0).unwrap();
        assert_eq!(lo.data().to_vec::<i32>().unwrap()[1], 0);
        assert_eq!(mask(&lo), vec![true, false, false, true]);
        let hi = a.triu(1).unwrap();
        assert_eq!(mask(&hi), vec![false; 4]);
        assert_eq!(hi.data().to_vec::<i32>().unwrap(), vec![0, 2, 0, 0]);
        assert!(masked_array![1, 2].tril(0).is_err());
    }

    #[test]
    fn selections() {
        let a = masked_array![[1, X], [3, 4], [5, 6]];
        let cond = masked_array![true, X, true];
        let c = a.compress(&cond, Some(0)).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(mask(&c), vec![false, true, false, false]);
        assert_eq!(a.compress(&masked_array![false, true], None).unwrap().shape(), &[1]);

        let d = a.delete(&[0, -1], Some(0)).unwrap();
        assert_eq!(d.data().to_vec::<i32>().unwrap(), vec![3, 4]);
        assert!(a.delete(&[3], Some(0)).is_err());
        assert_eq!(a.delete(&[1], None).unwrap().count_masked(), 0);
    }

    #[test]
    fn insertions() {
        let a = masked_array![1, X, 3];
        let i = a.insert(1, CellValue::Float64(9.0), None).unwrap();
        assert_eq!(i.dtype(), CellType::Int32);
        assert_eq!(i.data().to_vec::<i32>().unwrap()[1], 9);
        assert_eq!(mask(&i), vec![false, false, true, false]);
        let end = a.insert(3, Operand::Masked, None).unwrap();
        assert_eq!(mask(&end), vec![false, true, false, true]);
        assert!(a.insert(5, CellValue::Int32(0), None).is_err());

        let g = masked_array![[1, 2], [3, 4]];
        let col = g.insert(-1, CellValue::Int32(0), Some(1)).unwrap();
        assert_eq!(col.shape(), &[2, 3]);
        assert_eq!(col.data().to_vec::<i32>().unwrap(), vec![1, 0, 2, 3, 0, 4]);

        let joined = append(&a, &masked_array![X, 5], None).unwrap();
        assert_eq!(joined.len(), 5);
        assert_eq!(joined.count_masked(), 2);
    }

    #[test]
    fn along_axis() {
        let a = masked_array![[10, 30, X], [60, 40, 50]];
        let idx = masked_array![[1], [0]];
        let t = a.take_along_axis(&idx, Some(1)).unwrap();
        assert_eq!(t.data().to_vec::<i32>().unwrap(), vec![30, 60]);
        let idx = masked_array![[2, 0]];
        let t = a.take_along_axis(&idx, Some(1)).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(mask(&t), vec![true, false, false, false]);
        assert_eq!(a.take_along_axis(&masked_array![[X, 1]], Some(1)), Err(Error::IndexMask));

        let mut b = a.copy();
        b.put_along_axis(&masked_array![[2], [0]], CellValue::Int32(7), Some(1)).unwrap();
        assert_eq!(b.data().get(&[0, 2]), Some(CellValue::Int32(7)));
        assert!(b.mask().get(&[0, 2]));
        b.put_along_axis(&masked_array![[1], [1]], Operand::Masked, Some(1)).unwrap();
        assert_eq!(b.count_masked(), 3);
        let fresh = masked_array![[X], [2]];
        b.put_along_axis(&masked_array![[2], [2]], &fresh, Some(1)).unwrap();
        assert_eq!(mask(&b), vec![false, true, true, false, true, false]);
    }

    #[test]
    fn differences() {
        let a = masked_array![1, 4, X, 11];
        let d = a.diff(1, -1, None, None).unwrap();
        assert_eq!(d.data().to_vec::<i32>().unwrap()[0], 3);
        assert_eq!(mask(&d), vec![false, true, true]);
        assert_eq!(a.diff(2, 0, None, None).unwrap().count(), 0);
        assert_eq!(a.diff(0, 0, None, None).unwrap(), a);
        assert_eq!(a.diff(9, 0, None, None).unwrap().len(), 0);

        let p = a.diff(1, 0, Some(CellValue::Int32(0).into()), Some(CellValue::Int32(20).into())).unwrap();
        assert_eq!(p.len(), 5);
        assert_eq!(p.data().to_vec::<i32>().unwrap()[4], 9);

        let b = masked_array![true, true, false];
        assert_eq!(b.diff(1, 0, None, None).unwrap().data().to_vec::<bool>().unwrap(), vec![false, true]);
        let s = MaskedArray::from_data(CellArray::from_value(CellValue::Int32(1)));
        assert!(s.diff(1, 0, None, None).is_err());
    }

    #[test]
    fn joins() {
        let a = masked_array![[1, X]];
        let b = masked_array![[3.5, 4.0]];
        let c = concatenate(&[Operand::from(&a), Operand::from(&b)], Some(0)).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.dtype(), CellType::Float64);
        assert_eq!(mask(&c), vec![false, true, false, false]);
        assert_eq!(concatenate(&[Operand::from(&a), Operand::from(&b)], None).unwrap().shape(), &[4]);
        assert!(concatenate(&[], Some(0)).is_err());

        let s = stack(&[Operand::from(&a), Operand::from(&b)], -1).unwrap();
        assert_eq!(s.shape(), &[1, 2, 2]);
        assert!(stack(&[Operand::from(&a), Operand::from(&masked_array![1])], 0).is_err());

        let wide = broadcast_arrays(&[Operand::from(&a), Operand::from(&masked_array![[1], [2]])]).unwrap();
        assert_eq!(wide[0].shape(), &[2, 2]);
        assert!(!wide[0].is_writeable());
        assert_eq!(wide[0].count_masked(), 2);
    }

    #[test]
    fn likes() {
        let a = masked_array![1.5, X];
        let z = a.zeros_like(None);
        assert_eq!(z.count_masked(), 0);
        assert_eq!(z.dtype(), CellType::Float64);
        assert_eq!(a.ones_like(Some(CellType::Int8)).data().to_vec::<i8>().unwrap(), vec![1, 1]);
        assert_eq!(
            a.full_like(CellValue::Int32(3), None).data().to_vec::<f64>().unwrap(),
            vec![3.0, 3.0]
        );

        let ops = [Operand::from(&a), Operand::from(CellValue::Int64(1))];
        assert_eq!(result_type(&ops).unwrap(), CellType::Float64);
        assert!(result_type(&[Operand::Masked]).is_err());
    }
}
