/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::error::{Error, Result};
use crate::{with_et, CellType, CellValue, Element};
use ndarray::{concatenate, stack, Array1, ArrayD, ArrayViewD, Axis, IxDyn, ShapeBuilder, Slice, Zip};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// CellArray enum constructor.
macro_rules! ca_enum {
    ( $(($id:ident, $p:ident)),*) => {
        /// Dynamically typed N-dimensional array, one variant per [`CellType`].
        #[derive(Clone, PartialEq)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum CellArray { $($id(ArrayD<$p>)),* }
    }
}
with_et!(ca_enum);

/// Evaluates `$body` with `$a` bound to the typed array inside a [`CellArray`].
macro_rules! on_array {
    ($arr:expr, $a:ident => $body:expr) => {
        match $arr {
            $crate::CellArray::Bool($a) => $body,
            $crate::CellArray::UInt8($a) => $body,
            $crate::CellArray::UInt16($a) => $body,
            $crate::CellArray::UInt32($a) => $body,
            $crate::CellArray::UInt64($a) => $body,
            $crate::CellArray::Int8($a) => $body,
            $crate::CellArray::Int16($a) => $body,
            $crate::CellArray::Int32($a) => $body,
            $crate::CellArray::Int64($a) => $body,
            $crate::CellArray::Float32($a) => $body,
            $crate::CellArray::Float64($a) => $body,
        }
    };
}
pub(crate) use on_array;

/// Like [`on_array`], but re-wraps the array `$body` produces in the same variant.
macro_rules! map_array {
    ($arr:expr, $a:ident => $body:expr) => {
        match $arr {
            $crate::CellArray::Bool($a) => $crate::CellArray::Bool($body),
            $crate::CellArray::UInt8($a) => $crate::CellArray::UInt8($body),
            $crate::CellArray::UInt16($a) => $crate::CellArray::UInt16($body),
            $crate::CellArray::UInt32($a) => $crate::CellArray::UInt32($body),
            $crate::CellArray::UInt64($a) => $crate::CellArray::UInt64($body),
            $crate::CellArray::Int8($a) => $crate::CellArray::Int8($body),
            $crate::CellArray::Int16($a) => $crate::CellArray::Int16($body),
            $crate::CellArray::Int32($a) => $crate::CellArray::Int32($body),
            $crate::CellArray::Int64($a) => $crate::CellArray::Int64($body),
            $crate::CellArray::Float32($a) => $crate::CellArray::Float32($body),
            $crate::CellArray::Float64($a) => $crate::CellArray::Float64($body),
        }
    };
}
pub(crate) use map_array;

/// Like [`on_array`] restricted to numeric variants; `Bool` evaluates `$bool`.
macro_rules! on_numeric {
    ($arr:expr, $a:ident => $body:expr, bool => $bool:expr) => {
        match $arr {
            $crate::CellArray::Bool(_) => $bool,
            $crate::CellArray::UInt8($a) => $body,
            $crate::CellArray::UInt16($a) => $body,
            $crate::CellArray::UInt32($a) => $body,
            $crate::CellArray::UInt64($a) => $body,
            $crate::CellArray::Int8($a) => $body,
            $crate::CellArray::Int16($a) => $body,
            $crate::CellArray::Int32($a) => $body,
            $crate::CellArray::Int64($a) => $body,
            $crate::CellArray::Float32($a) => $body,
            $crate::CellArray::Float64($a) => $body,
        }
    };
}
pub(crate) use on_numeric;

/// Evaluates `$body` over two arrays already unified to the same [`CellType`].
macro_rules! on_pair {
    ($l:expr, $r:expr, ($a:ident, $b:ident) => $body:expr) => {
        match ($l, $r) {
            ($crate::CellArray::Bool($a), $crate::CellArray::Bool($b)) => $body,
            ($crate::CellArray::UInt8($a), $crate::CellArray::UInt8($b)) => $body,
            ($crate::CellArray::UInt16($a), $crate::CellArray::UInt16($b)) => $body,
            ($crate::CellArray::UInt32($a), $crate::CellArray::UInt32($b)) => $body,
            ($crate::CellArray::UInt64($a), $crate::CellArray::UInt64($b)) => $body,
            ($crate::CellArray::Int8($a), $crate::CellArray::Int8($b)) => $body,
            ($crate::CellArray::Int16($a), $crate::CellArray::Int16($b)) => $body,
            ($crate::CellArray::Int32($a), $crate::CellArray::Int32($b)) => $body,
            ($crate::CellArray::Int64($a), $crate::CellArray::Int64($b)) => $body,
            ($crate::CellArray::Float32($a), $crate::CellArray::Float32($b)) => $body,
            ($crate::CellArray::Float64($a), $crate::CellArray::Float64($b)) => $body,
            (l, r) => unreachable!("{} <> {}", l.cell_type(), r.cell_type()),
        }
    };
}
pub(crate) use on_pair;

/// Like [`on_pair`] for numeric pairs; a `Bool` pair evaluates `$bool` with the arrays bound.
macro_rules! on_numeric_pair {
    ($l:expr, $r:expr, ($a:ident, $b:ident) => $body:expr, bool => $bool:expr) => {
        match ($l, $r) {
            ($crate::CellArray::Bool($a), $crate::CellArray::Bool($b)) => $bool,
            ($crate::CellArray::UInt8($a), $crate::CellArray::UInt8($b)) => $body,
            ($crate::CellArray::UInt16($a), $crate::CellArray::UInt16($b)) => $body,
            ($crate::CellArray::UInt32($a), $crate::CellArray::UInt32($b)) => $body,
            ($crate::CellArray::UInt64($a), $crate::CellArray::UInt64($b)) => $body,
            ($crate::CellArray::Int8($a), $crate::CellArray::Int8($b)) => $body,
            ($crate::CellArray::Int16($a), $crate::CellArray::Int16($b)) => $body,
            ($crate::CellArray::Int32($a), $crate::CellArray::Int32($b)) => $body,
            ($crate::CellArray::Int64($a), $crate::CellArray::Int64($b)) => $body,
            ($crate::CellArray::Float32($a), $crate::CellArray::Float32($b)) => $body,
            ($crate::CellArray::Float64($a), $crate::CellArray::Float64($b)) => $body,
            (l, r) => unreachable!("{} <> {}", l.cell_type(), r.cell_type()),
        }
    };
}
pub(crate) use on_numeric_pair;

/// Memory layout requested for newly built storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Order {
    /// Keep whatever layout the source has.
    #[default]
    Keep,
    /// Row-major.
    C,
    /// Column-major.
    F,
}

/// A shape-only transformation that can be applied identically to data and mask storage.
pub(crate) trait Structural {
    fn apply<T: Element>(&self, array: ArrayViewD<'_, T>) -> Result<ArrayD<T>>;
}

/// Computes the shape two operands broadcast to.
pub fn broadcast_shape(l: &[usize], r: &[usize]) -> Result<Vec<usize>> {
    let ndim = l.len().max(r.len());
    let mut out = vec![0; ndim];
    for i in 0..ndim {
        let ld = if i + l.len() >= ndim { l[i + l.len() - ndim] } else { 1 };
        let rd = if i + r.len() >= ndim { r[i + r.len() - ndim] } else { 1 };
        out[i] = match (ld, rd) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(Error::Shape(format!(
                    "operands could not be broadcast together with shapes {l:?} {r:?}"
                )))
            }
        };
    }
    Ok(out)
}

/// Resolves a possibly negative `axis` against `ndim` dimensions.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let n = ndim as isize;
    if axis < -n || axis >= n {
        return Err(Error::AxisOutOfBounds { axis, ndim });
    }
    Ok(if axis < 0 { (axis + n) as usize } else { axis as usize })
}

/// Resolves a possibly negative `index` against an axis of length `len`.
pub fn normalize_index(index: isize, len: usize) -> Result<usize> {
    let n = len as isize;
    if index < -n || index >= n {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    Ok(if index < 0 { (index + n) as usize } else { index as usize })
}

pub(crate) fn broadcast_view<'a, T>(
    array: &'a ArrayD<T>,
    shape: &[usize],
) -> Result<ArrayViewD<'a, T>> {
    array.broadcast(IxDyn(shape)).ok_or_else(|| {
        Error::Shape(format!(
            "could not broadcast array of shape {:?} to {shape:?}",
            array.shape()
        ))
    })
}

pub(crate) fn flatten<T: Clone>(array: ArrayViewD<'_, T>) -> ArrayD<T> {
    Array1::from_iter(array.iter().cloned()).into_dyn()
}

pub(crate) fn reshape<T: Clone>(array: ArrayViewD<'_, T>, shape: &[usize]) -> Result<ArrayD<T>> {
    Ok(array.to_shape(IxDyn(shape))?.into_owned())
}

/// Multi-dimensional index of the row-major `flat` position within `shape`.
pub(crate) fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (i, &d) in shape.iter().enumerate().rev() {
        if d > 0 {
            index[i] = flat % d;
            flat /= d;
        }
    }
    index
}

pub(crate) fn gather<T: Clone>(array: &ArrayD<T>, positions: &ArrayD<usize>) -> ArrayD<T> {
    let flat: Vec<&T> = array.iter().collect();
    positions.map(|&p| flat[p].clone())
}

pub(crate) fn scatter<T: Clone>(
    array: &mut ArrayD<T>,
    positions: &ArrayD<usize>,
    values: &ArrayD<T>,
) -> Result<()> {
    let values = broadcast_view(values, positions.shape())?;
    let shape = array.shape().to_vec();
    if let Some(slice) = array.as_slice_mut() {
        Zip::from(positions).and(&values).for_each(|&p, v| slice[p] = v.clone());
    } else {
        Zip::from(positions)
            .and(&values)
            .for_each(|&p, v| array[unravel(p, &shape).as_slice()] = v.clone());
    }
    Ok(())
}

fn cast_array<S: Element, T: Element>(a: &ArrayD<S>) -> ArrayD<T> {
    if S::cell_type() == T::cell_type() {
        a.mapv(|v| T::static_cast(v).unwrap_or_default())
    } else {
        a.mapv(|v| T::from_wide(v.to_wide()))
    }
}

impl CellArray {
    /// Construct a [`CellArray`] of `shape` from row-major `data`.
    pub fn from_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        Ok(T::into_cell_array(ArrayD::from_shape_vec(IxDyn(shape), data)?))
    }

    /// Wrap a statically typed array.
    pub fn from_array<T: Element>(array: ArrayD<T>) -> Self {
        T::into_cell_array(array)
    }

    /// A zero-dimensional array holding `value`.
    pub fn from_value(value: CellValue) -> Self {
        Self::full(&[], value)
    }

    /// Create an array of `shape` with all values `value`.
    pub fn full(shape: &[usize], value: CellValue) -> Self {
        macro_rules! full {
            ( $(($id:ident, $_p:ident)),*) => {
                match value {
                    $(CellValue::$id(v) => CellArray::$id(ArrayD::from_elem(IxDyn(shape), v)),)*
                }
            };
        }
        with_et!(full)
    }

    /// Construct a [`CellArray`] of `shape` and `cell_type` from row-major `values`, casting each.
    pub fn from_values(
        shape: &[usize],
        cell_type: CellType,
        values: impl IntoIterator<Item = CellValue>,
    ) -> Result<Self> {
        macro_rules! build {
            ( $(($id:ident, $p:ident)),*) => {
                match cell_type {
                    $(CellType::$id => {
                        let v: Vec<$p> = values
                            .into_iter()
                            .map(|c| <$p>::from_cell_value(c.cast(cell_type)).unwrap_or_default())
                            .collect();
                        Self::from_vec(shape, v)
                    })*
                }
            };
        }
        with_et!(build)
    }

    /// Construct a [`CellArray`] of `shape` and `ct` filled with zeros.
    pub fn zeros(shape: &[usize], ct: CellType) -> Self {
        Self::full(shape, ct.zero())
    }

    /// Get the cell type of the encoded values.
    pub fn cell_type(&self) -> CellType {
        macro_rules! ct {
            ( $(($id:ident, $_p:ident)),*) => {
                match self {
                    $(CellArray::$id(_) => CellType::$id,)*
                }
            };
        }
        with_et!(ct)
    }

    pub fn shape(&self) -> &[usize] {
        on_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        on_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at a full multi-dimensional `index`, or `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<CellValue> {
        on_array!(self, a => a.get(index).map(|v| v.into_cell_value()))
    }

    /// The first element in logical order.
    pub fn first(&self) -> Option<CellValue> {
        on_array!(self, a => a.iter().next().map(|v| v.into_cell_value()))
    }

    /// Iterate over the values in logical (row-major) order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = CellValue> + '_> {
        on_array!(self, a => Box::new(a.iter().map(|v| v.into_cell_value())))
    }

    /// Borrow the typed array when `T` matches the cell type exactly.
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::cell_array_ref(self)
    }

    /// Lossy conversion into a typed array (see [`CellValue::cast`]).
    pub fn cast_to<T: Element>(&self) -> ArrayD<T> {
        on_array!(self, a => cast_array::<_, T>(a))
    }

    /// Lossy conversion to `cell_type` (see [`CellValue::cast`]).
    pub fn astype(&self, cell_type: CellType) -> Self {
        if cell_type == self.cell_type() {
            return self.clone();
        }
        macro_rules! conv {
            ( $(($id:ident, $p:ident)),*) => {
                match cell_type {
                    $(CellType::$id => CellArray::$id(self.cast_to::<$p>()),)*
                }
            };
        }
        with_et!(conv)
    }

    /// Create a new [`CellArray`] whereby all values are converted to `cell_type`.
    ///
    /// Returns `Ok(CellArray)` if conversion is possible, and `Err(Error)` if
    /// contained values cannot fit in `cell_type` without clamping.
    pub fn convert(&self, cell_type: CellType) -> Result<Self> {
        if !self.cell_type().can_fit_into(cell_type) {
            return Err(Error::NarrowingError { src: self.cell_type(), dst: cell_type });
        }
        Ok(self.astype(cell_type))
    }

    /// Convert `self` into a `Vec<T>` in logical order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let r = self.convert(T::cell_type())?;
        Ok(r.cast_to::<T>().iter().copied().collect())
    }

    /// Truthiness of every element.
    pub fn to_bool(&self) -> ArrayD<bool> {
        on_array!(self, a => a.mapv(|v| v.is_truthy()))
    }

    /// Interpret `self` as integer indices.
    pub fn to_indices(&self) -> Result<ArrayD<isize>> {
        if !self.cell_type().is_integral() {
            return Err(Error::UnsupportedType { op: "index", cell_type: self.cell_type() });
        }
        Ok(on_array!(self, a => a.mapv(|v| v.to_wide().as_i128() as isize)))
    }

    /// Overwrite the positions where `mask` is `true` with `value` (cast to the cell type).
    pub fn fill_where(&mut self, mask: &ArrayD<bool>, value: CellValue) -> Result<()> {
        let m = broadcast_view(mask, self.shape())?;
        self.fill_masked(m, value);
        Ok(())
    }

    /// Like [`Self::fill_where`] for a mask already of the same shape.
    pub(crate) fn fill_masked(&mut self, mask: ArrayViewD<'_, bool>, value: CellValue) {
        let ct = self.cell_type();
        macro_rules! fill {
            ( $(($id:ident, $_p:ident)),*) => {
                match (self, value.cast(ct)) {
                    $((CellArray::$id(a), CellValue::$id(v)) => {
                        Zip::from(a).and(&mask).for_each(|x, &k| if k { *x = v });
                    })*
                    _ => unreachable!(),
                }
            };
        }
        with_et!(fill)
    }

    /// Copy of `self` with the positions where `mask` is `true` replaced by `value`.
    pub fn filled_where(&self, mask: &ArrayD<bool>, value: CellValue) -> Result<Self> {
        let mut out = self.clone();
        out.fill_where(mask, value)?;
        Ok(out)
    }

    /// Materialize `self` broadcast to `shape`.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        Ok(map_array!(self, a => broadcast_view(a, shape)?.to_owned()))
    }

    /// Sub-array at `index` along `axis`, with that axis removed.
    pub fn index_axis(&self, axis: usize, index: usize) -> Self {
        map_array!(self, a => a.index_axis(Axis(axis), index).to_owned())
    }

    /// Copy of the sub-array covering `range` along `axis`.
    pub fn slice_axis(&self, axis: usize, range: std::ops::Range<usize>) -> Self {
        map_array!(self, a => a.slice_axis(Axis(axis), Slice::from(range.clone())).to_owned())
    }

    pub fn insert_axis(self, axis: usize) -> Self {
        map_array!(self, a => a.insert_axis(Axis(axis)))
    }

    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        Ok(map_array!(self, a => reshape(a.view(), shape)?))
    }

    /// Flattened 1-d copy in logical order.
    pub fn ravel(&self) -> Self {
        map_array!(self, a => flatten(a.view()))
    }

    /// Values at the row-major flat `positions`, shaped like `positions`.
    pub(crate) fn gather(&self, positions: &ArrayD<usize>) -> Self {
        map_array!(self, a => gather(a, positions))
    }

    /// Write `values`, broadcast to the shape of `positions` and cast to the cell type of
    /// `self`, at the row-major flat `positions`.
    pub(crate) fn scatter(&mut self, positions: &ArrayD<usize>, values: &CellArray) -> Result<()> {
        let values = values.astype(self.cell_type());
        macro_rules! put {
            ( $(($id:ident, $_p:ident)),*) => {
                match (self, &values) {
                    $((CellArray::$id(a), CellArray::$id(v)) => scatter(a, positions, v),)*
                    _ => unreachable!(),
                }
            };
        }
        with_et!(put)
    }

    /// Apply a shape transformation to the storage.
    pub(crate) fn restructure<S: Structural>(&self, s: &S) -> Result<Self> {
        Ok(map_array!(self, a => s.apply(a.view())?))
    }

    /// Re-lay the storage out in memory order `order`.
    pub fn with_order(self, order: Order) -> Self {
        map_array!(self, a => relayout(a, order))
    }

    /// Join `arrays` along an existing `axis`, promoting to a common cell type.
    pub fn concatenate(axis: usize, arrays: &[CellArray]) -> Result<Self> {
        let (ct, arrays) = unified(arrays)?;
        macro_rules! join {
            ( $(($id:ident, $p:ident)),*) => {
                match ct {
                    $(CellType::$id => CellArray::$id(concatenate(Axis(axis), &typed_views::<$p>(&arrays))?),)*
                }
            };
        }
        Ok(with_et!(join))
    }

    /// Join `arrays` along a new `axis`, promoting to a common cell type.
    pub fn stack(axis: usize, arrays: &[CellArray]) -> Result<Self> {
        let (ct, arrays) = unified(arrays)?;
        macro_rules! join {
            ( $(($id:ident, $p:ident)),*) => {
                match ct {
                    $(CellType::$id => CellArray::$id(stack(Axis(axis), &typed_views::<$p>(&arrays))?),)*
                }
            };
        }
        Ok(with_et!(join))
    }
}

/// Promote a sequence of cell types to their common type.
pub fn common_type(types: impl IntoIterator<Item = CellType>) -> Option<CellType> {
    types.into_iter().reduce(CellType::union)
}

fn unified(arrays: &[CellArray]) -> Result<(CellType, Vec<CellArray>)> {
    let ct = common_type(arrays.iter().map(|a| a.cell_type()))
        .ok_or_else(|| Error::invalid("need at least one array to join"))?;
    Ok((ct, arrays.iter().map(|a| a.astype(ct)).collect()))
}

fn typed_views<T: Element>(arrays: &[CellArray]) -> Vec<ArrayViewD<'_, T>> {
    arrays
        .iter()
        .filter_map(|a| a.as_array::<T>())
        .map(|a| a.view())
        .collect()
}

pub(crate) fn relayout<T: Element>(a: ArrayD<T>, order: Order) -> ArrayD<T> {
    match order {
        Order::Keep => a,
        Order::C if a.is_standard_layout() => a,
        Order::C => a.as_standard_layout().into_owned(),
        Order::F if a.t().is_standard_layout() => a,
        Order::F => {
            let mut out = ArrayD::from_elem(IxDyn(a.shape()).f(), T::ZERO);
            out.assign(&a);
            out
        }
    }
}

impl<T: Element> From<ArrayD<T>> for CellArray {
    fn from(value: ArrayD<T>) -> Self {
        T::into_cell_array(value)
    }
}

impl<T: Element> From<Vec<T>> for CellArray {
    fn from(values: Vec<T>) -> Self {
        T::into_cell_array(Array1::from_vec(values).into_dyn())
    }
}

impl<T: Element> From<&[T]> for CellArray {
    fn from(values: &[T]) -> Self {
        values.to_vec().into()
    }
}

impl<C: Element> FromIterator<C> for CellArray {
    fn from_iter<T: IntoIterator<Item = C>>(iter: T) -> Self {
        iter.into_iter().collect::<Vec<C>>().into()
    }
}

impl<C: Element> TryFrom<CellArray> for Vec<C> {
    type Error = Error;

    fn try_from(value: CellArray) -> Result<Self> {
        value.to_vec()
    }
}

impl Debug for CellArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use crate::elided::Elided;
        let basename = self.cell_type().to_string();
        f.write_fmt(format_args!("{basename}CellArray(shape={:?}, ", self.shape()))?;
        on_array!(self, a => {
            let v: Vec<_> = a.iter().collect();
            f.write_fmt(format_args!("{:?}", Elided(&v)))?
        });
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use crate::{with_et, CellArray, CellType, CellValue};

    #[test]
    fn defaults() {
        macro_rules! test {
            ($( ($id:ident, $p:ident) ),*) => {
                $({
                    let cv = CellArray::zeros(&[3], CellType::$id);
                    assert_eq!(cv.len(), 3);
                    assert_eq!(cv.cell_type(), CellType::$id);
                    assert_eq!(cv.get(&[0]), Some(CellValue::new(<$p>::default())));
                })*};
        }
        with_et!(test);
    }

    #[test]
    fn to_vec() {
        let buf = CellArray::from_vec(&[2, 2], vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(buf.shape(), &[2, 2]);
        assert_eq!(buf.to_vec::<u8>().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(buf.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(buf.to_vec::<i8>().is_err());
    }

    #[test]
    fn astype() {
        let buf = CellArray::from(vec![1.7f64, -2.2, 0.0]);
        assert_eq!(buf.astype(CellType::Int16).to_vec::<i16>().unwrap(), vec![1, -2, 0]);
        assert_eq!(
            buf.astype(CellType::Bool).to_vec::<bool>().unwrap(),
            vec![true, true, false]
        );
        assert!(buf.convert(CellType::Int64).is_err());
    }

    #[test]
    fn fill_where() {
        let mut buf = CellArray::from(vec![1i32, 2, 3]);
        let mask = ndarray::arr1(&[false, true, false]).into_dyn();
        buf.fill_where(&mask, CellValue::Float64(9.9)).unwrap();
        assert_eq!(buf.to_vec::<i32>().unwrap(), vec![1, 9, 3]);
    }

    #[test]
    fn broadcasting() {
        use super::broadcast_shape;
        assert_eq!(broadcast_shape(&[3, 1], &[4]).unwrap(), vec![3, 4]);
        assert_eq!(broadcast_shape(&[], &[2, 2]).unwrap(), vec![2, 2]);
        assert!(broadcast_shape(&[3], &[4]).is_err());
    }

    #[test]
    fn join() {
        let a = CellArray::from(vec![1u8, 2]);
        let b = CellArray::from(vec![-1i8]);
        let c = CellArray::concatenate(0, &[a.clone(), b]).unwrap();
        assert_eq!(c.cell_type(), CellType::Int16);
        assert_eq!(c.to_vec::<i16>().unwrap(), vec![1, 2, -1]);

        let s = CellArray::stack(1, &[a.clone(), a]).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        assert_eq!(s.to_vec::<u8>().unwrap(), vec![1, 1, 2, 2]);
    }
}
