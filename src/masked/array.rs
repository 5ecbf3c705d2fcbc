/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::array::{broadcast_view, normalize_axis, relayout, Order};
use crate::elided::Elided;
use crate::error::{ConstructionError, Result};
use crate::flavor::MaskedType;
use crate::{CellArray, CellType, CellValue, Fill, Flavor, Literal, Mask, MaskedScalar};
use ndarray::{ArrayD, Axis, IxDyn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// A [`CellArray`] with a companion [`Mask`] of the same shape.
///
/// The mask tracks which cells are invalid across operations. Data under a masked
/// cell is unspecified: it is never read into a result, but may be overwritten.
///
/// # Example
///
/// ```rust
/// use masked_cells::{masked_array, CellValue, Mask, X};
/// let a = masked_array![1.0, X, 3.0];
/// assert_eq!(a.mask(), &Mask::from_vec(vec![false, true, false]));
/// // Mask values are propagated across math operations.
/// let r = (&a + 1.0) * 2.0;
/// assert_eq!(r.count(), 2);
/// assert_eq!(r.filled(0.0).to_vec::<f64>().unwrap(), vec![4.0, 0.0, 8.0]);
/// ```
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskedArray {
    data: CellArray,
    mask: Mask,
    flavor: Flavor,
    writeable: bool,
}

impl MaskedArray {
    /// Pair `data` with `mask`.
    ///
    /// A mask of the same shape is moved in; a broadcastable one is expanded.
    pub fn new(data: CellArray, mask: impl Into<Mask>) -> Result<Self> {
        let mask = mask.into();
        let mask = if mask.shape() == data.shape() {
            mask
        } else {
            mask.broadcast_to(data.shape()).map_err(|_| ConstructionError::MaskShape {
                data: data.shape().to_vec(),
                mask: mask.shape().to_vec(),
            })?
        };
        Ok(Self::from_parts(data, mask, Flavor::Base))
    }

    /// Wrap `data` with nothing masked.
    pub fn from_data(data: CellArray) -> Self {
        let mask = Mask::fill(data.shape(), false);
        Self::from_parts(data, mask, Flavor::Base)
    }

    /// Every entry masked, data zeroed.
    pub fn masked_all(shape: &[usize], cell_type: CellType) -> Self {
        Self::from_parts(CellArray::zeros(shape, cell_type), Mask::fill(shape, true), Flavor::Base)
    }

    /// Build from a nested [`Literal`], where the sentinel marks masked entries.
    ///
    /// The cell type is `dtype` when given, else the promotion of every typed leaf.
    pub fn from_literal(literal: impl Into<Literal>, dtype: Option<CellType>) -> Result<Self> {
        let literal = literal.into();
        let shape = literal.shape()?;
        let ct = literal.resolve_type(dtype)?;
        let mut values = Vec::new();
        let mut mask = Vec::new();
        literal.for_each_leaf(&mut |v, m| {
            values.push(v.unwrap_or_else(|| ct.zero()));
            mask.push(m);
        });
        let data = CellArray::from_values(&shape, ct, values)?;
        let mask = Mask::new(ArrayD::from_shape_vec(IxDyn(&shape), mask)?);
        Ok(Self::from_parts(data, mask, Flavor::Base))
    }

    pub(crate) fn from_parts(data: CellArray, mask: Mask, flavor: Flavor) -> Self {
        debug_assert_eq!(data.shape(), mask.shape(), "data and mask shapes differ");
        Self { data, mask, flavor, writeable: true }
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Mark `self` as a read-only view; assignment then fails.
    pub fn into_readonly(mut self) -> Self {
        self.writeable = false;
        self
    }

    pub fn is_writeable(&self) -> bool {
        self.writeable
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total number of elements, masked or not.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> CellType {
        self.data.cell_type()
    }

    pub fn data(&self) -> &CellArray {
        &self.data
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut CellArray, &mut Mask) {
        (&mut self.data, &mut self.mask)
    }

    pub fn into_parts(self) -> (CellArray, Mask) {
        (self.data, self.mask)
    }

    /// Number of unmasked elements.
    pub fn count(&self) -> usize {
        self.mask.count(false)
    }

    /// Number of unmasked elements along `axis`, as an `Int64` array.
    pub fn count_axis(&self, axis: isize, keepdims: bool) -> Result<CellArray> {
        let ax = normalize_axis(axis, self.ndim())?;
        let counts = self
            .mask
            .as_array()
            .map_axis(Axis(ax), |lane| lane.iter().filter(|m| !**m).count() as i64);
        let counts = if keepdims { counts.insert_axis(Axis(ax)) } else { counts };
        Ok(counts.into())
    }

    pub fn count_masked(&self) -> usize {
        self.mask.count(true)
    }

    /// Plain data with masked entries replaced by the resolved `fill`.
    pub fn filled(&self, fill: impl Into<Fill>) -> CellArray {
        let mut out = self.data.clone();
        out.fill_masked(self.mask.view(), fill.into().resolve(self.dtype()));
        out
    }

    /// Overwrite masked entries with the resolved `fill` in place and borrow the data.
    pub fn filled_view(&mut self, fill: impl Into<Fill>) -> &CellArray {
        let value = fill.into().resolve(self.dtype());
        self.data.fill_masked(self.mask.view(), value);
        &self.data
    }

    /// Lossy conversion of the data; the mask is kept.
    pub fn astype(&self, cell_type: CellType) -> Self {
        Self::from_parts(self.data.astype(cell_type), self.mask.clone(), self.flavor)
    }

    /// Element at a full `index` as a [`MaskedScalar`].
    pub fn scalar_at(&self, index: &[usize]) -> Option<MaskedScalar> {
        let value = self.data.get(index)?;
        let mask = self.mask.as_array().get(index).copied()?;
        Some(MaskedScalar::new(value, mask).with_flavor(self.flavor))
    }

    /// Nested [`Literal`] of the contents, with masked entries as the sentinel.
    pub fn to_list(&self) -> Literal {
        fn build(
            shape: &[usize],
            values: &mut impl Iterator<Item = (CellValue, bool)>,
        ) -> Literal {
            match shape.split_first() {
                None => match values.next() {
                    Some((_, true)) | None => Literal::Masked,
                    Some((v, false)) => Literal::Value(v),
                },
                Some((&n, rest)) => Literal::List((0..n).map(|_| build(rest, values)).collect()),
            }
        }
        let mut values = self.data.iter().zip(self.mask.iter());
        build(self.shape(), &mut values)
    }

    /// Reshape data and mask together, in place.
    pub fn set_shape(&mut self, shape: &[usize]) -> Result<()> {
        let data = self.data.reshape(shape)?;
        let mask = crate::array::reshape(self.mask.view(), shape)?;
        self.data = data;
        self.mask = Mask::new(mask);
        Ok(())
    }

    /// Re-lay out both components in memory order `order`.
    pub fn with_order(self, order: Order) -> Self {
        let flavor = self.flavor;
        let mask = match order {
            Order::Keep => self.mask,
            _ => Mask::new(relayout(self.mask.into_array(), order)),
        };
        Self::from_parts(self.data.with_order(order), mask, flavor)
    }

    /// Broadcast both components to `shape`. The result is read-only.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        let data = self.data.broadcast_to(shape)?;
        let mask = Mask::new(broadcast_view(self.mask.as_array(), shape)?.to_owned());
        Ok(Self::from_parts(data, mask, self.flavor).into_readonly())
    }
}

/// Arrays are equal when their shapes and masks agree and every unmasked value is equal.
impl PartialEq for MaskedArray {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && self.mask == other.mask
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .zip(self.mask.iter())
                .all(|((l, r), m)| m || l == r)
    }
}

impl Debug for MaskedArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let basename = MaskedType::array(self.flavor);
        let data: Vec<_> = self.data.iter().collect();
        let mask: Vec<_> = self.mask.iter().collect();
        write!(
            f,
            "{}{basename}(shape={:?}, {:?}, {:?})",
            self.dtype(),
            self.shape(),
            Elided(&data),
            Elided(&mask)
        )
    }
}

impl From<CellArray> for MaskedArray {
    fn from(value: CellArray) -> Self {
        Self::from_data(value)
    }
}

impl From<MaskedArray> for (CellArray, Mask) {
    fn from(value: MaskedArray) -> Self {
        value.into_parts()
    }
}

impl<'a> From<&'a MaskedArray> for (&'a CellArray, &'a Mask) {
    fn from(value: &'a MaskedArray) -> Self {
        (&value.data, &value.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::{masked_array, MinMax, X};
    use masked_cells_testkit::READINGS;

    fn readings() -> MaskedArray {
        let (data, mask, shape) = &*READINGS;
        let data = CellArray::from_vec(shape, data.clone()).unwrap();
        MaskedArray::new(data, ArrayD::from_shape_vec(IxDyn(shape), mask.clone()).unwrap()).unwrap()
    }

    #[test]
    fn literal() {
        let a = masked_array![1, X, 3];
        assert_eq!(a.mask(), &Mask::from_vec(vec![false, true, false]));
        assert_eq!(a.dtype(), CellType::Int32);
        assert_eq!(a.count(), 2);
        assert_eq!(a.to_list(), Literal::from(vec![Literal::from(1), X.into(), 3.into()]));

        let all_x = MaskedArray::from_literal(vec![X, X], None);
        assert!(matches!(
            all_x,
            Err(Error::Construction(ConstructionError::AmbiguousDtype))
        ));
        let typed = MaskedArray::from_literal(vec![X, X], Some(CellType::UInt8)).unwrap();
        assert_eq!(typed.count_masked(), 2);
    }

    #[test]
    fn nested_masked_inputs() {
        let inner = masked_array![X, 2.5];
        let lit = Literal::List(vec![inner.into(), vec![1.0, 2.0].into()]);
        let a = MaskedArray::from_literal(lit, None).unwrap();
        assert_eq!(a.shape(), &[2, 2]);
        assert_eq!(a.mask().count(true), 1);
    }

    #[test]
    fn mask_shapes() {
        let data = CellArray::from_vec(&[2, 2], vec![1u8, 2, 3, 4]).unwrap();
        let a = MaskedArray::new(data.clone(), Mask::fill(&[], true)).unwrap();
        assert_eq!(a.count_masked(), 4);
        let bad = MaskedArray::new(data, Mask::from_vec(vec![true, false, true]));
        assert!(matches!(bad, Err(Error::Construction(ConstructionError::MaskShape { .. }))));
    }

    #[test]
    fn filling() {
        let a = masked_array![1.0, X, 3.0];
        assert_eq!(a.filled(Fill::Default).to_vec::<f64>().unwrap(), vec![1.0, 0.0, 3.0]);
        assert_eq!(a.filled(9).to_vec::<f64>().unwrap(), vec![1.0, 9.0, 3.0]);
        assert_eq!(
            a.filled(MinMax::Max).to_vec::<f64>().unwrap(),
            vec![1.0, f64::NEG_INFINITY, 3.0]
        );
        let mut b = a.clone();
        let view = b.filled_view(-1.0);
        assert_eq!(view.get(&[1]), Some(CellValue::Float64(-1.0)));
        assert_eq!(b, a);
    }

    #[test]
    fn round_trip() {
        let a = readings();
        let back = MaskedArray::new(a.filled(-99.0), a.mask().clone()).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn counts() {
        let a = readings();
        assert_eq!(a.count(), 6);
        let c = a.count_axis(1, false).unwrap();
        assert_eq!(c.to_vec::<i64>().unwrap(), vec![3, 3, 0]);
        let c = a.count_axis(-2, true).unwrap();
        assert_eq!(c.shape(), &[1, 4]);
    }

    #[test]
    fn reshaping() {
        let mut a = readings();
        a.set_shape(&[4, 3]).unwrap();
        assert_eq!(a.mask().shape(), &[4, 3]);
        assert!(a.set_shape(&[5]).is_err());
        let b = masked_array![1, X].broadcast_to(&[3, 2]).unwrap();
        assert!(!b.is_writeable());
        assert_eq!(b.count_masked(), 3);
    }

    #[test]
    fn debug() {
        let a = masked_array![1, X].with_flavor(Flavor::Series);
        let dbg = format!("{a:?}");
        assert!(dbg.starts_with("Int32SeriesMaskedArray(shape=[2]"), "{dbg}");
    }
}
