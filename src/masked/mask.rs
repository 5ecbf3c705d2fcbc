/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::array::{broadcast_shape, broadcast_view};
use crate::elided::Elided;
use crate::error::Result;
use ndarray::{ArrayD, ArrayViewD, Dimension, IxDyn, Zip};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::ops::{BitAnd, BitOr, Index, IndexMut, Not};

/// Encodes the missing-value mask for [`MaskedArray`][super::MaskedArray].
///
/// A `true` entry marks the corresponding cell as masked (missing or invalid).
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mask(ArrayD<bool>);

impl Mask {
    pub fn new(values: ArrayD<bool>) -> Self {
        Self(values)
    }
    /// A one-dimensional mask.
    pub fn from_vec(values: Vec<bool>) -> Self {
        Self(ndarray::Array1::from_vec(values).into_dyn())
    }
    pub fn fill(shape: &[usize], value: bool) -> Self {
        Self(ArrayD::from_elem(IxDyn(shape), value))
    }
    pub fn fill_via<F: Fn(&[usize]) -> bool>(shape: &[usize], f: F) -> Self {
        Self(ArrayD::from_shape_fn(IxDyn(shape), |idx| f(idx.slice())))
    }
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn set(&mut self, index: &[usize], value: bool) {
        self.0[index] = value;
    }
    pub fn get(&self, index: &[usize]) -> bool {
        self.0[index]
    }
    /// Determine if every entry equals `value`.
    pub fn all(&self, value: bool) -> bool {
        self.0.iter().all(|b| *b == value)
    }
    pub fn any(&self) -> bool {
        self.0.iter().any(|b| *b)
    }
    /// Number of entries equal to `value`.
    pub fn count(&self, value: bool) -> usize {
        self.0.iter().filter(|b| **b == value).count()
    }
    pub fn view(&self) -> ArrayViewD<'_, bool> {
        self.0.view()
    }
    pub fn as_array(&self) -> &ArrayD<bool> {
        &self.0
    }
    pub(crate) fn as_array_mut(&mut self) -> &mut ArrayD<bool> {
        &mut self.0
    }
    pub fn into_array(self) -> ArrayD<bool> {
        self.0
    }
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    /// Materialize `self` broadcast to `shape`.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Mask> {
        Ok(Mask(broadcast_view(&self.0, shape)?.to_owned()))
    }

    /// Logical `or` of `self` and `other` after broadcasting both.
    pub fn union(&self, other: &Mask) -> Result<Mask> {
        let shape = broadcast_shape(self.shape(), other.shape())?;
        let l = broadcast_view(&self.0, &shape)?;
        let r = broadcast_view(&other.0, &shape)?;
        Ok(Mask(Zip::from(&l).and(&r).map_collect(|a, b| *a | *b)))
    }
}

impl Index<&[usize]> for Mask {
    type Output = bool;

    fn index(&self, index: &[usize]) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<&[usize]> for Mask {
    fn index_mut(&mut self, index: &[usize]) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Not for Mask {
    type Output = Mask;
    fn not(mut self) -> Self::Output {
        self.0.mapv_inplace(|b| !b);
        self
    }
}

impl Not for &Mask {
    type Output = Mask;
    fn not(self) -> Self::Output {
        Mask(self.0.mapv(|b| !b))
    }
}

// Binary operators require equal shapes and panic otherwise, like `ndarray`'s.
impl BitAnd for Mask {
    type Output = Self;
    fn bitand(mut self, rhs: Self) -> Self::Output {
        Zip::from(&mut self.0).and(&rhs.0).for_each(|l, r| *l &= *r);
        self
    }
}

impl BitAnd for &Mask {
    type Output = Mask;
    fn bitand(self, rhs: Self) -> Self::Output {
        Mask(Zip::from(&self.0).and(&rhs.0).map_collect(|l, r| *l & *r))
    }
}

impl BitOr for Mask {
    type Output = Self;
    fn bitor(mut self, rhs: Self) -> Self::Output {
        Zip::from(&mut self.0).and(&rhs.0).for_each(|l, r| *l |= *r);
        self
    }
}

impl BitOr for &Mask {
    type Output = Mask;
    fn bitor(self, rhs: Self) -> Self::Output {
        Mask(Zip::from(&self.0).and(&rhs.0).map_collect(|l, r| *l | *r))
    }
}

impl Debug for Mask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v: Vec<bool> = self.iter().collect();
        f.write_fmt(format_args!("Mask(shape={:?}, {:?})", self.shape(), Elided(&v)))
    }
}

impl From<ArrayD<bool>> for Mask {
    fn from(value: ArrayD<bool>) -> Self {
        Mask(value)
    }
}

impl From<Vec<bool>> for Mask {
    fn from(value: Vec<bool>) -> Self {
        Mask::from_vec(value)
    }
}

impl IntoIterator for Mask {
    type Item = bool;
    type IntoIter = std::vec::IntoIter<bool>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter().collect::<Vec<_>>().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::Mask;

    #[test]
    fn set() {
        let mut m = Mask::fill(&[3], true);
        m.set(&[1], false);
        m[&[0][..]] = false;
        assert_eq!(m, Mask::from_vec(vec![false, false, true]));
    }

    #[test]
    fn not() {
        let t = Mask::fill(&[4], true);
        let f = Mask::fill(&[4], false);
        assert_eq!(!&t, f);
        assert_eq!(!t, f);

        let m = Mask::from_vec(vec![true, false, true, false]);
        let r = Mask::from_vec(vec![false, true, false, true]);
        assert_eq!(!&m, r);
        assert_eq!(!m, r);
    }

    #[test]
    fn all() {
        let m = Mask::fill_via(&[4], |i| i[0] % 2 == 0);
        assert!(!m.all(true));
        assert!(!m.all(false));
        assert_eq!(m.count(true), 2);
        let m = Mask::fill(&[2, 2], true);
        assert!(m.all(true));
        assert!(!m.all(false));
    }

    #[test]
    fn and() {
        let l = Mask::fill_via(&[4], |i| i[0] % 2 == 0);
        let r = Mask::fill_via(&[4], |i| i[0] % 2 != 0);
        // non-consuming
        assert!((&l & &r).all(false));
        // consuming
        assert!((l & r).all(false));
    }

    #[test]
    fn or() {
        let l = Mask::fill_via(&[4], |i| i[0] % 2 == 0);
        let r = Mask::fill_via(&[4], |i| i[0] % 2 != 0);
        // non-consuming
        assert!((&l | &r).all(true));
        // consuming
        assert!((l | r).all(true));
    }

    #[test]
    fn union_broadcasts() {
        let col = Mask::new(ndarray::arr2(&[[true], [false]]).into_dyn());
        let row = Mask::from_vec(vec![false, true, false]);
        let u = col.union(&row).unwrap();
        assert_eq!(u.shape(), &[2, 3]);
        assert_eq!(u.count(true), 4);
    }

    #[test]
    fn debug_shows_shape() {
        let m = Mask::fill_via(&[2, 3], |i| i[1] == 0);
        let dbg = format!("{m:?}");
        assert!(dbg.starts_with("Mask(shape=[2, 3], "), "{dbg}");
        assert!(dbg.contains("true"), "{dbg}");
    }
}
