/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! The masked sentinel and nested literal input.

use crate::error::{ConstructionError, Result};
use crate::{with_et, CellArray, CellType, CellValue, MaskedArray, MaskedScalar};

/// Marker for "this entry is masked", accepted wherever input enters the crate.
///
/// It never survives into a result: on entry it becomes a zero of the resolved
/// cell type with its mask set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaskedInput;

/// The masked sentinel.
pub const X: MaskedInput = MaskedInput;

impl MaskedInput {
    /// A fully masked scalar of `cell_type`.
    pub fn of(self, cell_type: CellType) -> MaskedScalar {
        MaskedScalar::masked(cell_type)
    }
}

/// Nested array input, as accepted by [`MaskedArray::from_literal`] and [`masked_array!`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Value(CellValue),
    /// The sentinel [`X`].
    Masked,
    List(Vec<Literal>),
    Plain(CellArray),
    Array(MaskedArray),
    Scalar(MaskedScalar),
}

impl Literal {
    /// Determine if the sentinel occurs anywhere in `self`.
    pub fn contains_sentinel(&self) -> bool {
        match self {
            Literal::Masked => true,
            Literal::List(items) => items.iter().any(Literal::contains_sentinel),
            _ => false,
        }
    }

    /// Shape of the array `self` describes. Fails when sub-lists disagree.
    pub fn shape(&self) -> Result<Vec<usize>> {
        fn walk(lit: &Literal, depth: usize) -> Result<Vec<usize>> {
            match lit {
                Literal::Value(_) | Literal::Masked | Literal::Scalar(_) => Ok(Vec::new()),
                Literal::Plain(a) => Ok(a.shape().to_vec()),
                Literal::Array(a) => Ok(a.shape().to_vec()),
                Literal::List(items) => {
                    let mut inner: Option<Vec<usize>> = None;
                    for item in items {
                        let s = walk(item, depth + 1)?;
                        match &inner {
                            Some(prev) if *prev != s => {
                                return Err(ConstructionError::Ragged(depth).into())
                            }
                            Some(_) => {}
                            None => inner = Some(s),
                        }
                    }
                    let mut shape = vec![items.len()];
                    shape.extend(inner.unwrap_or_default());
                    Ok(shape)
                }
            }
        }
        walk(self, 0)
    }

    /// Common cell type of the typed leaves; `None` when every leaf is the sentinel.
    pub fn cell_type(&self) -> Option<CellType> {
        match self {
            Literal::Value(v) => Some(v.cell_type()),
            Literal::Masked => None,
            Literal::Plain(a) => Some(a.cell_type()),
            Literal::Array(a) => Some(a.dtype()),
            Literal::Scalar(s) => Some(s.cell_type()),
            Literal::List(items) => items.iter().filter_map(Literal::cell_type).reduce(CellType::union),
        }
    }

    /// Determine if `self` has no leaves at all, e.g. `[]` or `[[], []]`.
    fn is_hollow(&self) -> bool {
        match self {
            Literal::List(items) => items.iter().all(Literal::is_hollow),
            _ => false,
        }
    }

    /// Visit each leaf value and its mask in row-major order.
    pub(crate) fn for_each_leaf(&self, f: &mut impl FnMut(Option<CellValue>, bool)) {
        match self {
            Literal::Value(v) => f(Some(*v), false),
            Literal::Masked => f(None, true),
            Literal::Scalar(s) => f(Some(s.data()), s.is_masked()),
            Literal::Plain(a) => a.iter().for_each(|v| f(Some(v), false)),
            Literal::Array(a) => a
                .data()
                .iter()
                .zip(a.mask().iter())
                .for_each(|(v, m)| f(Some(v), m)),
            Literal::List(items) => items.iter().for_each(|i| i.for_each_leaf(f)),
        }
    }

    /// Cell type to build `self` with, honoring an explicit `dtype`.
    pub(crate) fn resolve_type(&self, dtype: Option<CellType>) -> Result<CellType> {
        match (dtype, self.cell_type()) {
            (Some(ct), _) => Ok(ct),
            (None, Some(ct)) => Ok(ct),
            (None, None) if self.is_hollow() => Ok(CellType::Float64),
            (None, None) => Err(ConstructionError::AmbiguousDtype.into()),
        }
    }
}

impl From<MaskedInput> for Literal {
    fn from(_: MaskedInput) -> Self {
        Literal::Masked
    }
}

impl From<CellValue> for Literal {
    fn from(value: CellValue) -> Self {
        Literal::Value(value)
    }
}

impl From<CellArray> for Literal {
    fn from(value: CellArray) -> Self {
        Literal::Plain(value)
    }
}

impl From<MaskedArray> for Literal {
    fn from(value: MaskedArray) -> Self {
        Literal::Array(value)
    }
}

impl From<MaskedScalar> for Literal {
    fn from(value: MaskedScalar) -> Self {
        Literal::Scalar(value)
    }
}

impl<L: Into<Literal>> From<Vec<L>> for Literal {
    fn from(value: Vec<L>) -> Self {
        Literal::List(value.into_iter().map(Into::into).collect())
    }
}

macro_rules! literal_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl From<$p> for Literal {
            fn from(value: $p) -> Self {
                Literal::Value(CellValue::$id(value))
            }
        }
    )* };
}
with_et!(literal_from);

/// Create a [`MaskedArray`] from a one, two or three dimensional literal, where
/// [`X`] marks masked entries.
///
/// ```
/// use masked_cells::{masked_array, CellType, X};
/// let a = masked_array![1, X, 3];
/// assert_eq!(a.dtype(), CellType::Int32);
/// assert_eq!(a.count(), 2);
/// let g = masked_array![[1.0, 2.0], [X, 4.0]];
/// assert_eq!(g.shape(), &[2, 2]);
/// ```
///
/// # Panics
/// When the literal is ragged or holds only `X`. Use [`MaskedArray::from_literal`] to
/// handle those cases as errors.
#[macro_export]
macro_rules! masked_array {
    ($([$([$($x:expr),* $(,)?]),* $(,)?]),+ $(,)?) => {
        $crate::masked_array!(@build $crate::Literal::List(vec![$(
            $crate::Literal::List(vec![$(
                $crate::Literal::List(vec![$($crate::Literal::from($x)),*])
            ),*])
        ),+]))
    };
    ($([$($x:expr),* $(,)?]),+ $(,)?) => {
        $crate::masked_array!(@build $crate::Literal::List(vec![$(
            $crate::Literal::List(vec![$($crate::Literal::from($x)),*])
        ),+]))
    };
    (@build $lit:expr) => {
        match $crate::MaskedArray::from_literal($lit, None) {
            Ok(a) => a,
            Err(e) => panic!("invalid masked_array! literal: {e}"),
        }
    };
    ($($x:expr),* $(,)?) => {
        $crate::masked_array!(@build $crate::Literal::List(vec![$($crate::Literal::from($x)),*]))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn shapes() {
        let lit = Literal::from(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(lit.shape().unwrap(), vec![3, 2]);
        let ragged = Literal::List(vec![Literal::from(vec![1]), Literal::from(vec![2, 3])]);
        assert_eq!(
            ragged.shape(),
            Err(Error::Construction(ConstructionError::Ragged(0)))
        );
        assert_eq!(Literal::List(vec![]).shape().unwrap(), vec![0]);
    }

    #[test]
    fn types() {
        let lit = Literal::List(vec![1u8.into(), X.into(), (-1i8).into()]);
        assert_eq!(lit.cell_type(), Some(CellType::Int16));
        assert!(lit.contains_sentinel());
        let all_masked = Literal::List(vec![X.into(), X.into()]);
        assert!(all_masked.resolve_type(None).is_err());
        assert_eq!(all_masked.resolve_type(Some(CellType::UInt8)).unwrap(), CellType::UInt8);
        assert_eq!(Literal::List(vec![]).resolve_type(None).unwrap(), CellType::Float64);
    }

    #[test]
    fn sentinel() {
        let s = X.of(CellType::Float32);
        assert!(s.is_masked());
        assert_eq!(s.cell_type(), CellType::Float32);
    }

    #[test]
    fn macro_forms() {
        let a = crate::masked_array![1, X, 3];
        assert_eq!(a.shape(), &[3]);
        let b = crate::masked_array![[1, X], [3, 4]];
        assert_eq!(b.shape(), &[2, 2]);
        assert_eq!(b.count_masked(), 1);
        let c = crate::masked_array![[[1.5], [X]], [[3.0], [4.0]]];
        assert_eq!(c.shape(), &[2, 2, 1]);
    }
}
