/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::{
    error::{Error, Result},
    CellType, Element,
};
use crate::{with_ct, with_et};
use num_traits::{One, ToPrimitive, Zero};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// CellValue enum constructor.
macro_rules! cv_enum {
    ( $(($id:ident, $p:ident)),*) => {
        /// Value variants for each [`CellType`]
        #[derive(Debug, Copy, Clone)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum CellValue { $($id($p)),* }
    }
}
with_et!(cv_enum);

impl CellValue {
    /// Construct new [`CellValue`] from a statically known [`Element`].
    pub fn new<T: Element>(value: T) -> Self {
        value.into_cell_value()
    }

    /// Get the [`CellType`] encoding `self`.
    pub fn cell_type(&self) -> CellType {
        macro_rules! cv_ct {
            ($( ($id:ident, $_p:ident) ),*) => {
                match self {
                    $(CellValue::$id(_) => CellType::$id),*
                }
            };
        }
        with_et!(cv_ct)
    }

    /// Get the [`CellValue`] contents as a `T`.
    ///
    /// Returns `Ok(T)` if the [`CellType`] of `T` is the same or wider than
    /// the encoded value, or `Err(Error)` if `T` is narrower.
    pub fn get<T: Element>(&self) -> Result<T> {
        let err = || Error::NarrowingError {
            src: self.cell_type(),
            dst: T::cell_type(),
        };
        let cv = self.convert(T::cell_type())?;
        T::from_cell_value(cv).ok_or_else(err)
    }

    /// Convert `self` into a variant with [`CellType`] `cell_type` equal to or wider than
    /// its current `CellType`.
    ///
    /// Returns `Ok(CellValue)` if the [`CellType`] of `cell_type` is the same or wider than
    /// the encoded value, or `Err(Error)` if `T` is narrower.
    pub fn convert(&self, cell_type: CellType) -> Result<Self> {
        if cell_type == self.cell_type() {
            return Ok(*self);
        }
        if !self.cell_type().can_fit_into(cell_type) {
            return Err(Error::NarrowingError { src: self.cell_type(), dst: cell_type });
        }
        Ok(self.cast(cell_type))
    }

    /// Convert `self` into `cell_type` with `as` semantics: floats truncate towards zero,
    /// integers wrap, and anything non-zero becomes `true`.
    pub fn cast(&self, cell_type: CellType) -> Self {
        let wide = self.to_wide();
        macro_rules! cast {
            ($( ($id:ident, $p:ident) ),*) => {
                match cell_type {
                    $( CellType::$id => CellValue::$id(<$p>::from_wide(wide)), )*
                }
            };
        }
        with_et!(cast)
    }

    fn to_wide(self) -> crate::Wide {
        macro_rules! wide {
            ($( ($id:ident, $_p:ident) ),*) => {
                match self {
                    $( CellValue::$id(v) => v.to_wide(), )*
                }
            };
        }
        with_et!(wide)
    }

    /// Determines the smallest cell type that can contain `self` and `other`, and then
    /// converts values to that cell type and returns a tuple of the converted values, i.e.
    /// `(convert(self), convert(other))`.
    pub fn unify(&self, other: &Self) -> (Self, Self) {
        let dest = self.cell_type().union(other.cell_type());
        // `cast` is lossless here as `CellType::union` only widens.
        (self.cast(dest), other.cast(dest))
    }

    /// Truthiness: non-zero numbers and `true`.
    pub fn is_truthy(&self) -> bool {
        macro_rules! truthy {
            ($( ($id:ident, $_p:ident) ),*) => {
                match self {
                    $( CellValue::$id(v) => v.is_truthy(), )*
                }
            };
        }
        with_et!(truthy)
    }

    pub fn is_nan(&self) -> bool {
        match self {
            CellValue::Float32(v) => v.is_nan(),
            CellValue::Float64(v) => v.is_nan(),
            _ => false,
        }
    }
}

/// Convert from primitive to [`CellValue`].
macro_rules! cv_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl From<$p> for CellValue {
            fn from(value: $p) -> Self {
                CellValue::$id(value)
            }
        }
    )* };
}
with_et!(cv_from);

/// Provide `num_traits` interop.
impl ToPrimitive for CellValue {
    fn to_i64(&self) -> Option<i64> {
        macro_rules! conv {
            ($( ($id:ident, $_p:ident) ),*) => {
                match self {
                    CellValue::Bool(v) => Some(*v as i64),
                    $(
                    CellValue::$id(v) => v.to_i64(),
                    )*
                }
            }
        }
        with_ct!(conv)
    }

    fn to_u64(&self) -> Option<u64> {
        macro_rules! conv {
            ($( ($id:ident, $_p:ident) ),*) => {
                match self {
                    CellValue::Bool(v) => Some(*v as u64),
                    $(
                    CellValue::$id(v) => v.to_u64(),
                    )*
                }
            }
        }
        with_ct!(conv)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(self.to_wide().as_f64())
    }
}

impl One for CellValue {
    #[inline]
    fn one() -> Self {
        CellValue::UInt8(1)
    }
}

impl Zero for CellValue {
    #[inline]
    fn zero() -> Self {
        CellValue::UInt8(0)
    }

    fn is_zero(&self) -> bool {
        !self.is_truthy()
    }
}

pub(crate) mod ops {
    use std::{
        cmp::Ordering,
        ops::{Add, Div, Mul, Neg, Sub},
    };

    use crate::kernel::{self, UFunc};
    use crate::{with_et, CellArray, CellType, CellValue, Element};

    /// Scalar arithmetic runs through the same kernels as arrays. `bool` operands
    /// are promoted to `Int64` first so that `true + true == 2`.
    fn scalar_op(op: UFunc, lhs: CellValue, rhs: CellValue) -> CellValue {
        let promote = |v: CellValue| {
            if v.cell_type().is_bool() {
                v.cast(CellType::Int64)
            } else {
                v
            }
        };
        let (lhs, rhs) = promote(lhs).unify(&promote(rhs));
        let result = kernel::binary(op, &CellArray::from_value(lhs), &CellArray::from_value(rhs));
        // Same-typed numeric scalars never fail to broadcast or dispatch.
        match result.ok().and_then(|r| r.first()) {
            Some(v) => v,
            None => unreachable!("{op:?} on {lhs:?} and {rhs:?}"),
        }
    }

    macro_rules! cv_bin_op {
        ($trt:ident, $mth:ident, $op:expr) => {
            impl <R> $trt<R> for &CellValue where R: Into<CellValue> {
                type Output = CellValue;
                fn $mth(self, rhs: R) -> Self::Output {
                    scalar_op($op, *self, rhs.into())
                }
            }
            impl <R> $trt<R> for CellValue where R: Into<CellValue> {
                type Output = CellValue;
                fn $mth(self, rhs: R) -> Self::Output {
                    $trt::$mth(&self, rhs)
                }
            }
        }
    }

    cv_bin_op!(Add, add, UFunc::Add);
    cv_bin_op!(Sub, sub, UFunc::Subtract);
    cv_bin_op!(Mul, mul, UFunc::Multiply);
    cv_bin_op!(Div, div, UFunc::TrueDivide);

    impl Neg for CellValue {
        type Output = CellValue;
        fn neg(self) -> Self::Output {
            match self {
                CellValue::Bool(v) => CellValue::Int64(-(v as i64)),
                CellValue::UInt8(v) => CellValue::new(-(v as i16)),
                CellValue::UInt16(v) => CellValue::new(-(v as i32)),
                CellValue::UInt32(v) => CellValue::new(-(v as i64)),
                CellValue::UInt64(v) => CellValue::new(-(v as f64)),
                CellValue::Int8(v) => CellValue::new(v.wrapping_neg()),
                CellValue::Int16(v) => CellValue::new(v.wrapping_neg()),
                CellValue::Int32(v) => CellValue::new(v.wrapping_neg()),
                CellValue::Int64(v) => CellValue::new(v.wrapping_neg()),
                CellValue::Float32(v) => CellValue::new(-v),
                CellValue::Float64(v) => CellValue::new(-v),
            }
        }
    }

    impl PartialOrd for CellValue {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    /// Total order after unification, using [`Element::sort_cmp`].
    impl Ord for CellValue {
        fn cmp(&self, other: &Self) -> Ordering {
            let (lhs, rhs) = self.unify(other);
            macro_rules! cmp {
                ($( ($id:ident, $_p:ident) ),*) => {
                    match (lhs, rhs) {
                        $( (CellValue::$id(l), CellValue::$id(r)) => l.sort_cmp(&r), )*
                        _ => unreachable!("{self:?} <> {other:?}"),
                    }
                };
            }
            with_et!(cmp)
        }
    }

    impl PartialEq<Self> for CellValue {
        fn eq(&self, other: &Self) -> bool {
            Ord::cmp(self, other) == Ordering::Equal
        }
    }

    impl Eq for CellValue {}
}
