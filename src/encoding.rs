/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::{with_et, CellArray, CellType, CellValue};
use ndarray::ArrayD;
use num_traits::{Num, NumCast, ToPrimitive};
use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Widest lossless-ish intermediate used when casting between cell types.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Wide {
    B(bool),
    I(i128),
    F(f64),
}

impl Wide {
    pub fn as_f64(self) -> f64 {
        match self {
            Wide::B(b) => b as u8 as f64,
            Wide::I(i) => i as f64,
            Wide::F(f) => f,
        }
    }
    pub fn as_i128(self) -> i128 {
        match self {
            Wide::B(b) => b as i128,
            Wide::I(i) => i,
            Wide::F(f) => f as i128,
        }
    }
    pub fn as_bool(self) -> bool {
        match self {
            Wide::B(b) => b,
            Wide::I(i) => i != 0,
            Wide::F(f) => f != 0.0,
        }
    }
}

/// Trait for marking Rust primitives as storable in a [`CellArray`] under a corresponding [`CellType`].
///
/// For example, [`f64`] is [`Element`] through [`CellType::Float64`] and [`bool`]
/// through [`CellType::Bool`], but [`isize`] is not `Element`.
pub trait Element: Copy + Debug + Default + PartialEq + PartialOrd + Send + Sync + 'static {
    /// Additive identity (`false` for `bool`).
    const ZERO: Self;
    /// Multiplicative identity (`true` for `bool`).
    const ONE: Self;
    /// Value that never wins a `max` comparison.
    const MAX_FILLER: Self;
    /// Value that never wins a `min` comparison.
    const MIN_FILLER: Self;

    /// Returns the [`CellType`] covering `Self`.
    fn cell_type() -> CellType;
    /// Converts `self` into a [`CellValue`].
    fn into_cell_value(self) -> CellValue;
    /// Extracts `Self` from a [`CellValue`] of exactly the same variant.
    fn from_cell_value(value: CellValue) -> Option<Self>;
    /// Wraps an array of `Self` in the matching [`CellArray`] variant.
    fn into_cell_array(array: ArrayD<Self>) -> CellArray;
    /// Borrows the typed array inside `array` when the variant matches.
    fn cell_array_ref(array: &CellArray) -> Option<&ArrayD<Self>>;
    /// Unwraps the typed array inside `array` when the variant matches.
    fn from_cell_array(array: CellArray) -> Option<ArrayD<Self>>;
    fn to_wide(self) -> Wide;
    /// Lossy conversion with `as` semantics.
    fn from_wide(value: Wide) -> Self;
    fn is_truthy(self) -> bool;
    /// Sum in the element's natural semiring (logical `or` for `bool`).
    fn plus(self, rhs: Self) -> Self;
    /// Product in the element's natural semiring (logical `and` for `bool`).
    fn times(self, rhs: Self) -> Self;
    /// Total order used by sorting. NaN sorts after every finite value and before `+inf`.
    fn sort_cmp(&self, other: &Self) -> Ordering;

    fn is_nan_cell(self) -> bool {
        false
    }
    fn as_f64(self) -> f64 {
        self.to_wide().as_f64()
    }
    fn cast_f64(value: f64) -> Self {
        Self::from_wide(Wide::F(value))
    }
    fn from_bool(value: bool) -> Self {
        Self::from_wide(Wide::B(value))
    }

    /// Convert dynamic type to static type when logically known.
    /// Returns `None` if given value isn't actually the <u>exact</u> same
    /// type as encoding.
    fn static_cast<T: Element + Sized>(value: T) -> Option<Self> {
        if Self::cell_type() == T::cell_type() {
            Some(unsafe { std::mem::transmute_copy::<T, Self>(&value) })
        } else {
            None
        }
    }
}

/// Numeric [`Element`]s, with the arithmetic masked kernels need.
///
/// Integer arithmetic wraps on overflow, and integer division or modulo by zero yields zero.
pub trait CellEncoding: Element + Num + NumCast + ToPrimitive {
    fn cell_add(self, rhs: Self) -> Self;
    fn cell_sub(self, rhs: Self) -> Self;
    fn cell_mul(self, rhs: Self) -> Self;
    /// Quotient rounded towards negative infinity.
    fn cell_floor_div(self, rhs: Self) -> Self;
    /// Remainder with the sign of the divisor.
    fn cell_rem(self, rhs: Self) -> Self;
    /// Remainder with the sign of the dividend.
    fn cell_fmod(self, rhs: Self) -> Self;
    fn cell_pow(self, rhs: Self) -> Self;
    fn cell_neg(self) -> Self;
    fn cell_abs(self) -> Self;
    /// Maximum that propagates NaN.
    fn cell_max(self, rhs: Self) -> Self;
    /// Minimum that propagates NaN.
    fn cell_min(self, rhs: Self) -> Self;
}

/// Elements supporting bitwise logic: the integers and `bool`.
pub trait Bitwise:
    Element + BitAnd<Output = Self> + BitOr<Output = Self> + BitXor<Output = Self> + Not<Output = Self>
{
}

impl<T> Bitwise for T where
    T: Element
        + BitAnd<Output = T>
        + BitOr<Output = T>
        + BitXor<Output = T>
        + Not<Output = T>
{
}

/// Implements the variant plumbing of [`Element`] for each cell type.
macro_rules! element_variants {
    ( $( ($ct:ident, $prim:ident) ),* ) => { $(
        impl ElementVariant for $prim {
            fn cell_type() -> CellType {
                CellType::$ct
            }
            fn into_cell_value(self) -> CellValue {
                CellValue::$ct(self)
            }
            fn from_cell_value(value: CellValue) -> Option<Self> {
                match value {
                    CellValue::$ct(v) => Some(v),
                    _ => None,
                }
            }
            fn into_cell_array(array: ArrayD<Self>) -> CellArray {
                CellArray::$ct(array)
            }
            fn cell_array_ref(array: &CellArray) -> Option<&ArrayD<Self>> {
                match array {
                    CellArray::$ct(a) => Some(a),
                    _ => None,
                }
            }
            fn from_cell_array(array: CellArray) -> Option<ArrayD<Self>> {
                match array {
                    CellArray::$ct(a) => Some(a),
                    _ => None,
                }
            }
        } )*
    };
}

/// Per-type variant mapping shared by the `Element` impls below.
trait ElementVariant: Sized {
    fn cell_type() -> CellType;
    fn into_cell_value(self) -> CellValue;
    fn from_cell_value(value: CellValue) -> Option<Self>;
    fn into_cell_array(array: ArrayD<Self>) -> CellArray;
    fn cell_array_ref(array: &CellArray) -> Option<&ArrayD<Self>>;
    fn from_cell_array(array: CellArray) -> Option<ArrayD<Self>>;
}

with_et!(element_variants);

/// Forwards the variant plumbing of [`Element`] to [`ElementVariant`].
macro_rules! forward_variants {
    () => {
        fn cell_type() -> CellType {
            <Self as ElementVariant>::cell_type()
        }
        fn into_cell_value(self) -> CellValue {
            <Self as ElementVariant>::into_cell_value(self)
        }
        fn from_cell_value(value: CellValue) -> Option<Self> {
            <Self as ElementVariant>::from_cell_value(value)
        }
        fn into_cell_array(array: ArrayD<Self>) -> CellArray {
            <Self as ElementVariant>::into_cell_array(array)
        }
        fn cell_array_ref(array: &CellArray) -> Option<&ArrayD<Self>> {
            <Self as ElementVariant>::cell_array_ref(array)
        }
        fn from_cell_array(array: CellArray) -> Option<ArrayD<Self>> {
            <Self as ElementVariant>::from_cell_array(array)
        }
    };
}

impl Element for bool {
    const ZERO: Self = false;
    const ONE: Self = true;
    const MAX_FILLER: Self = false;
    const MIN_FILLER: Self = true;

    forward_variants!();

    fn to_wide(self) -> Wide {
        Wide::B(self)
    }
    fn from_wide(value: Wide) -> Self {
        value.as_bool()
    }
    fn is_truthy(self) -> bool {
        self
    }
    fn plus(self, rhs: Self) -> Self {
        self | rhs
    }
    fn times(self, rhs: Self) -> Self {
        self & rhs
    }
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

macro_rules! int_element {
    ( $( $prim:ident ),* ) => { $(
        impl Element for $prim {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX_FILLER: Self = $prim::MIN;
            const MIN_FILLER: Self = $prim::MAX;

            forward_variants!();

            fn to_wide(self) -> Wide {
                Wide::I(self as i128)
            }
            fn from_wide(value: Wide) -> Self {
                match value {
                    Wide::B(b) => b as $prim,
                    Wide::I(i) => i as $prim,
                    Wide::F(f) => f as $prim,
                }
            }
            fn is_truthy(self) -> bool {
                self != 0
            }
            fn plus(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn times(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn sort_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        }
    )* };
}
int_element!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! float_element {
    ( $( $prim:ident ),* ) => { $(
        impl Element for $prim {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const MAX_FILLER: Self = $prim::NEG_INFINITY;
            const MIN_FILLER: Self = $prim::INFINITY;

            forward_variants!();

            fn to_wide(self) -> Wide {
                Wide::F(self as f64)
            }
            fn from_wide(value: Wide) -> Self {
                match value {
                    Wide::B(b) => if b { 1.0 } else { 0.0 },
                    Wide::I(i) => i as $prim,
                    Wide::F(f) => f as $prim,
                }
            }
            fn is_truthy(self) -> bool {
                self != 0.0
            }
            fn plus(self, rhs: Self) -> Self {
                self + rhs
            }
            fn times(self, rhs: Self) -> Self {
                self * rhs
            }
            fn sort_cmp(&self, other: &Self) -> Ordering {
                match (self.is_nan(), other.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => {
                        if *other == $prim::INFINITY { Ordering::Less } else { Ordering::Greater }
                    }
                    (false, true) => {
                        if *self == $prim::INFINITY { Ordering::Greater } else { Ordering::Less }
                    }
                    (false, false) => self.total_cmp(other),
                }
            }
            fn is_nan_cell(self) -> bool {
                self.is_nan()
            }
            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    )* };
}
float_element!(f32, f64);

macro_rules! signed_encoding {
    ( $( $prim:ident ),* ) => { $(
        impl CellEncoding for $prim {
            fn cell_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn cell_sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            fn cell_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn cell_floor_div(self, rhs: Self) -> Self {
                if rhs == 0 {
                    return 0;
                }
                let q = self.wrapping_div(rhs);
                if self.wrapping_rem(rhs) != 0 && ((self < 0) != (rhs < 0)) {
                    q.wrapping_sub(1)
                } else {
                    q
                }
            }
            fn cell_rem(self, rhs: Self) -> Self {
                if rhs == 0 {
                    return 0;
                }
                let r = self.wrapping_rem(rhs);
                if r != 0 && ((r < 0) != (rhs < 0)) {
                    r.wrapping_add(rhs)
                } else {
                    r
                }
            }
            fn cell_fmod(self, rhs: Self) -> Self {
                if rhs == 0 { 0 } else { self.wrapping_rem(rhs) }
            }
            fn cell_pow(self, rhs: Self) -> Self {
                if rhs < 0 {
                    return 0;
                }
                self.wrapping_pow(u32::try_from(rhs).unwrap_or(u32::MAX))
            }
            fn cell_neg(self) -> Self {
                self.wrapping_neg()
            }
            fn cell_abs(self) -> Self {
                self.wrapping_abs()
            }
            fn cell_max(self, rhs: Self) -> Self {
                Ord::max(self, rhs)
            }
            fn cell_min(self, rhs: Self) -> Self {
                Ord::min(self, rhs)
            }
        }
    )* };
}
signed_encoding!(i8, i16, i32, i64);

macro_rules! unsigned_encoding {
    ( $( $prim:ident ),* ) => { $(
        impl CellEncoding for $prim {
            fn cell_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn cell_sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            fn cell_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn cell_floor_div(self, rhs: Self) -> Self {
                if rhs == 0 { 0 } else { self / rhs }
            }
            fn cell_rem(self, rhs: Self) -> Self {
                if rhs == 0 { 0 } else { self % rhs }
            }
            fn cell_fmod(self, rhs: Self) -> Self {
                if rhs == 0 { 0 } else { self % rhs }
            }
            fn cell_pow(self, rhs: Self) -> Self {
                self.wrapping_pow(u32::try_from(rhs).unwrap_or(u32::MAX))
            }
            fn cell_neg(self) -> Self {
                self.wrapping_neg()
            }
            fn cell_abs(self) -> Self {
                self
            }
            fn cell_max(self, rhs: Self) -> Self {
                Ord::max(self, rhs)
            }
            fn cell_min(self, rhs: Self) -> Self {
                Ord::min(self, rhs)
            }
        }
    )* };
}
unsigned_encoding!(u8, u16, u32, u64);

macro_rules! float_encoding {
    ( $( $prim:ident ),* ) => { $(
        impl CellEncoding for $prim {
            fn cell_add(self, rhs: Self) -> Self {
                self + rhs
            }
            fn cell_sub(self, rhs: Self) -> Self {
                self - rhs
            }
            fn cell_mul(self, rhs: Self) -> Self {
                self * rhs
            }
            fn cell_floor_div(self, rhs: Self) -> Self {
                (self / rhs).floor()
            }
            fn cell_rem(self, rhs: Self) -> Self {
                let r = self % rhs;
                if r != 0.0 && ((r < 0.0) != (rhs < 0.0)) {
                    r + rhs
                } else {
                    r
                }
            }
            fn cell_fmod(self, rhs: Self) -> Self {
                self % rhs
            }
            fn cell_pow(self, rhs: Self) -> Self {
                self.powf(rhs)
            }
            fn cell_neg(self) -> Self {
                -self
            }
            fn cell_abs(self) -> Self {
                self.abs()
            }
            fn cell_max(self, rhs: Self) -> Self {
                if self.is_nan() || self >= rhs { self } else { rhs }
            }
            fn cell_min(self, rhs: Self) -> Self {
                if self.is_nan() || self <= rhs { self } else { rhs }
            }
        }
    )* };
}
float_encoding!(f32, f64);
