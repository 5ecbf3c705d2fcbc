/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::error::Error;
use crate::CellValue;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Invokes `$callback` with the `(CellType, primitive)` pairs of the numeric cell types.
macro_rules! with_ct {
    ($callback:ident) => {
        $callback! {
            (UInt8, u8),
            (UInt16, u16),
            (UInt32, u32),
            (UInt64, u64),
            (Int8, i8),
            (Int16, i16),
            (Int32, i32),
            (Int64, i64),
            (Float32, f32),
            (Float64, f64)
        }
    };
}
pub(crate) use with_ct;

/// Invokes `$callback` with the `(CellType, primitive)` pairs of every element type, `bool` included.
macro_rules! with_et {
    ($callback:ident) => {
        $callback! {
            (Bool, bool),
            (UInt8, u8),
            (UInt16, u16),
            (UInt32, u32),
            (UInt64, u64),
            (Int8, i8),
            (Int16, i16),
            (Int32, i32),
            (Int64, i64),
            (Float32, f32),
            (Float64, f64)
        }
    };
}
pub(crate) use with_et;

/// Element type ("dtype") of a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum CellType {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

/// Broad family of a [`CellType`], ordered by how much a value of the kind can express.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Kind {
    Bool,
    Unsigned,
    Signed,
    Float,
}

/// `Display` is the same as `Debug`.
impl Display for CellType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl FromStr for CellType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        macro_rules! str_match {
            ( $( ($ct:ident, $_p:ident) ),* ) => {
                match s {
                    $( stringify!($ct) => Ok(CellType::$ct), )*
                    o => Err(Error::ParseError(o.into(), "CellType")),
                }
            };
        }
        with_et!(str_match)
    }
}

impl CellType {
    /// Get an iterator over all the valid enumeration values.
    pub fn iter() -> impl Iterator<Item = CellType> {
        use CellType::*;
        macro_rules! ct_array {
           ( $( ($id:ident, $_p:ident) ),+) => { [ $( $id, )+ ] };
        }
        with_et!(ct_array).into_iter()
    }

    pub fn kind(&self) -> Kind {
        match self {
            CellType::Bool => Kind::Bool,
            CellType::UInt8 | CellType::UInt16 | CellType::UInt32 | CellType::UInt64 => {
                Kind::Unsigned
            }
            CellType::Int8 | CellType::Int16 | CellType::Int32 | CellType::Int64 => Kind::Signed,
            CellType::Float32 | CellType::Float64 => Kind::Float,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.kind() == Kind::Bool
    }

    pub fn is_integral(&self) -> bool {
        matches!(self.kind(), Kind::Unsigned | Kind::Signed)
    }

    pub fn is_float(&self) -> bool {
        self.kind() == Kind::Float
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind(), Kind::Signed | Kind::Float)
    }

    /// Storage width in bits. `Bool` is stored as a byte.
    pub fn bits(&self) -> u32 {
        match self {
            CellType::Bool | CellType::UInt8 | CellType::Int8 => 8,
            CellType::UInt16 | CellType::Int16 => 16,
            CellType::UInt32 | CellType::Int32 | CellType::Float32 => 32,
            CellType::UInt64 | CellType::Int64 | CellType::Float64 => 64,
        }
    }

    fn signed_of(bits: u32) -> Self {
        match bits {
            8 => CellType::Int8,
            16 => CellType::Int16,
            32 => CellType::Int32,
            _ => CellType::Int64,
        }
    }

    /// Select the `CellType` that can numerically contain both `self` and `other`.
    ///
    /// Mixing unsigned and signed integers widens to the next signed size; `UInt64`
    /// with any signed type has no integral home and becomes `Float64`. Integers of
    /// up to 16 bits fit in `Float32`, wider ones force `Float64`.
    pub fn union(self, other: Self) -> Self {
        use Kind::*;
        if self == other {
            return self;
        }
        let (lo, hi) = if self.kind() <= other.kind() {
            (self, other)
        } else {
            (other, self)
        };
        match (lo.kind(), hi.kind()) {
            (Bool, _) => hi,
            (Unsigned, Unsigned) | (Signed, Signed) | (Float, Float) => {
                if lo.bits() >= hi.bits() {
                    lo
                } else {
                    hi
                }
            }
            (Unsigned, Signed) => {
                if lo.bits() < hi.bits() {
                    hi
                } else if lo.bits() < 64 {
                    Self::signed_of(lo.bits() * 2)
                } else {
                    CellType::Float64
                }
            }
            (Unsigned | Signed, Float) => {
                if hi == CellType::Float32 && lo.bits() <= 16 {
                    CellType::Float32
                } else {
                    CellType::Float64
                }
            }
            _ => unreachable!("{lo} <> {hi}"),
        }
    }

    /// Determine if every value of `self` can be represented in `other` without loss.
    pub fn can_fit_into(&self, other: CellType) -> bool {
        self.union(other) == other
    }

    /// The floating point type transcendental kernels produce for inputs of `self`.
    pub fn float_promoted(&self) -> CellType {
        match self {
            CellType::Float64 => CellType::Float64,
            CellType::Float32 => CellType::Float32,
            ct if ct.bits() <= 16 => CellType::Float32,
            _ => CellType::Float64,
        }
    }

    /// The accumulator type `sum` and `prod` use for inputs of `self`.
    pub fn accumulator(&self) -> CellType {
        match self.kind() {
            Kind::Bool | Kind::Signed => CellType::Int64,
            Kind::Unsigned => CellType::UInt64,
            Kind::Float => *self,
        }
    }

    pub fn min(&self) -> CellValue {
        macro_rules! mins {
            ( $( ($ct:ident, $p:ident) ),* ) => {
                match self {
                    CellType::Bool => CellValue::Bool(false),
                    $( CellType::$ct => CellValue::$ct($p::MIN), )*
                }
            };
        }
        with_ct!(mins)
    }

    pub fn max(&self) -> CellValue {
        macro_rules! maxs {
            ( $( ($ct:ident, $p:ident) ),* ) => {
                match self {
                    CellType::Bool => CellValue::Bool(true),
                    $( CellType::$ct => CellValue::$ct($p::MAX), )*
                }
            };
        }
        with_ct!(maxs)
    }

    /// The additive identity of `self`.
    pub fn zero(&self) -> CellValue {
        macro_rules! zeros {
            ( $( ($ct:ident, $p:ident) ),* ) => {
                match self {
                    $( CellType::$ct => CellValue::$ct(<$p as crate::Element>::ZERO), )*
                }
            };
        }
        with_et!(zeros)
    }

    /// The multiplicative identity of `self`.
    pub fn one(&self) -> CellValue {
        macro_rules! ones {
            ( $( ($ct:ident, $p:ident) ),* ) => {
                match self {
                    $( CellType::$ct => CellValue::$ct(<$p as crate::Element>::ONE), )*
                }
            };
        }
        with_et!(ones)
    }
}

#[cfg(test)]
mod tests {
    use crate::{with_ct, CellType};
    use std::str::FromStr;

    #[test]
    fn can_union() {
        use CellType::*;
        for ct in CellType::iter() {
            assert_eq!(ct.union(ct), ct);
            assert_eq!(Bool.union(ct), ct);
            assert_eq!(ct.union(Bool), ct);
        }
        assert_eq!(UInt8.union(UInt16), UInt16);
        assert_eq!(Int32.union(Int8), Int32);
        assert_eq!(UInt8.union(Int8), Int16);
        assert_eq!(Int8.union(UInt8), Int16);
        assert_eq!(UInt16.union(Int32), Int32);
        assert_eq!(UInt32.union(Int32), Int64);
        assert_eq!(UInt64.union(Int8), Float64);
        assert_eq!(Int16.union(Float32), Float32);
        assert_eq!(Int32.union(Float32), Float64);
        assert_eq!(Float32.union(Float64), Float64);
    }

    #[test]
    fn union_is_symmetric() {
        for l in CellType::iter() {
            for r in CellType::iter() {
                assert_eq!(l.union(r), r.union(l), "{l} {r}");
                assert!(l.can_fit_into(l.union(r)), "{l} {r}");
            }
        }
    }

    #[test]
    fn is_integral() {
        assert!(CellType::UInt8.is_integral());
        assert!(CellType::Int64.is_integral());
        assert!(!CellType::Bool.is_integral());
        assert!(!CellType::Float32.is_integral());
        assert!(!CellType::Float64.is_integral());
    }

    #[test]
    fn promotions() {
        assert_eq!(CellType::Int8.float_promoted(), CellType::Float32);
        assert_eq!(CellType::Int32.float_promoted(), CellType::Float64);
        assert_eq!(CellType::Bool.accumulator(), CellType::Int64);
        assert_eq!(CellType::UInt8.accumulator(), CellType::UInt64);
        assert_eq!(CellType::Float32.accumulator(), CellType::Float32);
    }

    #[test]
    fn has_min_max() {
        macro_rules! test {
            ( $( ($ct:ident, $p:ident) ),* ) => {
                $(
                    assert_eq!(CellType::$ct.min(), $p::MIN.into(), "min");
                    assert_eq!(CellType::$ct.max(), $p::MAX.into(), "max");
                )*
            };
        }
        with_ct!(test);
    }

    #[test]
    fn can_string() {
        for ct in CellType::iter() {
            let stringed = ct.to_string();
            let parsed = CellType::from_str(&stringed);
            assert!(parsed.is_ok(), "{stringed}");
            assert_eq!(parsed.unwrap(), ct, "{stringed}");
        }

        assert!(CellType::from_str("UInt57").is_err());
    }
}
