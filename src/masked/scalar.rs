/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::error::{Error, Result};
use crate::flavor::MaskedType;
use crate::{with_et, CellArray, CellType, CellValue, Fill, Flavor, Mask, MaskedArray};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Zero-dimensional counterpart of [`MaskedArray`]. Immutable.
#[derive(Copy, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskedScalar {
    data: CellValue,
    mask: bool,
    flavor: Flavor,
}

impl MaskedScalar {
    pub fn new(value: impl Into<CellValue>, mask: bool) -> Self {
        Self { data: value.into(), mask, flavor: Flavor::Base }
    }

    /// A fully masked scalar of `cell_type`.
    pub fn masked(cell_type: CellType) -> Self {
        Self::new(cell_type.zero(), true)
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn cell_type(&self) -> CellType {
        self.data.cell_type()
    }

    pub fn is_masked(&self) -> bool {
        self.mask
    }

    /// The stored value, whether or not it is masked.
    pub fn data(&self) -> CellValue {
        self.data
    }

    /// The value, or `None` when masked.
    pub fn value(&self) -> Option<CellValue> {
        (!self.mask).then_some(self.data)
    }

    pub fn filled(&self, fill: impl Into<Fill>) -> CellValue {
        if self.mask {
            fill.into().resolve(self.cell_type())
        } else {
            self.data
        }
    }

    /// Lossy conversion of the stored value; the mask is kept.
    pub fn astype(&self, cell_type: CellType) -> Self {
        Self { data: self.data.cast(cell_type), ..*self }
    }

    /// Masked scalars are never truthy.
    pub fn is_truthy(&self) -> bool {
        !self.mask && self.data.is_truthy()
    }

    /// Masked scalars reject assignment.
    pub fn set(&mut self, _value: impl Into<CellValue>) -> Result<()> {
        Err(Error::ReadOnly("masked scalar"))
    }

    pub fn to_array(&self) -> MaskedArray {
        MaskedArray::from_parts(
            CellArray::from_value(self.data),
            Mask::fill(&[], self.mask),
            self.flavor,
        )
    }
}

/// Masked scalars are equal when both are masked, or neither is and their values are.
impl PartialEq for MaskedScalar {
    fn eq(&self, other: &Self) -> bool {
        match (self.mask, other.mask) {
            (true, true) => true,
            (false, false) => self.data == other.data,
            _ => false,
        }
    }
}

impl Debug for MaskedScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let basename = MaskedType::scalar(self.flavor);
        write!(f, "{}{basename}(", self.cell_type())?;
        if self.mask {
            f.write_str("--")?;
        } else {
            write!(f, "{:?}", self.data)?;
        }
        f.write_str(")")
    }
}

impl From<CellValue> for MaskedScalar {
    fn from(value: CellValue) -> Self {
        Self::new(value, false)
    }
}

impl TryFrom<MaskedScalar> for CellValue {
    type Error = Error;

    fn try_from(value: MaskedScalar) -> Result<Self> {
        value.value().ok_or(Error::Masked)
    }
}

/// Refuse to turn masked values into plain numbers.
macro_rules! scalar_try_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl TryFrom<MaskedScalar> for $p {
            type Error = Error;

            fn try_from(value: MaskedScalar) -> Result<Self> {
                value.value().ok_or(Error::Masked)?.get::<$p>()
            }
        }
    )* };
}
with_et!(scalar_try_from);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_values() {
        let s = MaskedScalar::masked(CellType::Int16);
        assert_eq!(s.value(), None);
        assert!(!s.is_truthy());
        assert_eq!(i16::try_from(s), Err(Error::Masked));
        assert_eq!(s.filled(7), CellValue::Int16(7));

        let v = MaskedScalar::new(3u8, false);
        assert_eq!(f64::try_from(v).unwrap(), 3.0);
        assert!(v.is_truthy());
        assert_eq!(v, MaskedScalar::new(3i64, false));
        assert_ne!(v, s);
    }

    #[test]
    fn immutable() {
        let mut s = MaskedScalar::new(1.5, false);
        assert!(matches!(s.set(2.0), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn debug() {
        let s = MaskedScalar::masked(CellType::Float32).with_flavor(Flavor::Grid);
        assert_eq!(format!("{s:?}"), "Float32GridMaskedScalar(--)");
    }
}
