/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::error::{ConstructionError, Error, Result};
use crate::{with_et, CellArray, CellType, CellValue, Literal, MaskedArray, MaskedInput, MaskedScalar};
use std::fmt::Debug;

/// An array from an unrelated array family.
///
/// Such arrays may be passed to the dispatcher, which always declines them so
/// that their own family can handle the operation.
pub trait ForeignArray: Debug {
    /// Name of the array family, used when reporting a decline.
    fn family(&self) -> &str;
    fn shape(&self) -> &[usize];
}

/// One argument to a dispatched operation.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Array(&'a MaskedArray),
    Scalar(&'a MaskedScalar),
    /// A plain array; strongly typed, nothing masked.
    Plain(&'a CellArray),
    /// A plain value; weakly typed.
    Value(CellValue),
    /// The masked sentinel.
    Masked,
    List(Vec<Operand<'a>>),
    Foreign(&'a dyn ForeignArray),
}

impl<'a> From<&'a MaskedArray> for Operand<'a> {
    fn from(value: &'a MaskedArray) -> Self {
        Operand::Array(value)
    }
}

impl<'a> From<&'a MaskedScalar> for Operand<'a> {
    fn from(value: &'a MaskedScalar) -> Self {
        Operand::Scalar(value)
    }
}

impl<'a> From<&'a CellArray> for Operand<'a> {
    fn from(value: &'a CellArray) -> Self {
        Operand::Plain(value)
    }
}

impl From<CellValue> for Operand<'_> {
    fn from(value: CellValue) -> Self {
        Operand::Value(value)
    }
}

impl From<MaskedInput> for Operand<'_> {
    fn from(_: MaskedInput) -> Self {
        Operand::Masked
    }
}

impl<'a> From<&'a dyn ForeignArray> for Operand<'a> {
    fn from(value: &'a dyn ForeignArray) -> Self {
        Operand::Foreign(value)
    }
}

impl<'a> From<Vec<Operand<'a>>> for Operand<'a> {
    fn from(value: Vec<Operand<'a>>) -> Self {
        Operand::List(value)
    }
}

macro_rules! operand_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl From<$p> for Operand<'_> {
            fn from(value: $p) -> Self {
                Operand::Value(CellValue::$id(value))
            }
        }
    )* };
}
with_et!(operand_from);

impl Operand<'_> {
    /// Determine if the masked implementations can accept `self`.
    pub fn is_known(&self) -> bool {
        match self {
            Operand::Foreign(_) => false,
            Operand::List(items) => items.iter().all(Operand::is_known),
            _ => true,
        }
    }

    /// Determine if `self` is a masked array or scalar.
    pub fn is_masked_type(&self) -> bool {
        matches!(self, Operand::Array(_) | Operand::Scalar(_))
    }

    /// Plain values take the type of the operands they meet.
    pub fn is_weak(&self) -> bool {
        matches!(self, Operand::Value(_))
    }

    /// Cell type carried by `self`; `None` for the sentinel and foreign arrays.
    pub fn cell_type(&self) -> Option<CellType> {
        match self {
            Operand::Array(a) => Some(a.dtype()),
            Operand::Scalar(s) => Some(s.cell_type()),
            Operand::Plain(a) => Some(a.cell_type()),
            Operand::Value(v) => Some(v.cell_type()),
            Operand::List(items) => items.iter().filter_map(Operand::cell_type).reduce(CellType::union),
            Operand::Masked | Operand::Foreign(_) => None,
        }
    }

    /// Shape `self` presents to broadcasting.
    pub fn shape(&self) -> Result<Vec<usize>> {
        match self {
            Operand::Array(a) => Ok(a.shape().to_vec()),
            Operand::Plain(a) => Ok(a.shape().to_vec()),
            Operand::Foreign(f) => Ok(f.shape().to_vec()),
            Operand::List(_) => self.to_literal()?.shape(),
            _ => Ok(Vec::new()),
        }
    }

    pub fn to_literal(&self) -> Result<Literal> {
        match self {
            Operand::Array(a) => Ok(Literal::Array((*a).clone())),
            Operand::Scalar(s) => Ok(Literal::Scalar(**s)),
            Operand::Plain(a) => Ok(Literal::Plain((*a).clone())),
            Operand::Value(v) => Ok(Literal::Value(*v)),
            Operand::Masked => Ok(Literal::Masked),
            Operand::List(items) => Ok(Literal::List(
                items.iter().map(Operand::to_literal).collect::<Result<_>>()?,
            )),
            Operand::Foreign(f) => Err(declined(f.family())),
        }
    }

    /// Convert to a [`MaskedArray`]; `dtype` types plain values, the sentinel and lists.
    pub fn to_masked(&self, dtype: Option<CellType>) -> Result<MaskedArray> {
        match self {
            Operand::Array(a) => Ok((*a).clone()),
            Operand::Scalar(s) => Ok(s.to_array()),
            Operand::Plain(a) => Ok(MaskedArray::from_data((*a).clone())),
            Operand::Value(v) => {
                let v = dtype.map_or(*v, |ct| v.cast(ct));
                Ok(MaskedArray::from_data(CellArray::from_value(v)))
            }
            Operand::Masked => {
                let ct = dtype.ok_or(ConstructionError::AmbiguousDtype)?;
                Ok(MaskedArray::masked_all(&[], ct))
            }
            Operand::List(_) => MaskedArray::from_literal(self.to_literal()?, dtype),
            Operand::Foreign(f) => Err(declined(f.family())),
        }
    }

    /// Like [`Self::to_masked`], but rejects masked entries and returns plain data.
    pub fn to_plain(&self, what: &str) -> Result<CellArray> {
        let m = self.to_masked(None)?;
        if matches!(self, Operand::Masked) || m.mask().any() {
            return Err(Error::invalid(format!("{what} should not be masked")));
        }
        Ok(m.into_parts().0)
    }
}

fn declined(family: &str) -> Error {
    Error::NotImplemented { op: format!("operation on {family} arrays") }
}

/// Type weak values and sentinels among `operands` against the strongly typed ones.
///
/// Values keep the strong type unless their kind is higher, in which case the two
/// are promoted. The sentinel takes the resulting type.
pub(crate) fn weak_type(operands: &[Operand<'_>]) -> Option<CellType> {
    let strong = operands
        .iter()
        .filter(|o| !o.is_weak())
        .filter_map(Operand::cell_type)
        .reduce(CellType::union);
    operands
        .iter()
        .filter(|o| o.is_weak())
        .filter_map(Operand::cell_type)
        .fold(strong, |acc, w| match acc {
            None => Some(w),
            Some(t) if w.kind() <= t.kind() => Some(t),
            Some(t) => Some(t.union(w)),
        })
}

/// Convert every operand to a [`MaskedArray`], resolving weak types first.
pub(crate) fn coerce(operands: &[Operand<'_>]) -> Result<Vec<MaskedArray>> {
    let target = weak_type(operands);
    operands
        .iter()
        .map(|o| match o {
            Operand::Value(_) | Operand::Masked => o.to_masked(target),
            _ => o.to_masked(None),
        })
        .collect()
}
