/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Masked arrays: a data array paired with a mask of the same shape.

mod array;
mod builder;
mod index;
mod iter;
mod mask;
mod scalar;
mod sentinel;

pub use array::*;
pub use builder::*;
pub use index::*;
pub use iter::*;
pub use mask::*;
pub use scalar::*;
pub use sentinel::*;

use crate::error::{Error, Result};
use crate::Flavor;

/// Result of a masked operation: a scalar exactly when the result has zero dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Masked {
    Array(MaskedArray),
    Scalar(MaskedScalar),
}

impl Masked {
    /// Wrap `array`, collapsing zero-dimensional results into [`Masked::Scalar`].
    pub fn from_array(array: MaskedArray) -> Self {
        if array.ndim() == 0 {
            match array.scalar_at(&[]) {
                Some(s) => Masked::Scalar(s),
                None => Masked::Array(array),
            }
        } else {
            Masked::Array(array)
        }
    }

    pub fn flavor(&self) -> Flavor {
        match self {
            Masked::Array(a) => a.flavor(),
            Masked::Scalar(s) => s.flavor(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Masked::Array(a) => a.shape(),
            Masked::Scalar(_) => &[],
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Masked::Scalar(_))
    }

    pub fn as_array(&self) -> Option<&MaskedArray> {
        match self {
            Masked::Array(a) => Some(a),
            Masked::Scalar(_) => None,
        }
    }

    /// Scalars become zero-dimensional arrays.
    pub fn into_array(self) -> MaskedArray {
        match self {
            Masked::Array(a) => a,
            Masked::Scalar(s) => s.to_array(),
        }
    }

    pub fn into_scalar(self) -> Result<MaskedScalar> {
        match self {
            Masked::Scalar(s) => Ok(s),
            Masked::Array(a) => Err(Error::Shape(format!(
                "expected a scalar, found an array of shape {:?}",
                a.shape()
            ))),
        }
    }
}

impl From<MaskedArray> for Masked {
    fn from(value: MaskedArray) -> Self {
        Masked::from_array(value)
    }
}

impl From<MaskedScalar> for Masked {
    fn from(value: MaskedScalar) -> Self {
        Masked::Scalar(value)
    }
}
