/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Interception of elementwise kernels and whole-array functions over mixed operands.
//!
//! Two tables route a call to its masked implementation: [`ufunc`] for [`UFunc`] methods
//! and [`call`] for [`Func`]. Either may decline, leaving the operation to whatever
//! array family the operands belong to.
//!
//! ```
//! use masked_cells::dispatch::{call, Func, Operand, Params};
//! use masked_cells::{masked_array, X};
//! let a = masked_array![1, X, 3];
//! let total = call(Func::Sum, &[Operand::from(&a)], &Params::new())
//!     .unwrap()
//!     .into_result()
//!     .unwrap();
//! assert_eq!(total.into_masked().unwrap().shape(), &[] as &[usize]);
//! ```

mod function;
mod operand;
mod params;
mod ufunc;

pub use function::*;
pub use operand::*;
pub use params::*;
pub use ufunc::*;

use crate::error::{Error, Result};
use crate::kernel::UFunc;
use crate::{ops, MaskedArray};
use log::debug;

/// Outcome of routing an operation through a dispatch table.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched<T> {
    Handled(T),
    /// No masked implementation applies; carries the reason.
    Declined(String),
}

impl<T> Dispatched<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatched::Handled(_))
    }

    /// The handled value, or [`Error::NotImplemented`] for a decline.
    pub fn into_result(self) -> Result<T> {
        match self {
            Dispatched::Handled(v) => Ok(v),
            Dispatched::Declined(op) => Err(Error::NotImplemented { op }),
        }
    }
}

pub(crate) fn decline<T>(reason: String) -> Dispatched<T> {
    debug!("Declined masked dispatch: {reason}");
    Dispatched::Declined(reason)
}

fn write_out(result: MaskedArray, out: &mut MaskedArray) -> Result<&mut MaskedArray> {
    out.check_writeable()?;
    if result.shape() != out.shape() {
        return Err(Error::OutShape { expected: result.shape().to_vec(), found: out.shape().to_vec() });
    }
    if result.dtype() != out.dtype() {
        return Err(Error::OutType { expected: result.dtype(), found: out.dtype() });
    }
    let (data, mask) = result.into_parts();
    let (d, m) = out.parts_mut();
    *d = data;
    *m = mask;
    Ok(out)
}

/// Call `op` on `operands`, writing data and mask into `out`.
///
/// `out` must already have the shape and cell type of the result.
pub fn ufunc_out<'o>(
    op: UFunc,
    operands: &[Operand<'_>],
    out: &'o mut MaskedArray,
) -> Result<&'o mut MaskedArray> {
    write_out(ops::apply(op, operands)?.into_array(), out)
}

/// Fold `a` with `op` along `axis`, writing data and mask into `out`.
pub fn reduce_out<'o>(
    op: UFunc,
    a: &MaskedArray,
    axis: Option<isize>,
    keepdims: bool,
    out: &'o mut MaskedArray,
) -> Result<&'o mut MaskedArray> {
    write_out(ops::reduce(op, a, axis, keepdims)?.into_array(), out)
}
