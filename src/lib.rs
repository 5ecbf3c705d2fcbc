/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! N-dimensional arrays of runtime-typed cell values paired with a missing-value mask.
//!
//! A [`MaskedArray`] couples a [`CellArray`] with a boolean [`Mask`] of the same shape,
//! where `true` marks a cell as missing. Elementwise kernels, reductions, statistics,
//! sorting and linear algebra in [`ops`] propagate the mask; the [`dispatch`] tables route
//! generic calls over mixed operands to those implementations.
//!
//! ```
//! use masked_cells::{masked_array, CellValue, X};
//! let a = masked_array![1.0, X, 3.0];
//! let m = a.mean(None, false).unwrap().into_scalar().unwrap();
//! assert_eq!(m.value(), Some(CellValue::Float64(2.0)));
//! ```

mod array;
mod ctype;
pub mod dispatch;
mod elided;
mod encoding;
pub mod error;
mod fill;
mod flavor;
pub mod kernel;
mod masked;
pub mod ops;
mod value;

pub use array::{broadcast_shape, common_type, normalize_axis, normalize_index, CellArray, Order};
pub use ctype::*;
pub use encoding::*;
pub use fill::*;
pub use flavor::*;
pub use masked::*;
pub use value::*;
