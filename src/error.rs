/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::CellType;
use thiserror::Error as ThisError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised while building a masked array.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("Cannot infer a cell type from input made only of masked entries; supply a dtype")]
    AmbiguousDtype,
    #[error("Mask of shape {mask:?} cannot be applied to data of shape {data:?}")]
    MaskShape { data: Vec<usize>, mask: Vec<usize> },
    #[error("Nested input is ragged at depth {0}")]
    Ragged(usize),
    #[error("An explicit mask cannot be combined with input containing the masked sentinel")]
    SentinelWithMask,
}

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error("Operands of unrelated masked flavors {left} and {right} cannot be combined")]
    AmbiguousType { left: String, right: String },
    #[error("Masked `{op}` does not support `{method}`: the operation has no identity")]
    OperationNotSupported { op: &'static str, method: &'static str },
    #[error("Cannot assign to read-only {0}")]
    ReadOnly(&'static str),
    #[error("Index arrays must not be masked. Use `filled` first")]
    IndexMask,
    #[error("Value is masked")]
    Masked,
    #[error("Invalid narrowing from cell type {src} to {dst}")]
    NarrowingError { src: CellType, dst: CellType },
    #[error("Unable to parse {0} as a {1}")]
    ParseError(String, &'static str),
    #[error("Shape mismatch: {0}")]
    Shape(String),
    #[error("Axis {axis} is out of bounds for array of dimension {ndim}")]
    AxisOutOfBounds { axis: isize, ndim: usize },
    #[error("Index {index} is out of bounds for axis of length {len}")]
    IndexOutOfBounds { index: isize, len: usize },
    #[error("`{op}` is not supported for cell type {cell_type}")]
    UnsupportedType { op: &'static str, cell_type: CellType },
    #[error("Output buffer has shape {found:?}, expected {expected:?}")]
    OutShape { expected: Vec<usize>, found: Vec<usize> },
    #[error("Output buffer has cell type {found}, expected {expected}")]
    OutType { expected: CellType, found: CellType },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("No masked implementation of `{op}` is available")]
    NotImplemented { op: String },
}

impl From<ndarray::ShapeError> for Error {
    fn from(value: ndarray::ShapeError) -> Self {
        Error::Shape(value.to_string())
    }
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
