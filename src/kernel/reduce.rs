/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use super::{binary, UFunc};
use crate::error::{Error, Result};
use crate::CellArray;

fn axis_len(input: &CellArray, axis: usize) -> Result<usize> {
    input
        .shape()
        .get(axis)
        .copied()
        .ok_or(Error::AxisOutOfBounds { axis: axis as isize, ndim: input.ndim() })
}

/// Fold `input` along `axis` with the binary kernel `op`, removing that axis.
///
/// An empty axis produces the kernel's identity, or fails when it has none.
pub fn reduce(op: UFunc, input: &CellArray, axis: usize) -> Result<CellArray> {
    let n = axis_len(input, axis)?;
    let ct = input.cell_type();
    let rt = op.result_type(ct, ct)?;
    if n == 0 {
        let identity = op
            .identity(ct)
            .ok_or(Error::OperationNotSupported { op: op.name(), method: "reduce" })?;
        let mut shape = input.shape().to_vec();
        shape.remove(axis);
        return Ok(CellArray::full(&shape, identity.cast(rt)));
    }
    let mut acc = input.index_axis(axis, 0);
    for i in 1..n {
        acc = binary(op, &acc, &input.index_axis(axis, i))?;
    }
    Ok(acc.astype(rt))
}

/// Running fold of `input` along `axis`; the result has the shape of `input`.
pub fn accumulate(op: UFunc, input: &CellArray, axis: usize) -> Result<CellArray> {
    let n = axis_len(input, axis)?;
    let ct = input.cell_type();
    let rt = op.result_type(ct, ct)?;
    if n == 0 {
        return Ok(input.astype(rt));
    }
    let mut acc = input.index_axis(axis, 0).astype(rt);
    let mut steps = Vec::with_capacity(n);
    steps.push(acc.clone());
    for i in 1..n {
        acc = binary(op, &acc, &input.index_axis(axis, i))?.astype(rt);
        steps.push(acc.clone());
    }
    CellArray::stack(axis, &steps)
}

/// Apply `op` to every pair `(a, b)` with `a` from `lhs` and `b` from `rhs`.
///
/// The result has shape `lhs.shape() ++ rhs.shape()`.
pub fn outer(op: UFunc, lhs: &CellArray, rhs: &CellArray) -> Result<CellArray> {
    let mut l = lhs.clone();
    for _ in 0..rhs.ndim() {
        let axis = l.ndim();
        l = l.insert_axis(axis);
    }
    binary(op, &l, rhs)
}

/// Reduce the segments of `input` along `axis` that start at each of `indices`.
///
/// A segment runs up to the next index when that is larger, and is the single element at
/// its start otherwise. The final segment runs to the end of the axis.
pub fn reduceat(op: UFunc, input: &CellArray, indices: &[usize], axis: usize) -> Result<CellArray> {
    let n = axis_len(input, axis)?;
    let mut segments = Vec::with_capacity(indices.len());
    for (k, &start) in indices.iter().enumerate() {
        if start >= n {
            return Err(Error::IndexOutOfBounds { index: start as isize, len: n });
        }
        let end = match indices.get(k + 1) {
            Some(&next) if next > start => next.min(n),
            Some(_) => start + 1,
            None => n,
        };
        segments.push(reduce(op, &input.slice_axis(axis, start..end), axis)?);
    }
    CellArray::stack(axis, &segments)
}
