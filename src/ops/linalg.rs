/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Products and contractions.
//!
//! Data is contracted with masked cells read as zero. The mask is contracted over the
//! validity of each cell with logical `or` and `and`, so that a result cell is masked
//! exactly when none of the terms summed into it has only unmasked factors.

use super::binary;
use crate::array::{common_type, map_array, normalize_axis, unravel};
use crate::dispatch::ConvolveMode;
use crate::error::{Error, Result};
use crate::kernel::{self, UFunc};
use crate::{with_et, CellArray, CellType, Element, Fill, Flavor, Mask, Masked, MaskedArray};
use ndarray::{ArrayD, Axis, IxDyn, Slice};

/// Labelled axes of a contraction.
#[derive(Debug)]
struct Plan {
    sizes: Vec<usize>,
    inputs: Vec<Vec<usize>>,
    output: Vec<usize>,
}

fn label(i: usize) -> char {
    match i {
        0..=25 => (b'a' + i as u8) as char,
        _ => (b'A' + (i - 26) as u8) as char,
    }
}

fn labels(range: std::ops::Range<usize>) -> Vec<char> {
    range.map(label).collect()
}

impl Plan {
    fn parse(subscripts: &str, shapes: &[&[usize]]) -> Result<Plan> {
        let compact: String = subscripts.chars().filter(|c| !c.is_whitespace()).collect();
        let (lhs, rhs) = match compact.split_once("->") {
            Some((l, r)) => (l, Some(r)),
            None => (compact.as_str(), None),
        };
        let terms: Vec<&str> = lhs.split(',').collect();
        if terms.len() != shapes.len() {
            return Err(Error::invalid(format!(
                "{} operand(s) given for {} subscript term(s)",
                shapes.len(),
                terms.len()
            )));
        }
        let mut chars: Vec<char> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut inputs = Vec::with_capacity(terms.len());
        for (term, shape) in terms.iter().zip(shapes) {
            if term.chars().count() != shape.len() {
                return Err(Error::invalid(format!(
                    "subscripts `{term}` do not match an operand of {} dimension(s)",
                    shape.len()
                )));
            }
            let mut axes = Vec::with_capacity(shape.len());
            for (c, &n) in term.chars().zip(shape.iter()) {
                if !c.is_ascii_alphabetic() {
                    return Err(Error::invalid(format!("invalid subscript `{c}` in einsum")));
                }
                let l = match chars.iter().position(|&k| k == c) {
                    Some(l) if sizes[l] != n => {
                        return Err(Error::Shape(format!(
                            "dimension {n} of subscript `{c}` does not match the earlier {}",
                            sizes[l]
                        )))
                    }
                    Some(l) => l,
                    None => {
                        chars.push(c);
                        sizes.push(n);
                        chars.len() - 1
                    }
                };
                axes.push(l);
            }
            inputs.push(axes);
        }
        let output = match rhs {
            Some(out) => {
                let mut output = Vec::new();
                for c in out.chars() {
                    let Some(l) = chars.iter().position(|&k| k == c) else {
                        return Err(Error::invalid(format!(
                            "output subscript `{c}` does not appear in the inputs"
                        )));
                    };
                    if output.contains(&l) {
                        return Err(Error::invalid(format!("output subscript `{c}` appears twice")));
                    }
                    output.push(l);
                }
                output
            }
            None => {
                let mut once: Vec<usize> = (0..chars.len())
                    .filter(|l| inputs.iter().flatten().filter(|k| *k == l).count() == 1)
                    .collect();
                once.sort_by_key(|&l| chars[l]);
                once
            }
        };
        Ok(Plan { sizes, inputs, output })
    }

    /// Plan from already chosen labels.
    fn of(inputs: &[Vec<char>], output: &[char], shapes: &[&[usize]]) -> Result<Plan> {
        let terms: Vec<String> = inputs.iter().map(|t| t.iter().collect()).collect();
        let out: String = output.iter().collect();
        Plan::parse(&format!("{}->{out}", terms.join(",")), shapes)
    }

    fn output_shape(&self) -> Vec<usize> {
        self.output.iter().map(|&l| self.sizes[l]).collect()
    }
}

/// Sum over the non-output labels of the products of the inputs, in the semiring of `T`.
fn contract<T: Element>(plan: &Plan, arrays: &[&ArrayD<T>]) -> ArrayD<T> {
    let summed: Vec<usize> = (0..plan.sizes.len()).filter(|l| !plan.output.contains(l)).collect();
    let summed_shape: Vec<usize> = summed.iter().map(|&l| plan.sizes[l]).collect();
    let terms: usize = summed_shape.iter().product();
    let mut assigned = vec![0; plan.sizes.len()];
    let mut index: Vec<Vec<usize>> = plan.inputs.iter().map(|axes| vec![0; axes.len()]).collect();
    ArrayD::from_shape_fn(IxDyn(&plan.output_shape()), |ix| {
        for (k, &l) in plan.output.iter().enumerate() {
            assigned[l] = ix[k];
        }
        let mut acc = T::ZERO;
        for t in 0..terms {
            for (k, v) in unravel(t, &summed_shape).into_iter().enumerate() {
                assigned[summed[k]] = v;
            }
            let mut term = T::ONE;
            for ((a, axes), slot) in arrays.iter().zip(&plan.inputs).zip(index.iter_mut()) {
                for (s, &l) in slot.iter_mut().zip(axes) {
                    *s = assigned[l];
                }
                term = term.times(a[slot.as_slice()]);
            }
            acc = acc.plus(term);
        }
        acc
    })
}

fn contract_cells<T: Element>(plan: &Plan, arrays: &[CellArray]) -> CellArray {
    let views: Vec<&ArrayD<T>> = arrays.iter().filter_map(|a| a.as_array::<T>()).collect();
    contract(plan, &views).into()
}

fn contract_masked(plan: &Plan, operands: &[&MaskedArray]) -> Result<Masked> {
    let flavor = operands
        .iter()
        .try_fold(Flavor::Base, |f, a| f.most_derived(a.flavor()))?;
    let ct = common_type(operands.iter().map(|a| a.dtype())).unwrap_or(CellType::Float64);
    let data: Vec<CellArray> = operands
        .iter()
        .map(|a| a.filled(Fill::Default).astype(ct))
        .collect();
    macro_rules! by_type {
        ( $(($id:ident, $p:ident)),*) => {
            match ct {
                $(CellType::$id => contract_cells::<$p>(plan, &data),)*
            }
        };
    }
    let data = with_et!(by_type);
    let valid: Vec<ArrayD<bool>> = operands.iter().map(|a| a.mask().as_array().mapv(|m| !m)).collect();
    let valid: Vec<&ArrayD<bool>> = valid.iter().collect();
    let mask = contract(plan, &valid).mapv(|v| !v);
    Ok(Masked::from_array(MaskedArray::from_parts(data, Mask::new(mask), flavor)))
}

/// Einstein summation over `operands` described by `subscripts`, e.g. `"ij,jk->ik"`.
///
/// Without `->` the output holds the labels that occur once, in alphabetical order.
pub fn einsum(subscripts: &str, operands: &[&MaskedArray]) -> Result<Masked> {
    let shapes: Vec<&[usize]> = operands.iter().map(|a| a.shape()).collect();
    let plan = Plan::parse(subscripts, &shapes)?;
    contract_masked(&plan, operands)
}

fn scale(a: &MaskedArray, b: &MaskedArray) -> Result<Masked> {
    Ok(Masked::from_array(binary(UFunc::Multiply, a, b)?))
}

/// Matrix product for 2-d operands, inner product for 1-d ones.
///
/// Otherwise sums over the last axis of `a` and the second to last of `b`
/// (the only axis of a 1-d `b`).
pub fn dot(a: &MaskedArray, b: &MaskedArray) -> Result<Masked> {
    let (na, nb) = (a.ndim(), b.ndim());
    if na == 0 || nb == 0 {
        return scale(a, b);
    }
    let la = labels(0..na);
    let mut lb = labels(na..na + nb);
    let shared = if nb == 1 { 0 } else { nb - 2 };
    lb[shared] = la[na - 1];
    let mut out: Vec<char> = la[..na - 1].to_vec();
    out.extend(lb.iter().enumerate().filter(|(i, _)| *i != shared).map(|(_, c)| *c));
    let plan = Plan::of(&[la, lb], &out, &[a.shape(), b.shape()])?;
    contract_masked(&plan, &[a, b])
}

/// Dot product of the flattened operands.
pub fn vdot(a: &MaskedArray, b: &MaskedArray) -> Result<Masked> {
    if a.len() != b.len() {
        return Err(Error::Shape("vdot needs operands of the same size".into()));
    }
    dot(&a.ravel(), &b.ravel())
}

/// Sum over the last axes of `a` and `b`.
pub fn inner(a: &MaskedArray, b: &MaskedArray) -> Result<Masked> {
    let (na, nb) = (a.ndim(), b.ndim());
    if na == 0 || nb == 0 {
        return scale(a, b);
    }
    let la = labels(0..na);
    let mut lb = labels(na..na + nb);
    lb[nb - 1] = la[na - 1];
    let mut out: Vec<char> = la[..na - 1].to_vec();
    out.extend_from_slice(&lb[..nb - 1]);
    let plan = Plan::of(&[la, lb], &out, &[a.shape(), b.shape()])?;
    contract_masked(&plan, &[a, b])
}

/// Every product of a cell of flattened `a` with a cell of flattened `b`.
pub fn outer_product(a: &MaskedArray, b: &MaskedArray) -> Result<MaskedArray> {
    let (a, b) = (a.ravel(), b.ravel());
    Ok(einsum("i,j->ij", &[&a, &b])?.into_array())
}

/// Kronecker product: a copy of `b` scaled by each cell of `a`, laid out block by block.
///
/// A cell is masked where either factor is.
pub fn kron(a: &MaskedArray, b: &MaskedArray) -> Result<MaskedArray> {
    let nd = a.ndim().max(b.ndim());
    let (a, b) = (a.with_ndim(nd)?, b.with_ndim(nd)?);
    let mut spread = a.clone();
    for (axis, &r) in b.shape().iter().enumerate() {
        spread = spread.repeat(&[r], Some(axis as isize))?;
    }
    binary(UFunc::Multiply, &spread, &b.tile(a.shape())?)
}

/// Sum of products over `a_axes` of `a` paired with `b_axes` of `b`.
pub fn tensordot(a: &MaskedArray, b: &MaskedArray, a_axes: &[isize], b_axes: &[isize]) -> Result<Masked> {
    if a_axes.len() != b_axes.len() {
        return Err(Error::Shape("shape-mismatch for sum".into()));
    }
    let (na, nb) = (a.ndim(), b.ndim());
    let a_axes = a_axes.iter().map(|&x| normalize_axis(x, na)).collect::<Result<Vec<_>>>()?;
    let b_axes = b_axes.iter().map(|&x| normalize_axis(x, nb)).collect::<Result<Vec<_>>>()?;
    let la = labels(0..na);
    let mut lb = labels(na..na + nb);
    for (&i, &j) in a_axes.iter().zip(&b_axes) {
        lb[j] = la[i];
    }
    let mut out: Vec<char> = (0..na).filter(|i| !a_axes.contains(i)).map(|i| la[i]).collect();
    out.extend((0..nb).filter(|j| !b_axes.contains(j)).map(|j| lb[j]));
    let plan = Plan::of(&[la, lb], &out, &[a.shape(), b.shape()])?;
    contract_masked(&plan, &[a, b])
}

/// [`tensordot`] over the last `n` axes of `a` and the first `n` of `b`.
pub fn tensordot_n(a: &MaskedArray, b: &MaskedArray, n: usize) -> Result<Masked> {
    if n > a.ndim() || n > b.ndim() {
        return Err(Error::Shape("shape-mismatch for sum".into()));
    }
    let a_axes: Vec<isize> = (a.ndim() - n..a.ndim()).map(|x| x as isize).collect();
    let b_axes: Vec<isize> = (0..n).map(|x| x as isize).collect();
    tensordot(a, b, &a_axes, &b_axes)
}

/// Cross product of 2- or 3-vectors along the last axis.
///
/// A component is masked when each of its two products has a masked factor.
/// 2-vectors give the scalar `z` component.
pub fn cross(a: &MaskedArray, b: &MaskedArray) -> Result<Masked> {
    let (Some(&n), Some(&m)) = (a.shape().last(), b.shape().last()) else {
        return Err(Error::invalid("cross needs operands with at least one dimension"));
    };
    if n != m || !(n == 2 || n == 3) {
        return Err(Error::invalid(format!(
            "incompatible dimensions for cross product (dimension must be 2 or 3, got {n} and {m})"
        )));
    }
    let component = |x: &MaskedArray, i: usize| -> MaskedArray {
        let ax = x.ndim() - 1;
        let data = x.filled(Fill::Default).index_axis(ax, i);
        let mask = x.mask().as_array().index_axis(Axis(ax), i).to_owned();
        MaskedArray::from_parts(data, Mask::new(mask), x.flavor())
    };
    // Each term is a product of two valid factors or contributes nothing.
    let term = |i: usize, j: usize, k: usize, l: usize| -> Result<MaskedArray> {
        let p = binary(UFunc::Multiply, &component(a, i), &component(b, j))?;
        let q = binary(UFunc::Multiply, &component(a, k), &component(b, l))?;
        let ct = p.dtype();
        let data = kernel::binary(UFunc::Subtract, &p.filled(Fill::Default), &q.filled(Fill::Default))?;
        let mask = p.mask() & q.mask();
        Ok(MaskedArray::from_parts(data.astype(ct), mask, p.flavor()))
    };
    if n == 2 {
        return Ok(Masked::from_array(term(0, 1, 1, 0)?));
    }
    let parts = [term(1, 2, 2, 1)?, term(2, 0, 0, 2)?, term(0, 1, 1, 0)?];
    let ax = parts[0].ndim();
    let data = CellArray::stack(ax, &parts.iter().map(|p| p.data().clone()).collect::<Vec<_>>())?;
    let masks: Vec<_> = parts.iter().map(|p| p.mask().view()).collect();
    let mask = ndarray::stack(Axis(ax), &masks)?;
    Ok(Masked::from_array(MaskedArray::from_parts(data, Mask::new(mask), parts[0].flavor())))
}

fn convolve_full<T: Element>(a: &[T], v: &[T]) -> Vec<T> {
    let mut out = vec![T::ZERO; a.len() + v.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in v.iter().enumerate() {
            out[i + j] = out[i + j].plus(x.times(y));
        }
    }
    out
}

fn convolution(a: &MaskedArray, v: &MaskedArray, mode: ConvolveMode, reverse: bool) -> Result<MaskedArray> {
    if a.ndim() != 1 || v.ndim() != 1 {
        return Err(Error::invalid("object too deep for desired array"));
    }
    if a.is_empty() {
        return Err(Error::invalid("a cannot be empty"));
    }
    if v.is_empty() {
        return Err(Error::invalid("v cannot be empty"));
    }
    let flavor = a.flavor().most_derived(v.flavor())?;
    let ct = a.dtype().union(v.dtype());
    let ad = a.filled(Fill::Default).astype(ct);
    let vd = v.filled(Fill::Default).astype(ct);
    let vd = if reverse {
        map_array!(&vd, x => x.slice_axis(Axis(0), Slice::new(0, None, -1)).to_owned())
    } else {
        vd
    };
    macro_rules! full {
        ( $(($id:ident, $p:ident)),*) => {
            match ct {
                $(CellType::$id => {
                    let x: Vec<$p> = ad.cast_to::<$p>().iter().copied().collect();
                    let y: Vec<$p> = vd.cast_to::<$p>().iter().copied().collect();
                    CellArray::from(convolve_full(&x, &y))
                })*
            }
        };
    }
    let data = with_et!(full);
    let va: Vec<bool> = a.mask().iter().map(|m| !m).collect();
    let mut vv: Vec<bool> = v.mask().iter().map(|m| !m).collect();
    if reverse {
        vv.reverse();
    }
    let mask: Vec<bool> = convolve_full(&va, &vv).into_iter().map(|v| !v).collect();

    let (n, m) = (a.len(), v.len());
    let (short, long) = (n.min(m), n.max(m));
    let range = match mode {
        ConvolveMode::Full => 0..n + m - 1,
        ConvolveMode::Same => {
            let start = (short - 1) / 2;
            start..start + long
        }
        ConvolveMode::Valid => short - 1..long,
    };
    let data = data.slice_axis(0, range.clone());
    let mask = Mask::from_vec(mask[range].to_vec());
    Ok(MaskedArray::from_parts(data, mask, flavor))
}

/// Discrete linear convolution of two 1-d arrays.
pub fn convolve(a: &MaskedArray, v: &MaskedArray, mode: ConvolveMode) -> Result<MaskedArray> {
    convolution(a, v, mode, false)
}

/// Cross-correlation of two 1-d arrays.
pub fn correlate(a: &MaskedArray, v: &MaskedArray, mode: ConvolveMode) -> Result<MaskedArray> {
    convolution(a, v, mode, true)
}

impl MaskedArray {
    /// Sum along the diagonal selected by `offset`, `axis1` and `axis2`.
    pub fn trace(&self, offset: isize, axis1: isize, axis2: isize) -> Result<Masked> {
        self.diagonal(offset, axis1, axis2)?.sum(Some(-1), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, CellValue, MaskedScalar, X};

    #[test]
    fn matrix_products() {
        let a = masked_array![[1, 2], [X, X]];
        let b = masked_array![[1, X], [3, X]];
        let r = dot(&a, &b).unwrap().into_array();
        assert_eq!(r.dtype(), CellType::Int32);
        assert_eq!(r.mask(), &Mask::new(ndarray::arr2(&[[false, true], [true, true]]).into_dyn()));
        assert_eq!(r.data().get(&[0, 0]), Some(CellValue::Int32(7)));

        let v = masked_array![1, X];
        let r = dot(&a, &v).unwrap().into_array();
        assert_eq!(r.mask(), &Mask::from_vec(vec![false, true]));
        assert_eq!(r.data().get(&[0]), Some(CellValue::Int32(1)));

        let s = dot(&masked_array![1.0, X, 3.0], &masked_array![2.0, 5.0, X]).unwrap();
        assert_eq!(s.into_scalar().unwrap(), MaskedScalar::new(2.0, false));
        let none = vdot(&masked_array![X, 1.0], &masked_array![1.0, X]).unwrap();
        assert!(none.into_scalar().unwrap().is_masked());
    }

    #[test]
    fn contractions() {
        let m = masked_array![[1, 2], [3, X]];
        assert_eq!(einsum("ii", &[&m]).unwrap().into_scalar().unwrap().value(), Some(CellValue::Int32(1)));
        let t = einsum("ij->ji", &[&m]).unwrap().into_array();
        assert!(t.mask().get(&[1, 1]));
        assert_eq!(t.data().get(&[0, 1]), Some(CellValue::Int32(3)));
        assert!(einsum("ij,k", &[&m]).is_err());
        assert!(einsum("ij,jk", &[&m, &masked_array![1, 2]]).is_err());

        let i = inner(&m, &masked_array![1, 1]).unwrap().into_array();
        assert_eq!(i.filled(0).to_vec::<i32>().unwrap(), vec![3, 3]);
        let o = outer_product(&masked_array![1, X], &masked_array![2, 3]).unwrap();
        assert_eq!(o.shape(), &[2, 2]);
        assert_eq!(o.count_masked(), 2);

        let td = tensordot_n(&m, &m, 2).unwrap().into_scalar().unwrap();
        assert_eq!(td.value(), Some(CellValue::Int32(14)));
        let tr = m.trace(0, 0, 1).unwrap().into_scalar().unwrap();
        assert_eq!(tr.value(), Some(CellValue::Int64(1)));
    }

    #[test]
    fn kronecker() {
        let a = masked_array![[1, X]];
        let b = masked_array![[1, 2], [3, 4]];
        let k = kron(&a, &b).unwrap();
        assert_eq!(k.shape(), &[2, 4]);
        let expected = ndarray::arr2(&[[false, false, true, true], [false, false, true, true]]);
        assert_eq!(k.mask(), &Mask::new(expected.into_dyn()));
        assert_eq!(k.data().get(&[1, 1]), Some(CellValue::Int32(4)));

        let flat = kron(&masked_array![1, 10], &masked_array![1, 2, 3]).unwrap();
        assert_eq!(flat.data().to_vec::<i32>().unwrap(), vec![1, 2, 3, 10, 20, 30]);

        let mixed = kron(&masked_array![1, 2], &masked_array![[1], [X]]).unwrap();
        assert_eq!(mixed.shape(), &[2, 2]);
        assert_eq!(mixed.mask(), &Mask::new(ndarray::arr2(&[[false, false], [true, true]]).into_dyn()));
        assert_eq!(mixed.data().get(&[0, 1]), Some(CellValue::Int32(2)));
    }

    #[test]
    fn crosses() {
        let a = masked_array![1.0, 0.0, 0.0];
        let b = masked_array![0.0, 1.0, X];
        let c = cross(&a, &b).unwrap().into_array();
        assert_eq!(c.filled(9.0).to_vec::<f64>().unwrap(), vec![0.0, 0.0, 1.0]);
        assert_eq!(c.mask(), &Mask::from_vec(vec![false, false, false]));
        let z = cross(&masked_array![X, 2.0], &masked_array![X, 3.0]).unwrap();
        assert!(z.into_scalar().unwrap().is_masked());
        assert!(cross(&a, &masked_array![1.0, 2.0]).is_err());
    }

    #[test]
    fn convolutions() {
        let a = masked_array![1.0, 2.0, 3.0];
        let v = masked_array![0.0, 1.0, 0.5];
        let full = convolve(&a, &v, ConvolveMode::Full).unwrap();
        assert_eq!(full.filled(0.0).to_vec::<f64>().unwrap(), vec![0.0, 1.0, 2.5, 4.0, 1.5]);
        let same = convolve(&a, &v, ConvolveMode::Same).unwrap();
        assert_eq!(same.filled(0.0).to_vec::<f64>().unwrap(), vec![1.0, 2.5, 4.0]);
        let valid = correlate(&a, &v, ConvolveMode::Valid).unwrap();
        assert_eq!(valid.filled(0.0).to_vec::<f64>().unwrap(), vec![3.5]);

        let gappy = masked_array![X, 1.0];
        let r = convolve(&gappy, &masked_array![1.0, 1.0], ConvolveMode::Full).unwrap();
        assert_eq!(r.mask(), &Mask::from_vec(vec![true, false, false]));
        assert!(convolve(&a, &MaskedArray::masked_all(&[0], CellType::Float64), ConvolveMode::Full).is_err());
    }
}
