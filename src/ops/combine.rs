/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Arrays built from other arrays: tiles, grids, blocks, stacks and splits.

use super::shape::{join, Layout};
use crate::array::normalize_axis;
use crate::dispatch::{coerce, Indexing, Operand, Sections};
use crate::error::{Error, Result};
use crate::MaskedArray;

impl MaskedArray {
    /// Repeat the whole array `reps[i]` times along axis `i`.
    ///
    /// The shorter of `reps` and the shape is padded with leading ones.
    pub fn tile(&self, reps: &[usize]) -> Result<MaskedArray> {
        let nd = self.ndim().max(reps.len());
        let mut full = vec![1; nd - reps.len()];
        full.extend_from_slice(reps);
        let mut out = self.with_ndim(nd)?;
        for (axis, &r) in full.iter().enumerate() {
            if r == 1 {
                continue;
            }
            let n = out.shape()[axis];
            let keep = (0..r).flat_map(|_| 0..n).collect();
            out = out.restructure(&Layout::Select { axis, keep })?;
        }
        Ok(out)
    }

    pub fn atleast_1d(&self) -> Result<MaskedArray> {
        self.with_ndim(1)
    }

    /// A one-dimensional array becomes a single row.
    pub fn atleast_2d(&self) -> Result<MaskedArray> {
        self.with_ndim(2)
    }

    /// A one-dimensional array of length `n` becomes `(1, n, 1)`; a two-dimensional one
    /// gains a trailing axis.
    pub fn atleast_3d(&self) -> Result<MaskedArray> {
        match self.shape() {
            [] => self.reshape(&[1, 1, 1]),
            [n] => self.reshape(&[1, *n, 1]),
            [r, c] => self.reshape(&[*r, *c, 1]),
            _ => Ok(self.clone()),
        }
    }

    /// Cut into parts along `axis`. A count must divide the axis evenly.
    pub fn split(&self, sections: &Sections, axis: isize) -> Result<Vec<MaskedArray>> {
        if let Sections::Count(k) = sections {
            let ax = normalize_axis(axis, self.ndim())?;
            if *k > 0 && self.shape()[ax] % k != 0 {
                return Err(Error::invalid("array split does not result in an equal division"));
            }
        }
        self.array_split(sections, axis)
    }

    /// Cut into parts along `axis`.
    ///
    /// A count of `k` makes the first `n % k` parts one longer than the rest. Positions
    /// count from the end when negative and are clamped to the axis; a position before
    /// its predecessor gives an empty part.
    pub fn array_split(&self, sections: &Sections, axis: isize) -> Result<Vec<MaskedArray>> {
        let ax = normalize_axis(axis, self.ndim())?;
        let n = self.shape()[ax];
        let bounds = match sections {
            Sections::Count(0) => return Err(Error::invalid("number sections must be larger than 0.")),
            Sections::Count(k) => {
                let (each, extra) = (n / k, n % k);
                let mut b = vec![0];
                for i in 0..*k {
                    b.push(b[i] + each + usize::from(i < extra));
                }
                b
            }
            Sections::At(cuts) => {
                let clamp = |c: isize| match c {
                    c if c < 0 => (c + n as isize).max(0) as usize,
                    c => (c as usize).min(n),
                };
                let mut b = vec![0];
                b.extend(cuts.iter().map(|&c| clamp(c)));
                b.push(n);
                b
            }
        };
        Ok(bounds
            .windows(2)
            .map(|w| self.part(ax, w[0]..w[1].max(w[0])))
            .collect())
    }
}

fn joined(axis: usize, parts: &[MaskedArray]) -> Result<MaskedArray> {
    if parts.is_empty() {
        return Err(Error::invalid("need at least one array to concatenate"));
    }
    join(axis, parts)
}

/// Join along the first axis, after promoting every array to two dimensions.
pub fn vstack(arrays: &[Operand<'_>]) -> Result<MaskedArray> {
    let parts = coerce(arrays)?
        .iter()
        .map(MaskedArray::atleast_2d)
        .collect::<Result<Vec<_>>>()?;
    joined(0, &parts)
}

/// Join along the second axis, or the first when the arrays are one-dimensional.
pub fn hstack(arrays: &[Operand<'_>]) -> Result<MaskedArray> {
    let parts = coerce(arrays)?
        .iter()
        .map(MaskedArray::atleast_1d)
        .collect::<Result<Vec<_>>>()?;
    let axis = if parts.first().is_some_and(|a| a.ndim() == 1) { 0 } else { 1 };
    joined(axis, &parts)
}

/// Join as columns: one-dimensional arrays become single columns first.
pub fn column_stack(arrays: &[Operand<'_>]) -> Result<MaskedArray> {
    let parts = coerce(arrays)?
        .into_iter()
        .map(|a| match a.ndim() {
            0 | 1 => a.reshape(&[a.len(), 1]),
            _ => Ok(a),
        })
        .collect::<Result<Vec<_>>>()?;
    joined(1, &parts)
}

/// Coordinate arrays over the grid spanned by the flattened `xs`.
///
/// Each output holds one input repeated across the other axes, cells and mask alike.
pub fn meshgrid(xs: &[Operand<'_>], indexing: Indexing) -> Result<Vec<MaskedArray>> {
    let xs: Vec<MaskedArray> = coerce(xs)?.iter().map(MaskedArray::ravel).collect();
    let swap = indexing == Indexing::Xy && xs.len() > 1;
    let mut shape: Vec<usize> = xs.iter().map(MaskedArray::len).collect();
    if swap {
        shape.swap(0, 1);
    }
    xs.iter()
        .enumerate()
        .map(|(i, x)| {
            let axis = match i {
                0 if swap => 1,
                1 if swap => 0,
                i => i,
            };
            let mut lane = vec![1; shape.len()];
            lane[axis] = x.len();
            Ok(x.reshape(&lane)?.broadcast_to(&shape)?.copy())
        })
        .collect()
}

fn list_depth(o: &Operand<'_>) -> Result<usize> {
    let Operand::List(items) = o else {
        return Ok(0);
    };
    let mut depths = items.iter().map(list_depth);
    let first = match depths.next() {
        Some(d) => d?,
        None => return Err(Error::invalid("Lists cannot be empty")),
    };
    for d in depths {
        if d? != first {
            return Err(Error::invalid("List depths are mismatched"));
        }
    }
    Ok(first + 1)
}

fn leaves<'a>(o: &Operand<'a>, out: &mut Vec<Operand<'a>>) {
    match o {
        Operand::List(items) => items.iter().for_each(|i| leaves(i, out)),
        leaf => out.push(leaf.clone()),
    }
}

fn assemble(
    o: &Operand<'_>,
    depth: usize,
    ndim: usize,
    blocks: &mut impl Iterator<Item = MaskedArray>,
) -> Result<MaskedArray> {
    match o {
        Operand::List(items) => {
            let parts = items
                .iter()
                .map(|i| assemble(i, depth - 1, ndim, &mut *blocks))
                .collect::<Result<Vec<_>>>()?;
            join(ndim - depth, &parts)
        }
        _ => blocks
            .next()
            .ok_or_else(|| Error::invalid("block ran out of arrays"))?
            .with_ndim(ndim),
    }
}

/// Assemble an array from nested lists of blocks.
///
/// The innermost lists join along the last axis, the lists holding them along the one
/// before, and so on. Blocks gain leading length-one axes to match the deepest nesting
/// or the largest block, whichever has more dimensions.
pub fn block(arrays: &Operand<'_>) -> Result<MaskedArray> {
    let depth = list_depth(arrays)?;
    let mut found = Vec::new();
    leaves(arrays, &mut found);
    let blocks = coerce(&found)?;
    let ndim = blocks.iter().map(MaskedArray::ndim).max().unwrap_or(0).max(depth);
    assemble(arrays, depth, ndim, &mut blocks.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, CellType, Mask, X};

    fn mask(a: &MaskedArray) -> Vec<bool> {
        a.mask().iter().collect()
    }

    fn ints(a: &MaskedArray) -> Vec<i32> {
        a.data().to_vec::<i32>().unwrap()
    }

    #[test]
    fn tiles() {
        let a = masked_array![1, X];
        let t = a.tile(&[2]).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(ints(&t)[2], 1);
        assert_eq!(mask(&t), vec![false, true, false, true]);

        let g = a.tile(&[2, 1]).unwrap();
        assert_eq!(g.shape(), &[2, 2]);
        assert_eq!(mask(&g), vec![false, true, false, true]);

        let m = masked_array![[1, 2], [X, 4]];
        let wide = m.tile(&[3]).unwrap();
        assert_eq!(wide.shape(), &[2, 6]);
        assert_eq!(wide.count_masked(), 3);
        assert_eq!(m.tile(&[0]).unwrap().shape(), &[2, 0]);
    }

    #[test]
    fn at_least() {
        let s = MaskedArray::masked_all(&[], CellType::Int32);
        assert_eq!(s.atleast_1d().unwrap().shape(), &[1]);
        assert_eq!(s.atleast_3d().unwrap().shape(), &[1, 1, 1]);
        let v = masked_array![1, X, 3];
        assert_eq!(v.atleast_2d().unwrap().shape(), &[1, 3]);
        let v3 = v.atleast_3d().unwrap();
        assert_eq!(v3.shape(), &[1, 3, 1]);
        assert_eq!(mask(&v3), mask(&v));
        let m = masked_array![[1, 2]];
        assert_eq!(m.atleast_3d().unwrap().shape(), &[1, 2, 1]);
        assert_eq!(m.atleast_1d().unwrap(), m);
    }

    #[test]
    fn stacks() {
        let a = masked_array![1, X];
        let b = masked_array![3, 4];
        let v = vstack(&[Operand::from(&a), Operand::from(&b)]).unwrap();
        assert_eq!(v.shape(), &[2, 2]);
        assert_eq!(mask(&v), vec![false, true, false, false]);

        let h = hstack(&[Operand::from(&a), Operand::from(&b)]).unwrap();
        assert_eq!(h.shape(), &[4]);
        let grid = masked_array![[1], [X]];
        let h = hstack(&[Operand::from(&grid), Operand::from(&masked_array![[5, 6], [7, 8]])]).unwrap();
        assert_eq!(h.shape(), &[2, 3]);
        assert_eq!(mask(&h), vec![false, false, false, true, false, false]);

        let c = column_stack(&[Operand::from(&a), Operand::from(&b)]).unwrap();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(ints(&c)[..1], [1]);
        assert_eq!(mask(&c), vec![false, false, true, false]);
        assert!(vstack(&[]).is_err());
    }

    #[test]
    fn splits() {
        let a = masked_array![1, X, 3, 4, 5, X];
        let parts = a.split(&Sections::Count(3), 0).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(mask(&parts[0]), vec![false, true]);
        assert_eq!(mask(&parts[2]), vec![false, true]);
        assert!(a.split(&Sections::Count(4), 0).is_err());

        let uneven = a.array_split(&Sections::Count(4), 0).unwrap();
        let lens: Vec<usize> = uneven.iter().map(MaskedArray::len).collect();
        assert_eq!(lens, vec![2, 2, 1, 1]);

        let cut = a.split(&Sections::At(vec![2, -1, 9]), 0).unwrap();
        let lens: Vec<usize> = cut.iter().map(MaskedArray::len).collect();
        assert_eq!(lens, vec![2, 3, 1, 0]);
        assert_eq!(mask(&cut[2]), vec![true]);
        assert!(a.array_split(&Sections::Count(0), 0).is_err());

        let g = masked_array![[1, X], [3, 4]];
        let cols = g.split(&Sections::Count(2), -1).unwrap();
        assert_eq!(cols[1].shape(), &[2, 1]);
        assert_eq!(cols[1].mask(), &Mask::new(ndarray::arr2(&[[true], [false]]).into_dyn()));
    }

    #[test]
    fn grids() {
        let x = masked_array![1, X, 3];
        let y = masked_array![10, 20];
        let xy = meshgrid(&[Operand::from(&x), Operand::from(&y)], Indexing::Xy).unwrap();
        assert_eq!(xy[0].shape(), &[2, 3]);
        assert_eq!(mask(&xy[0]), vec![false, true, false, false, true, false]);
        assert_eq!(ints(&xy[1]), vec![10, 10, 10, 20, 20, 20]);
        assert!(xy[0].is_writeable());

        let ij = meshgrid(&[Operand::from(&x), Operand::from(&y)], Indexing::Ij).unwrap();
        assert_eq!(ij[0].shape(), &[3, 2]);
        assert_eq!(mask(&ij[0]), vec![false, false, true, true, false, false]);
    }

    #[test]
    fn blocks() {
        let a = masked_array![[1, X], [3, 4]];
        let b = masked_array![[5], [6]];
        let row = Operand::List(vec![Operand::from(&a), Operand::from(&b)]);
        let r = block(&row).unwrap();
        assert_eq!(r.shape(), &[2, 3]);
        assert_eq!(mask(&r), vec![false, true, false, false, false, false]);

        let c = masked_array![[X, 8, 9]];
        let nested = Operand::List(vec![row, Operand::List(vec![Operand::from(&c)])]);
        let r = block(&nested).unwrap();
        assert_eq!(r.shape(), &[3, 3]);
        assert_eq!(r.count_masked(), 2);

        let x3 = masked_array![X, 3];
        let flat = Operand::List(vec![Operand::from(1), Operand::from(&x3)]);
        let r = block(&flat).unwrap();
        assert_eq!(r.shape(), &[3]);
        assert_eq!(mask(&r), vec![false, true, false]);

        let ragged = Operand::List(vec![Operand::List(vec![Operand::from(&a)]), Operand::from(&b)]);
        assert!(block(&ragged).is_err());
        assert!(block(&Operand::List(vec![])).is_err());
    }
}
