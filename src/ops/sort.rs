/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Sorting, searching and set operations. Masked cells order after every unmasked cell.

use super::along;
use ndarray::Dimension;
use crate::array::{normalize_axis, on_array, on_pair};
use crate::dispatch::{coerce, Operand, Side};
use crate::error::{Error, Result};
use crate::fill::min_filler;
use crate::kernel::{self, UFunc};
use crate::{CellArray, Element, Mask, MaskedArray, MinMax};
use ndarray::{Array1, ArrayD, ArrayView1, Axis, IxDyn, Slice, Zip};
use std::cmp::Ordering;

fn sort_lanes<T: Element>(a: &mut ArrayD<T>, axis: usize) {
    for mut lane in a.lanes_mut(Axis(axis)) {
        let mut v = lane.to_vec();
        v.sort_by(|x, y| x.sort_cmp(y));
        lane.assign(&ArrayView1::from(&v[..]));
    }
}

/// Positions `0..n` along every lane of `axis`.
fn lane_positions(shape: &[usize], axis: usize) -> ArrayD<usize> {
    ArrayD::from_shape_fn(IxDyn(shape), |ix| ix[axis])
}

/// Stable re-sort of the positions in `order` by `(mask, value)`.
fn resort<T: Element>(order: &mut ArrayD<usize>, values: &ArrayD<T>, mask: &ArrayD<bool>, axis: usize) {
    Zip::from(order.lanes_mut(Axis(axis)))
        .and(values.lanes(Axis(axis)))
        .and(mask.lanes(Axis(axis)))
        .for_each(|mut o, v, m| {
            let mut cur = o.to_vec();
            cur.sort_by(|&i, &j| m[i].cmp(&m[j]).then_with(|| v[i].sort_cmp(&v[j])));
            o.assign(&ArrayView1::from(&cur[..]));
        });
}

fn argsort_along(a: &MaskedArray, axis: usize) -> ArrayD<usize> {
    let mut order = lane_positions(a.shape(), axis);
    let filled = a.filled(MinMax::Min);
    on_array!(&filled, v => resort(&mut order, v, a.mask().as_array(), axis));
    order
}

fn check_kth(kth: &[usize], len: usize) -> Result<()> {
    match kth.iter().find(|&&k| k >= len) {
        Some(&k) => Err(Error::IndexOutOfBounds { index: k as isize, len }),
        None => Ok(()),
    }
}

/// Distinct cells of a flattened array, see [`MaskedArray::unique`].
#[derive(Debug, Clone, PartialEq)]
pub struct Unique {
    /// Sorted distinct values; masked cells collapse into one trailing masked entry.
    pub values: MaskedArray,
    /// Flat position of the first occurrence of each distinct value.
    pub index: CellArray,
    /// Position in `values` of every input cell.
    pub inverse: CellArray,
    /// Occurrences of each distinct value.
    pub counts: CellArray,
}

impl MaskedArray {
    /// Sort in place along `axis`.
    ///
    /// Masked cells move to the end of each lane and take the maximal value of the cell type.
    pub fn sort(&mut self, axis: isize) -> Result<()> {
        self.check_writeable()?;
        let ax = normalize_axis(axis, self.ndim())?;
        let mut data = self.filled(MinMax::Min);
        on_array!(&mut data, a => sort_lanes(a, ax));
        let mut mask = self.mask().as_array().clone();
        sort_lanes(&mut mask, ax);
        let (d, m) = self.parts_mut();
        *d = data;
        *m = Mask::new(mask);
        Ok(())
    }

    /// Sorted copy along `axis`; `None` sorts the flattened array.
    pub fn sorted(&self, axis: Option<isize>) -> Result<MaskedArray> {
        let (src, ax) = along(self, axis)?;
        let (data, mask) = src.into_owned().into_parts();
        let mut out = MaskedArray::from_parts(data, mask, self.flavor());
        out.sort(ax as isize)?;
        Ok(out)
    }

    /// Positions that sort each lane along `axis`, as `Int64`. The sort is stable.
    pub fn argsort(&self, axis: Option<isize>) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        Ok(argsort_along(&src, ax).mapv(|i| i as i64).into())
    }

    /// Copy in which the cells at `kth` positions along `axis` are in sorted position,
    /// with no larger cell before and no smaller cell after them.
    pub fn partition(&self, kth: &[usize], axis: Option<isize>) -> Result<MaskedArray> {
        let (src, ax) = along(self, axis)?;
        check_kth(kth, src.shape()[ax])?;
        src.sorted(Some(ax as isize))
    }

    /// Positions that partition each lane along `axis`; see [`Self::partition`].
    pub fn argpartition(&self, kth: &[usize], axis: Option<isize>) -> Result<CellArray> {
        let (src, ax) = along(self, axis)?;
        check_kth(kth, src.shape()[ax])?;
        Ok(argsort_along(&src, ax).mapv(|i| i as i64).into())
    }

    /// Positions of the unmasked, non-zero cells: one `Int64` array per dimension.
    pub fn nonzero(&self) -> Vec<CellArray> {
        let truth = self.filled(0).to_bool();
        let hits: Vec<_> = truth.indexed_iter().filter(|(_, t)| **t).map(|(ix, _)| ix).collect();
        (0..self.ndim())
            .map(|d| hits.iter().map(|ix| ix[d] as i64).collect::<Vec<_>>().into())
            .collect()
    }

    /// Indices of the unmasked nonzero cells, one row per hit, shaped `[hits, ndim]`.
    pub fn argwhere(&self) -> Result<CellArray> {
        let truth = self.filled(0).to_bool();
        let rows: Vec<i64> = truth
            .indexed_iter()
            .filter(|(_, t)| **t)
            .flat_map(|(ix, _)| ix.slice().iter().map(|&i| i as i64).collect::<Vec<_>>())
            .collect();
        let ndim = self.ndim();
        let hits = if ndim == 0 { truth.iter().filter(|t| **t).count() } else { rows.len() / ndim };
        CellArray::from_vec(&[hits, ndim], rows)
    }

    /// Flat indices of the unmasked nonzero cells.
    pub fn flatnonzero(&self) -> CellArray {
        let truth = self.filled(0).to_bool();
        let hits: Vec<i64> = truth.iter().enumerate().filter(|(_, t)| **t).map(|(i, _)| i as i64).collect();
        hits.into()
    }

    /// Distinct values of the flattened array along with first positions, inverse and counts.
    pub fn unique(&self) -> Unique {
        let flat = self.ravel();
        let perm: Vec<usize> = argsort_along(&flat, 0).iter().copied().collect();
        let mask: Vec<bool> = flat.mask().iter().collect();
        let filled = flat.filled(MinMax::Min);
        let starts: Vec<bool> = on_array!(&filled, a => {
            let values: Vec<_> = a.iter().copied().collect();
            perm.iter()
                .enumerate()
                .map(|(k, &i)| {
                    let Some(&p) = k.checked_sub(1).and_then(|k| perm.get(k)) else {
                        return true;
                    };
                    match (mask[p], mask[i]) {
                        (false, false) => values[p].sort_cmp(&values[i]) != Ordering::Equal,
                        (false, true) => true,
                        (true, _) => false,
                    }
                })
                .collect()
        });

        let firsts: Vec<usize> = (0..perm.len()).filter(|&k| starts[k]).collect();
        let picked: Vec<usize> = firsts.iter().map(|&k| perm[k]).collect();
        let positions = Array1::from(picked.clone()).into_dyn();
        let values = MaskedArray::from_parts(
            flat.data().gather(&positions),
            Mask::from_vec(picked.iter().map(|&i| mask[i]).collect()),
            self.flavor(),
        );

        let mut inverse = vec![0i64; perm.len()];
        let mut group = -1i64;
        for (k, &i) in perm.iter().enumerate() {
            if starts[k] {
                group += 1;
            }
            inverse[i] = group;
        }
        let counts: Vec<i64> = firsts
            .iter()
            .zip(firsts.iter().skip(1).chain(std::iter::once(&perm.len())))
            .map(|(a, b)| (b - a) as i64)
            .collect();

        Unique {
            values,
            index: picked.into_iter().map(|i| i as i64).collect::<Vec<_>>().into(),
            inverse: inverse.into(),
            counts: counts.into(),
        }
    }
}

/// Indirect stable sort by several keys along the last axis; the last key is the primary one.
///
/// Within each key the mask is more significant than the value, so masked cells order last.
pub fn lexsort(keys: &[&MaskedArray]) -> Result<CellArray> {
    let Some(first) = keys.first() else {
        return Err(Error::invalid("need sequence of keys with len > 0 in lexsort"));
    };
    let shape = first.shape().to_vec();
    if keys.iter().any(|k| k.shape() != shape.as_slice()) {
        return Err(Error::Shape("all keys need to be the same shape".into()));
    }
    let ax = normalize_axis(-1, shape.len())?;
    let mut order = lane_positions(&shape, ax);
    for key in keys {
        let filled = key.filled(MinMax::Min);
        on_array!(&filled, v => resort(&mut order, v, key.mask().as_array(), ax));
    }
    Ok(order.mapv(|i| i as i64).into())
}

/// Positions at which the cells of `v` would be inserted into the sorted 1-d `a`.
///
/// With [`Side::Left`] a masked query lands at the start of the masked tail of `a`.
/// With [`Side::Right`] the same holds for unmasked queries equal to the maximal value
/// of their cell type, which would otherwise sort among the masked tail.
pub fn searchsorted<'a, 'v>(
    a: impl Into<Operand<'a>>,
    v: impl Into<Operand<'v>>,
    side: Side,
) -> Result<CellArray> {
    let arrays = coerce(&[a.into(), v.into()])?;
    let (a, v) = (&arrays[0], &arrays[1]);
    if a.ndim() != 1 {
        return Err(Error::invalid("searchsorted needs a 1-d array"));
    }
    let unmasked = a.count() as i64;
    let ct = a.dtype().union(v.dtype());
    let haystack = a.filled(MinMax::Min).astype(ct);
    let queries = v.filled(MinMax::Min).astype(ct);
    let found: ArrayD<i64> = on_pair!(&haystack, &queries, (h, q) => {
        let sorted: Vec<_> = h.iter().copied().collect();
        q.mapv(|x| {
            let at = match side {
                Side::Left => sorted.partition_point(|s| s.sort_cmp(&x) == Ordering::Less),
                Side::Right => sorted.partition_point(|s| s.sort_cmp(&x) != Ordering::Greater),
            };
            at as i64
        })
    });
    let top = kernel::binary(UFunc::Equal, &queries, &CellArray::from_value(min_filler(ct)))?.to_bool();
    let fixed = Zip::from(&found)
        .and(v.mask().as_array())
        .and(&top)
        .map_collect(|&i, &m, &top| match side {
            Side::Left if m => unmasked,
            Side::Right if top && !m => unmasked,
            _ => i,
        });
    Ok(fixed.into())
}

/// Index of the bin of `bins` each cell of `x` falls into.
///
/// `bins` must be unmasked and monotonic. `right` closes the bins on the right.
pub fn digitize<'a>(x: impl Into<Operand<'a>>, bins: impl Into<Operand<'a>>, right: bool) -> Result<CellArray> {
    let bins = bins.into();
    if bins.is_masked_type() {
        return Err(Error::invalid("bins should not be masked. Use .filled() first"));
    }
    let bins = bins.to_plain("bins")?;
    if bins.ndim() != 1 {
        return Err(Error::invalid("bins must be one-dimensional"));
    }
    let values: Vec<f64> = bins.cast_to::<f64>().iter().copied().collect();
    let pairs = || values.windows(2).map(|w| w[0].sort_cmp(&w[1]));
    let increasing = pairs().all(|o| o != Ordering::Greater);
    let decreasing = pairs().all(|o| o != Ordering::Less);
    let side = if right { Side::Left } else { Side::Right };
    match (increasing, decreasing) {
        (true, _) => searchsorted(&bins, x, side),
        (false, true) => {
            let n = bins.len() as i64;
            let reversed: CellArray =
                on_array!(&bins, b => CellArray::from(b.slice_axis(Axis(0), Slice::new(0, None, -1)).to_owned()));
            let found = searchsorted(&reversed, x, side)?;
            Ok(found.cast_to::<i64>().mapv(|i| n - i).into())
        }
        (false, false) => Err(Error::invalid("bins must be monotonically increasing or decreasing")),
    }
}
