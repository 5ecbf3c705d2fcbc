/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Moments, quantiles and histogramming over the unmasked cells.

use super::{along, binary, reduced, unary};
use crate::array::normalize_axis;
use crate::dispatch::{Operand, QuantileMethod};
use crate::error::{Error, Result};
use crate::kernel::{self, UFunc};
use crate::{flavor, CellArray, CellType, CellValue, Element, Fill, Mask, Masked, MaskedArray};
use ndarray::{concatenate, Array2, ArrayD, Axis, Zip};
use num_traits::ToPrimitive;

/// Cell type of means and moments: floats keep their width, everything else is `Float64`.
fn mean_type(ct: CellType) -> CellType {
    if ct.is_float() {
        ct
    } else {
        CellType::Float64
    }
}

/// Unmasked values of each lane along `axis`, as `f64`.
fn kept_lanes(src: &MaskedArray, axis: usize) -> ArrayD<Vec<f64>> {
    let values = src.data().cast_to::<f64>();
    Zip::from(values.lanes(Axis(axis)))
        .and(src.mask().as_array().lanes(Axis(axis)))
        .map_collect(|v, m| {
            v.iter()
                .zip(m.iter())
                .filter(|(_, m)| !**m)
                .map(|(v, _)| *v)
                .collect()
        })
}

/// Pair per-lane statistics with a mask that is set where there was none.
fn from_lanes(
    a: &MaskedArray,
    r: ArrayD<Option<f64>>,
    ct: CellType,
    axis: Option<isize>,
    keepdims: bool,
) -> Result<Masked> {
    let mask = r.mapv(|v| v.is_none());
    let data = CellArray::from(r.mapv(|v| v.unwrap_or_default())).astype(ct);
    reduced(a, data, mask, axis, keepdims)
}

fn variance(values: &[f64], ddof: usize) -> Option<f64> {
    let n = values.len();
    if n <= ddof {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(squares / (n - ddof) as f64)
}

/// Quantile `q` of the ascending `sorted` samples.
fn pick_quantile(sorted: &[f64], q: f64, method: QuantileMethod) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let idx = q * last as f64;
    let (lo, hi) = (idx.floor() as usize, idx.ceil() as usize);
    if lo == hi {
        return Some(sorted[lo]);
    }
    Some(match method {
        QuantileMethod::Linear => sorted[lo] + (sorted[hi] - sorted[lo]) * (idx - lo as f64),
        QuantileMethod::Lower => sorted[lo],
        QuantileMethod::Higher => sorted[hi],
        QuantileMethod::Midpoint => (sorted[lo] + sorted[hi]) / 2.0,
        QuantileMethod::Nearest => sorted[idx.round_ties_even() as usize],
    })
}

fn check_quantiles(qs: &[f64]) -> Result<()> {
    if qs.is_empty() {
        return Err(Error::invalid("at least one quantile is required"));
    }
    if qs.iter().any(|q| !(0.0..=1.0).contains(q)) {
        return Err(Error::invalid("Quantiles must be in the range [0, 1]"));
    }
    Ok(())
}

fn check_percentiles(ps: &[f64]) -> Result<Vec<f64>> {
    if ps.iter().any(|p| !(0.0..=100.0).contains(p)) {
        return Err(Error::invalid("Percentiles must be in the range [0, 100]"));
    }
    Ok(ps.iter().map(|p| p / 100.0).collect())
}

impl MaskedArray {
    /// Arithmetic mean of the unmasked cells.
    ///
    /// Lanes without any unmasked cell are masked in the result.
    pub fn mean(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        let (src, ax) = along(self, axis)?;
        let ct = mean_type(self.dtype());
        let counts = src
            .mask()
            .as_array()
            .map_axis(Axis(ax), |lane| lane.iter().filter(|m| !**m).count());
        let sums = kernel::reduce(UFunc::Add, &src.filled(Fill::Default).astype(ct), ax)?;
        let divisor = CellArray::from(counts.mapv(|n| n.max(1) as f64)).astype(ct);
        let data = kernel::binary(UFunc::TrueDivide, &sums, &divisor)?;
        reduced(self, data, counts.mapv(|n| n == 0), axis, keepdims)
    }

    /// Variance with `ddof` delta degrees of freedom, computed in two passes.
    ///
    /// Lanes with no more than `ddof` unmasked cells are masked.
    pub fn var(&self, axis: Option<isize>, ddof: usize, keepdims: bool) -> Result<Masked> {
        let (src, ax) = along(self, axis)?;
        let r = kept_lanes(&src, ax).map(|v| variance(v, ddof));
        from_lanes(self, r, mean_type(self.dtype()), axis, keepdims)
    }

    pub fn std(&self, axis: Option<isize>, ddof: usize, keepdims: bool) -> Result<Masked> {
        let var = self.var(axis, ddof, keepdims)?.into_array();
        Ok(Masked::from_array(unary(UFunc::Sqrt, &var)?))
    }

    /// Weighted average along `axis`; `None` weights give the plain mean.
    ///
    /// The weights are masked wherever `self` is. Weights of a different shape must be
    /// 1-d, as long as `axis`. With `returned`, the sum of the weights comes second.
    pub fn average(
        &self,
        weights: Option<&CellArray>,
        axis: Option<isize>,
        returned: bool,
    ) -> Result<(Masked, Option<Masked>)> {
        let Some(w) = weights else {
            let avg = self.mean(axis, false)?;
            if !returned {
                return Ok((avg, None));
            }
            let n = match axis {
                None => CellArray::from_value(CellValue::Int64(self.count() as i64)),
                Some(ax) => self.count_axis(ax, false)?,
            };
            let n = MaskedArray::from_data(n.astype(mean_type(self.dtype()))).with_flavor(self.flavor());
            return Ok((avg, Some(Masked::from_array(n))));
        };

        let ct = self.dtype().union(w.cell_type());
        let ct = if ct.is_float() { ct } else { ct.union(CellType::Float64) };
        let w = if w.shape() == self.shape() {
            w.clone()
        } else {
            let Some(ax) = axis else {
                return Err(Error::invalid("Axis must be specified when shapes of a and weights differ."));
            };
            if w.ndim() != 1 {
                return Err(Error::invalid("1D weights expected when shapes of a and weights differ."));
            }
            let ax = normalize_axis(ax, self.ndim())?;
            if w.len() != self.shape()[ax] {
                return Err(Error::invalid("Length of weights not compatible with specified axis."));
            }
            let mut shape = vec![1; self.ndim()];
            shape[ax] = w.len();
            w.reshape(&shape)?.broadcast_to(self.shape())?
        };
        let w = MaskedArray::from_parts(w.astype(ct), self.mask().clone(), self.flavor());
        let total = w.sum(axis, false)?.into_array();
        if total.compressed().any(|s| !s.is_truthy()) {
            return Err(Error::invalid("Weights sum to zero, can't be normalized"));
        }
        let weighted = binary(UFunc::Multiply, &self.astype(ct), &w)?;
        let avg = binary(UFunc::TrueDivide, &weighted.sum(axis, false)?.into_array(), &total)?;
        Ok((Masked::from_array(avg), returned.then(|| Masked::from_array(total))))
    }

    /// Quantile `q` in `[0, 1]` of the unmasked cells, as `Float64`.
    ///
    /// Lanes without any unmasked cell are masked.
    pub fn quantile(
        &self,
        q: f64,
        axis: Option<isize>,
        method: QuantileMethod,
        keepdims: bool,
    ) -> Result<Masked> {
        check_quantiles(&[q])?;
        let (src, ax) = along(self, axis)?;
        let mut lanes = kept_lanes(&src, ax);
        lanes.map_inplace(|v| v.sort_by(|a, b| a.sort_cmp(b)));
        let r = lanes.map(|v| pick_quantile(v, q, method));
        from_lanes(self, r, CellType::Float64, axis, keepdims)
    }

    /// Several quantiles at once, stacked along a new leading axis.
    pub fn quantiles(
        &self,
        qs: &[f64],
        axis: Option<isize>,
        method: QuantileMethod,
        keepdims: bool,
    ) -> Result<MaskedArray> {
        check_quantiles(qs)?;
        let (src, ax) = along(self, axis)?;
        let mut lanes = kept_lanes(&src, ax);
        lanes.map_inplace(|v| v.sort_by(|a, b| a.sort_cmp(b)));
        let parts = qs
            .iter()
            .map(|&q| {
                let r = lanes.map(|v| pick_quantile(v, q, method));
                Ok(from_lanes(self, r, CellType::Float64, axis, keepdims)?.into_array())
            })
            .collect::<Result<Vec<_>>>()?;
        let data = CellArray::stack(0, &parts.iter().map(|p| p.data().clone()).collect::<Vec<_>>())?;
        let masks: Vec<_> = parts.iter().map(|p| p.mask().view()).collect();
        let mask = ndarray::stack(Axis(0), &masks)?;
        Ok(MaskedArray::from_parts(data, Mask::new(mask), self.flavor()))
    }

    /// Percentile `p` in `[0, 100]`; see [`Self::quantile`].
    pub fn percentile(
        &self,
        p: f64,
        axis: Option<isize>,
        method: QuantileMethod,
        keepdims: bool,
    ) -> Result<Masked> {
        let q = check_percentiles(&[p])?;
        self.quantile(q[0], axis, method, keepdims)
    }

    pub fn percentiles(
        &self,
        ps: &[f64],
        axis: Option<isize>,
        method: QuantileMethod,
        keepdims: bool,
    ) -> Result<MaskedArray> {
        self.quantiles(&check_percentiles(ps)?, axis, method, keepdims)
    }

    pub fn median(&self, axis: Option<isize>, keepdims: bool) -> Result<Masked> {
        self.quantile(0.5, axis, QuantileMethod::Midpoint, keepdims)
    }

    /// Counts of the unmasked cells in `bins` equal-width bins over `range`, and the bin edges.
    ///
    /// `range` defaults to the extent of the unmasked cells. Weighted counts are `Float64`,
    /// plain counts `Int64`.
    pub fn histogram(
        &self,
        bins: usize,
        range: Option<(f64, f64)>,
        weights: Option<&CellArray>,
    ) -> Result<(CellArray, CellArray)> {
        if bins == 0 {
            return Err(Error::invalid("`bins` must be positive, when an integer"));
        }
        if let Some(w) = weights {
            if w.shape() != self.shape() {
                return Err(Error::invalid("weights should have the same shape as a."));
            }
        }
        let keep: Vec<bool> = self.mask().iter().map(|m| !m).collect();
        let values: Vec<f64> = self.data().cast_to::<f64>().iter().copied().collect();
        let weights: Option<Vec<f64>> = weights.map(|w| w.cast_to::<f64>().iter().copied().collect());
        let kept = values.iter().zip(&keep).filter(|(_, k)| **k).map(|(v, _)| *v);

        let (lo, hi) = match range {
            Some((lo, hi)) if lo > hi => {
                return Err(Error::invalid("max must be larger than min in range parameter."))
            }
            Some(r) => r,
            None if kept.clone().any(f64::is_nan) => (f64::NAN, f64::NAN),
            None => kept
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
                .unwrap_or((0.0, 1.0)),
        };
        if !lo.is_finite() || !hi.is_finite() {
            return Err(Error::invalid(format!("autodetected range of [{lo}, {hi}] is not finite")));
        }
        let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
        let width = hi - lo;
        let mut edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64 / bins as f64).collect();
        edges[bins] = hi;

        let mut counts = vec![0.0; bins];
        for (i, v) in values.iter().enumerate() {
            if !keep[i] || !v.is_finite() || *v < lo || *v > hi {
                continue;
            }
            let k = (((v - lo) / width * bins as f64) as usize).min(bins - 1);
            counts[k] += weights.as_ref().map_or(1.0, |w| w[i]);
        }
        let counts = match weights {
            Some(_) => CellArray::from(counts),
            None => CellArray::from(counts.into_iter().map(|c| c as i64).collect::<Vec<_>>()),
        };
        Ok((counts, CellArray::from(edges)))
    }

    /// Occurrences of each non-negative integer among the unmasked cells of a 1-d array.
    pub fn bincount(&self, weights: Option<&CellArray>, minlength: usize) -> Result<CellArray> {
        if self.ndim() != 1 {
            return Err(Error::invalid("bincount needs a 1-d array"));
        }
        let idx = self.data().to_indices()?;
        let weights = match weights {
            Some(w) if w.shape() != self.shape() => {
                return Err(Error::invalid("The weights and list don't have the same length."))
            }
            Some(w) => Some(w.cast_to::<f64>().iter().copied().collect::<Vec<_>>()),
            None => None,
        };
        let kept: Vec<(usize, isize)> = idx
            .iter()
            .zip(self.mask().iter())
            .enumerate()
            .filter(|(_, (_, m))| !m)
            .map(|(i, (v, _))| (i, *v))
            .collect();
        if kept.iter().any(|(_, v)| *v < 0) {
            return Err(Error::invalid("'list' argument must have no negative elements"));
        }
        let len = kept
            .iter()
            .map(|(_, v)| *v as usize + 1)
            .max()
            .unwrap_or(0)
            .max(minlength);
        match weights {
            Some(w) => {
                let mut out = vec![0.0; len];
                for (i, v) in kept {
                    out[v as usize] += w[i];
                }
                Ok(out.into())
            }
            None => {
                let mut out = vec![0i64; len];
                for (_, v) in kept {
                    out[v as usize] += 1;
                }
                Ok(out.into())
            }
        }
    }
}

/// Value and mask of an `interp` boundary. The sentinel gives a masked bound.
fn interp_bound(bound: Option<Operand<'_>>, default: (f64, bool)) -> Result<(f64, bool)> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    let m = bound.to_masked(Some(CellType::Float64))?;
    if m.len() != 1 {
        return Err(Error::invalid("interp bounds must be scalars"));
    }
    let masked = m.mask().iter().next().unwrap_or(true);
    let value = m.filled(0.0).first().and_then(|v| v.to_f64()).unwrap_or_default();
    Ok((value, masked))
}

/// One-dimensional piecewise linear interpolation of the samples `(xp, fp)` at `x`.
///
/// `xp` must be increasing and unmasked. A result is masked where `x` is, or where
/// a sample point it is interpolated from is masked. `left` and `right` stand in
/// below and above the sample range and default to the first and last samples.
pub fn interp<'a>(
    x: impl Into<Operand<'a>>,
    xp: impl Into<Operand<'a>>,
    fp: impl Into<Operand<'a>>,
    left: Option<Operand<'a>>,
    right: Option<Operand<'a>>,
) -> Result<MaskedArray> {
    let (x, xp, fp) = (x.into(), xp.into(), fp.into());
    let flavor = flavor::resolve(&[x.clone(), fp.clone()])?;
    let x = x.to_masked(Some(CellType::Float64))?;
    let xp = xp.to_plain("xp")?;
    let fp = fp.to_masked(Some(CellType::Float64))?;
    if xp.ndim() != 1 || fp.ndim() != 1 {
        return Err(Error::invalid("xp and fp must be 1-d sequences"));
    }
    if xp.len() != fp.len() {
        return Err(Error::invalid("fp and xp are not of the same length."));
    }
    if xp.is_empty() {
        return Err(Error::invalid("array of sample points is empty"));
    }
    let xs: Vec<f64> = xp.cast_to::<f64>().iter().copied().collect();
    let ys: Vec<f64> = fp.filled(0.0).cast_to::<f64>().iter().copied().collect();
    let ms: Vec<bool> = fp.mask().iter().collect();
    let last = xs.len() - 1;
    let left = interp_bound(left, (ys[0], ms[0]))?;
    let right = interp_bound(right, (ys[last], ms[last]))?;

    let at = |v: f64| -> (f64, bool) {
        if v.is_nan() {
            return (f64::NAN, false);
        }
        if v < xs[0] {
            return left;
        }
        if v > xs[last] {
            return right;
        }
        let j = xs.partition_point(|p| *p <= v).saturating_sub(1);
        if xs[j] == v || j == last {
            return (ys[j], ms[j]);
        }
        let slope = (ys[j + 1] - ys[j]) / (xs[j + 1] - xs[j]);
        (ys[j] + slope * (v - xs[j]), ms[j] || ms[j + 1])
    };
    let values = x.data().cast_to::<f64>();
    let r = values.mapv(at);
    let data = CellArray::from(r.mapv(|(v, _)| v));
    let mask = Zip::from(&r)
        .and(x.mask().as_array())
        .map_collect(|(_, m), xm| *m || *xm);
    Ok(MaskedArray::from_parts(data, Mask::new(mask), flavor))
}

/// Variables in rows and observations in columns, as `f64` values and their validity.
fn observations(a: &MaskedArray, rowvar: bool) -> Result<(Array2<f64>, Array2<bool>)> {
    let shape = match a.shape() {
        [] => (1, 1),
        [n] => (1, *n),
        [r, c] => (*r, *c),
        _ => return Err(Error::invalid("m has more than 2 dimensions")),
    };
    let values = Array2::from_shape_vec(shape, a.data().cast_to::<f64>().iter().copied().collect())?;
    let valid = Array2::from_shape_vec(shape, a.mask().iter().map(|m| !m).collect())?;
    if !rowvar && shape.0 != 1 {
        Ok((values.reversed_axes(), valid.reversed_axes()))
    } else {
        Ok((values, valid))
    }
}

/// One non-negative weight per observation.
fn observation_weights(w: Option<&CellArray>, n: usize, name: &str) -> Result<Option<Vec<f64>>> {
    let Some(w) = w else {
        return Ok(None);
    };
    if w.ndim() > 1 {
        return Err(Error::invalid(format!("cannot handle multidimensional {name}")));
    }
    let w: Vec<f64> = w.cast_to::<f64>().iter().copied().collect();
    if w.len() != n {
        return Err(Error::invalid(format!("incompatible numbers of samples and {name}")));
    }
    if w.iter().any(|v| *v < 0.0) {
        return Err(Error::invalid(format!("{name} cannot be negative")));
    }
    Ok(Some(w))
}

/// Covariance of the variables in the rows of `m`, followed by those of `y`.
///
/// Every row is centered on the weighted mean of its unmasked cells. An entry sums over
/// the observations where both variables are unmasked and is normalized by their weight,
/// less `ddof`. Entries without such observations, or without positive degrees of
/// freedom, are masked. `ddof` defaults to 0 with `bias`, to 1 otherwise. The result is
/// `Float64` with length-one axes squeezed out.
pub fn cov(
    m: &MaskedArray,
    y: Option<&MaskedArray>,
    rowvar: bool,
    ddof: Option<usize>,
    bias: bool,
    fweights: Option<&CellArray>,
    aweights: Option<&CellArray>,
) -> Result<Masked> {
    let (mut x, mut valid) = observations(m, rowvar)?;
    let mut flavor = m.flavor();
    if let Some(y) = y {
        let (yx, yv) = observations(y, rowvar)?;
        if yx.ncols() != x.ncols() {
            return Err(Error::Shape(format!(
                "m has {} observations, y has {}",
                x.ncols(),
                yx.ncols()
            )));
        }
        x = concatenate(Axis(0), &[x.view(), yx.view()])?;
        valid = concatenate(Axis(0), &[valid.view(), yv.view()])?;
        flavor = flavor.most_derived(y.flavor())?;
    }
    let (vars, n) = x.dim();
    if vars == 0 {
        let empty =
            MaskedArray::from_parts(CellArray::zeros(&[0, 0], CellType::Float64), Mask::fill(&[0, 0], false), flavor);
        return Ok(Masked::from_array(empty));
    }
    let ddof = ddof.unwrap_or(if bias { 0 } else { 1 }) as f64;
    let fw = observation_weights(fweights, n, "fweights")?;
    if fw.as_ref().is_some_and(|f| f.iter().any(|v| v.fract() != 0.0)) {
        return Err(Error::invalid("fweights must be integer"));
    }
    let aw = observation_weights(aweights, n, "aweights")?;
    let w: Vec<f64> = (0..n)
        .map(|k| fw.as_ref().map_or(1.0, |f| f[k]) * aw.as_ref().map_or(1.0, |a| a[k]))
        .collect();

    for i in 0..vars {
        let (sum, total) = (0..n)
            .filter(|&k| valid[[i, k]])
            .fold((0.0, 0.0), |(s, t), k| (s + w[k] * x[[i, k]], t + w[k]));
        if total == 0.0 {
            valid.row_mut(i).fill(false);
            continue;
        }
        let mean = sum / total;
        x.row_mut(i).mapv_inplace(|v| v - mean);
    }

    let mut data = Array2::<f64>::zeros((vars, vars));
    let mut mask = Array2::from_elem((vars, vars), true);
    let mut starved = false;
    for i in 0..vars {
        for j in 0..vars {
            let joint: Vec<usize> = (0..n).filter(|&k| valid[[i, k]] && valid[[j, k]]).collect();
            if joint.is_empty() {
                continue;
            }
            let c: f64 = joint.iter().map(|&k| w[k] * x[[i, k]] * x[[j, k]]).sum();
            let w_sum: f64 = joint.iter().map(|&k| w[k]).sum();
            let fact = match &aw {
                _ if ddof == 0.0 => w_sum,
                None => w_sum - ddof,
                Some(a) => w_sum - ddof * joint.iter().map(|&k| w[k] * a[k]).sum::<f64>() / w_sum,
            };
            if fact <= 0.0 {
                starved = true;
                continue;
            }
            data[[i, j]] = c / fact;
            mask[[i, j]] = false;
        }
    }
    if starved {
        log::warn!("Degrees of freedom <= 0 for slice");
    }
    let c = MaskedArray::from_parts(CellArray::from(data.into_dyn()), Mask::new(mask.into_dyn()), flavor);
    Ok(Masked::from_array(c.squeeze(None)?))
}

/// Pearson correlation coefficients, from [`cov`] scaled by the standard deviations.
///
/// An entry is masked where its covariance or either variance is. Values are clipped
/// to `[-1, 1]`.
pub fn corrcoef(x: &MaskedArray, y: Option<&MaskedArray>, rowvar: bool) -> Result<Masked> {
    let c = cov(x, y, rowvar, None, false, None, None)?.into_array();
    if c.ndim() == 0 {
        return Ok(Masked::from_array(binary(UFunc::TrueDivide, &c, &c)?));
    }
    let values = c.data().cast_to::<f64>();
    let masked = c.mask().as_array();
    let data = ArrayD::from_shape_fn(values.raw_dim(), |ix| {
        let at = |r: usize, c: usize| values[&[r, c][..]];
        let (i, j) = (ix[0], ix[1]);
        (at(i, j) / (at(i, i).sqrt() * at(j, j).sqrt())).clamp(-1.0, 1.0)
    });
    let mask = ArrayD::from_shape_fn(values.raw_dim(), |ix| {
        let at = |r: usize, c: usize| masked[&[r, c][..]];
        let (i, j) = (ix[0], ix[1]);
        at(i, j) || at(i, i) || at(j, j)
    });
    Ok(Masked::from_array(MaskedArray::from_parts(CellArray::from(data), Mask::new(mask), c.flavor())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, MaskedScalar, X};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn means() {
        let a = masked_array![[1, X, 3], [X, X, X]];
        let m = a.mean(Some(1), false).unwrap().into_array();
        assert_eq!(m.dtype(), CellType::Float64);
        assert_eq!(m.mask(), &Mask::from_vec(vec![false, true]));
        assert_eq!(m.data().get(&[0]), Some(CellValue::Float64(2.0)));
        let all = a.mean(None, false).unwrap().into_scalar().unwrap();
        assert_eq!(all, MaskedScalar::new(2.0, false));
        let f = masked_array![1.5f32, X, 2.5f32];
        assert_eq!(f.mean(None, true).unwrap().into_array().dtype(), CellType::Float32);
    }

    #[test]
    fn fully_masked_mean() {
        let a = MaskedArray::new(CellArray::from(vec![1, 2]), Mask::fill(&[], true)).unwrap();
        let m = a.mean(None, false).unwrap().into_scalar().unwrap();
        assert!(m.is_masked());
    }

    #[test]
    fn moments() {
        let a = masked_array![2.0, 4.0, X, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let v = a.var(None, 0, false).unwrap().into_scalar().unwrap();
        assert_eq!(v.value(), Some(CellValue::Float64(4.0)));
        let s = a.std(None, 0, false).unwrap().into_scalar().unwrap();
        assert_eq!(s.value(), Some(CellValue::Float64(2.0)));

        let one = masked_array![[3, X], [1, 2]];
        let v = one.var(Some(1), 1, false).unwrap().into_array();
        assert_eq!(v.mask(), &Mask::from_vec(vec![true, false]));
        assert_eq!(v.data().get(&[1]), Some(CellValue::Float64(0.5)));
    }

    #[test]
    fn weighted() {
        let a = masked_array![[1.0, 2.0], [X, 4.0]];
        let w = CellArray::from(vec![3.0, 1.0]);
        let (avg, total) = a.average(Some(&w), Some(1), true).unwrap();
        let avg = avg.into_array();
        assert_eq!(avg.filled(0.0).to_vec::<f64>().unwrap(), vec![1.25, 4.0]);
        assert_eq!(total.unwrap().into_array().filled(0.0).to_vec::<f64>().unwrap(), vec![4.0, 1.0]);

        assert!(a.average(Some(&w), None, false).is_err());
        let zero = CellArray::from(vec![0.0, 0.0]);
        assert!(matches!(a.average(Some(&zero), Some(1), false), Err(Error::InvalidArgument(_))));

        let (plain, count) = masked_array![1, X, 5].average(None, None, true).unwrap();
        assert_eq!(plain.into_scalar().unwrap().value(), Some(CellValue::Float64(3.0)));
        assert_eq!(count.unwrap().into_scalar().unwrap().value(), Some(CellValue::Float64(2.0)));
    }

    #[test]
    fn quantiles() {
        let a = masked_array![4, X, 1, 3, 2];
        let med = a.median(None, false).unwrap().into_scalar().unwrap();
        assert_eq!(med.value(), Some(CellValue::Float64(2.5)));
        let q = a.quantile(0.25, None, QuantileMethod::Linear, false).unwrap().into_scalar().unwrap();
        assert!(close(q.filled(0.0).to_f64().unwrap(), 1.75));
        let lower = a.quantile(0.25, None, QuantileMethod::Lower, false).unwrap().into_scalar().unwrap();
        assert_eq!(lower.value(), Some(CellValue::Float64(1.0)));
        let p = a.percentile(100.0, None, QuantileMethod::Linear, false).unwrap().into_scalar().unwrap();
        assert_eq!(p.value(), Some(CellValue::Float64(4.0)));
        assert!(a.quantile(1.5, None, QuantileMethod::Linear, false).is_err());

        let g = masked_array![[1, 2, 3], [X, X, X]];
        let qs = g.quantiles(&[0.0, 1.0], Some(1), QuantileMethod::Nearest, false).unwrap();
        assert_eq!(qs.shape(), &[2, 2]);
        assert_eq!(qs.mask(), &Mask::new(ndarray::arr2(&[[false, true], [false, true]]).into_dyn()));
        assert_eq!(qs.data().get(&[1, 0]), Some(CellValue::Float64(3.0)));
    }

    #[test]
    fn histograms() {
        let a = masked_array![0.0, 0.5, X, 1.0, 2.0];
        let (counts, edges) = a.histogram(2, None, None).unwrap();
        assert_eq!(counts.to_vec::<i64>().unwrap(), vec![2, 2]);
        assert_eq!(edges.to_vec::<f64>().unwrap(), vec![0.0, 1.0, 2.0]);
        let (counts, _) = a.histogram(4, Some((0.0, 1.0)), None).unwrap();
        assert_eq!(counts.to_vec::<i64>().unwrap(), vec![1, 0, 1, 1]);

        let w = CellArray::from(vec![1.0, 2.0, 100.0, 3.0, 4.0]);
        let (counts, _) = a.histogram(2, None, Some(&w)).unwrap();
        assert_eq!(counts.to_vec::<f64>().unwrap(), vec![3.0, 7.0]);
        assert!(a.histogram(0, None, None).is_err());
    }

    #[test]
    fn non_finite_histograms() {
        let a = MaskedArray::new(CellArray::from(vec![f64::NAN, 1.0, 2.0, 3.0]), vec![false; 4]).unwrap();
        let (counts, _) = a.histogram(2, Some((0.0, 4.0)), None).unwrap();
        assert_eq!(counts.to_vec::<i64>().unwrap(), vec![1, 2]);
        assert!(a.histogram(2, None, None).is_err());

        let hidden = MaskedArray::new(CellArray::from(vec![f64::NAN, 1.0, 3.0]), vec![true, false, false]).unwrap();
        let (counts, _) = hidden.histogram(2, None, None).unwrap();
        assert_eq!(counts.to_vec::<i64>().unwrap(), vec![1, 1]);
    }

    fn values(a: &MaskedArray) -> Vec<f64> {
        a.data().to_vec::<f64>().unwrap()
    }

    #[test]
    fn covariances() {
        let a = masked_array![[1.0, 2.0, 3.0, X], [1.0, X, 3.0, 5.0]];
        let c = cov(&a, None, true, None, false, None, None).unwrap().into_array();
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(values(&c), vec![1.0, 2.0, 2.0, 4.0]);
        assert_eq!(c.count_masked(), 0);

        let biased = cov(&a, None, true, None, true, None, None).unwrap().into_array();
        let b = values(&biased);
        assert!(close(b[0], 2.0 / 3.0) && close(b[1], 1.0) && close(b[3], 8.0 / 3.0));

        let cols = masked_array![[1.0, 1.0], [2.0, X], [3.0, 3.0]];
        let c = cov(&cols, None, false, None, false, None, None).unwrap().into_array();
        assert_eq!(values(&c), vec![1.0, 2.0, 2.0, 2.0]);

        let x = masked_array![1.0, 2.0, 3.0, X];
        let y = masked_array![2.0, 4.0, 6.0, 8.0];
        let joint = cov(&x, Some(&y), true, None, false, None, None).unwrap().into_array();
        assert_eq!(joint.shape(), &[2, 2]);
        assert_eq!(values(&joint)[..2], [1.0, 2.0]);
    }

    #[test]
    fn covariance_edges() {
        let one = cov(&masked_array![1.0, 2.0, 3.0, X], None, true, None, false, None, None).unwrap();
        assert_eq!(one.into_scalar().unwrap(), MaskedScalar::new(1.0, false));

        let gap = masked_array![[1.0, 2.0], [X, X]];
        let c = cov(&gap, None, true, None, false, None, None).unwrap().into_array();
        assert_eq!(c.mask(), &Mask::new(ndarray::arr2(&[[false, true], [true, true]]).into_dyn()));

        let lone = cov(&masked_array![1.0, X], None, true, None, false, None, None).unwrap();
        assert!(lone.into_scalar().unwrap().is_masked());

        let f = CellArray::from(vec![1.0, 2.0, 1.0]);
        let v = masked_array![1.0, 2.0, 4.0];
        let weighted = cov(&v, None, true, None, false, Some(&f), None).unwrap().into_scalar().unwrap();
        assert!(close(weighted.value().unwrap().get::<f64>().unwrap(), 4.75 / 3.0));
        let a = CellArray::from(vec![1.0, 1.0, 1.0]);
        let unit = cov(&v, None, true, None, false, None, Some(&a)).unwrap().into_scalar().unwrap();
        let plain = cov(&v, None, true, None, false, None, None).unwrap().into_scalar().unwrap();
        assert!(close(unit.value().unwrap().get::<f64>().unwrap(), plain.value().unwrap().get::<f64>().unwrap()));

        let half = CellArray::from(vec![1.0, 0.5, 1.0]);
        assert!(cov(&v, None, true, None, false, Some(&half), None).is_err());
        let negative = CellArray::from(vec![1.0, -1.0, 1.0]);
        assert!(cov(&v, None, true, None, false, None, Some(&negative)).is_err());
        let short = CellArray::from(vec![1.0, 1.0]);
        assert!(cov(&v, None, true, None, false, Some(&short), None).is_err());
        assert!(cov(&masked_array![[[1.0]]], None, true, None, false, None, None).is_err());
    }

    #[test]
    fn correlations() {
        let a = masked_array![[1.0, 2.0, 3.0, X], [1.0, X, 3.0, 5.0]];
        let r = corrcoef(&a, None, true).unwrap().into_array();
        assert_eq!(values(&r), vec![1.0, 1.0, 1.0, 1.0]);

        let b = masked_array![[1.0, 2.0, 3.0], [3.0, 2.0, 1.0], [X, X, 1.0]];
        let r = corrcoef(&b, None, true).unwrap().into_array();
        assert_eq!(values(&r)[1], -1.0);
        assert_eq!(r.mask().iter().filter(|m| *m).count(), 5);

        let single = corrcoef(&masked_array![1.0, 2.0, 4.0], None, true).unwrap().into_scalar().unwrap();
        assert_eq!(single, MaskedScalar::new(1.0, false));
    }

    #[test]
    fn bincounts() {
        let a = masked_array![0i64, 1, 1, X, 3];
        assert_eq!(a.bincount(None, 0).unwrap().to_vec::<i64>().unwrap(), vec![1, 2, 0, 1]);
        assert_eq!(a.bincount(None, 6).unwrap().len(), 6);
        let w = CellArray::from(vec![0.5, 1.0, 1.0, 9.0, 2.0]);
        assert_eq!(a.bincount(Some(&w), 0).unwrap().to_vec::<f64>().unwrap(), vec![0.5, 2.0, 0.0, 2.0]);
        assert!(masked_array![-1i64, 2].bincount(None, 0).is_err());
        let hidden = MaskedArray::new(CellArray::from(vec![-1i64, 2]), vec![true, false]).unwrap();
        assert_eq!(hidden.bincount(None, 0).unwrap().to_vec::<i64>().unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn interpolation() {
        let xp = CellArray::from(vec![1.0, 2.0, 3.0, 4.0]);
        let fp = masked_array![10.0, X, 30.0, 40.0];
        let x = CellArray::from(vec![0.0, 1.0, 1.5, 2.5, 3.5, 4.0, 5.0]);
        let r = interp(&x, &xp, &fp, None, None).unwrap();
        assert_eq!(
            r.mask(),
            &Mask::from_vec(vec![false, false, true, true, false, false, false])
        );
        assert_eq!(r.data().get(&[4]), Some(CellValue::Float64(35.0)));
        assert_eq!(r.data().get(&[6]), Some(CellValue::Float64(40.0)));

        let r = interp(&x, &xp, &fp, Some(Operand::Masked), Some(Operand::from(-1.0))).unwrap();
        assert!(r.mask().get(&[0]));
        assert_eq!(r.data().get(&[6]), Some(CellValue::Float64(-1.0)));

        let xm = masked_array![X, 3.0];
        let r = interp(&xm, &xp, &fp, None, None).unwrap();
        assert_eq!(r.mask(), &Mask::from_vec(vec![true, false]));
        assert!(interp(&x, &CellArray::from(vec![1.0]), &fp, None, None).is_err());
    }
}
