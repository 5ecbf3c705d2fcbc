/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Elementwise operations: ufunc calls, operator overloads, comparisons and selection.

use crate::array::{broadcast_shape, broadcast_view, common_type, map_array, on_pair};
use crate::dispatch::{coerce, Operand};
use crate::error::{ConstructionError, Error, Result};
use crate::kernel::{self, UFunc};
use crate::{flavor, CellArray, CellType, CellValue, Element, Fill, Mask, Masked, MaskedArray, MaskedScalar};
use ndarray::{ArrayD, Zip};
use paste::paste;
use std::borrow::Cow;
use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div, DivAssign, Mul,
    MulAssign, Neg, Not, Rem, RemAssign, Sub, SubAssign,
};

/// Apply the unary kernel `op` to the data of `a`. The mask passes through unchanged.
pub fn unary(op: UFunc, a: &MaskedArray) -> Result<MaskedArray> {
    let data = kernel::unary(op, a.data())?;
    Ok(MaskedArray::from_parts(data, a.mask().clone(), a.flavor()))
}

/// Kernels that fail or warn on some right hand operands, which masked cells must not hit.
fn guards_divisor(op: UFunc) -> bool {
    use UFunc::*;
    matches!(op, TrueDivide | FloorDivide | Remainder | Fmod | Power)
}

/// Apply the binary kernel `op` to `lhs` and `rhs` after broadcasting.
///
/// The result is masked wherever either operand is.
pub fn binary(op: UFunc, lhs: &MaskedArray, rhs: &MaskedArray) -> Result<MaskedArray> {
    let flavor = lhs.flavor().most_derived(rhs.flavor())?;
    let rhs_data = if guards_divisor(op) && rhs.mask().any() {
        Cow::Owned(rhs.filled(rhs.dtype().one()))
    } else {
        Cow::Borrowed(rhs.data())
    };
    let data = kernel::binary(op, lhs.data(), &rhs_data)?;
    let mask = lhs.mask().union(rhs.mask())?;
    Ok(MaskedArray::from_parts(data, mask, flavor))
}

/// Call `op` on operands of any supported kind.
///
/// Plain values are weakly typed and the sentinel takes the type of the other
/// operand. The result is a scalar when every operand is zero dimensional.
pub fn apply(op: UFunc, operands: &[Operand<'_>]) -> Result<Masked> {
    let flavor = flavor::resolve(operands)?;
    let arrays = coerce(operands)?;
    let r = match arrays.as_slice() {
        [a] if op.arity() == 1 => unary(op, a)?,
        [l, r] if op.arity() == 2 => binary(op, l, r)?,
        _ => {
            return Err(Error::invalid(format!(
                "`{}` takes {} operand(s), {} given",
                op.name(),
                op.arity(),
                arrays.len()
            )))
        }
    };
    Ok(Masked::from_array(r.with_flavor(flavor)))
}

impl MaskedArray {
    /// In place `self = op(self, rhs)`, keeping the cell type and shape of `self`.
    pub fn update<'r>(&mut self, op: UFunc, rhs: impl Into<Operand<'r>>) -> Result<()> {
        self.check_writeable()?;
        let r = apply(op, &[Operand::from(&*self), rhs.into()])?.into_array();
        if r.shape() != self.shape() {
            return Err(Error::Shape(format!(
                "non-broadcastable output operand with shape {:?} doesn't match the broadcast shape {:?}",
                self.shape(),
                r.shape()
            )));
        }
        let dtype = self.dtype();
        let (data, mask) = r.into_parts();
        let (d, m) = self.parts_mut();
        *d = data.astype(dtype);
        *m = mask;
        Ok(())
    }

    /// Copy with the data limited to `[lo, hi]`; either bound may be absent.
    pub fn clip(&self, lo: Option<CellValue>, hi: Option<CellValue>) -> Result<MaskedArray> {
        let ct = self.dtype();
        let mut data = self.data().clone();
        if let Some(lo) = lo {
            data = kernel::binary(UFunc::Maximum, &data, &CellArray::from_value(lo.cast(ct)))?;
        }
        if let Some(hi) = hi {
            data = kernel::binary(UFunc::Minimum, &data, &CellArray::from_value(hi.cast(ct)))?;
        }
        Ok(MaskedArray::from_parts(data, self.mask().clone(), self.flavor()))
    }

    /// Round to `decimals` places, halves to even. Negative `decimals` round integers too.
    pub fn round(&self, decimals: i32) -> MaskedArray {
        fn to_even(v: f64, decimals: i32) -> f64 {
            let scale = 10f64.powi(decimals);
            (v * scale).round_ties_even() / scale
        }
        let data = match self.data() {
            CellArray::Float32(a) => a.mapv(|v| to_even(v as f64, decimals) as f32).into(),
            CellArray::Float64(a) => a.mapv(|v| to_even(v, decimals)).into(),
            d if decimals >= 0 || d.cell_type().is_bool() => d.clone(),
            d => map_array!(d, a => a.mapv(|v| Element::cast_f64(to_even(v.as_f64(), decimals)))),
        };
        MaskedArray::from_parts(data, self.mask().clone(), self.flavor())
    }
}

fn replace_non_finite(v: f64, nan: f64, posinf: f64, neginf: f64) -> f64 {
    match v {
        v if v.is_nan() => nan,
        f64::INFINITY => posinf,
        f64::NEG_INFINITY => neginf,
        v => v,
    }
}

impl MaskedArray {
    /// Replace NaN with `nan` and infinities with `posinf` and `neginf`, which default to
    /// the largest and smallest finite values of the cell type.
    ///
    /// Integer and boolean data pass through. The mask is unchanged.
    pub fn nan_to_num(&self, nan: f64, posinf: Option<f64>, neginf: Option<f64>) -> MaskedArray {
        let data = match self.data() {
            CellArray::Float32(a) => {
                let (hi, lo) = (posinf.unwrap_or(f32::MAX as f64), neginf.unwrap_or(f32::MIN as f64));
                a.mapv(|v| replace_non_finite(v as f64, nan, hi, lo) as f32).into()
            }
            CellArray::Float64(a) => {
                let (hi, lo) = (posinf.unwrap_or(f64::MAX), neginf.unwrap_or(f64::MIN));
                a.mapv(|v| replace_non_finite(v, nan, hi, lo)).into()
            }
            d => d.clone(),
        };
        MaskedArray::from_parts(data, self.mask().clone(), self.flavor())
    }
}

fn close(x: f64, y: f64, rtol: f64, atol: f64, equal_nan: bool) -> bool {
    if x.is_nan() || y.is_nan() {
        return equal_nan && x.is_nan() && y.is_nan();
    }
    if x.is_infinite() || y.is_infinite() {
        return x == y;
    }
    (x - y).abs() <= atol + rtol * y.abs()
}

/// Elementwise `|a - b| <= atol + rtol * |b|`, masked where either side is.
///
/// Infinities are close only to themselves. NaNs are close to each other with `equal_nan`.
pub fn isclose<'a>(
    a: impl Into<Operand<'a>>,
    b: impl Into<Operand<'a>>,
    rtol: f64,
    atol: f64,
    equal_nan: bool,
) -> Result<MaskedArray> {
    let (a, b) = (a.into(), b.into());
    let flavor = flavor::resolve(&[a.clone(), b.clone()])?;
    let arrays = coerce(&[a, b])?;
    let shape = broadcast_shape(arrays[0].shape(), arrays[1].shape())?;
    let (xs, ys) = (arrays[0].data().cast_to::<f64>(), arrays[1].data().cast_to::<f64>());
    let data = Zip::from(&broadcast_view(&xs, &shape)?)
        .and(&broadcast_view(&ys, &shape)?)
        .map_collect(|x, y| close(*x, *y, rtol, atol, equal_nan));
    let mask = arrays[0].mask().union(arrays[1].mask())?;
    Ok(MaskedArray::from_parts(CellArray::from(data), mask, flavor))
}

/// Determine if every unmasked pair is close; see [`isclose`].
pub fn allclose<'a>(
    a: impl Into<Operand<'a>>,
    b: impl Into<Operand<'a>>,
    rtol: f64,
    atol: f64,
    equal_nan: bool,
) -> Result<bool> {
    Ok(isclose(a, b, rtol, atol, equal_nan)?.compressed().all(|v| v.is_truthy()))
}

/// Determine if `a1` and `a2` have one shape and equal cells where both are unmasked.
pub fn array_equal<'a>(a1: impl Into<Operand<'a>>, a2: impl Into<Operand<'a>>) -> Result<bool> {
    let (a1, a2) = (a1.into(), a2.into());
    if a1.shape()? != a2.shape()? {
        return Ok(false);
    }
    let eq = apply(UFunc::Equal, &[a1, a2])?.into_array();
    let all = eq.compressed().all(|v| v.is_truthy());
    Ok(all)
}

macro_rules! comparisons {
    ($(($mth:ident, $op:ident)),*) => {
        impl MaskedArray { $(
            #[doc = concat!("Elementwise `", stringify!($op), "`, masked where either side is.")]
            pub fn $mth<'r>(&self, rhs: impl Into<Operand<'r>>) -> Result<MaskedArray> {
                Ok(apply(UFunc::$op, &[Operand::from(self), rhs.into()])?.into_array())
            }
        )* }
    };
}

comparisons!(
    (lt, Less),
    (le, LessEqual),
    (gt, Greater),
    (ge, GreaterEqual),
    (eq_elem, Equal),
    (ne_elem, NotEqual)
);

/// Operators panic on failure, as `ndarray`'s do. Use [`apply`] to handle errors.
macro_rules! binary_ops {
    ($(($trt:ident, $mth:ident, $op:ident)),*) => { paste! { $(
        impl<'r, R: Into<Operand<'r>>> $trt<R> for &MaskedArray {
            type Output = MaskedArray;

            fn $mth(self, rhs: R) -> MaskedArray {
                match apply(UFunc::$op, &[Operand::from(self), rhs.into()]) {
                    Ok(r) => r.into_array(),
                    Err(e) => panic!("{}: {e}", UFunc::$op.name()),
                }
            }
        }

        impl<'r, R: Into<Operand<'r>>> $trt<R> for MaskedArray {
            type Output = MaskedArray;

            fn $mth(self, rhs: R) -> MaskedArray {
                (&self).$mth(rhs)
            }
        }

        impl<'r, R: Into<Operand<'r>>> $trt<R> for MaskedScalar {
            type Output = Masked;

            fn $mth(self, rhs: R) -> Masked {
                match apply(UFunc::$op, &[Operand::from(&self), rhs.into()]) {
                    Ok(r) => r,
                    Err(e) => panic!("{}: {e}", UFunc::$op.name()),
                }
            }
        }

        impl<'r, R: Into<Operand<'r>>> [<$trt Assign>]<R> for MaskedArray {
            fn [<$mth _assign>](&mut self, rhs: R) {
                if let Err(e) = self.update(UFunc::$op, rhs) {
                    panic!("{}: {e}", UFunc::$op.name());
                }
            }
        }
    )* } };
}

binary_ops!(
    (Add, add, Add),
    (Sub, sub, Subtract),
    (Mul, mul, Multiply),
    (Div, div, TrueDivide),
    (Rem, rem, Remainder),
    (BitAnd, bitand, BitwiseAnd),
    (BitOr, bitor, BitwiseOr),
    (BitXor, bitxor, BitwiseXor)
);

macro_rules! unary_ops {
    ($(($trt:ident, $mth:ident, $op:ident)),*) => { $(
        impl $trt for &MaskedArray {
            type Output = MaskedArray;

            fn $mth(self) -> MaskedArray {
                match unary(UFunc::$op, self) {
                    Ok(r) => r,
                    Err(e) => panic!("{}: {e}", UFunc::$op.name()),
                }
            }
        }

        impl $trt for MaskedArray {
            type Output = MaskedArray;

            fn $mth(self) -> MaskedArray {
                (&self).$mth()
            }
        }

        impl $trt for MaskedScalar {
            type Output = MaskedScalar;

            fn $mth(self) -> MaskedScalar {
                let r = (&self.to_array()).$mth();
                match r.scalar_at(&[]) {
                    Some(s) => s,
                    None => unreachable!("zero dimensional result"),
                }
            }
        }
    )* };
}

unary_ops!((Neg, neg, Negative), (Not, not, Invert));

/// Cells of `x` where `cond` holds and of `y` elsewhere.
///
/// All three share one shape, and `x` and `y` one cell type.
pub(crate) fn pick(cond: &ArrayD<bool>, x: &MaskedArray, y: &MaskedArray) -> MaskedArray {
    let data: CellArray = on_pair!(x.data(), y.data(), (a, b) => Zip::from(cond)
        .and(a)
        .and(b)
        .map_collect(|c, a, b| if *c { *a } else { *b })
        .into());
    let mask = Zip::from(cond)
        .and(x.mask().as_array())
        .and(y.mask().as_array())
        .map_collect(|c, a, b| if *c { *a } else { *b });
    MaskedArray::from_parts(data, Mask::new(mask), x.flavor())
}

/// Common shape of `shapes` under broadcasting.
fn broadcast_all<'s>(shapes: impl IntoIterator<Item = &'s [usize]>) -> Result<Vec<usize>> {
    shapes
        .into_iter()
        .try_fold(Vec::new(), |acc, s| broadcast_shape(&acc, s))
}

/// Choose from `x` where `cond` is true and from `y` elsewhere.
///
/// Masked condition cells count as false. The sentinel may stand in for either
/// branch, but not both, as the result would have no cell type.
pub fn where_<'a>(
    cond: impl Into<Operand<'a>>,
    x: impl Into<Operand<'a>>,
    y: impl Into<Operand<'a>>,
) -> Result<Masked> {
    let (cond, x, y) = (cond.into(), x.into(), y.into());
    if matches!((&x, &y), (Operand::Masked, Operand::Masked)) {
        return Err(ConstructionError::AmbiguousDtype.into());
    }
    let flavor = flavor::resolve(&[cond.clone(), x.clone(), y.clone()])?;
    let truth = cond
        .to_masked(Some(CellType::Bool))?
        .filled(Fill::Default)
        .to_bool();
    let branches = coerce(&[x, y])?;
    let ct = branches[0].dtype().union(branches[1].dtype());
    let shape = broadcast_all([truth.shape(), branches[0].shape(), branches[1].shape()])?;
    let truth = broadcast_view(&truth, &shape)?.to_owned();
    let x = branches[0].astype(ct).broadcast_to(&shape)?;
    let y = branches[1].astype(ct).broadcast_to(&shape)?;
    Ok(Masked::from_array(pick(&truth, &x, &y).with_flavor(flavor)))
}

/// Build an array from `choices` using the integer `indices` to pick the source of each cell.
///
/// Masked indices are rejected.
pub fn choose<'a>(indices: impl Into<Operand<'a>>, choices: &[Operand<'a>]) -> Result<Masked> {
    let indices = indices.into();
    if choices.is_empty() {
        return Err(Error::invalid("choose needs at least one choice"));
    }
    let mut all = vec![indices.clone()];
    all.extend(choices.iter().cloned());
    let flavor = flavor::resolve(&all)?;
    let idx = indices.to_masked(None)?;
    if idx.mask().any() {
        return Err(Error::IndexMask);
    }
    let idx = idx.data().to_indices()?;
    let options = coerce(choices)?;
    let ct = common_type(options.iter().map(MaskedArray::dtype)).unwrap_or(CellType::Float64);
    let shape = broadcast_all(
        std::iter::once(idx.shape()).chain(options.iter().map(MaskedArray::shape)),
    )?;
    let idx = broadcast_view(&idx, &shape)?;
    let n = options.len();
    if let Some(&bad) = idx.iter().find(|&&i| i < 0 || i as usize >= n) {
        return Err(Error::IndexOutOfBounds { index: bad, len: n });
    }
    let mut out = options[0].astype(ct).broadcast_to(&shape)?.copy();
    for (k, option) in options.iter().enumerate().skip(1) {
        let hit = idx.mapv(|i| i as usize == k);
        out = pick(&hit, &option.astype(ct).broadcast_to(&shape)?, &out);
    }
    Ok(Masked::from_array(out.with_flavor(flavor)))
}

/// Take each cell from the first choice whose condition holds, or from `default`.
///
/// Conditions must be unmasked boolean arrays; `default` may be the sentinel.
pub fn select<'a>(
    conds: &[Operand<'a>],
    choices: &[Operand<'a>],
    default: impl Into<Operand<'a>>,
) -> Result<Masked> {
    if conds.len() != choices.len() {
        return Err(Error::invalid("list of cases must be same length as list of conditions"));
    }
    if conds.is_empty() {
        return Err(Error::invalid("select with an empty condition list is not possible"));
    }
    let truths = conds
        .iter()
        .map(|c| {
            let c = c.to_plain("condlist")?;
            if c.cell_type().is_bool() {
                Ok(c.to_bool())
            } else {
                Err(Error::invalid("invalid entry in condlist: should be boolean"))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let mut operands = choices.to_vec();
    operands.push(default.into());
    let flavor = flavor::resolve(&operands)?;
    let arrays = coerce(&operands)?;
    let ct = common_type(arrays.iter().map(MaskedArray::dtype)).unwrap_or(CellType::Float64);
    let shape = broadcast_all(
        truths
            .iter()
            .map(|t| t.shape())
            .chain(arrays.iter().map(MaskedArray::shape)),
    )?;
    let Some((default, options)) = arrays.split_last() else {
        unreachable!("the default is always present")
    };
    let mut out = default.astype(ct).broadcast_to(&shape)?.copy();
    for (truth, option) in truths.iter().zip(options).rev() {
        let truth = broadcast_view(truth, &shape)?.to_owned();
        out = pick(&truth, &option.astype(ct).broadcast_to(&shape)?, &out);
    }
    Ok(Masked::from_array(out.with_flavor(flavor)))
}
