/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use super::{decline, ConvolveMode, Dispatched, Operand, Params, Sections};
use crate::array::normalize_axis;
use crate::error::{Error, Result};
use crate::ops::{self, Unique};
use crate::{Assign, CellArray, CellType, CellValue, Masked, MaskedArray};
use log::trace;
use once_cell::sync::Lazy;
use paste::paste;
use std::collections::HashMap;

/// Generates [`Func`] with its name table.
macro_rules! funcs {
    ($($f:ident $(= $n:literal)?),* $(,)?) => {
        /// Whole-array functions that can be routed to a masked implementation.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Func {
            $($f,)*
        }

        impl Func {
            pub const ALL: &'static [Func] = &[$(Func::$f),*];

            /// Lower snake case name, e.g. `take_along_axis`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Func::$f => func_name!($f $(, $n)?),)*
                }
            }
        }
    };
}

macro_rules! func_name {
    ($f:ident) => {
        paste! { stringify!([<$f:snake>]) }
    };
    ($f:ident, $n:literal) => {
        $n
    };
}

funcs! {
    Sum, Prod, Cumsum, Cumprod, Max, Min, Ptp, All, Any, Argmax, Argmin, CountNonzero, Count,
    Mean, Var, Std, Average, Median, Quantile, Percentile,
    Sort, Argsort, Partition, Argpartition, Lexsort, Searchsorted, Digitize, Unique, Nonzero,
    Reshape, Ravel, Transpose, Swapaxes, Moveaxis, ExpandDims, Squeeze, Flip, Roll, Repeat,
    Resize, BroadcastTo, BroadcastArrays, Concatenate, Stack, Append, Delete, Insert, Take,
    TakeAlongAxis, Put, PutAlongAxis, Compress, Where, Choose, Select, Diagonal, Diag, Tril,
    Triu, Copy, Clip, Round, ZerosLike, OnesLike, FullLike, Diff, ResultType,
    Dot, Vdot, Inner, Outer, Cross, Tensordot, Einsum, Trace, Convolve, Correlate,
    Histogram, Bincount, Interp, Cov, Corrcoef, Kron, Isclose, Allclose, ArrayEqual, NanToNum,
    Tile, Atleast1d = "atleast_1d", Atleast2d = "atleast_2d", Atleast3d = "atleast_3d",
    Meshgrid, Block, ColumnStack, Vstack, Hstack, Split, ArraySplit, Diagflat, Argwhere,
    Flatnonzero, Copyto, Putmask,
}

/// Operand positions whose kind decides whether a masked implementation applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Checked {
    All,
    Args(&'static [usize]),
}

impl Checked {
    fn accepts(self, operands: &[Operand<'_>]) -> bool {
        match self {
            Checked::All => operands.iter().all(Operand::is_known),
            Checked::Args(at) => at.iter().filter_map(|&i| operands.get(i)).all(Operand::is_known),
        }
    }
}

/// Result of a dispatched function.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Masked(Masked),
    Plain(CellArray),
    Type(CellType),
    /// Several results, in the order the function documents.
    Tuple(Vec<Output>),
}

impl Output {
    pub fn into_masked(self) -> Result<Masked> {
        match self {
            Output::Masked(m) => Ok(m),
            other => Err(Error::invalid(format!("expected a masked result, found {other:?}"))),
        }
    }

    pub fn into_plain(self) -> Result<CellArray> {
        match self {
            Output::Plain(a) => Ok(a),
            other => Err(Error::invalid(format!("expected a plain result, found {other:?}"))),
        }
    }

    /// Components of a tuple result; any other result is a tuple of one.
    pub fn into_tuple(self) -> Vec<Output> {
        match self {
            Output::Tuple(items) => items,
            other => vec![other],
        }
    }
}

impl From<Masked> for Output {
    fn from(value: Masked) -> Self {
        Output::Masked(value)
    }
}

impl From<MaskedArray> for Output {
    fn from(value: MaskedArray) -> Self {
        Output::Masked(Masked::from_array(value))
    }
}

impl From<CellArray> for Output {
    fn from(value: CellArray) -> Self {
        Output::Plain(value)
    }
}

impl<T: Into<Output>> From<Vec<T>> for Output {
    fn from(values: Vec<T>) -> Self {
        Output::Tuple(values.into_iter().map(Into::into).collect())
    }
}

static FUNCS: Lazy<HashMap<Func, Checked>> = Lazy::new(|| {
    use Func::*;
    let mut table: HashMap<Func, Checked> = Func::ALL.iter().map(|&f| (f, Checked::All)).collect();
    // Bounds and edges are folded in as values, whatever their family.
    table.insert(Interp, Checked::Args(&[0, 1, 2]));
    table.insert(Diff, Checked::Args(&[0]));
    trace!("Built masked function table with {} entries", table.len());
    table
});

/// How `func` is checked before dispatch, or `None` if it has no masked implementation.
pub fn registration(func: Func) -> Option<Checked> {
    FUNCS.get(&func).copied()
}

/// Route `func` over `operands` to its masked implementation.
///
/// Declines functions without one, and calls where a checked operand belongs to another
/// array family. Operands are positional: the array first, then the function's other
/// array arguments. Everything else comes from `params`.
pub fn call(func: Func, operands: &[Operand<'_>], params: &Params) -> Result<Dispatched<Output>> {
    let Some(checked) = registration(func) else {
        return Ok(decline(func.name().to_string()));
    };
    if !checked.accepts(operands) {
        return Ok(decline(format!("{} with a foreign operand", func.name())));
    }
    run(func, operands, params).map(Dispatched::Handled)
}

fn operand<'s, 'a>(operands: &'s [Operand<'a>], i: usize) -> Result<&'s Operand<'a>> {
    operands
        .get(i)
        .ok_or_else(|| Error::invalid(format!("missing operand {i}")))
}

fn array(operands: &[Operand<'_>], i: usize) -> Result<MaskedArray> {
    operand(operands, i)?.to_masked(None)
}

fn weights(operands: &[Operand<'_>], i: usize) -> Result<Option<CellArray>> {
    operands.get(i).map(|o| o.to_plain("weights")).transpose()
}

fn items<'a>(o: &Operand<'a>) -> Vec<Operand<'a>> {
    match o {
        Operand::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn assignment(o: &Operand<'_>) -> Result<Assign> {
    Ok(match o {
        Operand::Masked => Assign::Sentinel,
        Operand::Array(_) | Operand::Scalar(_) | Operand::List(_) => Assign::Masked(o.to_masked(None)?),
        _ => Assign::Plain(o.to_masked(None)?.into_parts().0),
    })
}

fn two_axes(params: &Params, default: (isize, isize)) -> Result<(isize, isize)> {
    match params.axes.as_deref() {
        None => Ok(default),
        Some([a, b]) => Ok((*a, *b)),
        Some(other) => Err(Error::invalid(format!("expected two axes, found {other:?}"))),
    }
}

fn quantiles(a: &MaskedArray, q: &[f64], params: &Params, percent: bool) -> Result<Output> {
    let (axis, method, keepdims) = (params.axis, params.method, params.keepdims);
    Ok(match (q, percent) {
        ([q], false) => a.quantile(*q, axis, method, keepdims)?.into(),
        ([p], true) => a.percentile(*p, axis, method, keepdims)?.into(),
        (qs, false) => a.quantiles(qs, axis, method, keepdims)?.into(),
        (ps, true) => a.percentiles(ps, axis, method, keepdims)?.into(),
    })
}

fn unique(u: Unique, params: &Params) -> Output {
    let mut out = vec![Output::from(u.values)];
    if params.return_index {
        out.push(u.index.into());
    }
    if params.return_inverse {
        out.push(u.inverse.into());
    }
    if params.return_counts {
        out.push(u.counts.into());
    }
    match out.len() {
        1 => out.remove(0),
        _ => Output::Tuple(out),
    }
}

fn at_least(operands: &[Operand<'_>], f: fn(&MaskedArray) -> Result<MaskedArray>) -> Result<Output> {
    let mut out = (0..operands.len())
        .map(|i| array(operands, i).and_then(|a| f(&a)))
        .collect::<Result<Vec<_>>>()?;
    Ok(match out.len() {
        1 => out.remove(0).into(),
        _ => out.into(),
    })
}

fn sections(params: &Params) -> Result<&Sections> {
    params
        .sections
        .as_ref()
        .ok_or_else(|| Error::invalid("split needs sections or indices"))
}

fn run(func: Func, operands: &[Operand<'_>], p: &Params) -> Result<Output> {
    use Func::*;
    let a = || array(operands, 0);
    let b = || array(operands, 1);
    let arg = |i| operand(operands, i).cloned();
    Ok(match func {
        Sum => a()?.sum(p.axis, p.keepdims)?.into(),
        Prod => a()?.prod(p.axis, p.keepdims)?.into(),
        Cumsum => a()?.cumsum(p.axis)?.into(),
        Cumprod => a()?.cumprod(p.axis)?.into(),
        Max => a()?.max(p.axis, p.keepdims)?.into(),
        Min => a()?.min(p.axis, p.keepdims)?.into(),
        Ptp => a()?.ptp(p.axis, p.keepdims)?.into(),
        All => a()?.all(p.axis, p.keepdims)?.into(),
        Any => a()?.any(p.axis, p.keepdims)?.into(),
        Argmax => a()?.argmax(p.axis)?.into(),
        Argmin => a()?.argmin(p.axis)?.into(),
        CountNonzero => a()?.count_nonzero(p.axis)?.into(),
        Count => match p.axis {
            None => CellArray::from_value(CellValue::Int64(a()?.count() as i64)).into(),
            Some(ax) => a()?.count_axis(ax, p.keepdims)?.into(),
        },
        Mean => a()?.mean(p.axis, p.keepdims)?.into(),
        Var => a()?.var(p.axis, p.ddof.unwrap_or(0), p.keepdims)?.into(),
        Std => a()?.std(p.axis, p.ddof.unwrap_or(0), p.keepdims)?.into(),
        Average => {
            let w = weights(operands, 1)?;
            match a()?.average(w.as_ref(), p.axis, p.returned)? {
                (avg, Some(total)) => vec![avg, total].into(),
                (avg, None) => avg.into(),
            }
        }
        Median => a()?.median(p.axis, p.keepdims)?.into(),
        Quantile => quantiles(&a()?, &p.q, p, false)?,
        Percentile => quantiles(&a()?, &p.q, p, true)?,
        Sort => a()?.sorted(p.axis)?.into(),
        Argsort => a()?.argsort(p.axis)?.into(),
        Partition => a()?.partition(&p.kth, p.axis)?.into(),
        Argpartition => a()?.argpartition(&p.kth, p.axis)?.into(),
        Lexsort => {
            let keys = (0..operands.len()).map(|i| array(operands, i)).collect::<Result<Vec<_>>>()?;
            ops::lexsort(&keys.iter().collect::<Vec<_>>())?.into()
        }
        Searchsorted => ops::searchsorted(arg(0)?, arg(1)?, p.side)?.into(),
        Digitize => ops::digitize(arg(0)?, arg(1)?, p.right)?.into(),
        Unique => unique(a()?.unique(), p),
        Nonzero => a()?.nonzero().into(),
        Reshape => a()?.reshape(&p.shape)?.into(),
        Ravel => a()?.ravel().into(),
        Transpose => {
            let a = a()?;
            let axes = p
                .axes
                .as_ref()
                .map(|axes| axes.iter().map(|&x| normalize_axis(x, a.ndim())).collect::<Result<Vec<_>>>())
                .transpose()?;
            a.transpose(axes.as_deref())?.into()
        }
        Swapaxes => {
            let (x, y) = two_axes(p, (0, 1))?;
            a()?.swapaxes(x, y)?.into()
        }
        Moveaxis => {
            let (x, y) = two_axes(p, (0, -1))?;
            a()?.moveaxis(x, y)?.into()
        }
        ExpandDims => a()?.expand_dims(p.axis.unwrap_or(0))?.into(),
        Squeeze => a()?.squeeze(p.axis)?.into(),
        Flip => a()?.flip(p.axis)?.into(),
        Roll => a()?.roll(p.offset, p.axis)?.into(),
        Repeat => a()?.repeat(&[p.n], p.axis)?.into(),
        Resize => a()?.resized(&p.shape)?.into(),
        BroadcastTo => a()?.broadcast_to(&p.shape)?.into(),
        BroadcastArrays => ops::broadcast_arrays(operands)?.into(),
        Concatenate => ops::concatenate(operands, p.axis)?.into(),
        Stack => ops::stack(operands, p.axis.unwrap_or(0))?.into(),
        Append => ops::append(arg(0)?, arg(1)?, p.axis)?.into(),
        Delete => a()?.delete(&p.indices, p.axis)?.into(),
        Insert => a()?.insert(p.offset, arg(1)?, p.axis)?.into(),
        Take => a()?.take(&b()?, p.axis)?.into(),
        TakeAlongAxis => a()?.take_along_axis(&b()?, p.axis)?.into(),
        Put => {
            let mut target = a()?.copy();
            target.put(&b()?, assignment(&arg(2)?)?)?;
            target.into()
        }
        PutAlongAxis => {
            let mut target = a()?.copy();
            target.put_along_axis(&b()?, arg(2)?, p.axis)?;
            target.into()
        }
        Compress => b()?.compress(arg(0)?, p.axis)?.into(),
        Where => ops::where_(arg(0)?, arg(1)?, arg(2)?)?.into(),
        Choose => ops::choose(arg(0)?, operands.get(1..).unwrap_or_default())?.into(),
        Select => {
            let default = operands.get(2).cloned().unwrap_or(Operand::Value(CellValue::Int32(0)));
            ops::select(&items(&arg(0)?), &items(&arg(1)?), default)?.into()
        }
        Diagonal => {
            let (x, y) = two_axes(p, (0, 1))?;
            a()?.diagonal(p.offset, x, y)?.into()
        }
        Diag => ops::diag(&a()?, p.offset)?.into(),
        Tril => a()?.tril(p.offset)?.into(),
        Triu => a()?.triu(p.offset)?.into(),
        Copy => a()?.copy().into(),
        Clip => a()?.clip(p.bounds.0, p.bounds.1)?.into(),
        Round => a()?.round(p.decimals).into(),
        ZerosLike => a()?.zeros_like(p.dtype).into(),
        OnesLike => a()?.ones_like(p.dtype).into(),
        FullLike => {
            let value = p.value.ok_or_else(|| Error::invalid("full_like needs a fill value"))?;
            a()?.full_like(value, p.dtype).into()
        }
        Diff => a()?
            .diff(p.n, p.axis.unwrap_or(-1), operands.get(1).cloned(), operands.get(2).cloned())?
            .into(),
        ResultType => Output::Type(ops::result_type(operands)?),
        Dot => ops::dot(&a()?, &b()?)?.into(),
        Vdot => ops::vdot(&a()?, &b()?)?.into(),
        Inner => ops::inner(&a()?, &b()?)?.into(),
        Outer => ops::outer_product(&a()?, &b()?)?.into(),
        Cross => ops::cross(&a()?, &b()?)?.into(),
        Tensordot => match p.axes.as_deref() {
            None => ops::tensordot_n(&a()?, &b()?, 2)?.into(),
            Some(axes) if axes.len() % 2 == 0 => {
                let (left, right) = axes.split_at(axes.len() / 2);
                ops::tensordot(&a()?, &b()?, left, right)?.into()
            }
            Some(axes) => {
                return Err(Error::invalid(format!("tensordot needs paired axes, found {axes:?}")))
            }
        },
        Einsum => {
            let arrays = (0..operands.len()).map(|i| array(operands, i)).collect::<Result<Vec<_>>>()?;
            ops::einsum(&p.subscripts, &arrays.iter().collect::<Vec<_>>())?.into()
        }
        Trace => {
            let (x, y) = two_axes(p, (0, 1))?;
            a()?.trace(p.offset, x, y)?.into()
        }
        Convolve => ops::convolve(&a()?, &b()?, p.mode.unwrap_or(ConvolveMode::Full))?.into(),
        Correlate => ops::correlate(&a()?, &b()?, p.mode.unwrap_or(ConvolveMode::Valid))?.into(),
        Histogram => {
            let w = weights(operands, 1)?;
            let (counts, edges) = a()?.histogram(p.bins, p.range, w.as_ref())?;
            vec![counts, edges].into()
        }
        Bincount => {
            let w = weights(operands, 1)?;
            a()?.bincount(w.as_ref(), p.minlength)?.into()
        }
        Interp => ops::interp(
            arg(0)?,
            arg(1)?,
            arg(2)?,
            operands.get(3).cloned(),
            operands.get(4).cloned(),
        )?
        .into(),
        Cov => {
            let y = operands.get(1).map(|o| o.to_masked(None)).transpose()?;
            let (fw, aw) = (p.fweights.as_ref(), p.aweights.as_ref());
            ops::cov(&a()?, y.as_ref(), p.rowvar, p.ddof, p.bias, fw, aw)?.into()
        }
        Corrcoef => {
            let y = operands.get(1).map(|o| o.to_masked(None)).transpose()?;
            ops::corrcoef(&a()?, y.as_ref(), p.rowvar)?.into()
        }
        Kron => ops::kron(&a()?, &b()?)?.into(),
        Isclose => ops::isclose(arg(0)?, arg(1)?, p.rtol, p.atol, p.equal_nan)?.into(),
        Allclose => {
            let close = ops::allclose(arg(0)?, arg(1)?, p.rtol, p.atol, p.equal_nan)?;
            CellArray::from_value(CellValue::Bool(close)).into()
        }
        ArrayEqual => CellArray::from_value(CellValue::Bool(ops::array_equal(arg(0)?, arg(1)?)?)).into(),
        NanToNum => a()?.nan_to_num(p.nan, p.posinf, p.neginf).into(),
        Tile => a()?.tile(&p.reps)?.into(),
        Atleast1d => at_least(operands, MaskedArray::atleast_1d)?,
        Atleast2d => at_least(operands, MaskedArray::atleast_2d)?,
        Atleast3d => at_least(operands, MaskedArray::atleast_3d)?,
        Meshgrid => ops::meshgrid(operands, p.indexing)?.into(),
        Block => ops::block(&arg(0)?)?.into(),
        ColumnStack => ops::column_stack(operands)?.into(),
        Vstack => ops::vstack(operands)?.into(),
        Hstack => ops::hstack(operands)?.into(),
        Split => a()?.split(sections(p)?, p.axis.unwrap_or(0))?.into(),
        ArraySplit => a()?.array_split(sections(p)?, p.axis.unwrap_or(0))?.into(),
        Diagflat => ops::diagflat(&a()?, p.offset)?.into(),
        Argwhere => a()?.argwhere()?.into(),
        Flatnonzero => a()?.flatnonzero().into(),
        Copyto => {
            let mut target = a()?.copy();
            let cond = operands.get(2).map(|o| o.to_plain("where")).transpose()?;
            target.copyto(arg(1)?, cond.as_ref())?;
            target.into()
        }
        Putmask => {
            let mut target = a()?.copy();
            target.putmask(&arg(1)?.to_plain("mask")?, arg(2)?)?;
            target.into()
        }
    })
}
