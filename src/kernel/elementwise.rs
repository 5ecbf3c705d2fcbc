/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use super::UFunc;
use crate::array::{broadcast_shape, broadcast_view, on_array, on_numeric, on_numeric_pair, on_pair};
use crate::error::{Error, Result};
use crate::{Bitwise, CellArray, CellEncoding, CellType, Element};
use ndarray::{ArrayD, Zip};
use num_traits::Float;

/// Evaluates `$body` for the bitwise-capable variants of a [`CellArray`]; floats evaluate `$float`.
macro_rules! on_bitwise {
    ($arr:expr, $a:ident => $body:expr, float => $float:expr) => {
        match $arr {
            CellArray::Bool($a) => $body,
            CellArray::UInt8($a) => $body,
            CellArray::UInt16($a) => $body,
            CellArray::UInt32($a) => $body,
            CellArray::UInt64($a) => $body,
            CellArray::Int8($a) => $body,
            CellArray::Int16($a) => $body,
            CellArray::Int32($a) => $body,
            CellArray::Int64($a) => $body,
            CellArray::Float32(_) | CellArray::Float64(_) => $float,
        }
    };
}

/// Apply the single-input kernel `op` to every element of `input`.
pub fn unary(op: UFunc, input: &CellArray) -> Result<CellArray> {
    use UFunc::*;
    if !op.is_unary() {
        return Err(Error::invalid(format!("`{}` is not a unary kernel", op.name())));
    }
    let out_type = op.unary_result_type(input.cell_type())?;
    let unsupported = || Error::UnsupportedType { op: op.name(), cell_type: input.cell_type() };
    match op {
        Isnan => Ok(on_array!(input, a => a.mapv(|v| v.is_nan_cell()).into())),
        Isinf => Ok(on_array!(input, a => a.mapv(|v| v.as_f64().is_infinite()).into())),
        Isfinite => Ok(on_array!(input, a => a.mapv(|v| v.as_f64().is_finite()).into())),
        LogicalNot => Ok(on_array!(input, a => a.mapv(|v| !v.is_truthy()).into())),
        Conjugate => Ok(input.clone()),
        Absolute => on_numeric!(input, a => Ok(a.mapv(|v| v.cell_abs()).into()), bool => Ok(input.clone())),
        Negative => on_numeric!(input, a => Ok(a.mapv(|v| v.cell_neg()).into()), bool => Err(unsupported())),
        Invert => on_bitwise!(input, a => Ok(a.mapv(|v| !v).into()), float => Err(unsupported())),
        Floor | Ceil if !input.cell_type().is_float() => Ok(input.clone()),
        Floor | Ceil => float_unary(op, input),
        _ if out_type.is_float() => float_unary(op, &input.astype(out_type)),
        _ => Err(unsupported()),
    }
}

fn float_unary(op: UFunc, input: &CellArray) -> Result<CellArray> {
    fn apply<T: Float>(op: UFunc, a: &ArrayD<T>) -> ArrayD<T> {
        use UFunc::*;
        let f: fn(T) -> T = match op {
            Exp => T::exp,
            Sin => T::sin,
            Cos => T::cos,
            Tan => T::tan,
            Arcsin => T::asin,
            Arccos => T::acos,
            Arctan => T::atan,
            Arcsinh => T::asinh,
            Arccosh => T::acosh,
            Arctanh => T::atanh,
            Sinh => T::sinh,
            Cosh => T::cosh,
            Tanh => T::tanh,
            Sqrt => T::sqrt,
            Log => T::ln,
            Log2 => T::log2,
            Log10 => T::log10,
            Fabs => T::abs,
            Floor => T::floor,
            Ceil => T::ceil,
            _ => |v| v,
        };
        a.mapv(f)
    }
    match input {
        CellArray::Float32(a) => Ok(CellArray::Float32(apply(op, a))),
        CellArray::Float64(a) => Ok(CellArray::Float64(apply(op, a))),
        o => Err(Error::UnsupportedType { op: op.name(), cell_type: o.cell_type() }),
    }
}

/// Broadcast `lhs` and `rhs` together and combine them with `f`.
fn zip_with<T: Copy, U>(
    lhs: &ArrayD<T>,
    rhs: &ArrayD<T>,
    shape: &[usize],
    f: impl Fn(T, T) -> U,
) -> Result<ArrayD<U>> {
    let l = broadcast_view(lhs, shape)?;
    let r = broadcast_view(rhs, shape)?;
    Ok(Zip::from(&l).and(&r).map_collect(|a, b| f(*a, *b)))
}

/// Apply the two-input kernel `op` to `lhs` and `rhs` after broadcasting and type promotion.
pub fn binary(op: UFunc, lhs: &CellArray, rhs: &CellArray) -> Result<CellArray> {
    use UFunc::*;
    if !op.is_binary() {
        return Err(Error::invalid(format!("`{}` is not a binary kernel", op.name())));
    }
    let shape = broadcast_shape(lhs.shape(), rhs.shape())?;
    let ct = op.operand_type(lhs.cell_type(), rhs.cell_type())?;

    if op.is_logical() {
        let (l, r) = (lhs.to_bool(), rhs.to_bool());
        let f: fn(bool, bool) -> bool = match op {
            LogicalAnd => |a, b| a & b,
            LogicalOr => |a, b| a | b,
            _ => |a, b| a ^ b,
        };
        return Ok(zip_with(&l, &r, &shape, f)?.into());
    }

    let (l, r) = (lhs.astype(ct), rhs.astype(ct));
    if op.is_comparison() {
        return Ok(on_pair!(&l, &r, (a, b) => compare(op, a, b, &shape)?).into());
    }
    if op.is_bitwise() {
        return on_bitwise!(&l, a => {
            let b = r.as_array().ok_or_else(|| Error::invalid("mismatched operands"))?;
            Ok(bitwise(op, a, b, &shape)?.into())
        }, float => Err(Error::UnsupportedType { op: op.name(), cell_type: ct }));
    }
    if ct.is_integral() {
        check_integral(op, &r)?;
    }
    on_numeric_pair!(&l, &r, (a, b) => Ok(arithmetic(op, a, b, &shape)?.into()),
        bool => Ok(bool_arithmetic(op, a, b, &shape)?.into()))
}

/// Guards integer kernels against arguments they cannot represent.
fn check_integral(op: UFunc, rhs: &CellArray) -> Result<()> {
    use UFunc::*;
    match op {
        FloorDivide | Remainder | Fmod => {
            if rhs.iter().any(|v| !v.is_truthy()) {
                log::warn!("divide by zero encountered in {}", op.name());
            }
            Ok(())
        }
        Power if rhs.cell_type().is_signed() && rhs.iter().any(|v| v < v.cell_type().zero()) => {
            Err(Error::invalid("Integers to negative integer powers are not allowed"))
        }
        _ => Ok(()),
    }
}

fn compare<T: Element>(op: UFunc, a: &ArrayD<T>, b: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<bool>> {
    use UFunc::*;
    let f: fn(T, T) -> bool = match op {
        Equal => |x, y| x == y,
        NotEqual => |x, y| x != y,
        Less => |x, y| x < y,
        LessEqual => |x, y| x <= y,
        Greater => |x, y| x > y,
        _ => |x, y| x >= y,
    };
    zip_with(a, b, shape, f)
}

fn bitwise<T: Bitwise>(op: UFunc, a: &ArrayD<T>, b: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>> {
    use UFunc::*;
    let f: fn(T, T) -> T = match op {
        BitwiseAnd => |x, y| x & y,
        BitwiseOr => |x, y| x | y,
        _ => |x, y| x ^ y,
    };
    zip_with(a, b, shape, f)
}

fn arithmetic<T: CellEncoding>(op: UFunc, a: &ArrayD<T>, b: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>> {
    use UFunc::*;
    let f: fn(T, T) -> T = match op {
        Add => T::cell_add,
        Subtract => T::cell_sub,
        Multiply => T::cell_mul,
        TrueDivide if T::cell_type().is_float() => |x, y| x / y,
        TrueDivide | FloorDivide => T::cell_floor_div,
        Remainder => T::cell_rem,
        Fmod => T::cell_fmod,
        Power => T::cell_pow,
        Maximum => T::cell_max,
        Minimum => T::cell_min,
        Arctan2 => |y, x| T::cast_f64(y.as_f64().atan2(x.as_f64())),
        Hypot => |x, y| T::cast_f64(x.as_f64().hypot(y.as_f64())),
        _ => return Err(Error::UnsupportedType { op: op.name(), cell_type: T::cell_type() }),
    };
    zip_with(a, b, shape, f)
}

fn bool_arithmetic(op: UFunc, a: &ArrayD<bool>, b: &ArrayD<bool>, shape: &[usize]) -> Result<ArrayD<bool>> {
    use UFunc::*;
    let f: fn(bool, bool) -> bool = match op {
        Add | Maximum => |x, y| x | y,
        Multiply | Minimum => |x, y| x & y,
        _ => return Err(Error::UnsupportedType { op: op.name(), cell_type: CellType::Bool }),
    };
    zip_with(a, b, shape, f)
}

/// Fractional and integral parts of each element, both with the sign of the input.
pub fn modf(input: &CellArray) -> Result<(CellArray, CellArray)> {
    let ct = UFunc::Modf.unary_result_type(input.cell_type())?;
    match input.astype(ct) {
        CellArray::Float32(a) => Ok((a.mapv(f32::fract).into(), a.mapv(f32::trunc).into())),
        CellArray::Float64(a) => Ok((a.mapv(f64::fract).into(), a.mapv(f64::trunc).into())),
        o => Err(Error::UnsupportedType { op: "modf", cell_type: o.cell_type() }),
    }
}

/// Decompose each element into a mantissa in `[0.5, 1)` and a power of two exponent.
pub fn frexp(input: &CellArray) -> Result<(CellArray, CellArray)> {
    fn split<T: Float>(v: T) -> (T, i32) {
        if v.is_zero() || !v.is_finite() {
            return (v, 0);
        }
        let two = T::one() + T::one();
        let half = T::one() / two;
        let mut e = v.abs().log2().floor().to_i32().unwrap_or(0) + 1;
        let mut m = v / two.powi(e);
        // Rounding in `log2` can leave the mantissa just outside the range.
        if m.abs() >= T::one() {
            m = m / two;
            e += 1;
        } else if m.abs() < half {
            m = m * two;
            e -= 1;
        }
        (m, e)
    }
    fn parts<T: Float + Element>(a: &ArrayD<T>) -> (CellArray, CellArray) {
        let m = a.mapv(|v| split(v).0);
        let e = a.mapv(|v| split(v).1);
        (m.into(), e.into())
    }
    let ct = UFunc::Frexp.unary_result_type(input.cell_type())?;
    match input.astype(ct) {
        CellArray::Float32(a) => Ok(parts(&a)),
        CellArray::Float64(a) => Ok(parts(&a)),
        o => Err(Error::UnsupportedType { op: "frexp", cell_type: o.cell_type() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellValue;

    #[test]
    fn unary_kernels() {
        let a = CellArray::from(vec![1.0f64, 4.0, f64::NAN]);
        let r = unary(UFunc::Sqrt, &a).unwrap();
        assert_eq!(r.get(&[1]), Some(CellValue::Float64(2.0)));
        let r = unary(UFunc::Isnan, &a).unwrap();
        assert_eq!(r.to_vec::<bool>().unwrap(), vec![false, false, true]);

        let i = CellArray::from(vec![1i16, -4]);
        assert_eq!(unary(UFunc::Sqrt, &i).unwrap().cell_type(), CellType::Float32);
        assert_eq!(unary(UFunc::Negative, &i).unwrap().to_vec::<i16>().unwrap(), vec![-1, 4]);
        assert_eq!(unary(UFunc::Invert, &i).unwrap().to_vec::<i16>().unwrap(), vec![-2, 3]);
        assert!(unary(UFunc::Invert, &a).is_err());
        assert_eq!(unary(UFunc::Floor, &i).unwrap(), i);
    }

    #[test]
    fn binary_kernels() {
        let l = CellArray::from(vec![1u8, 2, 3]);
        let r = CellArray::from_value(CellValue::Int8(-1));
        let s = binary(UFunc::Add, &l, &r).unwrap();
        assert_eq!(s.cell_type(), CellType::Int16);
        assert_eq!(s.to_vec::<i16>().unwrap(), vec![0, 1, 2]);

        let d = binary(UFunc::TrueDivide, &l, &CellArray::from(vec![2u8])).unwrap();
        assert_eq!(d.to_vec::<f64>().unwrap(), vec![0.5, 1.0, 1.5]);

        let c = binary(UFunc::Less, &l, &CellArray::from(vec![2.5f32])).unwrap();
        assert_eq!(c.to_vec::<bool>().unwrap(), vec![true, true, false]);

        let b = binary(UFunc::BitwiseXor, &l, &CellArray::from(vec![1u8])).unwrap();
        assert_eq!(b.to_vec::<u8>().unwrap(), vec![0, 3, 2]);

        let t = CellArray::from(vec![true, false]);
        assert_eq!(binary(UFunc::Add, &t, &t).unwrap().cell_type(), CellType::Bool);
        assert!(binary(UFunc::Subtract, &t, &t).is_err());
        assert_eq!(binary(UFunc::Power, &t, &t).unwrap().cell_type(), CellType::Int8);
    }

    #[test]
    fn integer_edge_cases() {
        let l = CellArray::from(vec![7i32, -7]);
        let z = CellArray::from(vec![0i32]);
        assert_eq!(binary(UFunc::FloorDivide, &l, &z).unwrap().to_vec::<i32>().unwrap(), vec![0, 0]);
        let neg = CellArray::from(vec![-1i32]);
        assert!(binary(UFunc::Power, &l, &neg).is_err());
        let two = CellArray::from(vec![2i32]);
        assert_eq!(binary(UFunc::Remainder, &l, &two).unwrap().to_vec::<i32>().unwrap(), vec![1, 1]);
        assert_eq!(binary(UFunc::Fmod, &l, &two).unwrap().to_vec::<i32>().unwrap(), vec![1, -1]);
    }

    #[test]
    fn broadcasting() {
        let col = CellArray::from_vec(&[2, 1], vec![1.0f64, 2.0]).unwrap();
        let row = CellArray::from(vec![10.0f64, 20.0, 30.0]);
        let r = binary(UFunc::Multiply, &col, &row).unwrap();
        assert_eq!(r.shape(), &[2, 3]);
        assert_eq!(r.to_vec::<f64>().unwrap(), vec![10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);
        assert!(binary(UFunc::Add, &row, &CellArray::from(vec![1.0f64, 2.0])).is_err());
    }

    #[test]
    fn two_outputs() {
        let a = CellArray::from(vec![2.5f64, -1.25, 8.0]);
        let (frac, int) = modf(&a).unwrap();
        assert_eq!(frac.to_vec::<f64>().unwrap(), vec![0.5, -0.25, 0.0]);
        assert_eq!(int.to_vec::<f64>().unwrap(), vec![2.0, -1.0, 8.0]);

        let (m, e) = frexp(&a).unwrap();
        assert_eq!(m.to_vec::<f64>().unwrap(), vec![0.625, -0.625, 0.5]);
        assert_eq!(e.to_vec::<i32>().unwrap(), vec![2, 1, 4]);
    }
}
