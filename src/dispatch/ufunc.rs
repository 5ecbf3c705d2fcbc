/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use super::{decline, Dispatched, Operand, Params};
use crate::array::{normalize_axis, normalize_index};
use crate::error::{Error, Result};
use crate::kernel::UFunc;
use crate::{ops, Masked, MaskedArray};
use log::trace;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// The ways an elementwise kernel can be invoked.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UFuncMethod {
    Call,
    Reduce,
    Accumulate,
    Outer,
    ReduceAt,
    At,
}

impl Display for UFuncMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UFuncMethod::Call => "__call__",
            UFuncMethod::Reduce => "reduce",
            UFuncMethod::Accumulate => "accumulate",
            UFuncMethod::Outer => "outer",
            UFuncMethod::ReduceAt => "reduceat",
            UFuncMethod::At => "at",
        };
        f.write_str(name)
    }
}

/// Mask-aware strategy for one elementwise kernel.
pub trait MaskedUFunc: Send + Sync {
    fn kernel(&self) -> UFunc;

    /// Run `method` over `operands`.
    ///
    /// `At` works on a copy of its first operand and returns the updated copy.
    fn invoke(&self, method: UFuncMethod, operands: &[Operand<'_>], params: &Params) -> Result<Masked>;
}

fn operand<'s, 'a>(operands: &'s [Operand<'a>], i: usize) -> Result<&'s Operand<'a>> {
    operands
        .get(i)
        .ok_or_else(|| Error::invalid(format!("missing operand {i}")))
}

fn at(op: UFunc, operands: &[Operand<'_>]) -> Result<Masked> {
    let mut target = operand(operands, 0)?.to_masked(None)?.copy();
    let indices = operand(operands, 1)?.to_masked(None)?;
    ops::at(op, &mut target, &indices, operands.get(2).cloned())?;
    Ok(Masked::Array(target))
}

struct Unary(UFunc);

impl MaskedUFunc for Unary {
    fn kernel(&self) -> UFunc {
        self.0
    }

    fn invoke(&self, method: UFuncMethod, operands: &[Operand<'_>], _params: &Params) -> Result<Masked> {
        match method {
            UFuncMethod::Call => ops::apply(self.0, operands),
            UFuncMethod::At => at(self.0, operands),
            m => Err(Error::invalid(format!("{m} only supported for binary functions"))),
        }
    }
}

struct Binary(UFunc);

impl MaskedUFunc for Binary {
    fn kernel(&self) -> UFunc {
        self.0
    }

    fn invoke(&self, method: UFuncMethod, operands: &[Operand<'_>], params: &Params) -> Result<Masked> {
        let op = self.0;
        let first = || operand(operands, 0)?.to_masked(None);
        match method {
            UFuncMethod::Call => ops::apply(op, operands),
            UFuncMethod::Reduce => ops::reduce(op, &first()?, params.axis, params.keepdims),
            UFuncMethod::Accumulate => {
                Ok(Masked::Array(ops::accumulate(op, &first()?, params.axis.unwrap_or(0))?))
            }
            UFuncMethod::Outer => {
                let rhs = operand(operands, 1)?.to_masked(None)?;
                Ok(Masked::from_array(ops::outer(op, &first()?, &rhs)?))
            }
            UFuncMethod::ReduceAt => {
                let a: MaskedArray = first()?;
                let axis = params.axis.unwrap_or(0);
                let len = a.shape()[normalize_axis(axis, a.ndim())?];
                let indices = params
                    .indices
                    .iter()
                    .map(|&i| normalize_index(i, len))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Masked::Array(ops::reduceat(op, &a, &indices, axis)?))
            }
            UFuncMethod::At => at(op, operands),
        }
    }
}

static UFUNCS: Lazy<HashMap<UFunc, Box<dyn MaskedUFunc>>> = Lazy::new(|| {
    let mut table: HashMap<UFunc, Box<dyn MaskedUFunc>> = HashMap::new();
    for &op in UFunc::UNARY {
        table.insert(op, Box::new(Unary(op)));
    }
    for &op in UFunc::BINARY {
        table.insert(op, Box::new(Binary(op)));
    }
    trace!("Built masked ufunc table with {} entries", table.len());
    table
});

/// The masked strategy registered for `op`, if any.
pub fn masked_ufunc(op: UFunc) -> Option<&'static dyn MaskedUFunc> {
    UFUNCS.get(&op).map(|s| s.as_ref())
}

/// Route `method` of `op` to its masked strategy.
///
/// Kernels without a strategy (those with several outputs) and calls with operands from
/// another array family are declined. Masked cells of the outputs of a declined kernel
/// can be handled by running it on [`MaskedArray::filled`] data.
pub fn ufunc(
    op: UFunc,
    method: UFuncMethod,
    operands: &[Operand<'_>],
    params: &Params,
) -> Result<Dispatched<Masked>> {
    let Some(strategy) = masked_ufunc(op) else {
        return Ok(decline(format!("{}.{method}", op.name())));
    };
    if !operands.iter().all(Operand::is_known) {
        return Ok(decline(format!("{}.{method} with a foreign operand", op.name())));
    }
    strategy.invoke(method, operands, params).map(Dispatched::Handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ForeignArray;
    use crate::{masked_array, CellValue, X};

    #[derive(Debug)]
    struct Alien;

    impl ForeignArray for Alien {
        fn family(&self) -> &str {
            "alien"
        }
        fn shape(&self) -> &[usize] {
            &[2]
        }
    }

    fn handled(op: UFunc, method: UFuncMethod, operands: &[Operand<'_>], params: &Params) -> Masked {
        ufunc(op, method, operands, params).unwrap().into_result().unwrap()
    }

    #[test]
    fn table() {
        assert!(UFunc::UNARY.iter().chain(UFunc::BINARY).all(|&op| masked_ufunc(op).is_some()));
        assert_eq!(masked_ufunc(UFunc::Hypot).map(|s| s.kernel()), Some(UFunc::Hypot));
        for &op in UFunc::MULTI {
            let a = masked_array![0.5, X];
            let d = ufunc(op, UFuncMethod::Call, &[Operand::from(&a)], &Params::new()).unwrap();
            assert!(!d.is_handled());
        }
    }

    #[test]
    fn methods() {
        let a = masked_array![[1, X], [3, 4]];
        let p = Params::new();
        let sum = handled(UFunc::Add, UFuncMethod::Reduce, &[Operand::from(&a)], &p.clone().axis(0));
        assert_eq!(sum.into_array().mask().iter().collect::<Vec<_>>(), vec![false, false]);

        let acc = handled(UFunc::Add, UFuncMethod::Accumulate, &[Operand::from(&a)], &p.clone().axis(1));
        assert_eq!(acc.shape(), &[2, 2]);

        let v = masked_array![1, X];
        let outer = handled(UFunc::Multiply, UFuncMethod::Outer, &[Operand::from(&v), Operand::from(&v)], &p);
        assert_eq!(outer.into_array().count(), 1);

        let r = handled(
            UFunc::Add,
            UFuncMethod::ReduceAt,
            &[Operand::from(&masked_array![1, 2, X, 4])],
            &p.clone().indices(vec![0, 2]),
        );
        assert_eq!(r.into_array().data().to_vec::<i32>().unwrap(), vec![3, 4]);

        let idx = masked_array![0, 0];
        let at = handled(
            UFunc::Add,
            UFuncMethod::At,
            &[Operand::from(&v), Operand::from(&idx), Operand::from(CellValue::Int32(5))],
            &p,
        );
        assert_eq!(at.into_array().data().get(&[0]), Some(CellValue::Int32(11)));

        let neg = handled(UFunc::Negative, UFuncMethod::Call, &[Operand::from(&v)], &p);
        assert_eq!(neg.into_array().count(), 1);
        assert!(ufunc(UFunc::Negative, UFuncMethod::Reduce, &[Operand::from(&v)], &p).is_err());
    }

    #[test]
    fn foreign_operands() {
        let a = masked_array![1.0, 2.0];
        let alien = Alien;
        let ops = [Operand::from(&a), Operand::from(&alien as &dyn ForeignArray)];
        let d = ufunc(UFunc::Add, UFuncMethod::Call, &ops, &Params::new()).unwrap();
        assert_eq!(d, Dispatched::Declined("add.__call__ with a foreign operand".into()));
    }
}
