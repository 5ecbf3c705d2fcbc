/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Plain (mask-unaware) elementwise kernels over [`CellArray`].
//!
//! The masked layer neutralizes masked cells first and then runs these kernels on data only.

mod elementwise;
mod reduce;

pub use elementwise::*;
pub use reduce::*;

use crate::error::{Error, Result};
use crate::fill::{max_filler, min_filler};
use crate::{CellType, CellValue, Kind};
use paste::paste;

/// Generates [`UFunc`] along with its name and arity tables.
macro_rules! ufuncs {
    (unary: $($u:ident),*; binary: $($b:ident),*; multi: $($m:ident),*) => { paste! {
        /// Elementwise kernels ("universal functions").
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum UFunc {
            $($u,)*
            $($b,)*
            $($m,)*
        }

        impl UFunc {
            /// Every single-input, single-output kernel.
            pub const UNARY: &'static [UFunc] = &[$(UFunc::$u),*];
            /// Every two-input kernel.
            pub const BINARY: &'static [UFunc] = &[$(UFunc::$b),*];
            /// Kernels with more than one output.
            pub const MULTI: &'static [UFunc] = &[$(UFunc::$m),*];

            /// Lower snake case name, e.g. `true_divide`.
            pub fn name(self) -> &'static str {
                match self {
                    $(UFunc::$u => stringify!([<$u:snake>]),)*
                    $(UFunc::$b => stringify!([<$b:snake>]),)*
                    $(UFunc::$m => stringify!([<$m:snake>]),)*
                }
            }

            /// Number of inputs.
            pub fn arity(self) -> usize {
                match self {
                    $(UFunc::$b => 2,)*
                    _ => 1,
                }
            }
        }
    }};
}

ufuncs! {
    unary: Exp, Sin, Cos, Tan, Arcsin, Arccos, Arctan, Arcsinh, Arccosh, Arctanh, Sinh, Cosh,
        Tanh, Sqrt, Log, Log2, Log10, Absolute, Fabs, Negative, Floor, Ceil, LogicalNot,
        Isfinite, Isinf, Isnan, Invert, Conjugate;
    binary: Add, Subtract, Multiply, TrueDivide, FloorDivide, Remainder, Fmod, Power, Arctan2,
        Hypot, Maximum, Minimum, Equal, NotEqual, Less, LessEqual, Greater, GreaterEqual,
        LogicalAnd, LogicalOr, LogicalXor, BitwiseAnd, BitwiseOr, BitwiseXor;
    multi: Modf, Frexp
}

impl UFunc {
    pub fn is_unary(self) -> bool {
        Self::UNARY.contains(&self)
    }

    pub fn is_binary(self) -> bool {
        self.arity() == 2
    }

    pub fn is_comparison(self) -> bool {
        use UFunc::*;
        matches!(self, Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual)
    }

    pub fn is_logical(self) -> bool {
        use UFunc::*;
        matches!(self, LogicalAnd | LogicalOr | LogicalXor)
    }

    pub fn is_bitwise(self) -> bool {
        use UFunc::*;
        matches!(self, BitwiseAnd | BitwiseOr | BitwiseXor)
    }

    /// Determine if the kernel always produces a floating point result.
    fn is_transcendental(self) -> bool {
        use UFunc::*;
        matches!(
            self,
            Exp | Sin
                | Cos
                | Tan
                | Arcsin
                | Arccos
                | Arctan
                | Arcsinh
                | Arccosh
                | Arctanh
                | Sinh
                | Cosh
                | Tanh
                | Sqrt
                | Log
                | Log2
                | Log10
                | Fabs
        )
    }

    /// Value `v` such that `op(v, x) == x` for every `x` of `cell_type`.
    ///
    /// Kernels without an identity cannot be reduced over masked input.
    pub fn identity(self, cell_type: CellType) -> Option<CellValue> {
        use UFunc::*;
        match self {
            Add | LogicalOr | LogicalXor | BitwiseOr | BitwiseXor | Hypot => Some(cell_type.zero()),
            Multiply | LogicalAnd => Some(cell_type.one()),
            BitwiseAnd => Some(CellValue::Int64(-1).cast(cell_type)),
            Maximum => Some(max_filler(cell_type)),
            Minimum => Some(min_filler(cell_type)),
            _ => None,
        }
    }

    /// The cell type both operands are converted to before the kernel runs.
    pub fn operand_type(self, lhs: CellType, rhs: CellType) -> Result<CellType> {
        use UFunc::*;
        let u = lhs.union(rhs);
        let unsupported = || Err(Error::UnsupportedType { op: self.name(), cell_type: u });
        match self {
            _ if self.is_logical() => Ok(CellType::Bool),
            _ if self.is_bitwise() && u.is_float() => unsupported(),
            Subtract if u.is_bool() => unsupported(),
            TrueDivide if !u.is_float() => Ok(CellType::Float64),
            Arctan2 | Hypot => Ok(u.float_promoted()),
            Power | FloorDivide | Remainder | Fmod if u.is_bool() => Ok(CellType::Int8),
            _ => Ok(u),
        }
    }

    /// The cell type of the result of applying `self` to operands of `lhs` and `rhs`.
    pub fn result_type(self, lhs: CellType, rhs: CellType) -> Result<CellType> {
        if self.is_comparison() {
            // Still validates the pairing.
            self.operand_type(lhs, rhs).map(|_| CellType::Bool)
        } else {
            self.operand_type(lhs, rhs)
        }
    }

    /// The cell type of the result of applying the unary kernel `self` to `input`.
    pub fn unary_result_type(self, input: CellType) -> Result<CellType> {
        use UFunc::*;
        let unsupported = || Err(Error::UnsupportedType { op: self.name(), cell_type: input });
        match self {
            Isfinite | Isinf | Isnan | LogicalNot => Ok(CellType::Bool),
            Negative if input.is_bool() => unsupported(),
            Invert if input.is_float() => unsupported(),
            _ if self.is_transcendental() => Ok(input.float_promoted()),
            Modf => Ok(input.float_promoted()),
            Frexp if input.kind() != Kind::Float => Ok(input.float_promoted()),
            _ => Ok(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(UFunc::TrueDivide.name(), "true_divide");
        assert_eq!(UFunc::Log10.name(), "log10");
        assert_eq!(UFunc::Modf.name(), "modf");
        assert!(UFunc::BINARY.iter().all(|u| u.arity() == 2));
        assert!(UFunc::UNARY.iter().all(|u| u.is_unary()));
    }

    #[test]
    fn identities() {
        assert_eq!(UFunc::Add.identity(CellType::Float32), Some(CellValue::Float32(0.0)));
        assert_eq!(UFunc::Multiply.identity(CellType::Int8), Some(CellValue::Int8(1)));
        assert_eq!(UFunc::BitwiseAnd.identity(CellType::UInt8), Some(CellValue::UInt8(255)));
        assert_eq!(UFunc::LogicalAnd.identity(CellType::Bool), Some(CellValue::Bool(true)));
        assert_eq!(
            UFunc::Maximum.identity(CellType::Float64),
            Some(CellValue::Float64(f64::NEG_INFINITY))
        );
        assert_eq!(UFunc::Subtract.identity(CellType::Int32), None);
        assert_eq!(UFunc::Power.identity(CellType::Int32), None);
    }

    #[test]
    fn result_types() {
        use CellType::*;
        assert_eq!(UFunc::TrueDivide.result_type(Int32, Int32).unwrap(), Float64);
        assert_eq!(UFunc::Add.result_type(UInt8, Int8).unwrap(), Int16);
        assert_eq!(UFunc::Less.result_type(Float32, Int64).unwrap(), Bool);
        assert_eq!(UFunc::Arctan2.result_type(Int8, Int8).unwrap(), Float32);
        assert!(UFunc::BitwiseOr.result_type(Float32, Int8).is_err());
        assert!(UFunc::Subtract.result_type(Bool, Bool).is_err());
        assert_eq!(UFunc::Sqrt.unary_result_type(Int32).unwrap(), Float64);
        assert_eq!(UFunc::Isnan.unary_result_type(Float32).unwrap(), Bool);
        assert!(UFunc::Negative.unary_result_type(Bool).is_err());
    }
}
