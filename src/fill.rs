/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Values substituted for masked cells before a plain kernel runs.

use crate::{with_et, CellType, CellValue, Element};

/// Which extremum a fill should never win.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MinMax {
    /// Fill with [`min_filler`], so masked cells never win a `min`.
    Min,
    /// Fill with [`max_filler`], so masked cells never win a `max`.
    Max,
}

/// How masked cells are replaced when producing plain data.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Fill {
    /// Zero of the cell type. Never NaN.
    #[default]
    Default,
    /// An explicit value, cast to the cell type.
    Value(CellValue),
    /// One of the extremum fillers.
    Extremum(MinMax),
}

impl Fill {
    /// Resolve the concrete value used for `cell_type`.
    pub fn resolve(&self, cell_type: CellType) -> CellValue {
        match self {
            Fill::Default => cell_type.zero(),
            Fill::Value(v) => v.cast(cell_type),
            Fill::Extremum(MinMax::Max) => max_filler(cell_type),
            Fill::Extremum(MinMax::Min) => min_filler(cell_type),
        }
    }
}

impl From<CellValue> for Fill {
    fn from(value: CellValue) -> Self {
        Fill::Value(value)
    }
}

impl From<MinMax> for Fill {
    fn from(value: MinMax) -> Self {
        Fill::Extremum(value)
    }
}

macro_rules! fill_from {
    ($( ($id:ident, $p:ident) ),*) => { $(
        impl From<$p> for Fill {
            fn from(value: $p) -> Self {
                Fill::Value(CellValue::$id(value))
            }
        }
    )* };
}
with_et!(fill_from);

/// Value that never wins a `max` comparison: `-inf`, the type minimum, or `false`.
pub fn max_filler(cell_type: CellType) -> CellValue {
    macro_rules! filler {
        ($( ($id:ident, $p:ident) ),*) => {
            match cell_type {
                $( CellType::$id => CellValue::$id(<$p as Element>::MAX_FILLER), )*
            }
        };
    }
    with_et!(filler)
}

/// Value that never wins a `min` comparison: `+inf`, the type maximum, or `true`.
pub fn min_filler(cell_type: CellType) -> CellValue {
    macro_rules! filler {
        ($( ($id:ident, $p:ident) ),*) => {
            match cell_type {
                $( CellType::$id => CellValue::$id(<$p as Element>::MIN_FILLER), )*
            }
        };
    }
    with_et!(filler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fillers() {
        assert_eq!(max_filler(CellType::Float32), CellValue::Float32(f32::NEG_INFINITY));
        assert_eq!(min_filler(CellType::Float64), CellValue::Float64(f64::INFINITY));
        assert_eq!(max_filler(CellType::Int16), CellValue::Int16(i16::MIN));
        assert_eq!(min_filler(CellType::UInt8), CellValue::UInt8(u8::MAX));
        assert_eq!(max_filler(CellType::Bool), CellValue::Bool(false));
        assert_eq!(min_filler(CellType::Bool), CellValue::Bool(true));
    }

    #[test]
    fn resolution() {
        assert_eq!(Fill::Default.resolve(CellType::Float64), CellValue::Float64(0.0));
        assert!(!Fill::Default.resolve(CellType::Float64).is_nan());
        assert_eq!(Fill::from(7.9).resolve(CellType::Int8), CellValue::Int8(7));
        assert_eq!(
            Fill::from(MinMax::Min).resolve(CellType::Int32),
            CellValue::Int32(i32::MAX)
        );
    }
}
