/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::array::Order;
use crate::{CellArray, CellType, CellValue, Fill};

/// Which end of a run of equal values `searchsorted` reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// How `quantile` picks a value between two neighbouring samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum QuantileMethod {
    #[default]
    Linear,
    Lower,
    Higher,
    Midpoint,
    Nearest,
}

/// Which part of a full discrete convolution is kept.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConvolveMode {
    /// Every point of overlap.
    Full,
    /// As long as the longer input, centered on the full result.
    Same,
    /// Only points where the inputs overlap completely.
    Valid,
}

/// How `meshgrid` orders the axes of its outputs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Indexing {
    /// Cartesian: the first two output axes are swapped.
    #[default]
    Xy,
    /// Matrix: output axis `i` follows input `i`.
    Ij,
}

/// Where `split` and `array_split` cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sections {
    /// This many parts, as equal as possible.
    Count(usize),
    /// Cut before each of these positions.
    At(Vec<isize>),
}

/// Keyword arguments of a dispatched call. Unset entries take the operation's default.
///
/// An unset `axis` means the flattened array. `offset` doubles as the diagonal offset,
/// the shift of `roll` and the position of `insert`; `n` as the order of `diff` and the
/// count of `repeat`. An unset `ddof` is zero, except for `cov`, where it follows `bias`.
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub axis: Option<isize>,
    pub axes: Option<Vec<isize>>,
    pub keepdims: bool,
    pub ddof: Option<usize>,
    pub q: Vec<f64>,
    pub kth: Vec<usize>,
    pub side: Side,
    pub method: QuantileMethod,
    pub mode: Option<ConvolveMode>,
    /// `einsum` subscripts, e.g. `"ij,jk->ik"`.
    pub subscripts: String,
    pub shape: Vec<usize>,
    pub offset: isize,
    pub n: usize,
    pub decimals: i32,
    pub indices: Vec<isize>,
    pub bins: usize,
    pub range: Option<(f64, f64)>,
    pub minlength: usize,
    pub dtype: Option<CellType>,
    pub order: Order,
    pub fill: Fill,
    pub value: Option<CellValue>,
    pub bounds: (Option<CellValue>, Option<CellValue>),
    pub right: bool,
    pub returned: bool,
    pub return_index: bool,
    pub return_inverse: bool,
    pub return_counts: bool,
    pub reps: Vec<usize>,
    pub sections: Option<Sections>,
    pub indexing: Indexing,
    pub rowvar: bool,
    pub bias: bool,
    pub rtol: f64,
    pub atol: f64,
    pub equal_nan: bool,
    /// Replacements for NaN, positive and negative infinity in `nan_to_num`.
    pub nan: f64,
    pub posinf: Option<f64>,
    pub neginf: Option<f64>,
    /// Integer frequency and reliability weights of the observations in `cov`.
    pub fweights: Option<CellArray>,
    pub aweights: Option<CellArray>,
}

macro_rules! setters {
    ($($name:ident: $t:ty),* $(,)?) => {
        impl Params {
            $(
                pub fn $name(mut self, $name: $t) -> Self {
                    self.$name = $name;
                    self
                }
            )*
        }
    };
}

setters! {
    keepdims: bool,
    kth: Vec<usize>,
    side: Side,
    method: QuantileMethod,
    shape: Vec<usize>,
    offset: isize,
    n: usize,
    decimals: i32,
    indices: Vec<isize>,
    bins: usize,
    minlength: usize,
    order: Order,
    fill: Fill,
    right: bool,
    returned: bool,
    return_index: bool,
    return_inverse: bool,
    return_counts: bool,
    reps: Vec<usize>,
    indexing: Indexing,
    rowvar: bool,
    bias: bool,
    equal_nan: bool,
}

impl Params {
    pub fn new() -> Self {
        Self { bins: 10, n: 1, rowvar: true, rtol: 1e-5, atol: 1e-8, ..Default::default() }
    }

    pub fn ddof(mut self, ddof: usize) -> Self {
        self.ddof = Some(ddof);
        self
    }

    pub fn sections(mut self, sections: Sections) -> Self {
        self.sections = Some(sections);
        self
    }

    /// Relative and absolute tolerances for `isclose`.
    pub fn tolerance(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn observation_weights(mut self, fweights: Option<CellArray>, aweights: Option<CellArray>) -> Self {
        self.fweights = fweights;
        self.aweights = aweights;
        self
    }

    pub fn replacements(mut self, nan: f64, posinf: Option<f64>, neginf: Option<f64>) -> Self {
        self.nan = nan;
        self.posinf = posinf;
        self.neginf = neginf;
        self
    }

    pub fn subscripts(mut self, subscripts: impl Into<String>) -> Self {
        self.subscripts = subscripts.into();
        self
    }

    pub fn mode(mut self, mode: ConvolveMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn axis(mut self, axis: isize) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Several axes, for operations that take more than one (e.g. `swapaxes`, `tensordot`).
    pub fn axes(mut self, axes: Vec<isize>) -> Self {
        self.axes = Some(axes);
        self
    }

    /// One quantile, or several via [`Self::qs`].
    pub fn q(mut self, q: f64) -> Self {
        self.q = vec![q];
        self
    }

    pub fn qs(mut self, q: Vec<f64>) -> Self {
        self.q = q;
        self
    }

    pub fn range(mut self, lo: f64, hi: f64) -> Self {
        self.range = Some((lo, hi));
        self
    }

    pub fn dtype(mut self, dtype: CellType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn value(mut self, value: impl Into<CellValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Lower and upper limits for `clip`.
    pub fn bounds(mut self, lo: Option<CellValue>, hi: Option<CellValue>) -> Self {
        self.bounds = (lo, hi);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = Params::new();
        assert_eq!(p.axis, None);
        assert_eq!(p.bins, 10);
        assert_eq!(p.n, 1);
        let p = p.axis(-1).keepdims(true).ddof(1).q(0.25);
        assert_eq!(p.axis, Some(-1));
        assert!(p.keepdims);
        assert_eq!(p.q, vec![0.25]);
        assert_eq!(p.ddof, Some(1));
        assert!(p.rowvar);
        assert_eq!((p.rtol, p.atol), (1e-5, 1e-8));
    }
}
