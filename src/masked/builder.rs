/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::array::Order;
use crate::error::{ConstructionError, Result};
use crate::{CellArray, CellType, Flavor, Literal, Mask, MaskedArray, MaskedInput, MaskedScalar};
use ndarray::Axis;

/// Input accepted by [`MaskedArray::builder`].
#[derive(Debug, Clone)]
pub enum Source {
    Literal(Literal),
    Plain(CellArray),
    Masked(MaskedArray),
    Scalar(MaskedScalar),
    Sentinel,
}

impl From<Literal> for Source {
    fn from(value: Literal) -> Self {
        Source::Literal(value)
    }
}

impl From<CellArray> for Source {
    fn from(value: CellArray) -> Self {
        Source::Plain(value)
    }
}

impl From<MaskedArray> for Source {
    fn from(value: MaskedArray) -> Self {
        Source::Masked(value)
    }
}

/// Borrowed masked arrays are copied.
impl From<&MaskedArray> for Source {
    fn from(value: &MaskedArray) -> Self {
        Source::Masked(value.clone())
    }
}

impl From<MaskedScalar> for Source {
    fn from(value: MaskedScalar) -> Self {
        Source::Scalar(value)
    }
}

impl From<MaskedInput> for Source {
    fn from(_: MaskedInput) -> Self {
        Source::Sentinel
    }
}

impl<L: Into<Literal>> From<Vec<L>> for Source {
    fn from(value: Vec<L>) -> Self {
        Source::Literal(value.into())
    }
}

/// Step-wise construction of a [`MaskedArray`]. See [`MaskedArray::builder`].
#[derive(Debug, Clone)]
pub struct MaskedArrayBuilder {
    source: Source,
    mask: Option<Mask>,
    dtype: Option<CellType>,
    copy: bool,
    order: Order,
    ndmin: usize,
    flavor: Option<Flavor>,
}

impl MaskedArray {
    /// Start building a masked array from `source`.
    ///
    /// ```
    /// use masked_cells::{CellArray, CellType, MaskedArray, Mask};
    /// let a = MaskedArray::builder(CellArray::from(vec![1u8, 2, 3]))
    ///     .mask(Mask::from_vec(vec![false, true, false]))
    ///     .dtype(CellType::Float32)
    ///     .ndmin(2)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(a.shape(), &[1, 3]);
    /// assert_eq!(a.dtype(), CellType::Float32);
    /// ```
    pub fn builder(source: impl Into<Source>) -> MaskedArrayBuilder {
        MaskedArrayBuilder {
            source: source.into(),
            mask: None,
            dtype: None,
            copy: false,
            order: Order::Keep,
            ndmin: 0,
            flavor: None,
        }
    }
}

impl MaskedArrayBuilder {
    /// Extra mask, broadcast to the data and combined with any mask the source carries.
    pub fn mask(mut self, mask: impl Into<Mask>) -> Self {
        self.mask = Some(mask.into());
        self
    }

    pub fn dtype(mut self, dtype: CellType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Force fresh, contiguous storage rather than reusing the source's.
    pub fn copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Minimum number of dimensions; unit axes are prepended as needed.
    pub fn ndmin(mut self, ndmin: usize) -> Self {
        self.ndmin = ndmin;
        self
    }

    pub fn flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn build(self) -> Result<MaskedArray> {
        let Self { source, mask, dtype, copy, order, ndmin, flavor } = self;
        let mut array = match source {
            Source::Sentinel if mask.is_some() => {
                return Err(ConstructionError::SentinelWithMask.into())
            }
            Source::Sentinel => {
                let ct = dtype.ok_or(ConstructionError::AmbiguousDtype)?;
                MaskedArray::masked_all(&[], ct)
            }
            Source::Literal(lit) if mask.is_some() && lit.contains_sentinel() => {
                return Err(ConstructionError::SentinelWithMask.into())
            }
            Source::Literal(lit) => merge(MaskedArray::from_literal(lit, dtype)?, mask)?,
            Source::Plain(data) => match mask {
                Some(m) => MaskedArray::new(data, m)?,
                None => MaskedArray::from_data(data),
            },
            Source::Masked(m) => merge(m, mask)?,
            Source::Scalar(s) => merge(s.to_array(), mask)?,
        };
        if let Some(ct) = dtype {
            if ct != array.dtype() {
                array = array.astype(ct);
            }
        }
        if array.ndim() < ndmin {
            let flavor = array.flavor();
            let (mut data, mask) = array.into_parts();
            let mut mask = mask.into_array();
            while data.ndim() < ndmin {
                data = data.insert_axis(0);
                mask = mask.insert_axis(Axis(0));
            }
            array = MaskedArray::from_parts(data, Mask::new(mask), flavor);
        }
        let order = match (copy, order) {
            (true, Order::Keep) => Order::C,
            (_, o) => o,
        };
        if copy || order != Order::Keep {
            array = array.with_order(order);
        }
        if let Some(f) = flavor {
            array = array.with_flavor(f);
        }
        Ok(array)
    }
}

/// OR `extra` into the mask `array` already carries.
fn merge(array: MaskedArray, extra: Option<Mask>) -> Result<MaskedArray> {
    let Some(extra) = extra else {
        return Ok(array);
    };
    let flavor = array.flavor();
    let (data, mask) = array.into_parts();
    let extra = extra.broadcast_to(data.shape()).map_err(|_| ConstructionError::MaskShape {
        data: data.shape().to_vec(),
        mask: extra.shape().to_vec(),
    })?;
    Ok(MaskedArray::from_parts(data, mask | extra, flavor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::{masked_array, X};

    #[test]
    fn sentinel_source() {
        let a = MaskedArray::builder(X).dtype(CellType::Int8).build().unwrap();
        assert_eq!(a.ndim(), 0);
        assert_eq!(a.count_masked(), 1);
        assert!(matches!(
            MaskedArray::builder(X).build(),
            Err(Error::Construction(ConstructionError::AmbiguousDtype))
        ));
    }

    #[test]
    fn masks_combine() {
        let src = masked_array![1, X, 3];
        let a = MaskedArray::builder(&src)
            .mask(Mask::from_vec(vec![true, false, false]))
            .build()
            .unwrap();
        assert_eq!(a.mask(), &Mask::from_vec(vec![true, true, false]));
        assert_eq!(src.count_masked(), 1);
    }

    #[test]
    fn sentinel_with_mask() {
        let r = MaskedArray::builder(vec![Literal::from(1), X.into()])
            .mask(Mask::fill(&[], true))
            .build();
        assert!(matches!(
            r,
            Err(Error::Construction(ConstructionError::SentinelWithMask))
        ));
    }

    #[test]
    fn options() {
        let data = CellArray::from_vec(&[2, 3], (0..6).collect::<Vec<i32>>()).unwrap();
        let a = MaskedArray::builder(data)
            .mask(Mask::from_vec(vec![false, false, true]))
            .order(Order::F)
            .ndmin(3)
            .flavor(Flavor::Grid)
            .build()
            .unwrap();
        assert_eq!(a.shape(), &[1, 2, 3]);
        assert_eq!(a.count_masked(), 2);
        assert_eq!(a.flavor(), Flavor::Grid);
        assert_eq!(a.data().to_vec::<i32>().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }
}
