/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

//! Masked array flavors and the rules for picking the flavor of a result.

use crate::dispatch::Operand;
use crate::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Variant of masked array. Every flavor except [`Flavor::Base`] derives from exactly one parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Flavor {
    #[default]
    Base,
    /// Regularly gridded rasters.
    Grid,
    /// One-dimensional sequences sampled over time.
    Series,
}

impl Flavor {
    pub fn parent(self) -> Option<Flavor> {
        match self {
            Flavor::Base => None,
            Flavor::Grid | Flavor::Series => Some(Flavor::Base),
        }
    }

    /// `self` followed by each ancestor, ending at [`Flavor::Base`].
    pub fn lineage(self) -> impl Iterator<Item = Flavor> {
        std::iter::successors(Some(self), |f| f.parent())
    }

    /// Determine if `self` is `other` or derives from it.
    pub fn derives_from(self, other: Flavor) -> bool {
        self.lineage().any(|f| f == other)
    }

    /// The more derived of `self` and `other`, if they share a lineage.
    pub fn most_derived(self, other: Flavor) -> Result<Flavor> {
        if self.derives_from(other) {
            Ok(self)
        } else if other.derives_from(self) {
            Ok(other)
        } else {
            Err(Error::AmbiguousType {
                left: MaskedType::array(self).to_string(),
                right: MaskedType::array(other).to_string(),
            })
        }
    }
}

/// A concrete masked type: a flavor in either its array or its scalar form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MaskedType {
    pub flavor: Flavor,
    pub scalar: bool,
}

impl MaskedType {
    pub fn array(flavor: Flavor) -> Self {
        Self { flavor, scalar: false }
    }

    pub fn scalar(flavor: Flavor) -> Self {
        Self { flavor, scalar: true }
    }

    /// Scalars are resolved as their array counterpart.
    pub fn as_array(self) -> Self {
        Self::array(self.flavor)
    }
}

impl Display for MaskedType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.flavor {
            Flavor::Base => "",
            Flavor::Grid => "Grid",
            Flavor::Series => "Series",
        };
        let kind = if self.scalar { "MaskedScalar" } else { "MaskedArray" };
        write!(f, "{prefix}{kind}")
    }
}

/// Reduce a set of flavors to the single most derived one.
pub fn resolve_flavors(flavors: impl IntoIterator<Item = Flavor>) -> Result<Flavor> {
    flavors
        .into_iter()
        .try_fold(None, |acc: Option<Flavor>, f| match acc {
            None => Ok(Some(f)),
            Some(a) => a.most_derived(f).map(Some),
        })
        .map(|f| f.unwrap_or_default())
}

/// Pick the masked array flavor for an operation over `operands`.
///
/// Plain arrays, plain values, the sentinel and foreign arrays do not take part.
/// Nested lists are searched recursively. With no masked operand the result is
/// [`Flavor::Base`].
pub fn resolve(operands: &[Operand<'_>]) -> Result<Flavor> {
    fn collect(ops: &[Operand<'_>], out: &mut Vec<MaskedType>) {
        for op in ops {
            match op {
                Operand::Array(a) => out.push(MaskedType::array(a.flavor())),
                Operand::Scalar(s) => out.push(MaskedType::scalar(s.flavor()).as_array()),
                Operand::List(items) => collect(items, out),
                _ => {}
            }
        }
    }
    let mut found = Vec::new();
    collect(operands, &mut found);
    resolve_flavors(found.into_iter().map(|t| t.flavor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{masked_array, MaskedScalar, X};

    #[test]
    fn lineage() {
        assert!(Flavor::Grid.derives_from(Flavor::Base));
        assert!(!Flavor::Base.derives_from(Flavor::Grid));
        assert_eq!(Flavor::Series.lineage().count(), 2);
    }

    #[test]
    fn most_derived_wins() {
        assert_eq!(resolve_flavors([Flavor::Base, Flavor::Grid]).unwrap(), Flavor::Grid);
        assert_eq!(resolve_flavors([]).unwrap(), Flavor::Base);
        assert!(matches!(
            resolve_flavors([Flavor::Grid, Flavor::Series]),
            Err(Error::AmbiguousType { .. })
        ));
    }

    #[test]
    fn operands() {
        let a = masked_array![1, 2].with_flavor(Flavor::Grid);
        let s = MaskedScalar::new(3i32, false);
        let ops = [
            Operand::from(&s),
            Operand::List(vec![Operand::from(&a), Operand::from(X)]),
            Operand::from(2.0),
        ];
        assert_eq!(resolve(&ops).unwrap(), Flavor::Grid);
        assert_eq!(resolve(&[Operand::from(1u8)]).unwrap(), Flavor::Base);
    }

    #[test]
    fn display() {
        assert_eq!(MaskedType::scalar(Flavor::Grid).to_string(), "GridMaskedScalar");
        assert_eq!(MaskedType::scalar(Flavor::Grid).as_array().to_string(), "GridMaskedArray");
    }
}
