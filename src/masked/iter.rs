/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use crate::{CellValue, Flavor, MaskedArray, MaskedScalar};

/// Flat iterator over the cells of a [`MaskedArray`] in logical order.
pub struct MaskedIter<'a> {
    data: Box<dyn Iterator<Item = CellValue> + 'a>,
    mask: Box<dyn Iterator<Item = bool> + 'a>,
    flavor: Flavor,
}

impl Iterator for MaskedIter<'_> {
    type Item = MaskedScalar;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.data.next()?;
        let mask = self.mask.next()?;
        Some(MaskedScalar::new(value, mask).with_flavor(self.flavor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.data.size_hint()
    }
}

impl MaskedArray {
    /// Iterate over every cell as a [`MaskedScalar`].
    pub fn iter(&self) -> MaskedIter<'_> {
        MaskedIter {
            data: self.data().iter(),
            mask: Box::new(self.mask().iter()),
            flavor: self.flavor(),
        }
    }

    /// Values of the unmasked cells only.
    pub fn compressed(&self) -> impl Iterator<Item = CellValue> + '_ {
        self.iter().filter_map(|s| s.value())
    }
}

impl<'a> IntoIterator for &'a MaskedArray {
    type Item = MaskedScalar;
    type IntoIter = MaskedIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
