/*
 * Copyright (c) 2023. Astraea, Inc. All rights reserved.
 */

use std::fmt::{Debug, Formatter};

const EDGE: usize = 5;

/// `Debug` adapter that prints only the head and tail of long sequences.
pub(crate) struct Elided<'a, T>(pub &'a [T]);

impl<T: Debug> Debug for Elided<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let items = self.0;
        if items.len() <= EDGE * 2 {
            return f.debug_list().entries(items).finish();
        }
        f.write_str("[")?;
        for v in &items[..EDGE] {
            write!(f, "{v:?}, ")?;
        }
        f.write_str("...")?;
        for v in &items[items.len() - EDGE..] {
            write!(f, ", {v:?}")?;
        }
        f.write_str("]")
    }
}
