use alloc::collections::BTreeSet;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::*;

/// Logical statement "exactly `count` of `cells` are mines".
///
/// The count is signed so that a contradiction narrowed out of otherwise valid input stays representable until the
/// knowledge base checks it with [`Constraint::is_consistent`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    cells: BTreeSet<Coord2>,
    count: i16,
}

impl Constraint {
    pub fn new(cells: impl IntoIterator<Item = Coord2>, count: i16) -> Self {
        Self {
            cells: cells.into_iter().collect(),
            count,
        }
    }

    pub fn cells(&self) -> &BTreeSet<Coord2> {
        &self.cells
    }

    pub fn count(&self) -> i16 {
        self.count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Coord2) -> bool {
        self.cells.contains(&cell)
    }

    /// All cells, when every remaining cell has to be a mine.
    pub fn known_mines(&self) -> BTreeSet<Coord2> {
        if !self.is_empty() && usize::try_from(self.count) == Ok(self.len()) {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// All cells, when none of them can be a mine.
    pub fn known_safes(&self) -> BTreeSet<Coord2> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    pub fn mark_mine(&mut self, cell: Coord2) -> bool {
        if self.cells.remove(&cell) {
            self.count -= 1;
            true
        } else {
            false
        }
    }

    pub fn mark_safe(&mut self, cell: Coord2) -> bool {
        self.cells.remove(&cell)
    }

    pub fn is_consistent(&self) -> bool {
        usize::try_from(self.count).is_ok_and(|count| count <= self.len())
    }

    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Cells of `outer` outside of `self`, carrying the mines `self` does not account for.
    ///
    /// Only meaningful when `self` is a subset of `outer`.
    pub(crate) fn remainder_within(&self, outer: &Self) -> Self {
        Self {
            cells: outer.cells.difference(&self.cells).copied().collect(),
            count: outer.count - self.count,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (row, col)) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({row}, {col})")?;
        }
        write!(f, "}} = {}", self.count)
    }
}
