#![no_std]

extern crate alloc;

use alloc::collections::BTreeSet;
use core::fmt;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use autoplay::*;
pub use error::*;
pub use generator::*;
pub use knowledge::*;
pub use types::*;

mod autoplay;
mod error;
mod generator;
mod knowledge;
mod types;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord2,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, mines: CellCount) -> Self {
        Self { size, mines }
    }

    pub fn new((height, width): Coord2, mines: CellCount) -> Self {
        let height = height.clamp(1, Coord::MAX);
        let width = width.clamp(1, Coord::MAX);
        let mines = mines.min(mult(height, width));
        Self::new_unchecked((height, width), mines)
    }

    /// Like [`GameConfig::new`], but rejects layouts that do not fit instead of clamping them.
    pub fn try_new(size: Coord2, mines: CellCount) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(GameError::OutOfBounds(size));
        }
        if mines > mult(size.0, size.1) {
            return Err(GameError::TooManyMines);
        }
        Ok(Self::new_unchecked(size, mines))
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new_unchecked((8, 8), 8)
    }
}

/// Where the mines are. This is the environment the player reasons about, never shown to the knowledge base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Minefield {
    mine_mask: Array2<bool>,
    mine_count: CellCount,
}

impl Minefield {
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mine_count = mine_mask
            .iter()
            .filter(|&&is_mine| is_mine)
            .count()
            .try_into()
            .unwrap_or(CellCount::MAX);
        Self {
            mine_mask,
            mine_count,
        }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if !in_bounds(coords, size) {
                return Err(GameError::OutOfBounds(coords));
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn game_config(&self) -> GameConfig {
        GameConfig::new_unchecked(self.size(), self.mine_count)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if in_bounds(coords, self.size()) {
            Ok(coords)
        } else {
            Err(GameError::OutOfBounds(coords))
        }
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.mine_mask.dim();
        (
            dim.0.try_into().unwrap_or(Coord::MAX),
            dim.1.try_into().unwrap_or(Coord::MAX),
        )
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        self.mine_mask.len().try_into().unwrap_or(CellCount::MAX)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    /// Mines within one row and column of `coords`, not counting `coords` itself.
    pub fn adjacent_mine_count(&self, coords: Coord2) -> u8 {
        let count = self
            .mine_mask
            .iter_neighbors(coords)
            .filter(|&pos| self[pos])
            .count();
        // at most eight neighbours
        count as u8
    }

    pub fn mines(&self) -> BTreeSet<Coord2> {
        iter_cells(self.size())
            .filter(|&coords| self[coords])
            .collect()
    }

    /// Whether `flags` marks exactly the mines of this field.
    pub fn is_won(&self, flags: &BTreeSet<Coord2>) -> bool {
        flags.len() == usize::from(self.mine_count)
            && flags
                .iter()
                .all(|&coords| in_bounds(coords, self.size()) && self[coords])
    }
}

impl Index<Coord2> for Minefield {
    type Output = bool;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.mine_mask[coords.to_nd_index()]
    }
}

impl fmt::Display for Minefield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (height, width) = self.size();

        for row in 0..height {
            write_border(f, width)?;
            for col in 0..width {
                f.write_str(if self[(row, col)] { "|X" } else { "| " })?;
            }
            f.write_str("|\n")?;
        }
        write_border(f, width)
    }
}

fn write_border(f: &mut fmt::Formatter<'_>, width: Coord) -> fmt::Result {
    for _ in 0..width {
        f.write_str("--")?;
    }
    f.write_str("-\n")
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn from_update(updated: bool) -> Self {
        if updated { Self::Changed } else { Self::NoChange }
    }
}
