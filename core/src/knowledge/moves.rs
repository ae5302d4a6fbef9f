use alloc::vec::Vec;

use rand::Rng;

use super::KnowledgeBase;
use crate::*;

impl KnowledgeBase {
    /// A cell proven safe that has not been played yet.
    ///
    /// Which one is returned when several qualify is not part of the contract.
    pub fn safe_move(&self) -> Option<Coord2> {
        self.known_safe
            .difference(&self.moves_made)
            .next()
            .copied()
    }

    /// A uniformly chosen cell that is neither played nor known to be a mine.
    ///
    /// Carries no safety guarantee, callers should prefer [`KnowledgeBase::safe_move`].
    pub fn random_move<R: Rng>(&self, rng: &mut R) -> Option<Coord2> {
        let candidates: Vec<Coord2> = iter_cells(self.size)
            .filter(|cell| !self.known_mine.contains(cell) && !self.moves_made.contains(cell))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        Some(candidates[rng.random_range(0..candidates.len())])
    }
}
