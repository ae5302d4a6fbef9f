use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

pub use constraint::*;

use crate::*;

mod constraint;
mod moves;

/// How much subset resolution runs per recorded observation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisMode {
    /// One pairwise sweep, followed by propagation.
    SinglePass,
    /// Sweep and propagate again until a sweep derives nothing new.
    Saturate,
}

impl Default for SynthesisMode {
    fn default() -> Self {
        Self::SinglePass
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KnowledgeConfig {
    pub synthesis: SynthesisMode,
}

/// Everything the player has proven about one board.
///
/// Only certain facts are stored: `known_safes` and `known_mines` never overlap, and every held [`Constraint`] is
/// non-empty and satisfiable on its own whenever a public method returns. `mark_mine`, `mark_safe` and a rejected
/// observation leave the knowledge base untouched on error; after an error found while propagating or synthesizing it
/// is in an unspecified state and should be discarded together with the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    size: Coord2,
    config: KnowledgeConfig,
    moves_made: BTreeSet<Coord2>,
    known_safe: BTreeSet<Coord2>,
    known_mine: BTreeSet<Coord2>,
    constraints: Vec<Constraint>,
}

impl KnowledgeBase {
    pub fn new(size: Coord2) -> Self {
        Self::with_config(size, KnowledgeConfig::default())
    }

    pub fn with_config(size: Coord2, config: KnowledgeConfig) -> Self {
        Self {
            size,
            config,
            moves_made: BTreeSet::new(),
            known_safe: BTreeSet::new(),
            known_mine: BTreeSet::new(),
            constraints: Vec::new(),
        }
    }

    pub fn size(&self) -> Coord2 {
        self.size
    }

    pub fn config(&self) -> KnowledgeConfig {
        self.config
    }

    pub fn moves_made(&self) -> &BTreeSet<Coord2> {
        &self.moves_made
    }

    pub fn known_safes(&self) -> &BTreeSet<Coord2> {
        &self.known_safe
    }

    pub fn known_mines(&self) -> &BTreeSet<Coord2> {
        &self.known_mine
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if in_bounds(coords, self.size) {
            Ok(coords)
        } else {
            Err(GameError::OutOfBounds(coords))
        }
    }

    pub fn mark_mine(&mut self, cell: Coord2) -> Result<MarkOutcome> {
        let cell = self.validate_coords(cell)?;
        if self.known_safe.contains(&cell) {
            return Err(GameError::inconsistent_at(cell));
        }

        self.check_narrowing(cell, Constraint::mark_mine)?;

        let inserted = self.known_mine.insert(cell);
        for constraint in &mut self.constraints {
            constraint.mark_mine(cell);
        }
        self.constraints.retain(|constraint| !constraint.is_empty());

        Ok(MarkOutcome::from_update(inserted))
    }

    pub fn mark_safe(&mut self, cell: Coord2) -> Result<MarkOutcome> {
        let cell = self.validate_coords(cell)?;
        if self.known_mine.contains(&cell) {
            return Err(GameError::inconsistent_at(cell));
        }

        self.check_narrowing(cell, Constraint::mark_safe)?;

        let inserted = self.known_safe.insert(cell);
        for constraint in &mut self.constraints {
            constraint.mark_safe(cell);
        }
        self.constraints.retain(|constraint| !constraint.is_empty());

        Ok(MarkOutcome::from_update(inserted))
    }

    /// Records that `cell` was revealed safely with `count` mines around it, then derives everything that follows.
    ///
    /// The observation is checked against what is already known before anything is stored, so a count that cannot be
    /// satisfied leaves the knowledge base untouched.
    pub fn record_observation(&mut self, cell: Coord2, count: u8) -> Result<()> {
        let cell = self.validate_coords(cell)?;
        if self.known_mine.contains(&cell) {
            return Err(GameError::inconsistent_at(cell));
        }

        let constraint = self.fold_known(Constraint::new(
            neighbors(cell, self.size),
            i16::from(count),
        ));
        if !constraint.is_consistent() {
            return Err(GameError::inconsistent_at(cell));
        }

        self.mark_safe(cell)?;
        self.moves_made.insert(cell);
        self.push_unique(constraint);
        self.resolve()?;

        log::debug!(
            "Observed {:?} = {}: {} constraints, {} safe, {} mines",
            cell,
            count,
            self.constraints.len(),
            self.known_safe.len(),
            self.known_mine.len(),
        );
        if log::log_enabled!(log::Level::Trace) {
            for constraint in &self.constraints {
                log::trace!("  {constraint}");
            }
        }

        Ok(())
    }

    /// Adds a constraint learned elsewhere, folding in known cells and propagating its consequences.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<MarkOutcome> {
        for &cell in constraint.cells() {
            self.validate_coords(cell)?;
        }

        let constraint = self.fold_known(constraint);
        if !constraint.is_consistent() {
            return Err(GameError::inconsistent());
        }

        let outcome = MarkOutcome::from_update(self.push_unique(constraint));
        self.propagate()?;
        Ok(outcome)
    }

    /// Fails, without touching anything, if narrowing the constraints that hold `cell` would contradict one of them.
    fn check_narrowing(&self, cell: Coord2, narrow: fn(&mut Constraint, Coord2) -> bool) -> Result<()> {
        let contradicts = self
            .constraints
            .iter()
            .filter(|constraint| constraint.contains(cell))
            .any(|constraint| {
                let mut narrowed = constraint.clone();
                narrow(&mut narrowed, cell);
                !narrowed.is_consistent()
            });

        if contradicts {
            Err(GameError::inconsistent_at(cell))
        } else {
            Ok(())
        }
    }

    fn fold_known(&self, mut constraint: Constraint) -> Constraint {
        let known: Vec<Coord2> = constraint
            .cells()
            .iter()
            .copied()
            .filter(|cell| self.known_mine.contains(cell) || self.known_safe.contains(cell))
            .collect();

        for cell in known {
            if self.known_mine.contains(&cell) {
                constraint.mark_mine(cell);
            } else {
                constraint.mark_safe(cell);
            }
        }
        constraint
    }

    fn push_unique(&mut self, constraint: Constraint) -> bool {
        if constraint.is_empty() || self.constraints.contains(&constraint) {
            false
        } else {
            self.constraints.push(constraint);
            true
        }
    }

    /// Rejects contradictory constraints, then drops empty ones and copies that narrowing made equal.
    fn normalize(&mut self) -> Result<()> {
        if let Some(bad) = self.constraints.iter().find(|c| !c.is_consistent()) {
            let cell = bad.cells().first().copied();
            return Err(GameError::InconsistentKnowledge { cell });
        }

        let mut seen = HashSet::new();
        self.constraints
            .retain(|constraint| !constraint.is_empty() && seen.insert(constraint.clone()));
        Ok(())
    }

    fn resolve(&mut self) -> Result<()> {
        self.propagate()?;

        match self.config.synthesis {
            SynthesisMode::SinglePass => {
                self.synthesize()?;
                self.propagate()
            }
            SynthesisMode::Saturate => loop {
                let derived = self.synthesize()?;
                self.propagate()?;
                if derived == 0 {
                    return Ok(());
                }
            },
        }
    }

    /// Marks every trivially determined cell until a pass finds nothing new.
    fn propagate(&mut self) -> Result<()> {
        loop {
            self.normalize()?;

            let mut safes = BTreeSet::new();
            let mut mines = BTreeSet::new();
            for constraint in &self.constraints {
                safes.extend(constraint.known_safes());
                mines.extend(constraint.known_mines());
            }
            safes.retain(|cell| !self.known_safe.contains(cell));
            mines.retain(|cell| !self.known_mine.contains(cell));

            if safes.is_empty() && mines.is_empty() {
                return Ok(());
            }

            for cell in safes {
                self.mark_safe(cell)?;
            }
            for cell in mines {
                self.mark_mine(cell)?;
            }
        }
    }

    /// One pairwise subset-resolution sweep, returning how many new constraints were added.
    fn synthesize(&mut self) -> Result<usize> {
        let mut seen: HashSet<Constraint> = self.constraints.iter().cloned().collect();
        let mut derived = Vec::new();

        for (i, left) in self.constraints.iter().enumerate() {
            if left.is_empty() {
                continue;
            }

            for right in &self.constraints[i + 1..] {
                if right.is_empty() {
                    continue;
                }

                let candidate = if left.cells() == right.cells() {
                    if left.count() != right.count() {
                        return Err(GameError::InconsistentKnowledge {
                            cell: left.cells().first().copied(),
                        });
                    }
                    continue;
                } else if left.is_subset_of(right) {
                    left.remainder_within(right)
                } else if right.is_subset_of(left) {
                    right.remainder_within(left)
                } else {
                    continue;
                };

                if !candidate.is_consistent() {
                    return Err(GameError::InconsistentKnowledge {
                        cell: candidate.cells().first().copied(),
                    });
                }
                if seen.insert(candidate.clone()) {
                    derived.push(candidate);
                }
            }
        }

        let added = derived.len();
        self.constraints.extend(derived);
        self.normalize()?;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Coord2 = (0, 0);
    const B: Coord2 = (0, 1);
    const C: Coord2 = (0, 2);
    const D: Coord2 = (0, 3);

    fn play_safe_moves(kb: &mut KnowledgeBase, field: &Minefield) {
        while let Some(cell) = kb.safe_move() {
            assert!(!field.contains_mine(cell));
            kb.record_observation(cell, field.adjacent_mine_count(cell))
                .unwrap();
        }
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let mut kb = KnowledgeBase::new((1, 4));
        kb.add_constraint(Constraint::new([A, B, C], 1)).unwrap();

        assert_eq!(kb.mark_safe(A).unwrap(), MarkOutcome::Changed);
        let once = kb.clone();
        assert_eq!(kb.mark_safe(A).unwrap(), MarkOutcome::NoChange);
        assert_eq!(kb, once);

        assert_eq!(kb.mark_mine(D).unwrap(), MarkOutcome::Changed);
        let once = kb.clone();
        assert_eq!(kb.mark_mine(D).unwrap(), MarkOutcome::NoChange);
        assert_eq!(kb, once);
    }

    #[test]
    fn cell_cannot_be_both_safe_and_mine() {
        let mut kb = KnowledgeBase::new((1, 2));
        kb.mark_safe(A).unwrap();

        assert_eq!(kb.mark_mine(A), Err(GameError::inconsistent_at(A)));
        assert!(kb.known_mines().is_empty());
    }

    #[test]
    fn marking_every_cell_of_a_mine_region_safe_fails_at_once() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.add_constraint(Constraint::new([A, B], 1)).unwrap();

        assert_eq!(kb.mark_safe(A).unwrap(), MarkOutcome::Changed);
        let before = kb.clone();

        assert_eq!(kb.mark_safe(B), Err(GameError::inconsistent_at(B)));
        assert_eq!(kb, before);
        assert!(kb.constraints().iter().all(Constraint::is_consistent));
    }

    #[test]
    fn marking_a_mine_in_an_exhausted_region_fails_at_once() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.add_constraint(Constraint::new([A, B, C], 1)).unwrap();
        kb.mark_mine(A).unwrap();

        assert_eq!(kb.mark_mine(B), Err(GameError::inconsistent_at(B)));
        assert!(!kb.known_mines().contains(&B));
        assert!(kb.constraints().contains(&Constraint::new([B, C], 0)));
    }

    #[test]
    fn marking_drops_constraints_left_empty() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.add_constraint(Constraint::new([A, B, C], 1)).unwrap();

        kb.mark_safe(A).unwrap();
        kb.mark_safe(B).unwrap();
        assert_eq!(kb.constraints(), &[Constraint::new([C], 1)]);

        kb.mark_mine(C).unwrap();
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn contradicted_observation_is_not_recorded_as_played() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.constraints = Vec::from([Constraint::new([A, B], 2)]);

        assert_eq!(
            kb.record_observation(A, 1),
            Err(GameError::inconsistent_at(A))
        );
        assert!(kb.moves_made().is_empty());
        assert!(kb.known_safes().is_empty());
    }

    #[test]
    fn subset_resolution_derives_outer_ring() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.add_constraint(Constraint::new([A, B, C], 1)).unwrap();
        kb.add_constraint(Constraint::new([A, B], 1)).unwrap();

        assert_eq!(kb.synthesize().unwrap(), 1);
        assert!(kb.constraints().contains(&Constraint::new([C], 0)));

        kb.propagate().unwrap();
        assert!(kb.known_safes().contains(&C));
        assert!(!kb.known_safes().contains(&A));
        assert!(!kb.known_safes().contains(&B));
    }

    #[test]
    fn full_constraint_saturates_to_mines() {
        let mut kb = KnowledgeBase::new((1, 2));
        kb.add_constraint(Constraint::new([A, B], 2)).unwrap();

        assert_eq!(kb.known_mines(), &BTreeSet::from([A, B]));
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn synthesis_suppresses_duplicates() {
        let mut kb = KnowledgeBase::new((1, 4));
        kb.constraints = Vec::from([
            Constraint::new([A, B, C], 1),
            Constraint::new([A, B], 1),
            Constraint::new([C, D], 1),
            Constraint::new([D], 1),
        ]);

        assert_eq!(kb.synthesize().unwrap(), 1);
        let copies = kb
            .constraints()
            .iter()
            .filter(|&c| *c == Constraint::new([C], 0))
            .count();
        assert_eq!(copies, 1);

        assert_eq!(kb.synthesize().unwrap(), 0);
    }

    #[test]
    fn synthesis_rejects_disagreeing_counts_on_same_cells() {
        let mut kb = KnowledgeBase::new((1, 2));
        kb.constraints = Vec::from([Constraint::new([A, B], 1), Constraint::new([A, B], 2)]);

        assert!(matches!(
            kb.synthesize(),
            Err(GameError::InconsistentKnowledge { .. })
        ));
    }

    #[test]
    fn observation_folds_known_cells() {
        let mut kb = KnowledgeBase::new((1, 4));
        kb.mark_mine(A).unwrap();
        kb.mark_safe(C).unwrap();

        kb.record_observation(B, 1).unwrap();

        assert!(kb.moves_made().contains(&B));
        assert!(kb.known_safes().contains(&B));
        assert!(kb.constraints().is_empty());
        assert!(kb.known_safes().contains(&C));
    }

    #[test]
    fn zero_observation_marks_neighbors_safe() {
        let mut kb = KnowledgeBase::new((3, 3));

        kb.record_observation((2, 2), 0).unwrap();

        assert_eq!(
            kb.known_safes(),
            &BTreeSet::from([(1, 1), (1, 2), (2, 1), (2, 2)])
        );
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn impossible_count_is_rejected_without_mutation() {
        let mut kb = KnowledgeBase::new((1, 2));
        let before = kb.clone();

        assert_eq!(
            kb.record_observation(A, 2),
            Err(GameError::inconsistent_at(A))
        );
        assert_eq!(kb, before);
    }

    #[test]
    fn count_below_known_mines_is_rejected() {
        let mut kb = KnowledgeBase::new((1, 3));
        kb.mark_mine(A).unwrap();
        kb.mark_mine(C).unwrap();

        assert_eq!(
            kb.record_observation(B, 1),
            Err(GameError::inconsistent_at(B))
        );
        assert!(kb.moves_made().is_empty());
    }

    #[test]
    fn observing_a_known_mine_is_rejected() {
        let mut kb = KnowledgeBase::new((1, 2));
        kb.mark_mine(A).unwrap();

        assert_eq!(
            kb.record_observation(A, 0),
            Err(GameError::inconsistent_at(A))
        );
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut kb = KnowledgeBase::new((2, 2));

        assert_eq!(
            kb.record_observation((2, 0), 0),
            Err(GameError::OutOfBounds((2, 0)))
        );
        assert_eq!(kb.mark_safe((0, 5)), Err(GameError::OutOfBounds((0, 5))));
        assert_eq!(
            kb.add_constraint(Constraint::new([(9, 9)], 0)),
            Err(GameError::OutOfBounds((9, 9)))
        );
    }

    #[test]
    fn single_mine_in_corner_is_found() {
        let field = Minefield::from_mine_coords((3, 3), &[(0, 0)]).unwrap();
        let mut kb = KnowledgeBase::new(field.size());

        kb.record_observation((2, 2), 0).unwrap();
        play_safe_moves(&mut kb, &field);

        let safes: BTreeSet<Coord2> = iter_cells((3, 3)).filter(|&c| c != (0, 0)).collect();
        assert_eq!(kb.known_safes(), &safes);
        assert_eq!(kb.known_mines(), &BTreeSet::from([(0, 0)]));
        assert!(field.is_won(kb.known_mines()));
    }

    #[test]
    fn observing_every_safe_cell_terminates_with_full_knowledge() {
        let mines = [(0, 0), (2, 3), (3, 1)];
        let field = Minefield::from_mine_coords((4, 4), &mines).unwrap();
        let mut kb = KnowledgeBase::new(field.size());

        for cell in iter_cells(field.size()).filter(|&c| !field.contains_mine(c)) {
            kb.record_observation(cell, field.adjacent_mine_count(cell))
                .unwrap();
            assert!(kb.constraints().len() <= 8 * usize::from(field.total_cells()));
        }

        assert_eq!(kb.known_mines(), &BTreeSet::from(mines));
        assert_eq!(kb.known_safes().len(), usize::from(field.safe_cell_count()));
        assert!(kb.constraints().is_empty());
    }

    #[test]
    fn saturate_mode_chains_derived_constraints() {
        const E: Coord2 = (0, 4);
        const F: Coord2 = (0, 5);
        let held = Vec::from([
            Constraint::new([A, B, C, D, E], 2),
            Constraint::new([A, B], 1),
            Constraint::new([C, D, E, F], 1),
        ]);
        let mut single = KnowledgeBase::new((1, 6));
        let mut full = KnowledgeBase::with_config(
            (1, 6),
            KnowledgeConfig {
                synthesis: SynthesisMode::Saturate,
            },
        );
        single.constraints = held.clone();
        full.constraints = held;

        single.resolve().unwrap();
        full.resolve().unwrap();

        assert!(single.constraints().contains(&Constraint::new([C, D, E], 1)));
        assert!(!single.known_safes().contains(&F));
        assert!(full.known_safes().contains(&F));
        assert!(single.known_safes().is_subset(full.known_safes()));
    }
}
