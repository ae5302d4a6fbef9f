use rand::Rng;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Active,
    Won,
    Lost,
    Stuck,
}

impl PlayState {
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl Default for PlayState {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    /// Proven safe by the knowledge base.
    Safe,
    /// Picked at random among the cells not known to be mines.
    Random,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Revealed(Coord2, MoveKind),
    HitMine(Coord2),
    Won,
    /// Neither a safe nor a random move is left.
    Stuck,
}

impl StepOutcome {
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Revealed(..))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub state: PlayState,
    pub triggered_mine: Option<Coord2>,
    pub safe_moves: u32,
    pub random_moves: u32,
    pub mines_flagged: usize,
    pub peak_constraints: usize,
    pub elapsed_micros: u64,
}

/// Sequential game loop: play a proven-safe cell when one exists, otherwise guess, and feed every reveal back into the
/// knowledge base.
#[derive(Clone, Debug)]
pub struct Autoplayer {
    minefield: Minefield,
    knowledge: KnowledgeBase,
    state: PlayState,
    triggered_mine: Option<Coord2>,
    safe_moves: u32,
    random_moves: u32,
    peak_constraints: usize,
}

impl Autoplayer {
    pub fn new(minefield: Minefield, config: KnowledgeConfig) -> Self {
        let knowledge = KnowledgeBase::with_config(minefield.size(), config);
        Self {
            minefield,
            knowledge,
            state: Default::default(),
            triggered_mine: None,
            safe_moves: 0,
            random_moves: 0,
            peak_constraints: 0,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn minefield(&self) -> &Minefield {
        &self.minefield
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    /// Opens `coords` regardless of what the knowledge base says about it.
    pub fn reveal(&mut self, coords: Coord2) -> Result<StepOutcome> {
        let coords = self.minefield.validate_coords(coords)?;
        self.check_active()?;

        if self.minefield.contains_mine(coords) {
            log::debug!("Hit mine at {coords:?}");
            self.triggered_mine = Some(coords);
            self.state = PlayState::Lost;
            return Ok(StepOutcome::HitMine(coords));
        }

        let count = self.minefield.adjacent_mine_count(coords);
        self.knowledge.record_observation(coords, count)?;
        self.peak_constraints = self.peak_constraints.max(self.knowledge.constraints().len());

        if self.is_won() {
            self.state = PlayState::Won;
            Ok(StepOutcome::Won)
        } else {
            Ok(StepOutcome::Revealed(coords, MoveKind::Random))
        }
    }

    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Result<StepOutcome> {
        self.check_active()?;

        let (coords, kind) = if let Some(coords) = self.knowledge.safe_move() {
            (coords, MoveKind::Safe)
        } else if let Some(coords) = self.knowledge.random_move(rng) {
            (coords, MoveKind::Random)
        } else {
            self.state = PlayState::Stuck;
            return Ok(StepOutcome::Stuck);
        };

        match kind {
            MoveKind::Safe => self.safe_moves += 1,
            MoveKind::Random => self.random_moves += 1,
        }

        Ok(match self.reveal(coords)? {
            StepOutcome::Revealed(coords, _) => StepOutcome::Revealed(coords, kind),
            outcome => outcome,
        })
    }

    pub fn play<R: Rng>(&mut self, rng: &mut R) -> Result<GameReport> {
        let started = Instant::now();

        while !self.step(rng)?.is_finished() {}

        let elapsed_micros = started.elapsed().as_micros().try_into().unwrap_or(u64::MAX);
        let report = self.report(elapsed_micros);
        log::info!(
            "Game finished {:?} after {} safe and {} random moves, {} mines flagged",
            report.state,
            report.safe_moves,
            report.random_moves,
            report.mines_flagged,
        );
        Ok(report)
    }

    pub fn report(&self, elapsed_micros: u64) -> GameReport {
        GameReport {
            state: self.state,
            triggered_mine: self.triggered_mine,
            safe_moves: self.safe_moves,
            random_moves: self.random_moves,
            mines_flagged: self.knowledge.known_mines().len(),
            peak_constraints: self.peak_constraints,
            elapsed_micros,
        }
    }

    /// All mines flagged, or every safe cell opened.
    fn is_won(&self) -> bool {
        self.minefield.is_won(self.knowledge.known_mines())
            || self.knowledge.moves_made().len() == usize::from(self.minefield.safe_cell_count())
    }

    fn check_active(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}
