use thiserror::Error;

use crate::Coord2;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Coordinates {0:?} are outside the board")]
    OutOfBounds(Coord2),
    #[error("Too many mines")]
    TooManyMines,
    #[error("Knowledge base became inconsistent (at {cell:?})")]
    InconsistentKnowledge { cell: Option<Coord2> },
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
}

impl GameError {
    pub(crate) const fn inconsistent_at(cell: Coord2) -> Self {
        Self::InconsistentKnowledge { cell: Some(cell) }
    }

    pub(crate) const fn inconsistent() -> Self {
        Self::InconsistentKnowledge { cell: None }
    }
}

pub type Result<T> = core::result::Result<T, GameError>;
