use serde::{Deserialize, Serialize};

use crate::*;
pub use random::*;

mod random;

pub trait MinefieldGenerator {
    fn generate(self, config: GameConfig) -> Minefield;
}

/// What the generator guarantees about the first cell the player opens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartTile {
    Random,
    SimpleSafe,
}

impl Default for StartTile {
    fn default() -> Self {
        Self::Random
    }
}
