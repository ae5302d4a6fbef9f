use alloc::vec::Vec;

use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;

use super::*;

/// Uniform mine placement, optionally keeping the starting cell free of mines.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomMinefieldGenerator {
    seed: u64,
    start: Coord2,
    start_tile: StartTile,
}

impl RandomMinefieldGenerator {
    pub fn new(seed: u64, start: Coord2, start_tile: StartTile) -> Self {
        Self {
            seed,
            start,
            start_tile,
        }
    }
}

impl MinefieldGenerator for RandomMinefieldGenerator {
    fn generate(self, config: GameConfig) -> Minefield {
        let total_cells = config.total_cells();
        let size = config.size.to_nd_index();

        if config.mines >= total_cells {
            if config.mines > total_cells {
                log::warn!(
                    "Minefield already full, generated anyway, requested {} but only fits {}",
                    config.mines,
                    total_cells
                );
            }
            return Minefield::from_mine_mask(Array2::from_elem(size, true));
        }

        let keep_start = match self.start_tile {
            StartTile::Random => false,
            StartTile::SimpleSafe if !in_bounds(self.start, config.size) => {
                log::warn!(
                    "Start {:?} is off the board, fallback to random",
                    self.start
                );
                false
            }
            StartTile::SimpleSafe if config.mines + 1 > total_cells => {
                log::warn!("Cannot make start tile safe, fallback to random");
                false
            }
            StartTile::SimpleSafe => true,
        };

        // cells that may still receive a mine, drawn without replacement
        let mut free: Vec<Coord2> = iter_cells(config.size)
            .filter(|&coords| !(keep_start && coords == self.start))
            .collect();
        let mut mines: Array2<bool> = Array2::default(size);
        let mut rng = SmallRng::seed_from_u64(self.seed);

        for _ in 0..config.mines {
            if free.is_empty() {
                break;
            }
            let coords = free.swap_remove(rng.random_range(0..free.len()));
            mines[coords.to_nd_index()] = true;
        }

        let minefield = Minefield::from_mine_mask(mines);
        if minefield.mine_count() != config.mines {
            log::warn!(
                "Generated minefield count mismatch, actual: {}, requested: {}",
                minefield.mine_count(),
                config.mines
            );
        }
        minefield
    }
}
