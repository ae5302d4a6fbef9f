use ndarray::Array2;
use smallvec::SmallVec;

/// Single coordinate axis used for board height, width, and positions.
pub type Coord = u8;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(row, column)`. Board sizes use the same shape as `(height, width)`.
pub type Coord2 = (Coord, Coord);

/// Neighbourhood of a single cell, never more than eight entries.
pub type Neighbors = SmallVec<[Coord2; 8]>;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

pub const fn in_bounds(coords: Coord2, size: Coord2) -> bool {
    coords.0 < size.0 && coords.1 < size.1
}

/// Iterates every cell of a board of the given size in row-major order.
pub fn iter_cells(size: Coord2) -> impl Iterator<Item = Coord2> {
    (0..size.0).flat_map(move |row| (0..size.1).map(move |col| (row, col)))
}

pub trait NeighborIterExt {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter;
}

impl<T> NeighborIterExt for Array2<T> {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter {
        let dim = self.dim();
        let size = (
            dim.0.try_into().unwrap_or(Coord::MAX),
            dim.1.try_into().unwrap_or(Coord::MAX),
        );
        NeighborIter::new(index, size)
    }
}

const DISPLACEMENTS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Applies `delta` to `coords`, returning a value only when it remains in bounds.
fn apply_delta(coords: Coord2, delta: (i8, i8), bounds: Coord2) -> Option<Coord2> {
    let (row, col) = coords;
    let (d_row, d_col) = delta;

    let next_row = row.checked_add_signed(d_row)?;
    let next_col = col.checked_add_signed(d_col)?;
    let next = (next_row, next_col);

    in_bounds(next, bounds).then_some(next)
}

/// Grid-adjacent cells of `center`, clipped to `bounds` and never including `center` itself.
#[derive(Debug, Clone)]
pub struct NeighborIter {
    center: Coord2,
    bounds: Coord2,
    index: u8,
}

impl NeighborIter {
    pub fn new(center: Coord2, bounds: Coord2) -> Self {
        Self {
            center,
            bounds,
            index: 0,
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&delta) = DISPLACEMENTS.get(usize::from(self.index)) {
            self.index += 1;
            if let Some(next_item) = apply_delta(self.center, delta, self.bounds) {
                return Some(next_item);
            }
        }
        None
    }
}

pub fn neighbors(center: Coord2, bounds: Coord2) -> Neighbors {
    NeighborIter::new(center, bounds).collect()
}
