//! Cell reservation during board generation.
//!
//! Only the generator touches this map. Once play starts, blocking is
//! answered by the collision collaborator instead.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use crate::grid::Cell;

/// Tracks which candidate cells are still free during one generation pass.
///
/// Draws come from `candidates`; `index` maps each free cell to its slot so
/// membership checks and removals are constant time.
#[derive(Debug, Clone, Default)]
pub struct GridOccupancyMap {
    /// Free candidate cells. Order changes as cells are removed.
    candidates: Vec<Cell>,
    /// Slot of each free cell in `candidates`.
    index: HashMap<Cell, usize>,
    /// Cells reserved since the last reset.
    reserved: HashSet<Cell>,
}

impl GridOccupancyMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass with the given candidate cells. Repeats are ignored.
    pub fn reset(&mut self, cells: impl IntoIterator<Item = Cell>) {
        self.reserved.clear();
        self.candidates.clear();
        self.index.clear();
        for cell in cells {
            if !self.index.contains_key(&cell) {
                self.index.insert(cell, self.candidates.len());
                self.candidates.push(cell);
            }
        }
    }

    /// Reserve a free candidate cell.
    ///
    /// Returns `false`, leaving the map unchanged, if `cell` is not a free
    /// candidate (never offered, or already reserved).
    pub fn reserve(&mut self, cell: Cell) -> bool {
        match self.index.get(&cell).copied() {
            Some(slot) => {
                self.remove_slot(slot);
                true
            }
            None => false,
        }
    }

    /// Whether `cell` is a free candidate.
    #[must_use]
    pub fn is_available(&self, cell: Cell) -> bool {
        self.index.contains_key(&cell)
    }

    /// Whether `cell` was reserved during this pass.
    #[must_use]
    pub fn is_reserved(&self, cell: Cell) -> bool {
        self.reserved.contains(&cell)
    }

    /// Free candidate cells, in no particular order.
    #[must_use]
    pub fn available_cells(&self) -> &[Cell] {
        &self.candidates
    }

    /// Number of free candidate cells.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    /// Pop a uniformly random free cell and reserve it.
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Cell> {
        if self.candidates.is_empty() {
            return None;
        }
        let slot = rng.gen_range(0..self.candidates.len());
        Some(self.remove_slot(slot))
    }

    fn remove_slot(&mut self, slot: usize) -> Cell {
        let cell = self.candidates.swap_remove(slot);
        self.index.remove(&cell);
        if let Some(moved) = self.candidates.get(slot) {
            self.index.insert(*moved, slot);
        }
        self.reserved.insert(cell);
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn square(n: i32) -> impl Iterator<Item = Cell> {
        (0..n).flat_map(move |x| (0..n).map(move |y| Cell::new(x, y)))
    }

    #[test]
    fn test_reset_rebuilds_candidates() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(3));
        assert_eq!(map.remaining(), 9);
        assert!(map.reserve(Cell::new(1, 1)));

        map.reset(square(2));
        assert_eq!(map.remaining(), 4);
        assert!(!map.is_reserved(Cell::new(1, 1)));
        assert!(map.is_available(Cell::new(1, 1)));
    }

    #[test]
    fn test_reserve_removes_candidate() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(2));
        assert!(map.reserve(Cell::new(0, 1)));
        assert!(!map.reserve(Cell::new(0, 1)));
        assert!(!map.is_available(Cell::new(0, 1)));
        assert_eq!(map.remaining(), 3);
    }

    #[test]
    fn test_take_random_never_repeats() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(4));
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut seen = HashSet::new();
        while let Some(cell) = map.take_random(&mut rng) {
            assert!(seen.insert(cell), "cell {cell} returned twice");
            assert!(map.is_reserved(cell));
        }
        assert_eq!(seen.len(), 16);
        assert_eq!(map.remaining(), 0);
    }

    #[test]
    fn test_cells_outside_candidates_are_unavailable() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(2));
        assert!(!map.is_available(Cell::new(5, 5)));
    }

    #[test]
    fn test_reserve_ignores_non_candidates() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(2));
        assert!(!map.reserve(Cell::new(5, 5)));
        assert!(!map.is_reserved(Cell::new(5, 5)));
        assert_eq!(map.remaining(), 4);
    }

    #[test]
    fn test_available_cells_tracks_reservations() {
        let mut map = GridOccupancyMap::new();
        map.reset(square(3).chain(square(2)));
        let mut available: Vec<Cell> = map.available_cells().to_vec();
        available.sort();
        let mut expected: Vec<Cell> = square(3).collect();
        expected.sort();
        assert_eq!(available, expected);

        assert!(map.reserve(Cell::new(0, 0)));
        assert!(!map.available_cells().contains(&Cell::new(0, 0)));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let taken = map.take_random(&mut rng).unwrap();
        assert!(!map.available_cells().contains(&taken));
        assert_eq!(map.available_cells().len(), 7);

        while let Some(cell) = map.take_random(&mut rng) {
            assert!(map.available_cells().iter().all(|c| !map.is_reserved(*c)));
            assert!(!map.is_available(cell));
            for c in map.available_cells() {
                assert!(map.is_available(*c));
            }
        }
        assert!(map.available_cells().is_empty());
    }
}
