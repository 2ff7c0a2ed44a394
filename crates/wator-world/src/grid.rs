//! 2D toroidal grid holding the authoritative world state.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use wator_core::{Cell, CellKind, Direction, Error, Position, Result, WatorConfig, MAX_CELLS};

/// A 2D toroidal grid of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

/// Entity counts for one grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    pub fish: usize,
    pub sharks: usize,
    pub empty: usize,
}

impl Population {
    pub fn total(&self) -> usize {
        self.fish + self.sharks + self.empty
    }
}

/// Cell count of a `width` x `height` grid, computed without `i32` overflow.
pub(crate) fn area(width: i32, height: i32) -> usize {
    width.max(0) as usize * height.max(0) as usize
}

/// Row-major index of an already wrapped position.
pub(crate) fn row_major(width: i32, wrapped: Position) -> usize {
    wrapped.y as usize * width as usize + wrapped.x as usize
}

/// Up to four wrapped neighbor positions, kept on the stack.
#[derive(Debug, Clone, Copy)]
pub struct NeighborSet {
    positions: [Position; 4],
    len: usize,
}

impl NeighborSet {
    fn new() -> Self {
        Self {
            positions: [Position::new(0, 0); 4],
            len: 0,
        }
    }

    fn push(&mut self, pos: Position) {
        self.positions[self.len] = pos;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; area(width, height)],
        }
    }

    /// Wrap an existing row-major cell vector.
    pub fn from_cells(width: i32, height: i32, cells: Vec<Cell>) -> Result<Self> {
        let size = area(width, height);
        if width <= 0 || height <= 0 || size > MAX_CELLS || cells.len() != size {
            return Err(Error::Validation(format!(
                "{} cells do not form a {}x{} grid",
                cells.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub(crate) fn from_parts(width: i32, height: i32, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), area(width, height));
        Self {
            width,
            height,
            cells,
        }
    }

    /// Scatter the configured fish and sharks over a shuffled coordinate list.
    pub fn populate<R: Rng + ?Sized>(config: &WatorConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let mut grid = Self::new(config.width, config.height);

        let mut order: Vec<usize> = (0..grid.cells.len()).collect();
        order.shuffle(rng);

        let (fish, rest) = order.split_at(config.num_fish);
        for &index in fish {
            grid.cells[index] = Cell::fish(config.fish_breed_time);
        }
        for &index in &rest[..config.num_sharks] {
            grid.cells[index] =
                Cell::shark(config.starve_energy_threshold, config.shark_breed_time);
        }

        Ok(grid)
    }

    /// Get cell at position (with toroidal wrapping)
    pub fn get(&self, pos: Position) -> Cell {
        self.cells[self.index_of(pos)]
    }

    /// Set cell at position. Only meant for seeding a grid before it is
    /// handed to the engine.
    pub fn set(&mut self, pos: Position, cell: Cell) {
        let index = self.index_of(pos);
        self.cells[index] = cell;
    }

    pub fn wrap(&self, pos: Position) -> Position {
        pos.wrap(self.width, self.height)
    }

    /// Row-major index of a (wrapped) position
    pub fn index_of(&self, pos: Position) -> usize {
        row_major(self.width, self.wrap(pos))
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// The four orthogonal neighbors, wrapped, in north/west/east/south order.
    pub fn neighbors(&self, pos: Position) -> [(Position, Cell); 4] {
        Direction::all().map(|direction| {
            let neighbor = self.wrap(pos.step(direction));
            (neighbor, self.get(neighbor))
        })
    }

    /// Neighbors of `pos` whose cell is of the given kind.
    pub fn gather(&self, pos: Position, kind: CellKind) -> NeighborSet {
        let mut set = NeighborSet::new();
        for (neighbor, cell) in self.neighbors(pos) {
            if cell.kind == kind {
                set.push(neighbor);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count(&self, kind: CellKind) -> usize {
        self.cells.iter().filter(|cell| cell.kind == kind).count()
    }

    pub fn population(&self) -> Population {
        let mut population = Population::default();
        for cell in &self.cells {
            match cell.kind {
                CellKind::Empty => population.empty += 1,
                CellKind::Fish => population.fish += 1,
                CellKind::Shark => population.sharks += 1,
            }
        }
        population
    }

    /// Iterator over all cells with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (self.index_to_pos(i), *cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 6);
        assert_eq!(grid.width, 10);
        assert_eq!(grid.height, 6);
        assert_eq!(grid.len(), 60);
        assert_eq!(grid.count(CellKind::Empty), 60);
    }

    #[test]
    fn test_toroidal_wrapping() {
        let mut grid = Grid::new(10, 10);
        grid.set(Position::new(9, 9), Cell::fish(3));

        assert!(grid.get(Position::new(-1, -1)).is_fish());
        assert!(grid.get(Position::new(19, 19)).is_fish());
        assert_eq!(grid.index_of(Position::new(10, 0)), 0);
    }

    #[test]
    fn test_neighbors_wrap_at_origin() {
        let grid = Grid::new(5, 4);
        let neighbors: Vec<Position> = grid
            .neighbors(Position::new(0, 0))
            .iter()
            .map(|(pos, _)| *pos)
            .collect();

        assert_eq!(
            neighbors,
            vec![
                Position::new(0, 3),
                Position::new(4, 0),
                Position::new(1, 0),
                Position::new(0, 1),
            ]
        );
    }

    #[test]
    fn test_neighbors_wrap_at_far_corner() {
        let grid = Grid::new(5, 4);
        let neighbors: Vec<Position> = grid
            .neighbors(Position::new(4, 3))
            .iter()
            .map(|(pos, _)| *pos)
            .collect();

        assert!(neighbors.contains(&Position::new(0, 3)));
        assert!(neighbors.contains(&Position::new(4, 0)));
        assert!(neighbors.contains(&Position::new(3, 3)));
        assert!(neighbors.contains(&Position::new(4, 2)));
    }

    #[test]
    fn test_gather_by_kind() {
        let mut grid = Grid::new(3, 3);
        let center = Position::new(1, 1);
        grid.set(center, Cell::shark(4, 10));
        grid.set(Position::new(1, 0), Cell::fish(5));
        grid.set(Position::new(0, 1), Cell::fish(5));

        let fish = grid.gather(center, CellKind::Fish);
        assert_eq!(fish.len(), 2);
        assert_eq!(
            fish.as_slice(),
            &[Position::new(1, 0), Position::new(0, 1)]
        );

        let free = grid.gather(center, CellKind::Empty);
        assert_eq!(free.len(), 2);
        assert!(grid.gather(center, CellKind::Shark).is_empty());
    }

    #[test]
    fn test_populate_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = WatorConfig {
            width: 20,
            height: 15,
            num_fish: 120,
            num_sharks: 30,
            num_tiles: 4,
            ..Default::default()
        };

        let grid = Grid::populate(&config, &mut rng).unwrap();
        let population = grid.population();
        assert_eq!(population.fish, 120);
        assert_eq!(population.sharks, 30);
        assert_eq!(population.empty, 150);

        for (_, cell) in grid.iter() {
            match cell.kind {
                CellKind::Fish => assert_eq!(cell.breed_timer, config.fish_breed_time),
                CellKind::Shark => {
                    assert_eq!(cell.breed_timer, config.shark_breed_time);
                    assert_eq!(cell.energy, config.starve_energy_threshold);
                }
                CellKind::Empty => assert_eq!(cell, Cell::EMPTY),
            }
        }
    }

    #[test]
    fn test_populate_full_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = WatorConfig {
            width: 4,
            height: 4,
            num_fish: 10,
            num_sharks: 6,
            num_tiles: 2,
            ..Default::default()
        };
        let grid = Grid::populate(&config, &mut rng).unwrap();
        assert_eq!(grid.count(CellKind::Empty), 0);
    }

    #[test]
    fn test_populate_rejects_overpopulation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let config = WatorConfig {
            width: 4,
            height: 4,
            num_fish: 10,
            num_sharks: 7,
            num_tiles: 2,
            ..Default::default()
        };
        assert!(matches!(
            Grid::populate(&config, &mut rng),
            Err(Error::Overpopulated { .. })
        ));
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert!(Grid::from_cells(3, 3, vec![Cell::EMPTY; 9]).is_ok());
        assert!(Grid::from_cells(3, 3, vec![Cell::EMPTY; 8]).is_err());
        // The area overflows i32 even though each side fits
        assert!(Grid::from_cells(65_536, 65_537, Vec::new()).is_err());
    }
}
