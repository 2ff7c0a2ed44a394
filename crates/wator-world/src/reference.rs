//! Sequential reference walk.
//!
//! Applies the same rules over the whole grid on one thread with a plain
//! buffer. Used as the correctness oracle for the tiled engine: a
//! single-tile run must match it cell for cell.

use crate::buffer::arbitrate;
use crate::grid::{area, row_major, Grid};
use crate::rules::{CellWriter, Rules};
use wator_core::{Cell, CellKind, Position};

/// Unsynchronized buffer applying the same arbitration as the shared one.
pub struct PlainWriter {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl PlainWriter {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; area(width, height)],
        }
    }

    pub fn into_grid(self) -> Grid {
        Grid::from_parts(self.width, self.height, self.cells)
    }
}

impl CellWriter for PlainWriter {
    fn try_write(&mut self, pos: Position, cell: Cell) -> Result<(), CellKind> {
        let wrapped = pos.wrap(self.width, self.height);
        let slot = &mut self.cells[row_major(self.width, wrapped)];
        if arbitrate(slot.kind, cell.kind) {
            *slot = cell;
            Ok(())
        } else {
            Err(slot.kind)
        }
    }
}

/// Advance `grid` by one chronon without any parallelism.
pub fn step_sequential(grid: &Grid, rules: &Rules, seed: u64, chronon: u64) -> Grid {
    let mut writer = PlainWriter::new(grid.width, grid.height);
    rules.walk_columns(grid, 0..grid.width, &mut writer, seed, chronon);
    writer.into_grid()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_writer_arbitrates() {
        let mut writer = PlainWriter::new(2, 2);
        let pos = Position::new(0, 1);
        assert!(writer.write(pos, Cell::fish(2)));
        assert_eq!(writer.try_write(pos, Cell::fish(3)), Err(CellKind::Fish));
        assert!(writer.write(pos, Cell::shark(1, 1)));
        assert!(writer.write(Position::new(2, 3), Cell::EMPTY));

        let grid = writer.into_grid();
        assert!(grid.get(pos).is_empty());
    }

    #[test]
    fn test_sequential_step_on_empty_grid() {
        let grid = Grid::new(6, 6);
        let rules = Rules {
            fish_breed_time: 3,
            shark_breed_time: 3,
            starve_energy_threshold: 3,
            energy_gain_per_fish: 1,
        };
        let next = step_sequential(&grid, &rules, 0, 0);
        assert_eq!(next.count(CellKind::Empty), 36);
    }
}
