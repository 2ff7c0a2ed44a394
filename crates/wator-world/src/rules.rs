//! Fish and shark transition rules.
//!
//! Rules read only the frozen grid and emit every result through a
//! [`CellWriter`], so the same code drives both the tiled engine and the
//! sequential reference walk.

use crate::grid::{Grid, NeighborSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;
use wator_core::{Cell, CellKind, Position, WatorConfig};

/// Destination for rule output.
pub trait CellWriter {
    /// Arbitrated write. On rejection, returns the kind that held the cell.
    fn try_write(&mut self, pos: Position, cell: Cell) -> Result<(), CellKind>;

    /// Whether the write was accepted.
    fn write(&mut self, pos: Position, cell: Cell) -> bool {
        self.try_write(pos, cell).is_ok()
    }
}

/// Uniform choice among `len` items.
pub trait PickSource {
    /// Index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> PickSource for R {
    fn pick(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }
}

/// Random source for one cell's decisions in one chronon. Depends only on
/// the seed, the chronon and the cell, never on worker scheduling.
pub fn cell_rng(seed: u64, chronon: u64, index: usize) -> ChaCha8Rng {
    let mut z = seed
        ^ chronon.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    // splitmix64 finalizer
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    ChaCha8Rng::seed_from_u64(z ^ (z >> 31))
}

fn choose<P: PickSource + ?Sized>(set: &NeighborSet, picker: &mut P) -> Option<Position> {
    if set.is_empty() {
        None
    } else {
        Some(set.as_slice()[picker.pick(set.len())])
    }
}

/// Rule constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub fish_breed_time: i32,
    pub shark_breed_time: i32,
    pub starve_energy_threshold: i32,
    pub energy_gain_per_fish: i32,
}

impl From<&WatorConfig> for Rules {
    fn from(config: &WatorConfig) -> Self {
        Self {
            fish_breed_time: config.fish_breed_time,
            shark_breed_time: config.shark_breed_time,
            starve_energy_threshold: config.starve_energy_threshold,
            energy_gain_per_fish: config.energy_gain_per_fish,
        }
    }
}

impl Rules {
    /// Advance the entity at `pos`. Empty cells produce no writes.
    pub fn apply<W, P>(&self, grid: &Grid, pos: Position, writer: &mut W, picker: &mut P)
    where
        W: CellWriter + ?Sized,
        P: PickSource + ?Sized,
    {
        let cell = grid.get(pos);
        match cell.kind {
            CellKind::Fish => self.fish(grid, pos, cell, writer, picker),
            CellKind::Shark => self.shark(grid, pos, cell, writer, picker),
            CellKind::Empty => {}
        }
    }

    /// Move to a random free neighbor, else stay. Breeds when the
    /// decremented timer reaches zero, leaving a newborn at the old cell.
    pub fn fish<W, P>(&self, grid: &Grid, pos: Position, cell: Cell, writer: &mut W, picker: &mut P)
    where
        W: CellWriter + ?Sized,
        P: PickSource + ?Sized,
    {
        let timer = cell.breed_timer.saturating_sub(1);
        let breeds = timer <= 0;
        let mover = Cell::fish(if breeds { self.fish_breed_time } else { timer });

        let moved = match choose(&grid.gather(pos, CellKind::Empty), picker) {
            Some(dest) => writer.write(dest, mover),
            None => false,
        };

        if !moved {
            // Only a shark that ate this fish can hold its cell
            if let Err(holder) = writer.try_write(pos, mover) {
                debug_assert_eq!(holder, CellKind::Shark, "fish at {} displaced", pos);
            }
            return;
        }

        if breeds {
            writer.write(pos, Cell::fish(self.fish_breed_time));
        }
    }

    /// Hunt an adjacent fish, else move to a free neighbor, else stay.
    /// Each chronon costs one unit of energy; a meal adds the gain only
    /// when the predation write lands.
    pub fn shark<W, P>(&self, grid: &Grid, pos: Position, cell: Cell, writer: &mut W, picker: &mut P)
    where
        W: CellWriter + ?Sized,
        P: PickSource + ?Sized,
    {
        let energy = cell.energy.saturating_sub(1);
        let timer = cell.breed_timer.saturating_sub(1);
        let breeds = timer <= 0;
        let landed = |energy: i32| {
            let timer = if breeds && energy > 0 {
                self.shark_breed_time
            } else {
                timer
            };
            Cell::shark(energy, timer)
        };

        let prey = grid.gather(pos, CellKind::Fish);
        let attempt = match choose(&prey, picker) {
            Some(dest) => {
                let fed = energy.saturating_add(self.energy_gain_per_fish);
                Some((dest, fed))
            }
            None => choose(&grid.gather(pos, CellKind::Empty), picker).map(|dest| (dest, energy)),
        };

        let accepted = attempt.filter(|&(dest, after)| writer.write(dest, landed(after)));
        let (landing, energy) = match accepted {
            Some(outcome) => outcome,
            None => {
                let stayed = writer.write(pos, landed(energy));
                debug_assert!(stayed, "shark at {} could not stay in place", pos);
                (pos, energy)
            }
        };

        if energy <= 0 {
            writer.write(landing, Cell::EMPTY);
            return;
        }

        if breeds && landing != pos {
            writer.write(
                pos,
                Cell::shark(self.starve_energy_threshold, self.shark_breed_time),
            );
        }
    }

    /// Scan `columns` top to bottom, left to right, applying the rules to
    /// every occupied cell of `grid`.
    pub fn walk_columns<W>(
        &self,
        grid: &Grid,
        columns: Range<i32>,
        writer: &mut W,
        seed: u64,
        chronon: u64,
    ) where
        W: CellWriter + ?Sized,
    {
        for x in columns {
            for y in 0..grid.height {
                let pos = Position::new(x, y);
                if grid.get(pos).is_empty() {
                    continue;
                }
                let mut rng = cell_rng(seed, chronon, grid.index_of(pos));
                self.apply(grid, pos, writer, &mut rng);
            }
        }
    }
}
