//! Shared next-state buffer and the synchronized cell writer.
//!
//! Every buffer slot is an atomic word holding a packed [`Cell`]. A write
//! into the writer's own tile arbitrates with a compare-and-swap and takes
//! no lock. A write into a foreign tile first acquires that tile's lock, so
//! cross-tile writers are serialized per destination tile while unrelated
//! tiles never contend. At most one foreign lock is held at a time and only
//! for the duration of a single write.

use crate::grid::{area, row_major, Grid};
use crate::rules::CellWriter;
use crate::tiles::TileTable;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;
use wator_core::{Cell, CellKind, Position};

const KIND_BITS: u32 = 2;
const KIND_MASK: u64 = (1 << KIND_BITS) - 1;
const FIELD_BITS: u32 = 31;
const FIELD_MASK: u64 = (1 << FIELD_BITS) - 1;
const ENERGY_SHIFT: u32 = KIND_BITS;
const TIMER_SHIFT: u32 = KIND_BITS + FIELD_BITS;

/// Smallest energy / breed timer value a buffer slot can hold.
pub const FIELD_MIN: i32 = -(1 << (FIELD_BITS - 1));
/// Largest energy / breed timer value a buffer slot can hold.
pub const FIELD_MAX: i32 = (1 << (FIELD_BITS - 1)) - 1;

fn pack_field(value: i32) -> u64 {
    value.clamp(FIELD_MIN, FIELD_MAX) as u32 as u64 & FIELD_MASK
}

fn unpack_field(bits: u64) -> i32 {
    // Sign-extend from 31 bits
    (((bits & FIELD_MASK) as u32) << 1) as i32 >> 1
}

/// Encode a cell into one word. The empty cell encodes as zero.
pub fn pack(cell: Cell) -> u64 {
    cell.kind.as_u8() as u64
        | pack_field(cell.energy) << ENERGY_SHIFT
        | pack_field(cell.breed_timer) << TIMER_SHIFT
}

pub fn unpack(word: u64) -> Cell {
    Cell {
        kind: kind_of(word),
        energy: unpack_field(word >> ENERGY_SHIFT),
        breed_timer: unpack_field(word >> TIMER_SHIFT),
    }
}

fn kind_of(word: u64) -> CellKind {
    CellKind::from_u8((word & KIND_MASK) as u8)
}

/// Whether `incoming` may replace `existing` in the buffer.
///
/// | existing | incoming     | result   |
/// |----------|--------------|----------|
/// | Empty    | any          | accepted |
/// | Fish     | Shark        | accepted |
/// | Shark    | Empty        | accepted |
/// | Fish     | Fish, Empty  | rejected |
/// | Shark    | Fish, Shark  | rejected |
pub fn arbitrate(existing: CellKind, incoming: CellKind) -> bool {
    matches!(
        (existing, incoming),
        (CellKind::Empty, _) | (CellKind::Fish, CellKind::Shark) | (CellKind::Shark, CellKind::Empty)
    )
}

/// Write counters collected by one [`TileWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterStats {
    pub accepted: u64,
    pub rejected: u64,
    /// Writes that crossed into a foreign tile and took its lock.
    pub lock_acquisitions: u64,
}

impl WriterStats {
    pub fn merge(self, other: WriterStats) -> WriterStats {
        WriterStats {
            accepted: self.accepted + other.accepted,
            rejected: self.rejected + other.rejected,
            lock_acquisitions: self.lock_acquisitions + other.lock_acquisitions,
        }
    }
}

/// The next-state buffer shared by all tile workers during a step.
pub struct SharedBuffer {
    width: i32,
    height: i32,
    slots: Vec<AtomicU64>,
    tiles: TileTable,
    locks: Vec<Mutex<()>>,
}

impl SharedBuffer {
    pub fn new(width: i32, height: i32, tiles: TileTable) -> Self {
        let size = area(width, height);
        let locks = (0..tiles.num_tiles()).map(|_| Mutex::new(())).collect();
        Self {
            width,
            height,
            slots: (0..size).map(|_| AtomicU64::new(0)).collect(),
            tiles,
            locks,
        }
    }

    pub fn tiles(&self) -> &TileTable {
        &self.tiles
    }

    /// A writer acting on behalf of the worker that owns `owner_tile`.
    pub fn writer(&self, owner_tile: usize) -> TileWriter<'_> {
        TileWriter {
            buffer: self,
            owner: owner_tile,
            stats: WriterStats::default(),
        }
    }

    fn index_of(&self, pos: Position) -> (Position, usize) {
        let wrapped = pos.wrap(self.width, self.height);
        (wrapped, row_major(self.width, wrapped))
    }

    /// Read a slot. Only meaningful between steps or in tests.
    pub fn get(&self, pos: Position) -> Cell {
        let (_, index) = self.index_of(pos);
        unpack(self.slots[index].load(Ordering::Acquire))
    }

    /// Arbitrated store into a single slot. A rejection reports the kind
    /// the slot held when arbitration failed.
    fn commit(&self, index: usize, incoming: Cell) -> Result<(), CellKind> {
        let slot = &self.slots[index];
        let packed = pack(incoming);
        let mut current = slot.load(Ordering::Acquire);
        loop {
            let existing = kind_of(current);
            if !arbitrate(existing, incoming.kind) {
                return Err(existing);
            }
            match slot.compare_exchange_weak(current, packed, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_clear(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| slot.load(Ordering::Acquire) == 0)
    }

    /// Move the buffer contents into a new grid, leaving every slot empty.
    /// Taking `&mut self` guarantees no worker is still writing.
    pub fn take_grid(&mut self) -> Grid {
        let cells = self
            .slots
            .iter_mut()
            .map(|slot| unpack(std::mem::take(slot.get_mut())))
            .collect();
        Grid::from_parts(self.width, self.height, cells)
    }
}

/// Per-worker handle onto the shared buffer.
pub struct TileWriter<'a> {
    buffer: &'a SharedBuffer,
    owner: usize,
    stats: WriterStats,
}

impl TileWriter<'_> {
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn into_stats(self) -> WriterStats {
        self.stats
    }
}

impl CellWriter for TileWriter<'_> {
    fn try_write(&mut self, pos: Position, cell: Cell) -> Result<(), CellKind> {
        let (wrapped, index) = self.buffer.index_of(pos);
        let target = self.buffer.tiles.tile_of(wrapped.x);

        let outcome = if target == self.owner {
            self.buffer.commit(index, cell)
        } else {
            let _guard = self.buffer.locks[target].lock();
            self.stats.lock_acquisitions += 1;
            self.buffer.commit(index, cell)
        };

        match outcome {
            Ok(()) => self.stats.accepted += 1,
            Err(holder) => {
                self.stats.rejected += 1;
                trace!(
                    owner = self.owner,
                    target,
                    x = wrapped.x,
                    y = wrapped.y,
                    kind = ?cell.kind,
                    holder = ?holder,
                    "write rejected"
                );
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn buffer(width: i32, height: i32, tiles: usize) -> SharedBuffer {
        SharedBuffer::new(width, height, TileTable::new(width, tiles).unwrap())
    }

    #[test]
    fn test_pack_roundtrip_edges() {
        for cell in [
            Cell::EMPTY,
            Cell::fish(5),
            Cell::fish(-7),
            Cell::shark(4, 10),
            Cell::shark(-1, -3),
            Cell::shark(FIELD_MAX, FIELD_MIN),
        ] {
            assert_eq!(unpack(pack(cell)), cell);
        }
        assert_eq!(pack(Cell::EMPTY), 0);
    }

    #[test]
    fn test_pack_saturates_out_of_range_fields() {
        let cell = unpack(pack(Cell::shark(i32::MAX, i32::MIN)));
        assert_eq!(cell.energy, FIELD_MAX);
        assert_eq!(cell.breed_timer, FIELD_MIN);
    }

    #[test]
    fn test_arbitration_matrix() {
        use CellKind::*;
        let expected = [
            (Empty, Empty, true),
            (Empty, Fish, true),
            (Empty, Shark, true),
            (Fish, Empty, false),
            (Fish, Fish, false),
            (Fish, Shark, true),
            (Shark, Empty, true),
            (Shark, Fish, false),
            (Shark, Shark, false),
        ];
        for (existing, incoming, accepted) in expected {
            assert_eq!(
                arbitrate(existing, incoming),
                accepted,
                "{:?} <- {:?}",
                existing,
                incoming
            );
        }
    }

    #[test]
    fn test_arbitration_applied_in_buffer() {
        let shared = buffer(4, 4, 1);
        let mut writer = shared.writer(0);
        let pos = Position::new(1, 2);

        assert!(writer.write(pos, Cell::fish(3)));
        assert!(!writer.write(pos, Cell::fish(9)));
        assert_eq!(shared.get(pos), Cell::fish(3));

        assert!(writer.write(pos, Cell::shark(5, 2)));
        assert!(!writer.write(pos, Cell::shark(1, 1)));
        assert_eq!(writer.try_write(pos, Cell::fish(1)), Err(CellKind::Shark));
        assert_eq!(shared.get(pos), Cell::shark(5, 2));

        assert!(writer.write(pos, Cell::EMPTY));
        assert_eq!(shared.get(pos), Cell::EMPTY);

        let stats = writer.stats();
        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 3);
        assert_eq!(stats.lock_acquisitions, 0);
    }

    #[test]
    fn test_cross_tile_write_takes_lock() {
        let shared = buffer(8, 2, 2);
        let mut writer = shared.writer(0);

        assert!(writer.write(Position::new(3, 0), Cell::fish(1)));
        assert_eq!(writer.stats().lock_acquisitions, 0);

        assert!(writer.write(Position::new(4, 0), Cell::fish(1)));
        // Wraps to column 7, also foreign
        assert!(writer.write(Position::new(-1, 1), Cell::fish(1)));
        assert_eq!(writer.stats().lock_acquisitions, 2);
        assert!(shared.get(Position::new(7, 1)).is_fish());
    }

    #[test]
    fn test_take_grid_clears_buffer() {
        let mut shared = buffer(3, 3, 3);
        {
            let mut writer = shared.writer(1);
            writer.write(Position::new(0, 0), Cell::shark(2, 2));
            writer.write(Position::new(1, 1), Cell::fish(4));
        }
        assert!(!shared.is_clear());

        let grid = shared.take_grid();
        assert_eq!(grid.get(Position::new(0, 0)), Cell::shark(2, 2));
        assert_eq!(grid.get(Position::new(1, 1)), Cell::fish(4));
        assert_eq!(grid.count(CellKind::Empty), 7);
        assert!(shared.is_clear());
    }

    #[test]
    fn test_contended_writes_accept_exactly_one_per_cell() {
        let width = 16;
        let height = 8;
        let tiles = 4;
        let shared = Arc::new(buffer(width, height, tiles));

        let handles: Vec<_> = (0..tiles)
            .map(|owner| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut writer = shared.writer(owner);
                    for y in 0..height {
                        for x in 0..width {
                            writer.write(Position::new(x, y), Cell::fish(owner as i32 + 1));
                        }
                    }
                    writer.into_stats()
                })
            })
            .collect();

        let total = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .fold(WriterStats::default(), WriterStats::merge);

        let cells = (width * height) as u64;
        assert_eq!(total.accepted, cells);
        assert_eq!(total.rejected, cells * (tiles as u64 - 1));
        // Each worker touched three foreign tiles' worth of columns
        assert_eq!(total.lock_acquisitions, cells * (tiles as u64 - 1));
    }
}
