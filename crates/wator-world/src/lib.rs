//! Tiled parallel Wa-Tor engine.
//!
//! The grid is split into column tiles that are advanced in parallel each
//! chronon. Workers read the frozen grid and write the shared next-state
//! buffer through a writer that arbitrates conflicting writes per cell and
//! locks only when the destination belongs to another tile.

pub mod buffer;
pub mod grid;
pub mod reference;
pub mod rules;
pub mod simulation;
pub mod tiles;

pub use buffer::{arbitrate, SharedBuffer, TileWriter, WriterStats};
pub use grid::{Grid, NeighborSet, Population};
pub use rules::{CellWriter, PickSource, Rules};
pub use simulation::{StepReport, Wator};
pub use tiles::TileTable;
