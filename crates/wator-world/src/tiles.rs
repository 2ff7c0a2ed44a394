//! Column-range partitioning of the grid into tiles.

use std::ops::Range;
use wator_core::{Error, Result};

/// Tile boundaries over the X dimension. Tile `i` owns columns
/// `starts[i]..starts[i + 1]`; the last tile absorbs the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTable {
    starts: Vec<i32>,
}

impl TileTable {
    pub fn new(width: i32, num_tiles: usize) -> Result<Self> {
        if width <= 0 || num_tiles == 0 || num_tiles > width as usize {
            return Err(Error::Validation(format!(
                "cannot split {} columns into {} tiles",
                width, num_tiles
            )));
        }

        let tile_width = width / num_tiles as i32;
        let mut starts: Vec<i32> = (0..num_tiles as i32).map(|i| i * tile_width).collect();
        starts.push(width);

        Ok(Self { starts })
    }

    pub fn num_tiles(&self) -> usize {
        self.starts.len() - 1
    }

    /// The `num_tiles + 1` boundaries.
    pub fn boundaries(&self) -> &[i32] {
        &self.starts
    }

    /// Tile owning column `x`. Columns at or past the final boundary fall
    /// back to the last tile.
    pub fn tile_of(&self, x: i32) -> usize {
        let last = self.num_tiles() - 1;
        self.starts[1..].partition_point(|&end| end <= x).min(last)
    }

    pub fn range(&self, tile: usize) -> Range<i32> {
        self.starts[tile]..self.starts[tile + 1]
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<i32>> + '_ {
        self.starts.windows(2).map(|pair| pair[0]..pair[1])
    }
}
