//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Apply toroidal wrapping for given world dimensions
    pub fn wrap(&self, width: i32, height: i32) -> Self {
        Self {
            x: self.x.rem_euclid(width),
            y: self.y.rem_euclid(height),
        }
    }

    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_delta();
        self.add(dx, dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal (von Neumann) movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    West,
    East,
    South,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
        }
    }

    /// All directions in neighbor scan order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::West,
            Direction::East,
            Direction::South,
        ]
    }
}

/// What occupies a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Fish,
    Shark,
}

impl CellKind {
    pub fn as_u8(self) -> u8 {
        match self {
            CellKind::Empty => 0,
            CellKind::Fish => 1,
            CellKind::Shark => 2,
        }
    }

    /// Inverse of [`CellKind::as_u8`]; unknown tags read as empty.
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            1 => CellKind::Fish,
            2 => CellKind::Shark,
            _ => CellKind::Empty,
        }
    }
}

/// Cell state. `energy` only means something for sharks, `breed_timer`
/// for fish and sharks. Empty cells are all-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub energy: i32,
    pub breed_timer: i32,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        kind: CellKind::Empty,
        energy: 0,
        breed_timer: 0,
    };

    pub fn empty() -> Self {
        Self::EMPTY
    }

    pub fn fish(breed_timer: i32) -> Self {
        Self {
            kind: CellKind::Fish,
            energy: 0,
            breed_timer,
        }
    }

    pub fn shark(energy: i32, breed_timer: i32) -> Self {
        Self {
            kind: CellKind::Shark,
            energy,
            breed_timer,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty
    }

    pub fn is_fish(&self) -> bool {
        self.kind == CellKind::Fish
    }

    pub fn is_shark(&self) -> bool {
        self.kind == CellKind::Shark
    }
}
