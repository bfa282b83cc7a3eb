//! Tile/component simulation: grid vocabulary, entities, events and dispatch

pub mod component;
pub mod event;
pub mod registry;
pub mod tile;
pub mod world;

pub use component::{Component, Priority, Subscription};
pub use event::{Event, EventKind, EventType};
pub use registry::Registry;
pub use tile::Tile;
pub use world::{Routing, World};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable tile identity, preserved across save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(Uuid);

impl TileId {
    /// A fresh random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for TileId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tile({})", self.0)
    }
}

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step in `dir`.
    pub fn neighbor(self, dir: Direction) -> Cell {
        let (dx, dy) = dir.delta();
        Cell::new(self.x + dx, self.y + dy)
    }
}

/// Grid layer a tile occupies.
///
/// Cell routing delivers low to high: `Floor`, `Static`, `Dynamic`, `Wall`.
/// The derived `Ord` fixes that order; at most one tile occupies a given
/// (cell, layer) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Floor,
    Static,
    Dynamic,
    Wall,
}

impl Layer {
    /// All layers in delivery order.
    pub const ALL: [Layer; 4] = [Layer::Floor, Layer::Static, Layer::Dynamic, Layer::Wall];

    pub(crate) fn index(self) -> usize {
        match self {
            Layer::Floor => 0,
            Layer::Static => 1,
            Layer::Dynamic => 2,
            Layer::Wall => 3,
        }
    }
}

/// Movement/push direction on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Grid offset for one step in this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}
