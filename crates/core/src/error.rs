//! Error types for the gridwire core

use crate::sim::{Cell, Layer, TileId};
use crate::wire::{PortId, PortKind, WireId};
use thiserror::Error;

/// Main result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Primary error type for the simulation core.
///
/// Structural violations (dangling endpoints, mismatched ports) are
/// programming or authoring errors surfaced eagerly; puzzle-logic "failure"
/// (an unanswered query, an unaccepted command) is never an error and is
/// represented in event payload fields instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown tile {0}")]
    UnknownTile(TileId),

    #[error("tile {0} already exists")]
    DuplicateTile(TileId),

    #[error("unknown wire {0}")]
    UnknownWire(WireId),

    #[error("no such port {0}")]
    UnknownPort(PortId),

    #[error("tile {tile} has no component in slot {slot}")]
    UnknownComponent { tile: TileId, slot: usize },

    #[error("cell {0:?} already occupied on layer {1:?}")]
    CellOccupied(Cell, Layer),

    #[error("{0} is not an output port")]
    NotAnOutput(PortId),

    #[error("{0} is not an input port")]
    NotAnInput(PortId),

    #[error("port kinds differ: {from} is {from_kind:?}, {to} is {to_kind:?}")]
    KindMismatch {
        from: PortId,
        from_kind: PortKind,
        to: PortId,
        to_kind: PortKind,
    },

    #[error("self-wiring {0} -> {1} is not allowed for this port")]
    SelfWireForbidden(PortId, PortId),

    #[error("{op} expects a {expected:?} port, {port} is {actual:?}")]
    WrongPortKind {
        op: &'static str,
        port: PortId,
        expected: PortKind,
        actual: PortKind,
    },

    #[error("cyclic wiring: cascade exceeded depth {depth} dispatching {event} to {tile}")]
    CyclicCascade {
        tile: TileId,
        event: &'static str,
        depth: usize,
    },

    #[error("component '{name}' failed handling {event}: {reason}")]
    Handler {
        name: String,
        event: &'static str,
        reason: anyhow::Error,
    },

    #[error("blueprint error: {0}")]
    Blueprint(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("toml encode error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
