//! Gridwire simulation core
//!
//! The engine core for tile-grid logic puzzles: grid-positioned entities
//! ("tiles") whose behavior is composed from capability components, wired
//! together through a typed, priority-ordered event dispatch and a directed
//! signal-wire network with digital-circuit semantics (persistent power,
//! momentary signals, integer value broadcasts). A discrete tick clock
//! drives all time-dependent behavior.
//!
//! The core is a library consumed by a host loop; it has no process
//! boundary, no rendering and no device awareness. Everything runs on one
//! logical thread and event dispatch is synchronous and re-entrant.

pub mod blueprint;
pub mod busy;
pub mod config;
pub mod error;
pub mod sim;
pub mod tick;
pub mod wire;

pub use blueprint::{Blueprint, ComponentCatalog, ComponentSpec, PortSpec, TileSpec, WireSpec};
pub use busy::{BusyGate, BusyToken};
pub use config::SimConfig;
pub use error::{CoreError, Result};
pub use sim::{
    Cell, Component, Direction, Event, EventKind, EventType, Layer, Priority, Registry, Routing,
    Subscription, Tile, TileId, World,
};
pub use tick::{TickClock, TickStamp};
pub use wire::{Port, PortDir, PortFlags, PortId, PortKind, Wire, WireId, WireOptions};
