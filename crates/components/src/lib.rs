//! Gridwire standard components
//!
//! The concrete puzzle mechanics built on the gridwire core: power sources
//! and consumers, combinational logic gates, tick-driven state machines
//! (delays, cyclers, sequence detectors), number broadcasters and the
//! door/floor mechanics that exercise query and busy-gate semantics.

pub mod catalog;
pub mod door;
pub mod logic;
pub mod number;
pub mod power;
pub mod sequence;
pub mod timing;

// Re-export core types for convenience
pub use gridwire::{Component, Event, EventKind, EventType, Subscription, TileId, World};

pub use catalog::standard_catalog;
pub use door::{Door, DoorConfig, Floor};
pub use logic::{AndGate, GateConfig, NotGate, OrGate, XandGate};
pub use number::{Counter, CounterConfig};
pub use power::{Powerable, PowerableConfig, Switch, SwitchConfig, SwitchRoster};
pub use sequence::{SequenceConfig, SequenceDetector};
pub use timing::{Cycle, CycleConfig, Delay, DelayConfig};

use gridwire::{PortId, WireId};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// True iff `wire` exists and terminates at `input` of `tile`.
///
/// Wire notifications are delivered per tile, not per port; components with
/// more than one input use this to ignore traffic for their other ports.
pub fn wire_hits_input(world: &World, wire: WireId, tile: TileId, input: usize) -> bool {
    world
        .wire(wire)
        .map(|w| w.to() == PortId::input(tile, input))
        .unwrap_or(false)
}

/// Patch one key of a serde-backed component config.
///
/// Shared implementation behind every component's
/// [`apply_property`](gridwire::Component::apply_property): the config is
/// round-tripped through JSON with the key replaced, so property names and
/// value shapes match the blueprint format exactly. The editor re-dispatches
/// `Start` afterwards to re-derive runtime state.
pub fn patch_config<T: Serialize + DeserializeOwned>(
    config: &mut T,
    component: &str,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let mut raw = serde_json::to_value(&*config)?;
    let map = raw
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("component '{component}' has a non-object config"))?;
    if !map.contains_key(key) {
        anyhow::bail!("component '{component}' has no property '{key}'");
    }
    map.insert(key.to_string(), value.clone());
    *config = serde_json::from_value(raw)?;
    Ok(())
}
