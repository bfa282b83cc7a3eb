//! The component capability trait and its registration types

use crate::sim::{Event, EventType, TileId, World};
use anyhow::Result;
use std::any::Any;

/// Dispatch priority. Lower values run first; ties run in registration order.
pub type Priority = i32;

/// One event-type registration declared by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub event: EventType,
    pub priority: Priority,
}

impl Subscription {
    pub fn new(event: EventType, priority: Priority) -> Self {
        Self { event, priority }
    }

    /// Registration at the default priority of 0.
    pub fn normal(event: EventType) -> Self {
        Self::new(event, 0)
    }
}

/// A unit of behavior attached to a tile.
///
/// Components declare the event types they handle (and at what priority)
/// through [`subscriptions`](Self::subscriptions); the owning tile builds
/// its dispatch table from those declarations whenever the attached set or
/// an enabled flag changes. Handlers run synchronously and may send further
/// events through the world, re-entrantly.
pub trait Component: Any {
    /// Stable component name, used for diagnostics and the blueprint
    /// catalog.
    fn name(&self) -> &str;

    /// The handler set this component registers while enabled.
    ///
    /// Must be stable for a given component state: it is re-read on every
    /// dispatch-table rebuild and repeated enable/disable cycles must
    /// produce identical registrations.
    fn subscriptions(&self) -> Vec<Subscription>;

    /// Handle one event. `tile` is the owning tile.
    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()>;

    /// Called when the component becomes enabled (including initial attach).
    fn on_enable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when the component becomes disabled (including detach).
    fn on_disable(&mut self) -> Result<()> {
        Ok(())
    }

    /// Apply an authoring-time property change.
    ///
    /// The editor mutates components through this surface and then
    /// re-dispatches [`Event::start`](crate::Event::start) so runtime state
    /// is re-derived; there is no separate editing API.
    fn apply_property(&mut self, key: &str, _value: &serde_json::Value) -> Result<()> {
        anyhow::bail!("component '{}' has no property '{}'", self.name(), key)
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
