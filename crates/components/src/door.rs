//! Doors and floors: the movement-query consumers
//!
//! Movement queries use both base event fields per their contracts: a tile
//! grants entry by setting the sticky query result true, and a solid
//! occupant vetoes by marking the query handled. The host accepts a move
//! iff `granted() && !is_handled()` after routing the query through the
//! destination cell.

use crate::patch_config;
use anyhow::Result;
use gridwire::{
    BusyToken, Component, Event, EventKind, EventType, PortId, Subscription, TickStamp, TileId,
    World,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    /// Governing input Power port; an unwired door is simply always open.
    pub input: usize,
    /// Ticks one open/close transition takes. Zero snaps instantly.
    pub transition_ticks: u32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            input: 0,
            transition_ticks: 2,
        }
    }
}

#[derive(Debug)]
struct Transition {
    target_open: bool,
    remaining: u32,
    /// Holds the busy gate for the duration of the swing; dropping the
    /// transition releases it on every path.
    _token: BusyToken,
}

/// A powered door: open while its input is energized.
///
/// Transitions take [`transition_ticks`](DoorConfig::transition_ticks)
/// ticks, during which the busy gate is held and the door vetoes entry. A
/// power flip mid-swing retargets the same transition rather than stacking
/// a second one.
pub struct Door {
    config: DoorConfig,
    open: bool,
    transition: Option<Transition>,
    stamp: TickStamp,
}

impl Door {
    pub fn new(config: DoorConfig) -> Self {
        Self {
            config,
            open: false,
            transition: None,
            stamp: TickStamp::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_moving(&self) -> bool {
        self.transition.is_some()
    }

    fn sync_activation(&mut self, world: &mut World, tile: TileId) -> Result<()> {
        let want_open = world.input_has_power(PortId::input(tile, self.config.input))?;
        if let Some(transition) = &mut self.transition {
            if transition.target_open != want_open {
                transition.target_open = want_open;
                transition.remaining = self.config.transition_ticks;
                tracing::debug!(%tile, open = want_open, "door transition retargeted");
            }
        } else if want_open != self.open {
            if self.config.transition_ticks == 0 {
                self.open = want_open;
            } else {
                self.stamp.mark(world.clock().tick());
                self.transition = Some(Transition {
                    target_open: want_open,
                    remaining: self.config.transition_ticks,
                    _token: world.busy().acquire(),
                });
                tracing::debug!(%tile, open = want_open, "door transition started");
            }
        }
        Ok(())
    }
}

impl Component for Door {
    fn name(&self) -> &str {
        "door"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::PowerChanged),
            Subscription::normal(EventType::Tick),
            Subscription::normal(EventType::CanMove),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                // Load snaps to the derived state, no swing and no busy hold.
                self.transition = None;
                self.open = world.input_has_power(PortId::input(tile, self.config.input))?;
            }
            EventKind::PowerChanged { .. } => {
                self.sync_activation(world, tile)?;
            }
            EventKind::Tick { tick } => {
                if !self.stamp.try_mark(tick) {
                    return Ok(());
                }
                if let Some(transition) = &mut self.transition {
                    transition.remaining -= 1;
                    if transition.remaining == 0 {
                        self.open = transition.target_open;
                        self.transition = None;
                        tracing::debug!(%tile, open = self.open, "door transition finished");
                    }
                }
            }
            EventKind::CanMove { .. } => {
                if self.open && self.transition.is_none() {
                    event.set_result(true);
                } else {
                    event.set_handled();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_property(&mut self, key: &str, value: &serde_json::Value) -> Result<()> {
        let name = self.name().to_string();
        patch_config(&mut self.config, &name, key, value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Walkable ground: grants every movement query into its cell.
#[derive(Debug, Default)]
pub struct Floor;

impl Floor {
    pub fn new() -> Self {
        Self
    }
}

impl Component for Floor {
    fn name(&self) -> &str {
        "floor"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::normal(EventType::CanMove)]
    }

    fn handle(&mut self, _world: &mut World, _tile: TileId, event: &mut Event) -> Result<()> {
        if matches!(event.kind(), EventKind::CanMove { .. }) {
            event.set_result(true);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
