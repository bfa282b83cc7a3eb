//! Power sources and consumers

use crate::patch_config;
use anyhow::Result;
use gridwire::{Component, Event, EventKind, EventType, PortId, Subscription, TileId, World};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Output Power port driven by the switch.
    pub output: usize,
    pub initially_on: bool,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            output: 0,
            initially_on: false,
        }
    }
}

/// Puzzle-scoped roster of every switch, kept in the world registry so
/// hosts can enumerate them without scanning tiles. Lives and dies with
/// its world; nothing leaks between separately loaded puzzles.
#[derive(Debug, Default)]
pub struct SwitchRoster {
    tiles: Vec<TileId>,
}

impl SwitchRoster {
    fn note(&mut self, tile: TileId) {
        if !self.tiles.contains(&tile) {
            self.tiles.push(tile);
        }
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }
}

/// A player-toggled power source.
///
/// Handles the `Use` command cooperatively: only the first handler that
/// observes the event unhandled performs the toggle, then marks it handled.
pub struct Switch {
    config: SwitchConfig,
    on: bool,
}

impl Switch {
    pub fn new(config: SwitchConfig) -> Self {
        let on = config.initially_on;
        Self { config, on }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    fn output(&self, tile: TileId) -> PortId {
        PortId::output(tile, self.config.output)
    }
}

impl Component for Switch {
    fn name(&self) -> &str {
        "switch"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::Use),
            Subscription::normal(EventType::CanUse),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                world
                    .registry_mut()
                    .get_or_insert_with(SwitchRoster::default)
                    .note(tile);
                world.set_powered(self.output(tile), self.on)?;
            }
            EventKind::Use { .. } => {
                if event.is_handled() {
                    return Ok(());
                }
                self.on = !self.on;
                tracing::debug!(%tile, on = self.on, "switch toggled");
                world.set_powered(self.output(tile), self.on)?;
                event.set_handled();
            }
            EventKind::CanUse { .. } => {
                event.set_result(true);
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerableConfig {
    /// Input Power port observed.
    pub input: usize,
}

impl Default for PowerableConfig {
    fn default() -> Self {
        Self { input: 0 }
    }
}

/// Tracks whether its input port is energized.
///
/// An unwired input reads powered, so a powerable mechanic dropped into a
/// puzzle with no wiring is simply always on; sibling components consult
/// [`is_on`](Self::is_on) to gate their own behavior.
pub struct Powerable {
    config: PowerableConfig,
    powered: bool,
}

impl Powerable {
    pub fn new(config: PowerableConfig) -> Self {
        Self {
            config,
            powered: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.powered
    }
}

impl Component for Powerable {
    fn name(&self) -> &str {
        "powerable"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            // Before sibling components at the default priority, so they
            // observe the refreshed state within the same dispatch.
            Subscription::new(EventType::Start, -100),
            Subscription::new(EventType::PowerChanged, -100),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, _event: &mut Event) -> Result<()> {
        self.powered = world.input_has_power(PortId::input(tile, self.config.input))?;
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
