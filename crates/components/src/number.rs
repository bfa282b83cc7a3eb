//! Number-port components

use crate::{patch_config, wire_hits_input};
use anyhow::Result;
use gridwire::{Component, Event, EventKind, EventType, PortId, Subscription, TileId, World};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Input port whose activations are counted (signal pulses or power
    /// rising edges).
    pub count_input: usize,
    /// Optional input port that rewinds the counter.
    pub reset_input: Option<usize>,
    /// Output Number port broadcasting the tally.
    pub output: usize,
    /// Value the counter rewinds to.
    pub reset_to: i32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            count_input: 0,
            reset_input: None,
            output: 0,
            reset_to: 0,
        }
    }
}

/// Counts activations and broadcasts the tally as a number.
///
/// A reset broadcasts with `force_resend` even when the tally is unchanged,
/// so downstream listeners resynchronize after a rewind to the same value.
pub struct Counter {
    config: CounterConfig,
    count: i32,
}

impl Counter {
    pub fn new(config: CounterConfig) -> Self {
        let count = config.reset_to;
        Self { config, count }
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    fn output(&self, tile: TileId) -> PortId {
        PortId::output(tile, self.config.output)
    }
}

impl Component for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::WireActivated),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                world.send_value(self.output(tile), self.count, true)?;
            }
            EventKind::WireActivated { wire } => {
                if wire_hits_input(world, wire, tile, self.config.count_input) {
                    self.count += 1;
                    world.send_value(self.output(tile), self.count, false)?;
                } else if let Some(reset) = self.config.reset_input {
                    if wire_hits_input(world, wire, tile, reset) {
                        self.count = self.config.reset_to;
                        tracing::debug!(%tile, to = self.count, "counter reset");
                        world.send_value(self.output(tile), self.count, true)?;
                    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use gridwire::{Cell, Layer, PortKind, WireOptions};

    /// Probe that records every value arriving at its input.
    struct ValueProbe {
        seen: Vec<i32>,
    }

    impl Component for ValueProbe {
        fn name(&self) -> &str {
            "value-probe"
        }

        fn subscriptions(&self) -> Vec<Subscription> {
            vec![Subscription::normal(EventType::ValueChanged)]
        }

        fn handle(&mut self, _world: &mut World, _tile: TileId, event: &mut Event) -> Result<()> {
            if let EventKind::ValueChanged { value, .. } = *event.kind() {
                self.seen.push(value);
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

    fn rig() -> (World, PortId, PortId, TileId, TileId) {
        let mut world = World::default();

        let button = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
        let button_out = world.add_output(button, PortKind::Signal).unwrap();

        let resetter = world.create_tile(Cell::new(0, 1), Layer::Static).unwrap();
        let reset_out = world.add_output(resetter, PortKind::Signal).unwrap();

        let counter_tile = world.create_tile(Cell::new(1, 0), Layer::Static).unwrap();
        let count_in = world.add_input(counter_tile, PortKind::Signal).unwrap();
        let reset_in = world.add_input(counter_tile, PortKind::Signal).unwrap();
        let value_out = world.add_output(counter_tile, PortKind::Number).unwrap();
        world
            .attach(
                counter_tile,
                Box::new(Counter::new(CounterConfig {
                    reset_input: Some(1),
                    ..Default::default()
                })),
            )
            .unwrap();

        let display = world.create_tile(Cell::new(2, 0), Layer::Static).unwrap();
        let display_in = world.add_input(display, PortKind::Number).unwrap();
        world
            .attach(display, Box::new(ValueProbe { seen: Vec::new() }))
            .unwrap();

        world.connect(button_out, count_in, WireOptions::NONE).unwrap();
        world.connect(reset_out, reset_in, WireOptions::NONE).unwrap();
        world.connect(value_out, display_in, WireOptions::NONE).unwrap();
        world.start().unwrap();
        (world, button_out, reset_out, counter_tile, display)
    }

    #[test]
    fn test_counts_pulses() {
        let (mut world, button, _reset, counter_tile, display) = rig();

        world.send_signal(button).unwrap();
        world.send_signal(button).unwrap();
        world.send_signal(button).unwrap();

        assert_eq!(world.component::<Counter>(counter_tile).unwrap().count(), 3);
        let probe = world.component::<ValueProbe>(display).unwrap();
        assert_eq!(probe.seen, vec![0, 1, 2, 3]); // 0 from the Start resync
    }

    #[test]
    fn test_reset_forces_resend() {
        let (mut world, button, reset, counter_tile, display) = rig();

        // Never counted: the tally is already at the reset value, yet the
        // reset must still broadcast so listeners resynchronize.
        world.send_signal(reset).unwrap();
        assert_eq!(world.component::<Counter>(counter_tile).unwrap().count(), 0);
        let probe = world.component::<ValueProbe>(display).unwrap();
        assert_eq!(probe.seen, vec![0, 0]);

        world.send_signal(button).unwrap();
        world.send_signal(reset).unwrap();
        let probe = world.component::<ValueProbe>(display).unwrap();
        assert_eq!(probe.seen, vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_unchanged_value_is_deduplicated() {
        let (mut world, _button, _reset, counter_tile, display) = rig();

        // Re-sending the current tally without force is a no-op downstream.
        let out = PortId::output(counter_tile, 0);
        world.send_value(out, 0, false).unwrap();
        let probe = world.component::<ValueProbe>(display).unwrap();
        assert_eq!(probe.seen, vec![0]);
    }
}
