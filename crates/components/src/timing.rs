//! Tick-driven state machines: delays and cyclers
//!
//! Both follow the shared shape: activation of the governing input arms the
//! machine and resets its counter, each tick advances it toward a threshold,
//! and deactivation drops straight back to idle. A
//! [`TickStamp`](gridwire::TickStamp) guards every tick handler so cascades
//! inside one tick cannot advance the machine twice.

use crate::patch_config;
use anyhow::Result;
use gridwire::{
    Component, Event, EventKind, EventType, PortId, Subscription, TickStamp, TileId, World,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// Governing input Power port.
    pub input: usize,
    /// Output Power port raised on completion.
    pub output: usize,
    /// Ticks between activation and the output going live.
    pub delay_ticks: u32,
    /// Drop the output again when the governing input de-asserts.
    pub clear_on_deactivate: bool,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            input: 0,
            output: 0,
            delay_ticks: 1,
            clear_on_deactivate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelayState {
    Idle,
    Delaying { elapsed: u32 },
    Complete,
}

/// Powers its output a configured number of ticks after its input goes
/// live.
///
/// Deactivating before completion cancels outright: a later activation
/// counts from zero again, never resumes.
pub struct Delay {
    config: DelayConfig,
    state: DelayState,
    stamp: TickStamp,
}

impl Delay {
    pub fn new(config: DelayConfig) -> Self {
        Self {
            config,
            state: DelayState::Idle,
            stamp: TickStamp::new(),
        }
    }

    fn output(&self, tile: TileId) -> PortId {
        PortId::output(tile, self.config.output)
    }

    /// Fold the governing input into the state machine.
    fn sync_activation(&mut self, world: &mut World, tile: TileId) -> Result<()> {
        let active = world.input_has_power(PortId::input(tile, self.config.input))?;
        match (self.state, active) {
            (DelayState::Idle, true) => {
                if self.config.delay_ticks == 0 {
                    self.state = DelayState::Complete;
                    world.set_powered(self.output(tile), true)?;
                } else {
                    self.state = DelayState::Delaying { elapsed: 0 };
                    // The tick we were armed in must not count.
                    self.stamp.mark(world.clock().tick());
                }
            }
            (DelayState::Delaying { .. } | DelayState::Complete, false) => {
                self.state = DelayState::Idle;
                if self.config.clear_on_deactivate {
                    world.set_powered(self.output(tile), false)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Component for Delay {
    fn name(&self) -> &str {
        "delay"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::PowerChanged),
            Subscription::normal(EventType::Tick),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                self.state = DelayState::Idle;
                world.set_powered(self.output(tile), false)?;
                self.sync_activation(world, tile)?;
            }
            EventKind::PowerChanged { .. } => {
                self.sync_activation(world, tile)?;
            }
            EventKind::Tick { tick } => {
                if !self.stamp.try_mark(tick) {
                    return Ok(());
                }
                if let DelayState::Delaying { elapsed } = self.state {
                    let elapsed = elapsed + 1;
                    if elapsed >= self.config.delay_ticks {
                        self.state = DelayState::Complete;
                        tracing::debug!(%tile, tick, "delay elapsed");
                        world.set_powered(self.output(tile), true)?;
                    } else {
                        self.state = DelayState::Delaying { elapsed };
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Governing input Power port.
    pub input: usize,
    /// Output Power port whose wires are driven per their step bits.
    pub output: usize,
    /// Optional Number port broadcasting the current step index.
    pub value_output: Option<usize>,
    /// Number of steps before wrapping or clamping.
    pub steps: u32,
    /// Ticks spent on each step.
    pub ticks_per_step: u32,
    /// Wrap to step 0 at the end instead of clamping on the last step.
    pub looping: bool,
    /// Darken all output wires when the governing input de-asserts.
    pub clear_on_deactivate: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            input: 0,
            output: 0,
            value_output: None,
            steps: 1,
            ticks_per_step: 1,
            looping: true,
            clear_on_deactivate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Cycling { counter: u32 },
    Complete,
}

/// Steps an index through its configured range while active, lighting each
/// output wire whose option bit matches the current step (cycling decals)
/// and optionally broadcasting the index as a number.
pub struct Cycle {
    config: CycleConfig,
    state: CycleState,
    step: u32,
    stamp: TickStamp,
}

impl Cycle {
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            state: CycleState::Idle,
            step: 0,
            stamp: TickStamp::new(),
        }
    }

    /// Current step index.
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Drive every output wire per its bit for the current step; broadcast
    /// the index when a value port is configured.
    fn apply_step(&self, world: &mut World, tile: TileId, force_value: bool) -> Result<()> {
        let output = PortId::output(tile, self.config.output);
        for wire in world.port_wires(output)? {
            let expected = world.wire(wire)?.options().is_expected_at_step(self.step as usize);
            world.set_wire_enabled(wire, expected)?;
        }
        if let Some(index) = self.config.value_output {
            world.send_value(PortId::output(tile, index), self.step as i32, force_value)?;
        }
        Ok(())
    }

    fn darken_outputs(&self, world: &mut World, tile: TileId) -> Result<()> {
        let output = PortId::output(tile, self.config.output);
        for wire in world.port_wires(output)? {
            world.set_wire_enabled(wire, false)?;
        }
        Ok(())
    }

    fn sync_activation(&mut self, world: &mut World, tile: TileId) -> Result<()> {
        let active = world.input_has_power(PortId::input(tile, self.config.input))?;
        match (self.state, active) {
            (CycleState::Idle, true) => {
                self.state = CycleState::Cycling { counter: 0 };
                self.step = 0;
                self.stamp.mark(world.clock().tick());
                // Forced value resend: downstream listeners resynchronize
                // even if we stopped on step 0 last time.
                self.apply_step(world, tile, true)?;
            }
            (CycleState::Cycling { .. } | CycleState::Complete, false) => {
                self.state = CycleState::Idle;
                self.step = 0;
                if self.config.clear_on_deactivate {
                    self.darken_outputs(world, tile)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn advance(&mut self, world: &mut World, tile: TileId) -> Result<()> {
        self.step += 1;
        if self.step >= self.config.steps {
            if self.config.looping {
                self.step = 0;
            } else {
                self.step = self.config.steps.saturating_sub(1);
                self.state = CycleState::Complete;
            }
        }
        self.apply_step(world, tile, false)
    }
}

impl Component for Cycle {
    fn name(&self) -> &str {
        "cycle"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::PowerChanged),
            Subscription::normal(EventType::Tick),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                self.state = CycleState::Idle;
                self.step = 0;
                self.sync_activation(world, tile)?;
            }
            EventKind::PowerChanged { .. } => {
                self.sync_activation(world, tile)?;
            }
            EventKind::Tick { tick } => {
                if !self.stamp.try_mark(tick) {
                    return Ok(());
                }
                if let CycleState::Cycling { counter } = self.state {
                    let counter = counter + 1;
                    if counter >= self.config.ticks_per_step {
                        self.state = CycleState::Cycling { counter: 0 };
                        self.advance(world, tile)?;
                    } else {
                        self.state = CycleState::Cycling { counter };
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

    /// Source -> ticked component under test, plus per-step probe wires.
    fn rig(component: Box<dyn Component>) -> (World, PortId, PortId) {
        let mut world = World::default();
        let source = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
        let source_out = world.add_output(source, PortKind::Power).unwrap();

        let tile = world.create_tile(Cell::new(1, 0), Layer::Static).unwrap();
        let input = world.add_input(tile, PortKind::Power).unwrap();
        let output = world.add_output(tile, PortKind::Power).unwrap();
        world.attach(tile, component).unwrap();
        world.connect(source_out, input, WireOptions::NONE).unwrap();
        world.start().unwrap();
        (world, source_out, output)
    }

    #[test]
    fn test_delay_fires_exactly_after_delay_ticks() {
        let (mut world, source, output) = rig(Box::new(Delay::new(DelayConfig {
            delay_ticks: 3,
            ..Default::default()
        })));

        world.set_powered(source, true).unwrap(); // activate at tick 0
        for expected in [false, false, true] {
            world.step().unwrap();
            assert_eq!(world.output_powered(output).unwrap(), expected);
        }
    }

    #[test]
    fn test_delay_cancel_restarts_from_zero() {
        let (mut world, source, output) = rig(Box::new(Delay::new(DelayConfig {
            delay_ticks: 3,
            ..Default::default()
        })));

        world.set_powered(source, true).unwrap();
        world.step().unwrap(); // 1 of 3
        world.set_powered(source, false).unwrap(); // cancel

        world.set_powered(source, true).unwrap(); // restart: counts from 0
        world.step().unwrap();
        world.step().unwrap();
        assert!(!world.output_powered(output).unwrap());
        world.step().unwrap();
        assert!(world.output_powered(output).unwrap());
    }

    #[test]
    fn test_delay_clear_on_deactivate() {
        let (mut world, source, output) = rig(Box::new(Delay::new(DelayConfig {
            delay_ticks: 1,
            clear_on_deactivate: true,
            ..Default::default()
        })));

        world.set_powered(source, true).unwrap();
        world.step().unwrap();
        assert!(world.output_powered(output).unwrap());

        world.set_powered(source, false).unwrap();
        assert!(!world.output_powered(output).unwrap());
    }

    #[test]
    fn test_delay_holds_output_without_clear() {
        let (mut world, source, output) = rig(Box::new(Delay::new(DelayConfig {
            delay_ticks: 1,
            clear_on_deactivate: false,
            ..Default::default()
        })));

        world.set_powered(source, true).unwrap();
        world.step().unwrap();
        world.set_powered(source, false).unwrap();
        assert!(world.output_powered(output).unwrap());
    }

    /// Cycle with 4 steps over dedicated probe wires, two ticks per step.
    #[test]
    fn test_cycle_step_follows_tick_formula() {
        let mut world = World::default();
        let source = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
        let source_out = world.add_output(source, PortKind::Power).unwrap();

        let cycle_tile = world.create_tile(Cell::new(1, 0), Layer::Static).unwrap();
        let input = world.add_input(cycle_tile, PortKind::Power).unwrap();
        world.add_output(cycle_tile, PortKind::Power).unwrap();
        world
            .attach(
                cycle_tile,
                Box::new(Cycle::new(CycleConfig {
                    steps: 4,
                    ticks_per_step: 2,
                    looping: true,
                    ..Default::default()
                })),
            )
            .unwrap();
        world.connect(source_out, input, WireOptions::NONE).unwrap();
        world.start().unwrap();

        world.set_powered(source_out, true).unwrap();
        for ticks_elapsed in 1u32..=10 {
            world.step().unwrap();
            let expected = (ticks_elapsed / 2) % 4;
            let cycle = world.component::<Cycle>(cycle_tile).unwrap();
            assert_eq!(cycle.step(), expected, "after {ticks_elapsed} ticks");
        }
    }

    #[test]
    fn test_cycle_drives_wires_by_step_bits() {
        let mut world = World::default();
        let source = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
        let source_out = world.add_output(source, PortKind::Power).unwrap();

        let cycle_tile = world.create_tile(Cell::new(1, 0), Layer::Static).unwrap();
        let input = world.add_input(cycle_tile, PortKind::Power).unwrap();
        let output = world.add_output(cycle_tile, PortKind::Power).unwrap();
        world
            .attach(
                cycle_tile,
                Box::new(Cycle::new(CycleConfig {
                    steps: 2,
                    ..Default::default()
                })),
            )
            .unwrap();

        // One decal tile per step; wire i carries the step-i bit.
        let mut decal_wires = Vec::new();
        for step in 0..2usize {
            let decal = world
                .create_tile(Cell::new(2 + step as i32, 0), Layer::Floor)
                .unwrap();
            let decal_in = world.add_input(decal, PortKind::Power).unwrap();
            let wire = world
                .connect(output, decal_in, WireOptions::expected_at(step))
                .unwrap();
            decal_wires.push(wire);
        }
        world.connect(source_out, input, WireOptions::NONE).unwrap();
        world.start().unwrap();

        world.set_powered(source_out, true).unwrap();
        assert!(world.wire(decal_wires[0]).unwrap().is_enabled());
        assert!(!world.wire(decal_wires[1]).unwrap().is_enabled());

        world.step().unwrap();
        assert!(!world.wire(decal_wires[0]).unwrap().is_enabled());
        assert!(world.wire(decal_wires[1]).unwrap().is_enabled());
    }

    #[test]
    fn test_cycle_clamps_without_looping() {
        let (mut world, source, _output) = rig(Box::new(Cycle::new(CycleConfig {
            steps: 3,
            looping: false,
            ..Default::default()
        })));
        let cycle_tile = world.tiles_with::<Cycle>()[0];

        world.set_powered(source, true).unwrap();
        for _ in 0..10 {
            world.step().unwrap();
        }
        assert_eq!(world.component::<Cycle>(cycle_tile).unwrap().step(), 2);
    }

    #[test]
    fn test_cycle_deactivation_resets_index() {
        let (mut world, source, _output) = rig(Box::new(Cycle::new(CycleConfig {
            steps: 4,
            ..Default::default()
        })));
        let cycle_tile = world.tiles_with::<Cycle>()[0];

        world.set_powered(source, true).unwrap();
        world.step().unwrap();
        world.step().unwrap();
        assert_eq!(world.component::<Cycle>(cycle_tile).unwrap().step(), 2);

        world.set_powered(source, false).unwrap();
        assert_eq!(world.component::<Cycle>(cycle_tile).unwrap().step(), 0);
    }
}
