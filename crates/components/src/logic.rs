//! Combinational logic gates
//!
//! Gates recompute synchronously, with zero tick delay, every time any
//! input wire's power changes: the recompute happens inline within the same
//! propagation pass. Contrast with the ticked components in
//! [`timing`](crate::timing), which only react on the next clock step.

use crate::patch_config;
use anyhow::Result;
use gridwire::{Component, Event, EventType, PortId, Subscription, TileId, World};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Port assignment shared by all gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub input: usize,
    pub output: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            input: 0,
            output: 0,
        }
    }
}

macro_rules! gate_component {
    ($type:ident, $name:literal) => {
        impl $type {
            pub fn new(config: GateConfig) -> Self {
                Self { config }
            }
        }

        impl Component for $type {
            fn name(&self) -> &str {
                $name
            }

            fn subscriptions(&self) -> Vec<Subscription> {
                vec![
                    Subscription::normal(EventType::Start),
                    Subscription::normal(EventType::PowerChanged),
                ]
            }

            fn handle(
                &mut self,
                world: &mut World,
                tile: TileId,
                _event: &mut Event,
            ) -> Result<()> {
                let powered = self.evaluate(world, tile)?;
                world.set_powered(PortId::output(tile, self.config.output), powered)?;
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
    };
}

/// Powered while every input wire is live. Overrides the zero-wire port
/// default: a wireless AND reads "not powered".
pub struct AndGate {
    config: GateConfig,
}

impl AndGate {
    fn evaluate(&self, world: &World, tile: TileId) -> Result<bool> {
        let wires = world.port_wires(PortId::input(tile, self.config.input))?;
        Ok(!wires.is_empty()
            && wires
                .iter()
                .all(|id| world.wire(*id).map(|w| w.is_enabled()).unwrap_or(false)))
    }
}

gate_component!(AndGate, "and");

/// Powered while any input wire is live; not powered with zero wires.
pub struct OrGate {
    config: GateConfig,
}

impl OrGate {
    fn evaluate(&self, world: &World, tile: TileId) -> Result<bool> {
        let wires = world.port_wires(PortId::input(tile, self.config.input))?;
        Ok(wires
            .iter()
            .any(|id| world.wire(*id).map(|w| w.is_enabled()).unwrap_or(false)))
    }
}

gate_component!(OrGate, "or");

/// Inverts the derived input power. An unwired input reads powered, so a
/// wireless NOT sits dark.
pub struct NotGate {
    config: GateConfig,
}

impl NotGate {
    fn evaluate(&self, world: &World, tile: TileId) -> Result<bool> {
        Ok(!world.input_has_power(PortId::input(tile, self.config.input))?)
    }
}

gate_component!(NotGate, "not");

/// Powered while every input wire matches its expected bit: live wires
/// expected live, dead wires expected dead. The expectation is the wire's
/// step-0 option bit.
pub struct XandGate {
    config: GateConfig,
}

impl XandGate {
    fn evaluate(&self, world: &World, tile: TileId) -> Result<bool> {
        let wires = world.port_wires(PortId::input(tile, self.config.input))?;
        Ok(!wires.is_empty()
            && wires.iter().all(|id| {
                world
                    .wire(*id)
                    .map(|w| w.is_enabled() == w.options().is_expected_at_step(0))
                    .unwrap_or(false)
            }))
    }
}

gate_component!(XandGate, "xand");
