//! Sequence detection over ordered wire activations

use crate::{patch_config, wire_hits_input};
use anyhow::Result;
use gridwire::{Component, Event, EventKind, EventType, PortId, Subscription, TileId, World};
use serde::{Deserialize, Serialize};
use std::any::Any;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Input Power port watched for activations.
    pub input: usize,
    /// Output Power port raised on completion.
    pub output: usize,
    /// Number of steps that must arrive in order.
    pub steps: u32,
    /// Drop a completed output and rewind when every input wire goes dead.
    pub reset_on_deactivate: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            input: 0,
            output: 0,
            steps: 1,
            reset_on_deactivate: false,
        }
    }
}

/// Detects a configured order of wire activations.
///
/// Each incoming wire carries an option bit-set; an activation on a wire
/// whose bit matches the current index advances the sequence, any other
/// activation rewinds it to zero. Reaching the configured step count powers
/// the output and freezes the detector until reset.
pub struct SequenceDetector {
    config: SequenceConfig,
    index: u32,
    complete: bool,
}

impl SequenceDetector {
    pub fn new(config: SequenceConfig) -> Self {
        Self {
            config,
            index: 0,
            complete: false,
        }
    }

    /// Current position in the sequence.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn output(&self, tile: TileId) -> PortId {
        PortId::output(tile, self.config.output)
    }
}

impl Component for SequenceDetector {
    fn name(&self) -> &str {
        "sequence"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::normal(EventType::Start),
            Subscription::normal(EventType::WireActivated),
            Subscription::normal(EventType::WireDeactivated),
        ]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, event: &mut Event) -> Result<()> {
        match *event.kind() {
            EventKind::Start => {
                self.index = 0;
                self.complete = false;
                world.set_powered(self.output(tile), false)?;
            }
            EventKind::WireActivated { wire } => {
                if !wire_hits_input(world, wire, tile, self.config.input) || self.complete {
                    return Ok(());
                }
                let expected = world
                    .wire(wire)?
                    .options()
                    .is_expected_at_step(self.index as usize);
                if expected {
                    self.index += 1;
                    tracing::trace!(%tile, index = self.index, "sequence advanced");
                    if self.index >= self.config.steps {
                        self.complete = true;
                        tracing::debug!(%tile, "sequence complete");
                        world.set_powered(self.output(tile), true)?;
                    }
                } else {
                    tracing::trace!(%tile, "sequence violated, rewinding");
                    self.index = 0;
                }
            }
            EventKind::WireDeactivated { wire } => {
                if !self.config.reset_on_deactivate
                    || !wire_hits_input(world, wire, tile, self.config.input)
                {
                    return Ok(());
                }
                // The governing input de-asserts once every wire is dead.
                if !world.input_has_power(PortId::input(tile, self.config.input))? {
                    self.index = 0;
                    if self.complete {
                        self.complete = false;
                        world.set_powered(self.output(tile), false)?;
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
