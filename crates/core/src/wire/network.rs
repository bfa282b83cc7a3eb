//! Wire propagation: powering, signalling and value broadcast
//!
//! All operations here are synchronous: changing an output's state raises
//! events against every connected wire's destination immediately, and those
//! handlers may change their own outputs in turn, re-entrantly, until the
//! graph quiesces. The cascade-depth bound in
//! [`SimConfig`](crate::SimConfig) is the backstop for cyclic wiring.

use crate::error::{CoreError, Result};
use crate::sim::{Event, EventKind, TileId, World};
use crate::wire::{Port, PortDir, PortFlags, PortId, PortKind, Wire, WireId, WireOptions};

impl World {
    // ---- port creation ---------------------------------------------------

    /// Add an input port of `kind` with default flags.
    pub fn add_input(&mut self, tile: TileId, kind: PortKind) -> Result<PortId> {
        self.add_input_with(tile, kind, PortFlags::default())
    }

    pub fn add_input_with(&mut self, tile: TileId, kind: PortKind, flags: PortFlags) -> Result<PortId> {
        let entry = self.tile_mut(tile)?;
        let index = entry.inputs.len();
        entry.inputs.push(Port::new(kind, flags));
        Ok(PortId::input(tile, index))
    }

    /// Add an output port of `kind` with default flags.
    pub fn add_output(&mut self, tile: TileId, kind: PortKind) -> Result<PortId> {
        self.add_output_with(tile, kind, PortFlags::default())
    }

    pub fn add_output_with(&mut self, tile: TileId, kind: PortKind, flags: PortFlags) -> Result<PortId> {
        let entry = self.tile_mut(tile)?;
        let index = entry.outputs.len();
        entry.outputs.push(Port::new(kind, flags));
        Ok(PortId::output(tile, index))
    }

    pub fn port(&self, id: PortId) -> Result<&Port> {
        let tile = self
            .tiles
            .get(&id.tile)
            .ok_or(CoreError::UnknownTile(id.tile))?;
        let list = match id.dir {
            PortDir::Input => &tile.inputs,
            PortDir::Output => &tile.outputs,
        };
        list.get(id.index).ok_or(CoreError::UnknownPort(id))
    }

    fn port_mut(&mut self, id: PortId) -> Result<&mut Port> {
        let tile = self
            .tiles
            .get_mut(&id.tile)
            .ok_or(CoreError::UnknownTile(id.tile))?;
        let list = match id.dir {
            PortDir::Input => &mut tile.inputs,
            PortDir::Output => &mut tile.outputs,
        };
        list.get_mut(id.index).ok_or(CoreError::UnknownPort(id))
    }

    /// The wires connected to a port, in connection order.
    pub fn port_wires(&self, id: PortId) -> Result<Vec<WireId>> {
        Ok(self.port(id)?.wires.clone())
    }

    // ---- wiring ----------------------------------------------------------

    /// Connect an output port to an input port.
    ///
    /// Both ports must carry the same kind; wiring a tile to itself needs
    /// `allow_self_wire` on both ports. The new wire immediately mirrors
    /// the source port's current power/value state but raises no events;
    /// after structural edits the host re-dispatches `Start` so consumers
    /// re-derive.
    pub fn connect(&mut self, from: PortId, to: PortId, options: WireOptions) -> Result<WireId> {
        if from.dir != PortDir::Output {
            return Err(CoreError::NotAnOutput(from));
        }
        if to.dir != PortDir::Input {
            return Err(CoreError::NotAnInput(to));
        }
        let from_port = self.port(from)?;
        let (from_kind, from_flags) = (from_port.kind(), from_port.flags());
        let (powered, value) = (from_port.powered, from_port.value);
        let to_port = self.port(to)?;
        let (to_kind, to_flags) = (to_port.kind(), to_port.flags());

        if from_kind != to_kind {
            return Err(CoreError::KindMismatch {
                from,
                from_kind,
                to,
                to_kind,
            });
        }
        if from.tile == to.tile && !(from_flags.allow_self_wire && to_flags.allow_self_wire) {
            return Err(CoreError::SelfWireForbidden(from, to));
        }

        let id = WireId(self.next_wire);
        self.next_wire += 1;
        let mut wire = Wire::new(id, from, to, options);
        if from_kind == PortKind::Power {
            wire.enabled = powered;
        }
        wire.value = value;
        self.wires.insert(id.raw(), wire);
        self.port_mut(from)?.wires.push(id);
        self.port_mut(to)?.wires.push(id);
        tracing::debug!(wire = %id, %from, %to, "connected wire");
        Ok(id)
    }

    /// Remove a wire from both of its ports atomically and return it.
    pub fn disconnect(&mut self, id: WireId) -> Result<Wire> {
        let wire = self
            .wires
            .remove(&id.raw())
            .ok_or(CoreError::UnknownWire(id))?;
        self.port_mut(wire.from)?.wires.retain(|other| *other != id);
        self.port_mut(wire.to)?.wires.retain(|other| *other != id);
        tracing::debug!(wire = %id, from = %wire.from, to = %wire.to, "disconnected wire");
        Ok(wire)
    }

    pub fn wire(&self, id: WireId) -> Result<&Wire> {
        self.wires.get(&id.raw()).ok_or(CoreError::UnknownWire(id))
    }

    pub fn set_wire_options(&mut self, id: WireId, options: WireOptions) -> Result<()> {
        self.wires
            .get_mut(&id.raw())
            .ok_or(CoreError::UnknownWire(id))?
            .options = options;
        Ok(())
    }

    // ---- power -----------------------------------------------------------

    /// Derived power state of an input port.
    ///
    /// An input with zero connected wires reads powered (default-energized,
    /// so unwired consumers work stand-alone); otherwise any live wire
    /// energizes it. Components wanting a different combination (AND, XAND)
    /// fold over [`port_wires`](Self::port_wires) themselves.
    pub fn input_has_power(&self, id: PortId) -> Result<bool> {
        if id.dir != PortDir::Input {
            return Err(CoreError::NotAnInput(id));
        }
        let port = self.port(id)?;
        self.expect_kind("input_has_power", id, port, PortKind::Power)?;
        if port.wires.is_empty() {
            return Ok(true);
        }
        Ok(port
            .wires
            .iter()
            .any(|wire| self.wires.get(&wire.raw()).is_some_and(|w| w.enabled)))
    }

    /// Current state of an output Power port.
    pub fn output_powered(&self, id: PortId) -> Result<bool> {
        if id.dir != PortDir::Output {
            return Err(CoreError::NotAnOutput(id));
        }
        let port = self.port(id)?;
        self.expect_kind("output_powered", id, port, PortKind::Power)?;
        Ok(port.powered)
    }

    /// Set an output Power port's state.
    ///
    /// A no-op when the state is unchanged: calling `set_powered(true)`
    /// twice raises exactly one cascade. On change, every connected wire is
    /// driven through [`set_wire_enabled`](Self::set_wire_enabled) in
    /// connection order.
    pub fn set_powered(&mut self, id: PortId, powered: bool) -> Result<()> {
        if id.dir != PortDir::Output {
            return Err(CoreError::NotAnOutput(id));
        }
        let port = self.port(id)?;
        self.expect_kind("set_powered", id, port, PortKind::Power)?;
        if port.powered == powered {
            return Ok(());
        }
        let wires = port.wires.clone();
        self.port_mut(id)?.powered = powered;
        tracing::trace!(port = %id, powered, wires = wires.len(), "output power changed");
        for wire in wires {
            self.set_wire_enabled(wire, powered)?;
        }
        Ok(())
    }

    /// Drive a single Power wire, raising edge and change events at its
    /// destination.
    ///
    /// The per-wire primitive behind [`set_powered`](Self::set_powered),
    /// also used directly by step-aware components that light individual
    /// wires (cycling decals). Idempotent per wire.
    pub fn set_wire_enabled(&mut self, id: WireId, enabled: bool) -> Result<()> {
        let wire = self.wires.get(&id.raw()).ok_or(CoreError::UnknownWire(id))?;
        let (from, to) = (wire.from, wire.to);
        let kind = self.port(from)?.kind();
        if kind != PortKind::Power {
            return Err(CoreError::WrongPortKind {
                op: "set_wire_enabled",
                port: from,
                expected: PortKind::Power,
                actual: kind,
            });
        }
        let wire = self
            .wires
            .get_mut(&id.raw())
            .expect("wire presence checked above");
        if wire.enabled == enabled {
            return Ok(());
        }
        wire.enabled = enabled;

        let edge = if enabled {
            EventKind::WireActivated { wire: id }
        } else {
            EventKind::WireDeactivated { wire: id }
        };
        self.send(to.tile, Event::new(edge))?;
        self.send(
            to.tile,
            Event::new(EventKind::PowerChanged {
                wire: id,
                powered: enabled,
            }),
        )?;
        Ok(())
    }

    // ---- signals ---------------------------------------------------------

    /// Fire a momentary pulse to every wire of an output Signal port.
    ///
    /// Carries no persistent state; repeated calls simply re-fire.
    pub fn send_signal(&mut self, id: PortId) -> Result<()> {
        if id.dir != PortDir::Output {
            return Err(CoreError::NotAnOutput(id));
        }
        let port = self.port(id)?;
        self.expect_kind("send_signal", id, port, PortKind::Signal)?;
        let wires = port.wires.clone();
        tracing::trace!(port = %id, wires = wires.len(), "signal pulse");
        for wire in wires {
            let to = self.wire(wire)?.to;
            self.send(to.tile, Event::new(EventKind::WireActivated { wire }))?;
        }
        Ok(())
    }

    // ---- values ----------------------------------------------------------

    /// Broadcast an integer from an output Number port.
    ///
    /// Re-broadcasts only when the value changed, unless `force_resend` is
    /// set, which downstream listeners need to resynchronize (after a
    /// reset) even though the value is unchanged.
    pub fn send_value(&mut self, id: PortId, value: i32, force_resend: bool) -> Result<()> {
        if id.dir != PortDir::Output {
            return Err(CoreError::NotAnOutput(id));
        }
        let port = self.port(id)?;
        self.expect_kind("send_value", id, port, PortKind::Number)?;
        if !force_resend && port.value_sent && port.value == value {
            return Ok(());
        }
        let wires = port.wires.clone();
        {
            let port = self.port_mut(id)?;
            port.value = value;
            port.value_sent = true;
        }
        tracing::trace!(port = %id, value, wires = wires.len(), "value broadcast");
        for wire in wires {
            let to = {
                let entry = self
                    .wires
                    .get_mut(&wire.raw())
                    .ok_or(CoreError::UnknownWire(wire))?;
                entry.value = value;
                entry.to
            };
            self.send(to.tile, Event::new(EventKind::ValueChanged { wire, value }))?;
        }
        Ok(())
    }

    /// Last value carried by a Number wire. Callers must check wire count
    /// before trusting this: an unconnected Number port has no meaningful
    /// default.
    pub fn wire_value(&self, id: WireId) -> Result<i32> {
        Ok(self.wire(id)?.value)
    }

    fn expect_kind(
        &self,
        op: &'static str,
        id: PortId,
        port: &Port,
        expected: PortKind,
    ) -> Result<()> {
        if port.kind() != expected {
            return Err(CoreError::WrongPortKind {
                op,
                port: id,
                expected,
                actual: port.kind(),
            });
        }
        Ok(())
    }
}
