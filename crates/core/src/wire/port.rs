//! Ports: typed, directional wire attachment points owned by a tile

use crate::wire::{PortKind, WireId};
use serde::{Deserialize, Serialize};

/// Per-port behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortFlags {
    /// Permit wires whose source and destination tile are the same.
    pub allow_self_wire: bool,
}

/// One attachment point. Wire order is semantically significant: sequence
/// and cycle components interpret a port's wires by position.
#[derive(Debug)]
pub struct Port {
    kind: PortKind,
    flags: PortFlags,
    pub(crate) wires: Vec<WireId>,
    /// Output Power state. Meaningless on inputs (input power is derived
    /// from connected wires).
    pub(crate) powered: bool,
    /// Last broadcast Number value.
    pub(crate) value: i32,
    /// Whether a value has ever been broadcast; the first send always fires
    /// even when the value equals the initial zero.
    pub(crate) value_sent: bool,
}

impl Port {
    pub(crate) fn new(kind: PortKind, flags: PortFlags) -> Self {
        Self {
            kind,
            flags,
            wires: Vec::new(),
            powered: false,
            value: 0,
            value_sent: false,
        }
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn flags(&self) -> PortFlags {
        self.flags
    }

    /// Connected wires, in connection order.
    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    /// Current output Power state.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Last broadcast Number value.
    pub fn value(&self) -> i32 {
        self.value
    }
}
