//! Wires and their per-wire step options

use crate::wire::{PortId, WireId};
use serde::{Deserialize, Serialize};

/// Per-wire option bit-set: bit *i* marks the wire as expected/active during
/// sequence or cycle step *i*.
///
/// Step-aware components (sequence detectors, cyclers) consult these bits;
/// everything else ignores them. Always go through the named accessors, the
/// raw representation is an implementation detail of the save format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireOptions(u32);

impl WireOptions {
    pub const NONE: WireOptions = WireOptions(0);

    /// Maximum addressable step.
    pub const MAX_STEPS: usize = 32;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// A bit-set expecting the wire at exactly `step`.
    pub fn expected_at(step: usize) -> Self {
        let mut options = Self::NONE;
        options.set_expected_at_step(step, true);
        options
    }

    pub fn is_expected_at_step(self, step: usize) -> bool {
        step < Self::MAX_STEPS && self.0 & (1 << step) != 0
    }

    pub fn set_expected_at_step(&mut self, step: usize, expected: bool) {
        if step >= Self::MAX_STEPS {
            return;
        }
        if expected {
            self.0 |= 1 << step;
        } else {
            self.0 &= !(1 << step);
        }
    }

    pub fn with_expected_at_step(mut self, step: usize) -> Self {
        self.set_expected_at_step(step, true);
        self
    }

    /// The highest step with a set bit, if any.
    pub fn highest_step(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(31 - self.0.leading_zeros() as usize)
        }
    }
}

/// A directed edge from one tile's output port to another tile's input port.
///
/// A wire is listed by exactly one output port and exactly one input port at
/// all times; [`World::connect`](crate::World::connect) and
/// [`World::disconnect`](crate::World::disconnect) maintain both sides
/// together so no dangling endpoint can exist.
#[derive(Debug)]
pub struct Wire {
    pub(crate) id: WireId,
    pub(crate) from: PortId,
    pub(crate) to: PortId,
    /// Live Power/Signal state carried by this wire.
    pub(crate) enabled: bool,
    /// Last Number value carried by this wire.
    pub(crate) value: i32,
    pub(crate) options: WireOptions,
}

impl Wire {
    pub(crate) fn new(id: WireId, from: PortId, to: PortId, options: WireOptions) -> Self {
        Self {
            id,
            from,
            to,
            enabled: false,
            value: 0,
            options,
        }
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    /// Source (tile, output port).
    pub fn from(&self) -> PortId {
        self.from
    }

    /// Destination (tile, input port).
    pub fn to(&self) -> PortId {
        self.to
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn options(&self) -> WireOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_bits() {
        let mut options = WireOptions::NONE;
        assert!(!options.is_expected_at_step(0));

        options.set_expected_at_step(0, true);
        options.set_expected_at_step(5, true);
        assert!(options.is_expected_at_step(0));
        assert!(options.is_expected_at_step(5));
        assert!(!options.is_expected_at_step(4));
        assert_eq!(options.highest_step(), Some(5));

        options.set_expected_at_step(5, false);
        assert!(!options.is_expected_at_step(5));
        assert_eq!(options.highest_step(), Some(0));
    }

    #[test]
    fn test_out_of_range_steps_are_ignored() {
        let mut options = WireOptions::NONE;
        options.set_expected_at_step(32, true);
        assert_eq!(options, WireOptions::NONE);
        assert!(!options.is_expected_at_step(40));
    }

    #[test]
    fn test_builders() {
        let options = WireOptions::expected_at(2).with_expected_at_step(3);
        assert!(options.is_expected_at_step(2));
        assert!(options.is_expected_at_step(3));
        assert_eq!(options.bits(), 0b1100);
    }
}
