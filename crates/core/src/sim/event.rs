//! Events delivered to tile components
//!
//! An event is an immutable intent (`EventKind`) plus a small amount of
//! mutable dispatch state: a `handled` flag for side-effect commands, and a
//! sticky boolean result for query events. Wire notifications reference the
//! originating wire.

use crate::sim::{Cell, Direction, TileId};
use crate::wire::WireId;

/// Payload of an event: the tagged variant over all event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Lifecycle: dispatched to every tile after load or structural edits so
    /// components re-derive runtime-only state. Components must be able to
    /// reconstruct correct state from this alone, without relying on
    /// load-order side effects.
    Start,
    /// One discrete simulation step.
    Tick { tick: u64 },

    /// Command: an actor uses whatever occupies a cell.
    Use { user: Option<TileId> },
    /// Command: an actor pushes in `dir`.
    Push { pusher: Option<TileId>, dir: Direction },
    /// Command: an actor pulls in `dir`.
    Pull { puller: Option<TileId>, dir: Direction },

    /// Query: may `mover` enter `to`? Sticky-true result.
    CanMove {
        mover: Option<TileId>,
        from: Cell,
        to: Cell,
    },
    /// Query: can the occupant be pushed in `dir`? Sticky-true result.
    CanPush { pusher: Option<TileId>, dir: Direction },
    /// Query: is there anything usable here? Sticky-true result.
    CanUse { user: Option<TileId> },

    /// Wire notification: the wire went live (power rising edge, or a
    /// momentary signal pulse).
    WireActivated { wire: WireId },
    /// Wire notification: the wire went dead (power falling edge).
    WireDeactivated { wire: WireId },
    /// Wire notification: the wire's power state changed.
    PowerChanged { wire: WireId, powered: bool },
    /// Wire notification: a number broadcast arrived.
    ValueChanged { wire: WireId, value: i32 },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Start => EventType::Start,
            EventKind::Tick { .. } => EventType::Tick,
            EventKind::Use { .. } => EventType::Use,
            EventKind::Push { .. } => EventType::Push,
            EventKind::Pull { .. } => EventType::Pull,
            EventKind::CanMove { .. } => EventType::CanMove,
            EventKind::CanPush { .. } => EventType::CanPush,
            EventKind::CanUse { .. } => EventType::CanUse,
            EventKind::WireActivated { .. } => EventType::WireActivated,
            EventKind::WireDeactivated { .. } => EventType::WireDeactivated,
            EventKind::PowerChanged { .. } => EventType::PowerChanged,
            EventKind::ValueChanged { .. } => EventType::ValueChanged,
        }
    }

    /// The wire referenced by a wire notification, if any.
    pub fn wire(&self) -> Option<WireId> {
        match *self {
            EventKind::WireActivated { wire }
            | EventKind::WireDeactivated { wire }
            | EventKind::PowerChanged { wire, .. }
            | EventKind::ValueChanged { wire, .. } => Some(wire),
            _ => None,
        }
    }
}

/// Registration key: the fieldless mirror of [`EventKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Start,
    Tick,
    Use,
    Push,
    Pull,
    CanMove,
    CanPush,
    CanUse,
    WireActivated,
    WireDeactivated,
    PowerChanged,
    ValueChanged,
}

impl EventType {
    pub fn name(self) -> &'static str {
        match self {
            EventType::Start => "Start",
            EventType::Tick => "Tick",
            EventType::Use => "Use",
            EventType::Push => "Push",
            EventType::Pull => "Pull",
            EventType::CanMove => "CanMove",
            EventType::CanPush => "CanPush",
            EventType::CanUse => "CanUse",
            EventType::WireActivated => "WireActivated",
            EventType::WireDeactivated => "WireDeactivated",
            EventType::PowerChanged => "PowerChanged",
            EventType::ValueChanged => "ValueChanged",
        }
    }

    /// Whether this type carries a sticky query result.
    pub fn is_query(self) -> bool {
        matches!(self, EventType::CanMove | EventType::CanPush | EventType::CanUse)
    }
}

/// A dispatched event: payload plus mutable dispatch state.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    handled: bool,
    result: Option<bool>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            handled: false,
            result: None,
        }
    }

    pub fn start() -> Self {
        Self::new(EventKind::Start)
    }

    pub fn tick(tick: u64) -> Self {
        Self::new(EventKind::Tick { tick })
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Whether some handler has accepted this command.
    ///
    /// The dispatcher never stops early because of this flag (except for
    /// [`Routing::FirstHandled`](crate::Routing) cell routing); handlers
    /// check it cooperatively so only one of them performs the side effect.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn set_handled(&mut self) {
        self.handled = true;
    }

    /// Whether any handler answered a query.
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// The query answer, `None` while unanswered.
    pub fn result(&self) -> Option<bool> {
        self.result
    }

    /// True iff a handler answered the query positively.
    pub fn granted(&self) -> bool {
        self.result == Some(true)
    }

    /// Record a query answer with sticky-true semantics: once any handler
    /// answers `true`, later handlers cannot downgrade it.
    pub fn set_result(&mut self, value: bool) {
        self.result = Some(self.result.unwrap_or(false) | value);
    }
}
