//! Tiles: grid occupants owning components and ports

use crate::sim::component::{Component, Priority, Subscription};
use crate::sim::{Cell, EventType, Layer, TileId};
use crate::wire::Port;
use std::collections::HashMap;

/// Storage for one attached component.
///
/// `component` is `None` while the component is out for dispatch (so
/// re-entrant sends skip it) or after detach. Detached slots stay in place
/// as tombstones so the indices of later components never shift.
/// `subs` is the handler set captured when the component last became
/// enabled; the dispatch table is built from this snapshot, so a component
/// that is momentarily out for dispatch keeps its registrations.
pub(crate) struct ComponentSlot {
    pub(crate) component: Option<Box<dyn Component>>,
    pub(crate) enabled: bool,
    pub(crate) removed: bool,
    pub(crate) subs: Vec<Subscription>,
}

#[derive(Debug, Clone, Copy)]
struct DispatchEntry {
    priority: Priority,
    slot: usize,
}

/// A grid cell occupant: stable identity, position, components and ports.
///
/// Tiles are created and mutated exclusively through
/// [`World`](crate::World); the struct itself only exposes read access.
pub struct Tile {
    id: TileId,
    cell: Cell,
    layer: Layer,
    pub(crate) slots: Vec<ComponentSlot>,
    pub(crate) inputs: Vec<Port>,
    pub(crate) outputs: Vec<Port>,
    dispatch: HashMap<EventType, Vec<DispatchEntry>>,
}

impl Tile {
    pub(crate) fn new(id: TileId, cell: Cell, layer: Layer) -> Self {
        Self {
            id,
            cell,
            layer,
            slots: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            dispatch: HashMap::new(),
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub(crate) fn set_cell(&mut self, cell: Cell) {
        self.cell = cell;
    }

    /// Attached input ports, in creation order.
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Attached output ports, in creation order.
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Number of live (non-detached) components.
    pub fn component_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.removed).count()
    }

    /// Rebuild the per-event-type dispatch table from scratch.
    ///
    /// Called on every attach, detach, enable and disable. A full rebuild
    /// (rather than incremental patching) keeps the ordering invariant
    /// trivially correct: entries are collected in registration order and
    /// stable-sorted by priority, so equal priorities preserve registration
    /// order and repeated enable/disable cycles produce identical tables.
    pub(crate) fn rebuild_dispatch(&mut self) {
        self.dispatch.clear();
        for (slot, entry) in self.slots.iter().enumerate() {
            if entry.removed || !entry.enabled {
                continue;
            }
            for sub in &entry.subs {
                self.dispatch
                    .entry(sub.event)
                    .or_default()
                    .push(DispatchEntry {
                        priority: sub.priority,
                        slot,
                    });
            }
        }
        for entries in self.dispatch.values_mut() {
            entries.sort_by_key(|entry| entry.priority);
        }
    }

    /// Slot indices registered for `ty`, in dispatch order.
    pub(crate) fn handlers(&self, ty: EventType) -> Vec<usize> {
        self.dispatch
            .get(&ty)
            .map(|entries| entries.iter().map(|entry| entry.slot).collect())
            .unwrap_or_default()
    }

    /// First live component of concrete type `T`.
    pub fn component<T: Component>(&self) -> Option<&T> {
        self.slots.iter().find_map(|slot| {
            slot.component
                .as_deref()
                .and_then(|component| component.as_any().downcast_ref::<T>())
        })
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("id", &self.id)
            .field("cell", &self.cell)
            .field("layer", &self.layer)
            .field("components", &self.component_count())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}
