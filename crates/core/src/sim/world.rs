//! The puzzle world: tile store, event dispatch and the simulation surface

use crate::busy::BusyGate;
use crate::config::SimConfig;
use crate::error::{CoreError, Result};
use crate::sim::component::Component;
use crate::sim::registry::Registry;
use crate::sim::tile::{ComponentSlot, Tile};
use crate::sim::{Cell, Event, Layer, TileId};
use crate::tick::TickClock;
use crate::wire::{Wire, WireId};
use nohash_hasher::IntMap;
use std::collections::HashMap;

/// How [`World::send_to_cell`] routes across a cell's occupying layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Deliver to every occupant regardless of outcome.
    All,
    /// Deliver layer by layer, stopping after the first occupant whose
    /// dispatch marks the event handled.
    FirstHandled,
}

/// One loaded puzzle instance.
///
/// Owns every tile, wire and piece of shared state; all mutation, runtime
/// and edit-time alike, goes through this one API. Everything runs on a
/// single logical thread and dispatch is synchronous: a [`send`](Self::send)
/// issued from inside a handler executes depth-first to completion before
/// the outer dispatch continues.
pub struct World {
    config: SimConfig,
    pub(crate) tiles: HashMap<TileId, Tile>,
    /// Tile ids in creation order; fixes the iteration order of
    /// [`start`](Self::start) and [`step`](Self::step).
    order: Vec<TileId>,
    by_cell: HashMap<Cell, [Option<TileId>; 4]>,
    pub(crate) wires: IntMap<u64, Wire>,
    pub(crate) next_wire: u64,
    clock: TickClock,
    busy: BusyGate,
    registry: Registry,
    depth: usize,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            tiles: HashMap::new(),
            order: Vec::new(),
            by_cell: HashMap::new(),
            wires: IntMap::default(),
            next_wire: 1,
            clock: TickClock::new(),
            busy: BusyGate::new(),
            registry: Registry::new(),
            depth: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    /// The shared busy gate for this puzzle instance.
    pub fn busy(&self) -> &BusyGate {
        &self.busy
    }

    /// Puzzle-scoped shared state.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    // ---- tile lifecycle --------------------------------------------------

    /// Create an empty tile with a fresh identity.
    pub fn create_tile(&mut self, cell: Cell, layer: Layer) -> Result<TileId> {
        self.create_tile_with_id(TileId::random(), cell, layer)
    }

    /// Create an empty tile under a known identity (save/load
    /// reconstruction).
    pub fn create_tile_with_id(&mut self, id: TileId, cell: Cell, layer: Layer) -> Result<TileId> {
        if self.tiles.contains_key(&id) {
            return Err(CoreError::DuplicateTile(id));
        }
        let layers = self.by_cell.entry(cell).or_default();
        if layers[layer.index()].is_some() {
            return Err(CoreError::CellOccupied(cell, layer));
        }
        layers[layer.index()] = Some(id);
        self.tiles.insert(id, Tile::new(id, cell, layer));
        self.order.push(id);
        tracing::debug!(tile = %id, ?cell, ?layer, "created tile");
        Ok(id)
    }

    /// Destroy a tile.
    ///
    /// Every wire referencing one of its ports is disconnected first, so no
    /// dangling endpoint survives; live components get their disable hook.
    pub fn remove_tile(&mut self, id: TileId) -> Result<()> {
        let tile = self.tiles.get(&id).ok_or(CoreError::UnknownTile(id))?;
        let mut attached: Vec<WireId> = tile
            .inputs
            .iter()
            .chain(tile.outputs.iter())
            .flat_map(|port| port.wires.iter().copied())
            .collect();
        attached.sort();
        attached.dedup(); // a self-wire shows up on two of this tile's ports
        for wire in attached {
            self.disconnect(wire)?;
        }

        let mut tile = self.tiles.remove(&id).expect("presence checked above");
        for slot in &mut tile.slots {
            if !slot.enabled {
                continue;
            }
            if let Some(component) = slot.component.as_mut() {
                if let Err(reason) = component.on_disable() {
                    tracing::warn!(tile = %id, component = component.name(), %reason,
                        "disable hook failed during tile removal");
                }
            }
        }
        self.order.retain(|other| *other != id);
        if let Some(layers) = self.by_cell.get_mut(&tile.cell()) {
            layers[tile.layer().index()] = None;
            if layers.iter().all(Option::is_none) {
                self.by_cell.remove(&tile.cell());
            }
        }
        tracing::debug!(tile = %id, "removed tile");
        Ok(())
    }

    /// Relocate a tile to another cell on its layer.
    pub fn move_tile(&mut self, id: TileId, to: Cell) -> Result<()> {
        let (from, layer) = {
            let tile = self.tiles.get(&id).ok_or(CoreError::UnknownTile(id))?;
            (tile.cell(), tile.layer())
        };
        if from == to {
            return Ok(());
        }
        let layers = self.by_cell.entry(to).or_default();
        if layers[layer.index()].is_some() {
            return Err(CoreError::CellOccupied(to, layer));
        }
        layers[layer.index()] = Some(id);
        if let Some(layers) = self.by_cell.get_mut(&from) {
            layers[layer.index()] = None;
            if layers.iter().all(Option::is_none) {
                self.by_cell.remove(&from);
            }
        }
        self.tiles
            .get_mut(&id)
            .expect("presence checked above")
            .set_cell(to);
        Ok(())
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub(crate) fn tile_mut(&mut self, id: TileId) -> Result<&mut Tile> {
        self.tiles.get_mut(&id).ok_or(CoreError::UnknownTile(id))
    }

    /// Tile ids in creation order.
    pub fn tile_ids(&self) -> &[TileId] {
        &self.order
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// The occupant of one (cell, layer) pair.
    pub fn tile_at(&self, cell: Cell, layer: Layer) -> Option<&Tile> {
        let id = (*self.by_cell.get(&cell)?)[layer.index()]?;
        self.tiles.get(&id)
    }

    /// All occupants of a cell, in layer delivery order (Floor first).
    pub fn tiles_at(&self, cell: Cell) -> impl Iterator<Item = &Tile> + '_ {
        let ids = self
            .by_cell
            .get(&cell)
            .map(|layers| layers.to_vec())
            .unwrap_or_default();
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.tiles.get(&id))
    }

    // ---- component lifecycle ---------------------------------------------

    /// Attach a component, enabled, and rebuild the tile's dispatch table.
    /// Returns the component's slot index, stable for the tile's lifetime.
    pub fn attach(&mut self, tile: TileId, mut component: Box<dyn Component>) -> Result<usize> {
        if !self.tiles.contains_key(&tile) {
            return Err(CoreError::UnknownTile(tile));
        }
        let name = component.name().to_string();
        component.on_enable().map_err(|reason| CoreError::Handler {
            name: name.clone(),
            event: "on_enable",
            reason,
        })?;
        let subs = component.subscriptions();
        let entry = self.tiles.get_mut(&tile).expect("presence checked above");
        let slot = entry.slots.len();
        entry.slots.push(ComponentSlot {
            component: Some(component),
            enabled: true,
            removed: false,
            subs,
        });
        entry.rebuild_dispatch();
        tracing::debug!(%tile, slot, component = %name, "attached component");
        Ok(slot)
    }

    /// Detach the component in `slot`.
    ///
    /// Returns `None` when the component removed itself from inside its own
    /// handler (its box is still on the dispatch stack and is dropped when
    /// that handler returns).
    pub fn detach(&mut self, tile: TileId, slot: usize) -> Result<Option<Box<dyn Component>>> {
        let entry = self
            .tiles
            .get_mut(&tile)
            .ok_or(CoreError::UnknownTile(tile))?;
        let slot_entry = entry
            .slots
            .get_mut(slot)
            .filter(|entry| !entry.removed)
            .ok_or(CoreError::UnknownComponent { tile, slot })?;
        slot_entry.removed = true;
        slot_entry.enabled = false;
        slot_entry.subs.clear();
        let component = slot_entry.component.take();
        entry.rebuild_dispatch();

        match component {
            Some(mut component) => {
                if let Err(reason) = component.on_disable() {
                    tracing::warn!(%tile, component = component.name(), %reason,
                        "disable hook failed during detach");
                }
                tracing::debug!(%tile, slot, component = component.name(), "detached component");
                Ok(Some(component))
            }
            None => {
                tracing::debug!(%tile, slot, "component detached itself mid-dispatch");
                Ok(None)
            }
        }
    }

    /// Enable or disable a component without detaching it.
    ///
    /// Disabling unsubscribes every handler; re-enabling re-reads the
    /// component's declared subscriptions and rebuilds the dispatch table,
    /// so repeated cycles leave no duplicate or stale registration.
    pub fn set_enabled(&mut self, tile: TileId, slot: usize, enabled: bool) -> Result<()> {
        let entry = self
            .tiles
            .get_mut(&tile)
            .ok_or(CoreError::UnknownTile(tile))?;
        let slot_entry = entry
            .slots
            .get_mut(slot)
            .filter(|entry| !entry.removed)
            .ok_or(CoreError::UnknownComponent { tile, slot })?;
        if slot_entry.enabled == enabled {
            return Ok(());
        }
        if enabled {
            if let Some(component) = slot_entry.component.as_mut() {
                let name = component.name().to_string();
                component.on_enable().map_err(|reason| CoreError::Handler {
                    name,
                    event: "on_enable",
                    reason,
                })?;
                slot_entry.subs = component.subscriptions();
            }
            slot_entry.enabled = true;
        } else {
            slot_entry.enabled = false;
            slot_entry.subs.clear();
            if let Some(component) = slot_entry.component.as_mut() {
                if let Err(reason) = component.on_disable() {
                    tracing::warn!(%tile, component = component.name(), %reason,
                        "disable hook failed");
                }
            }
        }
        entry.rebuild_dispatch();
        tracing::debug!(%tile, slot, enabled, "component enabled state changed");
        Ok(())
    }

    /// First component of concrete type `T` on a tile.
    pub fn component<T: Component>(&self, tile: TileId) -> Option<&T> {
        self.tiles.get(&tile)?.component::<T>()
    }

    /// Mutable access to the first component of concrete type `T`.
    pub fn component_mut<T: Component>(&mut self, tile: TileId) -> Option<&mut T> {
        self.tiles.get_mut(&tile)?.slots.iter_mut().find_map(|slot| {
            slot.component
                .as_deref_mut()
                .and_then(|component| component.as_any_mut().downcast_mut::<T>())
        })
    }

    /// Ids of every tile carrying a component of type `T`, creation order.
    pub fn tiles_with<T: Component>(&self) -> Vec<TileId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.component::<T>(*id).is_some())
            .collect()
    }

    // ---- dispatch --------------------------------------------------------

    /// Deliver `event` to every enabled component of `tile` registered for
    /// its type, in ascending priority order (ties in registration order),
    /// and return the possibly mutated event.
    ///
    /// Handlers may send further events re-entrantly. A component whose
    /// handler is already on the dispatch stack is skipped (and the skip
    /// logged), which breaks direct feedback loops; pathological cascades
    /// beyond [`SimConfig::max_cascade_depth`] abort with
    /// [`CoreError::CyclicCascade`].
    pub fn send(&mut self, tile: TileId, mut event: Event) -> Result<Event> {
        self.depth += 1;
        let outcome = self.dispatch(tile, &mut event);
        self.depth -= 1;
        outcome.map(|()| event)
    }

    fn dispatch(&mut self, tile: TileId, event: &mut Event) -> Result<()> {
        let ty = event.event_type();
        if self.depth > self.config.max_cascade_depth {
            let error = CoreError::CyclicCascade {
                tile,
                event: ty.name(),
                depth: self.depth,
            };
            tracing::error!(%tile, event = ty.name(), depth = self.depth,
                "aborting cascade, wiring is cyclic or deeper than the configured bound");
            return Err(error);
        }

        let slots = self
            .tiles
            .get(&tile)
            .ok_or(CoreError::UnknownTile(tile))?
            .handlers(ty);
        if self.config.trace_dispatch {
            tracing::trace!(%tile, event = ty.name(), handlers = slots.len(), depth = self.depth,
                "dispatch");
        }

        for slot in slots {
            let Some(entry) = self.tiles.get_mut(&tile) else {
                break; // tile removed by an earlier handler
            };
            let Some(slot_entry) = entry.slots.get_mut(slot) else {
                continue;
            };
            if slot_entry.removed || !slot_entry.enabled {
                continue;
            }
            let Some(mut component) = slot_entry.component.take() else {
                tracing::warn!(%tile, slot, event = ty.name(),
                    "re-entrant dispatch into a component already handling an event; skipped");
                continue;
            };

            let outcome = component.handle(self, tile, event);
            let failed = outcome.is_err().then(|| component.name().to_string());

            if let Some(entry) = self.tiles.get_mut(&tile) {
                if let Some(slot_entry) = entry.slots.get_mut(slot) {
                    if slot_entry.removed {
                        // detached itself mid-handle; let the box drop
                    } else {
                        slot_entry.component = Some(component);
                    }
                }
            }

            if let Err(reason) = outcome {
                let name = failed.unwrap_or_default();
                tracing::error!(%tile, component = %name, event = ty.name(), %reason,
                    "component handler failed");
                return Err(CoreError::Handler {
                    name,
                    event: ty.name(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Deliver `event` to every tile occupying `cell`, walking layers Floor,
    /// Static, Dynamic, Wall.
    pub fn send_to_cell(&mut self, mut event: Event, cell: Cell, routing: Routing) -> Result<Event> {
        let occupants: Vec<TileId> = self
            .by_cell
            .get(&cell)
            .map(|layers| layers.iter().copied().flatten().collect())
            .unwrap_or_default();

        for id in occupants {
            if !self.tiles.contains_key(&id) {
                continue; // removed by an earlier occupant's handler
            }
            event = self.send(id, event)?;
            if routing == Routing::FirstHandled && event.is_handled() {
                break;
            }
        }
        Ok(event)
    }

    // ---- simulation loop surface -----------------------------------------

    /// Dispatch [`Event::start`] to every tile in creation order.
    ///
    /// Called once after load or after structural edits; components must
    /// re-derive all runtime-only state from this alone.
    pub fn start(&mut self) -> Result<()> {
        tracing::debug!(tiles = self.order.len(), "start pass");
        for id in self.order.clone() {
            if self.tiles.contains_key(&id) {
                self.send(id, Event::start())?;
            }
        }
        Ok(())
    }

    /// Advance the tick clock and deliver the tick to every tile in
    /// creation order. Returns the new tick.
    pub fn step(&mut self) -> Result<u64> {
        let tick = self.clock.advance();
        for id in self.order.clone() {
            if self.tiles.contains_key(&id) {
                self.send(id, Event::tick(tick))?;
            }
        }
        Ok(tick)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tiles", &self.tiles.len())
            .field("wires", &self.wires.len())
            .field("tick", &self.clock.tick())
            .finish()
    }
}
