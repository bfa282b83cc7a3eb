//! Dispatch-ordering, query and registration-lifecycle tests

use anyhow::Result;
use gridwire::{
    Cell, Component, Event, EventKind, EventType, Layer, Priority, Routing, Subscription, TileId,
    World,
};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

/// Appends its label to a shared log whenever it handles `event`.
struct Recorder {
    label: &'static str,
    event: EventType,
    priority: Priority,
    log: Log,
    /// What to do with the event after logging.
    action: RecorderAction,
}

#[derive(Clone, Copy)]
enum RecorderAction {
    Observe,
    SetHandled,
    SetResult(bool),
    Fail,
}

impl Recorder {
    fn new(label: &'static str, event: EventType, priority: Priority, log: &Log) -> Box<Self> {
        Self::acting(label, event, priority, log, RecorderAction::Observe)
    }

    fn acting(
        label: &'static str,
        event: EventType,
        priority: Priority,
        log: &Log,
        action: RecorderAction,
    ) -> Box<Self> {
        Box::new(Self {
            label,
            event,
            priority,
            log: Rc::clone(log),
            action,
        })
    }
}

impl Component for Recorder {
    fn name(&self) -> &str {
        self.label
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::new(self.event, self.priority)]
    }

    fn handle(&mut self, _world: &mut World, _tile: TileId, event: &mut Event) -> Result<()> {
        self.log.borrow_mut().push(self.label.to_string());
        match self.action {
            RecorderAction::Observe => {}
            RecorderAction::SetHandled => event.set_handled(),
            RecorderAction::SetResult(value) => event.set_result(value),
            RecorderAction::Fail => anyhow::bail!("recorder told to fail"),
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

fn use_event() -> Event {
    Event::new(EventKind::Use { user: None })
}

fn query_event() -> Event {
    Event::new(EventKind::CanUse { user: None })
}

#[test]
fn handlers_run_in_ascending_priority_order() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    world.attach(tile, Recorder::new("late", EventType::Use, 10, &log)).unwrap();
    world.attach(tile, Recorder::new("early", EventType::Use, -5, &log)).unwrap();
    world.attach(tile, Recorder::new("normal", EventType::Use, 0, &log)).unwrap();

    world.send(tile, use_event()).unwrap();
    assert_eq!(*log.borrow(), ["early", "normal", "late"]);
}

#[test]
fn equal_priorities_preserve_registration_order() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    world.attach(tile, Recorder::new("first", EventType::Use, 0, &log)).unwrap();
    world.attach(tile, Recorder::new("second", EventType::Use, 0, &log)).unwrap();
    world.attach(tile, Recorder::new("third", EventType::Use, 0, &log)).unwrap();

    world.send(tile, use_event()).unwrap();
    assert_eq!(*log.borrow(), ["first", "second", "third"]);
}

#[test]
fn sticky_query_result_cannot_be_downgraded() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    world
        .attach(
            tile,
            Recorder::acting("grants", EventType::CanUse, 0, &log, RecorderAction::SetResult(true)),
        )
        .unwrap();
    world
        .attach(
            tile,
            Recorder::acting("denies", EventType::CanUse, 1, &log, RecorderAction::SetResult(false)),
        )
        .unwrap();

    let event = world.send(tile, query_event()).unwrap();
    // Both handlers ran; the later false could not downgrade the result.
    assert_eq!(*log.borrow(), ["grants", "denies"]);
    assert_eq!(event.result(), Some(true));
}

#[test]
fn unanswered_query_has_no_result() {
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
    let event = world.send(tile, query_event()).unwrap();
    assert!(!event.has_result());
}

#[test]
fn handled_flag_does_not_stop_same_tile_dispatch() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    world
        .attach(
            tile,
            Recorder::acting("accepts", EventType::Use, 0, &log, RecorderAction::SetHandled),
        )
        .unwrap();
    world.attach(tile, Recorder::new("still-runs", EventType::Use, 1, &log)).unwrap();

    let event = world.send(tile, use_event()).unwrap();
    assert!(event.is_handled());
    assert_eq!(*log.borrow(), ["accepts", "still-runs"]);
}

#[test]
fn cell_routing_walks_layers_floor_to_wall() {
    let log: Log = Log::default();
    let mut world = World::default();
    let cell = Cell::new(3, 3);

    // Created deliberately out of layer order.
    for (layer, label) in [
        (Layer::Wall, "wall"),
        (Layer::Floor, "floor"),
        (Layer::Dynamic, "dynamic"),
        (Layer::Static, "static"),
    ] {
        let tile = world.create_tile(cell, layer).unwrap();
        world.attach(tile, Recorder::new(label, EventType::Use, 0, &log)).unwrap();
    }

    world.send_to_cell(use_event(), cell, Routing::All).unwrap();
    assert_eq!(*log.borrow(), ["floor", "static", "dynamic", "wall"]);
}

#[test]
fn first_handled_routing_short_circuits_later_layers() {
    let log: Log = Log::default();
    let mut world = World::default();
    let cell = Cell::new(3, 3);

    let floor = world.create_tile(cell, Layer::Floor).unwrap();
    world
        .attach(
            floor,
            Recorder::acting("floor", EventType::Use, 0, &log, RecorderAction::SetHandled),
        )
        .unwrap();
    let wall = world.create_tile(cell, Layer::Wall).unwrap();
    world.attach(wall, Recorder::new("wall", EventType::Use, 0, &log)).unwrap();

    world.send_to_cell(use_event(), cell, Routing::FirstHandled).unwrap();
    assert_eq!(*log.borrow(), ["floor"]);

    log.borrow_mut().clear();
    world.send_to_cell(use_event(), cell, Routing::All).unwrap();
    assert_eq!(*log.borrow(), ["floor", "wall"]);
}

#[test]
fn moving_a_tile_updates_cell_routing() {
    let log: Log = Log::default();
    let mut world = World::default();
    let from = Cell::new(0, 0);
    let to = Cell::new(4, 0);

    let tile = world.create_tile(from, Layer::Dynamic).unwrap();
    world.attach(tile, Recorder::new("crate", EventType::Use, 0, &log)).unwrap();

    world.move_tile(tile, to).unwrap();
    assert!(world.tile_at(from, Layer::Dynamic).is_none());
    assert_eq!(world.tile_at(to, Layer::Dynamic).unwrap().id(), tile);

    world.send_to_cell(use_event(), from, Routing::All).unwrap();
    assert!(log.borrow().is_empty());
    world.send_to_cell(use_event(), to, Routing::All).unwrap();
    assert_eq!(*log.borrow(), ["crate"]);

    // The vacated spot is free again; the target spot is not.
    world.create_tile(from, Layer::Dynamic).unwrap();
    let blocker = world.create_tile(Cell::new(5, 0), Layer::Dynamic).unwrap();
    assert!(world.move_tile(blocker, to).is_err());
}

#[test]
fn one_occupant_per_cell_and_layer() {
    let mut world = World::default();
    let cell = Cell::new(1, 1);
    world.create_tile(cell, Layer::Static).unwrap();
    assert!(world.create_tile(cell, Layer::Static).is_err());
    world.create_tile(cell, Layer::Floor).unwrap();
}

#[test]
fn disable_unsubscribes_and_reenable_restores_exactly() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    let slot = world.attach(tile, Recorder::new("a", EventType::Use, 0, &log)).unwrap();
    world.attach(tile, Recorder::new("b", EventType::Use, 0, &log)).unwrap();

    world.set_enabled(tile, slot, false).unwrap();
    world.send(tile, use_event()).unwrap();
    assert_eq!(*log.borrow(), ["b"]);

    // Several enable/disable round trips must leave exactly one
    // registration, still ahead of "b" by registration order.
    for _ in 0..3 {
        world.set_enabled(tile, slot, true).unwrap();
        world.set_enabled(tile, slot, false).unwrap();
    }
    world.set_enabled(tile, slot, true).unwrap();

    log.borrow_mut().clear();
    world.send(tile, use_event()).unwrap();
    assert_eq!(*log.borrow(), ["a", "b"]);
}

#[test]
fn detach_tombstones_and_keeps_indices_stable() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();

    let first = world.attach(tile, Recorder::new("a", EventType::Use, 0, &log)).unwrap();
    let second = world.attach(tile, Recorder::new("b", EventType::Use, 0, &log)).unwrap();

    let detached = world.detach(tile, first).unwrap();
    assert!(detached.is_some());
    assert!(world.detach(tile, first).is_err()); // tombstoned

    world.send(tile, use_event()).unwrap();
    assert_eq!(*log.borrow(), ["b"]);

    // "b" keeps its slot index after "a" is gone.
    world.set_enabled(tile, second, false).unwrap();
    log.borrow_mut().clear();
    world.send(tile, use_event()).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn handler_failure_surfaces_as_error() {
    let log: Log = Log::default();
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
    world
        .attach(
            tile,
            Recorder::acting("bomb", EventType::Use, 0, &log, RecorderAction::Fail),
        )
        .unwrap();

    let err = world.send(tile, use_event()).unwrap_err();
    assert!(err.to_string().contains("bomb"));
}

/// A component that re-sends an event to its own tile from inside its
/// handler: the nested dispatch must skip the in-flight component instead
/// of recursing forever.
struct SelfSender {
    calls: u32,
}

impl Component for SelfSender {
    fn name(&self) -> &str {
        "self-sender"
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::normal(EventType::Use)]
    }

    fn handle(&mut self, world: &mut World, tile: TileId, _event: &mut Event) -> Result<()> {
        self.calls += 1;
        world.send(tile, Event::new(EventKind::Use { user: None }))?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn reentrant_dispatch_into_same_component_is_skipped() {
    let mut world = World::default();
    let tile = world.create_tile(Cell::new(0, 0), Layer::Static).unwrap();
    world.attach(tile, Box::new(SelfSender { calls: 0 })).unwrap();

    world.send(tile, use_event()).unwrap();
    assert_eq!(world.component::<SelfSender>(tile).unwrap().calls, 1);
}
