//! The standard component catalog
//!
//! Maps blueprint kind names to factories for every mechanic in this crate.
//! Hosts with bespoke mechanics register them on top of
//! [`standard_catalog`] before instantiating blueprints.

use crate::door::{Door, DoorConfig, Floor};
use crate::logic::{AndGate, GateConfig, NotGate, OrGate, XandGate};
use crate::number::{Counter, CounterConfig};
use crate::power::{Powerable, PowerableConfig, Switch, SwitchConfig};
use crate::sequence::{SequenceConfig, SequenceDetector};
use crate::timing::{Cycle, CycleConfig, Delay, DelayConfig};
use gridwire::ComponentCatalog;
use serde::de::DeserializeOwned;

fn parse<T: DeserializeOwned>(
    properties: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(
        properties.clone(),
    ))?)
}

/// A catalog of every standard component kind.
pub fn standard_catalog() -> ComponentCatalog {
    let mut catalog = ComponentCatalog::new();
    catalog
        .register("switch", |props| {
            Ok(Box::new(Switch::new(parse::<SwitchConfig>(props)?)))
        })
        .register("powerable", |props| {
            Ok(Box::new(Powerable::new(parse::<PowerableConfig>(props)?)))
        })
        .register("and", |props| {
            Ok(Box::new(AndGate::new(parse::<GateConfig>(props)?)))
        })
        .register("or", |props| {
            Ok(Box::new(OrGate::new(parse::<GateConfig>(props)?)))
        })
        .register("not", |props| {
            Ok(Box::new(NotGate::new(parse::<GateConfig>(props)?)))
        })
        .register("xand", |props| {
            Ok(Box::new(XandGate::new(parse::<GateConfig>(props)?)))
        })
        .register("delay", |props| {
            Ok(Box::new(Delay::new(parse::<DelayConfig>(props)?)))
        })
        .register("cycle", |props| {
            Ok(Box::new(Cycle::new(parse::<CycleConfig>(props)?)))
        })
        .register("sequence", |props| {
            Ok(Box::new(SequenceDetector::new(parse::<SequenceConfig>(props)?)))
        })
        .register("counter", |props| {
            Ok(Box::new(Counter::new(parse::<CounterConfig>(props)?)))
        })
        .register("door", |props| {
            Ok(Box::new(Door::new(parse::<DoorConfig>(props)?)))
        })
        .register("floor", |_props| Ok(Box::new(Floor::new())));
    catalog
}
