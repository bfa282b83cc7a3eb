//! Blueprints: the load/authoring boundary
//!
//! The save/load and editor layers live outside the core; their contract is
//! simply to reconstruct tiles, ports and wires (including per-wire option
//! bit-sets) and then dispatch `Start` to every tile so components
//! re-derive runtime-only state. A [`Blueprint`] is the serde-friendly
//! description of that reconstruction, and [`ComponentCatalog`] maps
//! component kind names to factories the way a plugin registry would.

use crate::config::SimConfig;
use crate::error::{CoreError, Result};
use crate::sim::{Cell, Component, Layer, TileId, World};
use crate::wire::{PortFlags, PortId, PortKind, WireOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

type Factory = Box<dyn Fn(&serde_json::Map<String, serde_json::Value>) -> anyhow::Result<Box<dyn Component>>>;

/// Registry of constructible component kinds.
#[derive(Default)]
pub struct ComponentCatalog {
    factories: HashMap<String, Factory>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `kind`, replacing any previous registration.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&serde_json::Map<String, serde_json::Value>) -> anyhow::Result<Box<dyn Component>>
            + 'static,
    {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            tracing::warn!(%kind, "component kind already registered, replacing");
        }
        self.factories.insert(kind, Box::new(factory));
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names, unordered.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Construct a component of `kind` from its blueprint properties.
    pub fn build(
        &self,
        kind: &str,
        properties: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Box<dyn Component>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| CoreError::Blueprint(format!("unknown component kind '{kind}'")))?;
        factory(properties)
            .map_err(|reason| CoreError::Blueprint(format!("building '{kind}': {reason}")))
    }
}

impl std::fmt::Debug for ComponentCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentCatalog")
            .field("kinds", &self.factories.len())
            .finish()
    }
}

/// One port in a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    pub kind: PortKind,
    #[serde(default)]
    pub flags: PortFlags,
}

/// One component attachment in a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub kind: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

/// One tile in a blueprint. `name` is the authoring-time label wires refer
/// to; `id` pins the stable GUID and is generated fresh when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TileId>,
    pub cell: Cell,
    pub layer: Layer,
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

/// One wire in a blueprint, endpoints addressed by tile name + port index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSpec {
    pub from: String,
    #[serde(default)]
    pub from_port: usize,
    pub to: String,
    #[serde(default)]
    pub to_port: usize,
    #[serde(default)]
    pub options: WireOptions,
}

/// A complete puzzle description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default)]
    pub tiles: Vec<TileSpec>,
    #[serde(default)]
    pub wires: Vec<WireSpec>,
}

impl Blueprint {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a blueprint from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&raw),
            Some("json") => Self::from_json_str(&raw),
            other => Err(CoreError::Blueprint(format!(
                "unsupported blueprint extension {other:?} for {}",
                path.display()
            ))),
        }
    }

    /// Build a world from this description and run the `Start` pass.
    ///
    /// Components receive no information besides their blueprint properties
    /// and the `Start` dispatch, so reconstruction cannot depend on load
    /// order.
    pub fn instantiate(&self, catalog: &ComponentCatalog) -> Result<World> {
        let mut world = World::new(self.config.clone());
        let mut by_name: HashMap<&str, TileId> = HashMap::new();

        for spec in &self.tiles {
            if by_name.contains_key(spec.name.as_str()) {
                return Err(CoreError::Blueprint(format!(
                    "duplicate tile name '{}'",
                    spec.name
                )));
            }
            let id = spec.id.unwrap_or_else(TileId::random);
            world.create_tile_with_id(id, spec.cell, spec.layer)?;
            for port in &spec.inputs {
                world.add_input_with(id, port.kind, port.flags)?;
            }
            for port in &spec.outputs {
                world.add_output_with(id, port.kind, port.flags)?;
            }
            for component in &spec.components {
                let built = catalog.build(&component.kind, &component.properties)?;
                world.attach(id, built)?;
            }
            by_name.insert(spec.name.as_str(), id);
        }

        for spec in &self.wires {
            let from = *by_name.get(spec.from.as_str()).ok_or_else(|| {
                CoreError::Blueprint(format!("wire references unknown tile '{}'", spec.from))
            })?;
            let to = *by_name.get(spec.to.as_str()).ok_or_else(|| {
                CoreError::Blueprint(format!("wire references unknown tile '{}'", spec.to))
            })?;
            world.connect(
                PortId::output(from, spec.from_port),
                PortId::input(to, spec.to_port),
                spec.options,
            )?;
        }

        world.start()?;
        tracing::debug!(tiles = self.tiles.len(), wires = self.wires.len(), "blueprint instantiated");
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Event, EventType, Subscription};
    use anyhow::Result as AnyResult;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    struct LampConfig {
        input: usize,
    }

    /// Minimal consumer: mirrors its input power into a flag on Start and
    /// on PowerChanged.
    struct Lamp {
        config: LampConfig,
        lit: bool,
    }

    impl Lamp {
        fn new(config: LampConfig) -> Self {
            Self { config, lit: false }
        }
    }

    impl Component for Lamp {
        fn name(&self) -> &str {
            "lamp"
        }

        fn subscriptions(&self) -> Vec<Subscription> {
            vec![
                Subscription::normal(EventType::Start),
                Subscription::normal(EventType::PowerChanged),
            ]
        }

        fn handle(&mut self, world: &mut World, tile: TileId, _event: &mut Event) -> AnyResult<()> {
            self.lit = world.input_has_power(PortId::input(tile, self.config.input))?;
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn lamp_catalog() -> ComponentCatalog {
        let mut catalog = ComponentCatalog::new();
        catalog.register("lamp", |props| {
            let config: LampConfig =
                serde_json::from_value(serde_json::Value::Object(props.clone()))?;
            Ok(Box::new(Lamp::new(config)))
        });
        catalog
    }

    const PUZZLE: &str = r#"
        [[tiles]]
        name = "source"
        cell = { x = 0, y = 0 }
        layer = "Static"
        outputs = [{ kind = "Power" }]

        [[tiles]]
        name = "lamp"
        cell = { x = 1, y = 0 }
        layer = "Static"
        inputs = [{ kind = "Power" }]
        components = [{ kind = "lamp" }]

        [[wires]]
        from = "source"
        to = "lamp"
    "#;

    #[test]
    fn test_toml_round_trip() {
        let blueprint = Blueprint::from_toml_str(PUZZLE).unwrap();
        assert_eq!(blueprint.tiles.len(), 2);
        assert_eq!(blueprint.wires.len(), 1);

        let raw = blueprint.to_toml_string().unwrap();
        let again = Blueprint::from_toml_str(&raw).unwrap();
        assert_eq!(again.tiles.len(), 2);
        assert_eq!(again.tiles[1].components[0].kind, "lamp");
    }

    #[test]
    fn test_instantiate_runs_start() {
        let blueprint = Blueprint::from_toml_str(PUZZLE).unwrap();
        let world = blueprint.instantiate(&lamp_catalog()).unwrap();
        assert_eq!(world.tile_count(), 2);

        // The lamp derived its state during Start: one dead wire attached,
        // so it is unlit (a wired input is only live when a wire is).
        let lamp_tile = world.tiles_with::<Lamp>()[0];
        assert!(!world.component::<Lamp>(lamp_tile).unwrap().lit);
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let blueprint = Blueprint::from_toml_str(
            r#"
            [[tiles]]
            name = "mystery"
            cell = { x = 0, y = 0 }
            layer = "Floor"
            components = [{ kind = "does-not-exist" }]
            "#,
        )
        .unwrap();
        let err = blueprint.instantiate(&ComponentCatalog::new()).unwrap_err();
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn test_file_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("puzzle.toml");
        std::fs::write(&path, PUZZLE).unwrap();
        assert_eq!(Blueprint::load(&path).unwrap().tiles.len(), 2);

        let bogus = dir.path().join("puzzle.lvl");
        std::fs::write(&bogus, "x").unwrap();
        assert!(Blueprint::load(&bogus).is_err());
    }
}
