//! Scene graph: owns the root component trees of a loaded scene
//!
//! Roots live in a slot map and are addressed by [`ObjectHandle`]; a separate handle list
//! keeps insertion order so every update visits them in the order they were loaded.
//! Lights are not stored here: loading moves them into the rendering context's
//! [`LightCollections`].

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{Transform, Vec3};
use crate::render::{LightCollections, LightKind, RenderItem, ResourceLibrary, Skybox};

use super::components::CompositeComponent;
use super::description::{ObjectContent, SceneDescription, SceneSettings};
use super::factory::ObjectFactory;
use super::SceneError;

new_key_type! {
    /// Stable handle to a root component tree
    pub struct ObjectHandle;
}

/// Summary of one load
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Objects instantiated
    pub objects: usize,
    /// Lights created, per kind
    pub lights: Vec<LightKind>,
    /// Whether a skybox was placed
    pub skybox: bool,
    /// Elements that were skipped, with the reason
    pub errors: Vec<(usize, SceneError)>,
}

/// Result of [`SceneGraph::load`]: resolved settings plus what happened to each element
#[derive(Debug)]
pub struct LoadedScene {
    /// Camera and post-processing settings
    pub settings: SceneSettings,
    /// Load summary
    pub report: LoadReport,
}

/// Owner of every root component tree
#[derive(Debug)]
pub struct SceneGraph {
    objects: SlotMap<ObjectHandle, CompositeComponent>,
    order: Vec<ObjectHandle>,
    skybox: Option<Skybox>,
    factory: ObjectFactory,
}

impl SceneGraph {
    /// Create an empty scene graph around an object factory
    pub fn new(factory: ObjectFactory) -> Self {
        Self {
            objects: SlotMap::with_key(),
            order: Vec::new(),
            skybox: None,
            factory,
        }
    }

    /// The object factory
    pub fn factory(&self) -> &ObjectFactory {
        &self.factory
    }

    /// Mutable access to the object factory, e.g. to register descriptions
    pub fn factory_mut(&mut self) -> &mut ObjectFactory {
        &mut self.factory
    }

    /// Instantiate every `sceneobject` of a description
    ///
    /// Objects are added after any already present. A bad element is logged, recorded in
    /// the report and skipped; the rest of the scene still loads.
    pub fn load<R: ResourceLibrary + ?Sized>(
        &mut self,
        description: &SceneDescription,
        lights: &mut LightCollections,
        resources: &R,
    ) -> LoadedScene {
        let settings = description.resolve_settings();
        let mut report = LoadReport::default();

        for (index, node) in description.objects.iter().enumerate() {
            let placement = node.placement();
            let outcome = node.content().and_then(|content| match content {
                ObjectContent::Resource(name) => {
                    let mut object = self.factory.load_object(name, resources).ok_or_else(|| {
                        SceneError::ResourceMissing {
                            kind: "object",
                            name: name.to_string(),
                        }
                    })?;
                    object.set_transform(Transform::from_placement(
                        placement.position,
                        placement.rotation,
                        placement.scale,
                    ));
                    self.insert(object);
                    report.objects += 1;
                    Ok(())
                }
                ObjectContent::Light(node) => {
                    let light = node.resolve(&placement)?;
                    report.lights.push(lights.insert(light));
                    Ok(())
                }
                ObjectContent::Skybox(node) => {
                    let material = node.material.clone().filter(|material| {
                        let resolves = resources.has_texture(material);
                        if !resolves {
                            log::warn!("Skybox material '{}' not found, skybox will not be drawn", material);
                        }
                        resolves
                    });
                    if self.skybox.is_some() {
                        log::warn!("Scene places more than one skybox, keeping the last");
                    }
                    self.skybox = Some(Skybox { scale: placement.scale, material });
                    report.skybox = true;
                    Ok(())
                }
            });

            if let Err(error) = outcome {
                log::warn!("Skipping sceneobject #{}: {}", index, error);
                report.errors.push((index, error));
            }
        }

        log::info!(
            "Scene loaded: {} objects, {} lights, {} skipped elements",
            report.objects,
            report.lights.len(),
            report.errors.len()
        );
        LoadedScene { settings, report }
    }

    /// Add a root tree
    pub fn insert(&mut self, object: CompositeComponent) -> ObjectHandle {
        let handle = self.objects.insert(object);
        self.order.push(handle);
        handle
    }

    /// Root tree by handle
    pub fn get(&self, handle: ObjectHandle) -> Option<&CompositeComponent> {
        self.objects.get(handle)
    }

    /// Mutable root tree by handle
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut CompositeComponent> {
        self.objects.get_mut(handle)
    }

    /// Handles in insertion order
    pub fn handles(&self) -> &[ObjectHandle] {
        &self.order
    }

    /// Root trees in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CompositeComponent> + '_ {
        self.order.iter().filter_map(|handle| self.objects.get(*handle))
    }

    /// Number of root trees
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph holds no root tree
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Placed skybox
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// Update every root once, in insertion order
    pub fn update(&mut self, scaled_time: f32, elapsed_time: f32) {
        for handle in &self.order {
            if let Some(object) = self.objects.get_mut(*handle) {
                object.update(scaled_time, elapsed_time);
            }
        }
    }

    /// Drop every root tree and the skybox; safe to call repeatedly
    pub fn clear(&mut self) {
        if !self.order.is_empty() {
            log::debug!("Clearing {} scene objects", self.order.len());
        }
        self.order.clear();
        self.objects.clear();
        self.skybox = None;
    }

    /// Draw requests for the geometry pass, in insertion order
    pub fn render_items(&self) -> Vec<RenderItem> {
        self.iter().flat_map(CompositeComponent::render_items).collect()
    }

    /// Forward analog stick values to every root's player component
    pub fn set_player_analog(&mut self, x: f32, y: f32) {
        for object in self.objects.values_mut() {
            if let Some(player) = object.player_mut() {
                player.set_analog_x(x);
                player.set_analog_y(y);
            }
        }
    }

    /// Pivot of the first object carrying a camera component
    pub fn camera_anchor(&self) -> Option<Vec3> {
        self.iter().find_map(CompositeComponent::camera_anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigFormat};
    use crate::render::headless::MemoryLibrary;
    use crate::scene::factory::{ComponentDescription, ObjectDescription};

    fn factory() -> ObjectFactory {
        let mut factory = ObjectFactory::new("does/not/exist");
        factory.register(ObjectDescription {
            name: "rock".to_string(),
            components: vec![ComponentDescription::Render {
                mesh: "meshes/rock".to_string(),
                offset: [0.0; 3],
                rotation: [0.0; 3],
                scale: 1.0,
            }],
        });
        factory
    }

    fn library() -> MemoryLibrary {
        MemoryLibrary::new().with_mesh("meshes/rock").with_texture("textures/sky")
    }

    fn description(text: &str) -> SceneDescription {
        SceneDescription::from_str_as(text, ConfigFormat::Ron).unwrap()
    }

    #[test]
    fn test_load_places_objects_lights_and_skybox() {
        let mut graph = SceneGraph::new(factory());
        let mut lights = LightCollections::new();
        let loaded = graph.load(
            &description(
                r#"#![enable(implicit_some)]
                (sceneobject: [
                    (x: 1.0, ressourcecomponent: "rock"),
                    (x: 2.0, ressourcecomponent: "rock"),
                    (light: (type: "spotshadow")),
                    (scale: 50.0, skybox: (material: "textures/sky")),
                ])"#,
            ),
            &mut lights,
            &library(),
        );

        assert_eq!(loaded.report.objects, 2);
        assert_eq!(loaded.report.lights, vec![LightKind::SpotShadow]);
        assert!(loaded.report.errors.is_empty());
        assert_eq!(graph.len(), 2);
        assert_eq!(lights.count(LightKind::SpotShadow), 1);
        assert_eq!(graph.skybox(), Some(&Skybox { scale: 50.0, material: Some("textures/sky".to_string()) }));

        let xs: Vec<f32> = graph.iter().map(|object| object.position().x).collect();
        assert_eq!(xs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_bad_elements_are_skipped() {
        let mut graph = SceneGraph::new(factory());
        let mut lights = LightCollections::new();
        let loaded = graph.load(
            &description(
                r#"#![enable(implicit_some)]
                (sceneobject: [
                    (light: (type: "area")),
                    (ressourcecomponent: "ghost"),
                    (x: 3.0),
                    (ressourcecomponent: "rock"),
                    (light: (type: "omni")),
                ])"#,
            ),
            &mut lights,
            &library(),
        );

        let failed: Vec<usize> = loaded.report.errors.iter().map(|(index, _)| *index).collect();
        assert_eq!(failed, vec![0, 1, 2]);
        assert!(matches!(loaded.report.errors[0].1, SceneError::UnknownLightType(_)));
        assert!(matches!(loaded.report.errors[1].1, SceneError::ResourceMissing { .. }));
        assert_eq!(graph.len(), 1);
        assert_eq!(lights.len(), 1);
    }

    #[test]
    fn test_unresolved_skybox_material_is_not_drawn() {
        let mut graph = SceneGraph::new(factory());
        let mut lights = LightCollections::new();
        graph.load(
            &description(r#"#![enable(implicit_some)] (sceneobject: [(skybox: (material: "textures/missing"))])"#),
            &mut lights,
            &library(),
        );
        assert_eq!(graph.skybox().and_then(|skybox| skybox.material.clone()), None);
    }

    #[test]
    fn test_update_visits_every_root_in_order() {
        let mut graph = SceneGraph::new(factory());
        let handles: Vec<ObjectHandle> = (0..3)
            .map(|_| graph.insert(CompositeComponent::new("marker")))
            .collect();
        assert_eq!(graph.handles(), handles.as_slice());

        graph.update(0.016, 2.5);
        assert!(graph.iter().all(|object| object.last_update() == Some(2.5)));
    }

    #[test]
    fn test_clear_twice_is_safe() {
        let mut graph = SceneGraph::new(factory());
        let mut lights = LightCollections::new();
        graph.load(
            &description(r#"#![enable(implicit_some)] (sceneobject: [(ressourcecomponent: "rock")])"#),
            &mut lights,
            &library(),
        );
        assert_eq!(graph.len(), 1);

        graph.clear();
        assert!(graph.is_empty());
        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.render_items().is_empty());
    }
}
