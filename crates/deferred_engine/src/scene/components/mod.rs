//! Component composition model
//!
//! A scene object is a tree: a [`CompositeComponent`] root owning leaf components and,
//! optionally, nested composites. Leaves are a closed set of variants. Lookup by type is
//! shallow and only looks at direct children.

mod camera;
mod movement;
mod player;
mod render;

use std::fmt;

use crate::foundation::math::{Transform, Vec3};
use crate::render::RenderItem;

pub use camera::CameraComponent;
pub use movement::{MovementComponent, Steering};
pub use player::{angle_difference, rotation_direction, PlayerComponent, DEAD_ZONE};
pub use render::RenderComponent;

/// Component variant tag used for lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// [`RenderComponent`]
    Render,
    /// [`CameraComponent`]
    Camera,
    /// [`MovementComponent`]
    Movement,
    /// [`PlayerComponent`]
    Player,
    /// Nested [`CompositeComponent`]
    Composite,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Any node of a component tree
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Mesh
    Render(RenderComponent),
    /// Camera anchor
    Camera(CameraComponent),
    /// Heading and speed
    Movement(MovementComponent),
    /// Analog controller
    Player(PlayerComponent),
    /// Nested composite
    Composite(CompositeComponent),
}

impl Component {
    /// Variant tag
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Render(_) => ComponentType::Render,
            Self::Camera(_) => ComponentType::Camera,
            Self::Movement(_) => ComponentType::Movement,
            Self::Player(_) => ComponentType::Player,
            Self::Composite(_) => ComponentType::Composite,
        }
    }
}

/// Root (or inner node) of a component tree
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeComponent {
    name: String,
    transform: Transform,
    children: Vec<Component>,
    last_update: Option<f32>,
}

impl CompositeComponent {
    /// Create an empty composite
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            children: Vec::new(),
            last_update: None,
        }
    }

    /// Builder form of [`CompositeComponent::add_child`]
    pub fn with_child(mut self, component: Component) -> Self {
        self.add_child(component);
        self
    }

    /// Name of the description this tree was built from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a child
    pub fn add_child(&mut self, component: Component) {
        self.children.push(component);
        self.propagate_transform();
    }

    /// Direct children
    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Root transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the root transform and push it into the render children
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.propagate_transform();
    }

    /// Move the root
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.propagate_transform();
    }

    /// Root position
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Elapsed time passed to the last `update`
    pub fn last_update(&self) -> Option<f32> {
        self.last_update
    }

    /// First direct child of a type
    pub fn try_get_component_by_type(&self, component_type: ComponentType) -> Option<&Component> {
        self.children.iter().find(|child| child.component_type() == component_type)
    }

    /// Mutable form of [`CompositeComponent::try_get_component_by_type`]
    pub fn try_get_component_by_type_mut(&mut self, component_type: ComponentType) -> Option<&mut Component> {
        self.children.iter_mut().find(|child| child.component_type() == component_type)
    }

    /// First direct render child
    pub fn render(&self) -> Option<&RenderComponent> {
        match self.try_get_component_by_type(ComponentType::Render)? {
            Component::Render(render) => Some(render),
            _ => None,
        }
    }

    /// First direct movement child
    pub fn movement(&self) -> Option<&MovementComponent> {
        match self.try_get_component_by_type(ComponentType::Movement)? {
            Component::Movement(movement) => Some(movement),
            _ => None,
        }
    }

    /// First direct player child
    pub fn player_mut(&mut self) -> Option<&mut PlayerComponent> {
        match self.try_get_component_by_type_mut(ComponentType::Player)? {
            Component::Player(player) => Some(player),
            _ => None,
        }
    }

    /// Update the tree
    ///
    /// The player steers the sibling movement component, movement displaces the root,
    /// nested composites update, then the root transform is pushed into the render children.
    pub fn update(&mut self, scaled_time: f32, elapsed_time: f32) {
        let steering = self.player_mut().map(|player| player.update(scaled_time));

        let displacement = match self.try_get_component_by_type_mut(ComponentType::Movement) {
            Some(Component::Movement(movement)) => {
                if let Some(steering) = steering {
                    movement.steer(steering);
                }
                Some(movement.displacement(scaled_time))
            }
            _ => None,
        };
        if let Some(displacement) = displacement {
            self.transform.position += displacement;
        }

        for child in &mut self.children {
            match child {
                Component::Composite(composite) => composite.update(scaled_time, elapsed_time),
                // Movement and player ran above. Render and camera leaves carry no per-frame
                // state; their placement is refreshed by the propagation below.
                Component::Render(_) | Component::Camera(_) | Component::Movement(_) | Component::Player(_) => {}
            }
        }

        self.propagate_transform();
        self.last_update = Some(elapsed_time);
    }

    /// Push the world placement into render children and nested composites
    fn propagate_transform(&mut self) {
        let world = self.transform.clone();
        self.propagate_world(&world);
    }

    fn propagate_world(&mut self, world: &Transform) {
        let matrix = world.to_matrix();
        for child in &mut self.children {
            match child {
                Component::Render(render) => render.set_parent_matrix(&matrix),
                Component::Composite(composite) => {
                    let nested = world.combine(&composite.transform);
                    composite.propagate_world(&nested);
                }
                _ => {}
            }
        }
    }

    /// Draw requests for every render component in the tree
    pub fn render_items(&self) -> Vec<RenderItem> {
        let mut items = Vec::new();
        self.collect_render_items(&mut items);
        items
    }

    fn collect_render_items(&self, items: &mut Vec<RenderItem>) {
        for child in &self.children {
            match child {
                Component::Render(render) => items.push(render.render_item()),
                Component::Composite(composite) => composite.collect_render_items(items),
                _ => {}
            }
        }
    }

    /// Pivot of a direct camera child, if any
    pub fn camera_anchor(&self) -> Option<Vec3> {
        match self.try_get_component_by_type(ComponentType::Camera)? {
            Component::Camera(camera) => Some(camera.anchor(self.transform.position)),
            _ => None,
        }
    }
}
