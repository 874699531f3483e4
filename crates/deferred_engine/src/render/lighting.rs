//! Scene lights and the per-kind light collections
//!
//! Lights are a closed family: omni (point) lights, spot lights, shadow-casting spot lights
//! and directional lights. Each kind lives in its own collection inside
//! [`LightCollections`], which the rendering context owns and the deferred renderer walks
//! every frame. Lights are static once a scene is loaded.

use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};

use crate::foundation::bounds::AABB;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, WORLD_UP};

/// Near plane used when rendering a shadow map from a spot light
const SHADOW_NEAR_PLANE: f32 = 0.1;

/// Light kinds, one per collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Point light with a falloff radius ("omni")
    Omni,
    /// Cone light ("spot")
    Spot,
    /// Cone light that renders a shadow map ("spotshadow")
    SpotShadow,
    /// Light with parallel rays ("directional")
    Directional,
}

impl LightKind {
    /// Every kind, in the order the lighting pass visits them
    pub const ALL: [LightKind; 4] = [Self::Omni, Self::Spot, Self::SpotShadow, Self::Directional];

    /// Token used in scene descriptions
    pub fn token(self) -> &'static str {
        match self {
            Self::Omni => "omni",
            Self::Spot => "spot",
            Self::SpotShadow => "spotshadow",
            Self::Directional => "directional",
        }
    }
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for LightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.token() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Properties every light carries
#[derive(Debug, Clone, PartialEq)]
pub struct LightProperties {
    /// RGB color
    pub color: Vec3,
    /// Intensity multiplier
    pub multiplier: f32,
    /// World-space position
    pub position: Vec3,
    /// Euler rotation in radians (x = pitch, y = yaw)
    pub rotation: Vec3,
}

impl Default for LightProperties {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            multiplier: 1.0,
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
        }
    }
}

impl LightProperties {
    fn color_multiplier(&self) -> [f32; 4] {
        [self.color.x, self.color.y, self.color.z, self.multiplier]
    }
}

/// Point light
#[derive(Debug, Clone, PartialEq)]
pub struct OmniLight {
    /// Shared light properties
    pub properties: LightProperties,
    /// Falloff radius
    pub radius: f32,
}

impl OmniLight {
    /// Create a point light
    pub fn new(properties: LightProperties, radius: f32) -> Self {
        Self { properties, radius }
    }

    /// Box enclosing the light's area of influence
    pub fn bounding_box(&self) -> AABB {
        AABB::from_center_extents(self.properties.position, Vec3::repeat(self.radius))
    }

    /// GPU layout of this light
    pub fn to_uniform(&self) -> OmniLightUniform {
        let p = self.properties.position;
        OmniLightUniform {
            position_radius: [p.x, p.y, p.z, self.radius],
            color_multiplier: self.properties.color_multiplier(),
        }
    }
}

/// Cone light
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    /// Shared light properties
    pub properties: LightProperties,
    /// Cone length
    pub radius: f32,
    /// Full-intensity half angle in radians
    pub inner_angle: f32,
    /// Cut-off half angle in radians
    pub outer_angle: f32,
    bounding_box: AABB,
}

impl SpotLight {
    /// Create a spot light and compute its bounding box
    pub fn new(properties: LightProperties, radius: f32, inner_angle: f32, outer_angle: f32) -> Self {
        let mut light = Self {
            properties,
            radius,
            inner_angle,
            outer_angle,
            bounding_box: AABB::new(Vec3::zeros(), Vec3::zeros()),
        };
        light.compute_bounding_box();
        light
    }

    /// Cone axis derived from the light's pitch and yaw
    pub fn direction(&self) -> Vec3 {
        utils::direction_from_angles(self.properties.rotation.x, self.properties.rotation.y)
    }

    /// Recompute the box enclosing the cone apex and its base disc
    pub fn compute_bounding_box(&mut self) {
        let apex = self.properties.position;
        let axis = self.direction();
        let base_center = apex + axis * self.radius;
        let base_radius = self.radius * self.outer_angle.tan().abs();

        // half extent of a disc with normal `axis` along each world axis
        let disc_extent = Vec3::new(
            (1.0 - axis.x * axis.x).max(0.0).sqrt(),
            (1.0 - axis.y * axis.y).max(0.0).sqrt(),
            (1.0 - axis.z * axis.z).max(0.0).sqrt(),
        ) * base_radius;

        let base = AABB::from_center_extents(base_center, disc_extent);
        self.bounding_box = base.merge(&AABB::new(apex, apex));
    }

    /// Box enclosing the cone
    pub fn bounding_box(&self) -> AABB {
        self.bounding_box
    }

    /// GPU layout of this light
    pub fn to_uniform(&self) -> SpotLightUniform {
        let p = self.properties.position;
        let d = self.direction();
        SpotLightUniform {
            position_radius: [p.x, p.y, p.z, self.radius],
            direction_cos_outer: [d.x, d.y, d.z, self.outer_angle.cos()],
            color_multiplier: self.properties.color_multiplier(),
            cos_inner: [self.inner_angle.cos(), 0.0, 0.0, 0.0],
        }
    }
}

/// Shadow-casting cone light
#[derive(Debug, Clone, PartialEq)]
pub struct SpotShadow {
    /// The cone this light illuminates
    pub spot: SpotLight,
}

impl SpotShadow {
    /// Create a shadow-casting spot light
    pub fn new(spot: SpotLight) -> Self {
        Self { spot }
    }

    /// View-projection used to render and sample the shadow map
    pub fn shadow_view_projection(&self) -> Mat4 {
        let position = self.spot.properties.position;
        let direction = self.spot.direction();
        let up = if direction.cross(&WORLD_UP).norm() < 1e-4 {
            Vec3::z()
        } else {
            WORLD_UP
        };
        let far = self.spot.radius.max(SHADOW_NEAR_PLANE * 2.0);
        let fov = (2.0 * self.spot.outer_angle).clamp(0.01, 3.1);
        Mat4::perspective(fov, 1.0, SHADOW_NEAR_PLANE, far) * Mat4::look_at(position, position + direction, up)
    }
}

/// Light with parallel rays
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Shared light properties; the position encodes where the light comes from
    pub properties: LightProperties,
}

impl DirectionalLight {
    /// Create a directional light
    pub fn new(properties: LightProperties) -> Self {
        Self { properties }
    }

    /// Direction the light travels (from its position towards the origin)
    pub fn direction(&self) -> Vec3 {
        let p = self.properties.position;
        if p.norm() > f32::EPSILON {
            -p.normalize()
        } else {
            -WORLD_UP
        }
    }

    /// GPU layout of this light
    pub fn to_uniform(&self) -> DirectionalLightUniform {
        let d = self.direction();
        DirectionalLightUniform {
            direction: [d.x, d.y, d.z, 0.0],
            color_multiplier: self.properties.color_multiplier(),
        }
    }
}

/// Any light, as produced by the scene loader
#[derive(Debug, Clone, PartialEq)]
pub enum SceneLight {
    /// Point light
    Omni(OmniLight),
    /// Cone light
    Spot(SpotLight),
    /// Shadow-casting cone light
    SpotShadow(SpotShadow),
    /// Directional light
    Directional(DirectionalLight),
}

impl SceneLight {
    /// Kind of this light
    pub fn kind(&self) -> LightKind {
        match self {
            Self::Omni(_) => LightKind::Omni,
            Self::Spot(_) => LightKind::Spot,
            Self::SpotShadow(_) => LightKind::SpotShadow,
            Self::Directional(_) => LightKind::Directional,
        }
    }
}

/// Per-kind light storage owned by the rendering context
#[derive(Debug, Default, Clone)]
pub struct LightCollections {
    omni: Vec<OmniLight>,
    spot: Vec<SpotLight>,
    spot_shadow: Vec<SpotShadow>,
    directional: Vec<DirectionalLight>,
}

impl LightCollections {
    /// Create empty collections
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a light into the collection of its kind
    pub fn insert(&mut self, light: SceneLight) -> LightKind {
        let kind = light.kind();
        match light {
            SceneLight::Omni(light) => self.omni.push(light),
            SceneLight::Spot(light) => self.spot.push(light),
            SceneLight::SpotShadow(light) => self.spot_shadow.push(light),
            SceneLight::Directional(light) => self.directional.push(light),
        }
        log::debug!("Registered {} light", kind);
        kind
    }

    /// Point lights
    pub fn omni(&self) -> &[OmniLight] {
        &self.omni
    }

    /// Spot lights without shadows
    pub fn spot(&self) -> &[SpotLight] {
        &self.spot
    }

    /// Shadow-casting spot lights
    pub fn spot_shadow(&self) -> &[SpotShadow] {
        &self.spot_shadow
    }

    /// Directional lights
    pub fn directional(&self) -> &[DirectionalLight] {
        &self.directional
    }

    /// Number of lights of a kind
    pub fn count(&self, kind: LightKind) -> usize {
        match kind {
            LightKind::Omni => self.omni.len(),
            LightKind::Spot => self.spot.len(),
            LightKind::SpotShadow => self.spot_shadow.len(),
            LightKind::Directional => self.directional.len(),
        }
    }

    /// Total number of lights
    pub fn len(&self) -> usize {
        LightKind::ALL.into_iter().map(|kind| self.count(kind)).sum()
    }

    /// Whether no light is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every light (scene teardown)
    pub fn clear(&mut self) {
        self.omni.clear();
        self.spot.clear();
        self.spot_shadow.clear();
        self.directional.clear();
    }
}

/// GPU layout of a point light
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OmniLightUniform {
    /// xyz = position, w = radius
    pub position_radius: [f32; 4],
    /// rgb = color, a = multiplier
    pub color_multiplier: [f32; 4],
}

/// GPU layout of a spot light
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightUniform {
    /// xyz = position, w = cone length
    pub position_radius: [f32; 4],
    /// xyz = cone axis, w = cos(outer angle)
    pub direction_cos_outer: [f32; 4],
    /// rgb = color, a = multiplier
    pub color_multiplier: [f32; 4],
    /// x = cos(inner angle)
    pub cos_inner: [f32; 4],
}

/// GPU layout of a directional light
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightUniform {
    /// xyz = travel direction
    pub direction: [f32; 4],
    /// rgb = color, a = multiplier
    pub color_multiplier: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn properties_at(position: Vec3) -> LightProperties {
        LightProperties { position, ..LightProperties::default() }
    }

    fn light_of(kind: LightKind) -> SceneLight {
        let spot = SpotLight::new(properties_at(Vec3::zeros()), 5.0, 0.3, 0.5);
        match kind {
            LightKind::Omni => SceneLight::Omni(OmniLight::new(properties_at(Vec3::zeros()), 4.0)),
            LightKind::Spot => SceneLight::Spot(spot),
            LightKind::SpotShadow => SceneLight::SpotShadow(SpotShadow::new(spot)),
            LightKind::Directional => SceneLight::Directional(DirectionalLight::new(properties_at(Vec3::y()))),
        }
    }

    #[test]
    fn test_tokens_resolve_to_exactly_one_kind() {
        for kind in LightKind::ALL {
            assert_eq!(kind.token().parse::<LightKind>().unwrap(), kind);
        }
        assert_eq!("area".parse::<LightKind>(), Err("area".to_string()));
    }

    #[test]
    fn test_each_kind_lands_in_one_collection() {
        for kind in LightKind::ALL {
            let mut lights = LightCollections::new();
            assert_eq!(lights.insert(light_of(kind)), kind);
            assert_eq!(lights.len(), 1);
            for other in LightKind::ALL {
                assert_eq!(lights.count(other), usize::from(other == kind));
            }
        }
    }

    #[test]
    fn test_clear_empties_every_collection() {
        let mut lights = LightCollections::new();
        for kind in LightKind::ALL {
            lights.insert(light_of(kind));
        }
        assert_eq!(lights.len(), 4);
        lights.clear();
        assert!(lights.is_empty());
    }

    #[test]
    fn test_spot_bounding_box_encloses_cone() {
        let mut properties = properties_at(Vec3::new(1.0, 2.0, 3.0));
        properties.rotation = Vec3::new(-0.4, 0.9, 0.0);
        let spot = SpotLight::new(properties, 6.0, 0.2, 0.45);
        let aabb = spot.bounding_box();

        assert!(aabb.contains_point(spot.properties.position));
        let axis = spot.direction();
        let tip = spot.properties.position + axis * spot.radius;
        assert!(aabb.contains_point(tip));

        // sample the rim of the base disc
        let helper = if axis.y.abs() < 0.9 { Vec3::y() } else { Vec3::x() };
        let u = axis.cross(&helper).normalize();
        let v = axis.cross(&u);
        let rim = spot.radius * spot.outer_angle.tan();
        for i in 0..16 {
            let angle = i as f32 / 16.0 * std::f32::consts::TAU;
            let point = tip + (u * angle.cos() + v * angle.sin()) * rim * 0.999;
            assert!(aabb.contains_point(point), "rim point {point:?} outside {aabb:?}");
        }
    }

    #[test]
    fn test_spot_pointing_down_has_symmetric_box() {
        let mut properties = properties_at(Vec3::zeros());
        properties.rotation = Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let spot = SpotLight::new(properties, 2.0, 0.1, std::f32::consts::FRAC_PI_4);
        let aabb = spot.bounding_box();
        assert_relative_eq!(aabb.min.y, -2.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(aabb.min.z, -2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_directional_direction_points_away_from_position() {
        let light = DirectionalLight::new(properties_at(Vec3::new(0.0, 10.0, 0.0)));
        assert_relative_eq!(light.direction(), Vec3::new(0.0, -1.0, 0.0));

        let at_origin = DirectionalLight::new(properties_at(Vec3::zeros()));
        assert_relative_eq!(at_origin.direction(), -WORLD_UP);
    }

    #[test]
    fn test_uniform_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<OmniLightUniform>(), 32);
        assert_eq!(std::mem::size_of::<SpotLightUniform>(), 64);
        assert_eq!(std::mem::size_of::<DirectionalLightUniform>(), 32);

        let omni = OmniLight::new(properties_at(Vec3::new(1.0, 2.0, 3.0)), 7.0).to_uniform();
        let bytes = bytemuck::bytes_of(&omni);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(&floats[..4], &[1.0, 2.0, 3.0, 7.0]);
    }
}
