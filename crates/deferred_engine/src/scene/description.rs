//! Declarative scene description
//!
//! The document mirrors the node layout scene authors write:
//!
//! ```ron
//! #![enable(implicit_some)]
//! (
//!     settings: (
//!         camera: (type: "sphere", position: (x: 0.0, y: 1.0, z: 0.0, radius: 12.0)),
//!         postprocess: (parameters: (toneMappingKey: 0.4)),
//!     ),
//!     sceneobject: [
//!         (x: 2.0, scale: 1.5, ressourcecomponent: "ship"),
//!         (y: 8.0, light: (type: "omni", Radius: (value: 20.0))),
//!     ],
//! )
//! ```
//!
//! Every attribute is optional. [`SceneDescription::resolve_settings`] and the per-node
//! `resolve` helpers fill in defaults so nothing downstream sees a missing value.

use serde::{Deserialize, Serialize};

use crate::camera::{CameraKind, CameraParameters};
use crate::config::Config;
use crate::foundation::math::{utils, Vec2, Vec3, Vec4};
use crate::render::{
    DirectionalLight, LightKind, LightProperties, OmniLight, PostProcessParameters, SceneLight, SpotLight, SpotShadow,
    NEUTRAL_COLOR_LUT,
};

use super::SceneError;

/// Light radius when the description has none
pub const DEFAULT_LIGHT_RADIUS: f32 = 10.0;
/// Spot inner angle in degrees when the description has none
pub const DEFAULT_INNER_ANGLE: f32 = 20.0;
/// Spot outer angle in degrees when the description has none
pub const DEFAULT_OUTER_ANGLE: f32 = 30.0;

/// Root scene node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Camera and post-processing settings
    pub settings: Option<SettingsNode>,
    /// Object placements, in load order
    #[serde(rename = "sceneobject")]
    pub objects: Vec<SceneObjectNode>,
}

impl Config for SceneDescription {}

/// `settings` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsNode {
    /// Camera to create
    pub camera: Option<CameraNode>,
    /// Post-processing parameters
    pub postprocess: Option<PostProcessNode>,
}

/// `camera` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraNode {
    /// "firstperson" or "sphere"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Placement
    pub position: Option<CameraPositionNode>,
    /// Movement speeds
    pub speed: Option<SpeedNode>,
    /// Lens parameters
    pub parameters: Option<LensNode>,
}

/// Camera `position` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPositionNode {
    /// X
    pub x: Option<f32>,
    /// Y
    pub y: Option<f32>,
    /// Z
    pub z: Option<f32>,
    /// Pitch in radians
    #[serde(rename = "rX")]
    pub rx: Option<f32>,
    /// Yaw in radians
    #[serde(rename = "rY")]
    pub ry: Option<f32>,
    /// Orbit radius (sphere cameras only)
    pub radius: Option<f32>,
}

/// Camera `speed` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedNode {
    /// Position speed
    pub position: Option<f32>,
    /// Rotation speed
    pub rotation: Option<f32>,
}

/// Camera `parameters` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LensNode {
    /// Vertical field of view in degrees
    pub fov: Option<f32>,
    /// Depth-of-field near blur distance
    pub dof_near_blur: Option<f32>,
    /// Depth-of-field focal plane
    pub dof_focal_plane: Option<f32>,
    /// Depth-of-field far blur distance
    pub dof_far_blur: Option<f32>,
    /// Maximum far blur
    pub dof_max_far_blur: Option<f32>,
}

/// `postprocess` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessNode {
    /// Parameter block
    pub parameters: Option<PostProcessParametersNode>,
}

/// `postprocess/parameters` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PostProcessParametersNode {
    /// Tone mapping key
    pub tone_mapping_key: Option<f32>,
    /// Glow multiplier
    pub glow_multiplier: Option<f32>,
    /// Bright pass threshold
    pub bright_pass_threshold: Option<f32>,
    /// Bright pass offset
    pub bright_pass_offset: Option<f32>,
    /// Eye adaptation base time
    pub adaptation_base_time: Option<f32>,
    /// Color lookup table texture
    #[serde(rename = "colorLUT")]
    pub color_lut: Option<String>,
}

/// `sceneobject` node: a placement plus one content child
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneObjectNode {
    /// X
    pub x: Option<f32>,
    /// Y
    pub y: Option<f32>,
    /// Z
    pub z: Option<f32>,
    /// Rotation around X in radians
    #[serde(rename = "rX")]
    pub rx: Option<f32>,
    /// Rotation around Y in radians
    #[serde(rename = "rY")]
    pub ry: Option<f32>,
    /// Rotation around Z in radians
    #[serde(rename = "rZ")]
    pub rz: Option<f32>,
    /// Uniform scale
    pub scale: Option<f32>,
    /// Object description to instantiate
    pub ressourcecomponent: Option<String>,
    /// Light to create
    pub light: Option<LightNode>,
    /// Skybox to place
    pub skybox: Option<SkyboxNode>,
}

/// `light` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightNode {
    /// "omni", "spot", "spotshadow" or "directional"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Color
    #[serde(rename = "Color")]
    pub color: Option<ColorNode>,
    /// Intensity multiplier
    #[serde(rename = "Multiplier")]
    pub multiplier: Option<ValueNode>,
    /// Falloff radius (omni, spot)
    #[serde(rename = "Radius")]
    pub radius: Option<ValueNode>,
    /// Inner cone angle in degrees (spot)
    #[serde(rename = "InnerAngle")]
    pub inner_angle: Option<ValueNode>,
    /// Outer cone angle in degrees (spot)
    #[serde(rename = "OuterAngle")]
    pub outer_angle: Option<ValueNode>,
}

/// Node carrying a single `value` attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueNode {
    /// The value
    pub value: Option<f32>,
}

/// `Color` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorNode {
    /// Red
    pub r: Option<f32>,
    /// Green
    pub g: Option<f32>,
    /// Blue
    pub b: Option<f32>,
}

/// `skybox` node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyboxNode {
    /// Cube map material
    pub material: Option<String>,
}

/// Fully resolved scene settings
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSettings {
    /// Parameters of the current camera
    pub camera: CameraParameters,
    /// Post-processing parameters for the renderer
    pub post_process: PostProcessParameters,
}

/// Resolved placement attributes of a `sceneobject`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Position
    pub position: Vec3,
    /// Euler rotation in radians
    pub rotation: Vec3,
    /// Uniform scale
    pub scale: f32,
}

/// What a `sceneobject` places
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectContent<'a> {
    /// Instantiate the named object description
    Resource(&'a str),
    /// Create a light
    Light(&'a LightNode),
    /// Place the skybox
    Skybox(&'a SkyboxNode),
}

impl SceneDescription {
    /// Resolve camera and post-processing settings, filling every gap with defaults
    ///
    /// A description without `settings` or `camera` yields a first-person camera at the origin.
    pub fn resolve_settings(&self) -> SceneSettings {
        let settings = self.settings.as_ref();
        let camera = settings
            .and_then(|settings| settings.camera.as_ref())
            .map_or_else(CameraParameters::default, CameraNode::resolve);
        let post_process = settings
            .and_then(|settings| settings.postprocess.as_ref())
            .and_then(|postprocess| postprocess.parameters.as_ref())
            .map_or_else(PostProcessParameters::default, PostProcessParametersNode::resolve);
        SceneSettings { camera, post_process }
    }
}

impl CameraNode {
    /// Camera parameters with defaults applied
    pub fn resolve(&self) -> CameraParameters {
        let defaults = CameraParameters::default();
        let kind = match self.kind.as_deref() {
            Some(token) => token.parse().unwrap_or_else(|error| {
                log::warn!("{}, using {}", error, CameraKind::FirstPerson);
                CameraKind::FirstPerson
            }),
            None => CameraKind::FirstPerson,
        };

        let position = self.position.clone().unwrap_or_default();
        let speed = self.speed.clone().unwrap_or_default();
        let lens = self.parameters.clone().unwrap_or_default();
        let dof = Vec4::new(
            lens.dof_near_blur.unwrap_or(defaults.dof.x),
            lens.dof_focal_plane.unwrap_or(defaults.dof.y),
            lens.dof_far_blur.unwrap_or(defaults.dof.z),
            lens.dof_max_far_blur.unwrap_or(defaults.dof.w),
        );

        CameraParameters {
            kind,
            position: Vec3::new(
                position.x.unwrap_or(0.0),
                position.y.unwrap_or(0.0),
                position.z.unwrap_or(0.0),
            ),
            rotation: Vec2::new(position.rx.unwrap_or(0.0), position.ry.unwrap_or(0.0)),
            radius: position.radius.unwrap_or(defaults.radius),
            fov: lens.fov.unwrap_or(defaults.fov),
            dof,
            position_speed: speed.position.unwrap_or(defaults.position_speed),
            rotation_speed: speed.rotation.unwrap_or(defaults.rotation_speed),
        }
    }
}

impl PostProcessParametersNode {
    /// Post-processing parameters with defaults applied
    pub fn resolve(&self) -> PostProcessParameters {
        let defaults = PostProcessParameters::default();
        PostProcessParameters {
            tone_mapping_key: self.tone_mapping_key.unwrap_or(defaults.tone_mapping_key),
            glow_multiplier: self.glow_multiplier.unwrap_or(defaults.glow_multiplier),
            bright_pass_threshold: self.bright_pass_threshold.unwrap_or(defaults.bright_pass_threshold),
            bright_pass_offset: self.bright_pass_offset.unwrap_or(defaults.bright_pass_offset),
            adaptation_base_time: self.adaptation_base_time.unwrap_or(defaults.adaptation_base_time),
            color_lut: self.color_lut.clone().unwrap_or_else(|| NEUTRAL_COLOR_LUT.to_string()),
        }
    }
}

impl SceneObjectNode {
    /// Placement with defaults applied (origin, no rotation, unit scale)
    pub fn placement(&self) -> Placement {
        Placement {
            position: Vec3::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0), self.z.unwrap_or(0.0)),
            rotation: Vec3::new(self.rx.unwrap_or(0.0), self.ry.unwrap_or(0.0), self.rz.unwrap_or(0.0)),
            scale: self.scale.unwrap_or(1.0),
        }
    }

    /// The content child; the first of resource, light, skybox wins when several are present
    pub fn content(&self) -> Result<ObjectContent<'_>, SceneError> {
        let present = [self.ressourcecomponent.is_some(), self.light.is_some(), self.skybox.is_some()]
            .into_iter()
            .filter(|present| *present)
            .count();
        if present > 1 {
            log::warn!("sceneobject has {} content children, only the first is used", present);
        }

        if let Some(name) = &self.ressourcecomponent {
            Ok(ObjectContent::Resource(name))
        } else if let Some(light) = &self.light {
            Ok(ObjectContent::Light(light))
        } else if let Some(skybox) = &self.skybox {
            Ok(ObjectContent::Skybox(skybox))
        } else {
            Err(SceneError::Load {
                element: "sceneobject".to_string(),
                reason: "expected one of ressourcecomponent, light or skybox".to_string(),
            })
        }
    }
}

impl LightNode {
    /// Build the light at a placement
    ///
    /// Spot lights take their pitch and yaw from the placement rotation; angles are authored
    /// in degrees.
    pub fn resolve(&self, placement: &Placement) -> Result<SceneLight, SceneError> {
        let token = self.kind.as_deref().ok_or_else(|| SceneError::Load {
            element: "light".to_string(),
            reason: "missing type attribute".to_string(),
        })?;
        let kind: LightKind = token.parse().map_err(SceneError::UnknownLightType)?;

        let color = self.color.clone().unwrap_or_default();
        let mut properties = LightProperties {
            color: Vec3::new(color.r.unwrap_or(1.0), color.g.unwrap_or(1.0), color.b.unwrap_or(1.0)),
            multiplier: value_or(self.multiplier.as_ref(), 1.0),
            position: placement.position,
            rotation: Vec3::zeros(),
        };
        let radius = value_or(self.radius.as_ref(), DEFAULT_LIGHT_RADIUS);

        let light = match kind {
            LightKind::Omni => SceneLight::Omni(OmniLight::new(properties, radius)),
            LightKind::Directional => SceneLight::Directional(DirectionalLight::new(properties)),
            LightKind::Spot | LightKind::SpotShadow => {
                properties.rotation = Vec3::new(placement.rotation.x, placement.rotation.y, 0.0);
                let spot = SpotLight::new(
                    properties,
                    radius,
                    utils::deg_to_rad(value_or(self.inner_angle.as_ref(), DEFAULT_INNER_ANGLE)),
                    utils::deg_to_rad(value_or(self.outer_angle.as_ref(), DEFAULT_OUTER_ANGLE)),
                );
                if kind == LightKind::Spot {
                    SceneLight::Spot(spot)
                } else {
                    SceneLight::SpotShadow(SpotShadow::new(spot))
                }
            }
        };
        Ok(light)
    }
}

fn value_or(node: Option<&ValueNode>, default: f32) -> f32 {
    node.and_then(|node| node.value).unwrap_or(default)
}
