//! Scene configuration
//!
//! Everything that places or tunes the scene is read from a TOML file.
//! Every field has a default, and the defaults reproduce the stock scene,
//! so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! asset_root = "assets"
//!
//! [camera]
//! fov_degrees = 60.0
//!
//! [[spheres]]
//! id = "sphere1"
//! position = [2.0, 2.0, 1.0]
//! emissive = 0xFF8C00
//! message = "Sphere 1 click!"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cgmath::{Deg, Matrix4, Rad, Vector3};
use serde::{Deserialize, Serialize};

use crate::assets::AssetDescriptor;
use crate::error::ConfigError;
use crate::gfx::camera::{CameraController, OrbitCamera, OrbitCameraBounds};
use crate::gfx::rendering::BloomSettings;
use crate::gfx::resources::{LightConfig, SceneLighting};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory that asset paths are relative to
    pub asset_root: PathBuf,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub bloom: BloomConfig,
    pub lights: LightsConfig,
    pub environment: EnvironmentConfig,
    pub model: Option<ModelConfig>,
    pub spheres: Vec<SphereConfig>,
    pub panels: Vec<PanelConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Fraction of pending input applied per frame; 0 disables damping
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Radians per pixel of drag
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// A release further than this from the press is a drag, not a click
    pub click_tolerance_px: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BloomConfig {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LightsConfig {
    pub point: PointLightConfig,
    pub ambient: AmbientLightConfig,
    /// Neutral environment fill used until the HDR map is loaded
    pub room_intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PointLightConfig {
    pub color: u32,
    pub intensity: f32,
    /// 0 means no cutoff
    pub range: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    pub color: u32,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Equirectangular HDR; no environment map is loaded when unset
    pub path: Option<PathBuf>,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub scale: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SphereConfig {
    pub id: String,
    pub position: [f32; 3],
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    pub color: u32,
    pub emissive: u32,
    pub base_intensity: f32,
    pub hover_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
    /// Shown when the sphere is clicked
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PanelConfig {
    pub path: PathBuf,
    /// Box width, height and depth
    pub size: [f32; 3],
    pub position: [f32; 3],
    /// Rotation about Y in radians
    pub rotation_y: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            bloom: BloomConfig::default(),
            lights: LightsConfig::default(),
            environment: EnvironmentConfig::default(),
            model: Some(ModelConfig::default()),
            spheres: vec![
                SphereConfig::default(),
                SphereConfig {
                    id: "sphere2".to_string(),
                    position: [5.0, 2.0, -2.0],
                    message: "Sphere 2 click!".to_string(),
                    ..SphereConfig::default()
                },
            ],
            panels: default_panels(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "glowscene".to_string(),
            width: 1280,
            height: 800,
            vsync: true,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 4000.0,
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping: 0.05,
            min_distance: 2.0,
            max_distance: 50.0,
            rotate_speed: 0.005,
            zoom_speed: 0.5,
            click_tolerance_px: 4.0,
        }
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        let settings = BloomSettings::default();
        Self {
            strength: settings.strength,
            radius: settings.radius,
            threshold: settings.threshold,
        }
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            point: PointLightConfig::default(),
            ambient: AmbientLightConfig::default(),
            room_intensity: 0.04,
        }
    }
}

impl Default for PointLightConfig {
    fn default() -> Self {
        Self {
            color: 0xFFFFFF,
            intensity: 2.0,
            range: 50.0,
            position: [5.0, 5.0, 10.0],
        }
    }
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0xFFFFFF,
            intensity: 0.1,
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("kloppenheim_02_puresky_4k.hdr")),
            intensity: 1.0,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("realelementsthreejs/realthreejselements.gltf"),
            scale: 0.3,
            position: [1.0, 1.0, 0.0],
        }
    }
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            id: "sphere1".to_string(),
            position: [2.0, 2.0, 1.0],
            radius: 0.5,
            width_segments: 16,
            height_segments: 8,
            color: 0xFFA500,
            emissive: 0xFF8C00,
            base_intensity: 0.2,
            hover_intensity: 1.0,
            metalness: 0.5,
            roughness: 0.3,
            message: "Sphere 1 click!".to_string(),
        }
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            size: [1.0, 1.0, 0.1],
            position: [0.0, 0.0, 0.0],
            rotation_y: 0.0,
        }
    }
}

/// Panel sizes are authored in units of 2.4
fn default_panels() -> Vec<PanelConfig> {
    const S: f32 = 2.4;
    let panel = |path: &str, size: [f32; 3], position: [f32; 3], rotation_y: f32| PanelConfig {
        path: PathBuf::from("realelementsthreejs").join(path),
        size: [size[0] * S, size[1] * S, size[2] * S],
        position,
        rotation_y,
    };
    vec![
        panel("phoebe.jpg", [1.875, 1.25, 0.07], [7.0, 3.0, 0.2 * S], 7.99),
        panel("taksimsq.png", [1.7, 1.0, 0.056], [-3.0, 3.0, 0.0], 7.7999),
        panel("mischa.png", [1.5, 0.96, 0.056], [1.0, 2.6, 4.7], 0.0),
        panel("kylanetics.png", [0.96, 1.2, 0.056], [1.9, 3.3, -5.0], 0.0),
        panel("kylanetics2.png", [0.96, 1.4, 0.056], [0.2, 3.5, -5.2], 0.0),
    ]
}

/// sRGB transfer function inverse for one 0..1 channel
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// `0xRRGGBB` to linear RGB
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

fn finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

impl SceneConfig {
    /// Reads, parses and validates `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Rejects values the camera, interaction or renderer cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be non-zero".to_string());
        }

        let camera = &self.camera;
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return invalid(format!("camera fov {} is outside (0, 180)", camera.fov_degrees));
        }
        if !(camera.near > 0.0 && camera.far > camera.near && camera.far.is_finite()) {
            return invalid(format!(
                "camera near/far {}/{} must satisfy 0 < near < far",
                camera.near, camera.far
            ));
        }
        if !finite(&camera.position) || !finite(&camera.target) {
            return invalid("camera position and target must be finite".to_string());
        }
        if camera.position == camera.target {
            return invalid("camera position and target coincide".to_string());
        }

        let controls = &self.controls;
        if !(0.0..=1.0).contains(&controls.damping) {
            return invalid(format!("damping {} is outside [0, 1]", controls.damping));
        }
        if !(controls.min_distance > 0.0 && controls.max_distance >= controls.min_distance) {
            return invalid(format!(
                "orbit distance bounds {}..{} are unusable",
                controls.min_distance, controls.max_distance
            ));
        }
        if !(controls.click_tolerance_px >= 0.0) {
            return invalid("click tolerance must be non-negative".to_string());
        }

        let mut ids = HashSet::new();
        for sphere in &self.spheres {
            if !ids.insert(sphere.id.as_str()) {
                return invalid(format!("sphere id '{}' is used twice", sphere.id));
            }
            if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
                return invalid(format!("sphere '{}' needs a positive radius", sphere.id));
            }
            if !finite(&sphere.position) {
                return invalid(format!("sphere '{}' has a non-finite position", sphere.id));
            }
            if sphere.width_segments < 3 || sphere.height_segments < 2 {
                return invalid(format!("sphere '{}' has too few segments", sphere.id));
            }
            if !sphere.base_intensity.is_finite() || !sphere.hover_intensity.is_finite() {
                return invalid(format!("sphere '{}' has a non-finite intensity", sphere.id));
            }
        }

        for panel in &self.panels {
            if panel.size.iter().any(|&s| !(s > 0.0 && s.is_finite())) {
                return invalid(format!("panel {} needs a positive size", panel.path.display()));
            }
        }

        if let Some(model) = &self.model {
            if !(model.scale > 0.0 && model.scale.is_finite()) {
                return invalid(format!("model scale {} must be positive", model.scale));
            }
        }

        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.asset_root.join(path)
    }

    /// Camera for a viewport of the given aspect ratio
    pub fn build_camera(&self, aspect: f32) -> OrbitCamera {
        let camera = &self.camera;
        OrbitCamera::looking_at(
            Vector3::from(camera.position),
            Vector3::from(camera.target),
            aspect,
        )
        .with_perspective(Rad::from(Deg(camera.fov_degrees)), camera.near, camera.far)
        .with_bounds(OrbitCameraBounds {
            min_distance: Some(self.controls.min_distance),
            max_distance: Some(self.controls.max_distance),
            ..Default::default()
        })
    }

    pub fn build_controller(&self) -> CameraController {
        CameraController::new(self.controls.rotate_speed, self.controls.zoom_speed)
            .with_damping(self.controls.damping)
    }

    pub fn lighting(&self) -> SceneLighting {
        let lights = &self.lights;
        SceneLighting {
            light: LightConfig {
                position: lights.point.position,
                color: hex_to_linear(lights.point.color),
                intensity: lights.point.intensity,
                range: lights.point.range,
            },
            ambient_color: hex_to_linear(lights.ambient.color),
            ambient_intensity: lights.ambient.intensity,
            environment_intensity: self.environment.intensity,
            room_intensity: lights.room_intensity,
        }
    }

    pub fn bloom_settings(&self) -> BloomSettings {
        BloomSettings {
            strength: self.bloom.strength,
            radius: self.bloom.radius.clamp(0.0, 1.0),
            threshold: self.bloom.threshold,
        }
    }

    /// Load list for everything that comes from disk
    pub fn asset_descriptors(&self) -> Vec<AssetDescriptor> {
        let mut descriptors = Vec::new();

        if let Some(path) = &self.environment.path {
            descriptors.push(AssetDescriptor::environment("environment", self.resolve(path)));
        }

        if let Some(model) = &self.model {
            let transform = Matrix4::from_translation(Vector3::from(model.position))
                * Matrix4::from_scale(model.scale);
            descriptors.push(AssetDescriptor::model("model", self.resolve(&model.path), transform));
        }

        for (i, panel) in self.panels.iter().enumerate() {
            let name = panel
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("panel{}", i));
            let transform = Matrix4::from_translation(Vector3::from(panel.position))
                * Matrix4::from_angle_y(Rad(panel.rotation_y));
            descriptors.push(AssetDescriptor::panel(
                name,
                self.resolve(&panel.path),
                panel.size,
                transform,
            ));
        }

        descriptors
    }
}

#[cfg(test)]
mod tests {
    use crate::assets::AssetKind;

    use super::*;

    #[test]
    fn defaults_reproduce_stock_scene() {
        let config = SceneConfig::default();
        config.validate().unwrap();

        assert_eq!(config.spheres.len(), 2);
        assert_eq!(config.spheres[1].position, [5.0, 2.0, -2.0]);
        assert_eq!(config.spheres[1].message, "Sphere 2 click!");
        assert_eq!(config.panels.len(), 5);
        assert!((config.panels[0].size[0] - 4.5).abs() < 1e-5);
        assert_eq!(config.bloom_settings(), BloomSettings::default());
    }

    #[test]
    fn empty_file_is_the_default() {
        assert_eq!(SceneConfig::from_toml("").unwrap(), SceneConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = SceneConfig::from_toml(
            r#"
            asset_root = "/srv/scene"

            [camera]
            fov_degrees = 60.0

            [[spheres]]
            id = "solo"
            emissive = 0x00FF00
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.camera.far, 4000.0);
        assert_eq!(config.spheres.len(), 1);
        assert_eq!(config.spheres[0].emissive, 0x00FF00);
        assert_eq!(config.spheres[0].radius, 0.5);
        assert_eq!(config.resolve(Path::new("a.png")), PathBuf::from("/srv/scene/a.png"));
    }

    #[test]
    fn rejects_unusable_camera() {
        let mut config = SceneConfig::default();
        config.camera.near = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SceneConfig::default();
        config.camera.fov_degrees = 180.0;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.camera.target = config.camera.position;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_spheres() {
        let mut config = SceneConfig::default();
        config.spheres[1].id = config.spheres[0].id.clone();
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.spheres[0].radius = -1.0;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.spheres[0].hover_intensity = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn hex_colors_are_linearised() {
        let close = |a: [f32; 3], b: [f32; 3]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-3);
        assert!(close(hex_to_linear(0xFFFFFF), [1.0, 1.0, 1.0]));
        assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
        // 0xA5 = 165 -> ~0.376 linear
        let orange = hex_to_linear(0xFFA500);
        assert!(close(orange, [1.0, 0.376, 0.0]), "{:?}", orange);
    }

    #[test]
    fn descriptors_cover_every_disk_asset() {
        let config = SceneConfig::default();
        let descriptors = config.asset_descriptors();
        assert_eq!(descriptors.len(), 1 + 1 + 5);

        assert_eq!(descriptors[0].kind, AssetKind::Environment);
        assert!(descriptors[0].path.starts_with("assets"));
        assert!(matches!(descriptors[1].kind, AssetKind::Model { .. }));
        let names: Vec<&str> = descriptors[2..].iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["phoebe", "taksimsq", "mischa", "kylanetics", "kylanetics2"]);
    }

    #[test]
    fn built_camera_uses_configured_projection() {
        let config = SceneConfig::default();
        let camera = config.build_camera(1.5);
        assert!((camera.fovy.0 - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.zfar, 4000.0);
        assert_eq!(camera.bounds.min_distance, Some(2.0));
        assert!((camera.distance - 5.0).abs() < 1e-5);
    }
}
