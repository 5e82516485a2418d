//! # Glowscene Prelude
//!
//! Commonly used types in one import.
//!
//! ```no_run
//! use glowscene::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = SceneConfig::default();
//!     GlowApp::new(config)?.run()
//! }
//! ```

// Application and configuration
pub use crate::app::GlowApp;
pub use crate::config::SceneConfig;
pub use crate::default;

// Scene and graphics types
pub use crate::gfx::camera::{CameraManager, OrbitCamera};
pub use crate::gfx::geometry::{generate_box, generate_sphere, GeometryData};
pub use crate::gfx::rendering::{BloomSettings, RenderEngine};
pub use crate::gfx::resources::{Material, SceneLighting};
pub use crate::gfx::scene::{Mesh, Object, Scene};

// Interaction
pub use crate::interaction::{
    ClickReport, CursorStyle, HoverUpdate, InteractiveObject, Interactions, ObjectId, Shape,
    Viewport,
};

// Assets
pub use crate::assets::{AssetDescriptor, AssetLoader, LoadEvent, LoadedAsset};

// Common external dependencies
pub use cgmath::{InnerSpace, Vector3, Zero};
