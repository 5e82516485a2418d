//! # Graphics Module
//!
//! Camera, geometry, rendering and scene management for the viewer.
//!
//! ## Architecture Overview
//!
//! - **Camera System** ([`camera`]) - Orbit camera with damped controls
//! - **Geometry** ([`geometry`]) - Procedural boxes and spheres
//! - **Rendering Pipeline** ([`rendering`]) - HDR scene pass, equirectangular sky and bloom
//! - **Scene Management** ([`scene`]) - Objects, meshes and their GPU state
//! - **Resource Management** ([`resources`]) - Materials, textures and global uniforms
//!
//! ## Usage
//!
//! ```no_run
//! use glowscene::gfx::{
//!     camera::{CameraController, CameraManager, OrbitCamera},
//!     scene::Scene,
//! };
//! use cgmath::Vector3;
//!
//! let camera = OrbitCamera::looking_at(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 0.0), 1.5);
//! let scene = Scene::new(CameraManager::new(camera, CameraController::new(0.005, 0.5)));
//! // The render engine is created by the app once a window exists:
//! // let engine = RenderEngine::new(window, w, h, lighting, bloom, &mut scene).await?;
//! # let _ = scene;
//! ```

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
