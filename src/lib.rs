// src/lib.rs
//! Glowscene
//!
//! An interactive wgpu scene: a glTF model, image panels and an HDR sky,
//! plus spheres that glow when hovered and report when clicked.

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod gfx;
pub mod interaction;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::GlowApp;
pub use config::SceneConfig;

/// Creates the viewer with the built-in scene
pub fn default() -> anyhow::Result<GlowApp> {
    GlowApp::new(SceneConfig::default())
}
