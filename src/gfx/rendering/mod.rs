//! Core rendering functionality
//!
//! Handles render pipelines, the HDR scene pass, bloom and frame presentation.

pub mod bloom;
pub mod pipeline_manager;
pub mod render_engine;

// Re-export main types
pub use bloom::{BloomPass, BloomSettings};
pub use pipeline_manager::{DepthConfig, PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::RenderEngine;
