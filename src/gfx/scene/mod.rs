//! # Scene Management Module
//!
//! Objects, their meshes and materials, and the camera that views them.
//!
//! - [`Scene`] - container for objects, materials and the camera
//! - [`Object`] - meshes plus a transform, a material ID and optionally the
//!   ID of the interactive object it visualises
//! - [`Vertex3D`] - position, normal and texture coordinates

pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use object::{DrawObject, Mesh, Object, TransformUniform};
pub use scene::{Scene, SceneStatistics};
pub use vertex::Vertex3D;
