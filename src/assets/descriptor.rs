use std::path::{Path, PathBuf};

use cgmath::Matrix4;

/// What an asset file becomes once decoded
#[derive(Debug, Clone, PartialEq)]
pub enum AssetKind {
    /// glTF scene placed with `transform` on top of its own node transforms
    Model { transform: Matrix4<f32> },
    /// Image mapped onto a box of `size` (width, height, depth)
    Panel {
        size: [f32; 3],
        transform: Matrix4<f32>,
    },
    /// Equirectangular HDR used as background and reflection source
    Environment,
}

/// One entry of the load list handed to [`AssetLoader`](super::AssetLoader)
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    pub fn model(name: impl Into<String>, path: impl AsRef<Path>, transform: Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            kind: AssetKind::Model { transform },
        }
    }

    pub fn panel(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        size: [f32; 3],
        transform: Matrix4<f32>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            kind: AssetKind::Panel { size, transform },
        }
    }

    pub fn environment(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
            kind: AssetKind::Environment,
        }
    }

    /// Short label for log lines
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            AssetKind::Model { .. } => "model",
            AssetKind::Panel { .. } => "panel",
            AssetKind::Environment => "environment",
        }
    }
}
