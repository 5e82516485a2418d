//! Error types
//!
//! One enum per concern. Setup-time problems (bad config, invalid shapes)
//! are surfaced here and are fatal; nothing in this crate retries.

use std::path::PathBuf;

use thiserror::Error;

use crate::interaction::ObjectId;

/// Problems found while registering interactive objects.
#[derive(Debug, Error, PartialEq)]
pub enum InteractionError {
    #[error("object '{id}' has an invalid shape: {reason}")]
    InvalidShape { id: ObjectId, reason: &'static str },

    #[error("object '{0}' is already registered")]
    DuplicateId(ObjectId),

    #[error("object '{id}' has a non-finite intensity")]
    InvalidIntensity { id: ObjectId },
}

/// Problems reading or validating a [`SceneConfig`](crate::config::SceneConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Problems decoding an asset on a loader worker.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to import glTF {path}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("no renderable geometry in {0}")]
    EmptyModel(PathBuf),

    #[error("loader worker for {0} stopped without reporting")]
    WorkerLost(PathBuf),
}

/// Problems creating or driving the GPU renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("pipeline '{0}' was not registered")]
    MissingPipeline(String),

    #[error("shader '{0}' was not loaded")]
    MissingShader(String),

    #[error("{0} bind group layout is not initialised")]
    MissingLayout(&'static str),

    #[error("surface error: {0}")]
    Frame(#[from] wgpu::SurfaceError),
}
