//! Error types shared by every rendering module.
//!
//! Everything in here is a setup-time failure: a missing adapter, a shader that
//! does not validate, a render target the device cannot allocate, or an asset
//! that fails to load. None of them are recoverable at frame time; the host
//! logs the error and exits.

use crate::geometry::GeometryError;

/// Errors produced while building or driving the render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No adapter compatible with the window surface was found.
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    /// The logical device could not be created.
    #[error("device creation failed: {0}")]
    Device(String),

    /// The window surface could not be created or presented.
    #[error("surface error: {0}")]
    Surface(String),

    /// The offscreen target cannot be used as a render destination.
    #[error("offscreen target {width}x{height} is incomplete: {reason}")]
    TargetIncomplete {
        width: u32,
        height: u32,
        reason: String,
    },

    /// GPU resource creation under `label` failed validation: a shader module,
    /// a pipeline, a texture or a buffer.
    #[error("'{label}' failed validation: {message}")]
    Validation { label: String, message: String },

    /// The scene geometry could not be loaded.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// A texture image could not be decoded.
    #[error("texture load failed: {0}")]
    Texture(#[from] image::ImageError),

    /// A texture image has a dimension of zero or beyond the device limit.
    #[error("texture '{label}' is {width}x{height}, the device allows 1..={max} per side")]
    TextureSize {
        label: String,
        width: u32,
        height: u32,
        max: u32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The winit event loop could not be created or exited abnormally.
    #[error("event loop error: {0}")]
    EventLoop(String),
}

impl From<winit::error::EventLoopError> for RenderError {
    fn from(e: winit::error::EventLoopError) -> Self {
        RenderError::EventLoop(e.to_string())
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
