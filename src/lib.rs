//! # PostFx
//!
//! **Offscreen scene rendering followed by a configurable full-screen post-process.**
//!
//! A textured object is drawn into an offscreen target with two color outputs: the lit
//! base image and a specular-only final image. One of them is then resampled over a
//! full-screen quad through an effect chain (invert, grayscale, 3x3 convolution) and
//! presented, with thumbnails of both outputs in the corner.
//!
//! ## Quick Start
//!
//! ```no_run
//! use postfx::{AppConfig, PostProcessDemo, SceneAssets};
//!
//! fn main() -> postfx::Result<()> {
//!     postfx::run::<PostProcessDemo>(
//!         AppConfig::new().title("Effects").size(1280, 720),
//!         SceneAssets::new().model("media/inn.stl"),
//!     )
//! }
//! ```
//!
//! ## Building Blocks
//!
//! - [`OffscreenTarget`] - base image, final image and depth buffer, resized in lockstep
//! - [`ScenePass`] - draws one [`DrawRange`] into both color outputs
//! - [`PostProcessPass`] - the effect chain, driven by [`EffectParameters`]
//! - [`effects`] - the same effect chain evaluated on the CPU
//! - [`Demo`] - the host contract; [`run`] drives any implementation

mod app;
mod camera;
mod controls;
mod demo;
mod effect_params;
pub mod effects;
mod error;
mod freelook_camera;
mod geometry;
mod gpu;
mod input;
mod mesh;
mod offscreen_target;
mod post_process;
mod postprocess_demo;
mod preview;
mod scene_pass;
mod texture;

pub use app::{AppConfig, run};
pub use camera::Camera;
pub use controls::EffectControls;
pub use demo::{Demo, Frame};
pub use effect_params::{
    EffectParameters, KernelPreset, LIGHT_INTENSITY_RANGE, PostProcessUniforms, SourceImage,
};
pub use error::{RenderError, Result};
pub use freelook_camera::{CameraInputs, FreelookCamera};
pub use geometry::{GeometryError, GeometryLoader, RawGeometry};
pub use gpu::GpuContext;
pub use input::{Input, LOOK_BUTTON};
pub use mesh::{DrawRange, MeshBuilder, Vertex, VertexBuffer};
pub use offscreen_target::{
    Attachment, AttachmentAllocator, COLOR_FORMAT, DEPTH_FORMAT, OffscreenTarget, TargetSize,
};
pub use post_process::{PostProcessPass, begin_surface_pass};
pub use postprocess_demo::{
    DIFFUSE_VAR, MODEL_VAR, PostProcessDemo, SPECULAR_VAR, SceneAssets,
};
pub use preview::{PREVIEW_SIZE, PreviewPass, Viewport, preview_viewports};
pub use scene_pass::{MODEL_SCALE, Material, ScenePass, SceneUniforms};
pub use texture::Texture;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
