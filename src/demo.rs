//! The contract between the host application and a demo.
//!
//! A demo owns every GPU resource it needs from [`Demo::new`] until it is dropped.
//! The host creates the window and the [`GpuContext`], acquires the surface texture,
//! and hands the demo one [`Frame`] per redraw. Demos are selected statically with
//! [`run::<D>`](crate::app::run); there is no runtime registry.

use glam::Vec2;

use crate::error::Result;
use crate::freelook_camera::CameraInputs;
use crate::gpu::GpuContext;
use crate::input::Input;

/// Everything a demo gets for one frame.
pub struct Frame<'a> {
    /// Surface size as reported by the window layer.
    pub surface_size: Vec2,
    /// Camera input already filtered by the host (mouse look only while the look
    /// button is held).
    pub camera: CameraInputs,
    /// Full keyboard and mouse state, for demo-specific bindings.
    pub input: &'a Input,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// The surface texture view to draw the finished frame into.
    pub surface_view: &'a wgpu::TextureView,
}

/// A self-contained rendering demo.
pub trait Demo: Sized {
    /// Construction-time settings (asset paths and the like).
    type Config;

    /// Builds all resources for a surface of `surface_size`.
    fn new(gpu: &GpuContext, surface_size: Vec2, config: Self::Config) -> Result<Self>;

    /// Runs one frame step, recording into `encoder`. The host submits and presents.
    fn update_and_render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame: &Frame<'_>,
    ) -> Result<()>;

    /// Display name, used for the window title and logs.
    fn name() -> &'static str;
}
