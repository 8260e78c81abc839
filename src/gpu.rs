//! Core GPU context and device management.
//!
//! This module provides [`GpuContext`], the central struct that holds all wgpu resources
//! needed for rendering. It manages the device, queue, surface, and surface configuration,
//! and is passed to every pass of the post-processing pipeline.
//!
//! # Initialization
//!
//! [`GpuContext::new`] takes a winit [`Window`] and handles all the wgpu boilerplate:
//! instance creation, adapter selection, device/queue creation, and surface configuration.
//! [`GpuContext::headless`] does the same without a window, for rendering into
//! textures only.
//!
//! # Validation
//!
//! wgpu reports validation failures through an uncaptured error handler that panics
//! by default. [`GpuContext::validated`] wraps resource creation in an error scope so
//! those failures surface as [`RenderError::Validation`] instead.
//!
//! [`Window`]: winit::window::Window

use std::sync::Arc;
use winit::window::Window;

use crate::error::{RenderError, Result};

/// Color format assumed for the presentation surface of a headless context.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Core GPU context holding wgpu resources.
///
/// This struct owns all the fundamental wgpu objects needed for rendering:
/// the surface for presenting to the window, the device for creating GPU resources,
/// the queue for submitting commands, and the surface configuration.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window. `None` when headless.
    pub surface: Option<wgpu::Surface<'static>>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    clamp_to_border: bool,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests a suitable GPU adapter
    /// 4. Creates the logical device, enabling border clamping when available
    /// 5. Configures the surface with a linear (non-sRGB) format and Fifo present mode
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = create_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = request_adapter(&instance, Some(&surface))?;
        let (device, queue, clamp_to_border) = request_device(&adapter)?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "surface configured {}x{} as {:?}",
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            surface: Some(surface),
            device,
            queue,
            config,
            clamp_to_border,
        })
    }

    /// Create a context without a window.
    ///
    /// Passes are built for [`HEADLESS_FORMAT`] and `width` x `height` stands in for
    /// the surface size. Draw into your own textures; there is nothing to present.
    pub fn headless(width: u32, height: u32) -> Result<Self> {
        let instance = create_instance();
        let adapter = request_adapter(&instance, None)?;
        let (device, queue, clamp_to_border) = request_device(&adapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: HEADLESS_FORMAT,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok(Self {
            surface: None,
            device,
            queue,
            config,
            clamp_to_border,
        })
    }

    /// Resize the surface to new dimensions.
    ///
    /// Call this when the window is resized. Ignores zero-sized dimensions
    /// to avoid wgpu validation errors (which can occur during window minimize).
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure();
        }
    }

    /// Reapplies the current configuration after the surface was lost or outdated.
    pub fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Whether samplers may use `ClampToBorder`.
    pub fn supports_clamp_to_border(&self) -> bool {
        self.clamp_to_border
    }

    /// Runs `build` inside a validation error scope.
    ///
    /// Any validation error raised while `build` creates shader modules, pipelines,
    /// textures or buffers is returned as [`RenderError::Validation`] tagged with `label`.
    pub fn validated<T>(&self, label: &str, build: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(value),
            Some(error) => Err(RenderError::Validation {
                label: label.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface,
        force_fallback_adapter: false,
    }))
    .map_err(|e| RenderError::Adapter(e.to_string()))?;

    let info = adapter.get_info();
    log::info!("using adapter '{}' ({:?})", info.name, info.backend);
    Ok(adapter)
}

fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue, bool)> {
    let border = wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
    let clamp_to_border = adapter.features().contains(border);
    if !clamp_to_border {
        log::warn!("adapter lacks border clamping, offscreen samplers clamp to edge");
    }

    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("PostFx Device"),
        required_features: adapter.features() & border,
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }))
    .map_err(|e| RenderError::Device(e.to_string()))?;

    Ok((device, queue, clamp_to_border))
}
