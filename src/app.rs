//! The winit host that drives a [`Demo`].
//!
//! [`run`] opens a window, creates the [`GpuContext`] and the demo once the event loop
//! resumes, then redraws continuously. Each redraw acquires the surface texture,
//! lets the demo record its passes, submits and presents.
//!
//! Setup failures and fatal frame errors stop the event loop and are returned from
//! [`run`]; recoverable surface conditions only skip a frame.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::demo::{Demo, Frame};
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::input::Input;

/// Window settings for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "PostFx".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// What to do when the surface texture cannot be acquired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SurfaceRecovery {
    /// Reconfigure the surface and try again next frame.
    Reconfigure,
    /// Drop this frame.
    Skip,
    /// Stop the application.
    Fatal,
}

fn surface_recovery(error: &wgpu::SurfaceError) -> SurfaceRecovery {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceRecovery::Reconfigure,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceRecovery::Skip,
        wgpu::SurfaceError::OutOfMemory => SurfaceRecovery::Fatal,
    }
}

struct Running<D> {
    // Declared first so the demo's resources go before the device.
    demo: D,
    input: Input,
    gpu: GpuContext,
    window: Arc<Window>,
    last_frame: Instant,
}

impl<D: Demo> Running<D> {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig, demo_config: D::Config) -> Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(format!("{} - {}", config.title, D::name()))
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| RenderError::EventLoop(e.to_string()))?,
        );

        let gpu = GpuContext::new(window.clone())?;
        let surface_size = Vec2::new(gpu.width() as f32, gpu.height() as f32);
        let demo = D::new(&gpu, surface_size, demo_config)?;
        log::info!("started demo '{}'", D::name());

        Ok(Self {
            demo,
            input: Input::new(),
            gpu,
            window,
            last_frame: Instant::now(),
        })
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        // Minimized: nothing to draw into.
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let Some(surface) = &self.gpu.surface else {
            return Err(RenderError::Surface("context has no window surface".into()));
        };
        let output = match surface.get_current_texture() {
            Ok(output) => output,
            Err(error) => {
                return match surface_recovery(&error) {
                    SurfaceRecovery::Reconfigure => {
                        log::warn!("surface {error}, reconfiguring");
                        self.gpu.reconfigure();
                        Ok(())
                    }
                    SurfaceRecovery::Skip => {
                        log::warn!("surface {error}, skipping frame");
                        Ok(())
                    }
                    SurfaceRecovery::Fatal => Err(RenderError::Surface(error.to_string())),
                };
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let frame = Frame {
            surface_size: Vec2::new(self.gpu.width() as f32, self.gpu.height() as f32),
            camera: self.input.camera_inputs(dt),
            input: &self.input,
            dt,
            surface_view: &view,
        };
        self.demo.update_and_render(&self.gpu, &mut encoder, &frame)?;

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct DemoApp<D: Demo> {
    config: AppConfig,
    demo_config: Option<D::Config>,
    running: Option<Running<D>>,
    error: Option<RenderError>,
}

impl<D: Demo> DemoApp<D> {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RenderError) {
        log::error!("stopping: {error}");
        self.error = Some(error);
        self.running = None;
        event_loop.exit();
    }
}

impl<D: Demo> ApplicationHandler for DemoApp<D> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(demo_config) = self.demo_config.take() else {
            return;
        };
        match Running::start(event_loop, &self.config, demo_config) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        running.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let result = running.redraw();
                running.input.begin_frame();
                running.window.request_redraw();
                if let Err(error) = result {
                    self.fail(event_loop, error);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.running = None;
    }
}

/// Runs demo `D` until its window is closed.
///
/// # Example
/// ```no_run
/// use postfx::{AppConfig, PostProcessDemo, SceneAssets};
///
/// postfx::run::<PostProcessDemo>(AppConfig::new().size(1280, 720), SceneAssets::new())?;
/// # Ok::<(), postfx::RenderError>(())
/// ```
pub fn run<D: Demo>(config: AppConfig, demo_config: D::Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::<D> {
        config,
        demo_config: Some(demo_config),
        running: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_errors_map_to_recovery() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Lost),
            SurfaceRecovery::Reconfigure
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Outdated),
            SurfaceRecovery::Reconfigure
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Timeout),
            SurfaceRecovery::Skip
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::OutOfMemory),
            SurfaceRecovery::Fatal
        );
    }

    #[test]
    fn config_builder() {
        let config = AppConfig::new().title("Effects").size(640, 480);
        assert_eq!(config.title, "Effects");
        assert_eq!((config.width, config.height), (640, 480));
    }
}
