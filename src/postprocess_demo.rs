//! The post-processing demo: a textured object rendered offscreen, then resampled
//! through the effect chain onto the window.
//!
//! Each frame, in order:
//!
//! 1. resize the offscreen target if the surface size changed
//! 2. apply keyboard controls to the effect parameters
//! 3. advance the free-fly camera
//! 4. upload scene and post-process uniforms
//! 5. draw the scene object into the offscreen target
//! 6. draw the selected offscreen image through the effect chain onto the surface,
//!    followed by thumbnails of both offscreen images

use std::ffi::OsString;
use std::path::PathBuf;

use glam::Vec2;

use crate::controls::EffectControls;
use crate::demo::{Demo, Frame};
use crate::effect_params::EffectParameters;
use crate::error::Result;
use crate::freelook_camera::FreelookCamera;
use crate::geometry::GeometryLoader;
use crate::gpu::GpuContext;
use crate::mesh::{DrawRange, MeshBuilder, VertexBuffer};
use crate::offscreen_target::{OffscreenTarget, TargetSize};
use crate::post_process::{PostProcessPass, begin_surface_pass};
use crate::preview::PreviewPass;
use crate::scene_pass::{Material, ScenePass, SceneUniforms};
use crate::texture::Texture;

/// Environment variable naming an STL model to render.
pub const MODEL_VAR: &str = "POSTFX_MODEL";
/// Environment variable naming the diffuse image.
pub const DIFFUSE_VAR: &str = "POSTFX_DIFFUSE";
/// Environment variable naming the specular image.
pub const SPECULAR_VAR: &str = "POSTFX_SPECULAR";

const PROCEDURAL_TEXTURE_SIZE: u32 = 256;

/// Scene asset locations. Anything left out is replaced by built-in content: a unit
/// cube for the model and generated textures for the material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneAssets {
    pub model: Option<PathBuf>,
    pub diffuse: Option<PathBuf>,
    pub specular: Option<PathBuf>,
}

impl SceneAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`MODEL_VAR`], [`DIFFUSE_VAR`] and [`SPECULAR_VAR`].
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let path = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self {
            model: path(MODEL_VAR),
            diffuse: path(DIFFUSE_VAR),
            specular: path(SPECULAR_VAR),
        }
    }

    pub fn model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model = Some(path.into());
        self
    }

    pub fn diffuse(mut self, path: impl Into<PathBuf>) -> Self {
        self.diffuse = Some(path.into());
        self
    }

    pub fn specular(mut self, path: impl Into<PathBuf>) -> Self {
        self.specular = Some(path.into());
        self
    }
}

/// Owns every resource of the two-pass pipeline. Dropping it releases them all.
pub struct PostProcessDemo {
    params: EffectParameters,
    controls: EffectControls,
    camera: FreelookCamera,
    target: OffscreenTarget,
    scene: ScenePass,
    post: PostProcessPass,
    previews: PreviewPass,
    material: Material,
    vertices: VertexBuffer,
    quad: DrawRange,
    object: DrawRange,
}

impl PostProcessDemo {
    /// Current effect parameters.
    pub fn params(&self) -> &EffectParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut EffectParameters {
        &mut self.params
    }

    pub fn target(&self) -> &OffscreenTarget {
        &self.target
    }
}

fn load_texture(
    gpu: &GpuContext,
    path: Option<&PathBuf>,
    fallback: impl FnOnce() -> Result<Texture>,
) -> Result<Texture> {
    match path {
        Some(path) => Texture::from_file(gpu, path),
        None => fallback(),
    }
}

impl Demo for PostProcessDemo {
    type Config = SceneAssets;

    fn new(gpu: &GpuContext, surface_size: Vec2, assets: SceneAssets) -> Result<Self> {
        let size = TargetSize::from_surface(surface_size);
        let target = gpu.validated("offscreen target", |device| {
            OffscreenTarget::generate(device, size)
        })??;

        let mut builder = MeshBuilder::new();
        let quad = builder.gen_quad(1.0, 1.0);
        let object = match &assets.model {
            Some(path) => {
                let geometry = GeometryLoader::from_file(path)
                    .centered()
                    .normalized()
                    .load()?;
                log::info!(
                    "loaded model {} ({} triangles)",
                    path.display(),
                    geometry.indices.len() / 3
                );
                builder.push_geometry(&geometry)
            }
            None => builder.gen_cube(1.0),
        };
        let vertices = gpu.validated("vertex buffer", |_| builder.upload(gpu))?;

        let scene = ScenePass::new(gpu)?;
        let material = gpu.validated("material", |_| -> Result<Material> {
            let diffuse = load_texture(gpu, assets.diffuse.as_ref(), || {
                Texture::procedural_diffuse(gpu, PROCEDURAL_TEXTURE_SIZE, 1)
            })?;
            let specular = load_texture(gpu, assets.specular.as_ref(), || {
                Texture::procedural_specular(gpu, PROCEDURAL_TEXTURE_SIZE, 2)
            })?;
            Ok(scene.create_material(gpu, diffuse, specular))
        })??;
        let post = PostProcessPass::new(gpu)?;
        let previews = PreviewPass::new(gpu)?;

        log::info!("{} demo ready at {}x{}", Self::name(), size.width, size.height);

        Ok(Self {
            params: EffectParameters::default(),
            controls: EffectControls::new(),
            camera: FreelookCamera::new(),
            target,
            scene,
            post,
            previews,
            material,
            vertices,
            quad,
            object,
        })
    }

    fn update_and_render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        frame: &Frame<'_>,
    ) -> Result<()> {
        let surface = TargetSize::from_surface(frame.surface_size);
        if surface.is_empty() {
            return Ok(());
        }

        if surface != self.target.size() {
            gpu.validated("offscreen target", |device| {
                self.target.resize(device, surface)
            })??;
        }

        self.controls.apply(frame.input, frame.dt, &mut self.params);
        self.camera.update(&frame.camera);

        let uniforms = SceneUniforms::new(
            &self.camera.camera(),
            surface.aspect(),
            self.params.light_intensity,
        );
        self.scene.update(gpu, &uniforms);
        self.post.update(gpu, &self.params.to_uniforms());

        self.scene.render(
            encoder,
            &self.target,
            &self.material,
            &self.vertices,
            self.object,
        );

        let mut render_pass = begin_surface_pass(encoder, frame.surface_view);
        self.post.render(
            gpu,
            &mut render_pass,
            surface,
            &self.target,
            self.params.source,
            &self.vertices,
            self.quad,
        );
        self.previews.render(
            gpu,
            &mut render_pass,
            surface,
            &self.target,
            &self.vertices,
            self.quad,
        );

        Ok(())
    }

    fn name() -> &'static str {
        "PostProcess"
    }
}

impl Drop for PostProcessDemo {
    fn drop(&mut self) {
        log::info!("{} demo released", Self::name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_params::SourceImage;
    use crate::freelook_camera::CameraInputs;
    use crate::gpu::tests::{headless, read_rgba, settle, surface_texture};
    use crate::input::Input;
    use crate::preview::PREVIEW_SIZE;
    use std::collections::HashMap;

    /// Live backend objects of each kind the demo creates.
    fn live_objects(gpu: &GpuContext) -> [isize; 9] {
        let hal = gpu.device.get_internal_counters().hal;
        [
            hal.buffers.read(),
            hal.textures.read(),
            hal.texture_views.read(),
            hal.samplers.read(),
            hal.bind_groups.read(),
            hal.bind_group_layouts.read(),
            hal.pipeline_layouts.read(),
            hal.render_pipelines.read(),
            hal.shader_modules.read(),
        ]
    }

    fn step(demo: &mut PostProcessDemo, gpu: &GpuContext, surface_size: Vec2, view: &wgpu::TextureView) {
        let input = Input::new();
        let frame = Frame {
            surface_size,
            camera: CameraInputs::default(),
            input: &input,
            dt: 1.0 / 60.0,
            surface_view: view,
        };
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Test Encoder"),
            });
        demo.update_and_render(gpu, &mut encoder, &frame).unwrap();
        gpu.queue.submit(std::iter::once(encoder.finish()));
    }

    #[test]
    fn construct_then_drop_releases_all_resources() {
        let Some(gpu) = headless(320, 240) else {
            return;
        };
        settle(&gpu);
        let before = live_objects(&gpu);

        let demo = PostProcessDemo::new(&gpu, Vec2::new(320.0, 240.0), SceneAssets::new()).unwrap();
        let during = live_objects(&gpu);
        drop(demo);
        settle(&gpu);

        if during == before {
            eprintln!("skipping: backend does not report object counts");
            return;
        }
        assert!(during.iter().zip(before).all(|(d, b)| *d >= b));
        assert_eq!(live_objects(&gpu), before);
    }

    #[test]
    fn frame_step_presents_the_selected_image() {
        let size = TargetSize::new(640, 400);
        let surface_size = Vec2::new(640.0, 400.0);
        let Some(gpu) = headless(size.width, size.height) else {
            return;
        };
        let mut demo = PostProcessDemo::new(&gpu, surface_size, SceneAssets::new()).unwrap();
        demo.params_mut().set_light_intensity(0.5);
        let surface = surface_texture(&gpu, size);
        let view = surface.create_view(&wgpu::TextureViewDescriptor::default());

        for source in [SourceImage::Base, SourceImage::Final] {
            demo.params_mut().source = source;
            step(&mut demo, &gpu, surface_size, &view);

            let shown = read_rgba(&gpu, &surface);
            let offscreen = read_rgba(&gpu, &demo.target().image(source).texture);
            assert_eq!(demo.params().source, source);

            // Below the thumbnails the effect-free chain shows the offscreen image as is.
            let width = size.width as usize;
            for y in PREVIEW_SIZE as usize..size.height as usize {
                for x in 0..width {
                    let (a, b) = (shown[y * width + x], offscreen[y * width + x]);
                    assert!(
                        a.iter().zip(b).all(|(s, o)| s.abs_diff(o) <= 1),
                        "{source:?} at ({x}, {y}): {a:?} vs {b:?}"
                    );
                }
            }
        }
        settle(&gpu);
    }

    #[test]
    fn frame_step_follows_surface_size() {
        let Some(gpu) = headless(320, 240) else {
            return;
        };
        let mut demo = PostProcessDemo::new(&gpu, Vec2::new(320.0, 240.0), SceneAssets::new()).unwrap();
        let surface = surface_texture(&gpu, TargetSize::new(320, 240));
        let view = surface.create_view(&wgpu::TextureViewDescriptor::default());

        step(&mut demo, &gpu, Vec2::new(200.5, 120.0), &view);
        assert_eq!(demo.target().size(), TargetSize::new(200, 120));
        assert_eq!(demo.target().generation(), 1);

        // Minimized: nothing is resized or drawn.
        step(&mut demo, &gpu, Vec2::ZERO, &view);
        assert_eq!(demo.target().size(), TargetSize::new(200, 120));

        step(&mut demo, &gpu, Vec2::new(200.0, 120.0), &view);
        assert_eq!(demo.target().generation(), 1);
        settle(&gpu);
    }

    #[test]
    fn assets_come_from_environment() {
        let env: HashMap<&str, OsString> = [
            (MODEL_VAR, OsString::from("media/inn.stl")),
            (SPECULAR_VAR, OsString::from("media/inn_emissive.png")),
            (DIFFUSE_VAR, OsString::new()),
        ]
        .into_iter()
        .collect();

        let assets = SceneAssets::from_lookup(|name| env.get(name).cloned());
        assert_eq!(
            assets,
            SceneAssets::new()
                .model("media/inn.stl")
                .specular("media/inn_emissive.png")
        );
    }

    #[test]
    fn missing_assets_fall_back_to_builtin_content() {
        let assets = SceneAssets::from_lookup(|_| None);
        assert_eq!(assets, SceneAssets::default());
    }
}
