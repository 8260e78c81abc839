//! Full-screen post-processing of one offscreen image onto the presentation surface.
//!
//! [`PostProcessPass`] resamples either the base or the final image of an
//! [`OffscreenTarget`] over the full-screen quad and runs the effect chain from
//! `post_process.wgsl` (invert, grayscale, 3x3 kernel) as configured by
//! [`PostProcessUniforms`].
//!
//! Bind groups reference the target's texture views, so they are cached per target
//! [generation](OffscreenTarget::generation) and rebuilt after every resize.

use crate::effect_params::{PostProcessUniforms, SourceImage};
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::mesh::{DrawRange, Vertex, VertexBuffer};
use crate::offscreen_target::{AttachmentAllocator, OffscreenTarget, TargetSize};

/// One value per offscreen color output, tied to the target generation it was built for.
pub(crate) struct ImageBindings<T> {
    generation: u64,
    base: T,
    final_image: T,
}

impl<T> ImageBindings<T> {
    /// Returns the cached values for `target`, rebuilding both with `build` when the
    /// cache is empty or was built for an older generation.
    pub(crate) fn refresh<'c, A: AttachmentAllocator>(
        cache: &'c mut Option<Self>,
        target: &OffscreenTarget<A>,
        mut build: impl FnMut(&A::Color) -> T,
    ) -> &'c Self {
        if cache
            .as_ref()
            .is_none_or(|cached| cached.generation != target.generation())
        {
            *cache = None;
        }
        cache.get_or_insert_with(|| ImageBindings {
            generation: target.generation(),
            base: build(target.base()),
            final_image: build(target.final_image()),
        })
    }

    pub(crate) fn get(&self, source: SourceImage) -> &T {
        match source {
            SourceImage::Base => &self.base,
            SourceImage::Final => &self.final_image,
        }
    }
}

/// Address mode and border color for sampling offscreen images.
///
/// Border clamping with a transparent-black border needs an optional device feature;
/// without it the sampler clamps to the edge texels instead.
pub(crate) fn offscreen_addressing(
    clamp_to_border: bool,
) -> (wgpu::AddressMode, Option<wgpu::SamplerBorderColor>) {
    if clamp_to_border {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::TransparentBlack),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    }
}

/// A linear sampler for reading offscreen color outputs.
pub(crate) fn create_offscreen_sampler(gpu: &GpuContext, label: &str) -> wgpu::Sampler {
    let (address_mode, border_color) = offscreen_addressing(gpu.supports_clamp_to_border());
    gpu.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    })
}

/// Begins a render pass on the presentation surface, clearing it to black.
pub fn begin_surface_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Surface Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Applies the effect chain to one offscreen image.
///
/// The shader receives:
/// - `u`: the [`PostProcessUniforms`] block
/// - `color_texture` + `color_sampler`: the selected offscreen image
pub struct PostProcessPass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bindings: Option<ImageBindings<wgpu::BindGroup>>,
}

impl PostProcessPass {
    /// Builds the post-process pipeline for the surface format.
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let surface_format = gpu.config.format;
        let sampler = create_offscreen_sampler(gpu, "PostProcess Sampler");

        gpu.validated("post_process", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("PostProcess Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/post_process.wgsl").into()),
            });

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("PostProcess Uniforms"),
                size: std::mem::size_of::<PostProcessUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("PostProcess Bind Group Layout"),
                entries: &[
                    // Uniforms
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // Input texture
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    // Sampler
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("PostProcess Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("PostProcess Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Self {
                pipeline,
                uniform_buffer,
                bind_group_layout,
                sampler,
                bindings: None,
            }
        })
    }

    /// Uploads this frame's effect parameters.
    pub fn update(&self, gpu: &GpuContext, uniforms: &PostProcessUniforms) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Draws the full-screen quad sampling `source` from `target`.
    ///
    /// The viewport is reset to the whole surface.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass<'_>,
        surface: TargetSize,
        target: &OffscreenTarget,
        source: SourceImage,
        vertices: &VertexBuffer,
        quad: DrawRange,
    ) {
        debug_assert!(vertices.contains(quad));
        let (layout, uniform_buffer, sampler) =
            (&self.bind_group_layout, &self.uniform_buffer, &self.sampler);
        let bindings = ImageBindings::refresh(&mut self.bindings, target, |image| {
            log::debug!("building post-process bind group");
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("PostProcess Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&image.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        });

        render_pass.set_viewport(
            0.0,
            0.0,
            surface.width as f32,
            surface.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bindings.get(source), &[]);
        render_pass.set_vertex_buffer(0, vertices.slice());
        render_pass.draw(quad.range(), 0..1);
    }
}
