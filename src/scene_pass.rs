//! Scene rendering into the offscreen target.
//!
//! [`ScenePass`] draws the scene object with two material textures and writes two
//! color outputs at once:
//!
//! - **output 0** (base image): `diffuse + specular * light_intensity`
//! - **output 1** (final image): `specular * light_intensity`
//!
//! # Bind Groups
//!
//! - **Group 0**: [`SceneUniforms`] (projection, view, model, light intensity)
//! - **Group 1**: diffuse texture, specular texture, shared sampler
//!
//! # Pipeline Configuration
//!
//! - Two `Rgba8Unorm` color targets, no blending
//! - Depth write with Less-than comparison against a `Depth32Float` buffer
//! - No face culling, since loaded models are not guaranteed to have consistent winding

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::mesh::{DrawRange, Vertex, VertexBuffer};
use crate::offscreen_target::{COLOR_FORMAT, DEPTH_FORMAT, OffscreenTarget};
use crate::texture::Texture;

/// Uniform scale applied to the scene object.
pub const MODEL_SCALE: f32 = 2.0;

/// Uniform block read by `scene.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Multiplier on the specular texture. Not clamped here.
    pub light_intensity: f32,
    pub _padding: [f32; 3],
}

impl SceneUniforms {
    /// Matrices for `camera` on a surface of the given aspect ratio, with the fixed
    /// model transform.
    pub fn new(camera: &Camera, aspect: f32, light_intensity: f32) -> Self {
        Self {
            projection: camera.projection_matrix(aspect).to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            model: Mat4::from_scale(Vec3::splat(MODEL_SCALE)).to_cols_array_2d(),
            light_intensity,
            _padding: [0.0; 3],
        }
    }
}

/// The two scene textures and the bind group that exposes them to `scene.wgsl`.
pub struct Material {
    /// Bound to texture unit 0.
    pub diffuse: Texture,
    /// Bound to texture unit 1.
    pub specular: Texture,
    bind_group: wgpu::BindGroup,
}

/// Draws the scene object into both color outputs of an [`OffscreenTarget`].
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
}

impl ScenePass {
    /// Builds the scene pipeline.
    ///
    /// Fails with [`RenderError::Validation`](crate::RenderError::Validation) if the
    /// WGSL module or the pipeline does not validate.
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        gpu.validated("scene", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
            });

            // Uniform buffer (group 0)
            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Scene Uniforms"),
                size: std::mem::size_of::<SceneUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

            let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Uniform Bind Group"),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

            // Material textures (group 1)
            let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            };
            let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Material Bind Group Layout"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout, &material_layout],
                push_constant_ranges: &[],
            });

            let color_target = Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Scene Pipeline"),
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
                    targets: &[color_target.clone(), color_target],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            Self {
                pipeline,
                uniform_buffer,
                uniform_bind_group,
                material_layout,
            }
        })
    }

    /// Binds a diffuse and a specular texture as the scene material.
    ///
    /// Both textures are sampled through the diffuse texture's sampler.
    pub fn create_material(&self, gpu: &GpuContext, diffuse: Texture, specular: Texture) -> Material {
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Material Bind Group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
                },
            ],
        });

        Material {
            diffuse,
            specular,
            bind_group,
        }
    }

    /// Uploads this frame's matrices and light intensity.
    pub fn update(&self, gpu: &GpuContext, uniforms: &SceneUniforms) {
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Clears the target and draws `object` from the shared vertex buffer into it.
    ///
    /// The viewport covers the whole target.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &OffscreenTarget,
        material: &Material,
        vertices: &VertexBuffer,
        object: DrawRange,
    ) {
        debug_assert!(vertices.contains(object));
        let size = target.size();
        let mut render_pass = target.begin_pass(encoder, wgpu::Color::BLACK);

        render_pass.set_viewport(0.0, 0.0, size.width as f32, size.height as f32, 0.0, 1.0);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &material.bind_group, &[]);
        render_pass.set_vertex_buffer(0, vertices.slice());
        render_pass.draw(object.range(), 0..1);
    }
}
