//! Thumbnails of both offscreen images in the top-left corner of the surface.

use crate::effect_params::SourceImage;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::mesh::{DrawRange, Vertex, VertexBuffer};
use crate::offscreen_target::{OffscreenTarget, TargetSize};
use crate::post_process::{ImageBindings, create_offscreen_sampler};

/// Edge length of one thumbnail in pixels.
pub const PREVIEW_SIZE: u32 = 256;

/// A pixel rectangle on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where each thumbnail goes: base at the corner, final right next to it.
///
/// Thumbnails are cut to the surface, and left out entirely if they would start
/// past its right edge.
pub fn preview_viewports(surface: TargetSize) -> [(SourceImage, Option<Viewport>); 2] {
    let place = |index: u32| {
        let x = index * PREVIEW_SIZE;
        let width = surface.width.saturating_sub(x).min(PREVIEW_SIZE);
        let height = surface.height.min(PREVIEW_SIZE);
        (width > 0 && height > 0).then_some(Viewport {
            x,
            y: 0,
            width,
            height,
        })
    };
    [
        (SourceImage::Base, place(0)),
        (SourceImage::Final, place(1)),
    ]
}

/// Draws the base and final images as upright thumbnails over the post-processed frame.
pub struct PreviewPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bindings: Option<ImageBindings<wgpu::BindGroup>>,
}

impl PreviewPass {
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        let surface_format = gpu.config.format;
        let sampler = create_offscreen_sampler(gpu, "Preview Sampler");

        gpu.validated("preview", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Preview Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/preview.wgsl").into()),
            });

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Preview Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Preview Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Preview Pipeline"),
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
                bind_group_layout,
                sampler,
                bindings: None,
            }
        })
    }

    /// Draws both thumbnails with the full-screen quad squeezed into each viewport.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        render_pass: &mut wgpu::RenderPass<'_>,
        surface: TargetSize,
        target: &OffscreenTarget,
        vertices: &VertexBuffer,
        quad: DrawRange,
    ) {
        debug_assert!(vertices.contains(quad));
        let (layout, sampler) = (&self.bind_group_layout, &self.sampler);
        let bindings = ImageBindings::refresh(&mut self.bindings, target, |image| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Preview Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&image.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            })
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, vertices.slice());
        for (source, viewport) in preview_viewports(surface) {
            let Some(v) = viewport else { continue };
            render_pass.set_viewport(
                v.x as f32,
                v.y as f32,
                v.width as f32,
                v.height as f32,
                0.0,
                1.0,
            );
            render_pass.set_bind_group(0, bindings.get(source), &[]);
            render_pass.draw(quad.range(), 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_validates() {
        crate::gpu::tests::assert_wgsl_valid("preview.wgsl", include_str!("shaders/preview.wgsl"));
    }

    #[test]
    fn thumbnails_sit_side_by_side() {
        let [(base_source, base), (final_source, last)] =
            preview_viewports(TargetSize::new(1280, 720));
        assert_eq!(base_source, SourceImage::Base);
        assert_eq!(final_source, SourceImage::Final);
        assert_eq!(
            base,
            Some(Viewport {
                x: 0,
                y: 0,
                width: 256,
                height: 256
            })
        );
        assert_eq!(last.map(|v| (v.x, v.width)), Some((256, 256)));
    }

    #[test]
    fn thumbnails_are_cut_to_small_surfaces() {
        let [(_, base), (_, last)] = preview_viewports(TargetSize::new(300, 100));
        assert_eq!(base.map(|v| (v.width, v.height)), Some((256, 100)));
        assert_eq!(last.map(|v| (v.x, v.width, v.height)), Some((256, 44, 100)));

        let [(_, base), (_, last)] = preview_viewports(TargetSize::new(200, 200));
        assert_eq!(base.map(|v| v.width), Some(200));
        assert_eq!(last, None);
    }
}
