//! Vertex format, draw ranges and the shared vertex buffer.
//!
//! Both passes read from one vertex buffer. Each drawable (the full-screen quad, the
//! scene object) is a [`DrawRange`] into it, produced once by [`MeshBuilder`]:
//!
//! ```ignore
//! let mut builder = MeshBuilder::new();
//! let quad = builder.gen_quad(1.0, 1.0);
//! let object = builder.push_geometry(&GeometryLoader::from_file("inn.stl").centered().load()?);
//! let vertices = builder.upload(&gpu);
//!
//! render_pass.set_vertex_buffer(0, vertices.slice());
//! render_pass.draw(object.range(), 0..1);
//! ```
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | uv        | Float32x2 | 12     | 1               |

use std::ops::Range;

use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;

/// An interleaved position + texture coordinate vertex (20 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    /// Texture coordinates with `(0, 0)` at the top-left of the image.
    pub uv: [f32; 2],
}

impl Vertex {
    /// The wgpu vertex buffer layout shared by every pipeline in the crate.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// A contiguous run of vertices in the shared vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRange {
    pub start: u32,
    pub count: u32,
}

impl DrawRange {
    /// The vertex range to pass to `RenderPass::draw`.
    pub fn range(&self) -> Range<u32> {
        self.start..self.start + self.count
    }
}

/// Accumulates geometry for several drawables into one vertex list.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    vertices: Vec<Vertex>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an axis-aligned quad in the XY plane, centered at the origin and
    /// spanning `±half_width` by `±half_height`, as two triangles.
    ///
    /// `gen_quad(1.0, 1.0)` covers the whole clip space and serves as the
    /// full-screen quad.
    pub fn gen_quad(&mut self, half_width: f32, half_height: f32) -> DrawRange {
        let (w, h) = (half_width, half_height);
        let top_left = Vertex::new([-w, h, 0.0], [0.0, 0.0]);
        let top_right = Vertex::new([w, h, 0.0], [1.0, 0.0]);
        let bottom_left = Vertex::new([-w, -h, 0.0], [0.0, 1.0]);
        let bottom_right = Vertex::new([w, -h, 0.0], [1.0, 1.0]);

        self.push(&[
            bottom_left,
            bottom_right,
            top_right,
            top_right,
            top_left,
            bottom_left,
        ])
    }

    /// Appends a cube of edge length `size` centered at the origin (36 vertices).
    ///
    /// Every face maps the full texture, upright when seen from outside.
    pub fn gen_cube(&mut self, size: f32) -> DrawRange {
        let s = size * 0.5;
        // Corners of each face in counter-clockwise order from bottom-left.
        #[rustfmt::skip]
        let faces: [[[f32; 3]; 4]; 6] = [
            // Front (Z+)
            [[-s, -s,  s], [ s, -s,  s], [ s,  s,  s], [-s,  s,  s]],
            // Back (Z-)
            [[ s, -s, -s], [-s, -s, -s], [-s,  s, -s], [ s,  s, -s]],
            // Top (Y+)
            [[-s,  s,  s], [ s,  s,  s], [ s,  s, -s], [-s,  s, -s]],
            // Bottom (Y-)
            [[-s, -s, -s], [ s, -s, -s], [ s, -s,  s], [-s, -s,  s]],
            // Right (X+)
            [[ s, -s,  s], [ s, -s, -s], [ s,  s, -s], [ s,  s,  s]],
            // Left (X-)
            [[-s, -s, -s], [-s, -s,  s], [-s,  s,  s], [-s,  s, -s]],
        ];
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

        let mut vertices = Vec::with_capacity(36);
        for corners in &faces {
            for i in [0, 1, 2, 2, 3, 0] {
                vertices.push(Vertex::new(corners[i], uvs[i]));
            }
        }
        self.push(&vertices)
    }

    /// Appends indexed geometry, expanding it to a plain triangle list.
    ///
    /// Triangles that reference a vertex outside `geometry.vertices` are skipped
    /// whole, as is a trailing partial triangle.
    pub fn push_geometry(&mut self, geometry: &RawGeometry) -> DrawRange {
        let mut vertices = Vec::with_capacity(geometry.indices.len());
        let mut skipped = 0;
        for triangle in geometry.indices.chunks_exact(3) {
            let corners = [triangle[0], triangle[1], triangle[2]]
                .map(|i| geometry.vertices.get(i as usize).copied());
            match corners {
                [Some(a), Some(b), Some(c)] => vertices.extend([a, b, c]),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("skipped {skipped} triangles with out-of-range indices");
        }
        self.push(&vertices)
    }

    /// Appends raw vertices and returns their range.
    pub fn push(&mut self, vertices: &[Vertex]) -> DrawRange {
        let start = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        DrawRange {
            start,
            count: vertices.len() as u32,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Uploads everything appended so far as one GPU vertex buffer.
    pub fn upload(self, gpu: &GpuContext) -> VertexBuffer {
        use wgpu::util::DeviceExt;

        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Shared Vertex Buffer"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        log::debug!("uploaded {} vertices", self.vertices.len());

        VertexBuffer {
            buffer,
            vertex_count: self.vertices.len() as u32,
        }
    }
}

/// GPU-resident vertex data shared by every [`DrawRange`].
#[derive(Debug)]
pub struct VertexBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl VertexBuffer {
    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }

    /// Whether `range` lies entirely inside this buffer.
    pub fn contains(&self, range: DrawRange) -> bool {
        range.start as u64 + range.count as u64 <= self.vertex_count as u64
    }
}
