//! Geometry loading for the scene object.
//!
//! Models are read into a [`RawGeometry`], adjusted on the CPU (centering, scaling,
//! reorienting) and then appended to the shared vertex list through
//! [`MeshBuilder::push_geometry`](crate::mesh::MeshBuilder::push_geometry).
//!
//! ```no_run
//! use postfx::{GeometryLoader, MeshBuilder};
//!
//! let model = GeometryLoader::from_file("media/inn.stl")
//!     .centered()
//!     .normalized()
//!     .load()
//!     .unwrap();
//!
//! let mut builder = MeshBuilder::new();
//! let object = builder.push_geometry(&model);
//! ```
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | STL    | `.stl`     | Binary and ASCII; UVs are box-projected from face normals |

use crate::mesh::Vertex;
use glam::Vec3;
use std::path::Path;

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File format could not be determined from extension.
    #[error("Unknown geometry format: '{0}'")]
    UnknownFormat(String),
    /// The geometry data was invalid or corrupt.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Indexed geometry before it is appended to the shared vertex list.
#[derive(Clone, Debug)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners of the bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the center point of the geometry.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Returns the size of the bounding box.
    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    /// Scales all vertices uniformly around the origin.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Centers the geometry at the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Scales the geometry to fit within a unit cube (-0.5 to 0.5).
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            self.scale(1.0 / max_dim);
        }
    }
}

/// A fluent loader that reads a model and queues CPU-side adjustments.
///
/// Adjustments are applied by [`load`](Self::load) in a fixed order:
/// center, normalize, scale.
#[derive(Clone, Debug)]
pub struct GeometryLoader {
    result: Result<RawGeometry, String>,
    center: bool,
    normalize: bool,
    scale_factor: Option<f32>,
}

impl GeometryLoader {
    /// Loads a model file, detecting the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self::with_result(Self::load_file(path.as_ref()).map_err(|e| e.to_string()))
    }

    /// Loads STL geometry from bytes, e.g. an `include_bytes!` asset.
    pub fn from_stl_bytes(bytes: &[u8]) -> Self {
        Self::with_result(Self::parse_stl_bytes(bytes).map_err(|e| e.to_string()))
    }

    /// Wraps geometry that was built in memory.
    pub fn from_raw(geometry: RawGeometry) -> Self {
        Self::with_result(Ok(geometry))
    }

    fn with_result(result: Result<RawGeometry, String>) -> Self {
        Self {
            result,
            center: false,
            normalize: false,
            scale_factor: None,
        }
    }

    /// Centers the geometry at the origin.
    pub fn centered(mut self) -> Self {
        self.center = true;
        self
    }

    /// Scales the geometry to fit within a unit cube.
    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn scaled(mut self, factor: f32) -> Self {
        self.scale_factor = Some(factor);
        self
    }

    /// Applies the queued adjustments and returns the geometry.
    pub fn load(self) -> Result<RawGeometry, GeometryError> {
        let mut geometry = self.result.map_err(GeometryError::ParseError)?;

        if self.center {
            geometry.recenter();
        }

        if self.normalize {
            geometry.normalize();
        }

        if let Some(scale) = self.scale_factor {
            geometry.scale(scale);
        }

        Ok(geometry)
    }

    fn load_file(path: &Path) -> Result<RawGeometry, GeometryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "stl" => {
                let file = std::fs::File::open(path)?;
                let mut reader = std::io::BufReader::new(file);
                Self::parse_stl(&mut reader)
            }
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }

    fn parse_stl<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
    ) -> Result<RawGeometry, GeometryError> {
        let stl = stl_io::read_stl(reader)
            .map_err(|e| GeometryError::ParseError(format!("STL parse error: {}", e)))?;

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for vertex in &stl.vertices {
            let p: [f32; 3] = (*vertex).into();
            let p = Vec3::from(p);
            min = min.min(p);
            max = max.max(p);
        }
        let extent = (max - min).max(Vec3::splat(f32::EPSILON));

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        // Faces are emitted unshared so each keeps the projection of its own normal.
        for (i, face) in stl.faces.iter().enumerate() {
            let normal: [f32; 3] = face.normal.into();
            let normal = Vec3::from(normal);
            for &vertex_idx in &face.vertices {
                let position: [f32; 3] = stl.vertices[vertex_idx].into();
                let position = Vec3::from(position);
                let uv = box_uv((position - min) / extent, normal);
                vertices.push(Vertex::new(position.into(), uv));
            }

            let base = (i * 3) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Ok(RawGeometry::new(vertices, indices))
    }

    fn parse_stl_bytes(bytes: &[u8]) -> Result<RawGeometry, GeometryError> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::parse_stl(&mut cursor)
    }
}

/// Projects a point in the unit bounding box onto the plane facing `normal`.
fn box_uv(unit: Vec3, normal: Vec3) -> [f32; 2] {
    let n = normal.abs();
    if n.x >= n.y && n.x >= n.z {
        [unit.z, 1.0 - unit.y]
    } else if n.y >= n.z {
        [unit.x, unit.z]
    } else {
        [unit.x, 1.0 - unit.y]
    }
}
