use std::path::Path;

use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;

/// A sampled GPU texture used as a material input of the scene pass.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    ///
    /// Data is stored unconverted (`Rgba8Unorm`) and sampled with linear filtering
    /// and repeat addressing. Fails with [`RenderError::TextureSize`] when either
    /// dimension is zero or larger than the device supports.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Result<Self> {
        use wgpu::util::DeviceExt;

        check_dimensions(label, width, height, gpu.device.limits().max_texture_dimension_2d)?;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        log::info!("loaded texture {} ({}x{})", path.display(), width, height);
        Self::from_rgba(gpu, &img, width, height, &path.display().to_string())
    }

    /// Procedural stand-in for a diffuse map: weathered wooden planks.
    pub fn procedural_diffuse(gpu: &GpuContext, size: u32, seed: u32) -> Result<Self> {
        let data = plank_pixels(size, seed);
        Self::from_rgba(gpu, &data, size, size, "Procedural Diffuse Texture")
    }

    /// Procedural stand-in for a specular/emissive map: mostly black with lit panes.
    pub fn procedural_specular(gpu: &GpuContext, size: u32, seed: u32) -> Result<Self> {
        let data = window_pixels(size, seed);
        Self::from_rgba(gpu, &data, size, size, "Procedural Specular Texture")
    }
}

fn check_dimensions(label: &str, width: u32, height: u32, max: u32) -> Result<()> {
    if (1..=max).contains(&width) && (1..=max).contains(&height) {
        Ok(())
    } else {
        Err(RenderError::TextureSize {
            label: label.to_string(),
            width,
            height,
            max,
        })
    }
}

/// RGBA8 pixels of horizontal planks with per-plank tint and per-pixel grain.
pub(crate) fn plank_pixels(size: u32, seed: u32) -> Vec<u8> {
    let mut data = vec![0u8; (size * size * 4) as usize];

    // Wood palette (warm browns)
    let browns: &[[u8; 3]] = &[
        [139, 90, 43],
        [160, 110, 60],
        [120, 80, 40],
        [150, 100, 55],
    ];
    let plank_height = (size / 8).max(1);

    for y in 0..size {
        let plank = y / plank_height;
        let base = browns[(hash(plank, 0, seed) % browns.len() as u32) as usize];
        let seam = y % plank_height == 0;

        for x in 0..size {
            let idx = ((y * size + x) * 4) as usize;
            let grain = ((hash(x, y, seed + 7) % 24) as i32) - 12;
            let darken = if seam { -50 } else { 0 };

            for c in 0..3 {
                data[idx + c] = (base[c] as i32 + grain + darken).clamp(0, 255) as u8;
            }
            data[idx + 3] = 255;
        }
    }

    data
}

/// RGBA8 pixels of a dark wall with a grid of randomly lit warm window panes.
pub(crate) fn window_pixels(size: u32, seed: u32) -> Vec<u8> {
    let mut data = vec![0u8; (size * size * 4) as usize];
    let cell = (size / 4).max(1);
    let margin = cell / 4;

    for y in 0..size {
        for x in 0..size {
            let idx = ((y * size + x) * 4) as usize;
            let (cx, cy) = (x / cell, y / cell);
            let (lx, ly) = (x % cell, y % cell);

            let lit = hash(cx, cy, seed) % 3 != 0;
            let inside = lx >= margin && lx < cell - margin && ly >= margin && ly < cell - margin;

            if lit && inside {
                let flicker = (hash(x, y, seed + 31) % 40) as i32;
                data[idx] = (215 + flicker).min(255) as u8;
                data[idx + 1] = (160 + flicker).min(255) as u8;
                data[idx + 2] = 70;
            }
            data[idx + 3] = 255;
        }
    }

    data
}

/// Simple hash function for procedural generation.
fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::gpu::tests::headless;

    #[test]
    fn dimensions_outside_device_limit_are_rejected() {
        assert!(check_dimensions("ok", 8192, 1, 8192).is_ok());
        assert!(matches!(
            check_dimensions("wide", 16384, 512, 8192),
            Err(RenderError::TextureSize { width: 16384, max: 8192, .. })
        ));
        assert!(check_dimensions("empty", 0, 16, 8192).is_err());
    }

    #[test]
    fn oversized_image_is_an_error_not_a_panic() {
        let Some(gpu) = headless(64, 64) else {
            return;
        };
        let too_wide = gpu.device.limits().max_texture_dimension_2d + 1;
        let data = vec![255u8; too_wide as usize * 4];

        let result = Texture::from_rgba(&gpu, &data, too_wide, 1, "Too Wide");
        assert!(matches!(result, Err(RenderError::TextureSize { .. })));
    }

    #[test]
    fn procedural_pixels_are_opaque_and_sized() {
        for data in [plank_pixels(64, 3), window_pixels(64, 3)] {
            assert_eq!(data.len(), 64 * 64 * 4);
            assert!(data.chunks(4).all(|px| px[3] == 255));
        }
    }

    #[test]
    fn procedural_pixels_are_deterministic() {
        assert_eq!(plank_pixels(32, 11), plank_pixels(32, 11));
        assert_ne!(window_pixels(32, 11), window_pixels(32, 12));
    }

    #[test]
    fn window_frames_stay_dark() {
        let size = 64;
        let data = window_pixels(size, 5);
        // The first row is inside every cell's margin.
        for x in 0..size {
            let idx = (x * 4) as usize;
            assert_eq!(&data[idx..idx + 3], &[0, 0, 0]);
        }
    }
}
