//! The offscreen render target written by the scene pass and sampled by the post-process pass.
//!
//! An [`OffscreenTarget`] bundles three attachments that always share one size:
//!
//! - **base** (color output 0): the combined lit image
//! - **final** (color output 1): the specular-only image
//! - **depth**: the depth buffer used while drawing the scene
//!
//! The attachments are created, resized and released together. A resize keeps the
//! `OffscreenTarget` value itself and swaps all three attachments for new storage in
//! lockstep; [`OffscreenTarget::generation`] changes every time that happens so that
//! anything holding views of the old textures (bind groups, previews) knows to rebuild.
//!
//! Attachment storage is obtained through the [`AttachmentAllocator`] trait. The
//! production implementation is `wgpu::Device`; tests substitute a tracking allocator.

use crate::effect_params::SourceImage;
use crate::error::{RenderError, Result};

/// Color format of both color outputs: four 8-bit normalized channels.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Pixel dimensions of a render target or of the presentation surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Converts a floating-point surface size by truncation, the way the window
    /// layer reports it. Negative or NaN components become zero.
    pub fn from_surface(size: glam::Vec2) -> Self {
        Self {
            width: size.x.max(0.0) as u32,
            height: size.y.max(0.0) as u32,
        }
    }

    /// True when either dimension is zero (e.g. a minimized window).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub(crate) fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Allocates storage for offscreen attachments.
pub trait AttachmentAllocator {
    /// Handle to a color attachment.
    type Color;
    /// Handle to a depth attachment.
    type Depth;

    /// Largest width or height an attachment may have.
    fn max_dimension(&self) -> u32;

    fn color_attachment(&self, label: &str, size: TargetSize) -> Self::Color;

    fn depth_attachment(&self, label: &str, size: TargetSize) -> Self::Depth;
}

/// A GPU texture together with the default view used to render into and sample it.
#[derive(Debug)]
pub struct Attachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl AttachmentAllocator for wgpu::Device {
    type Color = Attachment;
    type Depth = Attachment;

    fn max_dimension(&self) -> u32 {
        self.limits().max_texture_dimension_2d
    }

    fn color_attachment(&self, label: &str, size: TargetSize) -> Attachment {
        let texture = self.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Attachment { texture, view }
    }

    fn depth_attachment(&self, label: &str, size: TargetSize) -> Attachment {
        let texture = self.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: size.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Attachment { texture, view }
    }
}

/// Two color outputs and a depth buffer that are always the same size.
///
/// Dropping the target releases all three attachments.
pub struct OffscreenTarget<A: AttachmentAllocator = wgpu::Device> {
    size: TargetSize,
    base: A::Color,
    final_image: A::Color,
    depth: A::Depth,
    generation: u64,
}

impl<A: AttachmentAllocator> OffscreenTarget<A> {
    /// Allocates the base image, final image and depth buffer at `size`.
    ///
    /// Fails with [`RenderError::TargetIncomplete`] when the size cannot back a
    /// render target on this allocator. Nothing is allocated in that case.
    pub fn generate(allocator: &A, size: TargetSize) -> Result<Self> {
        check_complete(allocator, size)?;
        let (base, final_image, depth) = allocate(allocator, size);
        log::info!(
            "offscreen target generated at {}x{}",
            size.width,
            size.height
        );

        Ok(Self {
            size,
            base,
            final_image,
            depth,
            generation: 0,
        })
    }

    /// Reallocates all three attachments at `size`.
    ///
    /// Returns `Ok(false)` without touching anything when `size` already matches.
    /// On error the target keeps its previous attachments. Contents are not
    /// preserved across a reallocation.
    pub fn resize(&mut self, allocator: &A, size: TargetSize) -> Result<bool> {
        if size == self.size {
            return Ok(false);
        }
        check_complete(allocator, size)?;

        let (base, final_image, depth) = allocate(allocator, size);
        self.base = base;
        self.final_image = final_image;
        self.depth = depth;
        self.size = size;
        self.generation += 1;

        log::info!(
            "offscreen target resized to {}x{} (generation {})",
            size.width,
            size.height,
            self.generation
        );
        Ok(true)
    }

    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// Incremented by every reallocating [`resize`](Self::resize).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Color output 0: diffuse plus scaled specular.
    pub fn base(&self) -> &A::Color {
        &self.base
    }

    /// Color output 1: scaled specular only.
    pub fn final_image(&self) -> &A::Color {
        &self.final_image
    }

    pub fn depth(&self) -> &A::Depth {
        &self.depth
    }

    /// The color output selected by `source`.
    pub fn image(&self, source: SourceImage) -> &A::Color {
        match source {
            SourceImage::Base => &self.base,
            SourceImage::Final => &self.final_image,
        }
    }
}

impl OffscreenTarget<wgpu::Device> {
    /// Begins a render pass writing both color outputs and the depth buffer.
    ///
    /// Color outputs are cleared to `clear` and depth to 1.0.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Scene Pass"),
            color_attachments: &[
                clear_color(&self.base.view, clear),
                clear_color(&self.final_image.view, clear),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }
}

impl<A: AttachmentAllocator> Drop for OffscreenTarget<A> {
    fn drop(&mut self) {
        log::info!(
            "offscreen target {}x{} released",
            self.size.width,
            self.size.height
        );
    }
}

fn clear_color(
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(clear),
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

fn check_complete<A: AttachmentAllocator>(allocator: &A, size: TargetSize) -> Result<()> {
    let incomplete = |reason: String| RenderError::TargetIncomplete {
        width: size.width,
        height: size.height,
        reason,
    };

    if size.is_empty() {
        return Err(incomplete("zero-sized attachment".into()));
    }
    let max = allocator.max_dimension();
    if size.width > max || size.height > max {
        return Err(incomplete(format!("exceeds the {max} texel device limit")));
    }
    Ok(())
}

fn allocate<A: AttachmentAllocator>(
    allocator: &A,
    size: TargetSize,
) -> (A::Color, A::Color, A::Depth) {
    (
        allocator.color_attachment("Offscreen Base Color", size),
        allocator.color_attachment("Offscreen Final Color", size),
        allocator.depth_attachment("Offscreen Depth", size),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts live attachments; each handle decrements the count when dropped.
    pub(crate) struct TrackingAllocator {
        pub live: Rc<Cell<usize>>,
        pub allocations: Cell<usize>,
        pub max: u32,
    }

    #[derive(Debug)]
    pub(crate) struct Tracked {
        pub size: TargetSize,
        pub kind: &'static str,
        live: Rc<Cell<usize>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    impl TrackingAllocator {
        pub fn new() -> Self {
            Self {
                live: Rc::new(Cell::new(0)),
                allocations: Cell::new(0),
                max: 8192,
            }
        }

        fn track(&self, kind: &'static str, size: TargetSize) -> Tracked {
            self.live.set(self.live.get() + 1);
            self.allocations.set(self.allocations.get() + 1);
            Tracked {
                size,
                kind,
                live: self.live.clone(),
            }
        }
    }

    impl AttachmentAllocator for TrackingAllocator {
        type Color = Tracked;
        type Depth = Tracked;

        fn max_dimension(&self) -> u32 {
            self.max
        }

        fn color_attachment(&self, _label: &str, size: TargetSize) -> Tracked {
            self.track("color", size)
        }

        fn depth_attachment(&self, _label: &str, size: TargetSize) -> Tracked {
            self.track("depth", size)
        }
    }

    fn assert_sizes(target: &OffscreenTarget<TrackingAllocator>, size: TargetSize) {
        assert_eq!(target.size(), size);
        assert_eq!(target.base().size, size);
        assert_eq!(target.final_image().size, size);
        assert_eq!(target.depth().size, size);
    }

    #[test]
    fn generate_allocates_three_matching_attachments() {
        let alloc = TrackingAllocator::new();
        let size = TargetSize::new(640, 480);
        let target = OffscreenTarget::generate(&alloc, size).unwrap();

        assert_eq!(alloc.live.get(), 3);
        assert_sizes(&target, size);
        assert_eq!(target.base().kind, "color");
        assert_eq!(target.final_image().kind, "color");
        assert_eq!(target.depth().kind, "depth");
        assert_eq!(target.generation(), 0);
    }

    #[test]
    fn drop_releases_everything() {
        let alloc = TrackingAllocator::new();
        let target = OffscreenTarget::generate(&alloc, TargetSize::new(32, 32)).unwrap();
        drop(target);
        assert_eq!(alloc.live.get(), 0);
    }

    #[test]
    fn resize_to_current_size_is_a_no_op() {
        let alloc = TrackingAllocator::new();
        let size = TargetSize::new(800, 600);
        let mut target = OffscreenTarget::generate(&alloc, size).unwrap();

        assert!(!target.resize(&alloc, size).unwrap());
        assert_eq!(alloc.allocations.get(), 3);
        assert_eq!(target.generation(), 0);
        assert_sizes(&target, size);
    }

    #[test]
    fn resize_round_trips_dimensions() {
        let alloc = TrackingAllocator::new();
        let original = TargetSize::new(800, 600);
        let mut target = OffscreenTarget::generate(&alloc, original).unwrap();

        for i in 1..=5 {
            let size = TargetSize::new(100 * i, 50 * i);
            assert!(target.resize(&alloc, size).unwrap());
            assert_sizes(&target, size);
            assert_eq!(alloc.live.get(), 3);
        }
        assert!(target.resize(&alloc, original).unwrap());

        assert_sizes(&target, original);
        assert_eq!(target.generation(), 6);
        assert_eq!(alloc.allocations.get(), 3 * 7);
        assert_eq!(alloc.live.get(), 3);
    }

    #[test]
    fn zero_size_is_incomplete() {
        let alloc = TrackingAllocator::new();
        let err = OffscreenTarget::generate(&alloc, TargetSize::new(0, 600))
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::TargetIncomplete { width: 0, .. }));
        assert_eq!(alloc.allocations.get(), 0);
    }

    #[test]
    fn oversized_resize_keeps_previous_attachments() {
        let alloc = TrackingAllocator::new();
        let size = TargetSize::new(256, 256);
        let mut target = OffscreenTarget::generate(&alloc, size).unwrap();

        let result = target.resize(&alloc, TargetSize::new(alloc.max + 1, 16));
        assert!(matches!(result, Err(RenderError::TargetIncomplete { .. })));
        assert_sizes(&target, size);
        assert_eq!(target.generation(), 0);
        assert_eq!(alloc.live.get(), 3);
    }

    #[test]
    fn image_selects_output() {
        let alloc = TrackingAllocator::new();
        let target = OffscreenTarget::generate(&alloc, TargetSize::new(4, 4)).unwrap();
        assert!(std::ptr::eq(target.image(SourceImage::Base), target.base()));
        assert!(std::ptr::eq(
            target.image(SourceImage::Final),
            target.final_image()
        ));
    }

    #[test]
    fn surface_size_truncates() {
        let size = TargetSize::from_surface(glam::Vec2::new(1279.9, 720.2));
        assert_eq!(size, TargetSize::new(1279, 720));
        assert!(TargetSize::from_surface(glam::Vec2::new(-3.0, 10.0)).is_empty());
    }
}
