//! The mutable parameter block that drives both passes every frame.

use std::ops::RangeInclusive;

/// Range the light intensity control is clamped to. The shader itself accepts any value.
pub const LIGHT_INTENSITY_RANGE: RangeInclusive<f32> = -10.0..=30.0;

/// Which offscreen color output the post-process pass samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceImage {
    /// Output 0: diffuse plus scaled specular.
    #[default]
    Base,
    /// Output 1: scaled specular only.
    Final,
}

impl SourceImage {
    pub fn toggled(self) -> Self {
        match self {
            SourceImage::Base => SourceImage::Final,
            SourceImage::Final => SourceImage::Base,
        }
    }
}

/// Named 3x3 convolution kernels, rows listed top to bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelPreset {
    Identity,
    Sharpen,
    EdgeDetect,
    BoxBlur,
    Emboss,
}

impl KernelPreset {
    pub const ALL: [KernelPreset; 5] = [
        KernelPreset::Identity,
        KernelPreset::Sharpen,
        KernelPreset::EdgeDetect,
        KernelPreset::BoxBlur,
        KernelPreset::Emboss,
    ];

    #[rustfmt::skip]
    pub fn rows(self) -> [[f32; 3]; 3] {
        const NINTH: f32 = 1.0 / 9.0;
        match self {
            KernelPreset::Identity => [
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
            KernelPreset::Sharpen => [
                [-1.0, -1.0, -1.0],
                [-1.0,  9.0, -1.0],
                [-1.0, -1.0, -1.0],
            ],
            KernelPreset::EdgeDetect => [
                [1.0,  1.0, 1.0],
                [1.0, -8.0, 1.0],
                [1.0,  1.0, 1.0],
            ],
            KernelPreset::BoxBlur => [[NINTH; 3]; 3],
            KernelPreset::Emboss => [
                [-2.0, -1.0, 0.0],
                [-1.0,  1.0, 1.0],
                [ 0.0,  1.0, 2.0],
            ],
        }
    }

    /// The preset after this one, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            KernelPreset::Identity => "identity",
            KernelPreset::Sharpen => "sharpen",
            KernelPreset::EdgeDetect => "edge detect",
            KernelPreset::BoxBlur => "box blur",
            KernelPreset::Emboss => "emboss",
        }
    }
}

/// Per-frame configuration of the scene lighting and the post-process chain.
///
/// Numeric fields are accepted as-is; only [`set_light_intensity`](Self::set_light_intensity)
/// applies the control range.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectParameters {
    /// Multiplier applied to the specular texture in the scene pass.
    pub light_intensity: f32,
    /// Offscreen output shown on screen.
    pub source: SourceImage,
    pub inverted: bool,
    pub inverse_coef: f32,
    pub grayscale: bool,
    pub grayscale_coef: f32,
    pub kernel_effect: bool,
    /// Uniform factor applied to all nine kernel entries before upload.
    pub kernel_coef: f32,
    pub kernel_intensity: f32,
    /// Convolution weights, row-major with row 0 at the top of the image.
    pub kernel: [[f32; 3]; 3],
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            light_intensity: 0.0,
            source: SourceImage::Base,
            inverted: false,
            inverse_coef: 1.0,
            grayscale: false,
            grayscale_coef: 1.0,
            kernel_effect: false,
            kernel_coef: 1.0,
            kernel_intensity: 1.0,
            kernel: KernelPreset::Identity.rows(),
        }
    }
}

impl EffectParameters {
    /// Sets the light intensity, clamped to [`LIGHT_INTENSITY_RANGE`].
    pub fn set_light_intensity(&mut self, value: f32) {
        self.light_intensity = value.clamp(
            *LIGHT_INTENSITY_RANGE.start(),
            *LIGHT_INTENSITY_RANGE.end(),
        );
    }

    /// Kernel rows with every entry multiplied by `kernel_coef`.
    pub fn scaled_kernel(&self) -> [[f32; 3]; 3] {
        self.kernel
            .map(|row| row.map(|weight| weight * self.kernel_coef))
    }

    /// Packs the post-process parameters into the shader's uniform block.
    pub fn to_uniforms(&self) -> PostProcessUniforms {
        let kernel = self.scaled_kernel().map(|[a, b, c]| [a, b, c, 0.0]);
        PostProcessUniforms {
            inverted: self.inverted as u32,
            inverse_coef: self.inverse_coef,
            grayscale: self.grayscale as u32,
            grayscale_coef: self.grayscale_coef,
            kernel_effect: self.kernel_effect as u32,
            kernel_intensity: self.kernel_intensity,
            pad0: 0.0,
            pad1: 0.0,
            kernel,
        }
    }
}

/// Uniform block read by `post_process.wgsl`.
///
/// Flags are `0` or `1`. Each kernel row occupies a 16-byte slot, as uniform
/// array elements must.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PostProcessUniforms {
    pub inverted: u32,
    pub inverse_coef: f32,
    pub grayscale: u32,
    pub grayscale_coef: f32,
    pub kernel_effect: u32,
    pub kernel_intensity: f32,
    pub pad0: f32,
    pub pad1: f32,
    pub kernel: [[f32; 4]; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_show_unmodified_base_image() {
        let params = EffectParameters::default();
        assert_eq!(params.source, SourceImage::Base);
        assert!(!params.inverted && !params.grayscale && !params.kernel_effect);
        assert_eq!(params.kernel, KernelPreset::Identity.rows());
        assert_eq!(params.light_intensity, 0.0);
    }

    #[test]
    fn light_intensity_is_clamped_to_control_range() {
        let mut params = EffectParameters::default();
        params.set_light_intensity(45.0);
        assert_eq!(params.light_intensity, 30.0);
        params.set_light_intensity(-12.5);
        assert_eq!(params.light_intensity, -10.0);
        params.set_light_intensity(3.25);
        assert_eq!(params.light_intensity, 3.25);
    }

    #[test]
    fn kernel_is_prescaled_by_coefficient() {
        let params = EffectParameters {
            kernel: KernelPreset::EdgeDetect.rows(),
            kernel_coef: 0.5,
            ..Default::default()
        };
        let scaled = params.scaled_kernel();
        assert_eq!(scaled[0], [0.5, 0.5, 0.5]);
        assert_eq!(scaled[1], [0.5, -4.0, 0.5]);

        let uniforms = params.to_uniforms();
        assert_eq!(uniforms.kernel[1], [0.5, -4.0, 0.5, 0.0]);
    }

    #[test]
    fn uniform_block_layout() {
        assert_eq!(std::mem::size_of::<PostProcessUniforms>(), 80);

        let params = EffectParameters {
            inverted: true,
            inverse_coef: 2.0,
            kernel_effect: true,
            kernel_intensity: 0.25,
            ..Default::default()
        };
        let uniforms = params.to_uniforms();
        assert_eq!(uniforms.inverted, 1);
        assert_eq!(uniforms.grayscale, 0);
        assert_eq!(uniforms.kernel_effect, 1);

        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniforms));
        assert_eq!(words[1], 2.0);
        assert_eq!(words[5], 0.25);
        // Row 1 starts at byte 48; its center weight is the identity's 1.0.
        assert_eq!(words[12 + 1], 1.0);
    }

    #[test]
    fn presets_cycle_through_all() {
        let mut preset = KernelPreset::Identity;
        for _ in 0..KernelPreset::ALL.len() {
            preset = preset.next();
        }
        assert_eq!(preset, KernelPreset::Identity);
        assert_eq!(KernelPreset::Identity.next(), KernelPreset::Sharpen);
    }

    #[test]
    fn source_toggle() {
        assert_eq!(SourceImage::Base.toggled(), SourceImage::Final);
        assert_eq!(SourceImage::Final.toggled(), SourceImage::Base);
    }
}
