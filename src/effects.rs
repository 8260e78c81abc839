//! CPU evaluation of the two fragment stages.
//!
//! These functions follow `scene.wgsl` and `post_process.wgsl` statement by statement,
//! so they can be used to predict what a pixel will look like for a given parameter
//! block, and to check readbacks against.
//!
//! Texture coordinates use the wgpu convention: `(0, 0)` is the top-left corner of
//! the image and `v` grows downward.

use glam::{Vec2, Vec3, Vec4};

use crate::effect_params::PostProcessUniforms;

/// Distance between kernel taps in texture coordinates.
pub const KERNEL_OFFSET: f32 = 1.0 / 300.0;

/// Rec. 709 luma weights.
pub const LUMA_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Tap offsets of the 3x3 neighborhood, row-major from top-left to bottom-right.
pub fn kernel_offsets() -> [Vec2; 9] {
    let o = KERNEL_OFFSET;
    [
        Vec2::new(-o, -o),
        Vec2::new(0.0, -o),
        Vec2::new(o, -o),
        Vec2::new(-o, 0.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(o, 0.0),
        Vec2::new(-o, o),
        Vec2::new(0.0, o),
        Vec2::new(o, o),
    ]
}

pub fn luma(color: Vec4) -> f32 {
    color.truncate().dot(LUMA_WEIGHTS)
}

/// Both scene pass outputs for one fragment: `(combined, specular_only)`.
pub fn scene_outputs(diffuse: Vec3, specular: Vec3, light_intensity: f32) -> (Vec4, Vec4) {
    let lit = specular * light_intensity;
    ((diffuse + lit).extend(1.0), lit.extend(1.0))
}

/// Post-process output for the fragment at `uv`, reading the source image through `sample`.
///
/// Each enabled step multiplies onto the running color. The invert term is
/// `flag - source` with the flag as a float, and grayscale and the kernel both read
/// the untouched source image rather than the running color.
pub fn post_process(sample: impl Fn(Vec2) -> Vec4, uv: Vec2, u: &PostProcessUniforms) -> Vec4 {
    let mut frag = sample(uv);

    if u.inverted == 1 {
        let inverse = Vec3::splat(u.inverted as f32) - sample(uv).truncate();
        frag *= inverse.extend(1.0) * u.inverse_coef;
    }

    if u.grayscale == 1 {
        let l = luma(sample(uv));
        frag *= Vec4::new(l, l, l, 1.0) * u.grayscale_coef;
    }

    if u.kernel_effect == 1 {
        let offsets = kernel_offsets();
        let mut col = Vec3::ZERO;
        for row in 0..3 {
            for column in 0..3 {
                let tap = sample(uv + offsets[row * 3 + column]).truncate();
                col += tap * u.kernel[row][column];
            }
        }
        frag *= col.extend(1.0) * u.kernel_intensity;
    }

    frag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect_params::{EffectParameters, KernelPreset};

    fn approx(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    fn solid(color: Vec4) -> impl Fn(Vec2) -> Vec4 {
        move |_| color
    }

    /// A horizontal and vertical ramp: red follows u, green follows v.
    fn gradient(uv: Vec2) -> Vec4 {
        Vec4::new(uv.x, uv.y, 0.5, 1.0)
    }

    #[test]
    fn scene_outputs_differ_by_diffuse() {
        let diffuse = Vec3::new(0.2, 0.4, 0.1);
        let specular = Vec3::new(0.05, 0.1, 0.3);
        for intensity in [-10.0, 0.0, 1.5, 30.0] {
            let (combined, lit) = scene_outputs(diffuse, specular, intensity);
            assert!(approx(lit, (specular * intensity).extend(1.0)));
            assert!(approx(combined, lit + diffuse.extend(0.0)));
        }
    }

    #[test]
    fn disabled_chain_passes_source_through() {
        let u = EffectParameters {
            inverse_coef: 7.0,
            grayscale_coef: 0.0,
            kernel_intensity: 0.0,
            kernel: KernelPreset::Emboss.rows(),
            ..Default::default()
        }
        .to_uniforms();

        for uv in [Vec2::ZERO, Vec2::new(0.3, 0.7), Vec2::ONE] {
            assert_eq!(post_process(gradient, uv, &u), gradient(uv));
        }
    }

    #[test]
    fn invert_multiplies_flag_minus_source() {
        let u = EffectParameters {
            inverted: true,
            inverse_coef: 2.0,
            ..Default::default()
        }
        .to_uniforms();

        let source = Vec4::new(0.25, 0.5, 0.75, 1.0);
        let out = post_process(solid(source), Vec2::splat(0.5), &u);
        // (0.25, 0.5, 0.75, 1) * (0.75, 0.5, 0.25, 1) * 2
        assert!(approx(out, Vec4::new(0.375, 0.5, 0.375, 2.0)));
    }

    #[test]
    fn invert_of_black_has_unit_term_on_black() {
        let u = EffectParameters {
            inverted: true,
            ..Default::default()
        }
        .to_uniforms();

        let black = Vec4::new(0.0, 0.0, 0.0, 1.0);
        let out = post_process(solid(black), Vec2::splat(0.5), &u);
        // The invert term is (1, 1, 1, 1); it is multiplied onto the black running color.
        assert!(approx(out, black));
    }

    #[test]
    fn grayscale_of_pure_red() {
        let u = EffectParameters {
            grayscale: true,
            ..Default::default()
        }
        .to_uniforms();

        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let out = post_process(solid(red), Vec2::splat(0.5), &u);
        assert!(approx(out, Vec4::new(0.2126, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn grayscale_reads_source_not_inverted_color() {
        let u = EffectParameters {
            inverted: true,
            grayscale: true,
            grayscale_coef: 0.5,
            ..Default::default()
        }
        .to_uniforms();

        let c = Vec4::new(0.2, 0.6, 0.4, 1.0);
        let out = post_process(solid(c), Vec2::ZERO, &u);

        let inverted = c * Vec4::new(0.8, 0.4, 0.6, 1.0);
        let l = luma(c);
        let expected = inverted * Vec4::new(l, l, l, 1.0) * 0.5;
        assert!(approx(out, expected));
    }

    #[test]
    fn kernel_with_zero_intensity_is_black() {
        for preset in KernelPreset::ALL {
            let u = EffectParameters {
                kernel_effect: true,
                kernel_intensity: 0.0,
                kernel_coef: 3.0,
                kernel: preset.rows(),
                ..Default::default()
            }
            .to_uniforms();

            assert_eq!(post_process(gradient, Vec2::splat(0.5), &u), Vec4::ZERO);
        }
    }

    #[test]
    fn kernel_rows_run_top_to_bottom() {
        let mut kernel = [[0.0; 3]; 3];
        kernel[0][0] = 1.0;
        let u = EffectParameters {
            kernel_effect: true,
            kernel,
            ..Default::default()
        }
        .to_uniforms();

        let uv = Vec2::new(0.5, 0.5);
        let out = post_process(gradient, uv, &u);
        let tap = gradient(uv + Vec2::new(-KERNEL_OFFSET, -KERNEL_OFFSET));
        let expected = gradient(uv) * tap.truncate().extend(1.0);
        assert!(approx(out, expected));
    }

    #[test]
    fn identity_kernel_squares_color() {
        let u = EffectParameters {
            kernel_effect: true,
            ..Default::default()
        }
        .to_uniforms();

        let c = Vec4::new(0.5, 0.25, 1.0, 1.0);
        let out = post_process(solid(c), Vec2::splat(0.1), &u);
        assert!(approx(out, Vec4::new(0.25, 0.0625, 1.0, 1.0)));
    }

    #[test]
    fn kernel_coefficient_scales_weights() {
        let c = Vec4::new(0.4, 0.4, 0.4, 1.0);
        let scaled = EffectParameters {
            kernel_effect: true,
            kernel: KernelPreset::BoxBlur.rows(),
            kernel_coef: 2.0,
            ..Default::default()
        }
        .to_uniforms();

        // A box blur of a flat image is the image itself; the coefficient doubles it.
        let out = post_process(solid(c), Vec2::splat(0.5), &scaled);
        assert!(approx(out, c * Vec4::new(0.8, 0.8, 0.8, 1.0)));
    }
}
