//! Keyboard bindings that edit [`EffectParameters`] while the demo runs.
//!
//! | Key              | Effect                                  |
//! |------------------|-----------------------------------------|
//! | Tab              | show the base or the final image        |
//! | 1 / 2 / 3        | toggle invert / grayscale / kernel      |
//! | Up / Down        | raise / lower light intensity (clamped) |
//! | Q / E            | lower / raise the invert coefficient    |
//! | Z / X            | lower / raise the grayscale coefficient |
//! | `[` / `]`        | lower / raise the kernel coefficient    |
//! | `-` / `=`        | lower / raise the kernel intensity      |
//! | K                | next kernel preset                      |
//! | Left / Right     | select the previous / next kernel entry |
//! | `,` / `.`        | lower / raise the selected kernel entry |
//! | Backspace        | restore defaults                        |
//!
//! Held keys change values at a fixed rate per second. Kernel entries are numbered
//! row by row from the top-left, starting at the center entry. Every change is
//! logged at `debug` level.

use winit::keyboard::KeyCode;

use crate::effect_params::{EffectParameters, KernelPreset};
use crate::input::Input;

/// Maps keyboard input onto effect parameters.
#[derive(Clone, Debug)]
pub struct EffectControls {
    /// Light intensity units per second while Up/Down is held.
    pub light_rate: f32,
    /// Coefficient units per second while an adjustment key is held.
    pub coef_rate: f32,
    preset: KernelPreset,
    entry: usize,
}

const CENTER_ENTRY: usize = 4;

impl Default for EffectControls {
    fn default() -> Self {
        Self {
            light_rate: 10.0,
            coef_rate: 1.0,
            preset: KernelPreset::Identity,
            entry: CENTER_ENTRY,
        }
    }
}

impl EffectControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// The kernel preset most recently selected with K.
    pub fn preset(&self) -> KernelPreset {
        self.preset
    }

    /// Row and column of the kernel entry that `,` and `.` adjust.
    pub fn selected_entry(&self) -> (usize, usize) {
        (self.entry / 3, self.entry % 3)
    }

    /// Applies this frame's key presses and held keys to `params`.
    pub fn apply(&mut self, input: &Input, dt: f32, params: &mut EffectParameters) {
        if input.key_pressed(KeyCode::Backspace) {
            *params = EffectParameters::default();
            self.preset = KernelPreset::Identity;
            self.entry = CENTER_ENTRY;
            log::debug!("effect parameters reset");
            return;
        }

        if input.key_pressed(KeyCode::Tab) {
            params.source = params.source.toggled();
            log::debug!("showing {:?} image", params.source);
        }
        toggle(input, KeyCode::Digit1, "invert", &mut params.inverted);
        toggle(input, KeyCode::Digit2, "grayscale", &mut params.grayscale);
        toggle(input, KeyCode::Digit3, "kernel", &mut params.kernel_effect);

        if input.key_pressed(KeyCode::KeyK) {
            self.preset = self.preset.next();
            params.kernel = self.preset.rows();
            log::debug!("kernel preset: {}", self.preset.name());
        }

        if input.key_pressed(KeyCode::ArrowRight) {
            self.entry = (self.entry + 1) % 9;
            log::debug!("kernel entry {:?} selected", self.selected_entry());
        }
        if input.key_pressed(KeyCode::ArrowLeft) {
            self.entry = (self.entry + 8) % 9;
            log::debug!("kernel entry {:?} selected", self.selected_entry());
        }

        let light = axis(input, KeyCode::ArrowUp, KeyCode::ArrowDown);
        if light != 0.0 {
            params.set_light_intensity(params.light_intensity + light * self.light_rate * dt);
            log::debug!("light intensity: {:.2}", params.light_intensity);
        }

        let step = self.coef_rate * dt;
        adjust(input, KeyCode::KeyE, KeyCode::KeyQ, step, "inverse_coef", &mut params.inverse_coef);
        adjust(input, KeyCode::KeyX, KeyCode::KeyZ, step, "grayscale_coef", &mut params.grayscale_coef);
        adjust(input, KeyCode::BracketRight, KeyCode::BracketLeft, step, "kernel_coef", &mut params.kernel_coef);
        adjust(input, KeyCode::Equal, KeyCode::Minus, step, "kernel_intensity", &mut params.kernel_intensity);

        let (row, column) = self.selected_entry();
        adjust(input, KeyCode::Period, KeyCode::Comma, step, "kernel entry", &mut params.kernel[row][column]);
    }
}

fn toggle(input: &Input, key: KeyCode, name: &str, flag: &mut bool) {
    if input.key_pressed(key) {
        *flag = !*flag;
        log::debug!("{name}: {}", if *flag { "on" } else { "off" });
    }
}

fn axis(input: &Input, positive: KeyCode, negative: KeyCode) -> f32 {
    input.key_down(positive) as i32 as f32 - input.key_down(negative) as i32 as f32
}

// Coefficients are deliberately left unclamped.
fn adjust(input: &Input, up: KeyCode, down: KeyCode, step: f32, name: &str, value: &mut f32) {
    let direction = axis(input, up, down);
    if direction != 0.0 {
        *value += direction * step;
        log::debug!("{name}: {value:.3}");
    }
}
