//! Turns escape results into colours.
//!
//! The cycle position of an escaped point is
//! `((n + colorCycleOffset) · colorScale) mod colorIterations`, optionally
//! mirrored so alternate cycles run backwards. The palette is indexed by the
//! whole part of that position, wrapping at the palette size. Gamma
//! correction is always the final step.

use crate::escape::EscapeResult;
use crate::palette::{Palette, Rgb};
use crate::settings::{FractalKind, RenderSettings};

/// Linear RGBA in `0.0..=1.0`.
pub type Color = [f32; 4];

pub const OPAQUE_BLACK: Color = [0.0, 0.0, 0.0, 1.0];
pub const TRANSPARENT: Color = [0.0, 0.0, 0.0, 0.0];

pub fn background(settings: &RenderSettings) -> Color {
    if settings.transparent {
        TRANSPARENT
    } else {
        OPAQUE_BLACK
    }
}

/// Position inside the current colour cycle, in `0.0..colorIterations`.
pub fn cycle_position(iteration: f64, settings: &RenderSettings) -> f64 {
    let cycle = f64::from(settings.color_iterations.max(1));
    let scaled =
        (iteration + f64::from(settings.color_cycle_offset)) * f64::from(settings.color_scale);
    let position = scaled.rem_euclid(cycle);
    let position = if settings.color_cycle_mirror && (scaled / cycle).floor().rem_euclid(2.0) == 1.0
    {
        cycle - position
    } else {
        position
    };
    // Both the mirror and rem_euclid rounding can land exactly on `cycle`.
    position.min(cycle * (1.0 - f64::EPSILON))
}

/// Normalised iteration count `n + 1 - ln(ln|z|)/ln(power)`.
///
/// Falls back to `n` when the escape magnitude is too small for the double
/// logarithm or the power is degenerate.
pub fn smooth_iteration(result: &EscapeResult, power: f64) -> f64 {
    let n = f64::from(result.iteration_count);
    let modulus = result.final_z.norm();
    if modulus <= 1.0 || power <= 1.0 {
        return n;
    }
    let log_modulus = modulus.ln();
    if log_modulus <= 0.0 {
        return n;
    }
    n + 1.0 - log_modulus.ln() / power.ln()
}

/// Colour for an escape-time result.
pub fn shade(result: &EscapeResult, settings: &RenderSettings, palette: &Palette) -> Color {
    if settings.kind == FractalKind::OrbitTrap {
        return finish(shade_trap(result.trap_distance, settings), settings);
    }
    if !result.escaped || result.iteration_count < settings.min_iterations {
        return background(settings);
    }
    let blend = f64::from(settings.iteration_color_blend.clamp(0.0, 1.0));
    let iteration = f64::from(result.iteration_count);
    let color = if blend > 0.0 {
        let smooth = smooth_iteration(result, f64::from(settings.power));
        let fraction = smooth - smooth.floor();
        let base = pick(cycle_position(iteration, settings), settings, palette);
        let next = pick(cycle_position(iteration + 1.0, settings), settings, palette);
        mix3(base, next, (fraction * blend) as f32)
    } else {
        pick(cycle_position(iteration, settings), settings, palette)
    };
    finish([color[0], color[1], color[2], 1.0], settings)
}

/// Colour for a non-escaping orbit statistic such as the Ducks mean modulus.
pub fn shade_statistic(value: f64, settings: &RenderSettings, palette: &Palette) -> Color {
    if !value.is_finite() {
        return background(settings);
    }
    let color = pick(cycle_position(value, settings), settings, palette);
    finish([color[0], color[1], color[2], 1.0], settings)
}

fn shade_trap(distance: f64, settings: &RenderSettings) -> Color {
    if !distance.is_finite() {
        return background(settings);
    }
    let edge = f64::from(settings.trap_edge_detail).max(1e-6);
    let intensity = (-distance / edge).exp() as f32;
    let [c1, c2, c3] = settings.colors;
    let color = if intensity > 0.5 {
        mix3(c2, c1, (intensity - 0.5) * 2.0)
    } else {
        mix3(c3, c2, intensity * 2.0)
    };
    [color[0], color[1], color[2], 1.0]
}

fn pick(position: f64, settings: &RenderSettings, palette: &Palette) -> [f32; 3] {
    let cycle = f64::from(settings.color_iterations.max(1));
    let t = (position / cycle).clamp(0.0, 1.0);
    if settings.hsv {
        let hue = (t * f64::from(settings.color_cycle)).rem_euclid(1.0) as f32;
        return hsv_to_rgb(hue, 1.0, 1.0);
    }
    match settings.color_mode {
        1 => gradient(&settings.colors, t as f32),
        _ => palette.get(position.floor().max(0.0) as usize).to_unit(),
    }
}

fn gradient(colors: &[[f32; 3]; 3], t: f32) -> [f32; 3] {
    if t < 0.5 {
        mix3(colors[0], colors[1], t * 2.0)
    } else {
        mix3(colors[1], colors[2], (t - 0.5) * 2.0)
    }
}

fn finish(color: Color, settings: &RenderSettings) -> Color {
    let gamma = settings.gamma;
    if gamma <= 0.0 || gamma == 1.0 {
        return color;
    }
    let exponent = 1.0 / gamma;
    [
        color[0].max(0.0).powf(exponent),
        color[1].max(0.0).powf(exponent),
        color[2].max(0.0).powf(exponent),
        color[3],
    ]
}

pub fn mix3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// `h`, `s`, `v` in `0.0..=1.0`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as i32 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

pub fn to_rgba8(color: Color) -> [u8; 4] {
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        channel(color[3]),
    ]
}

pub fn to_rgb(color: Color) -> Rgb {
    Rgb::from_unit([color[0], color[1], color[2]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex;
    use crate::escape::FractalMode;

    fn escaped(n: u32) -> EscapeResult {
        EscapeResult {
            escaped: true,
            iteration_count: n,
            final_magnitude_squared: 100.0,
            final_z: Complex::new(10.0, 0.0),
            trap_distance: f64::INFINITY,
        }
    }

    fn in_set() -> EscapeResult {
        EscapeResult {
            escaped: false,
            iteration_count: 50,
            final_magnitude_squared: 0.1,
            final_z: Complex::new(0.1, 0.0),
            trap_distance: f64::INFINITY,
        }
    }

    #[test]
    fn in_set_points_are_background() {
        let palette = Palette::default();
        let mut settings = RenderSettings::defaults(FractalMode::Mandelbrot);
        assert_eq!(shade(&in_set(), &settings, &palette), OPAQUE_BLACK);
        settings.transparent = true;
        assert_eq!(shade(&in_set(), &settings, &palette), TRANSPARENT);
    }

    #[test]
    fn early_escapes_below_min_iterations_are_background() {
        let palette = Palette::default();
        let mut settings = RenderSettings::default();
        settings.min_iterations = 5;
        assert_eq!(shade(&escaped(3), &settings, &palette), OPAQUE_BLACK);
        assert_ne!(shade(&escaped(5), &settings, &palette), OPAQUE_BLACK);
    }

    #[test]
    fn mirrored_cycles_run_backwards() {
        let mut settings = RenderSettings::default();
        settings.color_iterations = 4;
        settings.color_cycle_mirror = true;
        assert_eq!(cycle_position(1.0, &settings), 1.0);
        assert_eq!(cycle_position(5.0, &settings), 3.0);
        settings.color_cycle_mirror = false;
        assert_eq!(cycle_position(5.0, &settings), 1.0);
    }

    #[test]
    fn mirrored_cycle_boundary_stays_inside_the_cycle() {
        let mut settings = RenderSettings::default();
        settings.color_iterations = 4;
        settings.color_cycle_mirror = true;
        for n in [4.0, 12.0, 20.0] {
            let position = cycle_position(n, &settings);
            assert!(position < 4.0, "{n} -> {position}");
            assert_eq!(position.floor(), 3.0, "{n} -> {position}");
        }
        assert_eq!(cycle_position(8.0, &settings), 0.0);
    }

    #[test]
    fn escaped_points_read_from_palette() {
        let palette = Palette::default();
        let mut settings = RenderSettings::default();
        settings.color_cycle_mirror = false;
        let color = shade(&escaped(1), &settings, &palette);
        let expected = palette.get(1).to_unit();
        assert_eq!(&color[..3], &expected[..]);
        assert_eq!(color[3], 1.0);

        // positions index the table directly and wrap at its size
        settings.color_iterations = 1000;
        let color = shade(&escaped(130), &settings, &palette);
        assert_eq!(&color[..3], &palette.get(2).to_unit()[..]);
    }

    #[test]
    fn smooth_iteration_stays_near_count() {
        let smooth = smooth_iteration(&escaped(7), 2.0);
        assert!(smooth > 6.0 && smooth < 8.0, "{smooth}");
    }

    #[test]
    fn gamma_is_applied_last() {
        let mut settings = RenderSettings::default();
        settings.gamma = 2.0;
        let corrected = finish([0.25, 0.0, 1.0, 1.0], &settings);
        assert!((corrected[0] - 0.5).abs() < 1e-6);
        assert_eq!(corrected[2], 1.0);
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0]);
        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(green[1] > 0.99 && green[0] < 0.01);
    }
}
