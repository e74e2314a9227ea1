//! Reference renderer evaluating the escape-time function per pixel.
//!
//! Produces the same image the bundled fragment shader draws: pixel centres
//! are sampled, rotation is applied about the viewport centre, and with
//! antialiasing on each pixel averages a 2×2 grid of gamma-corrected samples.

use std::path::Path;

use fractal::coloring::{self, Color};
use fractal::{
    ducks_orbit, escape_time, Complex, ComplexPlaneViewport, FractalKind, Palette,
    RenderSettings, Rgb, SurfaceSize,
};
use rayon::prelude::*;

/// A rendered RGBA8 image, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub size: SurfaceSize,
    pub pixels: Vec<[u8; 4]>,
}

impl Frame {
    /// Wraps tightly packed RGBA8 bytes, as read back from the GPU.
    pub fn from_rgba_bytes(size: SurfaceSize, bytes: &[u8]) -> Option<Self> {
        let expected = size.width as usize * size.height as usize * 4;
        if bytes.len() != expected {
            return None;
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect();
        Some(Self { size, pixels })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    /// Drops alpha.
    pub fn to_rgb(&self) -> Vec<Rgb> {
        self.pixels
            .iter()
            .map(|&[r, g, b, _]| Rgb::new(r, g, b))
            .collect()
    }

    pub fn save_ppm(&self, path: &Path) -> std::io::Result<()> {
        fractal::ppm::save_ppm_file(path, self.size.width, self.size.height, &self.to_rgb())
    }
}

/// Colour of one plane point, gamma already applied.
pub fn sample(point: Complex, settings: &RenderSettings, palette: &Palette) -> Color {
    let (constant, start) = settings.mode().seeds(point, settings.julia_constant());
    match settings.kind {
        FractalKind::Ducks => {
            let steps = settings.max_iterations.max(1);
            coloring::shade_statistic(ducks_orbit(constant, start, steps), settings, palette)
        }
        FractalKind::EscapeTime | FractalKind::OrbitTrap => {
            let result = escape_time(constant, start, &settings.escape_params());
            coloring::shade(&result, settings, palette)
        }
    }
}

/// Renders the viewport at `size`. Rows are evaluated in parallel.
pub fn render_frame(
    settings: &RenderSettings,
    viewport: &ComplexPlaneViewport,
    size: SurfaceSize,
    palette: &Palette,
) -> Frame {
    if size.is_empty() {
        return Frame {
            size,
            pixels: Vec::new(),
        };
    }

    let center = viewport.center();
    let angle = f64::from(settings.rotation).to_radians();
    let (step_x, step_y) = viewport.step(size);
    let jitter = [(-0.25, -0.25), (0.25, -0.25), (-0.25, 0.25), (0.25, 0.25)];

    let rows: Vec<Vec<[u8; 4]>> = (0..size.height)
        .into_par_iter()
        .map(|y| {
            let mut row = Vec::with_capacity(size.width as usize);
            for x in 0..size.width {
                let point = viewport.screen_to_plane(f64::from(x) + 0.5, f64::from(y) + 0.5, size);
                let color = if settings.antialiasing {
                    let mut sum = [0.0f32; 4];
                    for (jx, jy) in jitter {
                        let shifted = Complex::new(point.re + jx * step_x, point.im - jy * step_y);
                        let c = sample(shifted.rotate_about(center, angle), settings, palette);
                        for (total, channel) in sum.iter_mut().zip(c) {
                            *total += channel;
                        }
                    }
                    sum.map(|channel| channel * 0.25)
                } else {
                    sample(point.rotate_about(center, angle), settings, palette)
                };
                row.push(coloring::to_rgba8(color));
            }
            row
        })
        .collect();

    Frame {
        size,
        pixels: rows.into_iter().flatten().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractal::FractalMode;

    fn small() -> SurfaceSize {
        SurfaceSize::new(24, 16)
    }

    fn mandelbrot_view(size: SurfaceSize) -> ComplexPlaneViewport {
        ComplexPlaneViewport::centered(Complex::new(-0.5, 0.0), 2.0, size).unwrap()
    }

    #[test]
    fn frame_has_one_pixel_per_screen_pixel() {
        let size = small();
        let frame = render_frame(
            &RenderSettings::default(),
            &mandelbrot_view(size),
            size,
            &Palette::default(),
        );
        assert_eq!(frame.pixels.len(), 24 * 16);
    }

    #[test]
    fn set_interior_is_background() {
        let size = SurfaceSize::new(9, 9);
        let viewport = ComplexPlaneViewport::centered(Complex::ZERO, 0.1, size).unwrap();
        let frame = render_frame(&RenderSettings::default(), &viewport, size, &Palette::default());
        assert_eq!(frame.pixel(4, 4), Some([0, 0, 0, 255]));
    }

    #[test]
    fn transparent_background_has_zero_alpha() {
        let size = SurfaceSize::new(9, 9);
        let viewport = ComplexPlaneViewport::centered(Complex::ZERO, 0.1, size).unwrap();
        let mut settings = RenderSettings::default();
        settings.transparent = true;
        let frame = render_frame(&settings, &viewport, size, &Palette::default());
        assert_eq!(frame.pixel(4, 4).map(|px| px[3]), Some(0));
    }

    #[test]
    fn far_points_are_coloured() {
        let size = SurfaceSize::new(8, 8);
        let viewport = ComplexPlaneViewport::centered(Complex::new(10.0, 10.0), 1.0, size).unwrap();
        let mut settings = RenderSettings::default();
        settings.min_iterations = 0;
        let frame = render_frame(&settings, &viewport, size, &Palette::default());
        assert!(frame.pixels.iter().all(|px| px[3] == 255));
        assert!(frame.pixels.iter().any(|px| px[..3] != [0, 0, 0]));
    }

    #[test]
    fn antialiasing_keeps_uniform_regions_unchanged() {
        let size = SurfaceSize::new(5, 5);
        let viewport = ComplexPlaneViewport::centered(Complex::ZERO, 0.05, size).unwrap();
        let mut settings = RenderSettings::default();
        let plain = render_frame(&settings, &viewport, size, &Palette::default());
        settings.antialiasing = true;
        let smoothed = render_frame(&settings, &viewport, size, &Palette::default());
        assert_eq!(plain, smoothed);
    }

    #[test]
    fn julia_mode_renders() {
        let size = small();
        let settings = RenderSettings::defaults(FractalMode::Julia);
        let viewport = ComplexPlaneViewport::centered(Complex::ZERO, 1.6, size).unwrap();
        let frame = render_frame(&settings, &viewport, size, &Palette::default());
        assert!(frame.pixels.iter().any(|px| px[..3] != [0, 0, 0]));
    }

    #[test]
    fn rgba_bytes_must_match_size() {
        let size = SurfaceSize::new(2, 1);
        assert!(Frame::from_rgba_bytes(size, &[0; 7]).is_none());
        let frame = Frame::from_rgba_bytes(size, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(frame.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(frame.to_rgb()[0], Rgb::new(1, 2, 3));
    }
}
