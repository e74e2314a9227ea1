//! Screen ↔ complex-plane mapping.
//!
//! The viewport stores the visible rectangle of the plane. Screen coordinates
//! run left→right and top→bottom while the imaginary axis grows upwards, so
//! the Y conversion is flipped.

use serde::{Deserialize, Serialize};

use crate::complex::Complex;

/// Pixel dimensions of the render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    #[error("viewport extents must be finite")]
    NotFinite,
    #[error("viewport is empty: x [{min_x}, {max_x}] y [{min_y}, {max_y}]")]
    Empty {
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },
}

/// Visible rectangle of the complex plane. Always `max_x > min_x` and `max_y > min_y`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplexPlaneViewport {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Default for ComplexPlaneViewport {
    /// The classic Mandelbrot framing, `[-2.2, 0.8] × [-1.5, 1.5]`.
    fn default() -> Self {
        Self {
            min_x: -2.2,
            max_x: 0.8,
            min_y: -1.5,
            max_y: 1.5,
        }
    }
}

impl ComplexPlaneViewport {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self, ViewportError> {
        if ![min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite()) {
            return Err(ViewportError::NotFinite);
        }
        if max_x <= min_x || max_y <= min_y {
            return Err(ViewportError::Empty {
                min_x,
                max_x,
                min_y,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Frames `center` with the given half-width; Y follows the surface aspect.
    pub fn centered(
        center: Complex,
        half_width: f64,
        size: SurfaceSize,
    ) -> Result<Self, ViewportError> {
        let half_height = half_width / size.aspect();
        Self::new(
            center.re - half_width,
            center.re + half_width,
            center.im - half_height,
            center.im + half_height,
        )
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Complex {
        Complex::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Plane distance covered by one pixel on each axis.
    pub fn step(&self, size: SurfaceSize) -> (f64, f64) {
        (
            self.width() / f64::from(size.width.max(1)),
            self.height() / f64::from(size.height.max(1)),
        )
    }

    pub fn screen_to_plane(&self, px: f64, py: f64, size: SurfaceSize) -> Complex {
        let (step_x, step_y) = self.step(size);
        Complex::new(self.min_x + px * step_x, self.max_y - py * step_y)
    }

    pub fn plane_to_screen(&self, point: Complex, size: SurfaceSize) -> (f64, f64) {
        let (step_x, step_y) = self.step(size);
        (
            (point.re - self.min_x) / step_x,
            (self.max_y - point.im) / step_y,
        )
    }

    /// Scales the extents by `factor` about the plane point under `(ax, ay)`.
    ///
    /// The anchor keeps its screen position. `factor < 1` zooms in. Non-positive
    /// or non-finite factors leave the viewport untouched.
    pub fn zoom(&mut self, factor: f64, ax: f64, ay: f64, size: SurfaceSize) {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!(factor, "ignoring invalid zoom factor");
            return;
        }
        if factor == 1.0 {
            return;
        }
        let anchor = self.screen_to_plane(ax, ay, size);
        let next = Self {
            min_x: anchor.re - (anchor.re - self.min_x) * factor,
            max_x: anchor.re + (self.max_x - anchor.re) * factor,
            min_y: anchor.im - (anchor.im - self.min_y) * factor,
            max_y: anchor.im + (self.max_y - anchor.im) * factor,
        };
        if next.max_x > next.min_x && next.max_y > next.min_y {
            *self = next;
        } else {
            tracing::debug!(factor, "zoom collapsed the viewport; keeping previous extents");
        }
    }

    /// Drags the plane by a screen-space delta. The content follows the
    /// cursor, so the plane shift is proportional to the current zoom level.
    pub fn pan(&mut self, dx: f64, dy: f64, size: SurfaceSize) {
        let (step_x, step_y) = self.step(size);
        let shift_x = dx * step_x;
        let shift_y = dy * step_y;
        self.min_x -= shift_x;
        self.max_x -= shift_x;
        self.min_y += shift_y;
        self.max_y += shift_y;
    }

    /// Re-fits the X extents about their midpoint so the plane aspect matches
    /// the new surface. Zero-sized surfaces are ignored.
    pub fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() {
            return;
        }
        let target = self.height() * size.aspect();
        if (target - self.width()).abs() <= f64::EPSILON * self.width().abs().max(1.0) {
            return;
        }
        let mid = (self.min_x + self.max_x) * 0.5;
        self.min_x = mid - target * 0.5;
        self.max_x = mid + target * 0.5;
    }

    /// Re-centres while keeping the current extents.
    pub fn recenter(&mut self, center: Complex) {
        let half_w = self.width() * 0.5;
        let half_h = self.height() * 0.5;
        self.min_x = center.re - half_w;
        self.max_x = center.re + half_w;
        self.min_y = center.im - half_h;
        self.max_y = center.im + half_h;
    }
}
