use serde::{Deserialize, Serialize};

use crate::complex::Complex;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrapShape {
    #[default]
    Point,
    Cross,
    Circle,
}

impl TrapShape {
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Cross,
            2 => Self::Circle,
            _ => Self::Point,
        }
    }
}

/// Orbit trap geometry. Distances are measured in trap space: the orbit is
/// offset, rotated by `rotation + spin·n` degrees at iteration `n`, then
/// divided by `scale`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitTrap {
    pub shape: TrapShape,
    pub offset: Complex,
    pub scale: f64,
    pub rotation_deg: f64,
    pub spin_deg: f64,
}

impl Default for OrbitTrap {
    fn default() -> Self {
        Self {
            shape: TrapShape::Point,
            offset: Complex::ZERO,
            scale: 1.0,
            rotation_deg: 0.0,
            spin_deg: 0.0,
        }
    }
}

impl OrbitTrap {
    pub fn distance(&self, z: Complex, iteration: u32) -> f64 {
        let angle = -(self.rotation_deg + self.spin_deg * f64::from(iteration)).to_radians();
        let local = (z - self.offset).rotate_about(Complex::ZERO, angle);
        let scale = if self.scale.abs() > f64::EPSILON {
            self.scale
        } else {
            1.0
        };
        let w = Complex::new(local.re / scale, local.im / scale);
        match self.shape {
            TrapShape::Point => w.norm(),
            TrapShape::Cross => w.re.abs().min(w.im.abs()),
            TrapShape::Circle => (w.norm() - 1.0).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_trap_measures_offset_distance() {
        let trap = OrbitTrap {
            offset: Complex::new(1.0, 0.0),
            ..OrbitTrap::default()
        };
        assert!((trap.distance(Complex::new(4.0, 4.0), 0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn cross_trap_is_zero_on_axes() {
        let trap = OrbitTrap {
            shape: TrapShape::Cross,
            ..OrbitTrap::default()
        };
        assert!(trap.distance(Complex::new(0.0, 3.0), 0).abs() < 1e-12);
        assert!((trap.distance(Complex::new(0.5, 2.0), 0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn circle_trap_scales_radius() {
        let trap = OrbitTrap {
            shape: TrapShape::Circle,
            scale: 2.0,
            ..OrbitTrap::default()
        };
        assert!(trap.distance(Complex::new(0.0, 2.0), 0).abs() < 1e-12);
    }

    #[test]
    fn spin_rotates_cross_per_iteration() {
        let trap = OrbitTrap {
            shape: TrapShape::Cross,
            spin_deg: 45.0,
            ..OrbitTrap::default()
        };
        let diagonal = Complex::new(1.0, 1.0);
        assert!(trap.distance(diagonal, 0) > 0.9);
        assert!(trap.distance(diagonal, 1).abs() < 1e-12);
    }
}
