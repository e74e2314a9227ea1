use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Point on the complex plane in double precision.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn from_polar(radius: f64, angle: f64) -> Self {
        Self {
            re: radius * angle.cos(),
            im: radius * angle.sin(),
        }
    }

    #[must_use]
    pub fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    #[must_use]
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    /// Raises to a real power. Integer power 2 takes the exact multiply path;
    /// everything else goes through the polar form `r^p·(cos pθ + i sin pθ)`.
    #[must_use]
    pub fn powf(self, power: f64) -> Self {
        if power == 2.0 {
            return self * self;
        }
        let r2 = self.norm_sqr();
        if r2 == 0.0 {
            return Self::ZERO;
        }
        Self::from_polar(r2.powf(power * 0.5), self.arg() * power)
    }

    /// Rotates by `angle` radians around `pivot`.
    #[must_use]
    pub fn rotate_about(self, pivot: Complex, angle: f64) -> Self {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        let d = self - pivot;
        Complex::new(d.re * cos - d.im * sin, d.re * sin + d.im * cos) + pivot
    }
}

impl Add for Complex {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            re: self.re + other.re,
            im: self.im + other.im,
        }
    }
}

impl Sub for Complex {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            re: self.re - other.re,
            im: self.im - other.im,
        }
    }
}

impl Mul for Complex {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }
}

impl From<[f64; 2]> for Complex {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex, b: Complex) -> bool {
        (a.re - b.re).abs() < 1e-9 && (a.im - b.im).abs() < 1e-9
    }

    #[test]
    fn square_matches_polar_form() {
        let z = Complex::new(0.3, -1.7);
        let exact = z.powf(2.0);
        let polar = Complex::from_polar(z.norm().powf(2.0), z.arg() * 2.0);
        assert!(close(exact, polar));
    }

    #[test]
    fn cube_matches_repeated_multiply() {
        let z = Complex::new(-0.4, 0.9);
        assert!(close(z.powf(3.0), z * z * z));
    }

    #[test]
    fn zero_to_any_power_is_zero() {
        assert_eq!(Complex::ZERO.powf(2.5), Complex::ZERO);
    }

    #[test]
    fn quarter_turn_about_pivot() {
        let pivot = Complex::new(1.0, 1.0);
        let rotated = Complex::new(2.0, 1.0).rotate_about(pivot, std::f64::consts::FRAC_PI_2);
        assert!(close(rotated, Complex::new(1.0, 2.0)));
    }
}
