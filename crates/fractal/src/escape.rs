//! Escape-time iteration.
//!
//! A single pure function, [`escape_time`], evaluates `z_{n+1} = z_n^p + C`.
//! Mandelbrot and Julia only differ in how the caller picks `C` and `z₀`
//! (see [`FractalMode::seeds`]). The bailout threshold is always compared
//! against a *squared* magnitude.

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::trap::OrbitTrap;

/// How the escape magnitude is measured before comparing with `bailout`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BailoutStyle {
    /// `re² + im²`
    #[default]
    Circle,
    /// `max(|re|, |im|)²`
    Square,
    /// `(|re| + |im|)²`
    Diamond,
}

impl BailoutStyle {
    /// Maps the integer uniform value; unknown values fall back to [`BailoutStyle::Circle`].
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Square,
            2 => Self::Diamond,
            _ => Self::Circle,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Self::Circle => 0,
            Self::Square => 1,
            Self::Diamond => 2,
        }
    }

    pub fn magnitude_squared(self, z: Complex) -> f64 {
        match self {
            Self::Circle => z.norm_sqr(),
            Self::Square => {
                let m = z.re.abs().max(z.im.abs());
                m * m
            }
            Self::Diamond => {
                let m = z.re.abs() + z.im.abs();
                m * m
            }
        }
    }
}

/// Which escape-time set is being drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractalMode {
    #[default]
    Mandelbrot,
    Julia,
}

impl FractalMode {
    /// Returns `(C, z₀)` for the plane point `point`.
    ///
    /// Mandelbrot iterates `C = point` from zero; Julia iterates the fixed
    /// `julia_constant` starting at `point`.
    pub fn seeds(self, point: Complex, julia_constant: Complex) -> (Complex, Complex) {
        match self {
            Self::Mandelbrot => (point, Complex::ZERO),
            Self::Julia => (julia_constant, point),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Mandelbrot => Self::Julia,
            Self::Julia => Self::Mandelbrot,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "mandelbrot",
            Self::Julia => "julia",
        }
    }
}

impl std::str::FromStr for FractalMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mandelbrot" | "m" => Ok(Self::Mandelbrot),
            "julia" | "j" => Ok(Self::Julia),
            other => Err(format!(
                "unknown fractal mode '{other}'; expected mandelbrot or julia"
            )),
        }
    }
}

impl std::fmt::Display for FractalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EscapeParams {
    pub power: f64,
    pub bailout: f64,
    pub max_iterations: u32,
    pub style: BailoutStyle,
    pub trap: Option<OrbitTrap>,
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            power: 2.0,
            bailout: 4.0,
            max_iterations: 50,
            style: BailoutStyle::Circle,
            trap: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EscapeResult {
    pub escaped: bool,
    pub iteration_count: u32,
    pub final_magnitude_squared: f64,
    /// Last iterate examined; the escaping value when `escaped`.
    pub final_z: Complex,
    /// Closest approach to the orbit trap, `f64::INFINITY` without one.
    pub trap_distance: f64,
}

/// Iterates `z ← z^power + constant` from `start`.
///
/// `z_n` is tested before each step, so a start value already outside the
/// bailout reports `iteration_count == 0`. Points that never exceed the
/// threshold report `escaped == false` and `iteration_count == max_iterations`.
pub fn escape_time(constant: Complex, start: Complex, params: &EscapeParams) -> EscapeResult {
    let mut z = start;
    let mut trap_distance = f64::INFINITY;
    for n in 0..params.max_iterations {
        let magnitude = params.style.magnitude_squared(z);
        if magnitude > params.bailout {
            return EscapeResult {
                escaped: true,
                iteration_count: n,
                final_magnitude_squared: magnitude,
                final_z: z,
                trap_distance,
            };
        }
        if let Some(trap) = params.trap.as_ref() {
            trap_distance = trap_distance.min(trap.distance(z, n));
        }
        z = z.powf(params.power) + constant;
    }
    EscapeResult {
        escaped: false,
        iteration_count: params.max_iterations,
        final_magnitude_squared: params.style.magnitude_squared(z),
        final_z: z,
        trap_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mandelbrot(point: Complex, max_iterations: u32, bailout: f64) -> EscapeResult {
        let params = EscapeParams {
            max_iterations,
            bailout,
            ..EscapeParams::default()
        };
        let (constant, start) = FractalMode::Mandelbrot.seeds(point, Complex::ZERO);
        escape_time(constant, start, &params)
    }

    #[test]
    fn origin_never_escapes() {
        for max_iterations in [0, 1, 10, 500] {
            for bailout in [0.01, 4.0, 1e6] {
                let result = mandelbrot(Complex::ZERO, max_iterations, bailout);
                assert!(!result.escaped);
                assert_eq!(result.iteration_count, max_iterations);
            }
        }
    }

    #[test]
    fn far_point_escapes_after_one_step() {
        let result = mandelbrot(Complex::new(5.0, 5.0), 50, 4.0);
        assert!(result.escaped);
        assert_eq!(result.iteration_count, 1);
        assert!((result.final_magnitude_squared - 50.0).abs() < 1e-12);
    }

    #[test]
    fn escape_count_is_stable_as_budget_grows() {
        let point = Complex::new(0.5, 0.5);
        let shallow = mandelbrot(point, 200, 4.0);
        assert!(shallow.escaped);
        for budget in [300, 1000, 5000] {
            let deeper = mandelbrot(point, budget, 4.0);
            assert!(deeper.escaped);
            assert_eq!(deeper.iteration_count, shallow.iteration_count);
        }
    }

    #[test]
    fn grid_counts_are_monotone_in_the_budget() {
        let budgets = [0, 1, 5, 20, 100, 400];
        for row in 0..=10 {
            for col in 0..=12 {
                let point = Complex::new(
                    -2.0 + 0.25 * f64::from(col),
                    -1.25 + 0.25 * f64::from(row),
                );
                let mut settled: Option<u32> = None;
                let mut previous = 0;
                for budget in budgets {
                    let result = mandelbrot(point, budget, 4.0);
                    assert!(result.iteration_count <= budget, "{point:?} at {budget}");
                    assert!(result.iteration_count >= previous, "{point:?} at {budget}");
                    match (settled, result.escaped) {
                        (Some(count), escaped) => {
                            assert!(escaped, "{point:?} stopped escaping at {budget}");
                            assert_eq!(result.iteration_count, count, "{point:?} at {budget}");
                        }
                        (None, true) => settled = Some(result.iteration_count),
                        (None, false) => assert_eq!(result.iteration_count, budget),
                    }
                    previous = result.iteration_count;
                }
            }
        }
    }

    #[test]
    fn bounded_points_report_the_full_budget() {
        let bounded = [
            Complex::ZERO,
            Complex::new(-1.0, 0.0),
            Complex::new(-2.0, 0.0),
            Complex::new(0.0, 1.0),
            Complex::new(-0.1, 0.1),
            Complex::new(0.25, 0.0),
        ];
        for point in bounded {
            for budget in [0, 1, 10, 100, 1000] {
                let result = mandelbrot(point, budget, 4.0);
                assert!(!result.escaped, "{point:?} escaped at {budget}");
                assert_eq!(result.iteration_count, budget, "{point:?}");
            }
        }
    }

    #[test]
    fn julia_uses_point_as_start() {
        let params = EscapeParams::default();
        let (constant, start) =
            FractalMode::Julia.seeds(Complex::new(3.0, 0.0), Complex::new(-0.8, 0.156));
        let result = escape_time(constant, start, &params);
        assert!(result.escaped);
        assert_eq!(result.iteration_count, 0);
    }

    #[test]
    fn bailout_styles_measure_the_diagonal_differently() {
        let z = Complex::new(1.5, 1.5);
        assert!((BailoutStyle::Circle.magnitude_squared(z) - 4.5).abs() < 1e-12);
        assert!((BailoutStyle::Square.magnitude_squared(z) - 2.25).abs() < 1e-12);
        assert!((BailoutStyle::Diamond.magnitude_squared(z) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn cubic_power_escapes_from_real_axis() {
        let params = EscapeParams {
            power: 3.0,
            ..EscapeParams::default()
        };
        let result = escape_time(Complex::new(1.0, 0.0), Complex::ZERO, &params);
        // 0 → 1 → 2 (|2|² = 4, not yet above) → 9
        assert!(result.escaped);
        assert_eq!(result.iteration_count, 3);
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Julia".parse::<FractalMode>(), Ok(FractalMode::Julia));
        assert!("newton".parse::<FractalMode>().is_err());
    }
}
