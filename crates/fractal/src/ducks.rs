use crate::complex::Complex;

/// Orbit statistic for the "Ducks" family: `z ← ln(re + i·|im|) + C`.
///
/// The map never escapes, so instead of an iteration count this returns the
/// mean orbit magnitude over `iterations` steps. Zero iterations yields `0.0`.
pub fn ducks_orbit(constant: Complex, start: Complex, iterations: u32) -> f64 {
    if iterations == 0 {
        return 0.0;
    }
    let mut z = start;
    let mut total = 0.0;
    for _ in 0..iterations {
        let folded = Complex::new(z.re, z.im.abs());
        let r2 = folded.norm_sqr();
        z = if r2 > 0.0 {
            Complex::new(0.5 * r2.ln(), folded.arg()) + constant
        } else {
            constant
        };
        total += z.norm();
    }
    total / f64::from(iterations)
}
