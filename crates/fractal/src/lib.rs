//! Escape-time fractal mathematics shared by the GPU and CPU paths.
//!
//! Nothing in this crate touches the GPU. The renderer crate pushes the same
//! parameters to the bundled shader program and, for the reference path,
//! evaluates [`escape_time`] per pixel and colours it with [`coloring::shade`].

pub mod camera;
pub mod coloring;
pub mod complex;
pub mod ducks;
pub mod escape;
pub mod palette;
pub mod params;
pub mod ppm;
pub mod settings;
pub mod trap;
pub mod viewport;

pub use camera::Camera;
pub use complex::Complex;
pub use ducks::ducks_orbit;
pub use escape::{escape_time, BailoutStyle, EscapeParams, EscapeResult, FractalMode};
pub use palette::{Palette, Rgb, DEFAULT_PALETTE_SIZE};
pub use params::{Parameter, UniformKind, UniformValue};
pub use ppm::{pack_rgb24, Endianness, ImageLoadError, PpmImage};
pub use settings::{FractalKind, RenderSettings};
pub use trap::{OrbitTrap, TrapShape};
pub use viewport::{ComplexPlaneViewport, SurfaceSize, ViewportError};
