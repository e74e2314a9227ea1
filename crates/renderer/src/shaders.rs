/// Full-screen triangle vertex stage; writes `v_uv` at location 0.
pub const VERTEX_SHADER: &str = include_str!("../shaders/fractal.vert");

/// Escape-time fragment stage reading the `FractalParams` block.
pub const FRAGMENT_SHADER: &str = include_str!("../shaders/fractal.frag");
