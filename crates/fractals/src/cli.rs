use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fractal::{FractalMode, SurfaceSize, UniformValue};
use renderer::{GpuPowerPreference, Key};

#[derive(Parser, Debug)]
#[command(
    name = "fractals",
    author,
    version,
    about = "Escape-time fractal explorer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Session options shared by every command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Session configuration file (defaults to `session.toml` in the config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Surface size (e.g. `800x600`).
    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<SurfaceSize>,

    /// Fractal mode: `mandelbrot` or `julia`.
    #[arg(long, global = true, value_name = "MODE", value_parser = parse_mode)]
    pub mode: Option<FractalMode>,

    /// Seed the palette from a P6 image instead of the generated ramp.
    #[arg(long, global = true, value_name = "PATH")]
    pub palette: Option<PathBuf>,

    /// Vertex shader source replacing the bundled one.
    #[arg(long, global = true, value_name = "PATH", requires = "fragment")]
    pub vertex: Option<PathBuf>,

    /// Fragment shader source replacing the bundled one.
    #[arg(long, global = true, value_name = "PATH", requires = "vertex")]
    pub fragment: Option<PathBuf>,

    /// Parameter override, repeatable (e.g. `maxIterations=200`, `offset=-0.8,0.156`).
    #[arg(long = "set", global = true, value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub overrides: Vec<(String, UniformValue)>,

    /// Whitespace separated key presses replayed before rendering (e.g. `"+ + j space"`).
    #[arg(long, global = true, value_name = "KEYS", value_parser = parse_keys)]
    pub keys: Option<KeyScript>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyScript(pub Vec<Key>);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render on the CPU and write a P6 image.
    Render(RenderArgs),
    /// Render offscreen on the GPU and write a P6 image.
    GpuRender(GpuRenderArgs),
    /// Compile and link a shader pair, printing the driver logs.
    Check,
    /// Print the parameter dump in two columns.
    Params(ParamsArgs),
    /// Write the palette as a P6 strip.
    Palette(PaletteArgs),
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Output image path.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Parser, Debug)]
pub struct GpuRenderArgs {
    /// Output image path.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Adapter power preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power, default_value = "low")]
    pub power: GpuPowerPreference,
}

#[derive(Parser, Debug, Default)]
pub struct ParamsArgs {
    /// Also print the keyboard and mouse controls.
    #[arg(long)]
    pub controls: bool,

    /// Print the values read back from the program as a JSON object instead.
    #[arg(long, conflicts_with = "controls")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PaletteArgs {
    /// Output image path.
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Height of the strip in pixels.
    #[arg(long, value_name = "PIXELS", default_value_t = 16)]
    pub height: u32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<SurfaceSize, String> {
    sessionconfig::parse_surface(value)
}

pub fn parse_mode(value: &str) -> Result<FractalMode, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "mandelbrot" | "m" => Ok(FractalMode::Mandelbrot),
        "julia" | "j" => Ok(FractalMode::Julia),
        other => Err(format!(
            "unknown mode '{other}'; expected mandelbrot or julia"
        )),
    }
}

pub fn parse_power(value: &str) -> Result<GpuPowerPreference, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "low" | "low-power" => Ok(GpuPowerPreference::Low),
        "high" | "high-performance" => Ok(GpuPowerPreference::High),
        other => Err(format!(
            "unknown power preference '{other}'; expected low or high"
        )),
    }
}

/// Parses `NAME=VALUE`. The value shape picks the kind: `true`/`false`,
/// an integer, a float, or two or three comma separated floats.
pub fn parse_assignment(value: &str) -> Result<(String, UniformValue), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("invalid override '{value}'; expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("override name must not be empty".to_string());
    }
    Ok((name.to_string(), parse_uniform_value(raw.trim())?))
}

pub fn parse_uniform_value(raw: &str) -> Result<UniformValue, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" => return Ok(UniformValue::Bool(true)),
        "false" | "off" => return Ok(UniformValue::Bool(false)),
        _ => {}
    }

    if raw.contains(',') {
        let parts = raw
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f32>()
                    .map_err(|_| format!("invalid vector component '{}'", part.trim()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return match parts.as_slice() {
            [x, y] => Ok(UniformValue::Vec2([*x, *y])),
            [x, y, z] => Ok(UniformValue::Vec3([*x, *y, *z])),
            _ => Err(format!(
                "vector '{raw}' must have two or three components"
            )),
        };
    }

    if let Ok(int) = raw.parse::<i32>() {
        return Ok(UniformValue::Int(int));
    }
    raw.parse::<f32>()
        .map(UniformValue::Float)
        .map_err(|_| format!("invalid value '{raw}'"))
}

pub fn parse_keys(value: &str) -> Result<KeyScript, String> {
    value
        .split_whitespace()
        .map(|token| Key::parse(token).ok_or_else(|| format!("unknown key '{token}'")))
        .collect::<Result<Vec<_>, _>>()
        .map(KeyScript)
}
