//! Resolves CLI flags, `session.toml` and bundled assets into one session plan.
//!
//! Precedence is flag, then config file, then built-in default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fractal::ppm::load_ppm_file;
use fractal::{Palette, SurfaceSize};
use renderer::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use renderer::{Key, SessionSetup};
use sessionconfig::SessionConfig;
use tracing::{debug, info};

use crate::cli::RunArgs;
use crate::paths::AppPaths;

pub const DEFAULT_SURFACE: SurfaceSize = SurfaceSize::new(800, 600);

#[derive(Debug)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
    /// Where the sources came from, for log output.
    pub origin: String,
}

impl ShaderPair {
    pub fn bundled() -> Self {
        Self {
            vertex: VERTEX_SHADER.to_string(),
            fragment: FRAGMENT_SHADER.to_string(),
            origin: "bundled".to_string(),
        }
    }

    pub fn from_files(vertex: &Path, fragment: &Path) -> Result<Self> {
        let read = |path: &Path| {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read shader source {}", path.display()))
        };
        Ok(Self {
            vertex: read(vertex)?,
            fragment: read(fragment)?,
            origin: format!("{} + {}", vertex.display(), fragment.display()),
        })
    }
}

#[derive(Debug)]
pub struct SessionPlan {
    pub setup: SessionSetup,
    pub shaders: ShaderPair,
    pub keys: Vec<Key>,
}

pub fn prepare_session(args: &RunArgs, paths: &AppPaths) -> Result<SessionPlan> {
    let config = load_config(args, paths)?;

    let size = args.size.or(config.surface).unwrap_or(DEFAULT_SURFACE);
    let mode = args.mode.unwrap_or(config.mode);

    let palette = match (&args.palette, &config.palette.path, config.palette.size) {
        (Some(path), _, _) | (None, Some(path), _) => load_palette(path)?,
        (None, None, Some(entries)) => Palette::build(entries),
        (None, None, None) => Palette::default(),
    };

    let shaders = match (&args.vertex, &args.fragment) {
        (Some(vertex), Some(fragment)) => ShaderPair::from_files(vertex, fragment)?,
        _ => match config.shaders.pair() {
            Some((vertex, fragment)) => ShaderPair::from_files(vertex, fragment)?,
            None => ShaderPair::bundled(),
        },
    };

    let viewport = config
        .viewport
        .and_then(|viewport| viewport.to_viewport(size));

    let mut overrides = config.overrides();
    overrides.extend(args.overrides.iter().cloned());

    let keys = args.keys.clone().map(|script| script.0).unwrap_or_default();

    debug!(
        width = size.width,
        height = size.height,
        %mode,
        palette = palette.len(),
        shaders = %shaders.origin,
        overrides = overrides.len(),
        keys = keys.len(),
        "prepared session"
    );

    Ok(SessionPlan {
        setup: SessionSetup {
            size,
            mode,
            palette,
            viewport,
            overrides,
        },
        shaders,
        keys,
    })
}

fn load_config(args: &RunArgs, paths: &AppPaths) -> Result<SessionConfig> {
    if let Some(path) = &args.config {
        let config = SessionConfig::load(path)
            .with_context(|| format!("failed to load session config {}", path.display()))?;
        info!(path = %path.display(), "loaded session config");
        return Ok(config);
    }

    let path = paths.session_file();
    match SessionConfig::load_optional(&path)
        .with_context(|| format!("failed to load session config {}", path.display()))?
    {
        Some(config) => {
            info!(path = %path.display(), "loaded session config");
            Ok(config)
        }
        None => {
            debug!(path = %path.display(), "no session config; using defaults");
            Ok(SessionConfig::default())
        }
    }
}

/// Reads a P6 image and uses its pixels, row-major, as the palette.
pub fn load_palette(path: &Path) -> Result<Palette> {
    let image = load_ppm_file(path)
        .with_context(|| format!("failed to load palette image {}", path.display()))?;
    debug!(
        path = %path.display(),
        width = image.width,
        height = image.height,
        "loaded palette image"
    );
    Palette::from_colors(image.pixels)
        .with_context(|| format!("palette image {} has no pixels", path.display()))
}
