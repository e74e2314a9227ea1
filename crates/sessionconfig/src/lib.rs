//! `session.toml`: the startup state of a render session.
//!
//! ```toml
//! version = 1
//! mode = "julia"
//! surface = "1024x768"
//!
//! [palette]
//! size = 128              # or: path = "palette.ppm"
//!
//! [shaders]
//! vertex = "shaders/fractal.vert"
//! fragment = "shaders/fractal.frag"
//!
//! [viewport]
//! center = [-0.5, 0.0]
//! half_width = 2.0
//!
//! [parameters]
//! maxIterations = 200
//! offset = [-0.8, 0.156]
//! ```
//!
//! Parameter names are not checked here; the session applies them through
//! the shader boundary, where unknown names are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fractal::{Complex, ComplexPlaneViewport, FractalMode, SurfaceSize, UniformValue};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "session.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub mode: FractalMode,
    #[serde(
        default,
        deserialize_with = "deserialize_surface_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub surface: Option<SurfaceSize>,
    #[serde(default)]
    pub palette: PaletteSource,
    #[serde(default)]
    pub shaders: ShaderPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportConfig>,
    #[serde(default)]
    pub parameters: BTreeMap<String, UniformValue>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            mode: FractalMode::default(),
            surface: None,
            palette: PaletteSource::default(),
            shaders: ShaderPaths::default(),
            viewport: None,
            parameters: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    1
}

/// Either a generated palette of `size` entries or the pixels of a P6 file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PaletteSource {
    pub size: Option<usize>,
    pub path: Option<PathBuf>,
}

/// Shader sources replacing the bundled pair. Both or neither.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

impl ShaderPaths {
    pub fn pair(&self) -> Option<(&Path, &Path)> {
        match (&self.vertex, &self.fragment) {
            (Some(vertex), Some(fragment)) => Some((vertex.as_path(), fragment.as_path())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ViewportConfig {
    pub center: [f64; 2],
    pub half_width: f64,
}

impl ViewportConfig {
    pub fn to_viewport(self, size: SurfaceSize) -> Option<ComplexPlaneViewport> {
        let center = Complex::new(self.center[0], self.center[1]);
        ComplexPlaneViewport::centered(center, self.half_width, size).ok()
    }
}

fn deserialize_surface_opt<'de, D>(deserializer: D) -> Result<Option<SurfaceSize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper {
        Str(String),
        Table { width: u32, height: u32 },
    }

    let helper: Option<Helper> = Option::deserialize(deserializer)?;
    let result = match helper {
        None => None,
        Some(Helper::Str(raw)) => Some(parse_surface(&raw).map_err(de::Error::custom)?),
        Some(Helper::Table { width, height }) => Some(SurfaceSize::new(width, height)),
    };
    Ok(result)
}

/// Parses `WIDTHxHEIGHT`, e.g. `800x600`.
pub fn parse_surface(raw: &str) -> Result<SurfaceSize, String> {
    let normalized = raw.trim().to_ascii_lowercase();
    let (width, height) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid surface size '{raw}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid surface width '{width}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid surface height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("surface size '{raw}' must be non-zero"));
    }
    Ok(SurfaceSize::new(width, height))
}

impl SessionConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SessionConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`. Relative file references inside the
    /// config are resolved against the config's own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&input)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields `None`.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |slot: &mut Option<PathBuf>| {
            if let Some(path) = slot.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        resolve(&mut self.palette.path);
        resolve(&mut self.shaders.vertex);
        resolve(&mut self.shaders.fragment);
    }

    /// Parameter overrides in name order.
    pub fn overrides(&self) -> Vec<(String, UniformValue)> {
        self.parameters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if let Some(surface) = self.surface {
            if surface.is_empty() {
                return Err(ConfigError::Invalid("surface must be non-zero".into()));
            }
        }

        match (&self.palette.size, &self.palette.path) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "palette takes either size or path, not both".into(),
                ));
            }
            (Some(0), None) => {
                return Err(ConfigError::Invalid(
                    "palette size must be greater than zero".into(),
                ));
            }
            _ => {}
        }

        if self.shaders.vertex.is_some() != self.shaders.fragment.is_some() {
            return Err(ConfigError::Invalid(
                "shaders.vertex and shaders.fragment must be given together".into(),
            ));
        }

        if let Some(viewport) = &self.viewport {
            if !viewport.center.iter().all(|v| v.is_finite()) {
                return Err(ConfigError::Invalid(
                    "viewport center must be finite".into(),
                ));
            }
            if !(viewport.half_width.is_finite() && viewport.half_width > 0.0) {
                return Err(ConfigError::Invalid(
                    "viewport half_width must be greater than zero".into(),
                ));
            }
        }

        for name in self.parameters.keys() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "parameter names may not be empty".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1
mode = "julia"
surface = "1024x768"

[palette]
size = 64

[shaders]
vertex = "shaders/a.vert"
fragment = "shaders/a.frag"

[viewport]
center = [0.0, 0.25]
half_width = 1.5

[parameters]
maxIterations = 200
gamma = 2.2
offset = [-0.8, 0.156]
juliaMode = true
color1 = [1, 0, 0]
"#;

    #[test]
    fn parses_sample_config() {
        let config = SessionConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.mode, FractalMode::Julia);
        assert_eq!(config.surface, Some(SurfaceSize::new(1024, 768)));
        assert_eq!(config.palette.size, Some(64));
        assert!(config.shaders.pair().is_some());
        assert_eq!(
            config.parameters.get("maxIterations"),
            Some(&UniformValue::Int(200))
        );
        assert_eq!(config.parameters.get("gamma"), Some(&UniformValue::Float(2.2)));
        assert_eq!(
            config.parameters.get("offset"),
            Some(&UniformValue::Vec2([-0.8, 0.156]))
        );
        assert_eq!(
            config.parameters.get("juliaMode"),
            Some(&UniformValue::Bool(true))
        );
        assert_eq!(
            config.parameters.get("color1"),
            Some(&UniformValue::Vec3([1.0, 0.0, 0.0]))
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.mode, FractalMode::Mandelbrot);
        assert_eq!(config.surface, None);
        assert!(config.overrides().is_empty());
    }

    #[test]
    fn surface_accepts_a_table() {
        let config = SessionConfig::from_toml_str(
            r#"
[surface]
width = 320
height = 200
"#,
        )
        .unwrap();
        assert_eq!(config.surface, Some(SurfaceSize::new(320, 200)));
    }

    #[test]
    fn rejects_palette_with_size_and_path() {
        let err = SessionConfig::from_toml_str(
            r#"
[palette]
size = 16
path = "palette.ppm"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_half_a_shader_pair() {
        let err = SessionConfig::from_toml_str(
            r#"
[shaders]
fragment = "only.frag"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_surface_and_viewport() {
        let err = SessionConfig::from_toml_str(r#"surface = "0x10""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = SessionConfig::from_toml_str(
            r#"
[viewport]
center = [0.0, 0.0]
half_width = 0.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn parse_surface_rejects_garbage() {
        assert_eq!(parse_surface(" 8X6 "), Ok(SurfaceSize::new(8, 6)));
        assert!(parse_surface("800").is_err());
        assert!(parse_surface("axb").is_err());
    }

    #[test]
    fn viewport_follows_surface_aspect() {
        let viewport = ViewportConfig {
            center: [0.0, 0.0],
            half_width: 2.0,
        }
        .to_viewport(SurfaceSize::new(200, 100))
        .unwrap();
        assert!((viewport.width() - 4.0).abs() < 1e-12);
        assert!((viewport.height() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[palette]
path = "colors.ppm"
"#,
        )
        .unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.palette.path, Some(dir.path().join("colors.ppm")));

        let missing = dir.path().join("missing.toml");
        assert!(SessionConfig::load_optional(&missing).unwrap().is_none());
    }
}
