//! Closed catalogue of the tunable fractal parameters.
//!
//! # Types
//!
//! - [`Parameter`]: one variant per uniform the bundled program exposes.
//! - [`UniformKind`] / [`UniformValue`]: the value shapes a uniform can hold.
//!
//! # Functions
//!
//! - [`Parameter::from_name`]: string → parameter, `None` for unknown names.
//! - [`Parameter::default_value`]: per-mode default for each parameter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::escape::FractalMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Int,
    Bool,
}

impl UniformKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Int(_) => UniformKind::Int,
            Self::Bool(_) => UniformKind::Bool,
        }
    }

    /// Reinterprets the value as `kind` where the conversion is lossless in
    /// intent: ints and bools interchange, ints widen to floats. Returns
    /// `None` for shape mismatches.
    pub fn coerce(self, kind: UniformKind) -> Option<UniformValue> {
        match (self, kind) {
            (value, kind) if value.kind() == kind => Some(value),
            (Self::Int(v), UniformKind::Bool) => Some(Self::Bool(v != 0)),
            (Self::Bool(v), UniformKind::Int) => Some(Self::Int(i32::from(v))),
            (Self::Int(v), UniformKind::Float) => Some(Self::Float(v as f32)),
            (Self::Float(v), UniformKind::Int) if v.fract() == 0.0 => Some(Self::Int(v as i32)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Bool(v) => Some(i32::from(v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            Self::Int(v) => Some(v != 0),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match *self {
            Self::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match *self {
            Self::Vec3(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.write_str(if *v { "on" } else { "off" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.3}"),
            Self::Vec2([x, y]) => write!(f, "({x:.3}, {y:.3})"),
            Self::Vec3([x, y, z]) => write!(f, "({x:.3}, {y:.3}, {z:.3})"),
        }
    }
}

macro_rules! parameters {
    ($($variant:ident => $name:literal, $kind:ident;)+) => {
        /// Every tunable uniform of the fractal program, in registry order.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Parameter {
            $($variant,)+
        }

        impl Parameter {
            pub const ALL: &'static [Parameter] = &[$(Parameter::$variant,)+];

            /// Uniform name as declared in the shader.
            pub fn name(self) -> &'static str {
                match self {
                    $(Parameter::$variant => $name,)+
                }
            }

            pub fn kind(self) -> UniformKind {
                match self {
                    $(Parameter::$variant => UniformKind::$kind,)+
                }
            }

            pub fn from_name(name: &str) -> Option<Parameter> {
                match name {
                    $($name => Some(Parameter::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

parameters! {
    Fractal => "fractal", Int;
    MaxIterations => "maxIterations", Int;
    AntialiasingOn => "antialiasingOn", Bool;
    Scale => "scale", Float;
    Power => "power", Float;
    Bailout => "bailout", Float;
    MinIterations => "minIterations", Int;
    JuliaMode => "juliaMode", Bool;
    Offset => "offset", Vec2;
    ColorMode => "colorMode", Int;
    BailoutStyle => "bailoutStyle", Int;
    ColorScale => "colorScale", Float;
    ColorCycle => "colorCycle", Float;
    ColorCycleOffset => "colorCycleOffset", Float;
    ColorCycleMirror => "colorCycleMirror", Bool;
    Hsv => "hsv", Bool;
    IterationColorBlend => "iterationColorBlend", Float;
    ColorIterations => "colorIterations", Int;
    Color1 => "color1", Vec3;
    Color2 => "color2", Vec3;
    Color3 => "color3", Vec3;
    Transparent => "transparent", Bool;
    Gamma => "gamma", Float;
    OrbitTrap => "orbitTrap", Int;
    OrbitTrapOffset => "orbitTrapOffset", Vec2;
    OrbitTrapScale => "orbitTrapScale", Float;
    OrbitTrapEdgeDetail => "orbitTrapEdgeDetail", Float;
    OrbitTrapRotation => "orbitTrapRotation", Float;
    OrbitTrapSpin => "orbitTrapSpin", Float;
    Rotation => "rotation", Float;
    CameraPosition => "cameraPosition", Vec3;
    Size => "size", Vec2;
    OutputSize => "outputSize", Vec2;
}

/// Julia constant installed when switching into Julia mode.
pub const DEFAULT_JULIA_CONSTANT: [f32; 2] = [-0.8, 0.156];

impl Parameter {
    pub fn default_value(self, mode: FractalMode) -> UniformValue {
        use UniformValue::{Bool, Float, Int, Vec2, Vec3};
        match self {
            Parameter::Fractal => Int(0),
            Parameter::MaxIterations => Int(50),
            Parameter::AntialiasingOn => Bool(false),
            Parameter::Scale => Float(2.0),
            Parameter::Power => Float(2.0),
            Parameter::Bailout => Float(4.0),
            Parameter::MinIterations => Int(1),
            Parameter::JuliaMode => Bool(mode == FractalMode::Julia),
            Parameter::Offset => match mode {
                FractalMode::Mandelbrot => Vec2([0.36, 0.06]),
                FractalMode::Julia => Vec2(DEFAULT_JULIA_CONSTANT),
            },
            Parameter::ColorMode => Int(0),
            Parameter::BailoutStyle => Int(0),
            Parameter::ColorScale => Float(1.0),
            Parameter::ColorCycle => Float(1.0),
            Parameter::ColorCycleOffset => Float(0.0),
            Parameter::ColorCycleMirror => Bool(true),
            Parameter::Hsv => Bool(false),
            Parameter::IterationColorBlend => Float(0.0),
            Parameter::ColorIterations => Int(4),
            Parameter::Color1 => Vec3([1.0, 1.0, 1.0]),
            Parameter::Color2 => Vec3([0.0, 0.53, 0.8]),
            Parameter::Color3 => Vec3([0.0, 0.0, 0.0]),
            Parameter::Transparent => Bool(false),
            Parameter::Gamma => Float(1.0),
            Parameter::OrbitTrap => Int(0),
            Parameter::OrbitTrapOffset => Vec2([0.0, 0.0]),
            Parameter::OrbitTrapScale => Float(1.0),
            Parameter::OrbitTrapEdgeDetail => Float(0.5),
            Parameter::OrbitTrapRotation => Float(0.0),
            Parameter::OrbitTrapSpin => Float(0.0),
            Parameter::Rotation => Float(0.0),
            Parameter::CameraPosition => Vec3([-0.5, 0.0, 2.5]),
            Parameter::Size => Vec2([400.0, 300.0]),
            Parameter::OutputSize => Vec2([800.0, 600.0]),
        }
    }

    /// Human label used by the on-screen parameter dump; `None` for
    /// parameters that are not listed there.
    pub fn label(self) -> Option<&'static str> {
        let label = match self {
            Parameter::Fractal => "Type",
            Parameter::MaxIterations => "Max Iterations",
            Parameter::AntialiasingOn => "Antialiasing?",
            Parameter::Scale => "Scale",
            Parameter::Power => "Power",
            Parameter::Bailout => "Bailout value",
            Parameter::MinIterations => "Min iterations",
            Parameter::JuliaMode => "Julia mode?",
            Parameter::Offset => "Offset",
            Parameter::ColorMode => "Color Mode",
            Parameter::BailoutStyle => "Bailout style",
            Parameter::ColorScale => "Color scale",
            Parameter::ColorCycle => "Color cycle",
            Parameter::ColorCycleOffset => "Color cycle offset",
            Parameter::ColorCycleMirror => "Mirror colors?",
            Parameter::Hsv => "Rainbow mode?",
            Parameter::IterationColorBlend => "Iteration color blend",
            Parameter::ColorIterations => "Color iterations",
            Parameter::Gamma => "Gamma correction",
            Parameter::Rotation => "Rotation",
            _ => return None,
        };
        Some(label)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Parameter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Parameter::from_name(value).ok_or_else(|| format!("unknown parameter '{value}'"))
    }
}

/// Name of the fractal family selected by the `fractal` uniform.
pub fn fractal_type_label(index: i32) -> &'static str {
    match index {
        1 => "Orbit Trap",
        2 => "Ducks",
        _ => "Mandelbrot",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_every_uniform_once() {
        assert_eq!(Parameter::ALL.len(), 33);
        let mut names: Vec<_> = Parameter::ALL.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 33);
    }

    #[test]
    fn names_round_trip() {
        for parameter in Parameter::ALL {
            assert_eq!(Parameter::from_name(parameter.name()), Some(*parameter));
        }
        assert_eq!(Parameter::from_name("doesNotExist"), None);
    }

    #[test]
    fn defaults_match_declared_kinds() {
        for mode in [FractalMode::Mandelbrot, FractalMode::Julia] {
            for parameter in Parameter::ALL {
                assert_eq!(
                    parameter.default_value(mode).kind(),
                    parameter.kind(),
                    "{parameter}"
                );
            }
        }
    }

    #[test]
    fn julia_defaults_switch_mode_and_constant() {
        assert_eq!(
            Parameter::JuliaMode.default_value(FractalMode::Julia),
            UniformValue::Bool(true)
        );
        assert_eq!(
            Parameter::Offset.default_value(FractalMode::Julia),
            UniformValue::Vec2(DEFAULT_JULIA_CONSTANT)
        );
        assert_eq!(
            Parameter::MaxIterations.default_value(FractalMode::Julia),
            Parameter::MaxIterations.default_value(FractalMode::Mandelbrot)
        );
    }

    #[test]
    fn coercion_bridges_int_and_bool() {
        assert_eq!(
            UniformValue::Int(1).coerce(UniformKind::Bool),
            Some(UniformValue::Bool(true))
        );
        assert_eq!(
            UniformValue::Bool(false).coerce(UniformKind::Int),
            Some(UniformValue::Int(0))
        );
        assert_eq!(UniformValue::Vec2([0.0, 1.0]).coerce(UniformKind::Float), None);
    }

    #[test]
    fn display_formats_for_humans() {
        assert_eq!(UniformValue::Bool(true).to_string(), "on");
        assert_eq!(UniformValue::Float(2.0).to_string(), "2.000");
        assert_eq!(UniformValue::Vec2([0.36, 0.06]).to_string(), "(0.360, 0.060)");
    }
}
