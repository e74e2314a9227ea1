use crate::complex::Complex;
use crate::escape::{BailoutStyle, EscapeParams, FractalMode};
use crate::params::{Parameter, UniformValue};
use crate::trap::{OrbitTrap, TrapShape};

/// Fractal family selected by the `fractal` uniform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FractalKind {
    #[default]
    EscapeTime,
    OrbitTrap,
    Ducks,
}

impl FractalKind {
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::OrbitTrap,
            2 => Self::Ducks,
            _ => Self::EscapeTime,
        }
    }
}

/// Typed snapshot of every parameter, as consumed by the CPU renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub kind: FractalKind,
    pub max_iterations: u32,
    pub antialiasing: bool,
    pub scale: f32,
    pub power: f32,
    pub bailout: f32,
    pub min_iterations: u32,
    pub julia: bool,
    pub offset: [f32; 2],
    pub color_mode: i32,
    pub bailout_style: BailoutStyle,
    pub color_scale: f32,
    pub color_cycle: f32,
    pub color_cycle_offset: f32,
    pub color_cycle_mirror: bool,
    pub hsv: bool,
    pub iteration_color_blend: f32,
    pub color_iterations: u32,
    pub colors: [[f32; 3]; 3],
    pub transparent: bool,
    pub gamma: f32,
    pub trap_shape: TrapShape,
    pub trap_offset: [f32; 2],
    pub trap_scale: f32,
    pub trap_edge_detail: f32,
    pub trap_rotation: f32,
    pub trap_spin: f32,
    pub rotation: f32,
}

impl RenderSettings {
    pub fn defaults(mode: FractalMode) -> Self {
        Self::from_lookup(|parameter| Some(parameter.default_value(mode)))
    }

    /// Builds a snapshot from a value source. Missing or mistyped entries fall
    /// back to the Mandelbrot defaults.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(Parameter) -> Option<UniformValue>,
    {
        let mut read = |parameter: Parameter| {
            lookup(parameter)
                .and_then(|v| v.coerce(parameter.kind()))
                .unwrap_or_else(|| parameter.default_value(FractalMode::Mandelbrot))
        };
        let float = |v: UniformValue| v.as_float().unwrap_or_default();
        let int = |v: UniformValue| v.as_int().unwrap_or_default();
        let boolean = |v: UniformValue| v.as_bool().unwrap_or_default();
        let vec2 = |v: UniformValue| v.as_vec2().unwrap_or_default();
        let vec3 = |v: UniformValue| v.as_vec3().unwrap_or_default();
        let count = |v: UniformValue| int(v).max(0) as u32;

        Self {
            kind: FractalKind::from_index(int(read(Parameter::Fractal))),
            max_iterations: count(read(Parameter::MaxIterations)),
            antialiasing: boolean(read(Parameter::AntialiasingOn)),
            scale: float(read(Parameter::Scale)),
            power: float(read(Parameter::Power)),
            bailout: float(read(Parameter::Bailout)),
            min_iterations: count(read(Parameter::MinIterations)),
            julia: boolean(read(Parameter::JuliaMode)),
            offset: vec2(read(Parameter::Offset)),
            color_mode: int(read(Parameter::ColorMode)),
            bailout_style: BailoutStyle::from_index(int(read(Parameter::BailoutStyle))),
            color_scale: float(read(Parameter::ColorScale)),
            color_cycle: float(read(Parameter::ColorCycle)),
            color_cycle_offset: float(read(Parameter::ColorCycleOffset)),
            color_cycle_mirror: boolean(read(Parameter::ColorCycleMirror)),
            hsv: boolean(read(Parameter::Hsv)),
            iteration_color_blend: float(read(Parameter::IterationColorBlend)),
            color_iterations: count(read(Parameter::ColorIterations)),
            colors: [
                vec3(read(Parameter::Color1)),
                vec3(read(Parameter::Color2)),
                vec3(read(Parameter::Color3)),
            ],
            transparent: boolean(read(Parameter::Transparent)),
            gamma: float(read(Parameter::Gamma)),
            trap_shape: TrapShape::from_index(int(read(Parameter::OrbitTrap))),
            trap_offset: vec2(read(Parameter::OrbitTrapOffset)),
            trap_scale: float(read(Parameter::OrbitTrapScale)),
            trap_edge_detail: float(read(Parameter::OrbitTrapEdgeDetail)),
            trap_rotation: float(read(Parameter::OrbitTrapRotation)),
            trap_spin: float(read(Parameter::OrbitTrapSpin)),
            rotation: float(read(Parameter::Rotation)),
        }
    }

    pub fn mode(&self) -> FractalMode {
        if self.julia {
            FractalMode::Julia
        } else {
            FractalMode::Mandelbrot
        }
    }

    pub fn julia_constant(&self) -> Complex {
        Complex::new(f64::from(self.offset[0]), f64::from(self.offset[1]))
    }

    pub fn orbit_trap(&self) -> Option<OrbitTrap> {
        (self.kind == FractalKind::OrbitTrap).then(|| OrbitTrap {
            shape: self.trap_shape,
            offset: Complex::new(f64::from(self.trap_offset[0]), f64::from(self.trap_offset[1])),
            scale: f64::from(self.trap_scale),
            rotation_deg: f64::from(self.trap_rotation),
            spin_deg: f64::from(self.trap_spin),
        })
    }

    pub fn escape_params(&self) -> EscapeParams {
        EscapeParams {
            power: f64::from(self.power),
            bailout: f64::from(self.bailout),
            max_iterations: self.max_iterations,
            style: self.bailout_style,
            trap: self.orbit_trap(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::defaults(FractalMode::Mandelbrot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_decode_typed_fields() {
        let settings = RenderSettings::default();
        assert_eq!(settings.kind, FractalKind::EscapeTime);
        assert_eq!(settings.max_iterations, 50);
        assert_eq!(settings.color_iterations, 4);
        assert!(settings.color_cycle_mirror);
        assert!(!settings.julia);
        assert_eq!(settings.colors[1], [0.0, 0.53, 0.8]);
        assert!(settings.orbit_trap().is_none());
    }

    #[test]
    fn lookup_accepts_int_encoded_bools() {
        let settings = RenderSettings::from_lookup(|p| match p {
            Parameter::JuliaMode => Some(UniformValue::Int(1)),
            Parameter::Fractal => Some(UniformValue::Int(1)),
            _ => None,
        });
        assert_eq!(settings.mode(), FractalMode::Julia);
        assert!(settings.escape_params().trap.is_some());
    }

    #[test]
    fn mistyped_values_fall_back_to_defaults() {
        let settings = RenderSettings::from_lookup(|p| match p {
            Parameter::Power => Some(UniformValue::Vec3([1.0, 2.0, 3.0])),
            _ => None,
        });
        assert_eq!(settings.power, 2.0);
    }
}
