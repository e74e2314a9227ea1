//! Named, typed fractal parameters mirrored into the active program.
//!
//! Internally parameters are the closed [`Parameter`] enumeration. The
//! string-keyed setters are the boundary to the shader: a name the program
//! does not declare is silently ignored, and getters always read back what
//! the program actually holds.

use fractal::{FractalMode, Parameter, RenderSettings, UniformKind, UniformValue};

use crate::program::UniformTarget;

/// One registry entry. `value` is the last value written through the registry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformDescriptor {
    pub parameter: Parameter,
    pub value: UniformValue,
}

impl UniformDescriptor {
    pub fn name(&self) -> &'static str {
        self.parameter.name()
    }

    pub fn kind(&self) -> UniformKind {
        self.parameter.kind()
    }
}

#[derive(Clone, Debug)]
pub struct ParameterRegistry {
    entries: Vec<UniformDescriptor>,
    mode: FractalMode,
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::new(FractalMode::Mandelbrot)
    }
}

impl ParameterRegistry {
    pub fn new(mode: FractalMode) -> Self {
        let entries = Parameter::ALL
            .iter()
            .map(|&parameter| UniformDescriptor {
                parameter,
                value: parameter.default_value(mode),
            })
            .collect();
        Self { entries, mode }
    }

    /// Entries in registry order.
    pub fn entries(&self) -> &[UniformDescriptor] {
        &self.entries
    }

    pub fn mode(&self) -> FractalMode {
        self.mode
    }

    pub fn descriptor(&self, parameter: Parameter) -> &UniformDescriptor {
        // ALL and entries share ordering, and the enum is declared in that order.
        &self.entries[parameter as usize]
    }

    /// Writes the default of every parameter for `mode` to the target.
    pub fn apply_defaults<T: UniformTarget + ?Sized>(&mut self, target: &mut T, mode: FractalMode) {
        self.mode = mode;
        for &parameter in Parameter::ALL {
            self.set(target, parameter, parameter.default_value(mode));
        }
        tracing::debug!(mode = %mode, "applied parameter defaults");
    }

    pub fn set<T: UniformTarget + ?Sized>(
        &mut self,
        target: &mut T,
        parameter: Parameter,
        value: UniformValue,
    ) {
        let Some(value) = value.coerce(parameter.kind()) else {
            tracing::warn!(
                parameter = %parameter,
                expected = %parameter.kind(),
                got = %value.kind(),
                "ignoring value of the wrong kind"
            );
            return;
        };
        self.entries[parameter as usize].value = value;
        if parameter == Parameter::JuliaMode {
            if let Some(julia) = value.as_bool() {
                self.mode = if julia {
                    FractalMode::Julia
                } else {
                    FractalMode::Mandelbrot
                };
            }
        }
        push(target, parameter.name(), value);
    }

    /// Reads back the value the program holds, if it declares the parameter.
    pub fn get<T: UniformTarget + ?Sized>(
        &self,
        target: &mut T,
        parameter: Parameter,
    ) -> Option<UniformValue> {
        target
            .read_uniform(parameter.name())
            .and_then(|value| value.coerce(parameter.kind()))
    }

    pub fn set_float<T: UniformTarget + ?Sized>(&mut self, target: &mut T, name: &str, value: f32) {
        self.set_by_name(target, name, UniformValue::Float(value));
    }

    pub fn set_vec2<T: UniformTarget + ?Sized>(
        &mut self,
        target: &mut T,
        name: &str,
        value: [f32; 2],
    ) {
        self.set_by_name(target, name, UniformValue::Vec2(value));
    }

    pub fn set_vec3<T: UniformTarget + ?Sized>(
        &mut self,
        target: &mut T,
        name: &str,
        value: [f32; 3],
    ) {
        self.set_by_name(target, name, UniformValue::Vec3(value));
    }

    pub fn set_int<T: UniformTarget + ?Sized>(&mut self, target: &mut T, name: &str, value: i32) {
        self.set_by_name(target, name, UniformValue::Int(value));
    }

    /// Flips a boolean parameter and returns the new state. Unknown names
    /// leave everything untouched and return `None`.
    pub fn toggle_bool<T: UniformTarget + ?Sized>(
        &mut self,
        target: &mut T,
        name: &str,
    ) -> Option<bool> {
        let current = target.read_uniform(name)?.as_bool()?;
        self.set_by_name(target, name, UniformValue::Bool(!current));
        Some(!current)
    }

    pub fn get_float<T: UniformTarget + ?Sized>(&self, target: &mut T, name: &str) -> Option<f32> {
        target.read_uniform(name)?.as_float()
    }

    pub fn get_int<T: UniformTarget + ?Sized>(&self, target: &mut T, name: &str) -> Option<i32> {
        target.read_uniform(name)?.as_int()
    }

    pub fn get_bool<T: UniformTarget + ?Sized>(&self, target: &mut T, name: &str) -> Option<bool> {
        target.read_uniform(name)?.as_bool()
    }

    pub fn get_vec2<T: UniformTarget + ?Sized>(
        &self,
        target: &mut T,
        name: &str,
    ) -> Option<[f32; 2]> {
        target.read_uniform(name)?.as_vec2()
    }

    pub fn get_vec3<T: UniformTarget + ?Sized>(
        &self,
        target: &mut T,
        name: &str,
    ) -> Option<[f32; 3]> {
        target.read_uniform(name)?.as_vec3()
    }

    /// Snapshot of the values held by the program, for the CPU renderer.
    pub fn settings<T: UniformTarget + ?Sized>(&self, target: &mut T) -> RenderSettings {
        RenderSettings::from_lookup(|parameter| self.get(target, parameter))
    }

    /// String-keyed write of an already typed value. Catalogued names go
    /// through [`set`](Self::set); anything else is handed to the program as is.
    pub fn set_by_name<T: UniformTarget + ?Sized>(
        &mut self,
        target: &mut T,
        name: &str,
        value: UniformValue,
    ) {
        match Parameter::from_name(name) {
            Some(parameter) => self.set(target, parameter, value),
            None => push(target, name, value),
        }
    }
}

fn push<T: UniformTarget + ?Sized>(target: &mut T, name: &str, value: UniformValue) {
    match target.write_uniform(name, value) {
        Ok(true) => {}
        Ok(false) => tracing::trace!(uniform = name, "uniform not declared by program"),
        Err(err) => tracing::warn!(uniform = name, error = %err, "failed to write uniform"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::device::DeviceError;

    /// Target that only declares the names it was created with.
    #[derive(Default)]
    struct Recorder {
        declared: HashMap<String, UniformValue>,
        writes: usize,
    }

    impl Recorder {
        fn declaring(names: &[&str]) -> Self {
            let declared = names
                .iter()
                .map(|name| (name.to_string(), UniformValue::Int(0)))
                .collect();
            Self {
                declared,
                writes: 0,
            }
        }
    }

    impl UniformTarget for Recorder {
        fn write_uniform(&mut self, name: &str, value: UniformValue) -> Result<bool, DeviceError> {
            match self.declared.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    self.writes += 1;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn read_uniform(&mut self, name: &str) -> Option<UniformValue> {
            self.declared.get(name).copied()
        }
    }

    #[test]
    fn entries_follow_declaration_order() {
        let registry = ParameterRegistry::default();
        let names: Vec<_> = registry.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names.first(), Some(&"fractal"));
        assert_eq!(names.last(), Some(&"outputSize"));
        assert_eq!(names.len(), 33);
        assert_eq!(
            registry.descriptor(Parameter::Offset).parameter,
            Parameter::Offset
        );
    }

    #[test]
    fn unknown_names_change_nothing() {
        let mut target = Recorder::declaring(&["power"]);
        let mut registry = ParameterRegistry::default();
        let before = registry.entries().to_vec();
        registry.set_float(&mut target, "doesNotExist", 1.0);
        assert_eq!(registry.entries(), &before[..]);
        assert_eq!(target.writes, 0);
        assert_eq!(registry.get_float(&mut target, "doesNotExist"), None);
        assert_eq!(registry.toggle_bool(&mut target, "doesNotExist"), None);
    }

    #[test]
    fn getters_read_the_target_not_the_registry() {
        let mut target = Recorder::declaring(&["power"]);
        let mut registry = ParameterRegistry::default();
        registry.set_float(&mut target, "power", 3.0);
        target
            .declared
            .insert("power".into(), UniformValue::Float(5.0));
        assert_eq!(registry.get_float(&mut target, "power"), Some(5.0));
        assert_eq!(
            registry.descriptor(Parameter::Power).value,
            UniformValue::Float(3.0)
        );
    }

    #[test]
    fn toggling_flips_and_tracks_julia_mode() {
        let mut target = Recorder::declaring(&["juliaMode"]);
        let mut registry = ParameterRegistry::default();
        registry.apply_defaults(&mut target, FractalMode::Mandelbrot);
        assert_eq!(registry.toggle_bool(&mut target, "juliaMode"), Some(true));
        assert_eq!(registry.mode(), FractalMode::Julia);
        assert_eq!(registry.get_bool(&mut target, "juliaMode"), Some(true));
    }

    #[test]
    fn wrong_kind_is_ignored() {
        let mut target = Recorder::declaring(&["offset"]);
        let mut registry = ParameterRegistry::default();
        registry.set_float(&mut target, "offset", 1.0);
        assert_eq!(target.writes, 0);
    }

    #[test]
    fn julia_defaults_install_the_julia_constant() {
        let mut target = Recorder::declaring(&["offset", "juliaMode"]);
        let mut registry = ParameterRegistry::default();
        registry.apply_defaults(&mut target, FractalMode::Julia);
        assert_eq!(
            registry.get_vec2(&mut target, "offset"),
            Some(fractal::params::DEFAULT_JULIA_CONSTANT)
        );
        assert_eq!(registry.mode(), FractalMode::Julia);
    }
}
