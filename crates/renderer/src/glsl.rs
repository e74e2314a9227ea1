//! GLSL front end shared by both devices.
//!
//! Sources are parsed and validated with naga, which also gives us the
//! diagnostics text and the reflected layout of the parameter block.
//! Programs expose a single `layout(set = 0, binding = 0) uniform` block;
//! booleans inside it are declared as `int`. The colour table sits beside it
//! as a `readonly buffer` at binding 1: a `uint` entry count followed by one
//! `vec4` per colour.

use std::collections::BTreeMap;

use fractal::{Rgb, UniformKind, UniformValue};
use wgpu::naga;

use crate::device::{DeviceError, StageKind, UniformLocation};

/// Reflected interface of a single compiled stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageInterface {
    pub uniforms: BTreeMap<String, UniformLocation>,
    pub block_size: u32,
    pub inputs: BTreeMap<u32, String>,
    pub outputs: BTreeMap<u32, String>,
}

/// Uniform layout of a linked program.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgramLayout {
    pub uniforms: BTreeMap<String, UniformLocation>,
    pub block_size: u32,
}

impl ProgramLayout {
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Size rounded up to a 16-byte multiple, never zero.
    pub fn buffer_size(&self) -> u64 {
        u64::from(self.block_size.max(16).div_ceil(16) * 16)
    }
}

fn naga_stage(kind: StageKind) -> naga::ShaderStage {
    match kind {
        StageKind::Vertex => naga::ShaderStage::Vertex,
        StageKind::Fragment => naga::ShaderStage::Fragment,
    }
}

/// Parses and validates one stage. Errors carry the front end's text verbatim.
pub fn compile_stage(kind: StageKind, source: &str) -> Result<StageInterface, String> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga_stage(kind));
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| errors.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| err.emit_to_string(source))?;

    Ok(reflect(&module))
}

fn reflect(module: &naga::Module) -> StageInterface {
    let mut interface = StageInterface::default();

    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        let ty = &module.types[global.ty];
        let naga::TypeInner::Struct { members, span } = &ty.inner else {
            continue;
        };
        interface.block_size = *span;
        for member in members {
            let Some(name) = member.name.as_ref() else {
                continue;
            };
            match uniform_kind(&module.types[member.ty].inner) {
                Some(kind) => {
                    interface.uniforms.insert(
                        name.clone(),
                        UniformLocation {
                            kind,
                            offset: member.offset,
                        },
                    );
                }
                None => {
                    tracing::debug!(uniform = %name, "skipping uniform with unsupported type");
                }
            }
        }
    }

    if let Some(entry) = module.entry_points.first() {
        for argument in &entry.function.arguments {
            collect_location(
                module,
                argument.binding.as_ref(),
                argument.ty,
                &mut interface.inputs,
            );
        }
        if let Some(result) = entry.function.result.as_ref() {
            match &module.types[result.ty].inner {
                naga::TypeInner::Struct { members, .. } => {
                    for member in members {
                        collect_location(
                            module,
                            member.binding.as_ref(),
                            member.ty,
                            &mut interface.outputs,
                        );
                    }
                }
                _ => collect_location(
                    module,
                    result.binding.as_ref(),
                    result.ty,
                    &mut interface.outputs,
                ),
            }
        }
    }

    interface
}

fn collect_location(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
    into: &mut BTreeMap<u32, String>,
) {
    if let Some(naga::Binding::Location { location, .. }) = binding {
        into.insert(*location, format!("{:?}", module.types[ty].inner));
    }
}

fn uniform_kind(inner: &naga::TypeInner) -> Option<UniformKind> {
    use naga::{ScalarKind, TypeInner, VectorSize};
    match inner {
        TypeInner::Scalar(scalar) => match (scalar.kind, scalar.width) {
            (ScalarKind::Float, 4) => Some(UniformKind::Float),
            (ScalarKind::Sint | ScalarKind::Uint, 4) => Some(UniformKind::Int),
            _ => None,
        },
        TypeInner::Vector { size, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
        {
            match size {
                VectorSize::Bi => Some(UniformKind::Vec2),
                VectorSize::Tri => Some(UniformKind::Vec3),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Checks that the two stages agree and merges their uniform tables.
///
/// Every fragment input location must be written by the vertex stage with
/// the same type, and a uniform declared in both stages must sit at the same
/// offset with the same type.
pub fn link_stages(
    vertex: &StageInterface,
    fragment: &StageInterface,
) -> Result<ProgramLayout, String> {
    let mut problems = Vec::new();
    for (location, ty) in &fragment.inputs {
        match vertex.outputs.get(location) {
            None => problems.push(format!(
                "fragment input at location {location} is not written by the vertex stage"
            )),
            Some(written) if written != ty => problems.push(format!(
                "location {location} type mismatch: vertex writes {written}, fragment reads {ty}"
            )),
            Some(_) => {}
        }
    }

    let mut uniforms = vertex.uniforms.clone();
    for (name, location) in &fragment.uniforms {
        match uniforms.get(name) {
            Some(existing) if existing != location => problems.push(format!(
                "uniform '{name}' differs between stages ({existing:?} vs {location:?})"
            )),
            Some(_) => {}
            None => {
                uniforms.insert(name.clone(), *location);
            }
        }
    }

    if !problems.is_empty() {
        return Err(problems.join("\n"));
    }

    Ok(ProgramLayout {
        uniforms,
        block_size: vertex.block_size.max(fragment.block_size),
    })
}

/// Encodes `value` for a slot of kind `slot`. Booleans and integer-valued
/// floats are converted to the slot's storage type.
pub fn encode(value: UniformValue, slot: UniformKind) -> Result<Vec<u8>, DeviceError> {
    let storage = if slot == UniformKind::Bool {
        UniformKind::Int
    } else {
        slot
    };
    let value = value
        .coerce(storage)
        .ok_or_else(|| DeviceError::KindMismatch {
            value: value.kind(),
            slot,
        })?;
    let bytes = match value {
        UniformValue::Float(v) => bytemuck::bytes_of(&v).to_vec(),
        UniformValue::Int(v) => bytemuck::bytes_of(&v).to_vec(),
        UniformValue::Bool(v) => bytemuck::bytes_of(&i32::from(v)).to_vec(),
        UniformValue::Vec2(v) => bytemuck::cast_slice(&v).to_vec(),
        UniformValue::Vec3(v) => bytemuck::cast_slice(&v).to_vec(),
    };
    Ok(bytes)
}

/// Byte width of a slot's storage.
pub fn storage_size(kind: UniformKind) -> u32 {
    match kind {
        UniformKind::Float | UniformKind::Int | UniformKind::Bool => 4,
        UniformKind::Vec2 => 8,
        UniformKind::Vec3 => 12,
    }
}

/// Binding of the palette block inside set 0.
pub const PALETTE_BINDING: u32 = 1;

/// Bytes ahead of the first palette entry: the count, padded to `vec4` alignment.
pub const PALETTE_HEADER: usize = 16;
const PALETTE_STRIDE: usize = 16;

/// Packs `colors` into the std430 palette block. An empty table still gets
/// one zeroed entry so the binding is never smaller than the block.
pub fn encode_palette(colors: &[Rgb]) -> Vec<u8> {
    let entries = colors.len().max(1);
    let mut bytes = Vec::with_capacity(PALETTE_HEADER + entries * PALETTE_STRIDE);
    bytes.extend_from_slice(bytemuck::bytes_of(&(colors.len() as u32)));
    bytes.resize(PALETTE_HEADER, 0);
    for color in colors {
        let [r, g, b] = color.to_unit();
        bytes.extend_from_slice(bytemuck::cast_slice(&[r, g, b, 1.0f32]));
    }
    bytes.resize(PALETTE_HEADER + entries * PALETTE_STRIDE, 0);
    bytes
}

pub fn decode(bytes: &[u8], kind: UniformKind) -> Option<UniformValue> {
    let size = storage_size(kind) as usize;
    let bytes = bytes.get(..size)?;
    let value = match kind {
        UniformKind::Float => UniformValue::Float(bytemuck::pod_read_unaligned(bytes)),
        UniformKind::Int | UniformKind::Bool => {
            UniformValue::Int(bytemuck::pod_read_unaligned(bytes))
        }
        UniformKind::Vec2 => UniformValue::Vec2(bytemuck::pod_read_unaligned(bytes)),
        UniformKind::Vec3 => UniformValue::Vec3(bytemuck::pod_read_unaligned(bytes)),
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};

    #[test]
    fn bundled_fragment_reflects_parameter_block() {
        let interface = compile_stage(StageKind::Fragment, FRAGMENT_SHADER).unwrap();
        let max_iterations = interface.uniforms.get("maxIterations").copied().unwrap();
        assert_eq!(max_iterations.kind, UniformKind::Int);
        let offset = interface.uniforms.get("offset").copied().unwrap();
        assert_eq!(offset.kind, UniformKind::Vec2);
        assert_eq!(offset.offset % 8, 0);
        let color = interface.uniforms.get("color1").copied().unwrap();
        assert_eq!(color.kind, UniformKind::Vec3);
        assert_eq!(color.offset % 16, 0);
        assert!(interface.inputs.contains_key(&0));
    }

    #[test]
    fn bundled_pair_links() {
        let vertex = compile_stage(StageKind::Vertex, VERTEX_SHADER).unwrap();
        let fragment = compile_stage(StageKind::Fragment, FRAGMENT_SHADER).unwrap();
        let layout = link_stages(&vertex, &fragment).unwrap();
        assert!(layout.location("planeMin").is_some());
        assert_eq!(layout.buffer_size() % 16, 0);
    }

    #[test]
    fn syntax_errors_are_reported_as_text() {
        let log = compile_stage(StageKind::Fragment, "#version 450\nvoid main() { nope }")
            .unwrap_err();
        assert!(!log.is_empty());
    }

    #[test]
    fn unmatched_fragment_input_fails_link() {
        let vertex = StageInterface::default();
        let mut fragment = StageInterface::default();
        fragment.inputs.insert(3, "Vector".into());
        let log = link_stages(&vertex, &fragment).unwrap_err();
        assert!(log.contains("location 3"));
    }

    #[test]
    fn bool_values_encode_as_int() {
        let bytes = encode(UniformValue::Bool(true), UniformKind::Int).unwrap();
        assert_eq!(decode(&bytes, UniformKind::Int), Some(UniformValue::Int(1)));
    }

    #[test]
    fn palette_block_holds_count_then_rgba_entries() {
        let bytes = encode_palette(&[Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)]);
        assert_eq!(bytes.len(), PALETTE_HEADER + 2 * 16);
        let count: u32 = bytemuck::pod_read_unaligned(&bytes[..4]);
        assert_eq!(count, 2);
        let second: [f32; 4] = bytemuck::pod_read_unaligned(&bytes[PALETTE_HEADER + 16..]);
        assert_eq!(second, [0.0, 0.0, 1.0, 1.0]);

        let empty = encode_palette(&[]);
        assert_eq!(empty.len(), PALETTE_HEADER + 16);
        assert!(empty.iter().all(|&b| b == 0));
    }

    #[test]
    fn bundled_fragment_keeps_palette_out_of_the_parameter_block() {
        let interface = compile_stage(StageKind::Fragment, FRAGMENT_SHADER).unwrap();
        assert!(interface.uniforms.get("paletteSize").is_none());
        assert!(interface.uniforms.get("paletteColors").is_none());
    }

    #[test]
    fn vector_into_scalar_slot_is_rejected() {
        assert!(matches!(
            encode(UniformValue::Vec2([1.0, 2.0]), UniformKind::Float),
            Err(DeviceError::KindMismatch { .. })
        ));
    }
}
