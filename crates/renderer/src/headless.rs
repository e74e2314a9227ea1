use std::collections::HashMap;

use fractal::{Rgb, SurfaceSize, UniformValue};

use crate::device::{
    DeviceError, ProgramId, ShaderDevice, ShaderId, StageKind, UniformLocation,
};
use crate::glsl::{self, ProgramLayout, StageInterface};

struct ShaderObject {
    kind: StageKind,
    interface: Option<StageInterface>,
}

#[derive(Default)]
struct ProgramObject {
    layout: Option<ProgramLayout>,
    block: Vec<u8>,
}

/// Device without a GPU behind it.
///
/// Shaders go through the same naga front end as [`WgpuDevice`](crate::gpu::WgpuDevice),
/// so compile and link diagnostics match; uniform blocks and the palette are
/// kept in host memory and draws are only counted.
#[derive(Default)]
pub struct HeadlessDevice {
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    bound: Option<ProgramId>,
    next_id: u32,
    draws: u64,
    target: Option<SurfaceSize>,
    palette: Vec<Rgb>,
    palette_bytes: Vec<u8>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// Colour table from the last [`ShaderDevice::upload_palette`].
    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// The palette as packed for the storage block.
    pub fn palette_block(&self) -> &[u8] {
        &self.palette_bytes
    }

    /// Last size passed to [`ShaderDevice::resize`].
    pub fn target_size(&self) -> Option<SurfaceSize> {
        self.target
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

fn compiled_stage(
    shaders: &HashMap<ShaderId, ShaderObject>,
    id: ShaderId,
    kind: StageKind,
) -> Result<&StageInterface, String> {
    let object = shaders
        .get(&id)
        .ok_or_else(|| format!("invalid shader object {}", id.0))?;
    if object.kind != kind {
        return Err(format!("shader {} is not a {kind} shader", id.0));
    }
    object
        .interface
        .as_ref()
        .ok_or_else(|| format!("{kind} shader {} has not been compiled", id.0))
}

impl ShaderDevice for HeadlessDevice {
    fn create_shader(&mut self, kind: StageKind) -> ShaderId {
        let id = ShaderId(self.next());
        self.shaders.insert(
            id,
            ShaderObject {
                kind,
                interface: None,
            },
        );
        id
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let object = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| format!("invalid shader object {}", shader.0))?;
        let interface = glsl::compile_stage(object.kind, source)?;
        object.interface = Some(interface);
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next());
        self.programs.insert(id, ProgramObject::default());
        id
    }

    fn link_program(
        &mut self,
        program: ProgramId,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<(), String> {
        let layout = glsl::link_stages(
            compiled_stage(&self.shaders, vertex, StageKind::Vertex)?,
            compiled_stage(&self.shaders, fragment, StageKind::Fragment)?,
        )?;

        let object = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("invalid program object {}", program.0))?;
        object.block = vec![0; layout.buffer_size() as usize];
        object.layout = Some(layout);
        Ok(())
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound == Some(program) {
            self.bound = None;
        }
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.bound = program;
    }

    fn current_program(&self) -> Option<ProgramId> {
        self.bound
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(&program)?
            .layout
            .as_ref()?
            .location(name)
    }

    fn write_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), DeviceError> {
        let object = self
            .programs
            .get_mut(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        if object.layout.is_none() {
            return Err(DeviceError::NotLinked(program));
        }
        let bytes = glsl::encode(value, location.kind)?;
        let start = location.offset as usize;
        let size = object.block.len() as u32;
        let target = object
            .block
            .get_mut(start..start + bytes.len())
            .ok_or(DeviceError::OutOfBounds {
                offset: location.offset,
                size,
            })?;
        target.copy_from_slice(&bytes);
        Ok(())
    }

    fn read_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
    ) -> Result<UniformValue, DeviceError> {
        let object = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        if object.layout.is_none() {
            return Err(DeviceError::NotLinked(program));
        }
        object
            .block
            .get(location.offset as usize..)
            .and_then(|bytes| glsl::decode(bytes, location.kind))
            .ok_or(DeviceError::OutOfBounds {
                offset: location.offset,
                size: object.block.len() as u32,
            })
    }

    fn upload_palette(&mut self, colors: &[Rgb]) -> Result<(), DeviceError> {
        self.palette_bytes = glsl::encode_palette(colors);
        self.palette = colors.to_vec();
        Ok(())
    }

    fn draw(&mut self) -> Result<(), DeviceError> {
        let program = self
            .bound
            .ok_or_else(|| DeviceError::Gpu("draw issued with no program bound".into()))?;
        match self.programs.get(&program) {
            Some(object) if object.layout.is_some() => {
                self.draws += 1;
                Ok(())
            }
            Some(_) => Err(DeviceError::NotLinked(program)),
            None => Err(DeviceError::UnknownProgram(program)),
        }
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.target = Some(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
    use fractal::UniformKind;

    fn linked(device: &mut HeadlessDevice) -> ProgramId {
        let vs = device.create_shader(StageKind::Vertex);
        device.compile_shader(vs, VERTEX_SHADER).unwrap();
        let fs = device.create_shader(StageKind::Fragment);
        device.compile_shader(fs, FRAGMENT_SHADER).unwrap();
        let program = device.create_program();
        device.link_program(program, vs, fs).unwrap();
        program
    }

    #[test]
    fn uniform_writes_are_read_back() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);
        let location = device.uniform_location(program, "bailout").unwrap();
        device
            .write_uniform(program, location, UniformValue::Float(9.5))
            .unwrap();
        assert_eq!(
            device.read_uniform(program, location).unwrap(),
            UniformValue::Float(9.5)
        );
    }

    #[test]
    fn unknown_names_have_no_location() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);
        assert!(device.uniform_location(program, "doesNotExist").is_none());
    }

    #[test]
    fn linking_swapped_stages_fails() {
        let mut device = HeadlessDevice::new();
        let vs = device.create_shader(StageKind::Vertex);
        device.compile_shader(vs, VERTEX_SHADER).unwrap();
        let program = device.create_program();
        let log = device.link_program(program, vs, vs).unwrap_err();
        assert!(log.contains("not a fragment shader"));
    }

    #[test]
    fn draw_requires_bound_program() {
        let mut device = HeadlessDevice::new();
        assert!(device.draw().is_err());
        let program = linked(&mut device);
        device.use_program(Some(program));
        device.draw().unwrap();
        assert_eq!(device.draw_count(), 1);
    }

    #[test]
    fn palette_upload_replaces_the_table() {
        let mut device = HeadlessDevice::new();
        assert!(device.palette().is_empty());
        let colors = [Rgb::new(9, 8, 7)];
        device.upload_palette(&colors).unwrap();
        assert_eq!(device.palette(), &colors);
        assert_eq!(device.palette_block(), glsl::encode_palette(&colors).as_slice());
    }

    #[test]
    fn writes_outside_block_are_rejected() {
        let mut device = HeadlessDevice::new();
        let program = linked(&mut device);
        let bogus = UniformLocation {
            kind: UniformKind::Vec3,
            offset: 1 << 20,
        };
        assert!(matches!(
            device.write_uniform(program, bogus, UniformValue::Vec3([0.0; 3])),
            Err(DeviceError::OutOfBounds { .. })
        ));
    }
}
