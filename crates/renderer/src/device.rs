//! Driver-level shader object model.
//!
//! [`ShaderDevice`] mirrors the classic create/compile/link/use lifecycle:
//! shader and program objects are opaque integer handles owned by the device,
//! and uniforms are addressed through locations looked up by name. The
//! [`ShaderProgramManager`](crate::program::ShaderProgramManager) is the only
//! intended caller; it wraps the raw handles in owning types.

use std::fmt;

use fractal::{Rgb, SurfaceSize, UniformKind, UniformValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw shader object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Raw program object name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Where a uniform lives inside a linked program's parameter block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    /// Storage type declared in the shader. Booleans are stored as `Int`.
    pub kind: UniformKind,
    /// Byte offset inside the block.
    pub offset: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("unknown shader object {0:?}")]
    UnknownShader(ShaderId),
    #[error("unknown program object {0:?}")]
    UnknownProgram(ProgramId),
    #[error("program {0:?} is not linked")]
    NotLinked(ProgramId),
    #[error("value of kind {value} does not fit uniform of kind {slot}")]
    KindMismatch {
        value: UniformKind,
        slot: UniformKind,
    },
    #[error("uniform offset {offset} is outside the {size}-byte block")]
    OutOfBounds { offset: u32, size: u32 },
    #[error("palette of {entries} entries needs {bytes} bytes, more than the device allows")]
    PaletteTooLarge { entries: usize, bytes: u64 },
    #[error("GPU error: {0}")]
    Gpu(String),
}

pub trait ShaderDevice {
    fn create_shader(&mut self, kind: StageKind) -> ShaderId;

    /// Compiles `source` into `shader`. On failure returns the driver log verbatim.
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String>;

    fn delete_shader(&mut self, shader: ShaderId);

    fn create_program(&mut self) -> ProgramId;

    /// Links two compiled shaders into `program`. On failure returns the driver log verbatim.
    fn link_program(
        &mut self,
        program: ProgramId,
        vertex: ShaderId,
        fragment: ShaderId,
    ) -> Result<(), String>;

    fn delete_program(&mut self, program: ProgramId);

    /// Binds `program` (or nothing) as the current program.
    fn use_program(&mut self, program: Option<ProgramId>);

    fn current_program(&self) -> Option<ProgramId>;

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    fn write_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), DeviceError>;

    /// Reads the value currently held by the program's uniform state.
    fn read_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
    ) -> Result<UniformValue, DeviceError>;

    /// Replaces the colour table the fragment stage indexes into. The table
    /// belongs to the device and is shared by every program on it.
    fn upload_palette(&mut self, colors: &[Rgb]) -> Result<(), DeviceError>;

    /// Issues one full-screen draw with the bound program.
    fn draw(&mut self) -> Result<(), DeviceError>;

    /// Called when the surface changes size. Devices without a render
    /// target of their own ignore it.
    fn resize(&mut self, _size: SurfaceSize) {}
}
