//! Renderer crate for the fractal explorer.
//!
//! The crate drives a shader program through the classic compile/link/use
//! object model and keeps the fractal parameters mirrored into it. The
//! overall flow is:
//!
//! ```text
//!   window / CLI
//!        │ InputEvent, SessionCommand (via SessionHandle)
//!        ▼
//!   RenderSession::frame ──▶ ParameterRegistry ──▶ ShaderProgramManager ──▶ ShaderDevice
//!        │                        ▲                                           │
//!        └─▶ viewport uniforms ───┘                             HeadlessDevice / WgpuDevice
//! ```
//!
//! [`HeadlessDevice`] validates GLSL and stores uniform blocks in memory, which
//! is enough for tests and diagnostics; [`WgpuDevice`] renders offscreen. The
//! [`cpu`] module renders the same image without a GPU.

pub mod cpu;
pub mod device;
pub mod glsl;
pub mod gpu;
pub mod handoff;
pub mod headless;
pub mod input;
pub mod overlay;
pub mod program;
pub mod registry;
pub mod session;
pub mod shaders;

pub use cpu::{render_frame, Frame};
pub use device::{DeviceError, ProgramId, ShaderDevice, ShaderId, StageKind, UniformLocation};
pub use gpu::{GpuPowerPreference, WgpuDevice};
pub use handoff::{SessionCommand, SessionHandle};
pub use headless::HeadlessDevice;
pub use input::{InputEvent, Key, MouseButton};
pub use overlay::{parameter_dump, CONTROLS};
pub use program::{
    CompileError, LinkError, ProgramError, ProgramStatus, ShaderProgram, ShaderProgramManager,
    ShaderStage, StageStatus, UniformTarget,
};
pub use registry::{ParameterRegistry, UniformDescriptor};
pub use session::{FrameOutcome, FrameSink, RenderSession, SessionSetup};
