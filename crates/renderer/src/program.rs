//! Owning wrappers around device shader and program objects.
//!
//! [`ShaderStage`] and [`ShaderProgram`] each hold at most one raw device
//! handle. A handle is released exactly once: either explicitly by the
//! manager (after a successful link, on [`ShaderProgramManager::destroy`]) or,
//! when a wrapper is dropped while still holding it, through the release
//! queue the manager drains before its next device call.

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use fractal::UniformValue;

use crate::device::{DeviceError, ProgramId, ShaderDevice, ShaderId, StageKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageStatus {
    Uncompiled,
    Compiled,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramStatus {
    Unlinked,
    Linked,
    /// Linked and currently bound.
    Active,
    Failed,
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unlinked => "unlinked",
            Self::Linked => "linked",
            Self::Active => "active",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{kind} shader failed to compile:\n{log}")]
pub struct CompileError {
    pub kind: StageKind,
    pub log: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The stages handed to `link` were not a compiled vertex/fragment pair.
    #[error("cannot link: {0}")]
    Precondition(String),
    #[error("program failed to link:\n{log}")]
    Driver { log: String },
}

impl LinkError {
    pub fn log(&self) -> &str {
        match self {
            Self::Precondition(reason) => reason,
            Self::Driver { log } => log,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("program {program:?} cannot be activated while {status}")]
    NotLinked {
        program: Option<ProgramId>,
        status: ProgramStatus,
    },
    #[error("no program is active")]
    NoActiveProgram,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

enum Released {
    Shader(ShaderId),
    Program(ProgramId),
}

/// One shader stage: its source, compile status and diagnostics.
pub struct ShaderStage {
    kind: StageKind,
    source: String,
    handle: Option<ShaderId>,
    status: StageStatus,
    log: String,
    release: Option<Sender<Released>>,
}

impl ShaderStage {
    /// A stage that has not been handed to a device yet.
    pub fn new(kind: StageKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            handle: None,
            status: StageStatus::Uncompiled,
            log: String::new(),
            release: None,
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn status(&self) -> StageStatus {
        self.status
    }

    /// Compiler output; empty for a clean compile.
    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn handle(&self) -> Option<ShaderId> {
        self.handle
    }
}

impl fmt::Debug for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderStage")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Drop for ShaderStage {
    fn drop(&mut self) {
        if let (Some(id), Some(release)) = (self.handle.take(), self.release.as_ref()) {
            let _ = release.send(Released::Shader(id));
        }
    }
}

/// A linked program. Owns the two stages it was linked from; their device
/// objects are already released once linking succeeds.
pub struct ShaderProgram {
    handle: Option<ProgramId>,
    vertex: ShaderStage,
    fragment: ShaderStage,
    status: ProgramStatus,
    log: String,
    release: Sender<Released>,
}

impl ShaderProgram {
    /// Device name of the program; `None` once destroyed.
    pub fn id(&self) -> Option<ProgramId> {
        self.handle
    }

    pub fn vertex(&self) -> &ShaderStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &ShaderStage {
        &self.fragment
    }

    /// Link status, not counting whether it is bound; see
    /// [`ShaderProgramManager::status`].
    pub fn status(&self) -> ProgramStatus {
        self.status
    }

    pub fn log(&self) -> &str {
        &self.log
    }
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(id) = self.handle.take() {
            let _ = self.release.send(Released::Program(id));
        }
    }
}

/// Something uniforms can be pushed to and read back from by name.
///
/// A name the current program does not declare is not an error: writes
/// report `false` and reads report `None`.
pub trait UniformTarget {
    fn write_uniform(&mut self, name: &str, value: UniformValue) -> Result<bool, DeviceError>;

    fn read_uniform(&mut self, name: &str) -> Option<UniformValue>;
}

/// Compiles, links and binds programs on a [`ShaderDevice`] and owns the
/// active one.
pub struct ShaderProgramManager<D: ShaderDevice> {
    device: D,
    active: Option<ShaderProgram>,
    release_tx: Sender<Released>,
    release_rx: Receiver<Released>,
}

impl<D: ShaderDevice> ShaderProgramManager<D> {
    pub fn new(device: D) -> Self {
        let (release_tx, release_rx) = unbounded();
        Self {
            device,
            active: None,
            release_tx,
            release_rx,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Compiles one stage. The device shader object is released again when
    /// compilation fails.
    pub fn compile(
        &mut self,
        kind: StageKind,
        source: impl Into<String>,
    ) -> Result<ShaderStage, CompileError> {
        self.collect_released();
        let mut stage = ShaderStage::new(kind, source);
        self.compile_stage(&mut stage);
        match stage.status {
            StageStatus::Compiled => Ok(stage),
            _ => Err(CompileError {
                kind,
                log: std::mem::take(&mut stage.log),
            }),
        }
    }

    fn compile_stage(&mut self, stage: &mut ShaderStage) {
        let id = self.device.create_shader(stage.kind);
        match self.device.compile_shader(id, &stage.source) {
            Ok(()) => {
                tracing::debug!(kind = %stage.kind, shader = ?id, "compiled shader stage");
                stage.handle = Some(id);
                stage.status = StageStatus::Compiled;
                stage.release = Some(self.release_tx.clone());
            }
            Err(log) => {
                tracing::warn!(kind = %stage.kind, "shader compile failed:\n{log}");
                self.device.delete_shader(id);
                stage.status = StageStatus::Failed;
                stage.log = log;
            }
        }
    }

    /// Links a compiled vertex/fragment pair.
    ///
    /// Handing over stages of the wrong kind or not compiled on this manager
    /// is a [`LinkError::Precondition`]; a device-side failure is
    /// [`LinkError::Driver`] with the log verbatim. Either way the stages are
    /// consumed.
    pub fn link(
        &mut self,
        vertex: ShaderStage,
        fragment: ShaderStage,
    ) -> Result<ShaderProgram, LinkError> {
        self.collect_released();
        let (vertex_id, fragment_id) = check_pair(&vertex, &fragment)?;

        let id = self.device.create_program();
        if let Err(log) = self.device.link_program(id, vertex_id, fragment_id) {
            tracing::error!(program = ?id, "program link failed:\n{log}");
            self.device.delete_program(id);
            return Err(LinkError::Driver { log });
        }

        let mut program = ShaderProgram {
            handle: Some(id),
            vertex,
            fragment,
            status: ProgramStatus::Linked,
            log: String::new(),
            release: self.release_tx.clone(),
        };
        for stage in [&mut program.vertex, &mut program.fragment] {
            if let Some(shader) = stage.handle.take() {
                self.device.delete_shader(shader);
            }
        }
        tracing::debug!(program = ?id, "linked program");
        Ok(program)
    }

    /// Compiles both sources and links them.
    pub fn build(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderProgram, ProgramError> {
        let vertex = self.compile(StageKind::Vertex, vertex_source)?;
        let fragment = self.compile(StageKind::Fragment, fragment_source)?;
        Ok(self.link(vertex, fragment)?)
    }

    /// Binds `program`. Binding the program that is already bound does nothing.
    pub fn activate(&mut self, program: &ShaderProgram) -> Result<(), ProgramError> {
        self.collect_released();
        let id = match (program.handle, program.status) {
            (Some(id), ProgramStatus::Linked) => id,
            (program, status) => return Err(ProgramError::NotLinked { program, status }),
        };
        if self.device.current_program() == Some(id) {
            return Ok(());
        }
        self.device.use_program(Some(id));
        tracing::debug!(program = ?id, "activated program");
        Ok(())
    }

    /// Releases the program's device object. Unbinds it first if bound.
    pub fn destroy(&mut self, mut program: ShaderProgram) {
        self.collect_released();
        if let Some(id) = program.handle.take() {
            if self.device.current_program() == Some(id) {
                self.device.use_program(None);
            }
            self.device.delete_program(id);
            tracing::debug!(program = ?id, "destroyed program");
        }
    }

    /// Binds `program` and makes it the managed active program, destroying
    /// the previous one.
    pub fn install(&mut self, program: ShaderProgram) -> Result<(), ProgramError> {
        self.activate(&program)?;
        if let Some(previous) = self.active.take() {
            if previous.handle != program.handle {
                self.destroy(previous);
            }
        }
        self.active = Some(program);
        Ok(())
    }

    /// Builds a replacement program and installs it. On failure the current
    /// program stays bound and the error is returned for reporting.
    pub fn hot_swap(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<(), ProgramError> {
        let program = match self.build(vertex_source, fragment_source) {
            Ok(program) => program,
            Err(err) => {
                tracing::warn!(error = %err, "hot swap failed; keeping current program");
                return Err(err);
            }
        };
        self.install(program)?;
        tracing::info!("hot swapped shader program");
        Ok(())
    }

    pub fn active(&self) -> Option<&ShaderProgram> {
        self.active.as_ref()
    }

    pub fn active_id(&self) -> Option<ProgramId> {
        self.active.as_ref().and_then(ShaderProgram::id)
    }

    /// Status including whether the program is the one currently bound.
    pub fn status(&self, program: &ShaderProgram) -> ProgramStatus {
        match program.handle {
            Some(id) if self.device.current_program() == Some(id) => ProgramStatus::Active,
            Some(_) => program.status,
            None => ProgramStatus::Unlinked,
        }
    }

    /// Issues one draw with the active program.
    pub fn draw(&mut self) -> Result<(), ProgramError> {
        self.collect_released();
        if self.active_id().is_none() {
            return Err(ProgramError::NoActiveProgram);
        }
        self.device.draw()?;
        Ok(())
    }

    fn collect_released(&mut self) {
        for released in self.release_rx.try_iter() {
            match released {
                Released::Shader(id) => self.device.delete_shader(id),
                Released::Program(id) => {
                    if self.device.current_program() == Some(id) {
                        self.device.use_program(None);
                    }
                    self.device.delete_program(id);
                }
            }
        }
    }
}

fn check_pair(
    vertex: &ShaderStage,
    fragment: &ShaderStage,
) -> Result<(ShaderId, ShaderId), LinkError> {
    let ready = |stage: &ShaderStage, expected: StageKind| {
        if stage.kind != expected {
            return Err(LinkError::Precondition(format!(
                "expected a {expected} stage, got a {} stage",
                stage.kind
            )));
        }
        match (stage.status, stage.handle) {
            (StageStatus::Compiled, Some(id)) => Ok(id),
            (status, _) => Err(LinkError::Precondition(format!(
                "{expected} stage is {status:?}, not compiled"
            ))),
        }
    };
    Ok((
        ready(vertex, StageKind::Vertex)?,
        ready(fragment, StageKind::Fragment)?,
    ))
}

impl<D: ShaderDevice> UniformTarget for ShaderProgramManager<D> {
    fn write_uniform(&mut self, name: &str, value: UniformValue) -> Result<bool, DeviceError> {
        let Some(program) = self.active_id() else {
            return Ok(false);
        };
        let Some(location) = self.device.uniform_location(program, name) else {
            return Ok(false);
        };
        self.device.write_uniform(program, location, value)?;
        Ok(true)
    }

    fn read_uniform(&mut self, name: &str) -> Option<UniformValue> {
        let program = self.active_id()?;
        let location = self.device.uniform_location(program, name)?;
        match self.device.read_uniform(program, location) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(uniform = name, error = %err, "uniform readback failed");
                None
            }
        }
    }
}

impl<D: ShaderDevice> Drop for ShaderProgramManager<D> {
    fn drop(&mut self) {
        if let Some(program) = self.active.take() {
            self.destroy(program);
        }
        self.collect_released();
    }
}
