//! The render session: everything one window's loop needs, in one place.
//!
//! Input handlers and the per-frame step all take the session explicitly.
//! Work arriving from other threads goes through a [`SessionHandle`] and is
//! applied at the start of the next frame, on the thread that owns the device.

use crossbeam_channel::Receiver;
use fractal::{
    Camera, Complex, ComplexPlaneViewport, FractalMode, Palette, Parameter, SurfaceSize,
    UniformValue,
};

use crate::cpu::{self, Frame};
use crate::device::ShaderDevice;
use crate::handoff::{self, SessionCommand, SessionHandle};
use crate::input::{InputEvent, Key, MouseButton};
use crate::overlay;
use crate::program::{ProgramError, ShaderProgramManager, UniformTarget};
use crate::registry::ParameterRegistry;

const ITERATION_STEP: i32 = 10;
const POWER_STEP: f32 = 0.1;
const GAMMA_STEP: f32 = 0.1;
const ROTATION_STEP: f32 = 5.0;
const CAMERA_STEP: f32 = 0.1;
const ZOOM_IN: f64 = 0.95;
const ZOOM_OUT: f64 = 1.05;

/// Receives each finished frame.
pub trait FrameSink {
    fn present_frame(&mut self);
}

impl<F: FnMut()> FrameSink for F {
    fn present_frame(&mut self) {
        self()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Exit,
}

/// Initial state for [`RenderSession::start`].
#[derive(Clone, Debug)]
pub struct SessionSetup {
    pub size: SurfaceSize,
    pub mode: FractalMode,
    pub palette: Palette,
    /// Starting viewport; `None` frames the default view for `mode`.
    pub viewport: Option<ComplexPlaneViewport>,
    /// Extra uniforms applied after the defaults, by name.
    pub overrides: Vec<(String, UniformValue)>,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            size: SurfaceSize::new(800, 600),
            mode: FractalMode::Mandelbrot,
            palette: Palette::default(),
            viewport: None,
            overrides: Vec::new(),
        }
    }
}

/// Default framing for a mode: the whole set, `scale` wide either side.
pub fn default_viewport(mode: FractalMode, size: SurfaceSize) -> ComplexPlaneViewport {
    let center = match mode {
        FractalMode::Mandelbrot => Complex::new(-0.5, 0.0),
        FractalMode::Julia => Complex::ZERO,
    };
    let half_width = Parameter::Scale
        .default_value(mode)
        .as_float()
        .map(f64::from)
        .unwrap_or(2.0);
    ComplexPlaneViewport::centered(center, half_width, size).unwrap_or_default()
}

pub struct RenderSession<D: ShaderDevice> {
    programs: ShaderProgramManager<D>,
    registry: ParameterRegistry,
    viewport: ComplexPlaneViewport,
    camera: Camera,
    size: SurfaceSize,
    palette: Palette,
    julia_interactive: bool,
    drag: Option<(f64, f64)>,
    quit: bool,
    frames: u64,
    handle: SessionHandle,
    commands: Receiver<SessionCommand>,
}

impl<D: ShaderDevice> RenderSession<D> {
    /// Builds and activates the startup program, then installs defaults.
    /// A startup program that fails to compile or link is fatal.
    pub fn start(
        device: D,
        vertex_source: &str,
        fragment_source: &str,
        setup: SessionSetup,
    ) -> Result<Self, ProgramError> {
        let mut programs = ShaderProgramManager::new(device);
        let program = programs.build(vertex_source, fragment_source)?;
        programs.install(program)?;
        programs.device_mut().upload_palette(setup.palette.colors())?;

        let (handle, commands) = handoff::channel();
        let viewport = setup
            .viewport
            .unwrap_or_else(|| default_viewport(setup.mode, setup.size));
        let mut session = Self {
            programs,
            registry: ParameterRegistry::new(setup.mode),
            viewport,
            camera: Camera::default(),
            size: setup.size,
            palette: setup.palette,
            julia_interactive: false,
            drag: None,
            quit: false,
            frames: 0,
            handle,
            commands,
        };
        session.install_defaults(setup.mode);
        for (name, value) in &setup.overrides {
            session.set_parameter(name, *value);
        }
        session.programs.device_mut().resize(session.size);
        tracing::info!(
            mode = %setup.mode,
            width = session.size.width,
            height = session.size.height,
            palette = session.palette.len(),
            "render session started"
        );
        Ok(session)
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn programs(&self) -> &ShaderProgramManager<D> {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut ShaderProgramManager<D> {
        &mut self.programs
    }

    pub fn device(&self) -> &D {
        self.programs.device()
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn viewport(&self) -> &ComplexPlaneViewport {
        &self.viewport
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn mode(&self) -> FractalMode {
        self.registry.mode()
    }

    pub fn is_julia_interactive(&self) -> bool {
        self.julia_interactive
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// String-keyed parameter write; unknown names are ignored.
    pub fn set_parameter(&mut self, name: &str, value: UniformValue) {
        self.registry.set_by_name(&mut self.programs, name, value);
    }

    /// Reads a parameter back from the active program.
    pub fn parameter(&mut self, name: &str) -> Option<UniformValue> {
        self.programs.read_uniform(name)
    }

    pub fn parameter_dump(&mut self) -> (String, String) {
        overlay::parameter_dump(&self.registry, &mut self.programs)
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Resize { width, height } => self.on_resize(width, height),
            InputEvent::Key(key) => self.on_key(key),
            InputEvent::MouseButton {
                button,
                pressed,
                x,
                y,
            } => self.on_mouse_button(button, pressed, x, y),
            InputEvent::MouseMove { x, y } => self.on_mouse_move(x, y),
        }
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        let size = SurfaceSize::new(width, height);
        if size.is_empty() {
            tracing::debug!(width, height, "ignoring empty resize");
            return;
        }
        self.size = size;
        self.viewport.resize(size);
        self.programs.device_mut().resize(size);
        self.push_sizes();
    }

    pub fn on_key(&mut self, key: Key) {
        match key {
            Key::Escape | Key::Char('q' | 'Q') => {
                tracing::info!("quit requested");
                self.quit = true;
            }
            Key::Char('h' | 'c' | '?') => tracing::info!("\n{}", overlay::CONTROLS),
            Key::Char('m') => self.switch_mode(FractalMode::Mandelbrot),
            Key::Char('j') => self.switch_mode(FractalMode::Julia),
            Key::Char('+' | '=') => self.adjust_iterations(ITERATION_STEP),
            Key::Char('-' | '_') => self.adjust_iterations(-ITERATION_STEP),
            Key::Char(' ') => {
                self.julia_interactive = !self.julia_interactive;
                tracing::info!(enabled = self.julia_interactive, "julia interactive mode");
            }
            Key::Char('a') => self.toggle(Parameter::AntialiasingOn),
            Key::Char('t') => self.toggle(Parameter::Transparent),
            Key::Char('v') => self.toggle(Parameter::Hsv),
            Key::Char('o') => self.toggle(Parameter::ColorCycleMirror),
            Key::Char('p') => self.adjust_float(Parameter::Power, |v| v + POWER_STEP),
            Key::Char('P') => self.adjust_float(Parameter::Power, |v| v - POWER_STEP),
            Key::Char('b') => self.adjust_float(Parameter::Bailout, |v| v * 2.0),
            Key::Char('B') => self.adjust_float(Parameter::Bailout, |v| v / 2.0),
            Key::Char('g') => self.adjust_float(Parameter::Gamma, |v| v + GAMMA_STEP),
            Key::Char('G') => {
                self.adjust_float(Parameter::Gamma, |v| (v - GAMMA_STEP).max(GAMMA_STEP))
            }
            Key::Char('[') => self.adjust_float(Parameter::Rotation, |v| v - ROTATION_STEP),
            Key::Char(']') => self.adjust_float(Parameter::Rotation, |v| v + ROTATION_STEP),
            Key::Char('0') => self.switch_mode(self.registry.mode()),
            Key::Up => self.move_camera(-CAMERA_STEP, 0.0, 0.0),
            Key::Down => self.move_camera(CAMERA_STEP, 0.0, 0.0),
            Key::Left => self.move_camera(CAMERA_STEP, -90.0, 0.0),
            Key::Right => self.move_camera(CAMERA_STEP, 90.0, 0.0),
            Key::Char(other) => tracing::trace!(key = %other, "unbound key"),
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, pressed: bool, x: f64, y: f64) {
        match (button, pressed) {
            (MouseButton::WheelUp, true) => self.viewport.zoom(ZOOM_IN, x, y, self.size),
            (MouseButton::WheelDown, true) => self.viewport.zoom(ZOOM_OUT, x, y, self.size),
            (MouseButton::Left, true) => {
                self.drag = Some((x, y));
                if self.julia_interactive {
                    self.follow_cursor(x, y);
                }
            }
            (MouseButton::Left, false) => self.drag = None,
            _ => {}
        }
    }

    pub fn on_mouse_move(&mut self, x: f64, y: f64) {
        if self.julia_interactive {
            self.follow_cursor(x, y);
            return;
        }
        if let Some((last_x, last_y)) = self.drag {
            self.viewport.pan(x - last_x, y - last_y, self.size);
            self.drag = Some((x, y));
        }
    }

    /// Moves the 3D camera and forwards its position to the program.
    pub fn move_camera(&mut self, distance: f32, yaw_deg: f32, pitch_deg: f32) {
        let position = self.camera.advance(distance, yaw_deg, pitch_deg);
        self.registry.set(
            &mut self.programs,
            Parameter::CameraPosition,
            UniformValue::Vec3(position),
        );
    }

    /// Replaces the program at runtime. On failure the current program keeps
    /// rendering and the error is returned for display.
    pub fn hot_swap(&mut self, vertex_source: &str, fragment_source: &str) -> Result<(), ProgramError> {
        self.programs.hot_swap(vertex_source, fragment_source)?;
        let mode = self.registry.mode();
        self.install_defaults(mode);
        Ok(())
    }

    /// Replaces the colour table on the device and for reference renders.
    pub fn set_palette(&mut self, palette: Palette) -> Result<(), ProgramError> {
        self.programs.device_mut().upload_palette(palette.colors())?;
        tracing::info!(entries = palette.len(), "palette replaced");
        self.palette = palette;
        Ok(())
    }

    /// Applies queued commands, pushes the viewport, draws once and presents.
    pub fn frame<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<FrameOutcome, ProgramError> {
        self.drain_commands();
        if self.quit {
            return Ok(FrameOutcome::Exit);
        }

        self.push_viewport();
        self.programs.draw()?;
        sink.present_frame();
        self.frames += 1;
        Ok(FrameOutcome::Continue)
    }

    /// Runs frames until a quit request arrives. Returns the number drawn.
    pub fn run<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64, ProgramError> {
        let start = self.frames;
        while self.frame(sink)? == FrameOutcome::Continue {}
        Ok(self.frames - start)
    }

    /// CPU rendering of the current view using the values the program holds.
    pub fn render_reference(&mut self, size: SurfaceSize) -> Frame {
        let settings = self.registry.settings(&mut self.programs);
        let mut viewport = self.viewport;
        if size != self.size {
            viewport.resize(size);
        }
        cpu::render_frame(&settings, &viewport, size, &self.palette)
    }

    fn drain_commands(&mut self) {
        let pending: Vec<SessionCommand> = self.commands.try_iter().collect();
        for command in pending {
            match command {
                SessionCommand::Input(event) => self.handle_event(event),
                SessionCommand::SetParameter { name, value } => self.set_parameter(&name, value),
                SessionCommand::HotSwap { vertex, fragment } => {
                    if let Err(err) = self.hot_swap(&vertex, &fragment) {
                        tracing::error!(error = %err, "queued hot swap failed");
                    }
                }
                SessionCommand::Quit => self.quit = true,
            }
        }
    }

    fn install_defaults(&mut self, mode: FractalMode) {
        self.registry.apply_defaults(&mut self.programs, mode);
        self.registry.set(
            &mut self.programs,
            Parameter::CameraPosition,
            UniformValue::Vec3(self.camera.position()),
        );
        self.push_sizes();
        self.push_viewport();
    }

    fn switch_mode(&mut self, mode: FractalMode) {
        self.julia_interactive = false;
        self.drag = None;
        self.viewport = default_viewport(mode, self.size);
        self.install_defaults(mode);
        tracing::info!(mode = %mode, "switched fractal mode");
    }

    fn push_sizes(&mut self) {
        let size = UniformValue::Vec2([self.size.width as f32, self.size.height as f32]);
        self.registry.set(&mut self.programs, Parameter::Size, size);
        self.registry.set(&mut self.programs, Parameter::OutputSize, size);
    }

    fn push_viewport(&mut self) {
        let plane_min = [self.viewport.min_x() as f32, self.viewport.min_y() as f32];
        let plane_max = [self.viewport.max_x() as f32, self.viewport.max_y() as f32];
        for (name, value) in [("planeMin", plane_min), ("planeMax", plane_max)] {
            if let Err(err) = self.programs.write_uniform(name, UniformValue::Vec2(value)) {
                tracing::warn!(uniform = name, error = %err, "failed to write viewport");
            }
        }
        let scale = self.registry.descriptor(Parameter::Scale).value;
        self.registry.set(&mut self.programs, Parameter::Scale, scale);
    }

    fn toggle(&mut self, parameter: Parameter) {
        if let Some(state) = self.registry.toggle_bool(&mut self.programs, parameter.name()) {
            tracing::debug!(parameter = %parameter, state, "toggled");
        }
    }

    fn adjust_iterations(&mut self, delta: i32) {
        let Some(current) = self.registry.get_int(&mut self.programs, "maxIterations") else {
            return;
        };
        let next = current.saturating_add(delta).max(0);
        self.registry.set(
            &mut self.programs,
            Parameter::MaxIterations,
            UniformValue::Int(next),
        );
        tracing::info!(max_iterations = next, "iterations changed");
    }

    fn adjust_float(&mut self, parameter: Parameter, change: impl FnOnce(f32) -> f32) {
        let Some(current) = self.registry.get_float(&mut self.programs, parameter.name()) else {
            return;
        };
        let next = change(current);
        self.registry
            .set(&mut self.programs, parameter, UniformValue::Float(next));
        tracing::debug!(parameter = %parameter, value = next, "parameter changed");
    }

    fn follow_cursor(&mut self, x: f64, y: f64) {
        let point = self.viewport.screen_to_plane(x, y, self.size);
        self.registry.set(
            &mut self.programs,
            Parameter::Offset,
            UniformValue::Vec2([point.re as f32, point.im as f32]),
        );
    }
}
