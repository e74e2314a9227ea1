use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use fractal::ppm::save_ppm_file;
use fractal::{Palette, Parameter, UniformValue};
use renderer::overlay::side_by_side;
use renderer::{
    Frame, FrameOutcome, HeadlessDevice, InputEvent, RenderSession, ShaderDevice,
    ShaderProgramManager, StageKind, WgpuDevice, CONTROLS,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{prepare_session, SessionPlan, ShaderPair};
use crate::cli::{Cli, Command, GpuRenderArgs, PaletteArgs, ParamsArgs, RenderArgs};
use crate::paths::AppPaths;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    let paths = AppPaths::discover()?;
    tracing::debug!(config = %paths.config_dir().display(), "resolved fractals paths");
    let plan = prepare_session(&cli.run, &paths)?;

    match cli.command {
        Some(Command::Render(args)) => render_cpu(plan, &args),
        Some(Command::GpuRender(args)) => render_gpu(plan, &args),
        Some(Command::Check) => check(&plan.shaders),
        Some(Command::Palette(args)) => write_palette(&plan.setup.palette, &args),
        Some(Command::Params(args)) => print_params(plan, &args),
        None => print_params(plan, &ParamsArgs::default()),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Starts a session on `device`, replays scripted keys and runs one frame so
/// the queued input is applied.
fn start_session<D: ShaderDevice>(device: D, plan: SessionPlan) -> Result<RenderSession<D>> {
    let SessionPlan {
        setup,
        shaders,
        keys,
    } = plan;
    let mut session = RenderSession::start(device, &shaders.vertex, &shaders.fragment, setup)
        .with_context(|| format!("failed to build shader program ({})", shaders.origin))?;

    let handle = session.handle();
    for key in keys {
        handle.input(InputEvent::Key(key));
    }
    if session.frame(&mut || {})? == FrameOutcome::Exit {
        warn!("scripted input requested quit before the first frame");
    }
    Ok(session)
}

fn render_cpu(plan: SessionPlan, args: &RenderArgs) -> Result<()> {
    let mut session = start_session(HeadlessDevice::new(), plan)?;
    let size = session.size();
    let frame = session.render_reference(size);
    save_frame(&frame, &args.output)?;
    info!(
        path = %args.output.display(),
        width = size.width,
        height = size.height,
        mode = %session.mode(),
        "wrote CPU render"
    );
    Ok(())
}

fn render_gpu(plan: SessionPlan, args: &GpuRenderArgs) -> Result<()> {
    let device = WgpuDevice::new(plan.setup.size, args.power)?;
    info!(adapter = device.adapter_name(), "rendering offscreen");
    let session = start_session(device, plan)?;

    let size = session.device().size();
    let bytes = session.device().read_frame()?;
    let frame = Frame::from_rgba_bytes(size, &bytes)
        .context("frame readback does not match the target size")?;
    save_frame(&frame, &args.output)?;
    info!(
        path = %args.output.display(),
        width = size.width,
        height = size.height,
        frames = session.frames(),
        "wrote GPU render"
    );
    Ok(())
}

fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    frame
        .save_ppm(path)
        .with_context(|| format!("failed to write image {}", path.display()))
}

/// Compiles each stage and links the pair on the headless device. Logs are
/// printed exactly as the compiler produced them.
fn check(shaders: &ShaderPair) -> Result<()> {
    let mut manager = ShaderProgramManager::new(HeadlessDevice::new());
    let mut failed = false;

    let mut compile = |kind: StageKind, source: &str| match manager.compile(kind, source) {
        Ok(stage) => {
            println!("{kind} shader: compiled");
            if !stage.log().is_empty() {
                println!("{}", stage.log());
            }
            Some(stage)
        }
        Err(err) => {
            println!("{kind} shader: failed");
            println!("{}", err.log);
            failed = true;
            None
        }
    };
    let vertex = compile(StageKind::Vertex, &shaders.vertex);
    let fragment = compile(StageKind::Fragment, &shaders.fragment);

    if let (Some(vertex), Some(fragment)) = (vertex, fragment) {
        match manager.link(vertex, fragment) {
            Ok(program) => {
                println!("program: {}", manager.status(&program));
                manager.destroy(program);
            }
            Err(err) => {
                println!("program: link failed");
                println!("{}", err.log());
                failed = true;
            }
        }
    }

    if failed {
        bail!("shader check failed for {}", shaders.origin);
    }
    info!(shaders = %shaders.origin, "shader check passed");
    Ok(())
}

fn print_params(plan: SessionPlan, args: &ParamsArgs) -> Result<()> {
    let mut session = start_session(HeadlessDevice::new(), plan)?;
    if args.json {
        let values: BTreeMap<&str, UniformValue> = Parameter::ALL
            .iter()
            .filter_map(|&parameter| {
                let value = session
                    .parameter(parameter.name())?
                    .coerce(parameter.kind())?;
                Some((parameter.name(), value))
            })
            .collect();
        let json = serde_json::to_string_pretty(&values).context("failed to encode parameters")?;
        println!("{json}");
        return Ok(());
    }

    let (left, right) = session.parameter_dump();
    print!("{}", side_by_side(&left, &right));
    if args.controls {
        println!();
        print!("{CONTROLS}");
    }
    Ok(())
}

fn write_palette(palette: &Palette, args: &PaletteArgs) -> Result<()> {
    if args.height == 0 {
        bail!("palette strip height must be greater than zero");
    }
    let width = u32::try_from(palette.len()).context("palette too large for an image")?;
    let pixels: Vec<_> = (0..args.height)
        .flat_map(|_| palette.colors().iter().copied())
        .collect();
    save_ppm_file(&args.output, width, args.height, &pixels)
        .with_context(|| format!("failed to write palette {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        entries = palette.len(),
        "wrote palette strip"
    );
    Ok(())
}
