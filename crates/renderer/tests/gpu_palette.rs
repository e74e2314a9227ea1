use fractal::{Palette, Rgb, SurfaceSize};
use renderer::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use renderer::{GpuPowerPreference, RenderSession, SessionSetup, WgpuDevice};

/// Renders one frame offscreen, or `None` on machines without a usable adapter.
fn gpu_frame(palette: Palette) -> Option<Vec<u8>> {
    let size = SurfaceSize::new(32, 24);
    let device = match WgpuDevice::new(size, GpuPowerPreference::Low) {
        Ok(device) => device,
        Err(err) => {
            eprintln!("skipping GPU render: {err:#}");
            return None;
        }
    };
    let mut session = RenderSession::start(
        device,
        VERTEX_SHADER,
        FRAGMENT_SHADER,
        SessionSetup {
            size,
            palette,
            ..SessionSetup::default()
        },
    )
    .unwrap();
    session.frame(&mut || {}).unwrap();
    Some(session.device().read_frame().unwrap())
}

#[test]
fn uploaded_palette_colours_the_gpu_frame() {
    let Some(stock) = gpu_frame(Palette::default()) else {
        return;
    };
    let red = Palette::from_colors(vec![Rgb::new(255, 0, 0)]).unwrap();
    let Some(custom) = gpu_frame(red) else {
        return;
    };

    assert_ne!(stock, custom);
    for px in custom.chunks_exact(4) {
        assert!(px == [255, 0, 0, 255] || px == [0, 0, 0, 255], "{px:?}");
    }
}
