use std::fs;

use fractal::ppm::{load_ppm_file, save_ppm_file};
use fractal::{Endianness, ImageLoadError, Palette, Rgb};
use tempfile::TempDir;

#[test]
fn generated_palette_survives_a_ppm_strip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("palette.ppm");
    let palette = Palette::default();

    save_ppm_file(&path, palette.len() as u32, 1, palette.colors()).unwrap();
    let image = load_ppm_file(&path).unwrap();

    assert_eq!(image.width, 128);
    assert_eq!(image.height, 1);
    assert_eq!(image.pixels, palette.colors());
    assert_eq!(
        image.packed_with(Endianness::Little)[0],
        (128 << 8) | 255,
        "first entry is (0, 128, 255)"
    );
}

#[test]
fn truncated_file_on_disk_reports_sizes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.ppm");
    let mut bytes = b"P6\n4 1\n255\n".to_vec();
    bytes.extend_from_slice(&[0; 5]);
    fs::write(&path, bytes).unwrap();

    match load_ppm_file(&path) {
        Err(ImageLoadError::TruncatedPixelData { expected, found }) => {
            assert_eq!(expected, 12);
            assert_eq!(found, 5);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_ppm_file(&dir.path().join("absent.ppm")).unwrap_err();
    assert!(matches!(err, ImageLoadError::Io(_)));
}

#[test]
fn external_palette_wraps_loaded_pixels() {
    let colors = vec![Rgb::new(1, 1, 1), Rgb::new(2, 2, 2)];
    let palette = Palette::from_colors(colors.clone()).unwrap();
    assert_eq!(palette.get(3), colors[1]);
}
