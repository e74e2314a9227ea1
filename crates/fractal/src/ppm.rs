//! Binary PPM (`P6`) reading and writing.
//!
//! The loader accepts exactly the subset used to seed palettes: a `P6`
//! magic, ASCII width/height/maxval tokens separated by whitespace (with `#`
//! comments allowed wherever a token is expected), a single whitespace byte,
//! then `width·height` raw RGB triples. `maxval` must be 255.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::palette::Rgb;

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("missing P6 magic number")]
    BadMagic,
    #[error("invalid {field} '{token}'")]
    BadDimension { field: &'static str, token: String },
    #[error("unsupported max value {0}; only 255 is accepted")]
    UnsupportedMaxVal(String),
    #[error("pixel data truncated: expected {expected} bytes, found {found}")]
    TruncatedPixelData { expected: usize, found: usize },
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),
}

/// Byte order used when packing a triple into one 24-bit word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }
}

/// Packs an RGB triple so that its in-memory byte layout matches the texture
/// upload order on the given host: `(r<<16)|(g<<8)|b` on little-endian and
/// `(b<<16)|(g<<8)|r` on big-endian.
pub fn pack_rgb24(rgb: Rgb, endianness: Endianness) -> u32 {
    let (r, g, b) = (u32::from(rgb.r), u32::from(rgb.g), u32::from(rgb.b));
    match endianness {
        Endianness::Little => (r << 16) | (g << 8) | b,
        Endianness::Big => (b << 16) | (g << 8) | r,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PpmImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb>,
}

impl PpmImage {
    /// Pixels packed for the current host, row-major.
    pub fn packed(&self) -> Vec<u32> {
        self.packed_with(Endianness::host())
    }

    pub fn packed_with(&self, endianness: Endianness) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|&rgb| pack_rgb24(rgb, endianness))
            .collect()
    }
}

pub fn load_ppm_file(path: &Path) -> Result<PpmImage, ImageLoadError> {
    let file = File::open(path)?;
    read_ppm(BufReader::new(file))
}

pub fn read_ppm<R: Read>(reader: R) -> Result<PpmImage, ImageLoadError> {
    let mut bytes = reader.bytes();
    let mut header = HeaderReader { bytes: &mut bytes };

    let magic = header.token()?;
    if magic.as_deref() != Some("P6") {
        return Err(ImageLoadError::BadMagic);
    }
    let width = header.dimension("width")?;
    let height = header.dimension("height")?;
    let max_val = header.token()?.unwrap_or_default();
    if max_val != "255" {
        return Err(ImageLoadError::UnsupportedMaxVal(max_val));
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or_else(|| ImageLoadError::BadDimension {
            field: "size",
            token: format!("{width}x{height}"),
        })?;
    let mut data = Vec::with_capacity(expected.min(1 << 24));
    for byte in bytes.by_ref().take(expected) {
        data.push(byte?);
    }
    if data.len() < expected {
        return Err(ImageLoadError::TruncatedPixelData {
            expected,
            found: data.len(),
        });
    }

    let pixels = data
        .chunks_exact(3)
        .map(|c| Rgb::new(c[0], c[1], c[2]))
        .collect();
    Ok(PpmImage {
        width,
        height,
        pixels,
    })
}

struct HeaderReader<'a, I: Iterator<Item = io::Result<u8>>> {
    bytes: &'a mut I,
}

impl<I: Iterator<Item = io::Result<u8>>> HeaderReader<'_, I> {
    /// Next whitespace-delimited token. Consumes the single delimiter byte
    /// that follows it, which for the maxval token is the byte separating the
    /// header from the raster.
    fn token(&mut self) -> Result<Option<String>, ImageLoadError> {
        let mut token = String::new();
        loop {
            let Some(byte) = self.bytes.next().transpose()? else {
                break;
            };
            if byte == b'#' && token.is_empty() {
                self.skip_comment()?;
                continue;
            }
            if byte.is_ascii_whitespace() {
                if token.is_empty() {
                    continue;
                }
                break;
            }
            token.push(char::from(byte));
        }
        Ok((!token.is_empty()).then_some(token))
    }

    fn skip_comment(&mut self) -> Result<(), ImageLoadError> {
        while let Some(byte) = self.bytes.next().transpose()? {
            if byte == b'\n' || byte == b'\r' {
                break;
            }
        }
        Ok(())
    }

    fn dimension(&mut self, field: &'static str) -> Result<u32, ImageLoadError> {
        let token = self.token()?.unwrap_or_default();
        let starts_with_digit = token.bytes().next().is_some_and(|b| b.is_ascii_digit());
        match token.parse::<u32>() {
            Ok(value) if starts_with_digit && value > 0 => Ok(value),
            _ => Err(ImageLoadError::BadDimension { field, token }),
        }
    }
}

/// Writes RGB pixels as a binary PPM.
pub fn write_ppm<W: Write>(
    mut writer: W,
    width: u32,
    height: u32,
    pixels: &[Rgb],
) -> io::Result<()> {
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "pixel count {} does not match {width}x{height}",
                pixels.len()
            ),
        ));
    }
    write!(writer, "P6\n{width} {height}\n255\n")?;
    let mut raster = Vec::with_capacity(expected * 3);
    for rgb in pixels {
        raster.extend_from_slice(&[rgb.r, rgb.g, rgb.b]);
    }
    writer.write_all(&raster)?;
    writer.flush()
}

pub fn save_ppm_file(path: &Path, width: u32, height: u32, pixels: &[Rgb]) -> io::Result<()> {
    let file = File::create(path)?;
    write_ppm(BufWriter::new(file), width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Vec<u8> {
        let mut bytes = b"P6\n# palette seed\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[
            0x10, 0x20, 0x30, 0xff, 0x00, 0x00, 0x00, 0xff, 0x00, 0x01, 0x02, 0x03,
        ]);
        bytes
    }

    #[test]
    fn loads_minimal_image_and_packs_little_endian() {
        let image = read_ppm(two_by_two().as_slice()).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(
            image.packed_with(Endianness::Little),
            vec![0x102030, 0xff0000, 0x00ff00, 0x010203]
        );
    }

    #[test]
    fn big_endian_packing_swaps_red_and_blue() {
        let image = read_ppm(two_by_two().as_slice()).unwrap();
        assert_eq!(
            image.packed_with(Endianness::Big),
            vec![0x302010, 0x0000ff, 0x00ff00, 0x030201]
        );
    }

    #[test]
    fn comments_are_allowed_between_tokens() {
        let mut bytes = b"P6 # magic\n# size follows\n1 # w\n1\n# max\n255\n".to_vec();
        bytes.extend_from_slice(&[9, 8, 7]);
        let image = read_ppm(bytes.as_slice()).unwrap();
        assert_eq!(image.pixels, vec![Rgb::new(9, 8, 7)]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let err = read_ppm(&b"P3\n1 1\n255\n   "[..]).unwrap_err();
        assert!(matches!(err, ImageLoadError::BadMagic));
    }

    #[test]
    fn rejects_non_numeric_dimension() {
        let err = read_ppm(&b"P6\n-2 1\n255\n"[..]).unwrap_err();
        assert!(matches!(
            err,
            ImageLoadError::BadDimension { field: "width", .. }
        ));
    }

    #[test]
    fn rejects_other_max_values() {
        let err = read_ppm(&b"P6\n1 1\n65535\n\0\0\0\0\0\0"[..]).unwrap_err();
        assert!(matches!(err, ImageLoadError::UnsupportedMaxVal(ref v) if v == "65535"));
    }

    #[test]
    fn truncated_raster_is_an_error() {
        let mut bytes = two_by_two();
        bytes.truncate(bytes.len() - 2);
        let err = read_ppm(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            ImageLoadError::TruncatedPixelData {
                expected: 12,
                found: 10
            }
        ));
    }

    #[test]
    fn writer_output_reloads() {
        let pixels = vec![Rgb::new(1, 2, 3), Rgb::new(4, 5, 6), Rgb::new(7, 8, 9)];
        let mut out = Vec::new();
        write_ppm(&mut out, 3, 1, &pixels).unwrap();
        assert!(out.starts_with(b"P6\n3 1\n255\n"));
        assert_eq!(read_ppm(out.as_slice()).unwrap().pixels, pixels);
    }

    #[test]
    fn writer_rejects_size_mismatch() {
        assert!(write_ppm(Vec::new(), 2, 2, &[Rgb::BLACK]).is_err());
    }
}
