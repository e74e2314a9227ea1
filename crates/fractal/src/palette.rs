//! Fixed-size colour table used by the escape-time colouring.
//!
//! The default table is a four-band ramp: azure→red, red→yellow,
//! chartreuse→cyan and green→blue. Each band interpolates linearly between fixed endpoints, so
//! [`Palette::build`] is a pure function of the requested size.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PALETTE_SIZE: usize = 128;

/// 8-bit RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    pub fn from_unit(rgb: [f32; 3]) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(rgb[0]), channel(rgb[1]), channel(rgb[2]))
    }
}

/// Band endpoint: starting channel values and the signed span covered across the band.
struct Band {
    start: [i32; 3],
    span: [i32; 3],
}

const BANDS: [Band; 4] = [
    Band {
        start: [0, 128, 255],
        span: [256, -128, -256],
    },
    Band {
        start: [255, 0, 0],
        span: [0, 256, 0],
    },
    Band {
        start: [128, 255, 0],
        span: [-128, 0, 256],
    },
    Band {
        start: [0, 255, 0],
        span: [0, -256, 256],
    },
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Generates the four-band ramp with `size` entries.
    ///
    /// Bands split `size` as evenly as possible; with the default of 128 each
    /// band holds 32 entries and steps by 8 per entry.
    pub fn build(size: usize) -> Self {
        let band_count = BANDS.len();
        let mut colors = Vec::with_capacity(size);
        for band_index in 0..band_count {
            let start = band_start(band_index, size, band_count);
            let end = band_start(band_index + 1, size, band_count);
            let len = end - start;
            let band = &BANDS[band_index];
            for step in 0..len {
                let channel = |c: usize| {
                    let value = band.start[c] + band.span[c] * step as i32 / len as i32;
                    value.clamp(0, 255) as u8
                };
                colors.push(Rgb::new(channel(0), channel(1), channel(2)));
            }
        }
        Self { colors }
    }

    /// Wraps an externally supplied colour table. Returns `None` when empty.
    pub fn from_colors(colors: Vec<Rgb>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Entry at `index` modulo the palette size; black for an empty table.
    pub fn get(&self, index: usize) -> Rgb {
        if self.colors.is_empty() {
            return Rgb::BLACK;
        }
        self.colors[index % self.colors.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::build(DEFAULT_PALETTE_SIZE)
    }
}

fn band_start(band: usize, size: usize, band_count: usize) -> usize {
    (band * size).div_ceil(band_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_has_documented_endpoints() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 128);
        assert_eq!(palette.get(0), Rgb::new(0, 128, 255));
        assert_eq!(palette.get(31), Rgb::new(248, 4, 7));
        assert_eq!(palette.get(32), Rgb::new(255, 0, 0));
        assert_eq!(palette.get(63), Rgb::new(255, 248, 0));
        assert_eq!(palette.get(64), Rgb::new(128, 255, 0));
        assert_eq!(palette.get(95), Rgb::new(4, 255, 248));
        assert_eq!(palette.get(96), Rgb::new(0, 255, 0));
        assert_eq!(palette.get(127), Rgb::new(0, 7, 248));
    }

    #[test]
    fn build_is_deterministic() {
        assert_eq!(Palette::build(200), Palette::build(200));
        assert_eq!(Palette::build(7).len(), 7);
    }

    #[test]
    fn lookup_wraps_modulo_size() {
        let palette = Palette::build(16);
        assert_eq!(palette.get(3), palette.get(19));
    }

    #[test]
    fn empty_palette_reads_black() {
        let palette = Palette::build(0);
        assert!(palette.is_empty());
        assert_eq!(palette.get(5), Rgb::BLACK);
        assert!(Palette::from_colors(Vec::new()).is_none());
    }
}
