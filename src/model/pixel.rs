//! Decoded raster data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// D50 reference white, the usual Lab white point.
pub const LAB_D50_WHITE: [f32; 3] = [0.9642, 1.0, 0.8249];

/// Default a* and b* range of a Lab colour space.
pub const LAB_DEFAULT_RANGE: [f32; 2] = [-100.0, 100.0];

/// Colour space of decoded samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// One gray channel (0 = black)
    Gray,
    /// Red, green, blue
    Rgb,
    /// Cyan, magenta, yellow, black
    Cmyk,
    /// CIE L*a*b*. Samples map linearly onto `0..=100` for L* and onto the
    /// given ranges for a* and b*.
    Lab {
        white_point: [f32; 3],
        a_range: [f32; 2],
        b_range: [f32; 2],
    },
    /// Separation or DeviceN tint channels (255 = full colorant)
    DeviceN(u8),
}

impl ColorSpace {
    /// Number of colour channels, alpha excluded.
    pub fn components(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb | ColorSpace::Lab { .. } => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::DeviceN(n) => usize::from(*n),
        }
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ColorSpace::Gray => "Gray",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Cmyk => "CMYK",
            ColorSpace::Lab { .. } => "Lab",
            ColorSpace::DeviceN(_) => "DeviceN",
        }
    }

    /// Lab with a D50 white point and default ranges.
    pub fn default_lab() -> Self {
        ColorSpace::Lab {
            white_point: LAB_D50_WHITE,
            a_range: LAB_DEFAULT_RANGE,
            b_range: LAB_DEFAULT_RANGE,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::DeviceN(n) => write!(f, "DeviceN({})", n),
            other => f.write_str(other.name()),
        }
    }
}

/// Decoded pixels of one image resource.
///
/// Samples are interleaved, 8 bits each, with the alpha channel (if any)
/// stored last in every pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub has_alpha: bool,
    pub samples: Vec<u8>,
}

impl PixelBuffer {
    /// Create a buffer without alpha.
    pub fn new(width: u32, height: u32, color_space: ColorSpace, samples: Vec<u8>) -> Self {
        Self {
            width,
            height,
            color_space,
            has_alpha: false,
            samples,
        }
    }

    /// Channels per pixel including alpha.
    pub fn channels(&self) -> usize {
        self.color_space.components() + usize::from(self.has_alpha)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the sample buffer holds exactly one value per channel and pixel.
    pub fn is_consistent(&self) -> bool {
        self.samples.len() == self.pixel_count() * self.channels()
    }

    /// Interleave an alpha plane (one byte per pixel) into the buffer.
    ///
    /// Returns the buffer unchanged if it already carries alpha or the plane
    /// size does not match.
    pub fn with_alpha(mut self, alpha: &[u8]) -> Self {
        if self.has_alpha || alpha.len() != self.pixel_count() {
            return self;
        }
        let comps = self.color_space.components();
        let mut samples = Vec::with_capacity(self.pixel_count() * (comps + 1));
        for (pixel, a) in self.samples.chunks_exact(comps).zip(alpha) {
            samples.extend_from_slice(pixel);
            samples.push(*a);
        }
        self.samples = samples;
        self.has_alpha = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts() {
        let gray = PixelBuffer::new(2, 1, ColorSpace::Gray, vec![0, 255]);
        assert_eq!(gray.channels(), 1);
        assert!(gray.is_consistent());

        let cmyk = PixelBuffer::new(1, 1, ColorSpace::Cmyk, vec![0, 0, 0, 0]);
        assert_eq!(cmyk.channels(), 4);
        assert_eq!(ColorSpace::DeviceN(6).components(), 6);
        assert_eq!(ColorSpace::default_lab().components(), 3);
    }

    #[test]
    fn test_with_alpha_interleaves() {
        let rgb = PixelBuffer::new(2, 1, ColorSpace::Rgb, vec![1, 2, 3, 4, 5, 6]);
        let rgba = rgb.with_alpha(&[9, 8]);
        assert!(rgba.has_alpha);
        assert_eq!(rgba.channels(), 4);
        assert_eq!(rgba.samples, vec![1, 2, 3, 9, 4, 5, 6, 8]);
        assert!(rgba.is_consistent());
    }

    #[test]
    fn test_with_alpha_size_mismatch_is_ignored() {
        let gray = PixelBuffer::new(2, 2, ColorSpace::Gray, vec![0; 4]);
        let same = gray.clone().with_alpha(&[255; 3]);
        assert_eq!(same, gray);
    }

    #[test]
    fn test_color_space_display() {
        assert_eq!(ColorSpace::Cmyk.to_string(), "CMYK");
        assert_eq!(ColorSpace::DeviceN(2).to_string(), "DeviceN(2)");
    }
}
