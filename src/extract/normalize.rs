//! Conversion of decoded pixels to opaque 8-bit RGB.

use image::{Rgb, RgbImage};

use crate::model::{ColorSpace, PixelBuffer, LAB_D50_WHITE};

/// An image ready to be written: three channels, no alpha.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// RGB pixels
    pub image: RgbImage,
    /// Colour space the pixels were converted from
    pub source: ColorSpace,
    /// Whether an alpha channel was flattened
    pub had_alpha: bool,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Bradford-adapted XYZ (D50) to linear sRGB.
const XYZ_D50_TO_SRGB: [[f32; 3]; 3] = [
    [3.133_856, -1.616_867, -0.490_615],
    [-0.978_768, 1.916_142, 0.033_454],
    [0.071_945, -0.228_991, 1.405_243],
];

/// Convert a pixel buffer to RGB.
///
/// Alpha is composited onto a white background and dropped.
pub fn normalize(buffer: PixelBuffer) -> Result<NormalizedImage, String> {
    if !buffer.is_consistent() {
        return Err(format!(
            "pixel buffer holds {} samples, expected {}",
            buffer.samples.len(),
            buffer.pixel_count() * buffer.channels()
        ));
    }

    let channels = buffer.channels();
    let comps = buffer.color_space.components();
    let mut rgb = Vec::with_capacity(buffer.pixel_count() * 3);

    for pixel in buffer.samples.chunks_exact(channels) {
        let Rgb([r, g, b]) = to_rgb(&buffer.color_space, &pixel[..comps]);
        if buffer.has_alpha {
            let a = pixel[comps];
            rgb.extend([over_white(r, a), over_white(g, a), over_white(b, a)]);
        } else {
            rgb.extend([r, g, b]);
        }
    }

    let image = RgbImage::from_raw(buffer.width, buffer.height, rgb)
        .ok_or("normalized buffer does not match image size")?;

    Ok(NormalizedImage {
        image,
        source: buffer.color_space,
        had_alpha: buffer.has_alpha,
    })
}

fn over_white(value: u8, alpha: u8) -> u8 {
    let (v, a) = (u32::from(value), u32::from(alpha));
    ((v * a + 255 * (255 - a) + 127) / 255) as u8
}

fn to_rgb(cs: &ColorSpace, px: &[u8]) -> Rgb<u8> {
    match cs {
        ColorSpace::Gray => Rgb([px[0]; 3]),
        ColorSpace::Rgb => Rgb([px[0], px[1], px[2]]),
        ColorSpace::Cmyk => {
            let k = 255 - u32::from(px[3]);
            let ch = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
            Rgb([ch(px[0]), ch(px[1]), ch(px[2])])
        }
        ColorSpace::Lab {
            a_range, b_range, ..
        } => {
            let scale = |v: u8, [lo, hi]: [f32; 2]| lo + f32::from(v) / 255.0 * (hi - lo);
            lab_to_rgb(
                scale(px[0], [0.0, 100.0]),
                scale(px[1], *a_range),
                scale(px[2], *b_range),
            )
        }
        ColorSpace::DeviceN(_) => {
            let coverage = px
                .iter()
                .fold(1.0f32, |acc, &t| acc * (1.0 - f32::from(t) / 255.0));
            Rgb([(coverage * 255.0).round() as u8; 3])
        }
    }
}

/// Lab is read relative to its own white point and rendered as if that
/// white were D50.
fn lab_to_rgb(l: f32, a: f32, b: f32) -> Rgb<u8> {
    const DELTA: f32 = 6.0 / 29.0;
    let finv = |t: f32| {
        if t > DELTA {
            t * t * t
        } else {
            3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
        }
    };

    let fy = (l + 16.0) / 116.0;
    let relative = [finv(fy + a / 500.0), finv(fy), finv(fy - b / 200.0)];

    let xyz = [
        relative[0] * LAB_D50_WHITE[0],
        relative[1] * LAB_D50_WHITE[1],
        relative[2] * LAB_D50_WHITE[2],
    ];

    let mut out = [0u8; 3];
    for (channel, row) in out.iter_mut().zip(XYZ_D50_TO_SRGB.iter()) {
        let linear = row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];
        *channel = (srgb_gamma(linear.clamp(0.0, 1.0)) * 255.0).round() as u8;
    }
    Rgb(out)
}

fn srgb_gamma(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel(cs: ColorSpace, samples: Vec<u8>) -> Rgb<u8> {
        let img = normalize(PixelBuffer::new(1, 1, cs, samples)).unwrap();
        *img.image.get_pixel(0, 0)
    }

    #[test]
    fn test_gray_replicated() {
        assert_eq!(one_pixel(ColorSpace::Gray, vec![42]), Rgb([42, 42, 42]));
    }

    #[test]
    fn test_rgb_passthrough() {
        assert_eq!(one_pixel(ColorSpace::Rgb, vec![1, 2, 3]), Rgb([1, 2, 3]));
    }

    #[test]
    fn test_cmyk_complement() {
        assert_eq!(one_pixel(ColorSpace::Cmyk, vec![0, 0, 0, 0]), Rgb([255, 255, 255]));
        assert_eq!(one_pixel(ColorSpace::Cmyk, vec![0, 0, 0, 255]), Rgb([0, 0, 0]));
        assert_eq!(one_pixel(ColorSpace::Cmyk, vec![255, 0, 255, 0]), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_lab_extremes() {
        // L* = 100, a* = b* = 0 (128 maps close to 0 on [-100, 100])
        let white = one_pixel(ColorSpace::default_lab(), vec![255, 128, 128]);
        assert!(white.0.iter().all(|&c| c >= 250), "{:?}", white);
        let black = one_pixel(ColorSpace::default_lab(), vec![0, 128, 128]);
        assert!(black.0.iter().all(|&c| c <= 5), "{:?}", black);
    }

    #[test]
    fn test_device_n_coverage() {
        assert_eq!(one_pixel(ColorSpace::DeviceN(1), vec![0]), Rgb([255, 255, 255]));
        assert_eq!(one_pixel(ColorSpace::DeviceN(1), vec![255]), Rgb([0, 0, 0]));
        assert_eq!(one_pixel(ColorSpace::DeviceN(2), vec![0, 255]), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_alpha_composited_on_white() {
        let buffer = PixelBuffer::new(2, 1, ColorSpace::Rgb, vec![0, 0, 0, 200, 100, 50])
            .with_alpha(&[0, 255]);
        let img = normalize(buffer).unwrap();
        assert!(img.had_alpha);
        assert_eq!(img.image.as_raw().len(), 6);
        assert_eq!(*img.image.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*img.image.get_pixel(1, 0), Rgb([200, 100, 50]));
    }

    #[test]
    fn test_half_alpha() {
        let buffer = PixelBuffer::new(1, 1, ColorSpace::Gray, vec![0]).with_alpha(&[128]);
        let img = normalize(buffer).unwrap();
        assert_eq!(*img.image.get_pixel(0, 0), Rgb([127, 127, 127]));
    }

    #[test]
    fn test_inconsistent_buffer_is_error() {
        assert!(normalize(PixelBuffer::new(2, 2, ColorSpace::Rgb, vec![0; 5])).is_err());
    }
}
