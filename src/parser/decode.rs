//! Image XObject decoding.
//!
//! Turns an image stream into a [`PixelBuffer`] in its source colour space:
//! filters are undone, packed samples are unpacked, `/Decode` arrays and
//! palettes are applied, and masks become an alpha channel.

use image::{DynamicImage, GrayImage, ImageFormat};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::model::{ColorSpace, PixelBuffer};

use super::colorspace::{resolve_color_space, value_ranges, PdfColorSpace};
use super::filters::{run_chain, Decoded};
use super::objects::{filter_steps, get_integer, get_numbers, get_resolved, resolve};

/// Largest image accepted, in pixels.
pub const MAX_IMAGE_PIXELS: u64 = 1 << 26;

/// Decodes image XObjects of one document.
pub struct ImageDecoder<'a> {
    doc: &'a LopdfDocument,
    apply_masks: bool,
}

impl<'a> ImageDecoder<'a> {
    pub fn new(doc: &'a LopdfDocument, apply_masks: bool) -> Self {
        Self { doc, apply_masks }
    }

    /// Decode an image stream into pixels.
    pub fn decode(&self, stream: &Stream) -> Result<PixelBuffer, String> {
        let dict = &stream.dict;
        let (width, height) = self.dimensions(dict)?;
        let image_mask = self.is_image_mask(dict);

        let steps = filter_steps(self.doc, dict)?;
        let decoded = run_chain(&stream.content, &steps)?;

        let buffer = match decoded {
            Decoded::Jpeg(bytes) => decode_jpeg(&bytes, width, height)?,
            Decoded::Samples(data) => {
                let (color_space, bpc) = if image_mask {
                    (PdfColorSpace::Direct(ColorSpace::Gray), 1)
                } else {
                    let cs = get_resolved(self.doc, dict, b"ColorSpace")
                        .or_else(|| get_resolved(self.doc, dict, b"CS"))
                        .ok_or("image without /ColorSpace")?;
                    (resolve_color_space(self.doc, cs)?, self.bits_per_component(dict)?)
                };
                let decode = get_numbers(self.doc, dict, b"Decode");
                let color_key = if self.apply_masks && !image_mask {
                    self.color_key(dict)
                } else {
                    None
                };

                let raster = Raster {
                    width,
                    height,
                    bits_per_component: bpc,
                    color_space,
                };
                let raw = raster.unpack(&data);
                let mut buffer = raster.to_pixels(&raw, decode.as_deref());
                if let Some(ranges) = color_key {
                    let alpha = raster.color_key_alpha(&raw, &ranges);
                    buffer = buffer.with_alpha(&alpha);
                }
                buffer
            }
        };

        if self.apply_masks && !image_mask && !buffer.has_alpha {
            return Ok(match self.mask_alpha(dict, buffer.width, buffer.height) {
                Some(alpha) => buffer.with_alpha(&alpha),
                None => buffer,
            });
        }
        Ok(buffer)
    }

    fn dimensions(&self, dict: &Dictionary) -> Result<(u32, u32), String> {
        let dim = |long: &[u8], short: &[u8]| {
            get_integer(self.doc, dict, long)
                .or_else(|| get_integer(self.doc, dict, short))
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
        };
        let width = dim(b"Width", b"W").ok_or("missing or invalid /Width")?;
        let height = dim(b"Height", b"H").ok_or("missing or invalid /Height")?;

        if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
            return Err(format!("image too large ({}x{})", width, height));
        }
        Ok((width, height))
    }

    fn is_image_mask(&self, dict: &Dictionary) -> bool {
        matches!(
            get_resolved(self.doc, dict, b"ImageMask")
                .or_else(|| get_resolved(self.doc, dict, b"IM")),
            Some(Object::Boolean(true))
        )
    }

    fn bits_per_component(&self, dict: &Dictionary) -> Result<u8, String> {
        match get_integer(self.doc, dict, b"BitsPerComponent")
            .or_else(|| get_integer(self.doc, dict, b"BPC"))
        {
            None => {
                log::debug!("image without /BitsPerComponent, assuming 8");
                Ok(8)
            }
            Some(bpc @ (1 | 2 | 4 | 8 | 16)) => Ok(bpc as u8),
            Some(other) => Err(format!("unsupported BitsPerComponent {}", other)),
        }
    }

    /// `/Mask` given as an array of colour-key ranges.
    fn color_key(&self, dict: &Dictionary) -> Option<Vec<f32>> {
        match get_resolved(self.doc, dict, b"Mask")? {
            Object::Array(_) => get_numbers(self.doc, dict, b"Mask"),
            _ => None,
        }
    }

    /// Alpha plane from `/SMask` or a stencil `/Mask` stream.
    fn mask_alpha(&self, dict: &Dictionary, width: u32, height: u32) -> Option<Vec<u8>> {
        let (key, stencil) = if dict.has(b"SMask") {
            (&b"SMask"[..], false)
        } else {
            (&b"Mask"[..], true)
        };
        let stream = match get_resolved(self.doc, dict, key) {
            Some(Object::Stream(stream)) => stream,
            _ => return None,
        };

        let mask_decoder = ImageDecoder::new(self.doc, false);
        let mask = match mask_decoder.decode(stream) {
            Ok(mask) => mask,
            Err(e) => {
                log::warn!("Ignoring undecodable /{}: {}", String::from_utf8_lossy(key), e);
                return None;
            }
        };

        let mut gray = gray_plane(&mask);
        if (mask.width, mask.height) != (width, height) {
            log::debug!(
                "Resizing mask from {}x{} to {}x{}",
                mask.width,
                mask.height,
                width,
                height
            );
            let img = GrayImage::from_raw(mask.width, mask.height, gray)?;
            gray = image::imageops::resize(&img, width, height, image::imageops::FilterType::Nearest)
                .into_raw();
        }

        if stencil {
            gray.iter_mut().for_each(|v| *v = 255 - *v);
        }
        Some(gray)
    }
}

/// First channel of every pixel.
fn gray_plane(buffer: &PixelBuffer) -> Vec<u8> {
    let channels = buffer.channels().max(1);
    buffer.samples.iter().step_by(channels).copied().collect()
}

/// Decode a complete JPEG stream.
fn decode_jpeg(bytes: &[u8], width: u32, height: u32) -> Result<PixelBuffer, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| format!("Failed to decode JPEG image: {}", e))?;

    if (img.width(), img.height()) != (width, height) {
        log::debug!(
            "JPEG is {}x{}, dictionary says {}x{}",
            img.width(),
            img.height(),
            width,
            height
        );
    }

    let (w, h) = (img.width(), img.height());
    Ok(match img {
        DynamicImage::ImageLuma8(gray) => PixelBuffer::new(w, h, ColorSpace::Gray, gray.into_raw()),
        DynamicImage::ImageRgb8(rgb) => PixelBuffer::new(w, h, ColorSpace::Rgb, rgb.into_raw()),
        other => PixelBuffer::new(w, h, ColorSpace::Rgb, other.to_rgb8().into_raw()),
    })
}

/// Geometry and sample layout of an image stream.
struct Raster {
    width: u32,
    height: u32,
    bits_per_component: u8,
    color_space: PdfColorSpace,
}

impl Raster {
    fn components(&self) -> usize {
        self.color_space.stream_components()
    }

    fn max_value(&self) -> u32 {
        (1u32 << self.bits_per_component) - 1
    }

    /// Unpack stored samples to one integer per component.
    ///
    /// Rows start on byte boundaries. Missing data reads as zero.
    fn unpack(&self, data: &[u8]) -> Vec<u16> {
        let bpc = usize::from(self.bits_per_component);
        let per_row = self.width as usize * self.components();
        let row_bytes = (per_row * bpc + 7) / 8;
        let rows = self.height as usize;

        let expected = row_bytes * rows;
        let mut padded;
        let data = if data.len() < expected {
            log::warn!(
                "Image data truncated ({} of {} bytes); padding with zeros",
                data.len(),
                expected
            );
            padded = data.to_vec();
            padded.resize(expected, 0);
            &padded[..]
        } else {
            data
        };

        let mut out = Vec::with_capacity(per_row * rows);
        for row in data.chunks_exact(row_bytes.max(1)).take(rows) {
            match bpc {
                8 => out.extend(row.iter().take(per_row).map(|&b| u16::from(b))),
                16 => out.extend(
                    row.chunks_exact(2)
                        .take(per_row)
                        .map(|p| u16::from_be_bytes([p[0], p[1]])),
                ),
                _ => {
                    let mask = (1u16 << bpc) - 1;
                    out.extend((0..per_row).map(|i| {
                        let bit = i * bpc;
                        let shift = 8 - bpc - bit % 8;
                        (u16::from(row[bit / 8]) >> shift) & mask
                    }));
                }
            }
        }
        out
    }

    /// Map raw samples to 8-bit values of the output colour space.
    fn to_pixels(&self, raw: &[u16], decode: Option<&[f32]>) -> PixelBuffer {
        let max = self.max_value() as f32;
        let comps = self.components();
        let ranges = self.color_space.component_ranges(self.bits_per_component);
        let decode: Vec<[f32; 2]> = match decode {
            Some(d) if d.len() >= comps * 2 => d.chunks_exact(2).map(|p| [p[0], p[1]]).collect(),
            Some(d) => {
                log::debug!("Ignoring /Decode with {} entries", d.len());
                ranges.clone()
            }
            None => ranges.clone(),
        };
        let map = |c: usize, v: u16| decode[c][0] + f32::from(v) * (decode[c][1] - decode[c][0]) / max;

        let samples = match &self.color_space {
            PdfColorSpace::Indexed {
                base,
                hival,
                lookup,
            } => {
                let n = base.components();
                let mut out = Vec::with_capacity(raw.len() * n);
                for &v in raw {
                    let index = (map(0, v).round().max(0.0) as usize).min(*hival);
                    out.extend((0..n).map(|c| lookup.get(index * n + c).copied().unwrap_or(0)));
                }
                out
            }
            PdfColorSpace::Direct(cs) => {
                let out_ranges = value_ranges(cs);
                raw.iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let c = i % comps;
                        let [lo, hi] = out_ranges[c];
                        let value = (map(c, v) - lo) / (hi - lo);
                        (value.clamp(0.0, 1.0) * 255.0).round() as u8
                    })
                    .collect()
            }
        };

        PixelBuffer::new(self.width, self.height, self.color_space.output(), samples)
    }

    /// Alpha plane for a `/Mask` colour-key array over raw sample values.
    fn color_key_alpha(&self, raw: &[u16], ranges: &[f32]) -> Vec<u8> {
        let comps = self.components();
        if ranges.len() < comps * 2 {
            log::debug!("Ignoring /Mask array with {} entries", ranges.len());
            return vec![255; raw.len() / comps.max(1)];
        }
        raw.chunks_exact(comps)
            .map(|pixel| {
                let masked = pixel.iter().enumerate().all(|(c, &v)| {
                    let v = f32::from(v);
                    ranges[c * 2] <= v && v <= ranges[c * 2 + 1]
                });
                if masked {
                    0
                } else {
                    255
                }
            })
            .collect()
    }
}

/// Resolve a possibly indirect image stream.
pub fn image_stream<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Result<&'a Stream, String> {
    resolve(doc, obj)?
        .as_stream()
        .map_err(|_| "image resource is not a stream".to_string())
}
