//! Colour space resolution for image XObjects.

use lopdf::{Document as LopdfDocument, Object};

use crate::model::{ColorSpace, LAB_D50_WHITE, LAB_DEFAULT_RANGE};

use super::objects::{number, resolve, stream_bytes};

/// Colour space of the samples stored in an image stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfColorSpace {
    /// Samples are colour values in the given space
    Direct(ColorSpace),
    /// Samples are palette indices
    Indexed {
        base: ColorSpace,
        hival: usize,
        lookup: Vec<u8>,
    },
}

impl PdfColorSpace {
    /// Components per pixel as stored in the stream.
    pub fn stream_components(&self) -> usize {
        match self {
            PdfColorSpace::Direct(cs) => cs.components(),
            PdfColorSpace::Indexed { .. } => 1,
        }
    }

    /// Colour space of the decoded buffer.
    pub fn output(&self) -> ColorSpace {
        match self {
            PdfColorSpace::Direct(cs) => cs.clone(),
            PdfColorSpace::Indexed { base, .. } => base.clone(),
        }
    }

    /// Value range of each stream component, used as the default `/Decode`.
    pub fn component_ranges(&self, bits_per_component: u8) -> Vec<[f32; 2]> {
        match self {
            PdfColorSpace::Indexed { .. } => {
                vec![[0.0, ((1u32 << bits_per_component) - 1) as f32]]
            }
            PdfColorSpace::Direct(cs) => value_ranges(cs),
        }
    }
}

/// Value range of each component of a colour space.
pub fn value_ranges(cs: &ColorSpace) -> Vec<[f32; 2]> {
    match cs {
        ColorSpace::Lab {
            a_range, b_range, ..
        } => vec![[0.0, 100.0], *a_range, *b_range],
        other => vec![[0.0, 1.0]; other.components()],
    }
}

/// Resolve a `/ColorSpace` entry.
pub fn resolve_color_space(doc: &LopdfDocument, obj: &Object) -> Result<PdfColorSpace, String> {
    match resolve(doc, obj)? {
        Object::Name(name) => device_by_name(name)
            .map(PdfColorSpace::Direct)
            .ok_or_else(|| format!("unsupported colour space /{}", lossy(name))),
        Object::Array(items) => resolve_array(doc, items),
        other => Err(format!("invalid colour space object {:?}", other)),
    }
}

fn device_by_name(name: &[u8]) -> Option<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
        _ => None,
    }
}

fn resolve_array(doc: &LopdfDocument, items: &[Object]) -> Result<PdfColorSpace, String> {
    let family = items
        .first()
        .and_then(|o| o.as_name().ok())
        .ok_or("colour space array without a family name")?;

    if let Some(cs) = device_by_name(family) {
        return Ok(PdfColorSpace::Direct(cs));
    }

    let direct = match family {
        b"ICCBased" => icc_based(doc, items.get(1))?,
        b"Lab" => lab(doc, items.get(1))?,
        b"Separation" => ColorSpace::DeviceN(1),
        b"DeviceN" => {
            let names = items
                .get(1)
                .map(|o| resolve(doc, o))
                .transpose()?
                .and_then(|o| o.as_array().ok())
                .ok_or("DeviceN without colorant names")?;
            let n = u8::try_from(names.len())
                .ok()
                .filter(|n| *n > 0)
                .ok_or("DeviceN with an invalid number of colorants")?;
            ColorSpace::DeviceN(n)
        }
        b"Indexed" | b"I" => return indexed(doc, items),
        b"Pattern" => return Err("Pattern colour space is not valid for images".to_string()),
        other => return Err(format!("unsupported colour space /{}", lossy(other))),
    };

    Ok(PdfColorSpace::Direct(direct))
}

fn icc_based(doc: &LopdfDocument, stream_ref: Option<&Object>) -> Result<ColorSpace, String> {
    let stream = stream_ref
        .map(|o| resolve(doc, o))
        .transpose()?
        .and_then(|o| o.as_stream().ok())
        .ok_or("ICCBased without a profile stream")?;

    let n = stream
        .dict
        .get(b"N")
        .ok()
        .and_then(|o| o.as_i64().ok());

    match n {
        Some(1) => Ok(ColorSpace::Gray),
        Some(3) => Ok(ColorSpace::Rgb),
        Some(4) => Ok(ColorSpace::Cmyk),
        _ => match stream.dict.get(b"Alternate") {
            Ok(alt) => match resolve_color_space(doc, alt)? {
                PdfColorSpace::Direct(cs) => Ok(cs),
                PdfColorSpace::Indexed { .. } => Err("ICCBased alternate cannot be Indexed".into()),
            },
            Err(_) => Err(format!("ICCBased profile with unsupported /N {:?}", n)),
        },
    }
}

fn lab(doc: &LopdfDocument, params: Option<&Object>) -> Result<ColorSpace, String> {
    let dict = params
        .map(|o| resolve(doc, o))
        .transpose()?
        .and_then(|o| o.as_dict().ok());

    let numbers = |key: &[u8]| -> Option<Vec<f32>> {
        let arr = dict?.get(key).ok()?.as_array().ok()?;
        arr.iter().map(number).collect()
    };

    let mut white_point = LAB_D50_WHITE;
    let mut a_range = LAB_DEFAULT_RANGE;
    let mut b_range = LAB_DEFAULT_RANGE;

    if let Some(wp) = numbers(b"WhitePoint").filter(|v| v.len() == 3) {
        white_point = [wp[0], wp[1], wp[2]];
    }
    if let Some(range) = numbers(b"Range").filter(|v| v.len() == 4) {
        a_range = [range[0], range[1]];
        b_range = [range[2], range[3]];
    }

    Ok(ColorSpace::Lab {
        white_point,
        a_range,
        b_range,
    })
}

fn indexed(doc: &LopdfDocument, items: &[Object]) -> Result<PdfColorSpace, String> {
    let base = match items.get(1) {
        Some(obj) => match resolve_color_space(doc, obj)? {
            PdfColorSpace::Direct(cs) => cs,
            PdfColorSpace::Indexed { .. } => return Err("nested Indexed colour space".into()),
        },
        None => return Err("Indexed without a base colour space".into()),
    };

    let hival = items
        .get(2)
        .map(|o| resolve(doc, o))
        .transpose()?
        .and_then(|o| o.as_i64().ok())
        .filter(|h| (0..=255).contains(h))
        .ok_or("Indexed with an invalid hival")? as usize;

    let lookup = match items.get(3).map(|o| resolve(doc, o)).transpose()? {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(stream)) => stream_bytes(doc, stream)?,
        _ => return Err("Indexed without a lookup table".into()),
    };

    let needed = (hival + 1) * base.components();
    if lookup.len() < needed {
        log::warn!(
            "Indexed lookup table has {} bytes, expected {}; missing entries read as 0",
            lookup.len(),
            needed
        );
    }

    Ok(PdfColorSpace::Indexed {
        base,
        hival,
        lookup,
    })
}

fn lossy(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};

    fn name(n: &str) -> Object {
        Object::Name(n.as_bytes().to_vec())
    }

    #[test]
    fn test_device_names() {
        let doc = LopdfDocument::with_version("1.5");
        for (n, expected) in [
            ("DeviceGray", ColorSpace::Gray),
            ("DeviceRGB", ColorSpace::Rgb),
            ("DeviceCMYK", ColorSpace::Cmyk),
            ("RGB", ColorSpace::Rgb),
        ] {
            assert_eq!(
                resolve_color_space(&doc, &name(n)).unwrap(),
                PdfColorSpace::Direct(expected)
            );
        }
        assert!(resolve_color_space(&doc, &name("Pattern")).is_err());
    }

    #[test]
    fn test_icc_based_uses_component_count() {
        let mut doc = LopdfDocument::with_version("1.5");
        let profile = doc.add_object(Stream::new(dictionary! { "N" => Object::Integer(4) }, vec![]));
        let cs = Object::Array(vec![name("ICCBased"), Object::Reference(profile)]);
        assert_eq!(
            resolve_color_space(&doc, &cs).unwrap(),
            PdfColorSpace::Direct(ColorSpace::Cmyk)
        );
    }

    #[test]
    fn test_icc_based_falls_back_to_alternate() {
        let mut doc = LopdfDocument::with_version("1.5");
        let profile = doc.add_object(Stream::new(
            dictionary! { "Alternate" => "DeviceGray" },
            vec![],
        ));
        let cs = Object::Array(vec![name("ICCBased"), Object::Reference(profile)]);
        assert_eq!(
            resolve_color_space(&doc, &cs).unwrap().output(),
            ColorSpace::Gray
        );
    }

    #[test]
    fn test_indexed_with_string_lookup() {
        let doc = LopdfDocument::with_version("1.5");
        let cs = Object::Array(vec![
            name("Indexed"),
            name("DeviceRGB"),
            Object::Integer(1),
            Object::String(vec![255, 0, 0, 0, 0, 255], StringFormat::Hexadecimal),
        ]);
        let resolved = resolve_color_space(&doc, &cs).unwrap();
        assert_eq!(resolved.stream_components(), 1);
        assert_eq!(resolved.output(), ColorSpace::Rgb);
        assert_eq!(resolved.component_ranges(8), vec![[0.0, 255.0]]);
        match resolved {
            PdfColorSpace::Indexed { hival, lookup, .. } => {
                assert_eq!(hival, 1);
                assert_eq!(lookup.len(), 6);
            }
            other => panic!("expected Indexed, got {:?}", other),
        }
    }

    #[test]
    fn test_lab_ranges() {
        let doc = LopdfDocument::with_version("1.5");
        let params = dictionary! {
            "WhitePoint" => vec![Object::Real(0.95), Object::Integer(1), Object::Real(1.09)],
            "Range" => vec![Object::Integer(-128), Object::Integer(127), Object::Integer(-128), Object::Integer(127)],
        };
        let cs = Object::Array(vec![name("Lab"), Object::Dictionary(params)]);
        let resolved = resolve_color_space(&doc, &cs).unwrap();
        assert_eq!(
            resolved.component_ranges(8),
            vec![[0.0, 100.0], [-128.0, 127.0], [-128.0, 127.0]]
        );
    }

    #[test]
    fn test_separation_and_device_n() {
        let doc = LopdfDocument::with_version("1.5");
        let sep = Object::Array(vec![name("Separation"), name("Spot"), name("DeviceCMYK")]);
        assert_eq!(
            resolve_color_space(&doc, &sep).unwrap().output(),
            ColorSpace::DeviceN(1)
        );

        let device_n = Object::Array(vec![
            name("DeviceN"),
            Object::Array(vec![name("Cyan"), name("Spot")]),
            name("DeviceCMYK"),
        ]);
        assert_eq!(
            resolve_color_space(&doc, &device_n).unwrap().output(),
            ColorSpace::DeviceN(2)
        );
    }
}
