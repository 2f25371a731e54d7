//! Stream filter decoding for image XObjects.
//!
//! General-purpose filters are undone here; a terminal `DCTDecode` is left
//! to the JPEG decoder, and the remaining image codecs are reported as
//! unsupported.

use std::io::Read;

use flate2::read::ZlibDecoder;
use weezl::{decode::Decoder as LzwDecoder, BitOrder};

/// A stream filter named in a `/Filter` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Flate,
    AsciiHex,
    Ascii85,
    RunLength,
    Lzw,
    Dct,
    Jpx,
    Jbig2,
    CcittFax,
    Unknown(String),
}

impl Filter {
    /// Map a filter name, including inline-image abbreviations.
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"FlateDecode" | b"Fl" => Filter::Flate,
            b"ASCIIHexDecode" | b"AHx" => Filter::AsciiHex,
            b"ASCII85Decode" | b"A85" => Filter::Ascii85,
            b"RunLengthDecode" | b"RL" => Filter::RunLength,
            b"LZWDecode" | b"LZW" => Filter::Lzw,
            b"DCTDecode" | b"DCT" => Filter::Dct,
            b"JPXDecode" => Filter::Jpx,
            b"JBIG2Decode" => Filter::Jbig2,
            b"CCITTFaxDecode" | b"CCF" => Filter::CcittFax,
            other => Filter::Unknown(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Filters that produce pixels rather than bytes.
    pub fn is_image_codec(&self) -> bool {
        matches!(
            self,
            Filter::Dct | Filter::Jpx | Filter::Jbig2 | Filter::CcittFax
        )
    }
}

/// `/DecodeParms` values used by Flate and LZW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
    /// LZW code width grows one code early (`/EarlyChange 1`)
    pub early_change: bool,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

/// One step of a filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStep {
    pub filter: Filter,
    pub params: PredictorParams,
}

/// Result of running a filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Raw samples
    Samples(Vec<u8>),
    /// A complete JPEG stream
    Jpeg(Vec<u8>),
}

/// Apply a filter chain in order.
pub fn run_chain(data: &[u8], steps: &[FilterStep]) -> Result<Decoded, String> {
    let mut buf = data.to_vec();

    for (index, step) in steps.iter().enumerate() {
        let last = index + 1 == steps.len();
        buf = match &step.filter {
            Filter::Flate => apply_predictor(flate_decode(&buf)?, &step.params)?,
            Filter::AsciiHex => ascii_hex_decode(&buf)?,
            Filter::Ascii85 => ascii85_decode(&buf)?,
            Filter::RunLength => run_length_decode(&buf),
            Filter::Dct if last => return Ok(Decoded::Jpeg(buf)),
            Filter::Dct => return Err("DCTDecode must be the last filter".to_string()),
            Filter::Lzw => apply_predictor(lzw_decode(&buf, step.params.early_change)?, &step.params)?,
            Filter::Jpx => return Err("JPXDecode (JPEG 2000) is not supported".to_string()),
            Filter::Jbig2 => return Err("JBIG2Decode is not supported".to_string()),
            Filter::CcittFax => return Err("CCITTFaxDecode is not supported".to_string()),
            Filter::Unknown(name) => return Err(format!("unknown filter /{}", name)),
        };
    }

    Ok(Decoded::Samples(buf))
}

/// Inflate zlib data.
///
/// Damaged streams keep whatever was inflated before the error.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) if !out.is_empty() => {
            log::warn!("FlateDecode stopped early ({}), keeping {} bytes", e, out.len());
            Ok(out)
        }
        Err(e) => Err(format!("FlateDecode failed: {}", e)),
    }
}

/// Decode LZW data with 8-bit literals, MSB first.
///
/// Like Flate, a damaged stream keeps what was decoded before the error.
pub fn lzw_decode(data: &[u8], early_change: bool) -> Result<Vec<u8>, String> {
    let mut decoder = if early_change {
        LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        LzwDecoder::new(BitOrder::Msb, 8)
    };
    let mut out = Vec::new();
    let result = decoder.into_vec(&mut out).decode(data);
    match result.status {
        Ok(_) => Ok(out),
        Err(e) if !out.is_empty() => {
            log::warn!("LZWDecode stopped early ({}), keeping {} bytes", e, out.len());
            Ok(out)
        }
        Err(e) => Err(format!("LZWDecode failed: {}", e)),
    }
}

/// Undo a TIFF or PNG predictor.
pub fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, String> {
    match params.predictor {
        0 | 1 => Ok(data),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(&data, params),
        other => Err(format!("unsupported predictor {}", other)),
    }
}

fn row_length(params: &PredictorParams) -> usize {
    (params.colors * params.bits_per_component * params.columns + 7) / 8
}

fn tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>, String> {
    if params.bits_per_component != 8 {
        return Err(format!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        ));
    }
    let row_len = row_length(params);
    if row_len == 0 {
        return Ok(data);
    }
    for row in data.chunks_mut(row_len) {
        for i in params.colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - params.colors]);
        }
    }
    Ok(data)
}

fn png_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>, String> {
    let row_len = row_length(params);
    let bpp = ((params.colors * params.bits_per_component + 7) / 8).max(1);
    if row_len == 0 {
        return Ok(Vec::new());
    }

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&tag, encoded) = match chunk.split_first() {
            Some(split) => split,
            None => break,
        };
        let mut row = encoded.to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => return Err(format!("invalid PNG row filter {}", other)),
            };
        }

        out.extend_from_slice(&row[..encoded.len()]);
        prev = row;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Decode `ASCIIHexDecode` data.
pub fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = (byte as char)
            .to_digit(16)
            .ok_or_else(|| format!("invalid hex digit {:?}", byte as char))? as u8;
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }

    Ok(out)
}

/// Decode `ASCII85Decode` data.
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;

    let mut bytes = data.iter().copied();
    if data.starts_with(b"<~") {
        bytes.next();
        bytes.next();
    }

    while let Some(byte) = bytes.next() {
        match byte {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&ascii85_group(&group)?);
                    len = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            other => return Err(format!("invalid ASCII85 character {:?}", other as char)),
        }
    }

    match len {
        0 => {}
        1 => return Err("truncated ASCII85 group".to_string()),
        n => {
            for slot in group.iter_mut().skip(n) {
                *slot = b'u' - b'!';
            }
            out.extend_from_slice(&ascii85_group(&group)?[..n - 1]);
        }
    }

    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> Result<[u8; 4], String> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    u32::try_from(value)
        .map(u32::to_be_bytes)
        .map_err(|_| "ASCII85 group out of range".to_string())
}

/// Decode `RunLengthDecode` data.
pub fn run_length_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = (i + usize::from(length) + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&byte) = data.get(i) {
                    out.extend(std::iter::repeat(byte).take(257 - usize::from(length)));
                }
                i += 1;
            }
        }
    }

    out
}
