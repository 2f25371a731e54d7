//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Builds small PDFs whose pages only carry image XObjects.
pub struct PdfBuilder {
    doc: Document,
    pages: Vec<Vec<(String, ObjectId)>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            pages: Vec::new(),
        }
    }

    /// Add an image XObject with the given extra dictionary entries.
    pub fn image(&mut self, width: i64, height: i64, mut dict: Dictionary, data: Vec<u8>) -> ObjectId {
        dict.set("Type", "XObject");
        dict.set("Subtype", "Image");
        dict.set("Width", Object::Integer(width));
        dict.set("Height", Object::Integer(height));
        if !dict.has(b"BitsPerComponent") {
            dict.set("BitsPerComponent", Object::Integer(8));
        }
        self.doc.add_object(Stream::new(dict, data))
    }

    pub fn gray(&mut self, width: i64, height: i64, samples: Vec<u8>) -> ObjectId {
        self.image(width, height, dictionary! { "ColorSpace" => "DeviceGray" }, samples)
    }

    pub fn rgb(&mut self, width: i64, height: i64, samples: Vec<u8>) -> ObjectId {
        self.image(width, height, dictionary! { "ColorSpace" => "DeviceRGB" }, samples)
    }

    pub fn cmyk(&mut self, width: i64, height: i64, samples: Vec<u8>) -> ObjectId {
        self.image(width, height, dictionary! { "ColorSpace" => "DeviceCMYK" }, samples)
    }

    /// Palette image with an RGB lookup table.
    pub fn indexed(&mut self, width: i64, height: i64, palette: Vec<u8>, indices: Vec<u8>) -> ObjectId {
        let hival = (palette.len() / 3) as i64 - 1;
        let color_space = vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(hival),
            Object::String(palette, lopdf::StringFormat::Hexadecimal),
        ];
        self.image(width, height, dictionary! { "ColorSpace" => color_space }, indices)
    }

    /// RGB image with a gray soft mask.
    pub fn rgb_with_smask(&mut self, width: i64, height: i64, samples: Vec<u8>, alpha: Vec<u8>) -> ObjectId {
        let smask = self.gray(width, height, alpha);
        self.image(
            width,
            height,
            dictionary! { "ColorSpace" => "DeviceRGB", "SMask" => smask },
            samples,
        )
    }

    /// RGB image compressed with Flate and the PNG Up predictor.
    pub fn flate_rgb(&mut self, width: i64, height: i64, samples: &[u8]) -> ObjectId {
        let row = width as usize * 3;
        let mut predicted = Vec::new();
        let mut previous = vec![0u8; row];
        for line in samples.chunks(row) {
            predicted.push(2);
            predicted.extend(line.iter().zip(&previous).map(|(v, p)| v.wrapping_sub(*p)));
            previous = line.to_vec();
        }
        self.image(
            width,
            height,
            dictionary! {
                "ColorSpace" => "DeviceRGB",
                "Filter" => "FlateDecode",
                "DecodeParms" => dictionary! {
                    "Predictor" => Object::Integer(15),
                    "Colors" => Object::Integer(3),
                    "Columns" => Object::Integer(width),
                },
            },
            zlib(&predicted),
        )
    }

    /// Gray image compressed with LZW.
    pub fn lzw_gray(&mut self, width: i64, height: i64, samples: &[u8], early_change: bool) -> ObjectId {
        let mut dict = dictionary! { "ColorSpace" => "DeviceGray", "Filter" => "LZWDecode" };
        let mut encoder = if early_change {
            weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        } else {
            dict.set(
                "DecodeParms",
                dictionary! { "EarlyChange" => Object::Integer(0) },
            );
            weezl::encode::Encoder::new(weezl::BitOrder::Msb, 8)
        };
        let data = encoder.encode(samples).unwrap();
        self.image(width, height, dict, data)
    }

    /// Baseline JPEG of a solid colour.
    pub fn jpeg(&mut self, width: u32, height: u32, color: [u8; 3]) -> ObjectId {
        let img = RgbImage::from_pixel(width, height, image::Rgb(color));
        let mut data = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut data, ImageFormat::Jpeg)
            .unwrap();
        self.image(
            width as i64,
            height as i64,
            dictionary! { "ColorSpace" => "DeviceRGB", "Filter" => "DCTDecode" },
            data.into_inner(),
        )
    }

    /// Image whose Flate stream cannot be inflated.
    pub fn corrupt(&mut self) -> ObjectId {
        self.image(
            2,
            2,
            dictionary! { "ColorSpace" => "DeviceRGB", "Filter" => "FlateDecode" },
            b"definitely not zlib".to_vec(),
        )
    }

    /// Append a page whose XObject dictionary lists `xobjects` in order.
    pub fn page(&mut self, xobjects: &[(&str, ObjectId)]) -> &mut Self {
        self.pages.push(
            xobjects
                .iter()
                .map(|(name, id)| (name.to_string(), *id))
                .collect(),
        );
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let pages_id = self.doc.new_object_id();
        let mut kids = Vec::new();

        for xobjects in &self.pages {
            let mut dict = Dictionary::new();
            let mut content = Vec::new();
            for (name, id) in xobjects {
                dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
                content.extend(format!("q 10 0 0 10 0 0 cm /{} Do Q\n", name).into_bytes());
            }
            let contents = self.doc.add_object(Stream::new(Dictionary::new(), content));
            let page = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
                "Contents" => contents,
                "Resources" => dictionary! { "XObject" => dict },
            });
            kids.push(Object::Reference(page));
        }

        let count = kids.len() as i64;
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog = self
            .doc
            .add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        self.doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// The 3-page document used across tests: page 1 shows A and B, page 2
/// shows A, C and C again, page 3 shows B.
pub fn three_page_pdf() -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    let a = pdf.gray(1, 1, vec![10]);
    let b = pdf.rgb(1, 1, vec![1, 2, 3]);
    let c = pdf.gray(2, 1, vec![30, 40]);
    pdf.page(&[("A", a), ("B", b)])
        .page(&[("A", a), ("C", c), ("C2", c)])
        .page(&[("B", b)]);
    pdf.build()
}

/// Serve every connection with the same status line and body.
///
/// Returns the base URL of the listener.
pub fn serve(status: u16, content_type: &str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let content_type = content_type.to_string();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                content_type,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
            let _ = stream.flush();
        }
    });

    format!("http://{}", addr)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Files currently in `dir`.
pub fn dir_entries(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}
