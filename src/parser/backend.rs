//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for the PDF operations image extraction
//! needs, isolating the concrete PDF library (lopdf) from the extraction
//! loop.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::detect_format_from_bytes;
use crate::error::{Error, Result};
use crate::model::{ImageRef, PixelBuffer, ResourceId};

use super::decode::{image_stream, ImageDecoder};
use super::objects::{get_resolved, resolve};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Depth limit for `/Parent` chains and nested Form XObjects.
const MAX_NESTING: usize = 64;

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, image reference discovery and
/// image decoding without exposing any concrete PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Image references of a page, in resource dictionary order.
    fn page_images(&self, page_number: u32, page: PageId, include_forms: bool)
        -> Result<Vec<ImageRef>>;

    /// Decode an image resource into pixels.
    fn decode_image(&self, resource: ResourceId, apply_masks: bool) -> Result<PixelBuffer>;
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
        Self::load_bytes(&data)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let format = detect_format_from_bytes(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        log::debug!(
            "Opened PDF {} ({} bytes, {} pages)",
            format.version,
            data.len(),
            doc.get_pages().len()
        );
        Ok(Self { doc })
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Release the document.
    pub fn close(self) {
        log::debug!("Closing PDF document");
        drop(self.doc);
    }

    /// Resources dictionary of a page, following `/Parent` inheritance.
    fn page_resources(&self, page: PageId) -> Result<Option<&Dictionary>> {
        let mut node = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::PdfParse(format!("page {} {} R: {}", page.0, page.1, e)))?;

        for _ in 0..MAX_NESTING {
            if let Some(Object::Dictionary(resources)) = get_resolved(&self.doc, node, b"Resources") {
                return Ok(Some(resources));
            }
            node = match get_resolved(&self.doc, node, b"Parent") {
                Some(Object::Dictionary(parent)) => parent,
                _ => return Ok(None),
            };
        }
        log::warn!("Page {} {} R: /Parent chain too deep", page.0, page.1);
        Ok(None)
    }

    fn collect_images(
        &self,
        resources: &Dictionary,
        page_number: u32,
        include_forms: bool,
        in_form: bool,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<ImageRef>,
    ) {
        let xobjects = match get_resolved(&self.doc, resources, b"XObject") {
            Some(Object::Dictionary(d)) => d,
            _ => return,
        };

        for (name, entry) in xobjects.iter() {
            let name = String::from_utf8_lossy(name).into_owned();
            let id = match entry {
                Object::Reference(id) => *id,
                _ => {
                    log::debug!("Page {}: skipping direct XObject /{}", page_number, name);
                    continue;
                }
            };
            let stream = match image_stream(&self.doc, entry) {
                Ok(stream) => stream,
                // Nothing marks a dangling entry as an image, so it is not
                // counted as a reference in either mode.
                Err(e) => {
                    log::warn!("Page {}: XObject /{} unreadable: {}", page_number, name, e);
                    continue;
                }
            };

            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => {
                    let reference = ImageRef::new(page_number, name, id);
                    out.push(if in_form { reference.in_form() } else { reference });
                }
                Ok(b"Form") if include_forms => {
                    if visited.len() >= MAX_NESTING || !visited.insert(id) {
                        log::debug!("Page {}: not re-entering form /{}", page_number, name);
                        continue;
                    }
                    if let Some(Object::Dictionary(form_resources)) =
                        get_resolved(&self.doc, &stream.dict, b"Resources")
                    {
                        self.collect_images(form_resources, page_number, include_forms, true, visited, out);
                    }
                    visited.remove(&id);
                }
                _ => {}
            }
        }
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_images(
        &self,
        page_number: u32,
        page: PageId,
        include_forms: bool,
    ) -> Result<Vec<ImageRef>> {
        let mut refs = Vec::new();
        if let Some(resources) = self.page_resources(page)? {
            let mut visited = HashSet::new();
            self.collect_images(resources, page_number, include_forms, false, &mut visited, &mut refs);
        }
        Ok(refs)
    }

    fn decode_image(&self, resource: ResourceId, apply_masks: bool) -> Result<PixelBuffer> {
        let id: ObjectId = resource.into();
        let obj = self
            .doc
            .get_object(id)
            .map_err(|e| Error::decode(resource, e.to_string()))?;
        let stream = resolve(&self.doc, obj)
            .and_then(|o| o.as_stream().map_err(|_| "not a stream".to_string()))
            .map_err(|reason| Error::decode(resource, reason))?;

        ImageDecoder::new(&self.doc, apply_masks)
            .decode(stream)
            .map_err(|reason| Error::decode(resource, reason))
    }
}
