//! Image extraction.
//!
//! Walks the pages of a document through a [`PdfBackend`], skips image
//! resources that were already written, normalizes the rest to RGB and
//! stores them as `page_{N}_image_{M}.png`.

mod extractor;
mod normalize;
mod observer;
mod output;

pub use extractor::ImageExtractor;
pub use normalize::{normalize, NormalizedImage};
pub use observer::{ExtractObserver, LogObserver, NoopObserver};
pub use output::{ensure_output_dir, image_file_name, save_png};

use crate::error::Result;
use crate::model::{ExtractionReport, ListedImage};
use crate::parser::{ExtractOptions, LopdfBackend, PdfBackend};

/// Extract the images of an in-memory PDF.
pub fn extract_from_bytes<O: ExtractObserver>(
    data: &[u8],
    options: &ExtractOptions,
    observer: O,
) -> Result<ExtractionReport> {
    let backend = LopdfBackend::load_bytes(data)?;
    let result = extract_with_backend(&backend, options, observer);
    backend.close();
    result
}

/// Extract the images of any backend.
pub fn extract_with_backend<B: PdfBackend + ?Sized, O: ExtractObserver>(
    backend: &B,
    options: &ExtractOptions,
    observer: O,
) -> Result<ExtractionReport> {
    ImageExtractor::new(backend, options).run(observer)
}

/// List the image references of an in-memory PDF.
pub fn list_from_bytes(data: &[u8], options: &ExtractOptions) -> Result<Vec<ListedImage>> {
    let backend = LopdfBackend::load_bytes(data)?;
    let listed = ImageExtractor::new(&backend, options).list();
    backend.close();
    listed
}
