//! # pdfimg
//!
//! Extract the embedded raster images of a PDF document as PNG files.
//!
//! Every page is visited in order, each distinct image resource is written
//! once (on the first page that uses it), and all output is normalized to
//! 8-bit RGB without alpha.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfimg::{extract_images, ExtractOptions};
//!
//! fn main() -> pdfimg::Result<()> {
//!     let data = std::fs::read("document.pdf")?;
//!     let options = ExtractOptions::new().with_output_dir("images");
//!
//!     let report = extract_images(&data, &options)?;
//!     for path in report.paths() {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Deduplication**: images placed several times are written once
//! - **Colour normalization**: Gray, CMYK, Lab, Indexed, DeviceN to RGB
//! - **Masks**: soft masks and stencil masks are flattened onto white
//! - **Download**: fetch a PDF by URL (`fetch` feature, on by default)

pub mod detect;
pub mod error;
pub mod extract;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod model;
pub mod parser;

// Re-export commonly used types
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use error::{Error, ErrorKind, Result};
pub use extract::{image_file_name, ExtractObserver, ImageExtractor, LogObserver, NoopObserver};
#[cfg(feature = "fetch")]
pub use fetch::{fetch_and_extract, FetchOptions, FetchedPdf, HttpFetcher, PdfFetcher};
pub use model::{
    ColorSpace, ExtractedImage, ExtractionReport, ImageRef, ListedImage, PixelBuffer, ResourceId,
    SkippedImage,
};
pub use parser::{
    ErrorMode, ExtractOptions, LopdfBackend, PageSelection, PdfBackend, DEFAULT_OUTPUT_DIR,
};

use std::path::{Path, PathBuf};

/// Extract the images of an in-memory PDF.
///
/// Progress is logged through the `log` crate.
///
/// # Arguments
///
/// * `data` - PDF file content as bytes
/// * `options` - Output directory, page selection and error handling
///
/// # Example
///
/// ```no_run
/// use pdfimg::{extract_images, ExtractOptions};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let report = extract_images(&data, &ExtractOptions::default()).unwrap();
/// println!("{} images", report.image_count());
/// ```
pub fn extract_images(data: &[u8], options: &ExtractOptions) -> Result<ExtractionReport> {
    extract::extract_from_bytes(data, options, LogObserver)
}

/// Extract the images of an in-memory PDF, reporting progress to `observer`.
pub fn extract_images_with_observer<O: ExtractObserver>(
    data: &[u8],
    options: &ExtractOptions,
    observer: O,
) -> Result<ExtractionReport> {
    extract::extract_from_bytes(data, options, observer)
}

/// Extract the images of a PDF file.
///
/// # Example
///
/// ```no_run
/// use pdfimg::{extract_images_from_file, ExtractOptions};
///
/// let options = ExtractOptions::new().with_output_dir("./images").lenient();
/// let report = extract_images_from_file("document.pdf", &options).unwrap();
/// ```
pub fn extract_images_from_file<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> Result<ExtractionReport> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::filesystem(path, e))?;
    extract_images(&data, options)
}

/// List the image references of an in-memory PDF without writing anything.
///
/// References whose resource appeared earlier are flagged as duplicates.
pub fn list_images(data: &[u8], options: &ExtractOptions) -> Result<Vec<ListedImage>> {
    extract::list_from_bytes(data, options)
}

/// Download a PDF and extract its images.
///
/// # Example
///
/// ```no_run
/// use pdfimg::{fetch_images, ExtractOptions};
///
/// let report = fetch_images("https://example.com/report.pdf", &ExtractOptions::default())?;
/// # Ok::<(), pdfimg::Error>(())
/// ```
#[cfg(feature = "fetch")]
pub fn fetch_images(url: &str, options: &ExtractOptions) -> Result<ExtractionReport> {
    let fetcher = HttpFetcher::new(FetchOptions::default())?;
    fetch_and_extract(&fetcher, url, options, LogObserver)
}

/// Builder for extraction runs.
///
/// # Example
///
/// ```no_run
/// use pdfimg::{PageSelection, Pdfimg};
///
/// let report = Pdfimg::new()
///     .with_output_dir("./images")
///     .with_pages(PageSelection::Range(1..=3))
///     .lenient()
///     .extract_file("document.pdf")?;
/// println!("{:?}", report.paths());
/// # Ok::<(), pdfimg::Error>(())
/// ```
pub struct Pdfimg {
    options: ExtractOptions,
    #[cfg(feature = "fetch")]
    fetch_options: FetchOptions,
}

impl Pdfimg {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            options: ExtractOptions::default(),
            #[cfg(feature = "fetch")]
            fetch_options: FetchOptions::default(),
        }
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options = self.options.with_output_dir(dir);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Skip images that fail to decode instead of aborting.
    pub fn lenient(mut self) -> Self {
        self.options = self.options.lenient();
        self
    }

    /// Ignore images inside Form XObjects.
    pub fn without_forms(mut self) -> Self {
        self.options = self.options.with_forms(false);
        self
    }

    /// Do not apply soft masks or stencil masks.
    pub fn without_masks(mut self) -> Self {
        self.options = self.options.with_masks(false);
        self
    }

    /// Set download options.
    #[cfg(feature = "fetch")]
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// The extraction options built so far.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract from bytes.
    pub fn extract_bytes(&self, data: &[u8]) -> Result<ExtractionReport> {
        extract_images(data, &self.options)
    }

    /// Extract from a file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionReport> {
        extract_images_from_file(path, &self.options)
    }

    /// Download and extract.
    #[cfg(feature = "fetch")]
    pub fn fetch(&self, url: &str) -> Result<ExtractionReport> {
        let fetcher = HttpFetcher::new(self.fetch_options.clone())?;
        fetch_and_extract(&fetcher, url, &self.options, LogObserver)
    }
}

impl Default for Pdfimg {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdfimg_builder() {
        let builder = Pdfimg::new()
            .with_output_dir("out")
            .lenient()
            .without_forms()
            .without_masks();

        assert_eq!(builder.options().output_dir, PathBuf::from("out"));
        assert_eq!(builder.options().error_mode, ErrorMode::Lenient);
        assert!(!builder.options().include_forms);
        assert!(!builder.options().apply_masks);
    }

    #[test]
    fn test_pdfimg_builder_default() {
        let builder = Pdfimg::default();
        assert_eq!(builder.options().output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(builder.options().error_mode, ErrorMode::Strict);
        assert_eq!(builder.options().pages, PageSelection::All);
    }

    #[test]
    fn test_pdfimg_builder_with_pages() {
        let builder = Pdfimg::new().with_pages(PageSelection::Range(1..=5));
        assert!(matches!(builder.options().pages, PageSelection::Range(_)));
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_extract_images_empty_data() {
        let data: [u8; 0] = [];
        let result = extract_images(&data, &ExtractOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_extract_images_unknown_magic() {
        let data = [0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let result = extract_images(&data, &ExtractOptions::default());
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_extract_images_truncated_pdf() {
        let result = extract_images(b"%PDF-1.7\n%garbage", &ExtractOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_list_images_invalid_bytes() {
        assert!(list_images(b"not a pdf", &ExtractOptions::default()).is_err());
    }

    #[test]
    fn test_extract_images_from_missing_file() {
        let result = extract_images_from_file("/nonexistent/file.pdf", &ExtractOptions::default());
        assert!(matches!(result, Err(Error::Filesystem { .. })));
    }

    #[test]
    fn test_builder_invalid_bytes() {
        let result = Pdfimg::new().extract_bytes(b"not a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn test_file_name_reexport() {
        assert_eq!(image_file_name(2, 5), "page_2_image_5.png");
    }
}
