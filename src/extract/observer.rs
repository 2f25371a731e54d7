//! Observer hooks for extraction progress.
//!
//! The extractor reports what it does through an [`ExtractObserver`]
//! instead of printing. The CLI plugs in a progress bar; library callers
//! get [`LogObserver`] unless they pass their own.
//!
//! # Example
//!
//! ```
//! use pdfimg::extract::ExtractObserver;
//! use pdfimg::model::ExtractedImage;
//!
//! #[derive(Default)]
//! struct Counter {
//!     saved: usize,
//! }
//!
//! impl ExtractObserver for Counter {
//!     fn image_saved(&mut self, _image: &ExtractedImage) {
//!         self.saved += 1;
//!     }
//! }
//! ```

use crate::error::Error;
use crate::model::{ExtractedImage, ExtractionReport, ImageRef};

/// Receives extraction events.
///
/// All methods do nothing by default.
pub trait ExtractObserver {
    /// Called once after the document has been opened.
    fn document_opened(&mut self, page_count: usize) {
        let _ = page_count;
    }

    /// Called after a page's references were enumerated.
    ///
    /// # Arguments
    /// * `page` - Page number (1-indexed)
    /// * `references` - References found, duplicates included
    /// * `new_images` - References whose resource had not been seen
    fn page_scanned(&mut self, page: u32, references: usize, new_images: usize) {
        let _ = (page, references, new_images);
    }

    /// Called after an image file was written.
    fn image_saved(&mut self, image: &ExtractedImage) {
        let _ = image;
    }

    /// Called when an image is skipped in lenient mode.
    fn image_failed(&mut self, reference: &ImageRef, error: &Error) {
        let _ = (reference, error);
    }

    /// Called once with the final report.
    fn finished(&mut self, report: &ExtractionReport) {
        let _ = report;
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExtractObserver for NoopObserver {}

/// Observer that writes events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ExtractObserver for LogObserver {
    fn document_opened(&mut self, page_count: usize) {
        log::info!("Extracting images from {} page(s)", page_count);
    }

    fn page_scanned(&mut self, page: u32, references: usize, new_images: usize) {
        log::debug!(
            "Found {} image reference(s) on page {}, {} new",
            references,
            page,
            new_images
        );
    }

    fn image_saved(&mut self, image: &ExtractedImage) {
        log::debug!("Saved image: {}", image.path.display());
    }

    fn image_failed(&mut self, reference: &ImageRef, error: &Error) {
        log::warn!(
            "Skipping image /{} on page {}: {}",
            reference.name,
            reference.page,
            error
        );
    }

    fn finished(&mut self, report: &ExtractionReport) {
        log::info!(
            "Extracted and saved {} image(s) ({} duplicate reference(s) skipped)",
            report.image_count(),
            report.duplicates_skipped
        );
    }
}

impl<T: ExtractObserver + ?Sized> ExtractObserver for &mut T {
    fn document_opened(&mut self, page_count: usize) {
        (**self).document_opened(page_count)
    }

    fn page_scanned(&mut self, page: u32, references: usize, new_images: usize) {
        (**self).page_scanned(page, references, new_images)
    }

    fn image_saved(&mut self, image: &ExtractedImage) {
        (**self).image_saved(image)
    }

    fn image_failed(&mut self, reference: &ImageRef, error: &Error) {
        (**self).image_failed(reference, error)
    }

    fn finished(&mut self, report: &ExtractionReport) {
        (**self).finished(report)
    }
}
