//! The page-by-page extraction loop.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::model::{ExtractedImage, ExtractionReport, ImageRef, ListedImage, SkippedImage};
use crate::parser::{ErrorMode, ExtractOptions, PdfBackend};

use super::normalize::{normalize, NormalizedImage};
use super::observer::ExtractObserver;
use super::output::{ensure_output_dir, image_file_name, save_png};

/// Extracts the distinct images of one document.
///
/// Pages are visited in ascending order. Every image resource is written at
/// most once, on the first page that references it. The ordinal in the file
/// name counts the images written for that page, starting at 1.
pub struct ImageExtractor<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    options: &'a ExtractOptions,
}

impl<'a, B: PdfBackend + ?Sized> ImageExtractor<'a, B> {
    pub fn new(backend: &'a B, options: &'a ExtractOptions) -> Self {
        Self { backend, options }
    }

    /// Run the extraction, writing PNG files into the output directory.
    pub fn run<O: ExtractObserver>(&self, mut observer: O) -> Result<ExtractionReport> {
        ensure_output_dir(&self.options.output_dir)?;

        let pages = self.backend.pages();
        observer.document_opened(pages.len());

        let mut report = ExtractionReport::new();

        for (&page_number, &page_id) in &pages {
            if !self.options.pages.includes(page_number) {
                continue;
            }

            let refs = self
                .backend
                .page_images(page_number, page_id, self.options.include_forms)?;
            report.pages_scanned += 1;
            report.references_found += refs.len();

            let mut ordinal = 0u32;
            for reference in &refs {
                if !report.seen.insert(reference.resource) {
                    report.duplicates_skipped += 1;
                    log::trace!(
                        "Page {}: /{} ({}) already seen",
                        page_number,
                        reference.name,
                        reference.resource
                    );
                    continue;
                }

                let image = match self.decode(reference) {
                    Ok(image) => image,
                    Err(e) if self.skips(&e) => {
                        observer.image_failed(reference, &e);
                        report.failures.push(SkippedImage {
                            page: page_number,
                            resource: reference.resource,
                            name: reference.name.clone(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                ordinal += 1;
                let path = self
                    .options
                    .output_dir
                    .join(image_file_name(page_number, ordinal));
                save_png(&image.image, &path)?;

                let extracted = ExtractedImage {
                    page: page_number,
                    ordinal,
                    resource: reference.resource,
                    name: reference.name.clone(),
                    path,
                    width: image.width(),
                    height: image.height(),
                    source_color_space: image.source.to_string(),
                    had_alpha: image.had_alpha,
                };
                observer.image_saved(&extracted);
                report.images.push(extracted);
            }

            observer.page_scanned(page_number, refs.len(), ordinal as usize);
        }

        report.finish();
        observer.finished(&report);
        Ok(report)
    }

    /// Enumerate references without decoding or writing anything.
    pub fn list(&self) -> Result<Vec<ListedImage>> {
        let mut seen = BTreeSet::new();
        let mut listed = Vec::new();

        for (&page_number, &page_id) in &self.backend.pages() {
            if !self.options.pages.includes(page_number) {
                continue;
            }
            for reference in
                self.backend
                    .page_images(page_number, page_id, self.options.include_forms)?
            {
                let duplicate = !seen.insert(reference.resource);
                listed.push(ListedImage {
                    reference,
                    duplicate,
                });
            }
        }
        Ok(listed)
    }

    fn decode(&self, reference: &ImageRef) -> Result<NormalizedImage> {
        let pixels = self
            .backend
            .decode_image(reference.resource, self.options.apply_masks)?;
        normalize(pixels).map_err(|reason| Error::decode(reference.resource, reason))
    }

    fn skips(&self, error: &Error) -> bool {
        self.options.error_mode == ErrorMode::Lenient && error.is_image_level()
    }
}
