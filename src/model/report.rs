//! Extraction results.

use super::ResourceId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// An image written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    /// Page of the first occurrence (1-indexed)
    pub page: u32,

    /// Ordinal among new images on that page (1-indexed)
    pub ordinal: u32,

    /// Underlying image resource
    pub resource: ResourceId,

    /// XObject resource name of the first occurrence
    pub name: String,

    /// Output file path
    pub path: PathBuf,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Colour space before normalization
    pub source_color_space: String,

    /// Whether the decoded image carried an alpha channel
    pub had_alpha: bool,
}

/// An image that was skipped in lenient mode.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedImage {
    pub page: u32,
    pub resource: ResourceId,
    pub name: String,
    pub reason: String,
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Written images, in write order
    pub images: Vec<ExtractedImage>,

    /// Every resource id encountered (written or failed)
    pub seen: BTreeSet<ResourceId>,

    /// Number of pages visited
    pub pages_scanned: u32,

    /// Total image references enumerated, duplicates included
    pub references_found: usize,

    /// References skipped because their resource was already seen
    pub duplicates_skipped: usize,

    /// Images skipped after a decode failure (lenient mode only)
    pub failures: Vec<SkippedImage>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExtractionReport {
    /// Create an empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            seen: BTreeSet::new(),
            pages_scanned: 0,
            references_found: 0,
            duplicates_skipped: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Output paths in the order the files were written.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.images.iter().map(|img| img.path.clone()).collect()
    }

    /// Number of images written.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Whether no image was written.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Images written for one page.
    pub fn images_on_page(&self, page: u32) -> impl Iterator<Item = &ExtractedImage> {
        self.images.iter().filter(move |img| img.page == page)
    }

    /// Mark the run as finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Serialize the report as JSON.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl Default for ExtractionReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(page: u32, ordinal: u32) -> ExtractedImage {
        ExtractedImage {
            page,
            ordinal,
            resource: ResourceId::new(page * 10 + ordinal, 0),
            name: format!("Im{}", ordinal),
            path: PathBuf::from(format!("out/page_{}_image_{}.png", page, ordinal)),
            width: 1,
            height: 1,
            source_color_space: "RGB".to_string(),
            had_alpha: false,
        }
    }

    #[test]
    fn test_report_paths_keep_order() {
        let mut report = ExtractionReport::new();
        report.images.push(image(1, 1));
        report.images.push(image(1, 2));
        report.images.push(image(4, 1));

        let paths = report.paths();
        assert_eq!(paths.len(), 3);
        assert!(paths[2].ends_with("page_4_image_1.png"));
        assert_eq!(report.images_on_page(1).count(), 2);
        assert_eq!(report.images_on_page(2).count(), 0);
    }

    #[test]
    fn test_report_serializes() {
        let mut report = ExtractionReport::new();
        report.images.push(image(2, 1));
        report.seen.insert(ResourceId::new(21, 0));
        report.finish();

        let json: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
        assert_eq!(json["images"][0]["page"], 2);
        assert_eq!(json["seen"][0]["number"], 21);
        assert!(json["finished_at"].is_string());
        assert!(report.to_json(true).unwrap().contains("\n  \"images\""));
    }
}
