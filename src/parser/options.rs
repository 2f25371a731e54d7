//! Extraction options and configuration.

use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "extracted_images";

/// Options for extracting images from a PDF document.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory receiving the PNG files (created if absent)
    pub output_dir: PathBuf,

    /// Which pages to visit
    pub pages: PageSelection,

    /// What to do when a single image cannot be decoded
    pub error_mode: ErrorMode,

    /// Also enumerate images drawn inside Form XObjects
    pub include_forms: bool,

    /// Apply /SMask and /Mask entries as an alpha channel before
    /// normalization
    pub apply_masks: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (skip images that fail to decode).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable or disable Form XObject traversal.
    pub fn with_forms(mut self, include: bool) -> Self {
        self.include_forms = include;
        self
    }

    /// Enable or disable mask application.
    pub fn with_masks(mut self, apply: bool) -> Self {
        self.apply_masks = apply;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            pages: PageSelection::All,
            error_mode: ErrorMode::Strict,
            include_forms: true,
            apply_masks: true,
        }
    }
}

/// Error handling mode for per-image failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the run on the first image that fails to decode
    #[default]
    Strict,
    /// Log the failure, record it in the report and continue
    Lenient,
}

/// Page selection for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Visit all pages
    #[default]
    All,
    /// Visit a range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Visit specific pages (1-indexed)
    Pages(Vec<u32>),
}

/// Upper bound on the pages a comma list may expand to.
const MAX_LISTED_PAGES: usize = 1 << 16;

impl PageSelection {
    /// Check if a page number should be visited.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.binary_search(&page).is_ok(),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidPageRange(s.to_string());

        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }

        let parse_page = |p: &str| -> Result<u32> {
            match p.trim().parse::<u32>() {
                Ok(0) | Err(_) => Err(invalid()),
                Ok(n) => Ok(n),
            }
        };

        if !s.contains(',') {
            if let Some((start, end)) = s.split_once('-') {
                let (start, end) = (parse_page(start)?, parse_page(end)?);
                if start > end {
                    return Err(invalid());
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = (parse_page(start)?, parse_page(end)?);
                if start > end || (end - start) as usize >= MAX_LISTED_PAGES.saturating_sub(pages.len()) {
                    return Err(invalid());
                }
                pages.extend(start..=end);
            } else {
                pages.push(parse_page(part)?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}
