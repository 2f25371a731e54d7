//! Data model shared by the parser, the extractor and the CLI.
//!
//! References and resource ids describe *where* images live in a document,
//! pixel buffers hold decoded raster data for exactly one resource at a
//! time, and the report records what an extraction run wrote.

mod image;
mod pixel;
mod report;

pub use image::{ImageRef, ListedImage, ResourceId};
pub use pixel::{ColorSpace, PixelBuffer, LAB_D50_WHITE, LAB_DEFAULT_RANGE};
pub use report::{ExtractedImage, ExtractionReport, SkippedImage};
