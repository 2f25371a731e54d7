//! PDF parsing module.
//!
//! Everything that touches lopdf lives here: the backend, colour space
//! resolution, stream filters and image decoding.

pub mod backend;
mod colorspace;
mod decode;
pub mod filters;
mod objects;
mod options;

pub use backend::{LopdfBackend, PageId, PdfBackend};
pub use colorspace::PdfColorSpace;
pub use decode::{ImageDecoder, MAX_IMAGE_PIXELS};
pub use options::{ErrorMode, ExtractOptions, PageSelection, DEFAULT_OUTPUT_DIR};
