//! Error types for pdfimg library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::ResourceId;

/// Result type alias for pdfimg operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while fetching or extracting.
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a non-success status.
    #[error("Failed to download PDF from {url}: HTTP status {status}")]
    Transfer { url: String, status: u16 },

    /// The HTTP request could not be completed (DNS, TLS, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The response body exceeded the configured size limit.
    #[error("Download exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    /// The data is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Creating a directory or writing a file failed.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// I/O error without a specific target path.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An embedded image could not be decoded into pixels.
    #[error("Failed to decode image {resource}: {reason}")]
    ImageDecode { resource: ResourceId, reason: String },

    /// A normalized image could not be encoded as PNG.
    #[error("Failed to encode {}: {reason}", path.display())]
    ImageEncode { path: PathBuf, reason: String },

    /// Invalid page range specification.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Download failed (status, network, size limit).
    Transfer,
    /// The bytes are not an openable PDF.
    Parse,
    /// Output directory or file could not be written.
    Filesystem,
    /// A single embedded image could not be decoded or encoded.
    Decode,
    /// Invalid user-supplied configuration.
    Config,
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Build a decode error for a resource.
    pub fn decode(resource: ResourceId, reason: impl Into<String>) -> Self {
        Error::ImageDecode {
            resource,
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transfer { .. } | Error::Http(_) | Error::TooLarge { .. } => ErrorKind::Transfer,
            Error::UnknownFormat
            | Error::UnsupportedVersion(_)
            | Error::PdfParse(_)
            | Error::Encrypted => ErrorKind::Parse,
            Error::Filesystem { .. } | Error::Io(_) => ErrorKind::Filesystem,
            Error::ImageDecode { .. } | Error::ImageEncode { .. } => ErrorKind::Decode,
            Error::InvalidPageRange(_) => ErrorKind::Config,
        }
    }

    /// Whether lenient extraction may skip this error and move on to the
    /// next image.
    pub fn is_image_level(&self) -> bool {
        matches!(self, Error::ImageDecode { .. })
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(feature = "fetch")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::Transfer {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None => Error::Http(err.to_string()),
        }
    }
}
