//! Downloading PDFs over HTTP.
//!
//! A [`PdfFetcher`] turns a URL into a [`FetchedPdf`]: the response body in
//! memory plus a temporary `.pdf` copy on disk. The temporary file is
//! removed exactly once, by [`FetchedPdf::close`] or when the value is
//! dropped.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tempfile::NamedTempFile;

use crate::detect::is_pdf_bytes;
use crate::error::{Error, Result};
use crate::extract::{extract_from_bytes, ExtractObserver};
use crate::model::ExtractionReport;
use crate::parser::ExtractOptions;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("pdfimg/", env!("CARGO_PKG_VERSION"));

/// Options for downloading a PDF.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for the whole request
    pub timeout: Duration,

    /// `User-Agent` header value
    pub user_agent: String,

    /// Reject bodies larger than this many bytes
    pub max_bytes: Option<u64>,

    /// Directory for the temporary file (system default if `None`)
    pub temp_dir: Option<PathBuf>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_bytes: None,
            temp_dir: None,
        }
    }
}

/// A downloaded PDF: bytes in memory and a temporary file on disk.
#[derive(Debug)]
pub struct FetchedPdf {
    url: String,
    bytes: Vec<u8>,
    file: Option<NamedTempFile>,
}

impl FetchedPdf {
    /// Store `bytes` in a new temporary `.pdf` file.
    pub fn from_bytes(url: impl Into<String>, bytes: Vec<u8>, temp_dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdfimg-").suffix(".pdf");
        let mut file = match temp_dir {
            Some(dir) => builder.tempfile_in(dir).map_err(|e| Error::filesystem(dir, e))?,
            None => builder
                .tempfile()
                .map_err(|e| Error::filesystem(std::env::temp_dir(), e))?,
        };

        if let Err(e) = file.write_all(&bytes).and_then(|_| file.flush()) {
            return Err(Error::filesystem(file.path(), e));
        }
        log::info!(
            "PDF downloaded and saved to temporary file: {}",
            file.path().display()
        );

        Ok(Self {
            url: url.into(),
            bytes,
            file: Some(file),
        })
    }

    /// The URL the PDF was fetched from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The PDF content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Path of the temporary file, until it is closed.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path())
    }

    /// Delete the temporary file.
    pub fn close(mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => remove_temp_file(file),
            None => Ok(()),
        }
    }
}

impl Drop for FetchedPdf {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = remove_temp_file(file) {
                log::warn!("{}", e);
            }
        }
    }
}

fn remove_temp_file(file: NamedTempFile) -> Result<()> {
    let path = file.path().to_path_buf();
    file.close().map_err(|e| Error::filesystem(&path, e))?;
    log::info!("Temporary PDF file {} removed", path.display());
    Ok(())
}

/// Source of PDF documents addressed by URL.
pub trait PdfFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPdf>;
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpFetcher {
    /// Build a fetcher with its own HTTP client.
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn read_body(&self, mut response: Response) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        match self.options.max_bytes {
            Some(limit) => {
                if response.content_length().is_some_and(|len| len > limit) {
                    return Err(Error::TooLarge { limit });
                }
                response
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut body)
                    .map_err(|e| Error::Http(e.to_string()))?;
                if body.len() as u64 > limit {
                    return Err(Error::TooLarge { limit });
                }
            }
            None => {
                response
                    .read_to_end(&mut body)
                    .map_err(|e| Error::Http(e.to_string()))?;
            }
        }
        Ok(body)
    }
}

impl PdfFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPdf> {
        log::info!("Downloading PDF from {}", url);
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = self.read_body(response)?;
        if !is_pdf_bytes(&bytes) {
            log::warn!(
                "Response from {} does not look like a PDF (content type {})",
                url,
                content_type.as_deref().unwrap_or("unknown")
            );
        }

        FetchedPdf::from_bytes(url, bytes, self.options.temp_dir.as_deref())
    }
}

/// Fetch a PDF and extract its images.
///
/// The temporary file is removed whether extraction succeeds or not. A
/// failure to remove it is logged and does not replace the extraction
/// result.
pub fn fetch_and_extract<F, O>(
    fetcher: &F,
    url: &str,
    options: &ExtractOptions,
    observer: O,
) -> Result<ExtractionReport>
where
    F: PdfFetcher + ?Sized,
    O: ExtractObserver,
{
    let fetched = fetcher.fetch(url)?;
    let result = extract_from_bytes(fetched.bytes(), options, observer);
    if let Err(e) = fetched.close() {
        log::warn!("Failed to remove temporary PDF: {}", e);
    }
    result
}
