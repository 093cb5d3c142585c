//! PDF Converter: the external office-suite step of the pipeline.
//!
//! The enforcer only sees the `PdfConverter` trait. `SofficeConverter` is the
//! production backend; tests drive the enforcer with scripted converters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod pages;
pub mod soffice;

pub use pages::count_pages;
pub use soffice::SofficeConverter;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Document converter not found: {0}")]
    NotFound(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Converter reported success but no PDF was written at {0}")]
    MissingOutput(PathBuf),

    #[error("Cannot read PDF {path}: {message}")]
    UnreadablePdf { path: PathBuf, message: String },

    #[error("PDF {0} has no pages")]
    EmptyPdf(PathBuf),
}

/// A PDF produced by a converter, with its measured page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPdf {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Renders a serialized DOCX to PDF and measures it.
///
/// Implementations write the PDF into `out_dir` and must not touch anything else.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, docx: &Path, out_dir: &Path) -> Result<ConvertedPdf, ConversionError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
