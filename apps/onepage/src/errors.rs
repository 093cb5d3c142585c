use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConversionError;
use crate::layout::EnforceError;
use crate::render::RenderError;

/// Application-level error type.
/// `exit_code()` maps each variant to the process exit status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot read input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Resume does not fit on one page: {pages} pages after {attempts} attempts")]
    Fit { attempts: u32, pages: usize },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Cannot write output {}: {message}", .path.display())]
    Output { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Input { .. } => 1,
            PipelineError::Fit { .. } => 3,
            PipelineError::Conversion(_) => 4,
            PipelineError::Render(_) | PipelineError::Output { .. } | PipelineError::Config(_) => 5,
        }
    }
}

impl From<EnforceError> for PipelineError {
    fn from(err: EnforceError) -> Self {
        match err {
            EnforceError::Render(e) => PipelineError::Render(e),
            EnforceError::Conversion(e) => PipelineError::Conversion(e),
            EnforceError::Unfittable(report) => PipelineError::Fit {
                attempts: report.attempts,
                pages: report.last.page_count,
            },
        }
    }
}
