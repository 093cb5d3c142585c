//! Pipeline: parse, fit, and finalize the two output artifacts.
//!
//! Work files live in a per-run temporary directory that is removed on every
//! exit path. Outputs are staged beside their destinations and persisted only
//! once both are ready.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::convert::PdfConverter;
use crate::errors::PipelineError;
use crate::layout::{EnforceError, FitEnforcer, FitProfile, FitReport, ShrinkStep};
use crate::markdown::read_document;
use crate::render::StyleConfig;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub input: PathBuf,
    pub docx_out: PathBuf,
    pub pdf_out: PathBuf,
    pub profile: FitProfile,
    pub max_attempts: u32,
    /// Write the last attempt's artifacts even when it still overflows.
    pub keep_overflow: bool,
}

/// What a run did, for logs and `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub docx: PathBuf,
    pub pdf: PathBuf,
    pub fits: bool,
    pub attempts: u32,
    pub pages: usize,
    pub blocks: usize,
    pub steps: Vec<ShrinkStep>,
    pub style: StyleConfig,
}

impl RunSummary {
    fn new(request: &ConvertRequest, report: &FitReport, fits: bool) -> Self {
        Self {
            input: request.input.clone(),
            docx: request.docx_out.clone(),
            pdf: request.pdf_out.clone(),
            fits,
            attempts: report.attempts,
            pages: report.last.page_count,
            blocks: report.document.len(),
            steps: report.steps.clone(),
            style: report.last.style.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run
// ────────────────────────────────────────────────────────────────────────────

pub async fn run(
    request: &ConvertRequest,
    converter: &dyn PdfConverter,
) -> Result<RunSummary, PipelineError> {
    request.profile.validate()?;

    let document = read_document(&request.input)?;
    info!(
        input = %request.input.display(),
        blocks = document.len(),
        bullets = document.bullet_count(),
        "Parsed resume"
    );

    let work_dir = tempfile::Builder::new()
        .prefix("onepage-")
        .tempdir()
        .map_err(|e| PipelineError::Output {
            path: std::env::temp_dir(),
            message: format!("cannot create work directory: {e}"),
        })?;

    let policy = request.profile.policy();
    let enforcer = FitEnforcer::new(converter, &policy, request.max_attempts, work_dir.path());

    match enforcer.run(&document, &request.profile.style).await {
        Ok(report) => {
            finalize(request, &report)?;
            let summary = RunSummary::new(request, &report, true);
            info!(
                attempts = summary.attempts,
                steps = summary.steps.len(),
                font_pt = summary.style.font_size_pt,
                "Resume fits on one page"
            );
            Ok(summary)
        }
        Err(EnforceError::Unfittable(report)) if request.keep_overflow => {
            finalize(request, &report)?;
            warn!(
                pages = report.last.page_count,
                docx = %request.docx_out.display(),
                pdf = %request.pdf_out.display(),
                "Kept overflowing output"
            );
            Err(EnforceError::Unfittable(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output finalization
// ────────────────────────────────────────────────────────────────────────────

fn finalize(request: &ConvertRequest, report: &FitReport) -> Result<(), PipelineError> {
    let docx = std::fs::read(&report.docx).map_err(|e| output_error(&report.docx, e))?;
    let pdf = std::fs::read(&report.pdf).map_err(|e| output_error(&report.pdf, e))?;

    let staged_docx = stage(&request.docx_out, &docx)?;
    let staged_pdf = stage(&request.pdf_out, &pdf)?;
    let previous_docx = backup(&request.docx_out)?;

    persist(staged_docx, &request.docx_out)?;
    if let Err(e) = persist(staged_pdf, &request.pdf_out) {
        restore(previous_docx, &request.docx_out);
        return Err(e);
    }
    Ok(())
}

/// Writes `bytes` to a temporary file in the destination's directory.
fn stage(dest: &Path, bytes: &[u8]) -> Result<NamedTempFile, PipelineError> {
    if dest.is_dir() {
        return Err(PipelineError::Output {
            path: dest.to_path_buf(),
            message: "destination is a directory".into(),
        });
    }
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| output_error(dest, e))?;

    let mut file = NamedTempFile::new_in(parent).map_err(|e| output_error(dest, e))?;
    file.write_all(bytes).map_err(|e| output_error(dest, e))?;
    file.as_file().sync_all().map_err(|e| output_error(dest, e))?;
    Ok(file)
}

/// Stages a copy of an existing destination so it can be put back.
fn backup(dest: &Path) -> Result<Option<NamedTempFile>, PipelineError> {
    if !dest.is_file() {
        return Ok(None);
    }
    let bytes = std::fs::read(dest).map_err(|e| output_error(dest, e))?;
    stage(dest, &bytes).map(Some)
}

/// Undoes a persisted output: the previous file comes back, or the new one
/// is removed when there was none.
fn restore(previous: Option<NamedTempFile>, dest: &Path) {
    let result = match previous {
        Some(file) => file.persist(dest).map(|_| ()).map_err(|e| e.error),
        None => std::fs::remove_file(dest),
    };
    match result {
        Ok(()) => warn!(path = %dest.display(), "Rolled back output"),
        Err(e) => warn!(path = %dest.display(), error = %e, "Failed to roll back output"),
    }
}

fn persist(file: NamedTempFile, dest: &Path) -> Result<(), PipelineError> {
    file.persist(dest).map_err(|e| output_error(dest, e.error))?;
    info!(path = %dest.display(), "Wrote output");
    Ok(())
}

fn output_error(path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Output {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::convert::pages::write_blank_pdf;
    use crate::convert::{count_pages, ConversionError, ConvertedPdf, SofficeConverter};
    use crate::render::package::count_paragraphs;

    const SAMPLE: &str = include_str!("../fixtures/sample_resume.md");

    /// Writes a real PDF with a fixed page count beside the DOCX.
    struct BlankPdfConverter {
        pages: usize,
    }

    #[async_trait]
    impl PdfConverter for BlankPdfConverter {
        async fn convert(
            &self,
            docx: &Path,
            out_dir: &Path,
        ) -> Result<ConvertedPdf, ConversionError> {
            let path = out_dir.join(docx.with_extension("pdf").file_name().unwrap());
            write_blank_pdf(&path, self.pages);
            let page_count = count_pages(&path)?;
            Ok(ConvertedPdf { path, page_count })
        }

        fn name(&self) -> &str {
            "blank-pdf"
        }
    }

    fn make_request(dir: &Path, keep_overflow: bool) -> ConvertRequest {
        let input = dir.join("resume.md");
        std::fs::write(&input, SAMPLE).unwrap();
        ConvertRequest {
            input,
            docx_out: dir.join("out").join("resume.docx"),
            pdf_out: dir.join("out").join("resume.pdf"),
            profile: FitProfile::default(),
            max_attempts: 5,
            keep_overflow,
        }
    }

    fn document_xml(docx: &Path) -> Vec<u8> {
        let file = std::fs::File::open(docx).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut part = archive.by_name("word/document.xml").unwrap();
        let mut xml = Vec::new();
        part.read_to_end(&mut xml).unwrap();
        xml
    }

    #[tokio::test]
    async fn test_success_writes_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), false);

        let summary = run(&request, &BlankPdfConverter { pages: 1 }).await.unwrap();
        assert!(summary.fits);
        assert_eq!(summary.attempts, 1);
        assert!(summary.steps.is_empty());
        assert_eq!(count_pages(&request.pdf_out).unwrap(), 1);

        let blocks = crate::markdown::parse(SAMPLE).len();
        assert_eq!(summary.blocks, blocks);
        assert_eq!(count_paragraphs(&document_xml(&request.docx_out)), blocks);
    }

    #[tokio::test]
    async fn test_existing_outputs_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), false);
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::write(&request.docx_out, b"stale").unwrap();
        std::fs::write(&request.pdf_out, b"stale").unwrap();

        run(&request, &BlankPdfConverter { pages: 1 }).await.unwrap();
        assert_ne!(std::fs::read(&request.docx_out).unwrap(), b"stale");
        assert_eq!(count_pages(&request.pdf_out).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_converter_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), false);
        let converter = SofficeConverter::new(
            PathBuf::from("/nonexistent/bin/soffice"),
            Duration::from_secs(5),
        );

        let err = run(&request, &converter).await.unwrap_err();
        assert!(matches!(err, PipelineError::Conversion(ConversionError::NotFound(_))));
        assert_eq!(err.exit_code(), 4);
        assert!(!request.docx_out.exists());
        assert!(!request.pdf_out.exists());
    }

    #[tokio::test]
    async fn test_overflow_writes_nothing_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), false);

        let err = run(&request, &BlankPdfConverter { pages: 2 }).await.unwrap_err();
        assert!(matches!(err, PipelineError::Fit { attempts: 5, pages: 2 }));
        assert_eq!(err.exit_code(), 3);
        assert!(!request.docx_out.exists());
        assert!(!request.pdf_out.exists());
    }

    #[tokio::test]
    async fn test_keep_overflow_writes_last_attempt_and_still_fails() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), true);

        let err = run(&request, &BlankPdfConverter { pages: 2 }).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(request.docx_out.is_file());
        assert_eq!(count_pages(&request.pdf_out).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unwritable_pdf_leaves_previous_docx() {
        let dir = tempfile::tempdir().unwrap();
        let request = make_request(dir.path(), false);
        std::fs::create_dir_all(&request.pdf_out).unwrap();
        std::fs::write(&request.docx_out, b"previous").unwrap();

        let err = run(&request, &BlankPdfConverter { pages: 1 }).await.unwrap_err();
        assert!(matches!(err, PipelineError::Output { .. }));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(std::fs::read(&request.docx_out).unwrap(), b"previous");
        assert!(request.pdf_out.is_dir());
    }

    #[test]
    fn test_restore_puts_previous_file_back() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("resume.docx");
        std::fs::write(&dest, b"previous").unwrap();

        let previous = backup(&dest).unwrap();
        persist(stage(&dest, b"new").unwrap(), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");

        restore(previous, &dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    }

    #[test]
    fn test_restore_without_previous_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("resume.docx");

        let previous = backup(&dest).unwrap();
        assert!(previous.is_none());
        persist(stage(&dest, b"new").unwrap(), &dest).unwrap();

        restore(previous, &dest);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut request = make_request(dir.path(), false);
        request.input = dir.path().join("missing.md");

        let err = run(&request, &BlankPdfConverter { pages: 1 }).await.unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
