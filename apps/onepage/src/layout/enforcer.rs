//! Page-Fit Enforcer: render, measure, shrink, repeat until the PDF is one page.
//!
//! States: Initial → Rendering → Measuring → (Done | Fitting | Failed), with
//! Fitting looping back to Rendering. Every render attempt is written into the
//! caller's work directory under its own name, so a stale PDF from a previous
//! attempt can never be mistaken for the current one.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::convert::{ConversionError, PdfConverter};
use crate::layout::shrink::{ShrinkPolicy, ShrinkStep};
use crate::markdown::Document;
use crate::render::{self, RenderError, StyleConfig};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Initial,
    Rendering,
    Measuring,
    Fitting,
    Done,
    Failed,
}

/// One render/measure round.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderAttempt {
    pub attempt: u32,
    pub style: StyleConfig,
    pub page_count: usize,
    /// The step that produced this attempt's input; `None` for the first render.
    pub step: Option<ShrinkStep>,
}

/// Outcome of an enforcer run: the last attempt and everything needed to
/// finalize its artifacts.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub attempts: u32,
    pub steps: Vec<ShrinkStep>,
    pub last: RenderAttempt,
    pub document: Document,
    pub docx: PathBuf,
    pub pdf: PathBuf,
}

#[derive(Debug, Error)]
pub enum EnforceError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error(
        "Resume does not fit on one page: {} pages after {} attempts",
        .0.last.page_count,
        .0.attempts
    )]
    Unfittable(Box<FitReport>),
}

// ────────────────────────────────────────────────────────────────────────────
// Enforcer
// ────────────────────────────────────────────────────────────────────────────

pub struct FitEnforcer<'a> {
    converter: &'a dyn PdfConverter,
    policy: &'a ShrinkPolicy,
    max_attempts: u32,
    work_dir: &'a Path,
}

impl<'a> FitEnforcer<'a> {
    pub fn new(
        converter: &'a dyn PdfConverter,
        policy: &'a ShrinkPolicy,
        max_attempts: u32,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            converter,
            policy,
            max_attempts: max_attempts.max(1),
            work_dir,
        }
    }

    /// Drives the state machine to `Done` or `Failed`.
    ///
    /// Render and conversion errors abort immediately. Running out of attempts
    /// or shrink steps returns `EnforceError::Unfittable` carrying the last
    /// attempt, so the caller can still keep the overflowing output.
    pub async fn run(
        &self,
        source: &Document,
        initial: &StyleConfig,
    ) -> Result<FitReport, EnforceError> {
        let mut state = FitState::Initial;
        let mut style = initial.clone();
        let mut document = source.clone();
        let mut steps: Vec<ShrinkStep> = Vec::new();
        let mut pending_step: Option<ShrinkStep> = None;
        let mut rule_cursor = 0usize;
        let mut attempts = 0u32;

        let mut docx_path = PathBuf::new();
        let mut pdf_path = PathBuf::new();
        let mut last = RenderAttempt {
            attempt: 0,
            style: style.clone(),
            page_count: 0,
            step: None,
        };

        loop {
            let next = match state {
                FitState::Initial => FitState::Rendering,

                FitState::Rendering => {
                    attempts += 1;
                    docx_path = self.work_dir.join(format!("attempt-{attempts:02}.docx"));
                    render::render(&document, &style).write_to(&docx_path)?;
                    FitState::Measuring
                }

                FitState::Measuring => {
                    let pdf = self.converter.convert(&docx_path, self.work_dir).await?;
                    info!(
                        attempt = attempts,
                        pages = pdf.page_count,
                        converter = self.converter.name(),
                        "Measured render attempt"
                    );
                    last = RenderAttempt {
                        attempt: attempts,
                        style: style.clone(),
                        page_count: pdf.page_count,
                        step: pending_step.take(),
                    };
                    pdf_path = pdf.path;

                    if last.page_count <= 1 {
                        FitState::Done
                    } else if attempts < self.max_attempts {
                        FitState::Fitting
                    } else {
                        warn!(attempts, pages = last.page_count, "Retry budget exhausted");
                        FitState::Failed
                    }
                }

                FitState::Fitting => match self.policy.next(&style, &document, &mut rule_cursor) {
                    Some(shrunk) => {
                        info!(step = %shrunk.step, "Applying shrink step");
                        style = shrunk.style;
                        document = shrunk.document;
                        steps.push(shrunk.step.clone());
                        pending_step = Some(shrunk.step);
                        FitState::Rendering
                    }
                    None => {
                        warn!(attempts, pages = last.page_count, "No shrink step left");
                        FitState::Failed
                    }
                },

                FitState::Done => {
                    return Ok(FitReport {
                        attempts,
                        steps,
                        last,
                        document,
                        docx: docx_path,
                        pdf: pdf_path,
                    });
                }

                FitState::Failed => {
                    return Err(EnforceError::Unfittable(Box::new(FitReport {
                        attempts,
                        steps,
                        last,
                        document,
                        docx: docx_path,
                        pdf: pdf_path,
                    })));
                }
            };
            debug!(from = ?state, to = ?next, attempts, "Fit state transition");
            state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::convert::ConvertedPdf;
    use crate::markdown::parse;

    /// Reports page counts from a script; the last entry repeats forever.
    struct ScriptedConverter {
        pages: Mutex<VecDeque<usize>>,
        repeat: usize,
        calls: AtomicU32,
    }

    impl ScriptedConverter {
        fn new(script: &[usize]) -> Self {
            Self {
                pages: Mutex::new(script.iter().copied().collect()),
                repeat: *script.last().unwrap(),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PdfConverter for ScriptedConverter {
        async fn convert(
            &self,
            docx: &Path,
            out_dir: &Path,
        ) -> Result<ConvertedPdf, ConversionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let page_count = self.pages.lock().unwrap().pop_front().unwrap_or(self.repeat);
            let path = out_dir.join(docx.with_extension("pdf").file_name().unwrap());
            std::fs::write(&path, b"%PDF-1.5 scripted").unwrap();
            Ok(ConvertedPdf { path, page_count })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct BrokenConverter;

    #[async_trait]
    impl PdfConverter for BrokenConverter {
        async fn convert(
            &self,
            _docx: &Path,
            _out_dir: &Path,
        ) -> Result<ConvertedPdf, ConversionError> {
            Err(ConversionError::Timeout {
                program: "soffice".into(),
                timeout: std::time::Duration::from_secs(1),
            })
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn make_document() -> Document {
        parse(
            "# Jane Doe\n## EXPERIENCE\n### Support\n- one\n- two\n- three\n- four\n## SKILLS\n- Rust\n",
        )
    }

    #[tokio::test]
    async fn test_fitting_resume_takes_zero_steps() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ScriptedConverter::new(&[1]);
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&converter, &policy, 12, dir.path());

        let report = enforcer.run(&make_document(), &StyleConfig::default()).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert!(report.steps.is_empty());
        assert_eq!(report.last.step, None);
        assert_eq!(report.last.style, StyleConfig::default());
        assert_eq!(converter.calls(), 1);
        assert_eq!(report.docx, dir.path().join("attempt-01.docx"));
        assert!(report.docx.is_file());
        assert_eq!(report.pdf, dir.path().join("attempt-01.pdf"));
    }

    #[tokio::test]
    async fn test_shrinks_font_before_margins() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ScriptedConverter::new(&[2, 2, 2, 1]);
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&converter, &policy, 12, dir.path());

        let report = enforcer.run(&make_document(), &StyleConfig::default()).await.unwrap();
        assert_eq!(report.attempts, 4);
        let ranks: Vec<u8> = report.steps.iter().map(ShrinkStep::rank).collect();
        assert_eq!(ranks, vec![0, 0, 1]);
        assert_eq!(report.last.style.font_size_pt, 9.0);
        assert_eq!(report.last.style.margins.left_in, 0.45);
        assert_eq!(report.last.step, report.steps.last().cloned());
        assert_eq!(report.last.page_count, 1);
    }

    #[tokio::test]
    async fn test_steps_are_ordered_and_never_grow_the_style() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ScriptedConverter::new(&[2]);
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&converter, &policy, 50, dir.path());
        let initial = StyleConfig::default();

        let err = enforcer.run(&make_document(), &initial).await.unwrap_err();
        let EnforceError::Unfittable(report) = err else {
            panic!("expected Unfittable");
        };
        let ranks: Vec<u8> = report.steps.iter().map(ShrinkStep::rank).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        assert!(report.last.style.font_size_pt <= initial.font_size_pt);
        assert!(report.last.style.line_spacing <= initial.line_spacing);
        // Policy ran dry before the budget: six style steps and three bullet drops.
        assert_eq!(report.steps.len(), 9);
        assert_eq!(report.attempts, 10);
        assert!(report.document.bullet_count() < make_document().bullet_count());
    }

    #[tokio::test]
    async fn test_pathological_resume_fails_after_budget() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ScriptedConverter::new(&[3]);
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&converter, &policy, 5, dir.path());

        let err = enforcer.run(&make_document(), &StyleConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("after 5 attempts"));
        let EnforceError::Unfittable(report) = err else {
            panic!("expected Unfittable");
        };
        assert_eq!(report.attempts, 5);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.last.page_count, 3);
        assert_eq!(converter.calls(), 5);
    }

    #[tokio::test]
    async fn test_conversion_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&BrokenConverter, &policy, 5, dir.path());

        let err = enforcer.run(&make_document(), &StyleConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            EnforceError::Conversion(ConversionError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_exhausted_policy_fails_before_budget() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ScriptedConverter::new(&[2]);
        let policy = ShrinkPolicy::default();
        let enforcer = FitEnforcer::new(&converter, &policy, 12, dir.path());
        let style = StyleConfig {
            font_size_pt: 9.0,
            margins: crate::render::Margins::uniform(0.4),
            line_spacing: 0.9,
            ..StyleConfig::default()
        };
        let doc = parse("# Jane Doe\n## SKILLS\n- Rust\n");

        let err = enforcer.run(&doc, &style).await.unwrap_err();
        let EnforceError::Unfittable(report) = err else {
            panic!("expected Unfittable");
        };
        assert_eq!(report.attempts, 1);
        assert!(report.steps.is_empty());
        assert_eq!(converter.calls(), 1);
    }
}
