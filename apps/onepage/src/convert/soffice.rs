//! LibreOffice (`soffice`) headless conversion backend.
//!
//! One subprocess per conversion, bounded by a timeout. On unix the child
//! leads its own process group, and an elapsed timeout kills the whole group:
//! `soffice` is a launcher, and the process doing the work is a grandchild.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::convert::{count_pages, ConversionError, ConvertedPdf, PdfConverter};

const PROGRAM_NAMES: [&str; 2] = ["soffice", "libreoffice"];

const WELL_KNOWN_LOCATIONS: [&str; 5] = [
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files\LibreOffice\program\soffice.com",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.com",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
];

/// Keeps error messages readable when the converter dumps a lot on stderr.
const MAX_STDERR_CHARS: usize = 500;

/// Profile directory created inside the conversion's output directory.
const PROFILE_DIR: &str = "lo-profile";

#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    /// Finds the converter binary.
    ///
    /// An explicit path must exist; otherwise `PATH` is searched, then the
    /// usual Windows and macOS install locations.
    pub fn locate(explicit: Option<&Path>, timeout: Duration) -> Result<Self, ConversionError> {
        let program = match explicit {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => which::which(path).map_err(|_| {
                ConversionError::NotFound(format!("{} does not exist", path.display()))
            })?,
            None => find_installed().ok_or_else(|| {
                ConversionError::NotFound(
                    "LibreOffice not found. Install LibreOffice or set SOFFICE_PATH / --soffice"
                        .to_string(),
                )
            })?,
        };
        debug!(program = %program.display(), "Located document converter");
        Ok(Self::new(program, timeout))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_label(&self) -> String {
        self.program.display().to_string()
    }
}

fn find_installed() -> Option<PathBuf> {
    PROGRAM_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            WELL_KNOWN_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
        })
}

#[async_trait]
impl PdfConverter for SofficeConverter {
    async fn convert(&self, docx: &Path, out_dir: &Path) -> Result<ConvertedPdf, ConversionError> {
        let profile = out_dir.join(PROFILE_DIR);

        let mut command = Command::new(&self.program);
        command
            .arg("--headless")
            .arg("--nologo")
            .arg("--nofirststartwizard")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation={}", file_url(&profile)))
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(docx)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConversionError::NotFound(format!("{}: {source}", self.program_label()))
            } else {
                ConversionError::Spawn {
                    program: self.program_label(),
                    source,
                }
            }
        })?;

        let pid = child.id();
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ConversionError::Spawn {
                program: self.program_label(),
                source,
            })?,
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                warn!(
                    program = %self.program.display(),
                    timeout = ?self.timeout,
                    "Converter timed out; process group killed"
                );
                return Err(ConversionError::Timeout {
                    program: self.program_label(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(ConversionError::Failed {
                program: self.program_label(),
                status: output.status.to_string(),
                stderr: truncate(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }

        let stem = docx
            .file_stem()
            .ok_or_else(|| ConversionError::MissingOutput(docx.to_path_buf()))?;
        let pdf = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !pdf.is_file() {
            return Err(ConversionError::MissingOutput(pdf));
        }

        let page_count = count_pages(&pdf)?;
        debug!(pdf = %pdf.display(), page_count, "Converted DOCX to PDF");
        Ok(ConvertedPdf {
            path: pdf,
            page_count,
        })
    }

    fn name(&self) -> &str {
        "soffice"
    }
}

/// Kills every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == -1 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

/// Without process groups, `kill_on_drop` tears down the direct child only.
#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// `file://` URL for a local path, as LibreOffice expects for `UserInstallation`.
fn file_url(path: &Path) -> String {
    let raw = path.display().to_string().replace('\\', "/");
    if raw.starts_with('/') {
        format!("file://{raw}")
    } else {
        format!("file:///{raw}")
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_STDERR_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_STDERR_CHARS).collect();
        format!("{head}…")
    }
}
