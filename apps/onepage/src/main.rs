mod config;
mod convert;
mod errors;
mod layout;
mod markdown;
mod pipeline;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::convert::SofficeConverter;
use crate::errors::PipelineError;
use crate::layout::FitProfile;
use crate::pipeline::{ConvertRequest, RunSummary};

#[derive(Parser)]
#[command(
    name = "onepage",
    version,
    about = "Convert a Markdown resume into a one-page DOCX and PDF"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render, convert with LibreOffice, and shrink until the PDF is one page
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Markdown resume
    input: PathBuf,

    /// DOCX output path (overwritten)
    docx: PathBuf,

    /// PDF output path (overwritten)
    pdf: PathBuf,

    /// Fit profile JSON (style, floors, steps, trim rules)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Render attempts before giving up [env: MAX_FIT_ATTEMPTS]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: Option<u32>,

    /// Seconds to wait for each conversion [env: CONVERT_TIMEOUT_SECS]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Path to the soffice binary [env: SOFFICE_PATH]
    #[arg(long)]
    soffice: Option<PathBuf>,

    /// Write the last attempt even if it does not fit (exit code stays non-zero)
    #[arg(long)]
    keep_overflow: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(5);
        }
    };

    // Logs go to stderr; stdout is reserved for --json
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("onepage v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Convert(args) => {
            let json = args.json;
            match convert(args, &config).await {
                Ok(summary) => {
                    if json {
                        print_json(&summary);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(exit_code = e.exit_code(), "{e}");
                    eprintln!("Error: {e}");
                    ExitCode::from(e.exit_code())
                }
            }
        }
    }
}

async fn convert(args: ConvertArgs, config: &Config) -> Result<RunSummary, PipelineError> {
    let profile = match &args.profile {
        Some(path) => FitProfile::load(path)?,
        None => FitProfile::default(),
    };

    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(config.convert_timeout);
    let soffice = args.soffice.as_deref().or(config.soffice_path.as_deref());
    let converter = SofficeConverter::locate(soffice, timeout)?;
    info!(
        converter = %converter.program().display(),
        timeout = ?timeout,
        "Using document converter"
    );

    let request = ConvertRequest {
        input: args.input,
        docx_out: args.docx,
        pdf_out: args.pdf,
        profile,
        max_attempts: args.max_attempts.unwrap_or(config.max_fit_attempts),
        keep_overflow: args.keep_overflow,
    };
    pipeline::run(&request, &converter).await
}

fn print_json(summary: &RunSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Cannot serialize run summary: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_args_parse() {
        let cli = Cli::try_parse_from([
            "onepage",
            "convert",
            "resume.md",
            "out/resume.docx",
            "out/resume.pdf",
            "--max-attempts",
            "5",
            "--keep-overflow",
        ])
        .unwrap();
        let Command::Convert(args) = cli.command;
        assert_eq!(args.input, PathBuf::from("resume.md"));
        assert_eq!(args.max_attempts, Some(5));
        assert!(args.keep_overflow);
        assert!(!args.json);
        assert!(args.profile.is_none());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = Cli::try_parse_from([
            "onepage",
            "convert",
            "a.md",
            "a.docx",
            "a.pdf",
            "--max-attempts",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = Cli::try_parse_from([
            "onepage",
            "convert",
            "a.md",
            "a.docx",
            "a.pdf",
            "--timeout-secs",
            "0",
        ]);
        assert!(result.is_err());
    }
}
