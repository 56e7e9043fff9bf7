//! `crivet run` — Run the standard cases against the reference runtime.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use crivet_common::config::HarnessConfig;
use crivet_e2e::driver::LifecycleDriver;
use crivet_e2e::names::UuidNames;
use crivet_e2e::suite::{self, CaseOutcome};
use crivet_runtime::memory::InMemoryRuntime;

use crate::output::format_duration;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON harness configuration file.
    #[arg(short, long, env = "CRIVET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only run cases whose name contains this text.
    #[arg(long)]
    pub case: Option<String>,

    /// Directory for sandbox log directories. Defaults to a temporary
    /// directory unless the configuration file sets one.
    #[arg(long)]
    pub log_root: Option<PathBuf>,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or any case fails.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let total_start = Instant::now();
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    let scratch = tempfile::tempdir()?;
    if let Some(root) = args.log_root {
        config.log_root = root;
    } else if args.config.is_none() {
        config.log_root = scratch.path().to_path_buf();
    }
    tracing::debug!(?config, "harness configuration");

    let runtime = InMemoryRuntime::new();
    let driver = LifecycleDriver::new(&runtime, &config, &UuidNames);
    let report = suite::run(&driver, &suite::standard_cases(), args.case.as_deref());

    eprintln!();
    for case in &report.cases {
        let elapsed = format_duration(case.elapsed);
        match &case.outcome {
            CaseOutcome::Passed => {
                eprintln!("  {GREEN}✔{RESET} {} {DIM}({elapsed}){RESET}", case.name);
            }
            CaseOutcome::Failed(err) => {
                eprintln!("  {RED}✘{RESET} {} {DIM}({elapsed}){RESET}", case.name);
                eprintln!("      {err}");
            }
            CaseOutcome::Panicked(message) => {
                eprintln!("  {RED}✘{RESET} {} {DIM}({elapsed}){RESET}", case.name);
                eprintln!("      panicked: {message}");
            }
        }
    }
    eprintln!();
    eprintln!(
        "  {BOLD}{} passed, {} failed{RESET} {DIM}in {}{RESET}",
        report.passed(),
        report.failed(),
        format_duration(total_start.elapsed())
    );

    if report.cases.is_empty() {
        anyhow::bail!("no case matches {:?}", args.case.unwrap_or_default());
    }
    if !report.is_success() {
        anyhow::bail!("{} case(s) failed", report.failed());
    }
    Ok(())
}
