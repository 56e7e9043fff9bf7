//! `crivet decode` — Print the records of a JSON-line container log.

use std::path::PathBuf;

use clap::Args;
use crivet_e2e::verifier::LogFile;

/// Arguments for the `decode` command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Log file to decode.
    pub file: PathBuf,
}

/// Executes the `decode` command.
///
/// Prints one `timestamp stream payload` line per record.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is malformed.
pub fn execute(args: DecodeArgs) -> anyhow::Result<()> {
    let file = LogFile::read(&args.file)?;
    let mut count = 0usize;
    for record in file.records() {
        let record = record?;
        println!(
            "{} {} {}",
            record.timestamp.to_rfc3339(),
            record.stream,
            record.payload_lossy()
        );
        count += 1;
    }

    if count == 0 {
        println!("No records in log file: {}", args.file.display());
    }
    Ok(())
}
