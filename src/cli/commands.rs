//! Command implementations

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::Cli;
use crate::config::BffConfig;
use crate::engine::{TranscodeJob, TranscodeStats, Transcoder};
use crate::error::{BffError, FAILURE_EXIT_CODE};

/// Load configuration with file and environment overrides
pub fn load_config() -> Result<BffConfig> {
    BffConfig::load().context("Failed to load configuration")
}

/// Execute the transcode described by the command line
pub fn transcode(cli: &Cli, config: &BffConfig) -> Result<TranscodeStats> {
    let job = TranscodeJob::new(&cli.input, &cli.output, config);
    info!(
        "Classifier: {}, deinterlace: {}",
        job.classifier,
        job.deinterlace_filter.as_deref().unwrap_or("off")
    );
    let stats = Transcoder::new(job).run()?;
    Ok(stats)
}

/// Process exit status for a failed command
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<BffError>())
        .map_or(FAILURE_EXIT_CODE, BffError::exit_code)
}
