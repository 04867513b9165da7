//! bff - black frame filter
//!
//! Replaces spurious all-black frames with the last good frame and re-encodes
//! the input to H.264/AAC in an MP4 container.
//!
//! # Usage
//!
//! ```bash
//! bff --in capture.ts --out clean.mp4
//! BFF_CLASSIFIER=statistical bff -i capture.ts -o clean.mp4
//! ```

use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use bff::cli::commands;
use bff::cli::{Cli, USAGE_EXIT_CODE};
use bff::utils::logging::init_logging;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            process::exit(USAGE_EXIT_CODE);
        }
    };

    if let Err(err) = run(&cli) {
        error!("{:#}", err);
        eprintln!("bff: {:#}", err);
        process::exit(commands::exit_code(&err));
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = commands::load_config()?;
    init_logging(&config.logging)?;
    bff::init()?;

    info!("Starting bff");
    let stats = commands::transcode(cli, &config)?;
    info!(
        "bff completed: {} video frames, {} substituted",
        stats.video_frames, stats.substituted_frames
    );
    Ok(())
}
