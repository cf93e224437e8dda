#![deny(warnings, clippy::all)]

use clap::Parser;
use otf2csv::{prelude::*, tracing::try_init_tracing_subscriber};
use std::path::PathBuf;
use tracing::info;

/// Export OTF2 trace events to CSV, one row per (location, event) pair
#[derive(Parser, Debug, Clone)]
#[clap(version)]
pub struct Opts {
    /// Path to the OTF2 trace anchor file (e.g. traces.otf2)
    #[clap(name = "tracefile", help_heading = "EXPORT CONFIGURATION")]
    pub tracefile: PathBuf,

    /// Path to the CSV file to create or overwrite
    #[clap(name = "outfile", help_heading = "EXPORT CONFIGURATION")]
    pub outfile: PathBuf,

    /// Set the log level
    #[clap(
        long,
        value_enum,
        default_value_t = LogLevel::Info,
        help_heading = "EXPORT CONFIGURATION"
    )]
    pub log: LogLevel,
}

fn main() {
    match do_main() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{e}");
            let mut cause = e.source();
            while let Some(err) = cause {
                eprintln!("Caused by: {err}");
                cause = err.source();
            }
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    try_init_tracing_subscriber(opts.log)?;

    let rows = otf2_to_csv(&opts.tracefile, &opts.outfile)?;
    info!(
        rows,
        trace = %opts.tracefile.display(),
        csv = %opts.outfile.display(),
        "exported trace events"
    );

    Ok(())
}
