//! The conversion pass: open a trace, write one CSV row per (location,
//! event) pair in reader order, flush, done.

use crate::error::Error;
use crate::reader::TraceReader;
use crate::row::EventRow;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

pub const CSV_HEADER: [&str; 5] = ["Timestamp", "EventType", "Region", "Rank", "Attributes"];

/// Convert the trace anchored at `trace_path` into CSV at `csv_path`,
/// returning the number of data rows written.
///
/// The output file is created (or truncated) only after the trace opens
/// successfully, so a bad trace path leaves no output behind. Rows already
/// written when an error occurs mid-iteration remain on disk; there is no
/// rollback and no retry.
pub fn otf2_to_csv<P, Q>(trace_path: P, csv_path: Q) -> Result<u64, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let reader = TraceReader::open(trace_path.as_ref())?;
    if let Some(clock) = reader.defs().clock_properties() {
        debug!(
            timer_resolution = clock.timer_resolution,
            global_offset = clock.global_offset,
            trace_length = clock.trace_length,
            "clock properties"
        );
    }

    let csv_path = csv_path.as_ref();
    let out = File::create(csv_path).map_err(|source| Error::WriteFile {
        path: csv_path.to_path_buf(),
        source,
    })?;
    let mut csv = csv::Writer::from_writer(out);
    csv.write_record(CSV_HEADER)?;

    let mut rows = 0u64;
    for pair in reader.events() {
        let (location, event) = pair?;
        let row = EventRow::new(location, &event, reader.defs())?;
        csv.write_record(row.to_record())?;
        rows += 1;
    }
    csv.flush()?;

    info!(rows, csv = %csv_path.display(), "finished export");
    Ok(rows)
}
