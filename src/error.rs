use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Failed to read '{path}'")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}'")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The file '{}' is not an OTF2 anchor file", .0.display())]
    NotAnAnchor(PathBuf),

    #[error("The archive format version {0} is not supported by this reader")]
    UnsupportedFormatVersion(u32),

    #[error("Encountered a malformed {0} file header")]
    BadFileHeader(&'static str),

    #[error("Unexpected end of trace data")]
    UnexpectedEof,

    #[error("Encountered a varint that does not fit in the target type")]
    VarintOverflow,

    #[error("Encountered an invalid UTF-8 string in the trace data")]
    InvalidUtf8,

    #[error("Encountered a malformed {what} value {value}")]
    MalformedEnum { what: &'static str, value: u8 },

    #[error("Encountered an undefined {what} reference {id}")]
    UndefinedRef { what: &'static str, id: u64 },

    #[error("Event timestamps must be nondecreasing within location {location} (got {time} after {last})")]
    NonMonotonicTimestamp { location: u64, time: u64, last: u64 },
}
