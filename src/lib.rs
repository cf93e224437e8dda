//! # Overview
//!
//! Conceptually an OTF2 trace archive is organized as follows:
//! * Anchor file (`traces.otf2`)
//!   - Global definitions (`traces.def`): the string table plus locations,
//!     location groups, regions, attributes, and I/O files/handles
//!   - Per-location event files (`traces/<location>.evt`): time-ordered
//!     event records, each with an optional attribute list
//!
//! The exporter flattens every (location, event) pair into one CSV row, in
//! merged nondecreasing-timestamp order across locations.
//!
//! # Column Mappings
//!
//! * `Timestamp` - the event's timestamp, verbatim
//! * `EventType` - the event record name (`Enter`, `IoSeek`, ...)
//! * `Region` - the region name for enter/leave records, otherwise empty
//! * `Rank` - the name of the location group that owns the location
//! * `Attributes` - dict-like text holding the event's generic attributes
//!   (keys lowercased) plus per-kind fields
//!
//! # Attributes Conventions
//!
//! I/O records overlay extra keys onto the generic attributes before
//! rendering, overwriting on collision:
//!
//! * `IoCreateHandle` - `mode`, `creation_flags`, `status_flags`, `handle`
//! * `IoDestroyHandle` - `handle`
//! * `IoOperationBegin` - `bytes_request`, `handle`
//! * `IoOperationComplete` - `bytes_result`, `handle`
//! * `IoSeek` - `offset_request`, `offset_result`, `whence`, `handle`
//!
//! The `handle` value resolves to the backing file's name when the handle is
//! file-backed, and to the handle's own name otherwise.
#![deny(warnings, clippy::all)]

pub mod archive;
pub mod decode;
pub mod defs;
pub mod error;
pub mod events;
pub mod export;
pub mod prelude;
pub mod reader;
pub mod row;
pub mod tracing;
pub mod types;
pub mod writer;
