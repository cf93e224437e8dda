pub use crate::archive::{Anchor, ArchiveLayout};
pub use crate::defs::{
    AttrKind, ClockProperties, GlobalDefs, LocationGroupKind, LocationKind, RegionRole,
};
pub use crate::error::Error;
pub use crate::events::{AttrValue, Event, EventKind};
pub use crate::export::{otf2_to_csv, CSV_HEADER};
pub use crate::reader::TraceReader;
pub use crate::row::{AttrMap, EventRow};
pub use crate::tracing::try_init_tracing_subscriber;
pub use crate::types::{
    AttrRef, IoAccessMode, IoCreationFlags, IoFileRef, IoHandleRef, IoOperationMode,
    IoSeekWhence, IoStatusFlags, LocationGroupRef, LocationRef, LogLevel, RegionRef, StringRef,
};
pub use crate::writer::ArchiveWriter;
