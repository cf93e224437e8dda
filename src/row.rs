//! Projection of one (location, event) pair into one CSV row.
//!
//! Columns are fixed: `Timestamp,EventType,Region,Rank,Attributes`. The
//! attributes column is a catch-all: the event's generic attribute list
//! (keys lowercased) overlaid with a handful of kind-specific fields, then
//! rendered as deterministic dict-like text inside the one field.

use crate::defs::GlobalDefs;
use crate::error::Error;
use crate::events::{AttrValue, Event, EventKind};
use crate::types::LocationRef;
use std::fmt;

/// Ordered key/value mapping with Python-dict semantics: insertion order is
/// preserved, and overwriting a key keeps its original position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrMap(Vec<(String, String)>);

impl AttrMap {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
            first = false;
        }
        f.write_str("}")
    }
}

/// One CSV data row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRow {
    pub timestamp: u64,
    pub event_type: &'static str,
    pub region: String,
    pub rank: String,
    pub attributes: AttrMap,
}

impl EventRow {
    pub fn new(location: LocationRef, event: &Event, defs: &GlobalDefs) -> Result<Self, Error> {
        let region = match event.kind.region() {
            Some(r) => defs.region_name(r)?.to_owned(),
            None => String::new(),
        };
        let rank = defs.location_group_name(location)?.to_owned();

        let mut attributes = AttrMap::default();
        for (attr, value) in &event.attributes {
            attributes.insert(
                defs.attribute_name(*attr)?.to_lowercase(),
                render_value(*value, defs)?,
            );
        }

        // Kind-specific overlay; at most one arm applies
        match event.kind {
            EventKind::IoCreateHandle {
                handle,
                mode,
                creation_flags,
                status_flags,
            } => {
                attributes.insert("mode", mode.to_string());
                attributes.insert("creation_flags", creation_flags.to_string());
                attributes.insert("status_flags", status_flags.to_string());
                attributes.insert("handle", defs.io_handle_name(handle)?);
            }
            EventKind::IoDestroyHandle { handle } => {
                attributes.insert("handle", defs.io_handle_name(handle)?);
            }
            EventKind::IoOperationBegin {
                handle,
                bytes_request,
                ..
            } => {
                attributes.insert("bytes_request", bytes_request.to_string());
                attributes.insert("handle", defs.io_handle_name(handle)?);
            }
            EventKind::IoOperationComplete {
                handle,
                bytes_result,
                ..
            } => {
                attributes.insert("bytes_result", bytes_result.to_string());
                attributes.insert("handle", defs.io_handle_name(handle)?);
            }
            EventKind::IoSeek {
                handle,
                offset_request,
                whence,
                offset_result,
            } => {
                attributes.insert("offset_request", offset_request.to_string());
                attributes.insert("offset_result", offset_result.to_string());
                attributes.insert("whence", whence.to_string());
                attributes.insert("handle", defs.io_handle_name(handle)?);
            }
            _ => (),
        }

        Ok(EventRow {
            timestamp: event.time,
            event_type: event.kind.name(),
            region,
            rank,
            attributes,
        })
    }

    /// The row as CSV fields, left to right.
    pub fn to_record(&self) -> [String; 5] {
        [
            self.timestamp.to_string(),
            self.event_type.to_owned(),
            self.region.clone(),
            self.rank.clone(),
            self.attributes.to_string(),
        ]
    }
}

fn render_value(value: AttrValue, defs: &GlobalDefs) -> Result<String, Error> {
    Ok(match value {
        AttrValue::Uint64(v) => v.to_string(),
        AttrValue::Int64(v) => v.to_string(),
        AttrValue::Double(v) => v.to_string(),
        AttrValue::String(s) => defs.string(s)?.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::ByteWriter;
    use crate::defs::{
        self, AttrKind, Attribute, IoFile, IoHandle, Location, LocationGroup, LocationGroupKind,
        LocationKind, Region, RegionRole,
    };
    use crate::types::{
        AttrRef, IoAccessMode, IoCreationFlags, IoFileRef, IoHandleRef, IoSeekWhence,
        IoStatusFlags, LocationGroupRef, RegionRef, StringRef,
    };
    use pretty_assertions::assert_eq;

    fn test_defs() -> GlobalDefs {
        let mut out = ByteWriter::new();
        for (id, s) in [
            "Rank 0",
            "Master thread",
            "main",
            "Priority",
            "data.bin",
            "checkpoint",
            "fd3",
        ]
        .iter()
        .enumerate()
        {
            defs::encode_string(&mut out, StringRef(id as u32), s);
        }
        defs::encode_location_group(
            &mut out,
            LocationGroupRef(0),
            &LocationGroup {
                name: StringRef(0),
                kind: LocationGroupKind::Process,
            },
        );
        defs::encode_location(
            &mut out,
            LocationRef(0),
            &Location {
                name: StringRef(1),
                kind: LocationKind::CpuThread,
                group: LocationGroupRef(0),
                event_count: 0,
            },
        );
        defs::encode_region(
            &mut out,
            RegionRef(0),
            &Region {
                name: StringRef(2),
                canonical_name: StringRef(2),
                role: RegionRole::Function,
            },
        );
        defs::encode_attribute(
            &mut out,
            AttrRef(0),
            &Attribute {
                name: StringRef(3),
                kind: AttrKind::Uint64,
            },
        );
        defs::encode_io_file(&mut out, IoFileRef(0), &IoFile { name: StringRef(4) });
        defs::encode_io_handle(
            &mut out,
            IoHandleRef(0),
            &IoHandle {
                name: StringRef(5),
                file: Some(IoFileRef(0)),
            },
        );
        defs::encode_io_handle(
            &mut out,
            IoHandleRef(1),
            &IoHandle {
                name: StringRef(6),
                file: None,
            },
        );
        GlobalDefs::from_bytes(out.as_bytes()).unwrap()
    }

    #[test]
    fn enter_event_has_a_region_and_empty_attributes() {
        let defs = test_defs();
        let event = Event {
            time: 5,
            kind: EventKind::Enter {
                region: RegionRef(0),
            },
            attributes: Vec::new(),
        };
        let row = EventRow::new(LocationRef(0), &event, &defs).unwrap();
        assert_eq!(
            row.to_record(),
            [
                "5".to_owned(),
                "Enter".to_owned(),
                "main".to_owned(),
                "Rank 0".to_owned(),
                "{}".to_owned(),
            ]
        );
    }

    #[test]
    fn generic_attribute_keys_are_lowercased() {
        let defs = test_defs();
        let event = Event {
            time: 1,
            kind: EventKind::MpiSend {
                receiver: 1,
                communicator: 0,
                tag: 9,
                bytes: 64,
            },
            attributes: vec![(AttrRef(0), AttrValue::Uint64(3))],
        };
        let row = EventRow::new(LocationRef(0), &event, &defs).unwrap();
        assert_eq!(row.region, "");
        assert_eq!(row.attributes.to_string(), "{priority: 3}");
    }

    #[test]
    fn io_create_handle_merges_overlay_after_generic_attributes() {
        let defs = test_defs();
        let event = Event {
            time: 12,
            kind: EventKind::IoCreateHandle {
                handle: IoHandleRef(0),
                mode: IoAccessMode::ReadWrite,
                creation_flags: IoCreationFlags::CREAT | IoCreationFlags::TRUNC,
                status_flags: IoStatusFlags::NONE,
            },
            attributes: vec![(AttrRef(0), AttrValue::Uint64(3))],
        };
        let row = EventRow::new(LocationRef(0), &event, &defs).unwrap();
        assert_eq!(
            row.attributes.to_string(),
            "{priority: 3, mode: READ_WRITE, creation_flags: CREAT|TRUNC, status_flags: NONE, handle: data.bin}"
        );
    }

    #[test]
    fn io_seek_overlay_uses_the_documented_key_order() {
        let defs = test_defs();
        let event = Event {
            time: 100,
            kind: EventKind::IoSeek {
                handle: IoHandleRef(0),
                offset_request: 50,
                whence: IoSeekWhence::Set,
                offset_result: 50,
            },
            attributes: Vec::new(),
        };
        let row = EventRow::new(LocationRef(0), &event, &defs).unwrap();
        assert_eq!(
            row.attributes.to_string(),
            "{offset_request: 50, offset_result: 50, whence: SET, handle: data.bin}"
        );
    }

    #[test]
    fn handle_overlay_falls_back_to_the_handle_name() {
        let defs = test_defs();
        let event = Event {
            time: 2,
            kind: EventKind::IoDestroyHandle {
                handle: IoHandleRef(1),
            },
            attributes: Vec::new(),
        };
        let row = EventRow::new(LocationRef(0), &event, &defs).unwrap();
        assert_eq!(row.attributes.get("handle"), Some("fd3"));
    }

    #[test]
    fn overlay_overwrites_a_generic_key_in_place() {
        let mut map = AttrMap::default();
        map.insert("handle", "stale");
        map.insert("mode", "READ_ONLY");
        map.insert("handle", "fresh");
        assert_eq!(map.to_string(), "{handle: fresh, mode: READ_ONLY}");
        assert_eq!(map.len(), 2);
        assert!(!map.is_empty());
    }
}
