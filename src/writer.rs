//! Write side of an archive, used by the trace generator and by tests to
//! produce fixtures the reader can open.
//!
//! Definitions are registered up front and return the references events use;
//! event records are buffered per location and must arrive in
//! nondecreasing-timestamp order. Nothing touches the filesystem until
//! [`ArchiveWriter::finish`].

use crate::archive::{Anchor, ArchiveLayout, DEFS_MAGIC, EVENTS_MAGIC};
use crate::decode::ByteWriter;
use crate::defs::{
    self, AttrKind, Attribute, ClockProperties, IoFile, IoHandle, Location, LocationGroup,
    LocationGroupKind, LocationKind, Region, RegionRole,
};
use crate::error::Error;
use crate::events::{encode_event, AttrValue, Event, EventKind};
use crate::types::{
    AttrRef, IoFileRef, IoHandleRef, LocationGroupRef, LocationRef, RegionRef, StringRef,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

struct LocationState {
    name: StringRef,
    kind: LocationKind,
    group: LocationGroupRef,
    events: ByteWriter,
    last_time: Option<u64>,
    event_count: u64,
}

pub struct ArchiveWriter {
    dir: PathBuf,
    trace_id: Uuid,
    strings: Vec<String>,
    string_ids: HashMap<String, StringRef>,
    clock: Option<ClockProperties>,
    location_groups: Vec<LocationGroup>,
    locations: Vec<LocationState>,
    regions: Vec<Region>,
    attributes: Vec<Attribute>,
    io_files: Vec<IoFile>,
    io_handles: Vec<IoHandle>,
}

impl ArchiveWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ArchiveWriter {
            dir: dir.as_ref().to_path_buf(),
            trace_id: Uuid::new_v4(),
            strings: Vec::new(),
            string_ids: HashMap::new(),
            clock: None,
            location_groups: Vec::new(),
            locations: Vec::new(),
            regions: Vec::new(),
            attributes: Vec::new(),
            io_files: Vec::new(),
            io_handles: Vec::new(),
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Intern a string, returning its table reference.
    pub fn string(&mut self, value: &str) -> StringRef {
        if let Some(r) = self.string_ids.get(value) {
            return *r;
        }
        let r = StringRef(self.strings.len() as u32);
        self.strings.push(value.to_owned());
        self.string_ids.insert(value.to_owned(), r);
        r
    }

    pub fn clock_properties(&mut self, timer_resolution: u64, global_offset: u64, trace_length: u64) {
        self.clock = Some(ClockProperties {
            timer_resolution,
            global_offset,
            trace_length,
        });
    }

    pub fn location_group(&mut self, name: &str, kind: LocationGroupKind) -> LocationGroupRef {
        let name = self.string(name);
        let r = LocationGroupRef(self.location_groups.len() as u32);
        self.location_groups.push(LocationGroup { name, kind });
        r
    }

    pub fn location(
        &mut self,
        name: &str,
        kind: LocationKind,
        group: LocationGroupRef,
    ) -> LocationRef {
        let name = self.string(name);
        let r = LocationRef(self.locations.len() as u64);
        self.locations.push(LocationState {
            name,
            kind,
            group,
            events: ByteWriter::new(),
            last_time: None,
            event_count: 0,
        });
        r
    }

    pub fn region(&mut self, name: &str, role: RegionRole) -> RegionRef {
        let name = self.string(name);
        let r = RegionRef(self.regions.len() as u32);
        self.regions.push(Region {
            name,
            canonical_name: name,
            role,
        });
        r
    }

    pub fn attribute(&mut self, name: &str, kind: AttrKind) -> AttrRef {
        let name = self.string(name);
        let r = AttrRef(self.attributes.len() as u32);
        self.attributes.push(Attribute { name, kind });
        r
    }

    pub fn io_file(&mut self, name: &str) -> IoFileRef {
        let name = self.string(name);
        let r = IoFileRef(self.io_files.len() as u32);
        self.io_files.push(IoFile { name });
        r
    }

    pub fn io_handle(&mut self, name: &str, file: Option<IoFileRef>) -> IoHandleRef {
        let name = self.string(name);
        let r = IoHandleRef(self.io_handles.len() as u32);
        self.io_handles.push(IoHandle { name, file });
        r
    }

    /// Append an event to `location`'s record stream.
    pub fn event(
        &mut self,
        location: LocationRef,
        time: u64,
        kind: EventKind,
        attributes: &[(AttrRef, AttrValue)],
    ) -> Result<(), Error> {
        let state = self
            .locations
            .get_mut(u64::from(location) as usize)
            .ok_or(Error::UndefinedRef {
                what: "location",
                id: location.into(),
            })?;
        if let Some(last) = state.last_time {
            if time < last {
                return Err(Error::NonMonotonicTimestamp {
                    location: location.into(),
                    time,
                    last,
                });
            }
        }
        state.last_time = Some(time);
        state.event_count += 1;
        encode_event(
            &mut state.events,
            &Event {
                time,
                kind,
                attributes: attributes.to_vec(),
            },
        );
        Ok(())
    }

    pub fn event_count(&self) -> u64 {
        self.locations.iter().map(|l| l.event_count).sum()
    }

    /// Write the archive to disk and return the anchor path.
    pub fn finish(self) -> Result<PathBuf, Error> {
        let layout = ArchiveLayout::from_anchor_path(&self.dir.join("traces.otf2"))?;
        fs::create_dir_all(layout.events_dir()).map_err(|source| Error::WriteFile {
            path: layout.events_dir().to_path_buf(),
            source,
        })?;

        let mut out = ByteWriter::new();
        out.write_bytes(DEFS_MAGIC);
        for (id, value) in self.strings.iter().enumerate() {
            defs::encode_string(&mut out, StringRef(id as u32), value);
        }
        if let Some(clock) = &self.clock {
            defs::encode_clock_properties(&mut out, clock);
        }
        for (id, group) in self.location_groups.iter().enumerate() {
            defs::encode_location_group(&mut out, LocationGroupRef(id as u32), group);
        }
        for (id, state) in self.locations.iter().enumerate() {
            defs::encode_location(
                &mut out,
                LocationRef(id as u64),
                &Location {
                    name: state.name,
                    kind: state.kind,
                    group: state.group,
                    event_count: state.event_count,
                },
            );
        }
        for (id, region) in self.regions.iter().enumerate() {
            defs::encode_region(&mut out, RegionRef(id as u32), region);
        }
        for (id, attr) in self.attributes.iter().enumerate() {
            defs::encode_attribute(&mut out, AttrRef(id as u32), attr);
        }
        for (id, file) in self.io_files.iter().enumerate() {
            defs::encode_io_file(&mut out, IoFileRef(id as u32), file);
        }
        for (id, handle) in self.io_handles.iter().enumerate() {
            defs::encode_io_handle(&mut out, IoHandleRef(id as u32), handle);
        }
        write_file(layout.defs_path(), out.as_bytes())?;

        for (id, state) in self.locations.iter().enumerate() {
            let mut out = ByteWriter::new();
            out.write_bytes(EVENTS_MAGIC);
            out.write_bytes(state.events.as_bytes());
            write_file(&layout.event_file(LocationRef(id as u64)), out.as_bytes())?;
        }

        // The anchor goes last so a torn generation never looks openable
        let anchor = Anchor {
            trace_id: self.trace_id,
            location_count: self.locations.len() as u64,
        };
        write_file(layout.anchor_path(), &anchor.encode())?;
        Ok(layout.anchor_path().to_path_buf())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    fs::write(path, bytes).map_err(|source| Error::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_must_not_go_backwards_within_a_location() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ArchiveWriter::new(dir.path());
        let group = w.location_group("Rank 0", LocationGroupKind::Process);
        let loc = w.location("Master thread", LocationKind::CpuThread, group);
        let region = w.region("main", RegionRole::Function);

        w.event(loc, 10, EventKind::Enter { region }, &[]).unwrap();
        // Equal timestamps are allowed
        w.event(loc, 10, EventKind::Leave { region }, &[]).unwrap();
        let err = w.event(loc, 9, EventKind::Enter { region }, &[]);
        assert!(matches!(
            err,
            Err(Error::NonMonotonicTimestamp {
                location: 0,
                time: 9,
                last: 10
            })
        ));
        assert_eq!(w.event_count(), 2);
    }

    #[test]
    fn events_for_an_unregistered_location_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ArchiveWriter::new(dir.path());
        let region = w.region("main", RegionRole::Function);
        let err = w.event(LocationRef(0), 1, EventKind::Enter { region }, &[]);
        assert!(matches!(err, Err(Error::UndefinedRef { .. })));
    }
}
