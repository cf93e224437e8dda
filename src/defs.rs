//! Global definition records and the resolved registry.
//!
//! Definitions are reference-based: every name is a [`StringRef`] into the
//! string table, and events refer to regions, attributes, and I/O handles by
//! id. References are resolved lazily at lookup time, so definition records
//! may appear in any order within the file.

use crate::decode::{ByteReader, ByteWriter};
use crate::error::Error;
use crate::types::{
    AttrRef, IoFileRef, IoHandleRef, LocationGroupRef, LocationRef, RegionRef, StringRef,
};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub(crate) mod tag {
    pub const STRING: u8 = 0x01;
    pub const CLOCK_PROPERTIES: u8 = 0x02;
    pub const LOCATION_GROUP: u8 = 0x03;
    pub const LOCATION: u8 = 0x04;
    pub const REGION: u8 = 0x05;
    pub const ATTRIBUTE: u8 = 0x06;
    pub const IO_FILE: u8 = 0x07;
    pub const IO_HANDLE: u8 = 0x08;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum LocationGroupKind {
    Process,
    AcceleratorContext,
}

impl LocationGroupKind {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(LocationGroupKind::Process),
            1 => Ok(LocationGroupKind::AcceleratorContext),
            value => Err(Error::MalformedEnum {
                what: "location group kind",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LocationGroupKind::Process => 0,
            LocationGroupKind::AcceleratorContext => 1,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum LocationKind {
    CpuThread,
    GpuStream,
    Metric,
}

impl LocationKind {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(LocationKind::CpuThread),
            1 => Ok(LocationKind::GpuStream),
            2 => Ok(LocationKind::Metric),
            value => Err(Error::MalformedEnum {
                what: "location kind",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LocationKind::CpuThread => 0,
            LocationKind::GpuStream => 1,
            LocationKind::Metric => 2,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum RegionRole {
    Function,
    Wrapper,
    Loop,
    FileIo,
}

impl RegionRole {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(RegionRole::Function),
            1 => Ok(RegionRole::Wrapper),
            2 => Ok(RegionRole::Loop),
            3 => Ok(RegionRole::FileIo),
            value => Err(Error::MalformedEnum {
                what: "region role",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            RegionRole::Function => 0,
            RegionRole::Wrapper => 1,
            RegionRole::Loop => 2,
            RegionRole::FileIo => 3,
        }
    }
}

/// Declared value type of an attribute definition.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum AttrKind {
    Uint64,
    Int64,
    Double,
    String,
}

impl AttrKind {
    pub(crate) fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(AttrKind::Uint64),
            1 => Ok(AttrKind::Int64),
            2 => Ok(AttrKind::Double),
            3 => Ok(AttrKind::String),
            value => Err(Error::MalformedEnum {
                what: "attribute kind",
                value,
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            AttrKind::Uint64 => 0,
            AttrKind::Int64 => 1,
            AttrKind::Double => 2,
            AttrKind::String => 3,
        }
    }
}

/// Clock metadata carried by the archive. Timestamps are exported verbatim,
/// so this is informational only.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ClockProperties {
    pub timer_resolution: u64,
    pub global_offset: u64,
    pub trace_length: u64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct LocationGroup {
    pub name: StringRef,
    pub kind: LocationGroupKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Location {
    pub name: StringRef,
    pub kind: LocationKind,
    pub group: LocationGroupRef,
    pub event_count: u64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Region {
    pub name: StringRef,
    pub canonical_name: StringRef,
    pub role: RegionRole,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Attribute {
    pub name: StringRef,
    pub kind: AttrKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct IoFile {
    pub name: StringRef,
}

/// An open file-like object. `file` is absent for handles that are not
/// backed by a file (pipes, sockets, standard streams).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct IoHandle {
    pub name: StringRef,
    pub file: Option<IoFileRef>,
}

#[derive(Debug, Default)]
pub struct GlobalDefs {
    clock: Option<ClockProperties>,
    strings: HashMap<u32, String>,
    location_groups: HashMap<u32, LocationGroup>,
    // Keyed in sorted order so location iteration is deterministic
    locations: BTreeMap<u64, Location>,
    regions: HashMap<u32, Region>,
    attributes: HashMap<u32, Attribute>,
    io_files: HashMap<u32, IoFile>,
    io_handles: HashMap<u32, IoHandle>,
}

impl GlobalDefs {
    /// Decode a definitions file body (header already stripped). Unknown
    /// record tags are skipped; duplicate ids are last-one-wins.
    pub(crate) fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let mut defs = GlobalDefs::default();
        let mut r = ByteReader::new(buf);
        while !r.is_empty() {
            let tag = r.read_u8()?;
            let mut body = r.read_record_body()?;
            match tag {
                tag::STRING => {
                    let id = body.read_u32()?;
                    defs.strings.insert(id, body.read_string()?);
                }
                tag::CLOCK_PROPERTIES => {
                    defs.clock = Some(ClockProperties {
                        timer_resolution: body.read_u64()?,
                        global_offset: body.read_u64()?,
                        trace_length: body.read_u64()?,
                    });
                }
                tag::LOCATION_GROUP => {
                    let id = body.read_u32()?;
                    defs.location_groups.insert(
                        id,
                        LocationGroup {
                            name: StringRef::from(body.read_u32()?),
                            kind: LocationGroupKind::from_u8(body.read_u8()?)?,
                        },
                    );
                }
                tag::LOCATION => {
                    let id = body.read_u64()?;
                    defs.locations.insert(
                        id,
                        Location {
                            name: StringRef::from(body.read_u32()?),
                            kind: LocationKind::from_u8(body.read_u8()?)?,
                            group: LocationGroupRef::from(body.read_u32()?),
                            event_count: body.read_u64()?,
                        },
                    );
                }
                tag::REGION => {
                    let id = body.read_u32()?;
                    defs.regions.insert(
                        id,
                        Region {
                            name: StringRef::from(body.read_u32()?),
                            canonical_name: StringRef::from(body.read_u32()?),
                            role: RegionRole::from_u8(body.read_u8()?)?,
                        },
                    );
                }
                tag::ATTRIBUTE => {
                    let id = body.read_u32()?;
                    defs.attributes.insert(
                        id,
                        Attribute {
                            name: StringRef::from(body.read_u32()?),
                            kind: AttrKind::from_u8(body.read_u8()?)?,
                        },
                    );
                }
                tag::IO_FILE => {
                    let id = body.read_u32()?;
                    defs.io_files.insert(
                        id,
                        IoFile {
                            name: StringRef::from(body.read_u32()?),
                        },
                    );
                }
                tag::IO_HANDLE => {
                    let id = body.read_u32()?;
                    let name = StringRef::from(body.read_u32()?);
                    let file = if body.read_u8()? != 0 {
                        Some(IoFileRef::from(body.read_u32()?))
                    } else {
                        None
                    };
                    defs.io_handles.insert(id, IoHandle { name, file });
                }
                tag => debug!(tag, "skipping unknown definition record"),
            }
        }
        Ok(defs)
    }

    pub fn clock_properties(&self) -> Option<&ClockProperties> {
        self.clock.as_ref()
    }

    pub fn string(&self, r: StringRef) -> Result<&str, Error> {
        self.strings
            .get(&u32::from(r))
            .map(String::as_str)
            .ok_or(Error::UndefinedRef {
                what: "string",
                id: u64::from(u32::from(r)),
            })
    }

    pub fn location(&self, r: LocationRef) -> Result<&Location, Error> {
        self.locations.get(&u64::from(r)).ok_or(Error::UndefinedRef {
            what: "location",
            id: u64::from(r),
        })
    }

    /// All defined locations in ascending id order.
    pub fn locations(&self) -> impl Iterator<Item = (LocationRef, &Location)> + '_ {
        self.locations
            .iter()
            .map(|(id, l)| (LocationRef::from(*id), l))
    }

    pub fn region_name(&self, r: RegionRef) -> Result<&str, Error> {
        let region = self.regions.get(&u32::from(r)).ok_or(Error::UndefinedRef {
            what: "region",
            id: u64::from(u32::from(r)),
        })?;
        self.string(region.name)
    }

    pub fn attribute_name(&self, r: AttrRef) -> Result<&str, Error> {
        let attr = self
            .attributes
            .get(&u32::from(r))
            .ok_or(Error::UndefinedRef {
                what: "attribute",
                id: u64::from(u32::from(r)),
            })?;
        self.string(attr.name)
    }

    /// Name of the location group that owns `r` (the rank label).
    pub fn location_group_name(&self, r: LocationRef) -> Result<&str, Error> {
        let location = self.location(r)?;
        let group = self
            .location_groups
            .get(&u32::from(location.group))
            .ok_or(Error::UndefinedRef {
                what: "location group",
                id: u64::from(u32::from(location.group)),
            })?;
        self.string(group.name)
    }

    /// The backing file's name if the handle is backed by a file, otherwise
    /// the handle's own name. A handle without file backing is the normal
    /// case for non-file handles, not an error.
    pub fn io_handle_name(&self, r: IoHandleRef) -> Result<&str, Error> {
        let handle = self
            .io_handles
            .get(&u32::from(r))
            .ok_or(Error::UndefinedRef {
                what: "I/O handle",
                id: u64::from(u32::from(r)),
            })?;
        match handle.file {
            Some(file) => {
                let file = self.io_files.get(&u32::from(file)).ok_or(Error::UndefinedRef {
                    what: "I/O file",
                    id: u64::from(u32::from(file)),
                })?;
                self.string(file.name)
            }
            None => self.string(handle.name),
        }
    }
}

pub(crate) fn encode_string(out: &mut ByteWriter, id: StringRef, value: &str) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_string(value);
    out.write_record(tag::STRING, &body);
}

pub(crate) fn encode_clock_properties(out: &mut ByteWriter, clock: &ClockProperties) {
    let mut body = ByteWriter::new();
    body.write_u64(clock.timer_resolution);
    body.write_u64(clock.global_offset);
    body.write_u64(clock.trace_length);
    out.write_record(tag::CLOCK_PROPERTIES, &body);
}

pub(crate) fn encode_location_group(out: &mut ByteWriter, id: LocationGroupRef, group: &LocationGroup) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_u32(group.name.into());
    body.write_u8(group.kind.as_u8());
    out.write_record(tag::LOCATION_GROUP, &body);
}

pub(crate) fn encode_location(out: &mut ByteWriter, id: LocationRef, location: &Location) {
    let mut body = ByteWriter::new();
    body.write_u64(id.into());
    body.write_u32(location.name.into());
    body.write_u8(location.kind.as_u8());
    body.write_u32(location.group.into());
    body.write_u64(location.event_count);
    out.write_record(tag::LOCATION, &body);
}

pub(crate) fn encode_region(out: &mut ByteWriter, id: RegionRef, region: &Region) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_u32(region.name.into());
    body.write_u32(region.canonical_name.into());
    body.write_u8(region.role.as_u8());
    out.write_record(tag::REGION, &body);
}

pub(crate) fn encode_attribute(out: &mut ByteWriter, id: AttrRef, attr: &Attribute) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_u32(attr.name.into());
    body.write_u8(attr.kind.as_u8());
    out.write_record(tag::ATTRIBUTE, &body);
}

pub(crate) fn encode_io_file(out: &mut ByteWriter, id: IoFileRef, file: &IoFile) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_u32(file.name.into());
    out.write_record(tag::IO_FILE, &body);
}

pub(crate) fn encode_io_handle(out: &mut ByteWriter, id: IoHandleRef, handle: &IoHandle) {
    let mut body = ByteWriter::new();
    body.write_u32(id.into());
    body.write_u32(handle.name.into());
    match handle.file {
        Some(file) => {
            body.write_u8(1);
            body.write_u32(file.into());
        }
        None => body.write_u8(0),
    }
    out.write_record(tag::IO_HANDLE, &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_defs() -> GlobalDefs {
        let mut out = ByteWriter::new();
        encode_string(&mut out, StringRef(0), "Rank 0");
        encode_string(&mut out, StringRef(1), "Master thread");
        encode_string(&mut out, StringRef(2), "a.txt");
        encode_string(&mut out, StringRef(3), "fd3");
        encode_string(&mut out, StringRef(4), "backed");
        encode_location_group(
            &mut out,
            LocationGroupRef(0),
            &LocationGroup {
                name: StringRef(0),
                kind: LocationGroupKind::Process,
            },
        );
        encode_location(
            &mut out,
            LocationRef(0),
            &Location {
                name: StringRef(1),
                kind: LocationKind::CpuThread,
                group: LocationGroupRef(0),
                event_count: 0,
            },
        );
        encode_io_file(&mut out, IoFileRef(0), &IoFile { name: StringRef(2) });
        encode_io_handle(
            &mut out,
            IoHandleRef(0),
            &IoHandle {
                name: StringRef(4),
                file: Some(IoFileRef(0)),
            },
        );
        encode_io_handle(
            &mut out,
            IoHandleRef(1),
            &IoHandle {
                name: StringRef(3),
                file: None,
            },
        );
        GlobalDefs::from_bytes(out.as_bytes()).unwrap()
    }

    #[test]
    fn handle_name_prefers_the_backing_file() {
        let defs = test_defs();
        assert_eq!(defs.io_handle_name(IoHandleRef(0)).unwrap(), "a.txt");
    }

    #[test]
    fn handle_name_falls_back_to_the_handle_itself() {
        let defs = test_defs();
        assert_eq!(defs.io_handle_name(IoHandleRef(1)).unwrap(), "fd3");
    }

    #[test]
    fn rank_label_comes_from_the_owning_group() {
        let defs = test_defs();
        assert_eq!(defs.location_group_name(LocationRef(0)).unwrap(), "Rank 0");
    }

    #[test]
    fn undefined_references_are_reported() {
        let defs = test_defs();
        assert!(matches!(
            defs.io_handle_name(IoHandleRef(9)),
            Err(Error::UndefinedRef { what: "I/O handle", .. })
        ));
    }

    #[test]
    fn unknown_definition_records_are_skipped() {
        let mut out = ByteWriter::new();
        encode_string(&mut out, StringRef(0), "kept");
        let mut body = ByteWriter::new();
        body.write_u64(123);
        out.write_record(0x6f, &body);
        encode_string(&mut out, StringRef(1), "also kept");

        let defs = GlobalDefs::from_bytes(out.as_bytes()).unwrap();
        assert_eq!(defs.string(StringRef(0)).unwrap(), "kept");
        assert_eq!(defs.string(StringRef(1)).unwrap(), "also kept");
    }
}
