//! Event records and the per-location event file codec.
//!
//! Every record carries a timestamp and an optional attribute list; the kind
//! is a closed sum type so downstream projection can match exhaustively
//! instead of probing for per-kind fields. Unknown record tags are skipped.

use crate::decode::{ByteReader, ByteWriter};
use crate::error::Error;
use crate::types::{
    AttrRef, IoAccessMode, IoCreationFlags, IoHandleRef, IoOperationMode, IoSeekWhence,
    IoStatusFlags, LocationRef, RegionRef, StringRef,
};
use tracing::debug;

pub(crate) mod tag {
    pub const ENTER: u8 = 0x01;
    pub const LEAVE: u8 = 0x02;
    pub const MPI_SEND: u8 = 0x03;
    pub const MPI_RECV: u8 = 0x04;
    pub const IO_CREATE_HANDLE: u8 = 0x10;
    pub const IO_DESTROY_HANDLE: u8 = 0x11;
    pub const IO_OPERATION_BEGIN: u8 = 0x12;
    pub const IO_OPERATION_COMPLETE: u8 = 0x13;
    pub const IO_SEEK: u8 = 0x14;
}

mod value_tag {
    pub const UINT64: u8 = 0x00;
    pub const INT64: u8 = 0x01;
    pub const DOUBLE: u8 = 0x02;
    pub const STRING: u8 = 0x03;
}

/// Scalar value of a generic event attribute. String values are references
/// into the global string table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AttrValue {
    Uint64(u64),
    Int64(i64),
    Double(f64),
    String(StringRef),
}

impl AttrValue {
    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, Error> {
        match r.read_u8()? {
            value_tag::UINT64 => Ok(AttrValue::Uint64(r.read_u64()?)),
            value_tag::INT64 => Ok(AttrValue::Int64(r.read_i64()?)),
            value_tag::DOUBLE => Ok(AttrValue::Double(r.read_f64()?)),
            value_tag::STRING => Ok(AttrValue::String(StringRef::from(r.read_u32()?))),
            value => Err(Error::MalformedEnum {
                what: "attribute value type",
                value,
            }),
        }
    }

    pub(crate) fn encode(&self, out: &mut ByteWriter) {
        match self {
            AttrValue::Uint64(v) => {
                out.write_u8(value_tag::UINT64);
                out.write_u64(*v);
            }
            AttrValue::Int64(v) => {
                out.write_u8(value_tag::INT64);
                out.write_i64(*v);
            }
            AttrValue::Double(v) => {
                out.write_u8(value_tag::DOUBLE);
                out.write_f64(*v);
            }
            AttrValue::String(v) => {
                out.write_u8(value_tag::STRING);
                out.write_u32((*v).into());
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EventKind {
    Enter {
        region: RegionRef,
    },
    Leave {
        region: RegionRef,
    },
    MpiSend {
        receiver: u32,
        communicator: u32,
        tag: u32,
        bytes: u64,
    },
    MpiRecv {
        sender: u32,
        communicator: u32,
        tag: u32,
        bytes: u64,
    },
    IoCreateHandle {
        handle: IoHandleRef,
        mode: IoAccessMode,
        creation_flags: IoCreationFlags,
        status_flags: IoStatusFlags,
    },
    IoDestroyHandle {
        handle: IoHandleRef,
    },
    IoOperationBegin {
        handle: IoHandleRef,
        mode: IoOperationMode,
        bytes_request: u64,
        matching_id: u64,
    },
    IoOperationComplete {
        handle: IoHandleRef,
        bytes_result: u64,
        matching_id: u64,
    },
    IoSeek {
        handle: IoHandleRef,
        offset_request: i64,
        whence: IoSeekWhence,
        offset_result: u64,
    },
}

impl EventKind {
    /// Record name, exported verbatim in the EventType column.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Enter { .. } => "Enter",
            EventKind::Leave { .. } => "Leave",
            EventKind::MpiSend { .. } => "MpiSend",
            EventKind::MpiRecv { .. } => "MpiRecv",
            EventKind::IoCreateHandle { .. } => "IoCreateHandle",
            EventKind::IoDestroyHandle { .. } => "IoDestroyHandle",
            EventKind::IoOperationBegin { .. } => "IoOperationBegin",
            EventKind::IoOperationComplete { .. } => "IoOperationComplete",
            EventKind::IoSeek { .. } => "IoSeek",
        }
    }

    /// The region annotated on enter/leave records.
    pub fn region(&self) -> Option<RegionRef> {
        match self {
            EventKind::Enter { region } | EventKind::Leave { region } => Some(*region),
            _ => None,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            EventKind::Enter { .. } => tag::ENTER,
            EventKind::Leave { .. } => tag::LEAVE,
            EventKind::MpiSend { .. } => tag::MPI_SEND,
            EventKind::MpiRecv { .. } => tag::MPI_RECV,
            EventKind::IoCreateHandle { .. } => tag::IO_CREATE_HANDLE,
            EventKind::IoDestroyHandle { .. } => tag::IO_DESTROY_HANDLE,
            EventKind::IoOperationBegin { .. } => tag::IO_OPERATION_BEGIN,
            EventKind::IoOperationComplete { .. } => tag::IO_OPERATION_COMPLETE,
            EventKind::IoSeek { .. } => tag::IO_SEEK,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: u64,
    pub kind: EventKind,
    pub attributes: Vec<(AttrRef, AttrValue)>,
}

/// Forward-only decoder over one location's event records.
#[derive(Debug)]
pub(crate) struct EventCursor<'a> {
    location: LocationRef,
    r: ByteReader<'a>,
}

impl<'a> EventCursor<'a> {
    /// `buf` is the record stream with the file header already stripped.
    pub(crate) fn new(location: LocationRef, buf: &'a [u8]) -> Self {
        EventCursor {
            location,
            r: ByteReader::new(buf),
        }
    }

    pub(crate) fn location(&self) -> LocationRef {
        self.location
    }

    pub(crate) fn next_event(&mut self) -> Result<Option<Event>, Error> {
        loop {
            if self.r.is_empty() {
                return Ok(None);
            }
            let record_tag = self.r.read_u8()?;
            let mut body = self.r.read_record_body()?;
            if !is_known_event_tag(record_tag) {
                debug!(
                    tag = record_tag,
                    location = %self.location,
                    "skipping unknown event record"
                );
                continue;
            }
            let time = body.read_u64()?;
            let kind = decode_kind(record_tag, &mut body)?;
            let attributes = decode_attr_list(&mut body)?;
            return Ok(Some(Event {
                time,
                kind,
                attributes,
            }));
        }
    }
}

fn is_known_event_tag(record_tag: u8) -> bool {
    matches!(
        record_tag,
        tag::ENTER
            | tag::LEAVE
            | tag::MPI_SEND
            | tag::MPI_RECV
            | tag::IO_CREATE_HANDLE
            | tag::IO_DESTROY_HANDLE
            | tag::IO_OPERATION_BEGIN
            | tag::IO_OPERATION_COMPLETE
            | tag::IO_SEEK
    )
}

fn decode_kind(record_tag: u8, r: &mut ByteReader<'_>) -> Result<EventKind, Error> {
    let kind = match record_tag {
        tag::ENTER => EventKind::Enter {
            region: RegionRef::from(r.read_u32()?),
        },
        tag::LEAVE => EventKind::Leave {
            region: RegionRef::from(r.read_u32()?),
        },
        tag::MPI_SEND => EventKind::MpiSend {
            receiver: r.read_u32()?,
            communicator: r.read_u32()?,
            tag: r.read_u32()?,
            bytes: r.read_u64()?,
        },
        tag::MPI_RECV => EventKind::MpiRecv {
            sender: r.read_u32()?,
            communicator: r.read_u32()?,
            tag: r.read_u32()?,
            bytes: r.read_u64()?,
        },
        tag::IO_CREATE_HANDLE => EventKind::IoCreateHandle {
            handle: IoHandleRef::from(r.read_u32()?),
            mode: IoAccessMode::from_u8(r.read_u8()?)?,
            creation_flags: IoCreationFlags::from(r.read_u32()?),
            status_flags: IoStatusFlags::from(r.read_u32()?),
        },
        tag::IO_DESTROY_HANDLE => EventKind::IoDestroyHandle {
            handle: IoHandleRef::from(r.read_u32()?),
        },
        tag::IO_OPERATION_BEGIN => EventKind::IoOperationBegin {
            handle: IoHandleRef::from(r.read_u32()?),
            mode: IoOperationMode::from_u8(r.read_u8()?)?,
            bytes_request: r.read_u64()?,
            matching_id: r.read_u64()?,
        },
        tag::IO_OPERATION_COMPLETE => EventKind::IoOperationComplete {
            handle: IoHandleRef::from(r.read_u32()?),
            bytes_result: r.read_u64()?,
            matching_id: r.read_u64()?,
        },
        tag::IO_SEEK => EventKind::IoSeek {
            handle: IoHandleRef::from(r.read_u32()?),
            offset_request: r.read_i64()?,
            whence: IoSeekWhence::from_u8(r.read_u8()?)?,
            offset_result: r.read_u64()?,
        },
        value => {
            return Err(Error::MalformedEnum {
                what: "event record",
                value,
            })
        }
    };
    Ok(kind)
}

fn decode_attr_list(r: &mut ByteReader<'_>) -> Result<Vec<(AttrRef, AttrValue)>, Error> {
    let count = r.read_u32()?;
    let mut attributes = Vec::new();
    for _ in 0..count {
        let attr = AttrRef::from(r.read_u32()?);
        let value = AttrValue::decode(r)?;
        attributes.push((attr, value));
    }
    Ok(attributes)
}

pub(crate) fn encode_event(out: &mut ByteWriter, event: &Event) {
    let mut body = ByteWriter::new();
    body.write_u64(event.time);
    match event.kind {
        EventKind::Enter { region } | EventKind::Leave { region } => {
            body.write_u32(region.into());
        }
        EventKind::MpiSend {
            receiver,
            communicator,
            tag,
            bytes,
        } => {
            body.write_u32(receiver);
            body.write_u32(communicator);
            body.write_u32(tag);
            body.write_u64(bytes);
        }
        EventKind::MpiRecv {
            sender,
            communicator,
            tag,
            bytes,
        } => {
            body.write_u32(sender);
            body.write_u32(communicator);
            body.write_u32(tag);
            body.write_u64(bytes);
        }
        EventKind::IoCreateHandle {
            handle,
            mode,
            creation_flags,
            status_flags,
        } => {
            body.write_u32(handle.into());
            body.write_u8(mode.as_u8());
            body.write_u32(creation_flags.into());
            body.write_u32(status_flags.into());
        }
        EventKind::IoDestroyHandle { handle } => {
            body.write_u32(handle.into());
        }
        EventKind::IoOperationBegin {
            handle,
            mode,
            bytes_request,
            matching_id,
        } => {
            body.write_u32(handle.into());
            body.write_u8(mode.as_u8());
            body.write_u64(bytes_request);
            body.write_u64(matching_id);
        }
        EventKind::IoOperationComplete {
            handle,
            bytes_result,
            matching_id,
        } => {
            body.write_u32(handle.into());
            body.write_u64(bytes_result);
            body.write_u64(matching_id);
        }
        EventKind::IoSeek {
            handle,
            offset_request,
            whence,
            offset_result,
        } => {
            body.write_u32(handle.into());
            body.write_i64(offset_request);
            body.write_u8(whence.as_u8());
            body.write_u64(offset_result);
        }
    }
    body.write_u32(event.attributes.len() as u32);
    for (attr, value) in &event.attributes {
        body.write_u32((*attr).into());
        value.encode(&mut body);
    }
    out.write_record(event.kind.tag(), &body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_yields_records_in_file_order_and_skips_unknown_tags() {
        let mut out = ByteWriter::new();
        encode_event(
            &mut out,
            &Event {
                time: 10,
                kind: EventKind::Enter {
                    region: RegionRef(3),
                },
                attributes: vec![(AttrRef(0), AttrValue::Uint64(7))],
            },
        );
        // A record tag from a newer format revision
        let mut alien = ByteWriter::new();
        alien.write_u64(11);
        alien.write_string("whatever this is");
        out.write_record(0x66, &alien);
        encode_event(
            &mut out,
            &Event {
                time: 12,
                kind: EventKind::IoSeek {
                    handle: IoHandleRef(1),
                    offset_request: -4,
                    whence: IoSeekWhence::End,
                    offset_result: 96,
                },
                attributes: Vec::new(),
            },
        );

        let bytes = out.into_vec();
        let mut cursor = EventCursor::new(LocationRef(0), &bytes);
        let first = cursor.next_event().unwrap().unwrap();
        assert_eq!(first.time, 10);
        assert_eq!(first.kind.name(), "Enter");
        assert_eq!(first.kind.region(), Some(RegionRef(3)));
        assert_eq!(first.attributes, vec![(AttrRef(0), AttrValue::Uint64(7))]);

        let second = cursor.next_event().unwrap().unwrap();
        assert_eq!(second.time, 12);
        assert_eq!(
            second.kind,
            EventKind::IoSeek {
                handle: IoHandleRef(1),
                offset_request: -4,
                whence: IoSeekWhence::End,
                offset_result: 96,
            }
        );
        assert!(cursor.next_event().unwrap().is_none());
    }

    #[test]
    fn non_region_kinds_report_no_region() {
        let kind = EventKind::MpiSend {
            receiver: 1,
            communicator: 0,
            tag: 42,
            bytes: 1024,
        };
        assert_eq!(kind.region(), None);
        assert_eq!(kind.name(), "MpiSend");
    }

    #[test]
    fn truncated_event_record_is_an_error() {
        let mut out = ByteWriter::new();
        encode_event(
            &mut out,
            &Event {
                time: 1,
                kind: EventKind::IoDestroyHandle {
                    handle: IoHandleRef(0),
                },
                attributes: Vec::new(),
            },
        );
        let bytes = out.into_vec();
        // Drop the trailing attribute-count byte
        let mut cursor = EventCursor::new(LocationRef(0), &bytes[..bytes.len() - 1]);
        assert!(cursor.next_event().is_err());
    }
}
