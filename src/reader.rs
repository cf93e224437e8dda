//! Read side of an archive: open the anchor, load definitions and event
//! data, and iterate every (location, event) pair.

use crate::archive::{Anchor, ArchiveLayout, DEFS_MAGIC, EVENTS_MAGIC};
use crate::defs::GlobalDefs;
use crate::error::Error;
use crate::events::{Event, EventCursor};
use crate::types::LocationRef;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

pub struct TraceReader {
    anchor: Anchor,
    defs: GlobalDefs,
    event_buffers: Vec<(LocationRef, Vec<u8>)>,
}

impl TraceReader {
    /// Open the archive anchored at `path` (e.g. `…/traces.otf2`), loading
    /// its definitions and each defined location's event data.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let layout = ArchiveLayout::from_anchor_path(path.as_ref())?;
        let anchor = Anchor::read(layout.anchor_path())?;
        debug!(
            trace_id = %anchor.trace_id,
            locations = anchor.location_count,
            "opened trace archive"
        );

        let defs_path = layout.defs_path();
        let defs_bytes = fs::read(defs_path).map_err(|source| Error::ReadFile {
            path: defs_path.to_path_buf(),
            source,
        })?;
        if !defs_bytes.starts_with(DEFS_MAGIC) {
            return Err(Error::BadFileHeader("definitions"));
        }
        let defs = GlobalDefs::from_bytes(&defs_bytes[DEFS_MAGIC.len()..])?;

        let mut event_buffers = Vec::new();
        for (location, _) in defs.locations() {
            let event_path = layout.event_file(location);
            let buf = match fs::read(&event_path) {
                Ok(buf) => buf,
                Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                    debug!(location = %location, "location has no event file");
                    continue;
                }
                Err(source) => {
                    return Err(Error::ReadFile {
                        path: event_path,
                        source,
                    })
                }
            };
            if !buf.starts_with(EVENTS_MAGIC) {
                return Err(Error::BadFileHeader("event"));
            }
            event_buffers.push((location, buf));
        }

        Ok(TraceReader {
            anchor,
            defs,
            event_buffers,
        })
    }

    pub fn trace_id(&self) -> Uuid {
        self.anchor.trace_id
    }

    pub fn defs(&self) -> &GlobalDefs {
        &self.defs
    }

    /// Iterate every (location, event) pair of the trace, merged across
    /// locations in nondecreasing-timestamp order with ties broken by
    /// location id. Forward-only, single pass.
    pub fn events(&self) -> Events<'_> {
        let mut cursors: Vec<EventCursor<'_>> = self
            .event_buffers
            .iter()
            .map(|(location, buf)| EventCursor::new(*location, &buf[EVENTS_MAGIC.len()..]))
            .collect();

        let mut heap = BinaryHeap::with_capacity(cursors.len());
        let mut pending_err = None;
        for (stream, cursor) in cursors.iter_mut().enumerate() {
            match cursor.next_event() {
                Ok(Some(event)) => heap.push(Reverse(NextEvent {
                    time: event.time,
                    location: cursor.location(),
                    stream,
                    event,
                })),
                Ok(None) => (),
                Err(e) => {
                    pending_err = Some(e);
                    break;
                }
            }
        }

        Events {
            cursors,
            heap,
            pending_err,
            done: false,
        }
    }
}

/// Head-of-stream entry in the merge heap, ordered by (time, location).
struct NextEvent {
    time: u64,
    location: LocationRef,
    stream: usize,
    event: Event,
}

impl PartialEq for NextEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.location == other.location
    }
}

impl Eq for NextEvent {}

impl PartialOrd for NextEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NextEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.location.cmp(&other.location))
    }
}

pub struct Events<'a> {
    cursors: Vec<EventCursor<'a>>,
    heap: BinaryHeap<Reverse<NextEvent>>,
    pending_err: Option<Error>,
    done: bool,
}

impl Iterator for Events<'_> {
    type Item = Result<(LocationRef, Event), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(e) = self.pending_err.take() {
            self.done = true;
            return Some(Err(e));
        }
        let Reverse(head) = self.heap.pop()?;
        match self.cursors[head.stream].next_event() {
            Ok(Some(event)) => self.heap.push(Reverse(NextEvent {
                time: event.time,
                location: head.location,
                stream: head.stream,
                event,
            })),
            Ok(None) => (),
            Err(e) => self.pending_err = Some(e),
        }
        Some(Ok((head.location, head.event)))
    }
}
