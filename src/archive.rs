//! On-disk archive layout and the anchor file.
//!
//! An archive is anchored by a `.otf2` file; its sibling files are derived
//! from the anchor's stem, Score-P style:
//!
//! ```text
//! <dir>/traces.otf2          anchor
//! <dir>/traces.def           global definitions
//! <dir>/traces/<location>.evt   per-location event records
//! ```

use crate::decode::{ByteReader, ByteWriter};
use crate::error::Error;
use crate::types::LocationRef;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub(crate) const ANCHOR_MAGIC: &[u8] = b"OTF2ARCH";
pub(crate) const DEFS_MAGIC: &[u8] = b"OTF2DEFS";
pub(crate) const EVENTS_MAGIC: &[u8] = b"OTF2EVTS";
pub(crate) const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveLayout {
    anchor: PathBuf,
    defs: PathBuf,
    events_dir: PathBuf,
}

impl ArchiveLayout {
    pub fn from_anchor_path(anchor: &Path) -> Result<Self, Error> {
        let stem = anchor
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::NotAnAnchor(anchor.to_path_buf()))?;
        let dir = anchor.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(ArchiveLayout {
            anchor: anchor.to_path_buf(),
            defs: dir.join(format!("{stem}.def")),
            events_dir: dir.join(stem),
        })
    }

    pub fn anchor_path(&self) -> &Path {
        &self.anchor
    }

    pub fn defs_path(&self) -> &Path {
        &self.defs
    }

    pub fn event_file(&self, location: LocationRef) -> PathBuf {
        self.events_dir.join(format!("{location}.evt"))
    }

    pub fn events_dir(&self) -> &Path {
        &self.events_dir
    }
}

/// Contents of the anchor file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub trace_id: Uuid,
    pub location_count: u64,
}

impl Anchor {
    pub fn read(path: &Path) -> Result<Self, Error> {
        let buf = fs::read(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut r = ByteReader::new(&buf);
        let magic = r
            .read_bytes(ANCHOR_MAGIC.len())
            .map_err(|_| Error::NotAnAnchor(path.to_path_buf()))?;
        if magic != ANCHOR_MAGIC {
            return Err(Error::NotAnAnchor(path.to_path_buf()));
        }
        let version = r.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedFormatVersion(version));
        }
        let mut id = [0u8; 16];
        id.copy_from_slice(r.read_bytes(16)?);
        let location_count = r.read_u64()?;
        Ok(Anchor {
            trace_id: Uuid::from_bytes(id),
            location_count,
        })
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_bytes(ANCHOR_MAGIC);
        w.write_u32(FORMAT_VERSION);
        w.write_bytes(self.trace_id.as_bytes());
        w.write_u64(self.location_count);
        w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn layout_paths_derive_from_the_anchor_stem() {
        let layout = ArchiveLayout::from_anchor_path(Path::new("/tmp/run1/traces.otf2")).unwrap();
        assert_eq!(layout.defs_path(), Path::new("/tmp/run1/traces.def"));
        assert_eq!(
            layout.event_file(LocationRef(3)),
            PathBuf::from("/tmp/run1/traces/3.evt")
        );
    }

    #[test]
    fn anchor_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.otf2");
        let anchor = Anchor {
            trace_id: Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0),
            location_count: 4,
        };
        fs::write(&path, anchor.encode()).unwrap();
        assert_eq!(Anchor::read(&path).unwrap(), anchor);
    }

    #[test]
    fn garbage_is_not_an_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.otf2");
        fs::write(&path, b"definitely not a trace").unwrap();
        assert!(matches!(
            Anchor::read(&path),
            Err(Error::NotAnAnchor(_))
        ));
    }
}
