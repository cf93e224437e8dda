use otf2csv::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};

/// Two ranks with interleaved timestamps, a file-backed I/O handle, and a
/// bare one. Covers every column and the tie-break between locations.
fn write_fixture(dir: &Path) -> PathBuf {
    let mut w = ArchiveWriter::new(dir);

    let group0 = w.location_group("Rank 0", LocationGroupKind::Process);
    let loc0 = w.location("Master thread", LocationKind::CpuThread, group0);
    let group1 = w.location_group("Rank 1", LocationGroupKind::Process);
    let loc1 = w.location("Worker", LocationKind::CpuThread, group1);

    let main_region = w.region("main", RegionRole::Function);
    let priority = w.attribute("Priority", AttrKind::Uint64);
    let data_file = w.io_file("data.bin");
    let backed = w.io_handle("checkpoint", Some(data_file));
    let bare = w.io_handle("fd3", None);

    w.event(loc0, 5, EventKind::Enter { region: main_region }, &[])
        .unwrap();
    w.event(
        loc0,
        100,
        EventKind::IoSeek {
            handle: backed,
            offset_request: 50,
            whence: IoSeekWhence::Set,
            offset_result: 50,
        },
        &[],
    )
    .unwrap();
    w.event(
        loc0,
        120,
        EventKind::IoCreateHandle {
            handle: backed,
            mode: IoAccessMode::ReadWrite,
            creation_flags: IoCreationFlags::CREAT | IoCreationFlags::TRUNC,
            status_flags: IoStatusFlags::NONE,
        },
        &[(priority, AttrValue::Uint64(7))],
    )
    .unwrap();
    w.event(loc0, 200, EventKind::Leave { region: main_region }, &[])
        .unwrap();

    w.event(
        loc1,
        5,
        EventKind::MpiRecv {
            sender: 0,
            communicator: 0,
            tag: 9,
            bytes: 64,
        },
        &[(priority, AttrValue::Uint64(3))],
    )
    .unwrap();
    w.event(
        loc1,
        150,
        EventKind::IoOperationBegin {
            handle: bare,
            mode: IoOperationMode::Read,
            bytes_request: 512,
            matching_id: 1,
        },
        &[],
    )
    .unwrap();

    w.finish().unwrap()
}

const EXPECTED: &str = "\
Timestamp,EventType,Region,Rank,Attributes
5,Enter,main,Rank 0,{}
5,MpiRecv,,Rank 1,{priority: 3}
100,IoSeek,,Rank 0,\"{offset_request: 50, offset_result: 50, whence: SET, handle: data.bin}\"
120,IoCreateHandle,,Rank 0,\"{priority: 7, mode: READ_WRITE, creation_flags: CREAT|TRUNC, status_flags: NONE, handle: data.bin}\"
150,IoOperationBegin,,Rank 1,\"{bytes_request: 512, handle: fd3}\"
200,Leave,main,Rank 0,{}
";

#[test]
fn exports_one_row_per_event_in_merged_time_order() {
    let dir = tempfile::tempdir().unwrap();
    let anchor = write_fixture(dir.path());
    let out = dir.path().join("trace.csv");

    let rows = otf2_to_csv(&anchor, &out).unwrap();
    assert_eq!(rows, 6);
    assert_eq!(fs::read_to_string(&out).unwrap(), EXPECTED);
}

#[test]
fn reexport_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let anchor = write_fixture(dir.path());
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    otf2_to_csv(&anchor, &first).unwrap();
    otf2_to_csv(&anchor, &second).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn existing_output_is_truncated() {
    let dir = tempfile::tempdir().unwrap();
    let anchor = write_fixture(dir.path());
    let out = dir.path().join("trace.csv");
    fs::write(&out, "stale junk from a previous run\n").unwrap();

    otf2_to_csv(&anchor, &out).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), EXPECTED);
}

#[test]
fn missing_trace_fails_without_creating_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("trace.csv");

    let result = otf2_to_csv(dir.path().join("nope.otf2"), &out);
    assert!(matches!(result, Err(Error::ReadFile { .. })));
    assert!(!out.exists());
}

#[test]
fn reader_merges_locations_by_time_then_location_id() {
    let dir = tempfile::tempdir().unwrap();
    let anchor = write_fixture(dir.path());

    let reader = TraceReader::open(&anchor).unwrap();
    let pairs: Vec<(LocationRef, Event)> = reader
        .events()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pairs.len(), 6);
    let times: Vec<u64> = pairs.iter().map(|(_, e)| e.time).collect();
    assert_eq!(times, vec![5, 5, 100, 120, 150, 200]);
    // Equal timestamps resolve in location-id order
    assert_eq!(pairs[0].0, LocationRef(0));
    assert_eq!(pairs[1].0, LocationRef(1));
}
