#![deny(warnings, clippy::all)]

use clap::Parser;
use otf2csv::{prelude::*, tracing::try_init_tracing_subscriber};
use std::path::PathBuf;
use tracing::info;

/// Generate a synthetic OTF2 trace archive for testing and demos
#[derive(Parser, Debug, Clone)]
#[clap(version)]
pub struct Opts {
    /// Number of ranks (one location each) to generate
    #[clap(long, default_value_t = 2, help_heading = "GENERATOR CONFIGURATION")]
    pub ranks: u32,

    /// Number of compute iterations per rank
    #[clap(long, default_value_t = 64, help_heading = "GENERATOR CONFIGURATION")]
    pub iterations: u32,

    /// Seed for the timing jitter generator
    #[clap(long, default_value_t = 1, help_heading = "GENERATOR CONFIGURATION")]
    pub seed: u64,

    /// Set the log level
    #[clap(
        long,
        value_enum,
        default_value_t = LogLevel::Info,
        help_heading = "GENERATOR CONFIGURATION"
    )]
    pub log: LogLevel,

    /// Directory to create the archive in
    #[clap(name = "output-dir", help_heading = "GENERATOR CONFIGURATION")]
    pub output_dir: PathBuf,
}

// Linear congruential generator; deterministic per seed so generated
// archives are reproducible
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn gen_range(&mut self, min: u64, max: u64) -> u64 {
        min + self.next_u64() % (max - min)
    }
}

fn main() {
    match do_main() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("{e}");
            let mut cause = e.source();
            while let Some(err) = cause {
                eprintln!("Caused by: {err}");
                cause = err.source();
            }
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}

fn do_main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    try_init_tracing_subscriber(opts.log)?;

    let mut rng = SimpleRng::new(opts.seed);
    let mut w = ArchiveWriter::new(&opts.output_dir);

    let main_region = w.region("main", RegionRole::Function);
    let compute = w.region("compute", RegionRole::Function);
    let checkpoint = w.region("write_checkpoint", RegionRole::FileIo);
    let iteration_attr = w.attribute("Iteration", AttrKind::Uint64);
    let stdout_handle = w.io_handle("stdout", None);

    let mut span = 0u64;
    for rank in 0..opts.ranks {
        let group = w.location_group(&format!("Rank {rank}"), LocationGroupKind::Process);
        let loc = w.location("Master thread", LocationKind::CpuThread, group);
        let file = w.io_file(&format!("checkpoint_{rank}.dat"));
        let handle = w.io_handle(&format!("fd {rank}"), Some(file));

        let mut t = rng.gen_range(1, 100);
        w.event(loc, t, EventKind::Enter { region: main_region }, &[])?;

        for i in 0..opts.iterations {
            t += rng.gen_range(1, 50);
            w.event(
                loc,
                t,
                EventKind::Enter { region: compute },
                &[(iteration_attr, AttrValue::Uint64(u64::from(i)))],
            )?;
            if opts.ranks > 1 && i % 8 == 0 {
                t += rng.gen_range(1, 10);
                w.event(
                    loc,
                    t,
                    EventKind::MpiSend {
                        receiver: (rank + 1) % opts.ranks,
                        communicator: 0,
                        tag: i,
                        bytes: 1024,
                    },
                    &[],
                )?;
            }
            t += rng.gen_range(1, 50);
            w.event(loc, t, EventKind::Leave { region: compute }, &[])?;
        }

        // One checkpoint burst per rank: seek/write blocks through a
        // file-backed handle, then a goodbye on the bare stdout handle
        t += rng.gen_range(1, 50);
        w.event(loc, t, EventKind::Enter { region: checkpoint }, &[])?;
        t += 1;
        w.event(
            loc,
            t,
            EventKind::IoCreateHandle {
                handle,
                mode: IoAccessMode::WriteOnly,
                creation_flags: IoCreationFlags::CREAT | IoCreationFlags::TRUNC,
                status_flags: IoStatusFlags::NONE,
            },
            &[],
        )?;
        let block_bytes = 4096u64;
        for block in 0..4u64 {
            t += rng.gen_range(1, 10);
            w.event(
                loc,
                t,
                EventKind::IoSeek {
                    handle,
                    offset_request: (block * block_bytes) as i64,
                    whence: IoSeekWhence::Set,
                    offset_result: block * block_bytes,
                },
                &[],
            )?;
            t += 1;
            w.event(
                loc,
                t,
                EventKind::IoOperationBegin {
                    handle,
                    mode: IoOperationMode::Write,
                    bytes_request: block_bytes,
                    matching_id: block,
                },
                &[],
            )?;
            t += rng.gen_range(1, 20);
            w.event(
                loc,
                t,
                EventKind::IoOperationComplete {
                    handle,
                    bytes_result: block_bytes,
                    matching_id: block,
                },
                &[],
            )?;
        }
        t += 1;
        w.event(loc, t, EventKind::IoDestroyHandle { handle }, &[])?;
        t += 1;
        w.event(loc, t, EventKind::Leave { region: checkpoint }, &[])?;

        t += 1;
        w.event(
            loc,
            t,
            EventKind::IoOperationBegin {
                handle: stdout_handle,
                mode: IoOperationMode::Write,
                bytes_request: 13,
                matching_id: u64::from(rank) << 32,
            },
            &[],
        )?;
        t += 1;
        w.event(
            loc,
            t,
            EventKind::IoOperationComplete {
                handle: stdout_handle,
                bytes_result: 13,
                matching_id: u64::from(rank) << 32,
            },
            &[],
        )?;
        t += 1;
        w.event(loc, t, EventKind::Leave { region: main_region }, &[])?;

        span = span.max(t);
    }

    w.clock_properties(1_000_000_000, 0, span);
    let events = w.event_count();
    let anchor = w.finish()?;
    info!(
        events,
        ranks = opts.ranks,
        anchor = %anchor.display(),
        "generated trace archive"
    );

    Ok(())
}
