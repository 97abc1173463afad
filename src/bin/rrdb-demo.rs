//! Demo CLI: runs a synthetic collector against a single chart for a fixed
//! number of ticks, printing the ring's last few values at the end.
//!
//! Run with:
//!     cargo run --bin rrdb-demo -- --ticks 120 --update-every 1

use clap::Parser;
use rrdb::{Algorithm, MemoryMode, RrdConfig, Rrdb};
use tracing::info;

#[derive(Parser)]
#[command(about = "Drives a synthetic incremental counter through rrdb for a fixed number of ticks")]
struct Args {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Chart cadence, in seconds.
    #[arg(long, default_value_t = 1)]
    update_every: u32,

    /// Ring depth, in slots.
    #[arg(long, default_value_t = 300)]
    entries: usize,

    /// Directory to persist the chart under; omit to stay in-memory.
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,
}

fn main() {
    #[cfg(feature = "tracing-init")]
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut config = RrdConfig::default()
        .with_default_update_every(args.update_every)
        .with_default_history_entries(args.entries);
    if let Some(dir) = args.data_dir {
        config = config.with_memory_mode(MemoryMode::Save).with_data_dir(dir);
    }

    let rrdb = Rrdb::new(config);
    let host = rrdb.find_or_create_host("demo-host", "00000000-0000-0000-0000-000000000001");
    let chart = rrdb
        .create_chart(
            &host,
            "eth0",
            "net",
            "eth0",
            "network",
            "net.net",
            "kilobits/s",
            100,
            Some(args.update_every),
            Some(args.entries),
        )
        .expect("chart creation");
    rrdb.add_dim(&host, &chart, "received", "received", Algorithm::Incremental, 8, 1000)
        .expect("dimension creation");

    let mut collected: i64 = 0;
    let update_every_usec = i64::from(args.update_every) * 1_000_000;
    for tick in 0..args.ticks {
        let now_usec = i64::try_from(tick).unwrap() * update_every_usec;
        collected += 125_000;
        chart.set("received", collected, now_usec).expect("staging sample");
        let report = rrdb.done(&chart, now_usec);
        info!(tick, slots_written = report.slots_written, "tick committed");
    }

    if let Err(e) = rrdb.save_chart(&host, &chart) {
        eprintln!("save failed: {e}");
    }

    let last = chart.grid.last_slot();
    let dim = chart.find_dim("received").expect("dimension exists");
    let (value, flags) = dim.ring().read(last).unpack();
    println!("last committed value on 'received': {value:.2} (reset={}, overflow={})", flags.reset, flags.overflow);
}
