/// stackstats - Statistics for read-stacking input (SAM)
///
/// Reports grouping and dedup outcomes without laying anything out: how
/// many reads and records came in, how many duplicate mappings collapsed,
/// how the best-match tags landed.
use anyhow::Result;
use clap::Parser;

use readstack::stats::{per_reference_counts, TrackStats};

#[derive(Parser)]
#[clap(name = "stackstats", about = "Statistics for SAM read-stacking input")]
struct Args {
    /// Alignment file (SAM; .gz and .bgz understood)
    sam: String,

    /// Show per-reference mapping counts
    #[clap(short = 'd', long = "per-reference")]
    per_reference: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut data = readstack::sam::read_track_path(&args.sam)?;
    let stats = TrackStats::gather(&mut data.groups, &data.refs, data.skipped);

    println!("=== {} ===", args.sam);
    println!("{stats}");

    if args.per_reference {
        println!();
        println!("Per-reference unique mappings:");
        for (name, count) in per_reference_counts(&mut data.groups, &data.refs) {
            println!("  {name}\t{count}");
        }
    }

    Ok(())
}
