use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};

use readstack::layout::{TrackLayout, Window};
use readstack::mapping::Mapping;
use readstack::read_group::ReadGroups;
use readstack::reference::ReferenceDict;
use readstack::sam::TrackData;
use readstack::stats::{LayoutSummary, TrackStats};

/// Parse a coordinate that may carry a metric suffix (k/K=1e3, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<u32, String> {
    if s.is_empty() {
        return Err("empty number".to_string());
    }

    let (digits, multiplier) = match s.chars().last() {
        Some('k') | Some('K') => (&s[..s.len() - 1], 1_000.0),
        Some('m') | Some('M') => (&s[..s.len() - 1], 1_000_000.0),
        Some('g') | Some('G') => (&s[..s.len() - 1], 1_000_000_000.0),
        Some(c) if c.is_ascii_alphabetic() => {
            return Err(format!("unknown suffix '{c}' (use k, m, or g)"))
        }
        _ => (s, 1.0),
    };

    let base: f64 = digits
        .parse()
        .map_err(|e| format!("invalid number: {e}"))?;
    let value = base * multiplier;

    if !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(format!("{value} does not fit a genome coordinate"));
    }

    Ok(value as u32)
}

/// A window request: reference name, optionally narrowed to FROM-TO.
#[derive(Debug, Clone)]
struct RegionSpec {
    ref_name: String,
    from: Option<u32>,
    to: Option<u32>,
}

/// Accepts "chr1" or "chr1:1k-250k". Coordinates are 1-based inclusive.
fn parse_region(s: &str) -> Result<RegionSpec, String> {
    match s.rsplit_once(':') {
        None => Ok(RegionSpec {
            ref_name: s.to_string(),
            from: None,
            to: None,
        }),
        Some((name, range)) => {
            if name.is_empty() {
                return Err("empty reference name".to_string());
            }
            let (from, to) = range
                .split_once('-')
                .ok_or_else(|| format!("range {range:?} is not FROM-TO"))?;
            let from = parse_metric_number(from)?;
            let to = parse_metric_number(to)?;
            if from == 0 || to < from {
                return Err(format!("range {range:?} is not a 1-based FROM-TO"));
            }
            Ok(RegionSpec {
                ref_name: name.to_string(),
                from: Some(from),
                to: Some(to),
            })
        }
    }
}

/// ReadStack - stack mapped reads into a pileup track
///
/// Reads SAM (plain, gzip, or bgzip), collapses duplicate mappings per read,
/// tags best matches by error count, and lays a window's blocks out into
/// non-overlapping rows.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Input SAM file (reads plain SAM from stdin if not given)
    #[clap(value_name = "SAM")]
    input: Option<String>,

    /// Window to lay out, as NAME or NAME:FROM-TO (metric suffixes ok).
    /// Defaults to the whole first reference in the file
    #[clap(short = 'r', long = "region", value_parser = parse_region)]
    region: Option<RegionSpec>,

    /// Output file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Lay out only mappings tagged as best matches
    #[clap(long = "best-only")]
    best_only: bool,

    /// Minimum empty columns between neighbors in a row
    #[clap(short = 'g', long = "spacing", default_value = "1", value_parser = parse_metric_number)]
    spacing: u32,

    /// Keep this fraction of reads (each read keeps or loses all its mappings)
    #[clap(short = 'x', long = "sample", default_value = "1.0")]
    sample: f64,

    /// Render an ASCII track this many columns wide instead of TSV
    #[clap(long = "track", value_name = "COLS")]
    track: Option<u32>,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value_t = num_cpus::get())]
    threads: usize,

    /// Quiet mode (no progress or summary output)
    #[clap(long = "quiet")]
    quiet: bool,
}

/// Per-mapping fields the layout itself does not carry, keyed by mapping id.
struct BlockInfo {
    read: String,
    errors: u32,
    repeats: u32,
    best: bool,
    reverse: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    // If no input specified and no stdin, print help
    if args.input.is_none() {
        use std::io::IsTerminal;
        if io::stdin().is_terminal() {
            use clap::CommandFactory;
            Args::command().print_help()?;
            std::process::exit(0);
        }
    }

    if !(0.0..=1.0).contains(&args.sample) {
        bail!("--sample takes a fraction between 0 and 1");
    }

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    // Progress indicator
    let progress = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message("Reading SAM records...");
        Some(pb)
    } else {
        None
    };

    // Handle input: spool stdin to a temp file so everything goes through
    // the same path-based open
    let (_stdin_spool, input_path) = match args.input {
        Some(ref path) => (None, path.clone()),
        None => {
            let mut temp = tempfile::NamedTempFile::new()?;
            io::copy(&mut io::stdin().lock(), temp.as_file_mut())?;
            let path = temp.path().to_string_lossy().into_owned();
            (Some(temp), path)
        }
    };

    let mut data = readstack::sam::read_track_path(&input_path)?;

    if args.sample < 1.0 {
        data.groups.sample(args.sample);
    }

    if let Some(ref pb) = progress {
        pb.set_message("Tagging best matches...");
    }
    data.groups.tag_all();

    let window = resolve_window(&mut data, args.region.as_ref())?;

    if let Some(ref pb) = progress {
        pb.set_message("Stacking rows...");
    }
    let (mappings, info) = collect_window(&mut data.groups, window, args.best_only);
    let layout = TrackLayout::build(&mappings, window, args.spacing);

    let mut output: Box<dyn Write> = match args.output {
        Some(ref path) => Box::new(
            File::create(path).with_context(|| format!("creating {path}"))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    match args.track {
        Some(columns) => write_ascii(&mut output, &layout, &info, columns)?,
        None => write_tsv(&mut output, &layout, &data.refs, &info)?,
    }
    output.flush()?;

    if let Some(pb) = progress {
        pb.finish_with_message("Layout complete");
    }

    if !args.quiet {
        let name = data.refs.name(window.ref_id).unwrap_or("?").to_string();
        let stats = TrackStats::gather(&mut data.groups, &data.refs, data.skipped);
        let summary = LayoutSummary::of(&layout);
        eprintln!("window:              {}:{}-{}", name, window.from, window.to);
        eprintln!("{stats}");
        eprintln!("{summary}");
    }

    Ok(())
}

/// Turn the optional region request into a concrete window. Without an
/// explicit range the window covers the whole reference: its declared
/// length if the header said, otherwise out to the last mapped base.
fn resolve_window(data: &mut TrackData, region: Option<&RegionSpec>) -> Result<Window> {
    let (ref_id, name) = match region {
        Some(spec) => match data.refs.id(&spec.ref_name) {
            Some(id) => (id, spec.ref_name.clone()),
            None => bail!("reference {:?} does not appear in the input", spec.ref_name),
        },
        None => match data.refs.name(0) {
            Some(name) => (0, name.to_string()),
            None => bail!("input has no mapped records to lay out"),
        },
    };

    if let Some((from, to)) = region.and_then(|spec| spec.from.zip(spec.to)) {
        return Ok(Window::new(ref_id, from, to));
    }

    let to = match data.refs.length(ref_id) {
        Some(length) => length,
        None => max_stop(&mut data.groups, ref_id).with_context(|| {
            format!("no header length and no mappings for {name:?}; give an explicit FROM-TO")
        })?,
    };
    Ok(Window::new(ref_id, 1, to))
}

/// Rightmost mapped base on one reference.
fn max_stop(groups: &mut ReadGroups, ref_id: u32) -> Option<u32> {
    let mut max = None;
    for (_, group) in groups.iter_mut() {
        for mapping in group.mappings() {
            if mapping.ref_id == ref_id {
                max = Some(max.map_or(mapping.stop, |cur: u32| cur.max(mapping.stop)));
            }
        }
    }
    max
}

/// Pull the window's mappings out of the groups, along with the per-mapping
/// annotations the output formats need.
fn collect_window(
    groups: &mut ReadGroups,
    window: Window,
    best_only: bool,
) -> (Vec<Mapping>, HashMap<u64, BlockInfo>) {
    let mut mappings = Vec::new();
    let mut info = HashMap::new();

    for (read, group) in groups.iter_mut() {
        for mapping in group.mappings() {
            if mapping.ref_id != window.ref_id
                || mapping.stop < window.from
                || mapping.start > window.to
            {
                continue;
            }
            if best_only && !mapping.is_best() {
                continue;
            }
            info.insert(
                mapping.id,
                BlockInfo {
                    read: read.to_string(),
                    errors: mapping.errors,
                    repeats: mapping.repeats,
                    best: mapping.is_best(),
                    reverse: mapping.is_reverse(),
                },
            );
            mappings.push(*mapping);
        }
    }

    (mappings, info)
}

fn write_tsv(
    out: &mut dyn Write,
    layout: &TrackLayout,
    refs: &ReferenceDict,
    info: &HashMap<u64, BlockInfo>,
) -> Result<()> {
    writeln!(
        out,
        "#row\tref\tstart\tstop\tread\tmapping\terrors\trepeats\tbest\tstrand\tbricks"
    )?;
    let ref_name = refs.name(layout.window.ref_id).unwrap_or("?");

    for (row_idx, row) in layout.rows().iter().enumerate() {
        for block in row {
            if let Some(meta) = info.get(&block.mapping_id) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    row_idx,
                    ref_name,
                    block.start,
                    block.stop,
                    meta.read,
                    block.mapping_id,
                    meta.errors,
                    meta.repeats,
                    meta.best as u8,
                    if meta.reverse { '-' } else { '+' },
                    block.bricks,
                )?;
            }
        }
    }
    Ok(())
}

/// Paint each row as a line of glyphs: '>' forward, '<' reverse, '.' empty.
fn write_ascii(
    out: &mut dyn Write,
    layout: &TrackLayout,
    info: &HashMap<u64, BlockInfo>,
    columns: u32,
) -> Result<()> {
    let columns = columns.max(1);
    let width = layout.window.width();
    let col = |pos: u32| -> usize {
        (u64::from(pos - layout.window.from) * u64::from(columns) / u64::from(width)) as usize
    };

    for row in layout.rows() {
        let mut line = vec![b'.'; columns as usize];
        for block in row {
            let glyph = match info.get(&block.mapping_id) {
                Some(meta) if meta.reverse => b'<',
                _ => b'>',
            };
            let lo = col(block.start);
            let hi = col(block.stop).min(columns as usize - 1);
            for cell in &mut line[lo..=hi] {
                *cell = glyph;
            }
        }
        out.write_all(&line)?;
        writeln!(out)?;
    }
    Ok(())
}
