use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use log::info;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::mapping::Mapping;
use crate::read_group::ReadGroups;
use crate::reference::ReferenceDict;

/// SAM flag bits the track cares about. Secondary and supplementary
/// records need no bit of their own; they join their read's group like
/// any other mapping.
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_REVERSE: u16 = 0x10;

/// Open a SAM text file, auto-detecting compression by extension:
/// `.gz` via gzip (which also covers bgzip members), `.bgz` via the bgzf
/// reader, anything else as plain text.
pub fn open_sam_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        Some("bgz") => Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// What one CIGAR walk tells the track: how much reference the alignment
/// covers, how many edit operations it admits to, and how many aligned
/// runs (bricks) it paints. Deletions and skips split a run; insertions
/// and clips do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarSummary {
    pub ref_span: u32,
    pub edit_ops: u32,
    pub segments: u32,
}

/// Walk a CIGAR string once, accounting for span, edits, and runs.
/// `*` (no CIGAR available) is the caller's case to handle; here it is
/// an error, as are lengths that total past `u32::MAX`. Totals run in
/// u64 so hostile inputs fail instead of wrapping.
pub fn scan_cigar(cigar: &str) -> Result<CigarSummary> {
    if cigar.is_empty() || cigar == "*" {
        bail!("record carries no CIGAR");
    }

    let mut ref_span = 0u64;
    let mut edit_ops = 0u64;
    let mut segments = 0u32;
    let mut in_run = false;
    let mut num_str = String::new();

    for ch in cigar.chars() {
        if ch.is_ascii_digit() {
            num_str.push(ch);
            continue;
        }
        let count: u32 = num_str
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid length in CIGAR {cigar:?}"))?;
        num_str.clear();
        if count == 0 {
            continue;
        }

        match ch {
            'M' | '=' => {
                ref_span += u64::from(count);
                if !in_run {
                    segments += 1;
                    in_run = true;
                }
            }
            'X' => {
                ref_span += u64::from(count);
                edit_ops += u64::from(count);
                if !in_run {
                    segments += 1;
                    in_run = true;
                }
            }
            // Insertion consumes query only; the visible run continues.
            'I' => edit_ops += u64::from(count),
            'D' => {
                ref_span += u64::from(count);
                edit_ops += u64::from(count);
                in_run = false;
            }
            // Spliced skip: spans reference but is not an edit.
            'N' => {
                ref_span += u64::from(count);
                in_run = false;
            }
            'S' | 'H' | 'P' => {}
            _ => bail!("unknown CIGAR operation {ch:?}"),
        }
    }

    if !num_str.is_empty() {
        bail!("CIGAR ends in the middle of a length: {cigar:?}");
    }
    if ref_span > u64::from(u32::MAX) || edit_ops > u64::from(u32::MAX) {
        bail!("CIGAR lengths overflow the coordinate range: {cigar:?}");
    }

    Ok(CigarSummary {
        ref_span: ref_span as u32,
        edit_ops: edit_ops as u32,
        segments,
    })
}

/// One SAM alignment line, the columns the track reads plus typed tags.
///
/// Mapping quality, mate fields, the sequence, and base qualities are
/// parsed past but not stored; the track model has no use for them.
#[derive(Debug, Clone)]
pub struct SamRecord {
    pub name: String,
    pub flags: u16,
    pub ref_name: String,
    pub pos: u32,
    pub cigar: String,
    pub tags: Vec<(String, String)>,
}

impl SamRecord {
    pub fn is_unmapped(&self) -> bool {
        (self.flags & FLAG_UNMAPPED) != 0
    }

    pub fn is_reverse(&self) -> bool {
        (self.flags & FLAG_REVERSE) != 0
    }

    /// The aligner's own edit distance, when it said.
    pub fn nm_tag(&self) -> Option<u32> {
        self.tags
            .iter()
            .find(|(key, _)| key == "NM:i")
            .and_then(|(_, val)| val.parse().ok())
    }

    /// Convert to the track's mapping representation.
    ///
    /// `NM:i` wins as the error count when present; otherwise the CIGAR's
    /// explicit edits (X + I + D) stand in, and plain `M` is never assumed
    /// to be a mismatch. Returns None for records that cover no reference
    /// bases (fully clipped) or would end past the addressable range.
    pub fn to_mapping(&self, ref_id: u32) -> Result<Option<Mapping>> {
        let summary = scan_cigar(&self.cigar)?;
        if summary.ref_span == 0 {
            return Ok(None);
        }
        let stop = u64::from(self.pos) + u64::from(summary.ref_span) - 1;
        if stop > u64::from(u32::MAX) {
            return Ok(None);
        }
        let errors = self.nm_tag().unwrap_or(summary.edit_ops);
        Ok(Some(
            Mapping::new(ref_id, self.pos, stop as u32, self.is_reverse(), errors)
                .with_segments(summary.segments),
        ))
    }
}

/// Line-oriented SAM reader: headers feed the reference dictionary,
/// unmapped and unplaced records are counted and skipped, everything else
/// comes out as a [`SamRecord`].
pub struct SamReader<R: Read> {
    reader: BufReader<R>,
    refs: ReferenceDict,
    line_no: u64,
    skipped: u64,
}

impl<R: Read> SamReader<R> {
    pub fn new(reader: R) -> Self {
        SamReader {
            reader: BufReader::new(reader),
            refs: ReferenceDict::new(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Next mapped record, or None at end of input.
    pub fn read_record(&mut self) -> Result<Option<SamRecord>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('@') {
                self.scan_header(header);
                continue;
            }

            let record = self
                .parse_sam_line(line)
                .with_context(|| format!("SAM line {}", self.line_no))?;
            if record.is_unmapped()
                || record.pos == 0
                || record.ref_name == "*"
                || record.cigar == "*"
            {
                self.skipped += 1;
                continue;
            }
            return Ok(Some(record));
        }
    }

    /// References declared or encountered so far.
    pub fn refs(&self) -> &ReferenceDict {
        &self.refs
    }

    pub fn refs_mut(&mut self) -> &mut ReferenceDict {
        &mut self.refs
    }

    pub fn into_refs(self) -> ReferenceDict {
        self.refs
    }

    /// Records skipped so far (unmapped, unplaced, or CIGAR-less).
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// `@SQ` lines carry the reference dictionary; other header kinds have
    /// nothing the track needs.
    fn scan_header(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("SQ\t") {
            let mut name = None;
            let mut length = None;
            for field in rest.split('\t') {
                if let Some(sn) = field.strip_prefix("SN:") {
                    name = Some(sn);
                } else if let Some(ln) = field.strip_prefix("LN:") {
                    length = ln.parse::<u32>().ok();
                }
            }
            if let Some(name) = name {
                self.refs.declare(name, length);
            }
        }
    }

    fn parse_sam_line(&self, line: &str) -> Result<SamRecord> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 11 {
            bail!("SAM line has fewer than 11 required fields");
        }

        // fields 4 and 6-10 (MAPQ, mate, template length, sequence, base
        // qualities) go unread
        let mut record = SamRecord {
            name: fields[0].to_string(),
            flags: fields[1].parse().context("FLAG column")?,
            ref_name: fields[2].to_string(),
            pos: fields[3].parse().context("POS column")?,
            cigar: fields[5].to_string(),
            tags: Vec::new(),
        };

        for field in &fields[11..] {
            if let Some((tag, rest)) = field.split_once(':') {
                if let Some((typ, val)) = rest.split_once(':') {
                    record.tags.push((format!("{tag}:{typ}"), val.to_string()));
                }
            }
        }

        Ok(record)
    }
}

/// Everything ingested from one SAM stream.
#[derive(Debug, Default)]
pub struct TrackData {
    pub groups: ReadGroups,
    pub refs: ReferenceDict,
    /// Mapped records accepted into groups.
    pub records: u64,
    /// Unmapped, unplaced, or unalignable records left behind.
    pub skipped: u64,
}

/// Read a whole SAM stream into per-read mapping groups.
pub fn read_track<R: Read>(input: R) -> Result<TrackData> {
    let mut reader = SamReader::new(input);
    let mut groups = ReadGroups::new();
    let mut records = 0u64;
    let mut unalignable = 0u64;

    while let Some(record) = reader.read_record()? {
        let ref_id = reader.refs_mut().get_or_insert(&record.ref_name);
        let mapping = record
            .to_mapping(ref_id)
            .with_context(|| format!("SAM line {}", reader.line_no()))?;
        match mapping {
            Some(mapping) => {
                groups.insert_record(&record.name, mapping);
                records += 1;
            }
            None => unalignable += 1,
        }
    }

    let skipped = reader.skipped() + unalignable;
    info!(
        "ingested {} mapped records across {} reads ({} skipped)",
        records,
        groups.len(),
        skipped
    );

    Ok(TrackData {
        groups,
        refs: reader.into_refs(),
        records,
        skipped,
    })
}

/// Read a SAM file (auto-detects compression).
pub fn read_track_path<P: AsRef<Path>>(path: P) -> Result<TrackData> {
    let input = open_sam_input(&path)?;
    read_track(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_cigar_plain_match() {
        let summary = scan_cigar("100M").unwrap();
        assert_eq!(summary.ref_span, 100);
        assert_eq!(summary.edit_ops, 0);
        assert_eq!(summary.segments, 1);
    }

    #[test]
    fn test_scan_cigar_extended_ops() {
        // 5 matches, 2 mismatches, 3 matches: one run, 2 edits.
        let summary = scan_cigar("5=2X3=").unwrap();
        assert_eq!(summary.ref_span, 10);
        assert_eq!(summary.edit_ops, 2);
        assert_eq!(summary.segments, 1);
    }

    #[test]
    fn test_scan_cigar_deletion_splits_run() {
        let summary = scan_cigar("10M2D5M").unwrap();
        assert_eq!(summary.ref_span, 17);
        assert_eq!(summary.edit_ops, 2);
        assert_eq!(summary.segments, 2);
    }

    #[test]
    fn test_scan_cigar_insertion_keeps_run() {
        let summary = scan_cigar("10M2I5M").unwrap();
        assert_eq!(summary.ref_span, 15);
        assert_eq!(summary.edit_ops, 2);
        assert_eq!(summary.segments, 1);
    }

    #[test]
    fn test_scan_cigar_skip_splits_without_edits() {
        let summary = scan_cigar("10M200N10M").unwrap();
        assert_eq!(summary.ref_span, 220);
        assert_eq!(summary.edit_ops, 0);
        assert_eq!(summary.segments, 2);
    }

    #[test]
    fn test_scan_cigar_clips_are_invisible() {
        let summary = scan_cigar("5S10M3H").unwrap();
        assert_eq!(summary.ref_span, 10);
        assert_eq!(summary.segments, 1);
    }

    #[test]
    fn test_scan_cigar_rejects_garbage() {
        assert!(scan_cigar("*").is_err());
        assert!(scan_cigar("").is_err());
        assert!(scan_cigar("10Q").is_err());
        assert!(scan_cigar("10M5").is_err());
        assert!(scan_cigar("M").is_err());
    }

    #[test]
    fn test_scan_cigar_rejects_oversized_totals() {
        // Each length fits a u32 on its own; the running totals do not.
        assert!(scan_cigar("4000000000M1000000000D").is_err());
        assert!(scan_cigar("4000000000I1000000000I").is_err());

        // The largest representable span still parses.
        let summary = scan_cigar("4294967295M").unwrap();
        assert_eq!(summary.ref_span, u32::MAX);
        assert_eq!(summary.segments, 1);
    }
}
