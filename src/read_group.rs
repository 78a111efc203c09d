/// Per-read deduplication and best-mapping bookkeeping.
use indexmap::IndexMap;
use log::debug;
use rand::Rng;
use rayon::prelude::*;

use crate::mapping::{Mapping, MappingKey};

/// The unique mappings of one read, keyed by alignment identity.
///
/// Duplicate records (same reference, coordinates, and orientation) fold
/// into the existing entry's repeat counter. The minimum error count is
/// maintained on insert; the per-mapping best tags are refreshed lazily,
/// only when the mappings are actually read, so a long run of inserts
/// never pays for retagging.
#[derive(Debug, Clone, Default)]
pub struct MappingGroup {
    mappings: IndexMap<MappingKey, Mapping>,
    min_errors: Option<u32>,
    stale: bool,
}

impl MappingGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one alignment record.
    ///
    /// An identical alignment bumps the existing entry's repeat counter and
    /// the newcomer is dropped (its id with it). A new alignment is stored,
    /// lowers the tracked minimum if it beats it, and marks the best tags
    /// stale. Collapsing a duplicate leaves membership and error counts
    /// untouched, so it does not invalidate the tags.
    pub fn insert(&mut self, mapping: Mapping) {
        if let Some(existing) = self.mappings.get_mut(&mapping.key()) {
            existing.repeats += 1;
            return;
        }
        match self.min_errors {
            Some(min) if mapping.errors >= min => {}
            _ => self.min_errors = Some(mapping.errors),
        }
        self.mappings.insert(mapping.key(), mapping);
        self.stale = true;
    }

    /// Refresh the best tags if inserts happened since the last read.
    /// Best means: error count equal to the group minimum. Ties all get
    /// the tag; best is not unique.
    pub fn tag_best(&mut self) {
        if !self.stale {
            return;
        }
        // stale is only ever set by an insert, so the group is non-empty
        let min = self.min_errors.unwrap_or(u32::MAX);
        for mapping in self.mappings.values_mut() {
            mapping.set_best(mapping.errors == min);
        }
        self.stale = false;
    }

    /// All unique mappings of this read, best tags up to date.
    ///
    /// Yields in insertion order; callers must not read meaning into it.
    pub fn mappings(&mut self) -> impl Iterator<Item = &Mapping> + '_ {
        self.tag_best();
        self.mappings.values()
    }

    /// Only the mappings at the group's minimum error count.
    pub fn best_mappings(&mut self) -> impl Iterator<Item = &Mapping> + '_ {
        self.tag_best();
        self.mappings.values().filter(|m| m.is_best())
    }

    /// Minimum error count across the group, None while empty.
    pub fn min_errors(&self) -> Option<u32> {
        self.min_errors
    }

    /// Number of unique mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Raw records folded into this group (sum of repeat counters).
    pub fn record_count(&self) -> u64 {
        self.mappings.values().map(|m| u64::from(m.repeats)).sum()
    }
}

/// Per-read grouping for a whole track.
///
/// Routes records to their read's group and assigns every accepted mapping
/// a track-wide id from a monotone counter, which keeps the block
/// comparator a strict total order. Ids burned on collapsed duplicates
/// leave gaps; nothing downstream needs density.
#[derive(Debug, Default)]
pub struct ReadGroups {
    groups: IndexMap<String, MappingGroup>,
    next_id: u64,
}

impl ReadGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one alignment record to its read's group.
    pub fn insert_record(&mut self, read_name: &str, mapping: Mapping) {
        let id = self.next_id;
        self.next_id += 1;
        self.groups
            .entry(read_name.to_string())
            .or_default()
            .insert(mapping.with_id(id));
    }

    /// Force best tags on every group, in parallel. Groups are disjoint,
    /// so each is mutated by exactly one rayon task.
    pub fn tag_all(&mut self) {
        self.groups
            .par_iter_mut()
            .for_each(|(_, group)| group.tag_best());
    }

    /// Keep each read with probability `fraction`; used to thin very deep
    /// tracks before layout. Whole reads are kept or dropped so dedup and
    /// best semantics are unaffected.
    pub fn sample(&mut self, fraction: f64) {
        if fraction >= 1.0 {
            return;
        }
        let mut rng = rand::thread_rng();
        let before = self.groups.len();
        self.groups.retain(|_, _| rng.gen::<f64>() < fraction);
        debug!("sampled {} of {} reads", self.groups.len(), before);
    }

    pub fn get_mut(&mut self, read_name: &str) -> Option<&mut MappingGroup> {
        self.groups.get_mut(read_name)
    }

    /// Iterate reads in first-seen order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut MappingGroup)> {
        self.groups.iter_mut().map(|(name, g)| (name.as_str(), g))
    }

    /// Number of reads.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Unique mappings across all reads.
    pub fn num_mappings(&self) -> usize {
        self.groups.values().map(|g| g.len()).sum()
    }

    /// Raw records across all reads.
    pub fn num_records(&self) -> u64 {
        self.groups.values().map(|g| g.record_count()).sum()
    }

    /// Summarize grouping and dedup outcomes. Forces best tags first.
    pub fn stats(&mut self) -> GroupStats {
        self.tag_all();

        let group_sizes: Vec<usize> = self.groups.values().map(|g| g.len()).collect();
        let unique: usize = group_sizes.iter().sum();
        let records = self.num_records();
        let best = self
            .groups
            .values()
            .flat_map(|g| g.mappings.values())
            .filter(|m| m.is_best())
            .count();
        let multi_mapped = group_sizes.iter().filter(|&&n| n > 1).count();
        let max = group_sizes.iter().max().copied().unwrap_or(0);
        let mean = if group_sizes.is_empty() {
            0.0
        } else {
            unique as f64 / group_sizes.len() as f64
        };

        GroupStats {
            reads: self.groups.len(),
            unique_mappings: unique,
            records,
            duplicates: records - unique as u64,
            best_mappings: best,
            multi_mapped_reads: multi_mapped,
            max_group_size: max,
            mean_group_size: mean,
        }
    }
}

/// Grouping and dedup outcomes for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub reads: usize,
    pub unique_mappings: usize,
    pub records: u64,
    pub duplicates: u64,
    pub best_mappings: usize,
    pub multi_mapped_reads: usize,
    pub max_group_size: usize,
    pub mean_group_size: f64,
}
