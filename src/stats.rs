use std::fmt;

use crate::layout::TrackLayout;
use crate::read_group::{GroupStats, ReadGroups};
use crate::reference::ReferenceDict;

/// Whole-file report: dictionary size, skip counter, grouping outcomes.
#[derive(Debug, Clone)]
pub struct TrackStats {
    pub references: usize,
    pub skipped: u64,
    pub groups: GroupStats,
}

impl TrackStats {
    /// Gather stats for one ingested track. Forces best tags as a side
    /// effect, so the best-tagged count below is current.
    pub fn gather(groups: &mut ReadGroups, refs: &ReferenceDict, skipped: u64) -> Self {
        TrackStats {
            references: refs.len(),
            skipped,
            groups: groups.stats(),
        }
    }
}

impl fmt::Display for TrackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "references:          {}", self.references)?;
        writeln!(f, "reads:               {}", self.groups.reads)?;
        writeln!(f, "mapped records:      {}", self.groups.records)?;
        writeln!(f, "unique mappings:     {}", self.groups.unique_mappings)?;
        writeln!(f, "duplicates:          {}", self.groups.duplicates)?;
        writeln!(f, "best-tagged:         {}", self.groups.best_mappings)?;
        writeln!(f, "multi-mapped reads:  {}", self.groups.multi_mapped_reads)?;
        writeln!(f, "max group size:      {}", self.groups.max_group_size)?;
        writeln!(f, "mean group size:     {:.2}", self.groups.mean_group_size)?;
        write!(f, "skipped records:     {}", self.skipped)
    }
}

/// Shape of one stacked layout: how tall it came out and how densely the
/// rows are packed.
#[derive(Debug, Clone)]
pub struct LayoutSummary {
    pub rows: usize,
    pub blocks: usize,
    pub width: u32,
    pub mean_blocks_per_row: f64,
    /// Fraction of row cells covered by blocks.
    pub occupancy: f64,
}

impl LayoutSummary {
    pub fn of(layout: &TrackLayout) -> Self {
        let rows = layout.height();
        let blocks = layout.block_count();
        let width = layout.window.width();
        let covered: u64 = layout
            .rows()
            .iter()
            .flatten()
            .map(|block| u64::from(block.span()))
            .sum();
        let cells = u64::from(width) * rows as u64;

        LayoutSummary {
            rows,
            blocks,
            width,
            mean_blocks_per_row: if rows == 0 {
                0.0
            } else {
                blocks as f64 / rows as f64
            },
            occupancy: if cells == 0 {
                0.0
            } else {
                covered as f64 / cells as f64
            },
        }
    }
}

impl fmt::Display for LayoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "window width:        {}", self.width)?;
        writeln!(f, "rows:                {}", self.rows)?;
        writeln!(f, "blocks:              {}", self.blocks)?;
        writeln!(f, "blocks per row:      {:.2}", self.mean_blocks_per_row)?;
        write!(f, "row occupancy:       {:.1}%", self.occupancy * 100.0)
    }
}

/// Unique mappings per reference, in dictionary order.
pub fn per_reference_counts(
    groups: &mut ReadGroups,
    refs: &ReferenceDict,
) -> Vec<(String, u64)> {
    let mut counts = vec![0u64; refs.len()];
    for (_, group) in groups.iter_mut() {
        for mapping in group.mappings() {
            if let Some(slot) = counts.get_mut(mapping.ref_id as usize) {
                *slot += 1;
            }
        }
    }
    refs.names().iter().cloned().zip(counts).collect()
}
