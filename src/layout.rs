/// Track layout: clamp visible mappings into blocks and stack the blocks
/// into non-overlapping rows by a left-to-right sweep.
use log::debug;

use crate::block::Block;
use crate::mapping::Mapping;
use crate::schedule::BlockSchedule;

/// The visible reference interval of one track view, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub ref_id: u32,
    pub from: u32,
    pub to: u32,
}

impl Window {
    pub fn new(ref_id: u32, from: u32, to: u32) -> Self {
        Window { ref_id, from, to }
    }

    pub fn width(&self) -> u32 {
        self.to - self.from + 1
    }
}

/// Clamp a mapping to the window, yielding the block that will represent
/// it. A mapping on another reference or entirely outside the window has
/// nothing to render. The brick count carries the mapping's aligned
/// sub-segment count through to the renderer.
pub fn clamp_to_window(mapping: &Mapping, window: Window) -> Option<Block> {
    if mapping.ref_id != window.ref_id
        || mapping.stop < window.from
        || mapping.start > window.to
    {
        return None;
    }
    let start = mapping.start.max(window.from);
    let stop = mapping.stop.min(window.to);
    Some(Block::new(start, stop, mapping.id, mapping.segments))
}

/// One block per mapping overlapping the window.
pub fn build_schedule<'a, I>(mappings: I, window: Window) -> BlockSchedule
where
    I: IntoIterator<Item = &'a Mapping>,
{
    let mut schedule = BlockSchedule::new();
    for mapping in mappings {
        if let Some(block) = clamp_to_window(mapping, window) {
            schedule.insert(block);
        }
    }
    schedule
}

/// Drain the schedule into rows of non-overlapping blocks.
///
/// Each row opens with the cursor at zero and greedily takes the next
/// block at or after the cursor, then advances past the block plus
/// `spacing` bases. A row closes when no remaining block fits; the pass
/// ends when the schedule is drained. Every block is placed exactly once.
pub fn stack_rows(schedule: &mut BlockSchedule, spacing: u32) -> Vec<Vec<Block>> {
    let mut rows = Vec::new();
    while !schedule.is_empty() {
        let mut row = Vec::new();
        let mut cursor = 0u32;
        while let Some(block) = schedule.next_at_or_after(cursor) {
            let next = u64::from(block.stop) + 1 + u64::from(spacing);
            row.push(block);
            if next > u64::from(u32::MAX) {
                // Nothing can start after this block; the row is done.
                break;
            }
            cursor = next as u32;
        }
        rows.push(row);
    }
    rows
}

/// A fully stacked track view: the window, the spacing the rows honor,
/// and the rows themselves, top to bottom.
#[derive(Debug)]
pub struct TrackLayout {
    pub window: Window,
    pub spacing: u32,
    rows: Vec<Vec<Block>>,
}

impl TrackLayout {
    /// Build the layout for a window from the mappings of a track.
    pub fn build<'a, I>(mappings: I, window: Window, spacing: u32) -> Self
    where
        I: IntoIterator<Item = &'a Mapping>,
    {
        let mut schedule = build_schedule(mappings, window);
        let visible = schedule.len();
        let rows = stack_rows(&mut schedule, spacing);
        debug!(
            "window {}..{} (ref {}): {} blocks stacked into {} rows",
            window.from,
            window.to,
            window.ref_id,
            visible,
            rows.len()
        );
        TrackLayout {
            window,
            spacing,
            rows,
        }
    }

    pub fn rows(&self) -> &[Vec<Block>] {
        &self.rows
    }

    /// Number of rows the view needs.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Blocks across all rows.
    pub fn block_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }
}
