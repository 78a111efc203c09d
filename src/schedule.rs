/// Position-ordered block storage drained left to right by a renderer.
use std::collections::{BTreeMap, BTreeSet};

use crate::block::Block;

/// Two-level ordered container: a map keyed by start position, each key
/// holding the blocks that share it in (start, stop, mapping id) order.
///
/// Built once per render pass and consumed by a sweep that repeatedly asks
/// for the next block at or after its cursor. Per-key sets are pruned the
/// moment they empty, so an exhausted schedule is recognizable in O(1).
#[derive(Debug, Default)]
pub struct BlockSchedule {
    by_start: BTreeMap<u32, BTreeSet<Block>>,
    len: usize,
}

impl BlockSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block. Blocks identical in (start, stop, mapping id)
    /// collapse to one entry; distinct mapping ids at the same coordinates
    /// stay distinct.
    pub fn insert(&mut self, block: Block) {
        if self.by_start.entry(block.start).or_default().insert(block) {
            self.len += 1;
        }
    }

    /// Remove and return the lowest-ordered block whose start is at or
    /// after `pos`. Returns None when nothing qualifies, an empty schedule
    /// included; that is a normal condition, not an error.
    pub fn next_at_or_after(&mut self, pos: u32) -> Option<Block> {
        let (&start, set) = self.by_start.range_mut(pos..).next()?;
        let block = set.pop_first()?;
        if set.is_empty() {
            self.by_start.remove(&start);
        }
        self.len -= 1;
        Some(block)
    }

    /// True once every block has been drained (or none were added).
    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    /// Blocks still waiting to be drained.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Extend<Block> for BlockSchedule {
    fn extend<T: IntoIterator<Item = Block>>(&mut self, iter: T) {
        for block in iter {
            self.insert(block);
        }
    }
}
