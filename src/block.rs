use std::cmp::Ordering;

/// One renderable alignment segment inside a track window.
///
/// Carries absolute (window-clamped) coordinates, the id of the mapping it
/// visualizes, and how many bricks (aligned sub-segments) the renderer
/// will paint for it. Identity and ordering are the triple
/// (start, stop, mapping id), all ascending; the id breaks coordinate ties
/// so coincident blocks still have a strict total order. `bricks` is
/// presentation payload and takes no part in identity.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub start: u32,
    pub stop: u32,
    pub mapping_id: u64,
    pub bricks: u32,
}

impl Block {
    pub fn new(start: u32, stop: u32, mapping_id: u64, bricks: u32) -> Self {
        Block {
            start,
            stop,
            mapping_id,
            bricks,
        }
    }

    /// Reference bases covered, inclusive of both ends.
    pub fn span(&self) -> u32 {
        self.stop - self.start + 1
    }
}

impl Ord for Block {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.stop.cmp(&other.stop))
            .then_with(|| self.mapping_id.cmp(&other.mapping_id))
    }
}

impl PartialOrd for Block {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Block {}
