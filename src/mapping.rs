/// One alignment of a read against a reference sequence.
///
/// Compact on purpose: a track view routinely holds hundreds of thousands
/// of these. Coordinates are 1-based and inclusive in reference space,
/// matching SAM POS. The `id` is unique across a whole track and is what
/// block ordering falls back to when coordinates tie.
#[derive(Debug, Clone, Copy)]
pub struct Mapping {
    pub id: u64,       // track-wide unique id, assigned on ingestion
    pub ref_id: u32,   // reference sequence id (see ReferenceDict)
    pub start: u32,    // leftmost reference position covered
    pub stop: u32,     // rightmost reference position covered
    pub errors: u32,   // edit distance to the reference
    pub repeats: u32,  // raw records collapsed into this mapping
    pub segments: u32, // aligned runs; deletions and skips split a run
    pub flags: u8,     // bit-packed flags (strand, best)
}

impl Mapping {
    pub const FLAG_REVERSE: u8 = 0x01;
    pub const FLAG_BEST: u8 = 0x02;

    pub fn new(ref_id: u32, start: u32, stop: u32, reverse: bool, errors: u32) -> Self {
        let mut mapping = Mapping {
            id: 0,
            ref_id,
            start,
            stop,
            errors,
            repeats: 1,
            segments: 1,
            flags: 0,
        };
        mapping.set_reverse(reverse);
        mapping
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn with_segments(mut self, segments: u32) -> Self {
        self.segments = segments;
        self
    }

    pub fn is_reverse(&self) -> bool {
        (self.flags & Self::FLAG_REVERSE) != 0
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        if reverse {
            self.flags |= Self::FLAG_REVERSE;
        } else {
            self.flags &= !Self::FLAG_REVERSE;
        }
    }

    pub fn is_best(&self) -> bool {
        (self.flags & Self::FLAG_BEST) != 0
    }

    pub fn set_best(&mut self, best: bool) {
        if best {
            self.flags |= Self::FLAG_BEST;
        } else {
            self.flags &= !Self::FLAG_BEST;
        }
    }

    /// Reference bases covered, inclusive of both ends.
    pub fn span(&self) -> u32 {
        self.stop - self.start + 1
    }

    /// The identity used for deduplication: where the read landed and in
    /// which orientation. Error counts and ids deliberately play no part.
    pub fn key(&self) -> MappingKey {
        MappingKey {
            ref_id: self.ref_id,
            start: self.start,
            stop: self.stop,
            reverse: self.is_reverse(),
        }
    }
}

/// Alignment identity for grouping duplicate records of one read.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct MappingKey {
    pub ref_id: u32,
    pub start: u32,
    pub stop: u32,
    pub reverse: bool,
}
