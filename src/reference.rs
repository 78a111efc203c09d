/// Reference sequence dictionary for a track.
///
/// Interns reference names to compact u32 ids so mappings never carry
/// strings, and keeps the sequence lengths announced by `@SQ` header lines
/// (unknown when the input has no header).
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ReferenceDict {
    /// All reference names; the id is the index in this vec.
    names: Vec<String>,
    /// Declared lengths, parallel to `names`. None until an `@SQ` says.
    lengths: Vec<Option<u32>>,
    /// Name to id for fast lookup.
    name_to_id: HashMap<String, u32>,
}

impl ReferenceDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the id for a reference name.
    pub fn get_or_insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            id
        } else {
            let id = self.names.len() as u32;
            self.names.push(name.to_string());
            self.lengths.push(None);
            self.name_to_id.insert(name.to_string(), id);
            id
        }
    }

    /// Register a reference from an `@SQ` header line. A length declared
    /// for an already-known name fills in or replaces the stored length.
    pub fn declare(&mut self, name: &str, length: Option<u32>) -> u32 {
        let id = self.get_or_insert(name);
        if length.is_some() {
            self.lengths[id as usize] = length;
        }
        id
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_str())
    }

    pub fn length(&self, id: u32) -> Option<u32> {
        self.lengths.get(id as usize).copied().flatten()
    }

    /// Number of known references.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let mut dict = ReferenceDict::new();

        let id1 = dict.get_or_insert("chr1");
        assert_eq!(id1, 0);
        assert_eq!(dict.get_or_insert("chr1"), 0);

        let id2 = dict.get_or_insert("chr2");
        assert_eq!(id2, 1);

        assert_eq!(dict.name(0), Some("chr1"));
        assert_eq!(dict.name(1), Some("chr2"));
        assert_eq!(dict.name(999), None);

        assert_eq!(dict.id("chr1"), Some(0));
        assert_eq!(dict.id("chr3"), None);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_declare_records_length() {
        let mut dict = ReferenceDict::new();

        let id = dict.declare("chr1", Some(248_956_422));
        assert_eq!(dict.length(id), Some(248_956_422));

        // Seen in a record before the header declared it.
        let id2 = dict.get_or_insert("chr2");
        assert_eq!(dict.length(id2), None);
        let declared = dict.declare("chr2", Some(1_000));
        assert_eq!(declared, id2);
        assert_eq!(dict.length(id2), Some(1_000));

        // Declaring without a length keeps what we had.
        dict.declare("chr1", None);
        assert_eq!(dict.length(id), Some(248_956_422));
    }
}
