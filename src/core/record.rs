// Records returned by the store: an ordered bin list plus generation/ttl metadata.
use crate::core::value::Value;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Metadata {
    pub generation: u32,
    /// Seconds until expiry; 0 means the record never expires.
    pub ttl: u32,
}

/// A record as the store reports it.
///
/// Bins keep the order the store produced them in. A bin present with
/// [`Value::Nil`] is distinct from a bin missing from the list.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    bins: Vec<(String, Value)>,
    pub generation: u32,
    pub ttl: u32,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bins: Vec::with_capacity(capacity),
            generation: 0,
            ttl: 0,
        }
    }

    /// Builds a record from a raw bin list exactly as a transport decoded it.
    ///
    /// No deduplication happens here; the demarshaler rejects inconsistent lists.
    pub fn from_bins(bins: Vec<(String, Value)>, metadata: Metadata) -> Self {
        Self {
            bins,
            generation: metadata.generation,
            ttl: metadata.ttl,
        }
    }

    /// Sets `name` to `value`, replacing an existing entry in place.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.bins.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.bins.push((name, value)),
        }
    }

    /// Marks `name` for removal.
    pub fn set_nil(&mut self, name: impl Into<String>) {
        self.set(name, Value::Nil);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bins
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn bins(&self) -> &[(String, Value)] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            generation: self.generation,
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Metadata, Record};
    use crate::core::value::Value;

    #[test]
    fn set_replaces_in_place_and_keeps_order() {
        let mut record = Record::new();
        record.set("a", Value::Int(1));
        record.set("b", Value::from("x"));
        record.set("a", Value::Int(2));
        assert_eq!(
            record.bins(),
            &[
                ("a".to_string(), Value::Int(2)),
                ("b".to_string(), Value::from("x"))
            ]
        );
    }

    #[test]
    fn nil_bin_is_present_but_missing_bin_is_not() {
        let mut record = Record::new();
        record.set_nil("gone");
        assert_eq!(record.get("gone"), Some(&Value::Nil));
        assert_eq!(record.get("never"), None);
    }

    #[test]
    fn from_bins_keeps_raw_list() {
        let record = Record::from_bins(
            vec![
                ("a".to_string(), Value::Int(1)),
                ("a".to_string(), Value::Int(2)),
            ],
            Metadata {
                generation: 4,
                ttl: 30,
            },
        );
        assert_eq!(record.len(), 2);
        assert_eq!(record.metadata(), Metadata { generation: 4, ttl: 30 });
    }
}
