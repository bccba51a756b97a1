//! Conflict keys and duplicate/confusion detection
//!
//! A [`ConflictKey`] is the canonical form of a record's answers: every field
//! except the case identifier and the label, joined in record order. Two
//! records with the same key answered the survey identically; if their labels
//! also differ they "confuse" the classifier.

use std::fmt;

use rustc_hash::FxHashMap;

use super::Record;

/// Separator between answers inside a key. Input fields are comma separated,
/// so no field can contain it and joined keys cannot collide.
pub const KEY_SEPARATOR: char = ',';

/// Canonical string of a record's non-identity, non-label fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConflictKey(String);

impl ConflictKey {
    /// Build the key of a raw record
    ///
    /// # Arguments
    /// * `record` - The un-transformed record, identity in position 0
    /// * `label_index` - Position of the label column in the record
    #[must_use]
    pub fn from_record(record: &Record, label_index: usize) -> Self {
        Self::from_features(
            record
                .fields()
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != 0 && *i != label_index)
                .map(|(_, value)| value.as_str()),
        )
    }

    /// Build a key from answers that are already in record order
    #[must_use]
    pub fn from_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut key = String::new();
        for (i, feature) in features.into_iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            key.push_str(feature.as_ref());
        }
        Self(key)
    }

    /// The canonical string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a record relates to the records seen before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// First record with this key
    Unique,
    /// Same answers and same label as an earlier record
    Duplicate,
    /// Same answers as an earlier record but a different label
    Confusion,
}

impl ConflictOutcome {
    /// Whether the record repeats an earlier key
    #[must_use]
    pub const fn is_repeat(self) -> bool {
        !matches!(self, Self::Unique)
    }
}

/// All records sharing one conflict key, in file order
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Shared key
    pub key: ConflictKey,
    /// Label of the first record seen with this key
    pub first_label: String,
    /// Case identifiers of every record with this key
    pub case_ids: Vec<String>,
    /// Case identifiers of later records whose label differs from `first_label`
    pub confusing_case_ids: Vec<String>,
}

impl DuplicateGroup {
    /// Whether more than one record carries this key
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.case_ids.len() > 1
    }

    /// Whether any record in the group disagrees on the label
    #[must_use]
    pub fn is_confusing(&self) -> bool {
        !self.confusing_case_ids.is_empty()
    }
}

/// Tracks first-seen labels per key while records stream past
#[derive(Debug, Default)]
pub struct ConflictDetector {
    positions: FxHashMap<ConflictKey, usize>,
    groups: Vec<DuplicateGroup>,
}

impl ConflictDetector {
    /// Create an empty detector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record and classify it against everything seen so far
    pub fn observe(&mut self, record: &Record, label_index: usize) -> ConflictOutcome {
        let key = ConflictKey::from_record(record, label_index);
        let label = record.field(label_index).unwrap_or_default();
        let case_id = record.case_id().to_string();

        if let Some(&position) = self.positions.get(&key) {
            let group = &mut self.groups[position];
            group.case_ids.push(case_id.clone());
            if group.first_label == label {
                ConflictOutcome::Duplicate
            } else {
                group.confusing_case_ids.push(case_id);
                ConflictOutcome::Confusion
            }
        } else {
            self.positions.insert(key.clone(), self.groups.len());
            self.groups.push(DuplicateGroup {
                key,
                first_label: label.to_string(),
                case_ids: vec![case_id],
                confusing_case_ids: Vec::new(),
            });
            ConflictOutcome::Unique
        }
    }

    /// Groups in first-seen order
    #[must_use]
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> Record {
        Record::new(fields.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_key_ignores_identity_and_label() {
        let a = record(&["c1", "yes", "no", "5", "food"]);
        let b = record(&["c2", "yes", "no", "9", "food"]);
        assert_eq!(ConflictKey::from_record(&a, 3), ConflictKey::from_record(&b, 3));
        assert_eq!(ConflictKey::from_record(&a, 3).as_str(), "yes,no,food");
    }

    #[test]
    fn test_key_distinguishes_any_other_field() {
        let a = record(&["c1", "yes", "no", "5"]);
        let b = record(&["c1", "yes", "yes", "5"]);
        let c = record(&["c1", "yesno", "", "5"]);
        let key_a = ConflictKey::from_record(&a, 3);
        assert_ne!(key_a, ConflictKey::from_record(&b, 3));
        assert_ne!(key_a, ConflictKey::from_record(&c, 3));
    }

    #[test]
    fn test_detector_classifies_repeats() {
        let mut detector = ConflictDetector::new();
        let first = record(&["c1", "yes", "3"]);
        let same = record(&["c2", "yes", "3"]);
        let confusing = record(&["c3", "yes", "8"]);
        let other = record(&["c4", "no", "8"]);

        assert_eq!(detector.observe(&first, 2), ConflictOutcome::Unique);
        assert_eq!(detector.observe(&same, 2), ConflictOutcome::Duplicate);
        assert_eq!(detector.observe(&confusing, 2), ConflictOutcome::Confusion);
        assert_eq!(detector.observe(&other, 2), ConflictOutcome::Unique);

        let groups = detector.into_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].case_ids, vec!["c1", "c2", "c3"]);
        assert_eq!(groups[0].confusing_case_ids, vec!["c3"]);
        assert!(groups[0].is_confusing());
        assert!(!groups[1].has_duplicates());
    }
}
