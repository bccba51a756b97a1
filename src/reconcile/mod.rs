//! Re-linking classified rows to their source cases
//!
//! Feature rows carry no case identifier. Training rows are matched by the
//! conflict key of their decoded answers, which survives shuffling and
//! splitting. Register rows are never deduplicated or reordered, so they are
//! matched by position.

use rustc_hash::FxHashMap;

use crate::error::{PipelineError, Result};
use crate::ingest::{ConflictKey, Record};
use crate::transform::{CategoricalTransform, FeatureRow};

/// Case identity and true label of a training record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseEntry {
    /// Case identifier
    pub case_id: String,
    /// Label as it appeared in the source table
    pub label: String,
}

/// Lookup from conflict key to the cases that produced it
///
/// Cases sharing a key are kept in file order. Resolving a row consumes the
/// first unclaimed case whose label matches the row's label, so each case is
/// attributed at most once.
#[derive(Debug, Clone, Default)]
pub struct TrainingIndex {
    entries: FxHashMap<ConflictKey, Vec<CaseEntry>>,
}

impl TrainingIndex {
    /// Build the index from filtered records before they are shuffled or
    /// transformed
    #[must_use]
    pub fn build(records: &[Record], label_index: usize) -> Self {
        let mut entries: FxHashMap<ConflictKey, Vec<CaseEntry>> = FxHashMap::default();

        for record in records {
            entries
                .entry(ConflictKey::from_record(record, label_index))
                .or_default()
                .push(CaseEntry {
                    case_id: record.case_id().to_string(),
                    label: record.field(label_index).unwrap_or_default().to_string(),
                });
        }

        let shared = entries.values().filter(|cases| cases.len() > 1).count();
        if shared > 0 {
            log::info!(
                "{shared} answer pattern(s) belong to more than one training case; \
                 rows are matched to those cases by label"
            );
        }
        Self { entries }
    }

    /// Number of unclaimed cases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether every case has been claimed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Unclaimed cases with a key, in file order
    #[must_use]
    pub fn cases(&self, key: &ConflictKey) -> &[CaseEntry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Resolve a feature row to its source case and claim that case
    ///
    /// The row is decoded, its answers restored to record order, and the
    /// conflict key rebuilt exactly as it was when the index was built. Among
    /// the cases with that key the first one carrying the row's label wins.
    ///
    /// # Errors
    /// Returns a reconciliation error if no unclaimed case has these answers
    /// and this label
    pub fn resolve(
        &mut self,
        row: &FeatureRow,
        transform: &CategoricalTransform<'_>,
    ) -> Result<Resolved> {
        let (features, label) = transform.decode(row)?;
        let key = ConflictKey::from_features(&features);
        let cases = self.entries.get_mut(&key).ok_or_else(|| {
            PipelineError::reconciliation(format!(
                "no training case matches the decoded answers [{key}]"
            ))
        })?;
        let position = cases
            .iter()
            .position(|case| case.label == label)
            .ok_or_else(|| {
                PipelineError::reconciliation(format!(
                    "no unclaimed training case with answers [{key}] has label '{label}'"
                ))
            })?;
        Ok(Resolved {
            entry: cases.remove(position),
            features,
        })
    }
}

/// A feature row matched to its case
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Matched case
    pub entry: CaseEntry,
    /// Decoded answers in record order
    pub features: Vec<String>,
}

/// Case identifiers of register rows by position
#[derive(Debug, Clone, Default)]
pub struct RegisterIndex {
    case_ids: Vec<String>,
}

impl RegisterIndex {
    /// Build the index from filtered register records in their final order
    #[must_use]
    pub fn build(records: &[Record]) -> Self {
        Self {
            case_ids: records.iter().map(|r| r.case_id().to_string()).collect(),
        }
    }

    /// Number of register rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.case_ids.len()
    }

    /// Whether the index is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.case_ids.is_empty()
    }

    /// Case identifier of the row at `position`
    pub fn case_id(&self, position: usize) -> Result<&str> {
        self.case_ids
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| {
                PipelineError::reconciliation(format!(
                    "register row {position} has no case identifier ({} rows indexed)",
                    self.case_ids.len()
                ))
            })
    }

    /// Drop identifiers beyond `limit`, keeping the index aligned with a
    /// truncated register table
    pub fn truncate(&mut self, limit: usize) {
        self.case_ids.truncate(limit);
    }
}
