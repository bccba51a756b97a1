//! Row exclusion policies
//!
//! Training rows need a usable label; register rows need complete answers.
//! Both policies run after conflict detection and report how many rows they
//! removed. Rows that survive them but still cannot be encoded as numbers are
//! dropped by [`EncodableFilter`].

use std::fmt;

use crate::classifier::SEVERITY_CLASS_COUNT;
use crate::ingest::{Record, UNKNOWN_MARKER};
use crate::transform::CategoricalTransform;

/// Lowest severity score accepted for training
pub const MIN_SEVERITY: i64 = 1;

/// Placeholder label given to register rows before classification
pub const REGISTER_LABEL_PLACEHOLDER: &str = "0";

/// Defines a criterion for removing records from a table
pub trait RecordFilter {
    /// Name used in log messages
    fn name(&self) -> &'static str;

    /// Adjust a record before it is judged
    fn prepare(&self, _record: &mut Record) {}

    /// Determine if a record must be dropped
    fn should_remove(&self, record: &Record) -> bool;

    /// Prepare and judge every record, keeping the survivors in order
    fn apply(&self, records: Vec<Record>) -> (Vec<Record>, FilterReport) {
        let total = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter_map(|mut record| {
                self.prepare(&mut record);
                (!self.should_remove(&record)).then_some(record)
            })
            .collect();

        let report = FilterReport {
            filter: self.name(),
            total,
            removed: total - kept.len(),
        };
        log::info!("{report}");
        (kept, report)
    }
}

/// Outcome of one filter pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterReport {
    /// Filter that produced the report
    pub filter: &'static str,
    /// Records before filtering
    pub total: usize,
    /// Records removed
    pub removed: usize,
}

impl FilterReport {
    /// Records that survived
    #[must_use]
    pub const fn kept(&self) -> usize {
        self.total - self.removed
    }
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: filtered {} row(s) of {} total rows",
            self.filter, self.removed, self.total
        )
    }
}

/// Exclusion policy for labelled training data
#[derive(Debug, Clone, Copy)]
pub struct TrainingFilter {
    /// Position of the label column
    pub label_index: usize,
    /// Drop rows containing the "unknown" marker
    pub ignore_unknown: bool,
}

impl RecordFilter for TrainingFilter {
    fn name(&self) -> &'static str {
        "training filter"
    }

    fn should_remove(&self, record: &Record) -> bool {
        if self.ignore_unknown && record.contains(UNKNOWN_MARKER) {
            return true;
        }
        match record.field(self.label_index) {
            None | Some("") => true,
            Some(label) => label
                .parse::<i64>()
                .map_or(true, |score| score < MIN_SEVERITY),
        }
    }
}

/// Exclusion policy for unlabelled register data
///
/// The label is replaced with [`REGISTER_LABEL_PLACEHOLDER`] first, so an
/// empty label never causes a register row to be dropped.
#[derive(Debug, Clone, Copy)]
pub struct RegisterFilter {
    /// Position of the label column
    pub label_index: usize,
}

impl RecordFilter for RegisterFilter {
    fn name(&self) -> &'static str {
        "register filter"
    }

    fn prepare(&self, record: &mut Record) {
        record.set_field(self.label_index, REGISTER_LABEL_PLACEHOLDER);
    }

    fn should_remove(&self, record: &Record) -> bool {
        record.contains(UNKNOWN_MARKER) || record.contains("")
    }
}

/// Drops rows the classifier cannot read
///
/// A row survives when every answer encodes to a number and its label encodes
/// to a severity class. Empty answers and values no dictionary knows fail
/// the first check.
#[derive(Debug, Clone, Copy)]
pub struct EncodableFilter<'a> {
    /// Transform the surviving rows will go through
    pub transform: CategoricalTransform<'a>,
}

impl RecordFilter for EncodableFilter<'_> {
    fn name(&self) -> &'static str {
        "encoding filter"
    }

    fn should_remove(&self, record: &Record) -> bool {
        let Ok(row) = self.transform.transform(record) else {
            return true;
        };
        row.numeric_features().is_err()
            || row
                .class_index()
                .map_or(true, |class| class >= SEVERITY_CLASS_COUNT)
    }
}
