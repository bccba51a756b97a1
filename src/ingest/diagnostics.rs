//! Data-quality diagnostics gathered while ingesting a table
//!
//! These numbers are for the operator; no pipeline decision depends on them.

use std::collections::BTreeSet;
use std::fmt;

use super::conflict::{ConflictOutcome, DuplicateGroup};
use super::{Header, Record, UNKNOWN_MARKER};

/// Highest score on the severity scale
pub const MAX_SCORE: usize = 10;

/// Counters and audit lists for one ingested table
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Number of data rows in the file
    pub total_rows: usize,
    /// Rows with an "unknown" marker in any field (case-insensitive)
    pub unknown_rows: usize,
    /// Rows with an empty label
    pub missing_label_rows: usize,
    /// Rows whose label is not an integer within 0..=10
    pub invalid_label_rows: usize,
    /// Repeated keys whose label differs from the first-seen label
    pub confusions: usize,
    /// Repeated keys, confusing or not
    pub duplicates: usize,
    /// Label counts per score 0..=10
    pub score_distribution: [usize; MAX_SCORE + 1],
    /// Distinct values per column, indexed like the header
    pub column_values: Vec<BTreeSet<String>>,
    /// Every conflict key with the case identifiers that carry it
    pub groups: Vec<DuplicateGroup>,
}

impl Diagnostics {
    pub(crate) fn new(column_count: usize) -> Self {
        Self {
            column_values: vec![BTreeSet::new(); column_count],
            ..Self::default()
        }
    }

    pub(crate) fn record_row(&mut self, record: &Record, label_index: usize, outcome: ConflictOutcome) {
        self.total_rows += 1;

        match outcome {
            ConflictOutcome::Unique => {}
            ConflictOutcome::Duplicate => self.duplicates += 1,
            ConflictOutcome::Confusion => {
                self.duplicates += 1;
                self.confusions += 1;
            }
        }

        for (values, field) in self.column_values.iter_mut().zip(record.fields()) {
            values.insert(field.clone());
        }

        if record
            .fields()
            .iter()
            .any(|field| field.eq_ignore_ascii_case(UNKNOWN_MARKER))
        {
            self.unknown_rows += 1;
        }

        let label = record.field(label_index).unwrap_or_default();
        if label.is_empty() {
            self.missing_label_rows += 1;
            return;
        }
        match label.parse::<usize>() {
            Ok(score) if score <= MAX_SCORE => self.score_distribution[score] += 1,
            _ => self.invalid_label_rows += 1,
        }
    }

    /// Groups holding more than one case
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|group| group.has_duplicates())
    }

    /// Groups whose cases disagree on the label
    pub fn confusion_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|group| group.is_confusing())
    }

    /// Log the summary at info level and the audit lists at debug level
    pub fn log(&self, header: &Header) {
        for line in self.to_string().lines() {
            log::info!("{line}");
        }

        for group in self.duplicate_groups() {
            let kind = if group.is_confusing() { "Confusing" } else { "Duplicate" };
            log::debug!("{kind} cases: {}", group.case_ids.join(" | "));
        }
        for (index, values) in self.column_values.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let name = header.columns().get(index).map_or("?", String::as_str);
            let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            log::debug!("{index}, {name}: {joined}");
        }
        for (score, count) in self.score_distribution.iter().enumerate() {
            log::debug!("score {score}: {count}");
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total lines: {}", self.total_rows)?;
        writeln!(f, "unknown lines: {}", self.unknown_rows)?;
        writeln!(f, "missing VAS value lines: {}", self.missing_label_rows)?;
        if self.invalid_label_rows > 0 {
            writeln!(f, "invalid VAS value lines: {}", self.invalid_label_rows)?;
        }
        writeln!(f, "confusions: {}", self.confusions)?;
        write!(f, "duplicates: {}", self.duplicates)
    }
}
