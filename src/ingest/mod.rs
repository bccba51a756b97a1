//! Reading delimited survey tables
//!
//! A table is a header line followed by comma separated records. Fields are
//! never quoted. The first column is the case identifier and one column,
//! found by name, holds the severity label.

pub mod conflict;
pub mod diagnostics;

pub use conflict::{ConflictDetector, ConflictKey, ConflictOutcome, DuplicateGroup};
pub use diagnostics::Diagnostics;

use std::path::Path;
use std::time::Instant;

use crate::error::util::safe_read_to_string;
use crate::error::{PipelineError, Result};
use crate::utils::logging::{TableIo, log_table_done, log_table_opened};

/// Field separator of every table the pipeline reads or writes
pub const DELIMITER: char = ',';

/// Name of the label column, matched case-insensitively
pub const LABEL_COLUMN: &str = "VAS_MK";

/// Literal marker for an unanswered question
pub const UNKNOWN_MARKER: &str = "unknown";

/// Column names of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: Vec<String>,
}

impl Header {
    /// Create a header from column names
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Column names in file order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the header has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the first column whose name equals `name` ignoring case
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Position of the label column
    ///
    /// # Errors
    /// Returns a schema error if no column is named [`LABEL_COLUMN`]
    pub fn label_index(&self) -> Result<usize> {
        self.position_of(LABEL_COLUMN).ok_or_else(|| {
            PipelineError::schema(format!(
                "label column '{LABEL_COLUMN}' not found in header [{}]",
                self.columns.join(", ")
            ))
        })
    }
}

/// One row of a table, case identifier first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Create a record from its fields
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Parse a delimited line
    #[must_use]
    pub fn parse(line: &str) -> Self {
        Self::new(line.split(DELIMITER).map(str::to_string).collect())
    }

    /// Case identifier (first field)
    #[must_use]
    pub fn case_id(&self) -> &str {
        self.fields.first().map_or("", String::as_str)
    }

    /// All fields
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at a position
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Overwrite a field
    pub fn set_field(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            *field = value.into();
        }
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether any field equals `value` exactly
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.fields.iter().any(|field| field == value)
    }

    /// Consume the record, returning its fields
    #[must_use]
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}

/// A parsed table
#[derive(Debug, Clone)]
pub struct Table {
    /// Column names
    pub header: Header,
    /// Records in file order
    pub records: Vec<Record>,
}

impl Table {
    /// Parse delimited text
    ///
    /// Blank lines are skipped and a trailing `\r` is stripped from every
    /// line.
    ///
    /// # Arguments
    /// * `content` - Whole file content
    /// * `source` - Name used in error messages
    ///
    /// # Errors
    /// Returns a schema error for a missing header or a record whose field
    /// count differs from the header
    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.is_empty());

        let header = match lines.next() {
            Some((_, line)) => Header::new(line.split(DELIMITER).map(str::to_string).collect()),
            None => return Err(PipelineError::schema(format!("{source}: table has no header"))),
        };

        let records = lines
            .map(|(line_no, line)| {
                let record = Record::parse(line);
                if record.len() == header.len() {
                    Ok(record)
                } else {
                    Err(PipelineError::schema(format!(
                        "{source} line {line_no}: expected {} fields but found {}",
                        header.len(),
                        record.len()
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { header, records })
    }
}

/// Result of ingesting one table
#[derive(Debug, Clone)]
pub struct IngestedTable {
    /// Column names
    pub header: Header,
    /// Position of the label column
    pub label_index: usize,
    /// Records in file order, first-seen only when duplicates are filtered
    pub records: Vec<Record>,
    /// Data-quality report over all rows of the file
    pub diagnostics: Diagnostics,
}

/// Run conflict detection over a parsed table
///
/// When `filter_duplicates` is set only the first record per conflict key is
/// kept; the identifiers of dropped records remain in the diagnostics.
pub fn detect_conflicts(table: Table, filter_duplicates: bool) -> Result<IngestedTable> {
    let Table { header, records } = table;
    let label_index = header.label_index()?;

    let mut detector = ConflictDetector::new();
    let mut diagnostics = Diagnostics::new(header.len());
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        let outcome = detector.observe(&record, label_index);
        diagnostics.record_row(&record, label_index, outcome);
        if !(filter_duplicates && outcome.is_repeat()) {
            kept.push(record);
        }
    }
    diagnostics.groups = detector.into_groups();

    Ok(IngestedTable {
        header,
        label_index,
        records: kept,
        diagnostics,
    })
}

/// Read a table from disk and run conflict detection on it
///
/// # Arguments
/// * `path` - Delimited text file with a header line
/// * `filter_duplicates` - Keep only the first record per conflict key
pub fn ingest(path: &Path, filter_duplicates: bool) -> Result<IngestedTable> {
    let start = Instant::now();
    log_table_opened("survey table", path);

    let content = safe_read_to_string(path, "survey table")?;
    let table = Table::parse(&content, &path.display().to_string())?;
    let ingested = detect_conflicts(table, filter_duplicates)?;

    ingested.diagnostics.log(&ingested.header);
    log_table_done(TableIo::Read, path, ingested.records.len(), start.elapsed());
    Ok(ingested)
}
