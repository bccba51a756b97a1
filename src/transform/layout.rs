//! Column layout of the numeric feature rows
//!
//! Transforming a record drops the case identifier and swaps the label into
//! the last position. The swap exchanges exactly two values; every other
//! column keeps its place. Because a swap is its own inverse, the same
//! operation restores record order when decoding.

use crate::error::{PipelineError, Result};
use crate::ingest::Header;

/// Positions of identifier and label for one table shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    label_index: usize,
    width: usize,
}

impl LabelLayout {
    /// Derive the layout from a header
    ///
    /// # Errors
    /// Returns a schema error if the label column is missing or is the
    /// identifier column itself
    pub fn from_header(header: &Header) -> Result<Self> {
        let label_index = header.label_index()?;
        Self::new(label_index, header.len())
    }

    /// Create a layout for records of `width` fields with the label at
    /// `label_index`
    pub fn new(label_index: usize, width: usize) -> Result<Self> {
        if label_index == 0 {
            return Err(PipelineError::schema(
                "label column cannot be the case identifier column",
            ));
        }
        if label_index >= width {
            return Err(PipelineError::schema(format!(
                "label column {label_index} is outside a {width}-column table"
            )));
        }
        Ok(Self { label_index, width })
    }

    /// Position of the label in a raw record
    #[must_use]
    pub const fn label_index(&self) -> usize {
        self.label_index
    }

    /// Field count of a raw record
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Field count of a feature row (label included)
    #[must_use]
    pub const fn row_width(&self) -> usize {
        self.width - 1
    }

    /// Number of answer columns (identifier and label excluded)
    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.width - 2
    }

    /// Drop the identifier and swap the label to the end
    pub fn apply<T>(&self, mut fields: Vec<T>) -> Result<Vec<T>> {
        if fields.len() != self.width {
            return Err(PipelineError::schema(format!(
                "expected {} fields but found {}",
                self.width,
                fields.len()
            )));
        }
        fields.remove(0);
        let last = fields.len() - 1;
        fields.swap(self.label_index - 1, last);
        Ok(fields)
    }

    /// Undo the swap of a feature row and split off the label
    ///
    /// # Returns
    /// The answers in record order and the label
    pub fn restore<T>(&self, mut row: Vec<T>) -> Result<(Vec<T>, T)> {
        if row.len() != self.row_width() {
            return Err(PipelineError::schema(format!(
                "expected {} feature row fields but found {}",
                self.row_width(),
                row.len()
            )));
        }
        let last = row.len() - 1;
        row.swap(self.label_index - 1, last);
        let label = row.remove(self.label_index - 1);
        Ok((row, label))
    }

    /// Names of the answer columns in record order
    #[must_use]
    pub fn feature_names(&self, header: &Header) -> Vec<String> {
        header
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 0 && *i != self.label_index)
            .map(|(_, name)| name.clone())
            .collect()
    }
}
