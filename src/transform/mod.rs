//! Categorical transform between survey records and numeric feature rows
//!
//! Each field is encoded against the domain dictionaries in priority order;
//! the first matching code wins and values no dictionary knows pass through
//! unchanged. The domain that produced each code travels with the value, so
//! decoding is the exact inverse of encoding.

pub mod layout;

pub use layout::LabelLayout;

use serde::{Deserialize, Serialize};

use crate::dictionary::{Domain, DictionaryRegistry};
use crate::error::{PipelineError, Result};
use crate::ingest::{Header, Record};

/// One encoded field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureValue {
    /// Encoded text: a dictionary code, or the raw value on pass-through
    pub value: String,
    /// Dictionary that produced the code, `None` on pass-through
    pub domain: Option<Domain>,
}

impl FeatureValue {
    /// Numeric value for the classifier
    pub fn as_f32(&self) -> Result<f32> {
        self.value.parse::<f32>().map_err(|_| {
            PipelineError::schema(format!(
                "value '{}' matched no dictionary and is not numeric",
                self.value
            ))
        })
    }
}

/// Numeric projection of a record: identifier removed, label last
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRow {
    values: Vec<FeatureValue>,
}

impl FeatureRow {
    /// Create a row from encoded values, label last
    #[must_use]
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    /// All values, label last
    #[must_use]
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Values fed to the classifier as inputs
    #[must_use]
    pub fn features(&self) -> &[FeatureValue] {
        &self.values[..self.values.len().saturating_sub(1)]
    }

    /// Encoded label
    #[must_use]
    pub fn label(&self) -> Option<&FeatureValue> {
        self.values.last()
    }

    /// Encoded text of every value, as written to the intermediate tables
    pub fn encoded(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.value.as_str())
    }

    /// Inputs as numbers
    pub fn numeric_features(&self) -> Result<Vec<f32>> {
        self.features().iter().map(FeatureValue::as_f32).collect()
    }

    /// Label as a class index
    pub fn class_index(&self) -> Result<usize> {
        let label = self
            .label()
            .ok_or_else(|| PipelineError::schema("feature row has no label"))?;
        label.value.parse::<usize>().map_err(|_| {
            PipelineError::schema(format!("label '{}' is not a class index", label.value))
        })
    }
}

/// Encodes records into feature rows and decodes them back
#[derive(Debug, Clone, Copy)]
pub struct CategoricalTransform<'a> {
    registry: &'a DictionaryRegistry,
    layout: LabelLayout,
}

impl<'a> CategoricalTransform<'a> {
    /// Create a transform for tables shaped like `header`
    ///
    /// # Errors
    /// Returns a schema error if the header has no label column
    pub fn new(registry: &'a DictionaryRegistry, header: &Header) -> Result<Self> {
        Ok(Self {
            registry,
            layout: LabelLayout::from_header(header)?,
        })
    }

    /// Layout this transform applies
    #[must_use]
    pub const fn layout(&self) -> LabelLayout {
        self.layout
    }

    /// Encode a single value
    #[must_use]
    pub fn encode_value(&self, value: &str) -> FeatureValue {
        match self.registry.encode(value) {
            Some((domain, code)) => FeatureValue {
                value: code.to_string(),
                domain: Some(domain),
            },
            None => FeatureValue {
                value: value.to_string(),
                domain: None,
            },
        }
    }

    /// Decode a single value through the dictionary that encoded it
    pub fn decode_value(&self, value: &FeatureValue) -> Result<String> {
        match value.domain {
            None => Ok(value.value.clone()),
            Some(domain) => {
                let code = value.value.parse::<i64>().map_err(|_| {
                    PipelineError::reconciliation(format!(
                        "{domain} value '{}' is not an integer code",
                        value.value
                    ))
                })?;
                self.registry.decode(domain, code).map(str::to_string)
            }
        }
    }

    /// Transform a record into a feature row
    pub fn transform(&self, record: &Record) -> Result<FeatureRow> {
        let swapped = self.layout.apply(record.fields().iter().collect::<Vec<_>>())?;
        Ok(FeatureRow::new(
            swapped.into_iter().map(|field| self.encode_value(field)).collect(),
        ))
    }

    /// Transform records, preserving their order
    pub fn transform_all(&self, records: &[Record]) -> Result<Vec<FeatureRow>> {
        records.iter().map(|record| self.transform(record)).collect()
    }

    /// Decode a feature row back to answers in record order plus its label
    pub fn decode(&self, row: &FeatureRow) -> Result<(Vec<String>, String)> {
        let decoded = row
            .values()
            .iter()
            .map(|value| self.decode_value(value))
            .collect::<Result<Vec<_>>>()?;
        self.layout.restore(decoded)
    }
}

/// Transform one record of a table with the given header
pub fn transform(
    registry: &DictionaryRegistry,
    record: &Record,
    header: &Header,
) -> Result<FeatureRow> {
    CategoricalTransform::new(registry, header)?.transform(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(columns: &[&str]) -> Header {
        Header::new(columns.iter().map(|s| (*s).to_string()).collect())
    }

    fn record(fields: &[&str]) -> Record {
        Record::new(fields.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_transform_encodes_and_moves_label() {
        let registry = DictionaryRegistry::embedded().unwrap();
        let header = header(&["case_id", "skin", "vas_mk", "sex", "elicitor"]);
        let row = transform(&registry, &record(&["c1", "yes", "7", "male", "drugs"]), &header)
            .unwrap();

        let encoded: Vec<&str> = row.encoded().collect();
        assert_eq!(encoded, vec!["1", "2", "1", "7"]);
        assert_eq!(row.values()[0].domain, Some(Domain::NoYesUnknown));
        assert_eq!(row.values()[1].domain, Some(Domain::Elicitor));
        assert_eq!(row.values()[2].domain, Some(Domain::Sex));
        assert_eq!(row.label().unwrap().domain, Some(Domain::Severity));
        assert_eq!(row.class_index().unwrap(), 7);
        assert_eq!(row.numeric_features().unwrap(), vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_unmatched_values_pass_through() {
        let registry = DictionaryRegistry::embedded().unwrap();
        let header = header(&["id", "age", "VAS_MK"]);
        let row = transform(&registry, &record(&["c1", "42.5", "3"]), &header).unwrap();
        assert_eq!(row.values()[0].value, "42.5");
        assert_eq!(row.values()[0].domain, None);
        assert_eq!(row.numeric_features().unwrap(), vec![42.5]);

        let row = transform(&registry, &record(&["c1", "maybe", "3"]), &header).unwrap();
        assert!(matches!(row.numeric_features(), Err(PipelineError::Schema(_))));
    }

    #[test]
    fn test_decode_inverts_transform() {
        let registry = DictionaryRegistry::embedded().unwrap();
        let header = header(&["id", "vas_mk", "q1", "sex", "elicitor", "q2"]);
        let transform = CategoricalTransform::new(&registry, &header).unwrap();
        let source = record(&["c9", "4", "unknown", "female", "food", "no"]);

        let row = transform.transform(&source).unwrap();
        let (features, label) = transform.decode(&row).unwrap();
        assert_eq!(features, vec!["unknown", "female", "food", "no"]);
        assert_eq!(label, "4");
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let registry = DictionaryRegistry::embedded().unwrap();
        let header = header(&["id", "a", "b"]);
        assert!(matches!(
            transform(&registry, &record(&["1", "yes", "no"]), &header),
            Err(PipelineError::Schema(_))
        ));
    }
}
