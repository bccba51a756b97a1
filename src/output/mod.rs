//! Result assembly and delimited table writers
//!
//! A result row joins a case identifier, the decoded answers, the true label
//! when one is known and the predicted label. Tables are written as comma
//! separated text without quoting; fields never contain the delimiter.

pub mod parquet;

use std::path::Path;
use std::time::Instant;

use itertools::Itertools;

use crate::classifier::{ClassProbabilities, predicted_class};
use crate::dictionary::{DictionaryRegistry, Domain};
use crate::error::util::safe_write;
use crate::error::{PipelineError, Result};
use crate::ingest::{DELIMITER, Header};
use crate::reconcile::{RegisterIndex, TrainingIndex};
use crate::transform::{CategoricalTransform, FeatureRow};
use crate::utils::logging::{TableIo, log_table_done};

/// Name of the case identifier column in result tables
pub const CASE_ID_COLUMN: &str = "case_id";

/// Name of the true label column in result tables
pub const ACTUAL_LABEL_COLUMN: &str = "actual_vas_score";

/// Name of the predicted label column in result tables
pub const PREDICTED_LABEL_COLUMN: &str = "vas_score_ann";

/// Answer columns of the standard anaphylaxis questionnaire, in record order
pub const STANDARD_FEATURE_COLUMNS: [&str; 24] = [
    "skin",
    "q_111_angioedema",
    "pharynx_larynx",
    "abdomin",
    "nausea",
    "vomiting",
    "diarrhoea",
    "incontinence",
    "dyspnea",
    "chest_tightness_v5",
    "cough_v5",
    "wheezing_expiratory_distre",
    "stridor_inspiratory",
    "respiratory_arrest",
    "hypotension_collapse_v5",
    "dizziness",
    "tachycardia",
    "palpitations_cardiac_arryt",
    "chest_pain_angina_v5",
    "reductions_of_alertness",
    "loss_of_consciousness",
    "cardiac_arrest",
    "kind",
    "d_elicitor_gr5",
];

/// Column names of a result table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSchema {
    feature_columns: Vec<String>,
}

impl ResultSchema {
    /// Schema whose answer columns are `feature_columns`
    #[must_use]
    pub fn new(feature_columns: Vec<String>) -> Self {
        Self { feature_columns }
    }

    /// Schema of the standard questionnaire (27 columns)
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_FEATURE_COLUMNS.iter().map(|s| (*s).to_string()).collect())
    }

    /// Schema for an input table, answer columns in record order
    #[must_use]
    pub fn from_header(header: &Header, transform: &CategoricalTransform<'_>) -> Self {
        Self::new(transform.layout().feature_names(header))
    }

    /// Answer column names
    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// All column names
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(CASE_ID_COLUMN.to_string())
            .chain(self.feature_columns.iter().cloned())
            .chain([
                ACTUAL_LABEL_COLUMN.to_string(),
                PREDICTED_LABEL_COLUMN.to_string(),
            ])
            .collect()
    }

    /// Whether the answer columns match the standard questionnaire
    #[must_use]
    pub fn is_standard(&self) -> bool {
        self.feature_columns
            .iter()
            .map(String::as_str)
            .eq(STANDARD_FEATURE_COLUMNS.iter().copied())
    }
}

/// One line of a result table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    /// Case identifier
    pub case_id: String,
    /// Decoded answers in record order
    pub features: Vec<String>,
    /// True label, known for verification rows only
    pub actual_label: Option<String>,
    /// Label chosen by the classifier
    pub predicted_label: String,
}

impl ResultRow {
    /// Fields in schema order; an unknown true label is written empty
    #[must_use]
    pub fn to_fields(&self) -> Vec<String> {
        std::iter::once(self.case_id.clone())
            .chain(self.features.iter().cloned())
            .chain([
                self.actual_label.clone().unwrap_or_default(),
                self.predicted_label.clone(),
            ])
            .collect()
    }
}

/// A result table ready to be written
#[derive(Debug, Clone)]
pub struct ResultTable {
    /// Column names
    pub schema: ResultSchema,
    /// Rows in classifier output order
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Write the table as delimited text with a header line
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_delimited(
            path,
            Some(&self.schema.columns()),
            self.rows.iter().map(ResultRow::to_fields),
        )
    }

    /// Write the table as Parquet
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        parquet::write_result_table(self, path)
    }

    /// Number of predictions per predicted label
    #[must_use]
    pub fn predicted_distribution(&self) -> Vec<(String, usize)> {
        self.rows
            .iter()
            .map(|row| row.predicted_label.clone())
            .counts()
            .into_iter()
            .sorted_by_key(|(label, _)| (label.parse::<i64>().unwrap_or(i64::MAX), label.clone()))
            .collect()
    }
}

fn predicted_label(registry: &DictionaryRegistry, probabilities: &[f32]) -> Result<String> {
    let class = predicted_class(probabilities);
    registry
        .decode(Domain::Severity, class as i64)
        .map(str::to_string)
}

fn check_lengths(rows: usize, predictions: usize) -> Result<()> {
    if rows == predictions {
        Ok(())
    } else {
        Err(PipelineError::reconciliation(format!(
            "{rows} classified rows but {predictions} predictions"
        )))
    }
}

/// Join verification predictions with the cases they came from
///
/// Each resolved case is claimed in `index`, so a case is reported once even
/// when several cases share the same answers.
///
/// # Errors
/// Returns a reconciliation error if a row's decoded answers and label match
/// no unclaimed training case or the row and prediction counts differ
pub fn assemble_verification_results(
    rows: &[FeatureRow],
    predictions: &[ClassProbabilities],
    index: &mut TrainingIndex,
    transform: &CategoricalTransform<'_>,
    registry: &DictionaryRegistry,
) -> Result<Vec<ResultRow>> {
    check_lengths(rows.len(), predictions.len())?;
    rows.iter()
        .zip(predictions)
        .map(|(row, probabilities)| {
            let resolved = index.resolve(row, transform)?;
            Ok(ResultRow {
                case_id: resolved.entry.case_id,
                actual_label: Some(resolved.entry.label),
                features: resolved.features,
                predicted_label: predicted_label(registry, probabilities)?,
            })
        })
        .collect()
}

/// Join register predictions with case identifiers by position
pub fn assemble_register_results(
    rows: &[FeatureRow],
    predictions: &[ClassProbabilities],
    index: &RegisterIndex,
    transform: &CategoricalTransform<'_>,
    registry: &DictionaryRegistry,
) -> Result<Vec<ResultRow>> {
    check_lengths(rows.len(), predictions.len())?;
    rows.iter()
        .zip(predictions)
        .enumerate()
        .map(|(position, (row, probabilities))| {
            let (features, _) = transform.decode(row)?;
            Ok(ResultRow {
                case_id: index.case_id(position)?.to_string(),
                features,
                actual_label: None,
                predicted_label: predicted_label(registry, probabilities)?,
            })
        })
        .collect()
}

/// Write delimited text, one line per row, with an optional header line
pub fn write_delimited<I>(path: &Path, header: Option<&[String]>, rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let start = Instant::now();
    let separator = DELIMITER.to_string();
    let mut content = String::new();
    if let Some(header) = header {
        content.push_str(&header.join(&separator));
        content.push('\n');
    }
    let mut count = 0;
    for row in rows {
        content.push_str(&row.join(&separator));
        content.push('\n');
        count += 1;
    }
    safe_write(path, &content, "writing a delimited table")?;
    log_table_done(TableIo::Write, path, count, start.elapsed());
    Ok(())
}

/// Write encoded feature rows without a header, label in the last column
pub fn write_feature_rows(path: &Path, rows: &[FeatureRow]) -> Result<()> {
    write_delimited(
        path,
        None,
        rows.iter()
            .map(|row| row.encoded().map(str::to_string).collect()),
    )
}
