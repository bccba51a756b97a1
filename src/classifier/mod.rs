//! Interface to the severity classifier
//!
//! The pipeline only needs a classifier that trains on feature rows and
//! returns one probability vector per row. [`SoftmaxClassifier`] is the
//! implementation shipped with the crate.

pub mod evaluation;
pub mod softmax;

pub use evaluation::Evaluation;
pub use softmax::{SoftmaxClassifier, SoftmaxConfig};

use std::path::Path;

use smallvec::SmallVec;

use crate::error::{PipelineError, Result};
use crate::transform::FeatureRow;

/// Number of severity classes (scores 0..=10)
pub const SEVERITY_CLASS_COUNT: usize = 11;

/// Probability per class for one row
pub type ClassProbabilities = SmallVec<[f32; SEVERITY_CLASS_COUNT]>;

/// Index of the most probable class; ties go to the lowest index
#[must_use]
pub fn predicted_class(probabilities: &[f32]) -> usize {
    let mut best = 0;
    for (index, &p) in probabilities.iter().enumerate().skip(1) {
        if p > probabilities[best] {
            best = index;
        }
    }
    best
}

/// Numeric inputs and class labels ready for a classifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    features: Vec<Vec<f32>>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Convert feature rows, keeping their order
    ///
    /// # Errors
    /// Returns a schema error for non-numeric inputs, rows of differing
    /// width, or a label outside `0..class_count`
    pub fn from_rows(rows: &[FeatureRow], class_count: usize) -> Result<Self> {
        let mut features = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());

        for row in rows {
            let inputs = row.numeric_features()?;
            if let Some(first) = features.first().map(Vec::len) {
                if inputs.len() != first {
                    return Err(PipelineError::schema(format!(
                        "feature row has {} inputs, expected {first}",
                        inputs.len()
                    )));
                }
            }
            let class = row.class_index()?;
            if class >= class_count {
                return Err(PipelineError::schema(format!(
                    "label class {class} is outside 0..{class_count}"
                )));
            }
            features.push(inputs);
            labels.push(class);
        }

        Ok(Self { features, labels })
    }

    /// Create a dataset from raw parts
    pub fn new(features: Vec<Vec<f32>>, labels: Vec<usize>) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(PipelineError::classifier(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    /// Input vectors
    #[must_use]
    pub fn features(&self) -> &[Vec<f32>] {
        &self.features
    }

    /// Class labels
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of inputs per row, 0 for an empty dataset
    #[must_use]
    pub fn width(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }
}

/// A trainable multi-class classifier
pub trait Classifier {
    /// Number of classes in the output vectors
    fn class_count(&self) -> usize;

    /// Fit the classifier; `monitor` is evaluated periodically if given
    fn train(&mut self, training: &Dataset, monitor: Option<&Dataset>) -> Result<()>;

    /// Class probabilities per row, in input order
    fn predict(&self, data: &Dataset) -> Result<Vec<ClassProbabilities>>;

    /// Predict labelled rows and log how well the predictions match
    fn evaluate(&self, verification: &Dataset) -> Result<Vec<ClassProbabilities>> {
        let output = self.predict(verification)?;
        Evaluation::from_output(verification.labels(), &output, self.class_count()).log();
        Ok(output)
    }

    /// Persist the trained state
    fn save(&self, path: &Path) -> Result<()>;

    /// Restore a previously saved classifier
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;
}
