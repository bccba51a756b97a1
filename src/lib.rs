//! Severity classification of anaphylaxis register cases.
//!
//! Reads a labelled survey and an unlabelled register, encodes categorical
//! answers through dictionaries, trains a classifier on the survey and writes
//! predicted severity scores for the register cases with their identifiers.

pub mod classifier;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod output;
pub mod partition;
pub mod pipeline;
pub mod reconcile;
pub mod transform;
pub mod utils;

// Core types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{DataDirectory, Pipeline, RunSummary};

// Stages
pub use classifier::{Classifier, Dataset, Evaluation, SoftmaxClassifier, SoftmaxConfig};
pub use dictionary::{Dictionary, DictionaryRegistry, Domain};
pub use filter::{EncodableFilter, RecordFilter, RegisterFilter, TrainingFilter};
pub use ingest::{ConflictKey, Diagnostics, Header, IngestedTable, Record, ingest};
pub use output::{ResultRow, ResultSchema, ResultTable};
pub use partition::{Partition, shuffle, split};
pub use reconcile::{RegisterIndex, TrainingIndex};
pub use transform::{CategoricalTransform, FeatureRow, FeatureValue, LabelLayout};
