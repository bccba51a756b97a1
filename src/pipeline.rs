//! End-to-end severity run over a data directory
//!
//! A run reads the labelled survey and the unlabelled register from
//! `input/`, trains (or loads) a classifier, and writes intermediate feature
//! tables to `temp/` and result tables to `output/`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::{
    ClassProbabilities, Classifier, Dataset, Evaluation, SEVERITY_CLASS_COUNT, SoftmaxClassifier,
};
use crate::config::PipelineConfig;
use crate::dictionary::DictionaryRegistry;
use crate::error::util::{ensure_directory, safe_write, validate_directory};
use crate::error::Result;
use crate::filter::{EncodableFilter, RecordFilter, RegisterFilter, TrainingFilter};
use crate::ingest::{IngestedTable, ingest};
use crate::output::{
    ResultSchema, ResultTable, assemble_register_results, assemble_verification_results,
    write_feature_rows,
};
use crate::partition::{shuffle, split};
use crate::reconcile::{RegisterIndex, TrainingIndex};
use crate::transform::{CategoricalTransform, FeatureRow};
use crate::utils::logging::log_row_count_mismatch;

/// Layout of a data directory
#[derive(Debug, Clone)]
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    /// Wrap a data directory path
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory itself
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Input tables
    #[must_use]
    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    /// Intermediate feature tables
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Result tables, model and run summary
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Saved classifiers
    #[must_use]
    pub fn ann_dir(&self) -> PathBuf {
        self.root.join("ann")
    }

    /// Optional dictionary overrides
    #[must_use]
    pub fn dictionary_dir(&self) -> PathBuf {
        self.root.join("dictionary")
    }

    /// Create the working directories that do not exist yet
    ///
    /// # Errors
    /// Returns an I/O error if the root is missing or a directory cannot be
    /// created
    pub fn bootstrap(&self) -> Result<()> {
        validate_directory(&self.root, "data directory")?;
        for dir in [
            self.input_dir(),
            self.temp_dir(),
            self.output_dir(),
            self.ann_dir(),
        ] {
            if ensure_directory(&dir)? {
                log::info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }

    /// Dictionaries of this directory, or the embedded defaults
    pub fn dictionaries(&self) -> Result<DictionaryRegistry> {
        let dir = self.dictionary_dir();
        if dir.is_dir() {
            log::info!("Loading dictionaries from {}", dir.display());
            DictionaryRegistry::from_directory(&dir)
        } else {
            DictionaryRegistry::embedded()
        }
    }
}

/// Counts and timings of a finished run, written to `output/run_summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    pub finished_at: DateTime<Utc>,
    /// Rows in the training file
    pub training_rows_read: usize,
    /// Training rows left after duplicate removal and filtering
    pub training_rows_kept: usize,
    /// Training rows dropped because an answer or the label could not be encoded
    pub training_rows_unencodable: usize,
    /// Repeated answer patterns in the training file
    pub duplicates: usize,
    /// Repeated answer patterns with a differing label
    pub confusions: usize,
    /// Rows in the training partition
    pub training_partition: usize,
    /// Rows in the verification partition
    pub verification_partition: usize,
    /// Whether verification reused the training rows
    pub self_evaluation: bool,
    /// Rows in the register file
    pub register_rows_read: usize,
    /// Register rows classified
    pub register_rows_classified: usize,
    /// Whether the classifier was loaded instead of trained
    pub model_loaded: bool,
    /// Accuracy on the verification partition, if it was evaluated
    pub verification_accuracy: Option<f64>,
    /// Register predictions per predicted label
    pub predicted_distribution: Vec<(String, usize)>,
}

/// Training rows after filtering, indexing and transformation
struct PreparedTraining {
    table: IngestedTable,
    index: TrainingIndex,
    rows: Vec<FeatureRow>,
    unencodable: usize,
}

/// Register rows after filtering, indexing and transformation
struct PreparedRegister {
    table: IngestedTable,
    index: RegisterIndex,
    rows: Vec<FeatureRow>,
}

/// A configured run over one data directory
#[derive(Debug, Clone)]
pub struct Pipeline {
    data_dir: DataDirectory,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a run
    #[must_use]
    pub fn new(data_dir: DataDirectory, config: PipelineConfig) -> Self {
        Self { data_dir, config }
    }

    /// Execute the run
    ///
    /// Dictionaries are loaded before any working directory is created, so a
    /// broken dictionary leaves the data directory untouched.
    ///
    /// # Errors
    /// Any configuration, schema, reconciliation, classifier or I/O failure
    /// aborts the run
    pub fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start = Instant::now();
        let registry = self.data_dir.dictionaries()?;
        self.data_dir.bootstrap()?;
        log::info!("Configuration:\n{}", self.config);

        let mut training = self.prepare_training(&registry)?;
        let register = self.prepare_register(&registry)?;

        let shuffled = shuffle(training.rows.clone(), self.config.shuffle_seed);
        let partition = split(&shuffled, self.config.training_size)?;
        if partition.is_self_evaluation() {
            log::info!("Training and verifying on all {} rows", shuffled.len());
        }
        let temp = self.data_dir.temp_dir();
        write_feature_rows(&temp.join("train_data.csv"), partition.training)?;
        write_feature_rows(&temp.join("verification_data.csv"), partition.verification)?;
        write_feature_rows(&temp.join("register_data.csv"), &register.rows)?;

        let training_set = Dataset::from_rows(partition.training, SEVERITY_CLASS_COUNT)?;
        let verification_set = Dataset::from_rows(partition.verification, SEVERITY_CLASS_COUNT)?;
        let register_set = Dataset::from_rows(&register.rows, SEVERITY_CLASS_COUNT)?;

        let output = self.data_dir.output_dir();
        let (classifier, model_loaded) = self.obtain_classifier(&training_set, &verification_set)?;
        if !model_loaded {
            classifier.save(&output.join("model.json"))?;
        }

        let training_transform = CategoricalTransform::new(&registry, &training.table.header)?;
        let verification_accuracy = if model_loaded {
            None
        } else {
            let predictions = classifier.evaluate(&verification_set)?;
            let rows = assemble_verification_results(
                partition.verification,
                &predictions,
                &mut training.index,
                &training_transform,
                &registry,
            )?;
            let table = ResultTable {
                schema: self.result_schema(&training.table, &training_transform),
                rows,
            };
            self.write_results(&table, "verification")?;
            Some(
                Evaluation::from_output(
                    verification_set.labels(),
                    &predictions,
                    classifier.class_count(),
                )
                .accuracy(),
            )
        };

        let register_table = self.classify_register(&classifier, &registry, &register, &register_set)?;
        let predicted_distribution = register_table.predicted_distribution();
        for (label, count) in &predicted_distribution {
            log::info!("Predicted severity {label}: {count} case(s)");
        }
        self.write_results(&register_table, "ann_calculated")?;

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            training_rows_read: training.table.diagnostics.total_rows,
            training_rows_kept: training.rows.len(),
            training_rows_unencodable: training.unencodable,
            duplicates: training.table.diagnostics.duplicates,
            confusions: training.table.diagnostics.confusions,
            training_partition: partition.training.len(),
            verification_partition: partition.verification.len(),
            self_evaluation: partition.is_self_evaluation(),
            register_rows_read: register.table.diagnostics.total_rows,
            register_rows_classified: register_table.rows.len(),
            model_loaded,
            verification_accuracy,
            predicted_distribution,
        };
        safe_write(
            &output.join("run_summary.json"),
            &serde_json::to_string_pretty(&summary)?,
            "writing the run summary",
        )?;
        log::info!("Run finished in {:.2?}", start.elapsed());
        Ok(summary)
    }

    fn prepare_training(&self, registry: &DictionaryRegistry) -> Result<PreparedTraining> {
        let path = self.data_dir.input_dir().join(&self.config.training_file);
        let mut table = ingest(&path, self.config.filter_duplicates)?;

        let filter = TrainingFilter {
            label_index: table.label_index,
            ignore_unknown: self.config.ignore_unknown,
        };
        let (records, _) = filter.apply(std::mem::take(&mut table.records));
        let transform = CategoricalTransform::new(registry, &table.header)?;
        let (records, encoding) = EncodableFilter { transform }.apply(records);
        let index = TrainingIndex::build(&records, table.label_index);
        let rows = transform.transform_all(&records)?;
        table.records = records;

        Ok(PreparedTraining {
            table,
            index,
            rows,
            unencodable: encoding.removed,
        })
    }

    fn prepare_register(&self, registry: &DictionaryRegistry) -> Result<PreparedRegister> {
        let path = self.data_dir.input_dir().join(&self.config.register_file);
        let mut table = ingest(&path, false)?;

        let filter = RegisterFilter {
            label_index: table.label_index,
        };
        let (records, _) = filter.apply(std::mem::take(&mut table.records));
        let transform = CategoricalTransform::new(registry, &table.header)?;
        let (mut records, _) = EncodableFilter { transform }.apply(records);
        let mut index = RegisterIndex::build(&records);

        let limit = self.config.register_limit;
        if records.len() != limit {
            log_row_count_mismatch(&path, records.len(), limit);
        }
        records.truncate(limit);
        index.truncate(limit);

        let rows = transform.transform_all(&records)?;
        table.records = records;

        Ok(PreparedRegister { table, index, rows })
    }

    fn obtain_classifier(
        &self,
        training: &Dataset,
        monitor: &Dataset,
    ) -> Result<(SoftmaxClassifier, bool)> {
        if let (true, Some(file)) = (self.config.use_saved_model, &self.config.model_file) {
            let path = self.data_dir.ann_dir().join(file);
            log::info!("Loading saved classifier from {}", path.display());
            return Ok((SoftmaxClassifier::load(&path)?, true));
        }

        let mut classifier = SoftmaxClassifier::new(self.config.to_softmax_config());
        let monitor = (!monitor.is_empty()).then_some(monitor);
        classifier.train(training, monitor)?;
        Ok((classifier, false))
    }

    fn classify_register<C: Classifier>(
        &self,
        classifier: &C,
        registry: &DictionaryRegistry,
        register: &PreparedRegister,
        data: &Dataset,
    ) -> Result<ResultTable> {
        let transform = CategoricalTransform::new(registry, &register.table.header)?;
        let predictions: Vec<ClassProbabilities> = classifier.predict(data)?;
        let rows = assemble_register_results(
            &register.rows,
            &predictions,
            &register.index,
            &transform,
            registry,
        )?;
        Ok(ResultTable {
            schema: self.result_schema(&register.table, &transform),
            rows,
        })
    }

    fn result_schema(
        &self,
        table: &IngestedTable,
        transform: &CategoricalTransform<'_>,
    ) -> ResultSchema {
        let schema = ResultSchema::from_header(&table.header, transform);
        if !schema.is_standard() {
            log::debug!(
                "Answer columns differ from the standard questionnaire: {}",
                schema.feature_columns().join(",")
            );
        }
        schema
    }

    fn write_results(&self, table: &ResultTable, name: &str) -> Result<()> {
        let output = self.data_dir.output_dir();
        table.write_csv(&output.join(format!("{name}.csv")))?;
        if self.config.output_parquet {
            table.write_parquet(&output.join(format!("{name}.parquet")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_creates_working_directories() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDirectory::new(dir.path());
        data.bootstrap().unwrap();

        assert!(data.input_dir().is_dir());
        assert!(data.temp_dir().is_dir());
        assert!(data.output_dir().is_dir());
        assert!(data.ann_dir().is_dir());
        assert!(!data.dictionary_dir().exists());

        data.bootstrap().unwrap();
    }

    #[test]
    fn test_bootstrap_requires_existing_root() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataDirectory::new(dir.path().join("missing"));
        assert!(data.bootstrap().is_err());
    }
}
