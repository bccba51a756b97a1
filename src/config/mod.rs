//! Run configuration
//!
//! Settings come from `config.properties` in the data directory, written in
//! `key=value` properties syntax. Numeric keys and the input file names are
//! required; boolean keys read as `false` unless set to `true`.

use std::fmt;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::classifier::{SEVERITY_CLASS_COUNT, SoftmaxConfig};
use crate::error::util::safe_read_to_string;
use crate::error::{PipelineError, Result};

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.properties";

/// Epoch interval of the monitor evaluation while training
pub const EVALUATION_INTERVAL: usize = 10_000;

/// Register rows classified when `register.data.limit` is absent
pub const DEFAULT_REGISTER_LIMIT: usize = 7600;

/// Initial learning rate when `ann.learning.rate` is absent
pub const DEFAULT_LEARNING_RATE: f32 = 0.6;

const TRAINING_FILE: &str = "training.data.file";
const REGISTER_FILE: &str = "register.data.file";
const SHUFFLE_SEED: &str = "training.data.shuffle.seed";
const CLASSIFIER_SEED: &str = "ann.initalizing.seed";
const TRAINING_SIZE: &str = "training.data.size";
const EPOCHS: &str = "training.epochs";
const EVALUATE_WHILE_TRAINING: &str = "training.evaluate.while.training";
const IGNORE_UNKNOWN: &str = "training.data.ignore.unknown";
const FILTER_DUPLICATES: &str = "training.data.filter.duplicate";
const USE_SAVED_MODEL: &str = "ann.use.saved.ann";
const MODEL_FILE: &str = "ann.file.name";
const REGISTER_LIMIT: &str = "register.data.limit";
const LEARNING_RATE: &str = "ann.learning.rate";
const OUTPUT_PARQUET: &str = "output.parquet";

/// Settings of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Labelled survey file inside `input/`
    pub training_file: String,
    /// Unlabelled register file inside `input/`
    pub register_file: String,
    /// Seed of the training row shuffle
    pub shuffle_seed: u64,
    /// Seed of the classifier weight initialisation
    pub classifier_seed: u64,
    /// Training partition size; negative means train and verify on all rows
    pub training_size: i64,
    /// Training epochs
    pub epochs: usize,
    /// Evaluate the verification rows periodically while training
    pub evaluate_while_training: bool,
    /// Drop training rows containing an `unknown` answer
    pub ignore_unknown: bool,
    /// Drop repeated answer patterns from the training data
    pub filter_duplicates: bool,
    /// Load a saved classifier from `ann/` instead of training
    pub use_saved_model: bool,
    /// Saved classifier file inside `ann/`
    pub model_file: Option<String>,
    /// Maximum number of register rows to classify
    pub register_limit: usize,
    /// Initial learning rate of the classifier
    pub learning_rate: f32,
    /// Also write result tables as Parquet
    pub output_parquet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_file: "training.csv".to_string(),
            register_file: "register.csv".to_string(),
            shuffle_seed: 42,
            classifier_seed: 123,
            training_size: -1,
            epochs: 1000,
            evaluate_while_training: false,
            ignore_unknown: true,
            filter_duplicates: false,
            use_saved_model: false,
            model_file: None,
            register_limit: DEFAULT_REGISTER_LIMIT,
            learning_rate: DEFAULT_LEARNING_RATE,
            output_parquet: false,
        }
    }
}

impl PipelineConfig {
    /// Load the configuration file of a data directory
    pub fn from_data_dir(data_dir: &Path) -> Result<Self> {
        Self::from_properties_file(&data_dir.join(CONFIG_FILE_NAME))
    }

    /// Load a configuration from a properties file
    pub fn from_properties_file(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "reading the run configuration")?;
        Self::parse_properties(&content).map_err(|e| match e {
            PipelineError::Configuration(message) => {
                PipelineError::configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Parse properties text
    ///
    /// # Errors
    /// Returns a configuration error if a required key is missing or a value
    /// does not parse
    pub fn parse_properties(content: &str) -> Result<Self> {
        let properties = Properties::parse(content);

        let use_saved_model = properties.flag(USE_SAVED_MODEL);
        let model_file = properties.get(MODEL_FILE).map(str::to_string);
        if use_saved_model && model_file.is_none() {
            return Err(PipelineError::configuration(format!(
                "{USE_SAVED_MODEL} is set but {MODEL_FILE} is missing"
            )));
        }

        Ok(Self {
            training_file: properties.required(TRAINING_FILE)?.to_string(),
            register_file: properties.required(REGISTER_FILE)?.to_string(),
            shuffle_seed: properties.parse_required(SHUFFLE_SEED)?,
            classifier_seed: properties.parse_required(CLASSIFIER_SEED)?,
            training_size: properties.parse_required(TRAINING_SIZE)?,
            epochs: properties.parse_required(EPOCHS)?,
            evaluate_while_training: properties.flag(EVALUATE_WHILE_TRAINING),
            ignore_unknown: properties.flag(IGNORE_UNKNOWN),
            filter_duplicates: properties.flag(FILTER_DUPLICATES),
            use_saved_model,
            model_file,
            register_limit: properties
                .parse_optional(REGISTER_LIMIT)?
                .unwrap_or(DEFAULT_REGISTER_LIMIT),
            learning_rate: properties
                .parse_optional(LEARNING_RATE)?
                .unwrap_or(DEFAULT_LEARNING_RATE),
            output_parquet: properties.flag(OUTPUT_PARQUET),
        })
    }

    /// Classifier hyperparameters derived from this configuration
    #[must_use]
    pub fn to_softmax_config(&self) -> SoftmaxConfig {
        SoftmaxConfig {
            class_count: SEVERITY_CLASS_COUNT,
            epochs: self.epochs,
            learning_rate: self.learning_rate,
            seed: self.classifier_seed,
            evaluate_every: self.evaluate_while_training.then_some(EVALUATION_INTERVAL),
            ..SoftmaxConfig::default()
        }
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TRAINING_FILE}: {}", self.training_file)?;
        writeln!(f, "{EPOCHS}: {}", self.epochs)?;
        writeln!(f, "{EVALUATE_WHILE_TRAINING}: {}", self.evaluate_while_training)?;
        writeln!(f, "{TRAINING_SIZE}: {}", self.training_size)?;
        writeln!(f, "{SHUFFLE_SEED}: {}", self.shuffle_seed)?;
        writeln!(f, "{REGISTER_FILE}: {}", self.register_file)?;
        writeln!(f, "{REGISTER_LIMIT}: {}", self.register_limit)?;
        writeln!(f, "{CLASSIFIER_SEED}: {}", self.classifier_seed)?;
        writeln!(f, "{LEARNING_RATE}: {}", self.learning_rate)?;
        writeln!(f, "{IGNORE_UNKNOWN}: {}", self.ignore_unknown)?;
        writeln!(f, "{FILTER_DUPLICATES}: {}", self.filter_duplicates)?;
        writeln!(f, "{USE_SAVED_MODEL}: {}", self.use_saved_model)?;
        writeln!(f, "{MODEL_FILE}: {}", self.model_file.as_deref().unwrap_or("-"))?;
        write!(f, "{OUTPUT_PARQUET}: {}", self.output_parquet)
    }
}

/// Key/value pairs of a properties file; later keys override earlier ones
struct Properties {
    values: FxHashMap<String, String>,
}

impl Properties {
    fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let split = line.find(['=', ':'])?;
                let (key, value) = line.split_at(split);
                Some((key.trim().to_string(), value[1..].trim().to_string()))
            })
            .collect();
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| PipelineError::configuration(format!("missing required key {key}")))
    }

    fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
        value.parse().map_err(|_| {
            PipelineError::configuration(format!("invalid value '{value}' for {key}"))
        })
    }

    fn parse_required<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        Self::parse_value(key, self.required(key)?)
    }

    fn parse_optional<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| Self::parse_value(key, value))
            .transpose()
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }
}
