//! Multinomial logistic regression classifier
//!
//! Inputs are standardised with statistics fitted on the training set, the
//! weights start from a seeded Xavier-uniform draw, and training runs
//! full-batch gradient descent with L2 regularisation and a stepwise
//! learning-rate decay.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{ClassProbabilities, Classifier, Dataset, Evaluation, SEVERITY_CLASS_COUNT};
use crate::error::util::{safe_read_to_string, safe_write};
use crate::error::{PipelineError, Result};
use crate::utils::logging::progress::{create_main_progress_bar, finish_progress_bar};

/// Learning rate never decays below this value
const MIN_LEARNING_RATE: f32 = 1e-3;

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct SoftmaxConfig {
    /// Number of output classes
    pub class_count: usize,
    /// Passes over the training set
    pub epochs: usize,
    /// Initial learning rate
    pub learning_rate: f32,
    /// L2 penalty on the weights
    pub l2: f32,
    /// Seed of the weight initialisation
    pub seed: u64,
    /// Epoch interval of the monitor evaluation, `None` disables it
    pub evaluate_every: Option<usize>,
    /// Epoch interval of the learning-rate decay
    pub decay_every: usize,
    /// Amount subtracted from the learning rate at each decay
    pub decay_step: f32,
}

impl Default for SoftmaxConfig {
    fn default() -> Self {
        Self {
            class_count: SEVERITY_CLASS_COUNT,
            epochs: 1000,
            learning_rate: 0.6,
            l2: 1e-4,
            seed: 123,
            evaluate_every: None,
            decay_every: 25_000,
            decay_step: 0.05,
        }
    }
}

/// Fitted parameters, persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    /// Number of output classes
    pub class_count: usize,
    /// Per-input mean of the training set
    pub means: Vec<f32>,
    /// Per-input standard deviation of the training set (1 where constant)
    pub scales: Vec<f32>,
    /// `weights[class][input]`
    pub weights: Vec<Vec<f32>>,
    /// Bias per class
    pub bias: Vec<f32>,
}

impl SoftmaxModel {
    /// Check that every per-class and per-input vector has the model's width
    ///
    /// # Errors
    /// Returns a classifier error naming the first inconsistent vector
    pub fn validate(&self) -> Result<()> {
        let width = self.means.len();
        if self.weights.len() != self.class_count || self.bias.len() != self.class_count {
            return Err(PipelineError::classifier(format!(
                "model has {} weight rows and {} biases for {} classes",
                self.weights.len(),
                self.bias.len(),
                self.class_count
            )));
        }
        if self.scales.len() != width {
            return Err(PipelineError::classifier(format!(
                "model has {} scales for {width} inputs",
                self.scales.len()
            )));
        }
        if let Some(class) = self.weights.iter().position(|row| row.len() != width) {
            return Err(PipelineError::classifier(format!(
                "weight row of class {class} has {} entries for {width} inputs",
                self.weights[class].len()
            )));
        }
        if self.scales.iter().any(|scale| *scale == 0.0 || !scale.is_finite()) {
            return Err(PipelineError::classifier("model has a zero or non-finite scale"));
        }
        Ok(())
    }

    fn standardise(&self, inputs: &[f32]) -> Vec<f32> {
        inputs
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }

    fn probabilities(&self, standardised: &[f32]) -> ClassProbabilities {
        let logits: ClassProbabilities = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(standardised).map(|(w, x)| w * x).sum::<f32>())
            .collect();
        softmax(&logits)
    }
}

fn softmax(logits: &[f32]) -> ClassProbabilities {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: ClassProbabilities = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Classifier backed by a [`SoftmaxModel`]
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier {
    config: SoftmaxConfig,
    model: Option<SoftmaxModel>,
}

impl SoftmaxClassifier {
    /// Create an untrained classifier
    #[must_use]
    pub fn new(config: SoftmaxConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Fitted model, if trained or loaded
    #[must_use]
    pub fn model(&self) -> Option<&SoftmaxModel> {
        self.model.as_ref()
    }

    fn initial_model(&self, training: &Dataset) -> SoftmaxModel {
        let width = training.width();
        let n = training.len() as f32;

        let mut means = vec![0.0f32; width];
        for row in training.features() {
            for (mean, x) in means.iter_mut().zip(row) {
                *mean += x / n;
            }
        }
        let mut scales = vec![0.0f32; width];
        for row in training.features() {
            for ((scale, mean), x) in scales.iter_mut().zip(&means).zip(row) {
                *scale += (x - mean).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = if *scale > f32::EPSILON { scale.sqrt() } else { 1.0 };
        }

        let classes = self.config.class_count;
        let limit = (6.0 / (width + classes) as f32).sqrt();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let weights = (0..classes)
            .map(|_| (0..width).map(|_| rng.random_range(-limit..limit)).collect())
            .collect();

        SoftmaxModel {
            class_count: classes,
            means,
            scales,
            weights,
            bias: vec![0.0; classes],
        }
    }

    fn check_width(model: &SoftmaxModel, data: &Dataset) -> Result<()> {
        if !data.is_empty() && data.width() != model.means.len() {
            return Err(PipelineError::classifier(format!(
                "model expects {} inputs but rows have {}",
                model.means.len(),
                data.width()
            )));
        }
        Ok(())
    }
}

impl Classifier for SoftmaxClassifier {
    fn class_count(&self) -> usize {
        self.model
            .as_ref()
            .map_or(self.config.class_count, |m| m.class_count)
    }

    fn train(&mut self, training: &Dataset, monitor: Option<&Dataset>) -> Result<()> {
        if training.is_empty() {
            return Err(PipelineError::classifier("training set is empty"));
        }
        if let Some(&class) = training.labels().iter().find(|&&c| c >= self.config.class_count) {
            return Err(PipelineError::classifier(format!(
                "training label {class} exceeds {} classes",
                self.config.class_count
            )));
        }

        let mut model = self.initial_model(training);
        let inputs: Vec<Vec<f32>> = training
            .features()
            .iter()
            .map(|row| model.standardise(row))
            .collect();
        let classes = model.class_count;
        let width = model.means.len();
        let n = training.len() as f32;
        let mut learning_rate = self.config.learning_rate;

        log::info!(
            "Training softmax classifier: {} rows, {width} inputs, {classes} classes, {} epochs, seed {}",
            training.len(),
            self.config.epochs,
            self.config.seed
        );
        let pb = create_main_progress_bar(self.config.epochs as u64, Some("Training"));

        for epoch in 0..self.config.epochs {
            if let (Some(every), Some(monitor)) = (self.config.evaluate_every, monitor) {
                if every > 0 && epoch % every == 0 && !monitor.is_empty() {
                    let output = monitor
                        .features()
                        .iter()
                        .map(|row| model.probabilities(&model.standardise(row)))
                        .collect::<Vec<_>>();
                    log::info!("Evaluation at epoch {epoch}");
                    Evaluation::from_output(monitor.labels(), &output, classes).log();
                }
            }
            if self.config.decay_every > 0 && epoch % self.config.decay_every == 0 {
                let next = (learning_rate - self.config.decay_step).max(MIN_LEARNING_RATE);
                log::info!("setting the learning rate from {learning_rate} to {next}");
                learning_rate = next;
            }

            let mut grad_w = vec![vec![0.0f32; width]; classes];
            let mut grad_b = vec![0.0f32; classes];
            for (x, &label) in inputs.iter().zip(training.labels()) {
                let p = model.probabilities(x);
                for class in 0..classes {
                    let error = p[class] - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += error;
                    for (g, xi) in grad_w[class].iter_mut().zip(x) {
                        *g += error * xi;
                    }
                }
            }
            for class in 0..classes {
                model.bias[class] -= learning_rate * grad_b[class] / n;
                for (w, g) in model.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= learning_rate * (g / n + self.config.l2 * *w);
                }
            }
            pb.inc(1);
        }
        finish_progress_bar(&pb, Some("Training complete"));

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, data: &Dataset) -> Result<Vec<ClassProbabilities>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::classifier("classifier has not been trained or loaded"))?;
        Self::check_width(model, data)?;
        Ok(data
            .features()
            .iter()
            .map(|row| model.probabilities(&model.standardise(row)))
            .collect())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::classifier("cannot save an untrained classifier"))?;
        safe_write(path, &serde_json::to_string_pretty(model)?, "saving the classifier")
    }

    fn load(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "loading a saved classifier")?;
        let model: SoftmaxModel = serde_json::from_str(&content)?;
        model.validate().map_err(|e| {
            PipelineError::classifier(format!("saved model at {}: {e}", path.display()))
        })?;
        Ok(Self {
            config: SoftmaxConfig {
                class_count: model.class_count,
                ..SoftmaxConfig::default()
            },
            model: Some(model),
        })
    }
}
