//! Deterministic shuffling and train/verification splitting

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{PipelineError, Result};

/// Shuffle rows with a permutation fully determined by `seed`
///
/// This seed is independent of the one initialising the classifier.
#[must_use]
pub fn shuffle<T>(mut rows: Vec<T>, seed: u64) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    rows
}

/// Training and verification views over the same rows
#[derive(Debug, Clone, Copy)]
pub struct Partition<'a, T> {
    /// Rows used for training
    pub training: &'a [T],
    /// Rows used for verification
    pub verification: &'a [T],
}

impl<T> Partition<'_, T> {
    /// Whether verification reuses the training rows
    #[must_use]
    pub fn is_self_evaluation(&self) -> bool {
        std::ptr::eq(self.training, self.verification)
    }
}

/// Slice rows into training and verification partitions
///
/// A negative `train_size` puts every row in both partitions. Otherwise
/// training is `[0, train_size)` and verification `[train_size + 1, len)`;
/// the row at `train_size` belongs to neither.
///
/// # Errors
/// Returns a configuration error if `train_size` exceeds the row count
pub fn split<T>(rows: &[T], train_size: i64) -> Result<Partition<'_, T>> {
    let Ok(train_size) = usize::try_from(train_size) else {
        return Ok(Partition {
            training: rows,
            verification: rows,
        });
    };

    if train_size > rows.len() {
        return Err(PipelineError::configuration(format!(
            "training.data.size {train_size} exceeds the {} available training rows",
            rows.len()
        )));
    }

    let verification = rows.get(train_size + 1..).unwrap_or_default();
    Ok(Partition {
        training: &rows[..train_size],
        verification,
    })
}
