//! Classification statistics for a verification run

use std::fmt;

use super::predicted_class;

/// Confusion matrix and derived statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// `confusion[actual][predicted]`
    confusion: Vec<Vec<usize>>,
}

impl Evaluation {
    /// Build an evaluation from true classes and classifier output
    ///
    /// Output rows beyond the label count are ignored, as are classes outside
    /// `class_count`.
    #[must_use]
    pub fn from_output<P: AsRef<[f32]>>(actual: &[usize], output: &[P], class_count: usize) -> Self {
        let mut confusion = vec![vec![0; class_count]; class_count];
        for (&actual, probabilities) in actual.iter().zip(output) {
            let predicted = predicted_class(probabilities.as_ref());
            if actual < class_count && predicted < class_count {
                confusion[actual][predicted] += 1;
            }
        }
        Self { confusion }
    }

    /// Number of evaluated rows
    #[must_use]
    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    /// Rows predicted correctly
    #[must_use]
    pub fn correct(&self) -> usize {
        (0..self.confusion.len()).map(|c| self.confusion[c][c]).sum()
    }

    /// Fraction of rows predicted correctly
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Precision of one class, `None` if it was never predicted
    #[must_use]
    pub fn precision(&self, class: usize) -> Option<f64> {
        let predicted: usize = self.confusion.iter().map(|row| row[class]).sum();
        (predicted > 0).then(|| ratio(self.confusion[class][class], predicted))
    }

    /// Recall of one class, `None` if it never occurred
    #[must_use]
    pub fn recall(&self, class: usize) -> Option<f64> {
        let actual: usize = self.confusion[class].iter().sum();
        (actual > 0).then(|| ratio(self.confusion[class][class], actual))
    }

    /// Precision averaged over the classes that were predicted
    #[must_use]
    pub fn macro_precision(&self) -> f64 {
        mean((0..self.confusion.len()).filter_map(|c| self.precision(c)))
    }

    /// Recall averaged over the classes that occurred
    #[must_use]
    pub fn macro_recall(&self) -> f64 {
        mean((0..self.confusion.len()).filter_map(|c| self.recall(c)))
    }

    /// Harmonic mean of macro precision and recall
    #[must_use]
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.macro_precision(), self.macro_recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// Raw confusion matrix
    #[must_use]
    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    /// Log the statistics line by line
    pub fn log(&self) {
        for line in self.to_string().lines() {
            log::info!("{line}");
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========================Evaluation Metrics========================")?;
        writeln!(f, " # of classes: {}", self.confusion.len())?;
        writeln!(f, " Examples:     {}", self.total())?;
        writeln!(f, " Accuracy:     {:.4}", self.accuracy())?;
        writeln!(f, " Precision:    {:.4}", self.macro_precision())?;
        writeln!(f, " Recall:       {:.4}", self.macro_recall())?;
        writeln!(f, " F1 Score:     {:.4}", self.f1())?;
        writeln!(f, "=========================Confusion Matrix=========================")?;
        for (actual, row) in self.confusion.iter().enumerate() {
            let cells = row.iter().map(|n| format!("{n:>5}")).collect::<String>();
            writeln!(f, "{actual:>3} |{cells}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        let actual = [0, 1, 1, 2];
        let output = [
            vec![0.9, 0.1, 0.0],
            vec![0.2, 0.7, 0.1],
            vec![0.6, 0.3, 0.1],
            vec![0.1, 0.1, 0.8],
        ];
        let eval = Evaluation::from_output(&actual, &output, 3);

        assert_eq!(eval.total(), 4);
        assert_eq!(eval.correct(), 3);
        assert!((eval.accuracy() - 0.75).abs() < 1e-9);
        assert_eq!(eval.precision(0), Some(0.5));
        assert_eq!(eval.recall(1), Some(0.5));
        assert_eq!(eval.confusion_matrix()[1], vec![1, 1, 0]);
    }

    #[test]
    fn test_empty_evaluation() {
        let eval = Evaluation::from_output::<Vec<f32>>(&[], &[], 11);
        assert_eq!(eval.total(), 0);
        assert_eq!(eval.accuracy(), 0.0);
        assert_eq!(eval.precision(3), None);
    }
}
