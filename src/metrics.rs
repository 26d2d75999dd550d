use burn::prelude::*;

/// Fraction of predictions equal to their true label, in `[0, 1]`.
///
/// An empty input has an accuracy of `0.0`.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    assert_eq!(
        y_true.len(),
        y_pred.len(),
        "every prediction needs a true label"
    );
    if y_true.is_empty() {
        return 0.;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(truth, pred)| truth == pred)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Index of the highest score of each row.
pub fn argmax_rows(rows: &[Vec<f32>]) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 { (i, v) } else { best }
                })
                .0
        })
        .collect()
}

/// Accuracy of a batch of logits against its targets.
///
/// # Shapes
///   - logits [batch, num_classes]
///   - targets [batch]
pub fn batch_accuracy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    let y_pred = int_values(logits.argmax(1).squeeze_dim(1));
    let y_true = int_values(targets);
    accuracy(&y_true, &y_pred)
}

fn int_values<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<usize> {
    tensor
        .into_data()
        .iter::<i64>()
        .map(|v| v as usize)
        .collect()
}

/// Loss and accuracy averaged over the batches of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpochMetrics {
    pub loss: f64,
    /// In `[0, 1]`.
    pub accuracy: f64,
}

#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    loss_sum: f64,
    accuracy_sum: f64,
    batches: usize,
}

impl MetricsAccumulator {
    pub fn update(&mut self, loss: f64, accuracy: f64) {
        self.loss_sum += loss;
        self.accuracy_sum += accuracy;
        self.batches += 1;
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Averages over the number of batches seen so far.
    pub fn finish(&self) -> EpochMetrics {
        if self.batches == 0 {
            return EpochMetrics::default();
        }
        let n = self.batches as f64;
        EpochMetrics {
            loss: self.loss_sum / n,
            accuracy: self.accuracy_sum / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn accuracy_bounds() {
        assert_eq!(accuracy(&[1, 2, 3], &[1, 2, 3]), 1.0);
        assert_eq!(accuracy(&[1, 2, 3], &[0, 0, 0]), 0.0);
        assert_eq!(accuracy(&[1, 2, 3, 4], &[1, 0, 3, 0]), 0.5);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    #[should_panic]
    fn accuracy_rejects_mismatched_lengths() {
        accuracy(&[1, 2], &[1]);
    }

    #[test]
    fn argmax_picks_the_highest_score() {
        let rows = vec![vec![0.1, 0.7, 0.2], vec![0.5, 0.1, 0.4], vec![-3., -2., -1.]];
        assert_eq!(argmax_rows(&rows), vec![1, 0, 2]);
    }

    #[test]
    fn batch_accuracy_uses_argmax_of_logits() {
        let device = Default::default();
        let mut logits = vec![0f32; 2 * 10];
        logits[3] = 5.; // sample 0 -> class 3
        logits[10 + 5] = 5.; // sample 1 -> class 5
        let logits = Tensor::<TestBackend, 1>::from_floats(logits.as_slice(), &device).reshape([2, 10]);

        let targets = Tensor::<TestBackend, 1, Int>::from_ints([3, 5], &device);
        assert_eq!(batch_accuracy(logits.clone(), targets), 1.0);

        let targets = Tensor::<TestBackend, 1, Int>::from_ints([4, 6], &device);
        assert_eq!(batch_accuracy(logits, targets), 0.0);
    }

    #[test]
    fn accumulator_averages_over_batches() {
        let mut metrics = MetricsAccumulator::default();
        assert_eq!(metrics.finish(), EpochMetrics::default());

        metrics.update(1.0, 0.5);
        metrics.update(3.0, 1.0);
        assert_eq!(metrics.batches(), 2);
        assert_eq!(
            metrics.finish(),
            EpochMetrics {
                loss: 2.0,
                accuracy: 0.75
            }
        );
    }
}
