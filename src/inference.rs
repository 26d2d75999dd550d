use crate::data::FashionMnistItem;
use crate::data::batcher::item_to_tensor;
use crate::metrics::argmax_rows;
use crate::model::FashionCnn;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Per-sample class probability distributions, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    /// # Shape
    /// [samples, num_classes]
    pub probabilities: Vec<Vec<f32>>,
}

impl Predictions {
    /// The most probable class of each sample.
    pub fn classes(&self) -> Vec<usize> {
        argmax_rows(&self.probabilities)
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Runs each item on its own through the model and converts the logits into probabilities.
///
/// The model is expected to be on a non-autodiff backend (see
/// [`AutodiffModule::valid`](burn::module::AutodiffModule::valid)), so that no gradient is tracked.
pub fn predict<B: Backend>(
    model: &FashionCnn<B>,
    items: &[FashionMnistItem],
    device: &B::Device,
) -> Predictions {
    let probabilities = items
        .iter()
        .map(|item| {
            let sample: Tensor<B, 4> = item_to_tensor::<B>(item, device).unsqueeze_dim(0);
            let logits = model.forward(sample);
            let [1, num_classes] = logits.dims() else {
                panic!("expected a single row of logits, got {:?}", logits.dims())
            };

            let probs: Tensor<B, 1> = softmax(logits, 1).squeeze_dim(0);
            debug_assert_eq!([num_classes], probs.dims());
            probs.into_data().iter::<f32>().collect()
        })
        .collect();

    Predictions { probabilities }
}

/// Draws `k` distinct items (all of them if the dataset is smaller), reproducibly for a given seed.
pub fn sample_items<D: Dataset<FashionMnistItem>>(
    dataset: &D,
    k: usize,
    seed: u64,
) -> Vec<FashionMnistItem> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amount = k.min(dataset.len());
    rand::seq::index::sample(&mut rng, dataset.len(), amount)
        .into_iter()
        .filter_map(|index| dataset.get(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::tagged_dataset;
    use crate::model::FashionCnnConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn items(count: usize) -> Vec<FashionMnistItem> {
        tagged_dataset(count).iter().collect()
    }

    #[test]
    fn rows_are_probability_distributions() {
        let device = Default::default();
        let model: FashionCnn<TestBackend> = FashionCnnConfig::new().init(&device);

        let predictions = predict(&model, &items(5), &device);
        assert_eq!(predictions.len(), 5);
        for row in &predictions.probabilities {
            assert_eq!(row.len(), 10);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "row sums to {sum}");
        }
        assert!(predictions.classes().iter().all(|class| *class < 10));
    }

    #[test]
    fn inference_is_deterministic() {
        let device = Default::default();
        let model: FashionCnn<TestBackend> = FashionCnnConfig::new().init(&device);
        let items = items(4);

        let first = predict(&model, &items, &device);
        let second = predict(&model, &items, &device);
        let bits = |p: &Predictions| -> Vec<u32> {
            p.probabilities.iter().flatten().map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn keeps_the_input_order() {
        let device = Default::default();
        let model: FashionCnn<TestBackend> = FashionCnnConfig::new().init(&device);
        let items = items(3);

        let all = predict(&model, &items, &device);
        let reversed: Vec<_> = items.iter().rev().cloned().collect();
        let mut reversed = predict(&model, &reversed, &device).probabilities;
        reversed.reverse();
        assert_eq!(all.probabilities, reversed);
    }

    #[test]
    fn samples_are_distinct_and_reproducible() {
        let dataset = tagged_dataset(50);
        let tag = |item: &FashionMnistItem| item.image[0] as usize * 256 + item.image[1] as usize;

        let first: Vec<usize> = sample_items(&dataset, 9, 3).iter().map(tag).collect();
        let second: Vec<usize> = sample_items(&dataset, 9, 3).iter().map(tag).collect();
        assert_eq!(first, second);

        let mut unique = first.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 9);

        assert_eq!(sample_items(&dataset, 100, 0).len(), 50);
    }
}
