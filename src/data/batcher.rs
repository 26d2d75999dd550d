use super::dataset::{FashionMnistDataset, FashionMnistItem, HEIGHT, WIDTH};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::prelude::*;
use std::sync::Arc;

pub type FashionDataLoader<B> = Arc<dyn DataLoader<B, FashionMnistBatch<B>>>;

#[derive(Clone, Default)]
pub struct FashionMnistBatcher {}

#[derive(Clone, Debug)]
pub struct FashionMnistBatch<B: Backend> {
    /// The input feature is the brightness scaled into `[0, 1]`,
    /// i.e. `value / 255`, with no further normalization.
    ///
    /// # Shape
    /// [batch_size, 1, HEIGHT, WIDTH]
    pub images: Tensor<B, 4>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Converts a single item into a `[1, HEIGHT, WIDTH]` image tensor scaled into `[0, 1]`.
pub fn item_to_tensor<B: Backend>(item: &FashionMnistItem, device: &B::Device) -> Tensor<B, 3> {
    let data = TensorData::new(item.image.clone(), [1, HEIGHT, WIDTH]).convert::<B::FloatElem>();
    Tensor::<B, 3>::from_data(data, device) / 255
}

impl<B: Backend> Batcher<B, FashionMnistItem, FashionMnistBatch<B>> for FashionMnistBatcher {
    fn batch(&self, items: Vec<FashionMnistItem>, device: &B::Device) -> FashionMnistBatch<B> {
        let images: Vec<Tensor<B, 3>> = items
            .iter()
            .map(|item| item_to_tensor::<B>(item, device))
            .collect();

        let targets: Vec<Tensor<B, 1, Int>> = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data([(item.label as i64).elem::<B::IntElem>()], device)
            })
            .collect();

        let images = Tensor::stack(images, 0);
        let targets = Tensor::cat(targets, 0);

        FashionMnistBatch { images, targets }
    }
}

/// Builds a single-threaded dataloader over `dataset`.
///
/// With `shuffle = Some(seed)` every pass visits the items in a new random order,
/// otherwise the dataset order is kept. Each pass yields `ceil(len / batch_size)`
/// batches, the last one possibly smaller.
pub fn build_dataloader<B: Backend>(
    dataset: FashionMnistDataset,
    batch_size: usize,
    shuffle: Option<u64>,
) -> FashionDataLoader<B> {
    assert!(batch_size > 0, "the batch size must be positive");
    let builder = DataLoaderBuilder::new(FashionMnistBatcher::default()).batch_size(batch_size);
    let builder = match shuffle {
        Some(seed) => builder.shuffle(seed),
        None => builder,
    };
    builder.build(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::tagged_dataset;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    /// Recovers the item indices encoded in the first two pixels.
    fn batch_indices(batch: &FashionMnistBatch<TestBackend>) -> Vec<usize> {
        let [batch_size, 1, HEIGHT, WIDTH] = batch.images.dims() else {
            panic!("unexpected batch shape {:?}", batch.images.dims())
        };
        let pixels: Vec<f32> = batch.images.to_data().iter::<f32>().collect();
        (0..batch_size)
            .map(|b| {
                let base = b * HEIGHT * WIDTH;
                let hi = (pixels[base] * 255.).round() as usize;
                let lo = (pixels[base + 1] * 255.).round() as usize;
                hi * 256 + lo
            })
            .collect()
    }

    fn pass(dataloader: &FashionDataLoader<TestBackend>) -> Vec<Vec<usize>> {
        dataloader.iter().map(|batch| batch_indices(&batch)).collect()
    }

    #[test]
    fn batches_cover_every_item_once() {
        for (size, batch_size) in [(10, 3), (12, 4), (1, 32), (300, 32), (5, 1)] {
            let dataloader = build_dataloader::<TestBackend>(tagged_dataset(size), batch_size, None);
            let batches = pass(&dataloader);

            assert_eq!(batches.len(), size.div_ceil(batch_size));
            for batch in &batches[..batches.len() - 1] {
                assert_eq!(batch.len(), batch_size);
            }
            assert!(batches.last().unwrap().len() <= batch_size);

            // unshuffled passes keep the dataset order
            let flat: Vec<usize> = batches.into_iter().flatten().collect();
            assert_eq!(flat, (0..size).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffled_passes_differ_but_cover_everything() {
        let size = 100;
        let dataloader = build_dataloader::<TestBackend>(tagged_dataset(size), 32, Some(7));

        let first: Vec<usize> = pass(&dataloader).into_iter().flatten().collect();
        let second: Vec<usize> = pass(&dataloader).into_iter().flatten().collect();
        assert_ne!(first, second);

        for order in [first, second] {
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..size).collect::<Vec<_>>());
        }
    }

    #[test]
    fn batch_collates_images_and_labels_in_order() {
        let device = Default::default();
        let items = vec![
            FashionMnistItem {
                image: vec![255.; HEIGHT * WIDTH],
                label: 3,
            },
            FashionMnistItem {
                image: vec![0.; HEIGHT * WIDTH],
                label: 5,
            },
        ];
        let batch: FashionMnistBatch<TestBackend> =
            FashionMnistBatcher::default().batch(items, &device);

        assert_eq!(batch.images.dims(), [2, 1, HEIGHT, WIDTH]);
        let targets: Vec<i64> = batch.targets.to_data().iter::<i64>().collect();
        assert_eq!(targets, vec![3, 5]);

        let max = batch.images.clone().max().into_scalar();
        let min = batch.images.min().into_scalar();
        assert_eq!(max, 1.0);
        assert_eq!(min, 0.0);
    }

    #[test]
    #[should_panic(expected = "batch size must be positive")]
    fn zero_batch_size_is_rejected() {
        let _ = build_dataloader::<TestBackend>(tagged_dataset(3), 0, None);
    }
}
