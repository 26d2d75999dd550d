pub mod batcher;
pub mod dataset;

pub use batcher::{FashionDataLoader, FashionMnistBatch, FashionMnistBatcher, build_dataloader};
pub use dataset::{DatasetError, FashionMnistDataset, FashionMnistItem, HEIGHT, Split, WIDTH};
