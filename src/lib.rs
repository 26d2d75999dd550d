pub mod backend;
pub mod classes;
pub mod cli;
pub mod data;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod training;
pub mod visualize;

pub mod prelude {
    pub use crate::classes::{CLASS_NAMES, FashionClass, NUM_CLASSES};
    pub use crate::data::{FashionMnistDataset, FashionMnistItem};
    pub use crate::inference::{Predictions, predict, sample_items};
    pub use crate::metrics::{EpochMetrics, accuracy};
    pub use crate::model::{FashionCnn, FashionCnnConfig};
    pub use crate::training::{TrainingConfig, TrainingData, TrainingOutcome, run_training};
    pub use crate::visualize::{GridCell, PredictionGrid, TitleColor};
}
