use crate::data::{FashionDataLoader, FashionMnistDataset, build_dataloader};
use crate::metrics::{EpochMetrics, MetricsAccumulator, batch_accuracy};
use crate::model::{FashionCnn, FashionCnnConfig};
use burn::prelude::*;
use burn::{
    data::dataloader::Progress,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    tensor::backend::AutodiffBackend,
    train::metric::{AccuracyMetric, Adaptor, LossMetric, Metric, MetricMetadata, Numeric},
};

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: FashionCnnConfig,
    pub optimizer: SgdConfig,
    #[config(default = 3)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 0.1)]
    pub lr: f64,
    #[config(default = 42)]
    pub seed: u64,
    /// Number of batches between progress logs.
    #[config(default = 400)]
    pub log_interval: usize,
}

/// Plain gradient descent: no momentum, no weight decay, no gradient clipping.
pub fn optimizer_config() -> SgdConfig {
    SgdConfig::new()
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(FashionCnnConfig::new(), optimizer_config())
    }
}

pub struct TrainingData {
    pub train: FashionMnistDataset,
    pub test: FashionMnistDataset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    pub train: EpochMetrics,
    pub test: EpochMetrics,
}

pub struct TrainingOutcome<AutoB: AutodiffBackend> {
    pub model: FashionCnn<AutoB>,
    pub history: Vec<EpochSummary>,
}

/// Initializes a model from `config` and trains it on `data.train` for `config.num_epochs`,
/// evaluating on `data.test` after every epoch.
pub fn run_training<AutoB: AutodiffBackend>(
    config: &TrainingConfig,
    data: TrainingData,
    device: &AutoB::Device,
) -> TrainingOutcome<AutoB> {
    AutoB::seed(device, config.seed);

    let mut model: FashionCnn<AutoB> = config.model.init(device);
    let mut optim = config.optimizer.init::<AutoB, FashionCnn<AutoB>>();
    log::info!("Initialized model:\n{model}");

    let dataloader_train =
        build_dataloader::<AutoB>(data.train, config.batch_size, Some(config.seed));
    let dataloader_test =
        build_dataloader::<AutoB::InnerBackend>(data.test, config.batch_size, None);

    log::info!(
        "Starting training: {} epochs, {} training items, {} test items",
        config.num_epochs,
        dataloader_train.num_items(),
        dataloader_test.num_items()
    );
    let mut history = Vec::with_capacity(config.num_epochs);
    for epoch in 0..config.num_epochs {
        println!("Epoch: {epoch}\n-------");
        let (trained, train) = train_epoch(&dataloader_train, model, &mut optim, config, epoch);
        model = trained;

        let test = evaluate(&dataloader_test, &model.valid());
        history.push(EpochSummary { epoch, train, test });
    }
    log::info!("Training finished.");

    TrainingOutcome { model, history }
}

/// Runs one pass over `dataloader`, updating the model after every batch.
///
/// `epoch` counts from zero. Every `config.log_interval` batches the running loss and
/// accuracy (in percent) of burn's metrics are logged.
///
/// Returns the updated model along with the loss and accuracy averaged over the batches.
pub fn train_epoch<AutoB, O>(
    dataloader: &FashionDataLoader<AutoB>,
    mut model: FashionCnn<AutoB>,
    optim: &mut O,
    config: &TrainingConfig,
    epoch: usize,
) -> (FashionCnn<AutoB>, EpochMetrics)
where
    AutoB: AutodiffBackend,
    O: Optimizer<FashionCnn<AutoB>, AutoB>,
{
    let mut metrics = MetricsAccumulator::default();
    let num_batches = dataloader.num_items().div_ceil(config.batch_size);

    let mut metric_meta = MetricMetadata {
        progress: Progress::new(0, dataloader.num_items()),
        epoch: epoch + 1,
        epoch_total: config.num_epochs,
        iteration: 0,
        lr: Some(config.lr),
    };
    let mut loss_metric = LossMetric::<AutoB>::new();
    let mut acc_metric = AccuracyMetric::<AutoB>::new();

    for batch in dataloader.iter() {
        let [batch_size] = batch.targets.dims();
        metric_meta.iteration += 1;
        metric_meta.progress.items_processed += batch_size;

        let output = model.forward_classification(batch.images, batch.targets);
        loss_metric.update(&output.adapt(), &metric_meta);
        acc_metric.update(&output.adapt(), &metric_meta);

        let loss = output.loss.clone().into_scalar().elem::<f64>();
        let acc = batch_accuracy(output.output.clone(), output.targets.clone());
        metrics.update(loss, acc);

        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.lr, model, grads);

        let b = metrics.batches();
        if config.log_interval != 0 && b % config.log_interval == 0 {
            log::info!(
                "Epoch {}/{}, Batch {b:0>4}/{num_batches}, Loss {:.4}, Acc {:0>6.2}",
                metric_meta.epoch,
                metric_meta.epoch_total,
                loss_metric.running_value().current(),
                acc_metric.running_value().current(),
            );
        }
    }

    let metrics = metrics.finish();
    println!(
        "Train loss: {:.5} | Train acc: {:.2}",
        metrics.loss, metrics.accuracy
    );
    (model, metrics)
}

/// Computes the averaged loss and accuracy of `model` over `dataloader`, without gradients.
pub fn evaluate<B: Backend>(dataloader: &FashionDataLoader<B>, model: &FashionCnn<B>) -> EpochMetrics {
    let mut metrics = MetricsAccumulator::default();
    for batch in dataloader.iter() {
        let output = model.forward_classification(batch.images, batch.targets);
        let loss = output.loss.into_scalar().elem::<f64>();
        metrics.update(loss, batch_accuracy(output.output, output.targets));
    }

    let metrics = metrics.finish();
    println!(
        "Test loss: {:.5} | Test acc: {:.2}",
        metrics.loss, metrics.accuracy
    );
    metrics
}
