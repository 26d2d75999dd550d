use anyhow::Context;
use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn_fashion::backend::{MainAutoBackend, MainBackend, MainDevice};
use burn_fashion::cli::AppArgs;
use burn_fashion::prelude::*;

/// Number of displayed test samples, laid out as a `GRID_SIDE x GRID_SIDE` grid.
const GRID_SIDE: usize = 3;

pub fn launch<B, AutoB>(app_args: &AppArgs) -> anyhow::Result<()>
where
    B: Backend + MainDevice,
    AutoB: AutodiffBackend<InnerBackend = B> + MainDevice,
{
    log::info!("Using the {} backend", AutoB::backend_name());
    app_args.create_output_dir()?;

    let training_config = app_args
        .load_training_config()?
        .unwrap_or_default();
    app_args.save_training_config(&training_config)?;

    let train = FashionMnistDataset::train(&app_args.data_dir)
        .context("failed to load the training split")?;
    let test = FashionMnistDataset::test(&app_args.data_dir)
        .context("failed to load the test split")?;

    // drawn before the test split is handed over to the training loop
    let samples_seed = app_args.samples_seed.unwrap_or(training_config.seed);
    let samples = sample_items(&test, GRID_SIDE * GRID_SIDE, samples_seed);

    let training_device = AutoB::main_device();
    let outcome =
        run_training::<AutoB>(&training_config, TrainingData { train, test }, &training_device);

    let infer_device = B::main_device();
    let model = outcome.model.valid();
    let predictions = predict::<B>(&model, &samples, &infer_device);

    let truth: Vec<usize> = samples.iter().map(|item| item.label as usize).collect();
    let predicted = predictions.classes();
    log::info!(
        "Sample accuracy: {:.2}",
        accuracy(&truth, &predicted)
    );

    let images = samples.into_iter().map(|item| item.image).collect();
    let grid = PredictionGrid::from_parts(images, &predicted, &truth, GRID_SIDE, GRID_SIDE)?;
    grid.save(app_args.predictions_path())
        .context("failed to save the prediction grid")?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_args = AppArgs::parse()?;
    launch::<MainBackend, MainAutoBackend>(&app_args)
}
