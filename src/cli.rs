use crate::training::TrainingConfig;
use anyhow::Context;
use burn::prelude::*;
use std::path::{Path, PathBuf};

pub const HELP: &str = "\
Burn Fashion

Trains a small convolutional classifier on Fashion-MNIST, evaluates it on the test split
and renders a 3x3 grid of sample predictions.

USAGE:
    burn-fashion [OPTIONS]

Running without options reproduces the reference run: batch size 32, 10 hidden channels,
learning rate 0.1 and 3 epochs of plain gradient descent.

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -d, --data-dir <PATH>       Dataset cache directory, files are downloaded on first use [default: data]
    -o, --output <PATH>         Directory receiving training_config.json and predictions.png [default: out]
    -c, --training-config <PATH>
                                Load the training configuration from this json file
    -s, --samples-seed <N>      Seed used to draw the displayed test samples [default: training seed]

ENVIRONMENT:
    RUST_LOG                    Log filter, defaults to `info`
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppArgs {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub training_config: Option<PathBuf>,
    pub samples_seed: Option<u64>,
}

impl AppArgs {
    pub fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{}", HELP);
            std::process::exit(0);
        }

        Self::parse_from(pargs)
    }

    pub fn parse_from(mut pargs: pico_args::Arguments) -> Result<Self, pico_args::Error> {
        let args = AppArgs {
            data_dir: pargs
                .opt_value_from_os_str(["-d", "--data-dir"], parse_path)?
                .unwrap_or_else(|| "data".into()),
            output_dir: pargs
                .opt_value_from_os_str(["-o", "--output"], parse_path)?
                .unwrap_or_else(|| "out".into()),
            training_config: pargs
                .opt_value_from_os_str(["-c", "--training-config"], parse_path)?,
            samples_seed: pargs.opt_value_from_str(["-s", "--samples-seed"])?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(pico_args::Error::UnusedArgsLeft(
                remaining
                    .into_iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            ));
        }

        Ok(args)
    }

    pub fn create_output_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("failed to create {:?}", self.output_dir))
    }

    /// The training config given with `--training-config`, if any.
    pub fn load_training_config(&self) -> anyhow::Result<Option<TrainingConfig>> {
        self.training_config
            .as_deref()
            .map(load_training_config)
            .transpose()
    }

    pub fn save_training_config(&self, training_config: &TrainingConfig) -> anyhow::Result<()> {
        let path = self
            .output_dir
            .join(TRAINING_CONFIG_NAME)
            .with_extension("json");
        log::info!("Saving training config into {path:?}");
        training_config
            .save(&path)
            .with_context(|| format!("failed to save the training config into {path:?}"))
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir.join(PREDICTIONS_NAME).with_extension("png")
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(s.into())
}

pub const TRAINING_CONFIG_NAME: &str = "training_config";
pub const PREDICTIONS_NAME: &str = "predictions";

pub fn load_training_config(path: &Path) -> anyhow::Result<TrainingConfig> {
    log::info!("Loading training config from {path:?}");
    TrainingConfig::load(path)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("failed to load the training config from {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args_from<I, S>(args: I) -> Result<AppArgs, pico_args::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        AppArgs::parse_from(pico_args::Arguments::from_vec(
            args.into_iter().map(Into::into).collect(),
        ))
    }

    #[test]
    fn defaults_without_arguments() {
        let args = args_from(Vec::<String>::new()).unwrap();
        assert_eq!(
            args,
            AppArgs {
                data_dir: "data".into(),
                output_dir: "out".into(),
                training_config: None,
                samples_seed: None,
            }
        );
        assert_eq!(args.predictions_path(), PathBuf::from("out/predictions.png"));
    }

    #[test]
    fn parses_every_option() {
        let args = args_from([
            "--data-dir",
            "/tmp/cache",
            "-o",
            "/tmp/out",
            "-c",
            "config.json",
            "--samples-seed",
            "9",
        ])
        .unwrap();
        assert_eq!(args.data_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(args.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(args.training_config, Some(PathBuf::from("config.json")));
        assert_eq!(args.samples_seed, Some(9));
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(matches!(
            args_from(["--epochs", "3"]),
            Err(pico_args::Error::UnusedArgsLeft(_))
        ));
        assert!(args_from(["-s", "not-a-number"]).is_err());
    }

    #[test]
    fn training_config_round_trip() {
        let tmp = temp_dir::TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let args = args_from([OsString::from("-o"), out.clone().into_os_string()]).unwrap();
        args.create_output_dir().unwrap();

        let config = TrainingConfig::default().with_batch_size(64);
        args.save_training_config(&config).unwrap();

        let args = AppArgs {
            training_config: Some(out.join("training_config.json")),
            ..args
        };
        let loaded = args.load_training_config().unwrap().unwrap();
        assert_eq!(loaded.batch_size, 64);

        let missing = AppArgs {
            training_config: Some(out.join("missing.json")),
            ..args
        };
        assert!(missing.load_training_config().is_err());
    }
}
