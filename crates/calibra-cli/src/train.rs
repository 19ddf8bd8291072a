use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::ArgMatches;

use calibra_classifiers::config::{load_pipeline_config, Objective, PipelineConfig};
use calibra_classifiers::data_handling::Dataset;
use calibra_classifiers::io::{read_dataset, CsvReaderConfig, DirectoryStore};
use calibra_classifiers::pipeline::{self, TrainedPipeline};
use calibra_classifiers::progress::default_sink;
use calibra_classifiers::report::plots;

use crate::util::{validate_table_path, write_plot_html};

/// Arguments of `calibra train`, after command-line overrides.
#[derive(Debug, Clone)]
pub struct TrainArgs {
    pub config: PipelineConfig,
    pub train_data: PathBuf,
    pub validation_data: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub write_report: bool,
}

impl TrainArgs {
    pub fn from_arguments(config_path: &Path, matches: &ArgMatches) -> Result<Self> {
        let mut config = load_pipeline_config(config_path)?;

        if let Some(floor) = matches.get_one::<f64>("recall_floor") {
            config.thresholds.recall_floor = Some(*floor);
        }
        if let Some(objective) = matches.get_one::<String>("objective") {
            config.thresholds.objective =
                Objective::from_str(objective).map_err(anyhow::Error::msg)?;
        }
        config
            .validate()
            .context("Invalid configuration after command-line overrides")?;

        let train_data = matches
            .get_one::<PathBuf>("train_data")
            .cloned()
            .context("Missing --train-data")?;
        let output_dir = matches
            .get_one::<PathBuf>("output_dir")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("calibra_model"));

        Ok(Self {
            config,
            train_data,
            validation_data: matches.get_one::<PathBuf>("validation_data").cloned(),
            output_dir,
            write_report: !matches.get_flag("no_report"),
        })
    }

    fn reader_config(&self) -> CsvReaderConfig {
        CsvReaderConfig {
            label_column: self.config.label_column.clone(),
            weight_column: self.config.weight_column.clone(),
            ..CsvReaderConfig::default()
        }
    }
}

pub fn run_training(args: &TrainArgs) -> Result<TrainedPipeline> {
    validate_table_path(&args.train_data)?;
    let reader = args.reader_config();
    let train = read_dataset(&args.train_data, &reader)?;

    let validation = match &args.validation_data {
        Some(path) => {
            validate_table_path(path)?;
            let data = read_dataset(path, &reader)?;
            if data.feature_names != train.feature_names {
                anyhow::bail!(
                    "Validation columns {:?} do not match training columns {:?}",
                    data.feature_names,
                    train.feature_names
                );
            }
            Some(data)
        }
        None => None,
    };

    let trained = pipeline::train(&args.config, &train, validation.as_ref(), default_sink())
        .context("Training failed")?;

    let store = DirectoryStore::create(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;
    trained
        .persist(&store)
        .with_context(|| format!("Failed to write artifacts to {}", args.output_dir.display()))?;
    log::info!("Model artifacts written to {}", args.output_dir.display());

    if args.write_report {
        write_report_plots(&trained, &train, &args.output_dir)?;
    }
    Ok(trained)
}

fn write_report_plots(trained: &TrainedPipeline, train: &Dataset, dir: &Path) -> Result<()> {
    let Some(report) = &trained.report else {
        return Ok(());
    };
    let (_, calibrated) = trained.calibrated_scores(&train.x)?;
    write_plot_html(
        &plots::plot_score_histogram(
            &calibrated,
            &train.y,
            "Calibrated probabilities (input rows)",
        )?,
        dir.join("score_histogram.html"),
    )?;
    write_plot_html(
        &plots::plot_precision_recall(
            &report.precision_recall_curve,
            &trained.thresholds,
            "Precision / recall (calibrated)",
        ),
        dir.join("precision_recall.html"),
    )?;
    write_plot_html(
        &plots::plot_reliability(
            &report.raw_reliability,
            &report.calibrated_reliability,
            "Reliability",
        ),
        dir.join("reliability.html"),
    )?;
    write_plot_html(
        &plots::plot_training_loss(trained.trainer.history(), "Training loss"),
        dir.join("training_loss.html"),
    )?;
    Ok(())
}
