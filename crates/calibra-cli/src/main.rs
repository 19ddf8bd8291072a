use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use calibra_classifiers::config::PipelineConfig;
use calibra_cli::predict::{run_prediction, PredictArgs};
use calibra_cli::train::{run_training, TrainArgs};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CALIBRA_LOG", "error,calibra=info"))
        .init();

    let matches = Command::new("calibra")
        .version(clap::crate_version!())
        .about("Calibra - calibrated binary classification with operating thresholds")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Train, calibrate and choose thresholds from a labelled table")
                .arg(
                    Arg::new("config")
                        .help(
                            "Path to the JSON pipeline configuration. \
                             Prints a template when omitted.",
                        )
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train-data")
                        .help("Training table (*.csv or *.tsv) with a header row")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("validation_data")
                        .short('v')
                        .long("validation-data")
                        .help(
                            "Validation table. Takes precedence over validation_fraction \
                             in the configuration file.",
                        )
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_dir")
                        .short('o')
                        .long("output-dir")
                        .help("Directory the model artifacts are written to")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("recall_floor")
                        .long("recall-floor")
                        .help("Override thresholds.recall_floor from the configuration file")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("objective")
                        .long("objective")
                        .help(
                            "Override thresholds.objective: \
                             precision, pr_auc, f1 or f_beta:<beta>",
                        )
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Skip the HTML plots.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Score a table with a trained model directory")
                .arg(
                    Arg::new("model_dir")
                        .short('m')
                        .long("model")
                        .help("Directory written by `calibra train`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("Table to score (*.csv or *.tsv)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Where to write verdicts. Defaults to stdout (tab separated).")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .help("Threshold slot to decide against")
                        .value_parser(["primary", "recall_target"])
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("id_column")
                        .long("id-column")
                        .help("Column copied into the output as the row id")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::Other),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        eprintln!("[calibra] No config file provided; printing the default configuration.");
        println!("{}", serde_json::to_string_pretty(&PipelineConfig::default())?);
        return Ok(());
    };
    log::info!("[calibra::train] Training with config: {:?}", config_path);

    let args = TrainArgs::from_arguments(config_path, matches)?;
    match run_training(&args) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let args = PredictArgs::from_arguments(matches)?;
    log::info!(
        "[calibra::predict] Scoring {:?} with model {:?}",
        args.input,
        args.model_dir
    );
    match run_prediction(&args) {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
