use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;

use calibra_classifiers::io::csv_reader::delimiter_for;
use calibra_classifiers::io::{read_table, CsvReaderConfig, DirectoryStore};
use calibra_classifiers::pipeline::{TrainedPipeline, Verdict};
use calibra_classifiers::threshold::PRIMARY;

use crate::util::validate_table_path;

#[derive(Debug, Clone)]
pub struct PredictArgs {
    pub model_dir: PathBuf,
    pub input: PathBuf,
    /// `None` writes to stdout.
    pub output: Option<PathBuf>,
    /// Threshold slot the `positive` column is decided against.
    pub slot: String,
    pub id_column: Option<String>,
}

impl PredictArgs {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            model_dir: matches
                .get_one::<PathBuf>("model_dir")
                .cloned()
                .context("Missing --model")?,
            input: matches
                .get_one::<PathBuf>("input")
                .cloned()
                .context("Missing --input")?,
            output: matches.get_one::<PathBuf>("output").cloned(),
            slot: matches
                .get_one::<String>("threshold")
                .cloned()
                .unwrap_or_else(|| PRIMARY.to_string()),
            id_column: matches.get_one::<String>("id_column").cloned(),
        })
    }
}

/// Restore the pipeline, score every row and write the verdicts. Returns the
/// number of rows scored.
pub fn run_prediction(args: &PredictArgs) -> Result<usize> {
    validate_table_path(&args.input)?;
    let store = DirectoryStore::open(&args.model_dir)
        .with_context(|| format!("Model directory not found: {}", args.model_dir.display()))?;
    let pipeline = TrainedPipeline::restore(&store)
        .with_context(|| format!("Failed to load model from {}", args.model_dir.display()))?;

    let mut reader = CsvReaderConfig::for_prediction(
        &pipeline.metadata.config.label_column,
        &pipeline.metadata.feature_names,
    );
    reader.id_column = args.id_column.clone();
    let table = read_table(&args.input, &reader)?;

    let verdicts = pipeline
        .predict_at(&table.x, &args.slot)
        .with_context(|| format!("Failed to score {}", args.input.display()))?;

    let delimiter = match &args.output {
        Some(path) => delimiter_for(path),
        None => b'\t',
    };
    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    write_verdicts(sink, delimiter, &table.row_ids, &verdicts)?;

    let positives = verdicts.iter().filter(|v| v.positive).count();
    log::info!(
        "Scored {} rows against the {} threshold; {} positive",
        verdicts.len(),
        args.slot,
        positives
    );
    Ok(verdicts.len())
}

/// One row per verdict: `id, raw_score, probability, positive`.
pub fn write_verdicts<W: Write>(
    writer: W,
    delimiter: u8,
    row_ids: &[String],
    verdicts: &[Verdict],
) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    out.write_record(["id", "raw_score", "probability", "positive"])?;
    for (id, verdict) in row_ids.iter().zip(verdicts) {
        out.write_record([
            id.clone(),
            verdict.raw_score.to_string(),
            verdict.probability.to_string(),
            u8::from(verdict.positive).to_string(),
        ])?;
    }
    out.flush().context("Failed to write verdicts")?;
    Ok(())
}
