//! Delimited text reader for feature tables.
use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;

use crate::data_handling::Dataset;
use crate::math::Array2;

/// Rows parsed from a feature table. Labels are only present when the
/// label column exists in the header.
#[derive(Debug, Clone)]
pub struct TabularData {
    pub x: Array2<f64>,
    pub y: Option<Vec<i32>>,
    pub weights: Option<Vec<f64>>,
    pub row_ids: Vec<String>,
    pub feature_names: Vec<String>,
}

impl TabularData {
    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    /// Convert to a labelled [`Dataset`], failing when the table had no labels.
    pub fn into_dataset(self) -> Result<Dataset> {
        let y = self
            .y
            .ok_or_else(|| anyhow!("Table has no label column"))?;
        Dataset::new(self.x, y, self.weights, self.feature_names)
            .context("Table content is not a valid training set")
    }
}

/// Configuration for reading feature tables.
#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    /// Column holding 0/1 labels.
    pub label_column: String,
    /// Fail when the label column is missing.
    pub require_label: bool,
    /// Optional column holding per-row sample weights.
    pub weight_column: Option<String>,
    /// Optional column carried through as a row identifier.
    pub id_column: Option<String>,
    /// Explicit feature columns, in order. When `None`, every column that is
    /// not a label, weight, id or ignored column is a feature.
    pub feature_columns: Option<Vec<String>>,
    pub ignore_columns: Vec<String>,
    /// Field delimiter; inferred from the file extension when `None`.
    pub delimiter: Option<u8>,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            require_label: true,
            weight_column: None,
            id_column: None,
            feature_columns: None,
            ignore_columns: Vec::new(),
            delimiter: None,
        }
    }
}

impl CsvReaderConfig {
    /// Reader for scoring new rows: labels optional, features pinned to the
    /// columns the model was trained on.
    pub fn for_prediction(label_column: &str, feature_names: &[String]) -> Self {
        Self {
            label_column: label_column.to_string(),
            require_label: false,
            feature_columns: Some(feature_names.to_vec()),
            ..Self::default()
        }
    }
}

/// `\t` for `.tsv`, `.tab` and `.pin` files, `,` otherwise.
pub fn delimiter_for<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("tab") | Some("pin") => b'\t',
        _ => b',',
    }
}

/// Read a labelled training table.
pub fn read_dataset<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<Dataset> {
    let path = path.as_ref();
    let table = read_table(path, config)?;
    table
        .into_dataset()
        .with_context(|| format!("Failed to build dataset from {}", path.display()))
}

/// Read a feature table.
pub fn read_table<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<TabularData> {
    let path = path.as_ref();
    let delimiter = config.delimiter.unwrap_or_else(|| delimiter_for(path));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open feature table: {}", path.display()))?;

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();

    let label_idx = find_column(&headers, &config.label_column);
    if label_idx.is_none() && config.require_label {
        bail!(
            "Missing label column '{}' in {}",
            config.label_column,
            path.display()
        );
    }
    let weight_idx = match &config.weight_column {
        Some(name) => Some(
            find_column(&headers, name)
                .ok_or_else(|| anyhow!("Missing weight column '{}'", name))?,
        ),
        None => None,
    };
    let id_idx = match &config.id_column {
        Some(name) => Some(
            find_column(&headers, name).ok_or_else(|| anyhow!("Missing id column '{}'", name))?,
        ),
        None => None,
    };

    let reserved: Vec<usize> = [label_idx, weight_idx, id_idx].into_iter().flatten().collect();
    let feature_indices = resolve_feature_indices(&headers, config, &reserved)?;
    if feature_indices.is_empty() {
        bail!("No feature columns detected in {}", path.display());
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut weights = Vec::new();
    let mut row_ids = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let line = row_idx + 2;
        let record = result.with_context(|| format!("Failed to read line {}", line))?;

        if let Some(idx) = label_idx {
            let raw = field(&record, idx, "label", line)?;
            let label = raw
                .parse::<i32>()
                .with_context(|| format!("Invalid label '{}' at line {}", raw, line))?;
            labels.push(label);
        }
        if let Some(idx) = weight_idx {
            let raw = field(&record, idx, "weight", line)?;
            let weight = raw
                .parse::<f64>()
                .with_context(|| format!("Invalid weight '{}' at line {}", raw, line))?;
            weights.push(weight);
        }
        row_ids.push(match id_idx {
            Some(idx) => field(&record, idx, "id", line)?.to_string(),
            None => format!("row_{}", row_idx + 1),
        });

        for &idx in &feature_indices {
            let name = headers.get(idx).unwrap_or("");
            let raw = field(&record, idx, name, line)?;
            let value = raw
                .parse::<f64>()
                .with_context(|| {
                    format!("Invalid feature '{}' value '{}' at line {}", name, raw, line)
                })?;
            if !value.is_finite() {
                bail!("Non-finite feature '{}' at line {}", name, line);
            }
            features.push(value);
        }
    }

    let n_rows = row_ids.len();
    if n_rows == 0 {
        bail!("{} contains no data rows", path.display());
    }
    let x = Array2::from_shape_vec((n_rows, feature_indices.len()), features)
        .context("Failed to build feature matrix")?;

    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    log::debug!(
        "Read {} rows x {} features from {}",
        n_rows,
        feature_indices.len(),
        path.display()
    );

    Ok(TabularData {
        x,
        y: label_idx.map(|_| labels),
        weights: weight_idx.map(|_| weights),
        row_ids,
        feature_names,
    })
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str, line: usize) -> Result<&'r str> {
    record
        .get(idx)
        .ok_or_else(|| anyhow!("Missing '{}' value at line {}", name, line))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn resolve_feature_indices(
    headers: &StringRecord,
    config: &CsvReaderConfig,
    reserved: &[usize],
) -> Result<Vec<usize>> {
    if let Some(names) = &config.feature_columns {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = find_column(headers, name)
                .ok_or_else(|| anyhow!("Missing feature column '{}'", name))?;
            indices.push(idx);
        }
        return Ok(indices);
    }

    let ignore: HashSet<String> = config
        .ignore_columns
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();

    Ok(headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| {
            !reserved.contains(idx) && !ignore.contains(&header.to_ascii_lowercase())
        })
        .map(|(idx, _)| idx)
        .collect())
}
