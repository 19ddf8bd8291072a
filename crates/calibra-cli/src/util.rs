use anyhow::{bail, Context, Result};
use plotly::Plot;
use std::fs;
use std::path::Path;

/// Input tables must exist and be `.csv` or `.tsv`.
pub fn validate_table_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    if !matches!(ext.as_deref(), Some("tsv") | Some("csv")) {
        bail!("Table must have a .tsv or .csv extension: {}", path.display());
    }
    if !path.is_file() {
        bail!("Table does not exist: {}", path.display());
    }
    Ok(())
}

/// Write a plot as a standalone HTML page.
pub fn write_plot_html<P: AsRef<Path>>(plot: &Plot, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, plot.to_html())
        .with_context(|| format!("Failed to write plot: {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}
