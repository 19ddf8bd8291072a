use plotly::common::{DashType, Line, Marker, Mode};
use plotly::layout::{Axis, Layout};
use plotly::{Histogram, Plot, Scatter};

use crate::error::{check_labels, ModelError};
use crate::math::ShapeError;
use crate::metrics::ReliabilityBin;
use crate::models::logistic::TrainingHistory;
use crate::threshold::{OperatingPoint, ThresholdResult};

/// Histogram of probabilities, split by class.
pub fn plot_score_histogram(
    probabilities: &[f64],
    labels: &[i32],
    title: &str,
) -> Result<Plot, ModelError> {
    ShapeError::check_len("labels", probabilities.len(), labels.len())?;
    check_labels(labels)?;

    let (mut positives, mut negatives) = (Vec::new(), Vec::new());
    for (&p, &label) in probabilities.iter().zip(labels) {
        if label == 1 {
            positives.push(p);
        } else {
            negatives.push(p);
        }
    }

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Probability"))
        .y_axis(Axis::new().title("Count"));

    let mut plot = Plot::new();
    plot.add_trace(Histogram::new(positives).name("Positive"));
    plot.add_trace(Histogram::new(negatives).name("Negative"));
    plot.set_layout(layout);
    Ok(plot)
}

/// Precision against recall, with the chosen operating points marked.
pub fn plot_precision_recall(
    curve: &[OperatingPoint],
    thresholds: &ThresholdResult,
    title: &str,
) -> Plot {
    let recall: Vec<f64> = curve.iter().map(|p| p.recall).collect();
    let precision: Vec<f64> = curve.iter().map(|p| p.precision).collect();

    let mut plot = Plot::new();
    plot.add_trace(
        Scatter::new(recall, precision)
            .mode(Mode::LinesMarkers)
            .name("Precision/recall"),
    );

    for (slot, point) in &thresholds.thresholds {
        plot.add_trace(
            Scatter::new(vec![point.recall], vec![point.precision])
                .mode(Mode::Markers)
                .marker(Marker::new().size(14))
                .name(&format!("{} (t = {:.4})", slot, point.threshold)),
        );
    }

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Recall").range(vec![0.0, 1.05]))
            .y_axis(Axis::new().title("Precision").range(vec![0.0, 1.05])),
    );
    plot
}

/// Reliability diagram comparing raw and calibrated probabilities.
pub fn plot_reliability(
    raw: &[ReliabilityBin],
    calibrated: &[ReliabilityBin],
    title: &str,
) -> Plot {
    let trace = |bins: &[ReliabilityBin], name: &str| {
        Scatter::new(
            bins.iter().map(|b| b.mean_predicted).collect::<Vec<_>>(),
            bins.iter().map(|b| b.observed_rate).collect::<Vec<_>>(),
        )
        .mode(Mode::LinesMarkers)
        .name(name)
    };

    let mut plot = Plot::new();
    plot.add_trace(trace(raw, "Raw"));
    plot.add_trace(trace(calibrated, "Calibrated"));
    plot.add_trace(
        Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
            .mode(Mode::Lines)
            .name("Perfect calibration")
            .line(Line::new().color("gray").dash(DashType::Dash)),
    );
    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Mean predicted probability"))
            .y_axis(Axis::new().title("Observed positive rate")),
    );
    plot
}

/// Training (and validation, if recorded) loss per iteration.
pub fn plot_training_loss(history: &TrainingHistory, title: &str) -> Plot {
    let mut plot = Plot::new();
    let iterations = |n: usize| (1..=n).collect::<Vec<usize>>();

    plot.add_trace(
        Scatter::new(iterations(history.train_loss.len()), history.train_loss.clone())
            .mode(Mode::Lines)
            .name("Training loss"),
    );
    if !history.validation_loss.is_empty() {
        plot.add_trace(
            Scatter::new(
                iterations(history.validation_loss.len()),
                history.validation_loss.clone(),
            )
            .mode(Mode::Lines)
            .name("Validation loss"),
        );
    }
    if let (Some(best), Some(loss)) = (history.best_iteration, history.best_validation_loss) {
        plot.add_trace(
            Scatter::new(vec![best], vec![loss])
                .mode(Mode::Markers)
                .marker(Marker::new().size(12))
                .name("Kept weights"),
        );
    }

    plot.set_layout(
        Layout::new()
            .title(title)
            .x_axis(Axis::new().title("Iteration"))
            .y_axis(Axis::new().title("Log-loss")),
    );
    plot
}
