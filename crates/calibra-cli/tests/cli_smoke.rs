//! Smoke tests for the compiled `calibra` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("calibra").unwrap()
}

fn write_training_table(path: &Path) {
    let mut contents = String::from("label,signal,noise\n");
    for i in 0..40 {
        let label = i % 2;
        let signal = if label == 1 { 2.0 } else { -2.0 } + ((i * 7) % 10) as f64 / 5.0 - 0.9;
        let noise = ((i * 11) % 9) as f64 / 9.0;
        contents.push_str(&format!("{},{},{}\n", label, signal, noise));
    }
    std::fs::write(path, contents).unwrap();
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("predict"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("calibra"));
}

// ---------------------------------------------------------------------------
// train
// ---------------------------------------------------------------------------

#[test]
fn train_without_config_prints_template() {
    cmd()
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"learning_rate\""))
        .stdout(predicate::str::contains("\"recall_floor\""))
        .stderr(predicate::str::contains("No config file provided"));
}

#[test]
fn train_with_missing_config_fails() {
    cmd()
        .args(["train", "/nonexistent/config.json", "-d", "train.csv"])
        .assert()
        .failure();
}

#[test]
fn train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        r#"{"validation_fraction": 0.25, "trainer": {"max_iterations": 300}}"#,
    )
    .unwrap();
    let train = dir.path().join("train.csv");
    write_training_table(&train);
    let model_dir = dir.path().join("model");

    cmd()
        .arg("train")
        .arg(&config)
        .arg("-d")
        .arg(&train)
        .arg("-o")
        .arg(&model_dir)
        .args(["--recall-floor", "0.9", "--objective", "f1"])
        .assert()
        .success();

    for name in [
        "trainer.json",
        "calibrator.json",
        "thresholds.json",
        "metadata.json",
        "metrics.json",
        "precision_recall.html",
        "reliability.html",
        "training_loss.html",
    ] {
        assert!(model_dir.join(name).exists(), "{} missing", name);
    }
    let thresholds = std::fs::read_to_string(model_dir.join("thresholds.json")).unwrap();
    assert!(thresholds.contains("recall_target"));
    assert!(thresholds.contains("\"f1\""));

    cmd()
        .args(["predict", "-m"])
        .arg(&model_dir)
        .arg("-i")
        .arg(&train)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id\traw_score\tprobability\tpositive"))
        .stdout(predicate::str::contains("row_40"));

    let out = dir.path().join("verdicts.csv");
    cmd()
        .args(["predict", "--threshold", "recall_target", "-m"])
        .arg(&model_dir)
        .arg("-i")
        .arg(&train)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 41);
    assert!(written.starts_with("id,raw_score,probability,positive"));
}

#[test]
fn train_no_report_skips_plots() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, "{}").unwrap();
    let train = dir.path().join("train.tsv");
    let csv = dir.path().join("tmp.csv");
    write_training_table(&csv);
    std::fs::write(
        &train,
        std::fs::read_to_string(&csv).unwrap().replace(',', "\t"),
    )
    .unwrap();
    let model_dir = dir.path().join("out");

    cmd()
        .arg("train")
        .arg(&config)
        .arg("-d")
        .arg(&train)
        .arg("-o")
        .arg(&model_dir)
        .arg("--no-report")
        .assert()
        .success();
    assert!(model_dir.join("trainer.json").exists());
    assert!(!model_dir.join("reliability.html").exists());
}

// ---------------------------------------------------------------------------
// predict
// ---------------------------------------------------------------------------

#[test]
fn predict_requires_model_and_input() {
    cmd()
        .arg("predict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--model"));
}

#[test]
fn predict_with_missing_model_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rows.csv");
    std::fs::write(&input, "signal,noise\n1,0\n").unwrap();
    cmd()
        .args(["predict", "-m", "/nonexistent/model", "-i"])
        .arg(&input)
        .assert()
        .failure();
}
