//! Integration tests for argument handling and util helpers.

use calibra_cli::predict::{run_prediction, PredictArgs};
use calibra_cli::train::{run_training, TrainArgs};
use calibra_cli::util::validate_table_path;
use calibra_classifiers::config::PipelineConfig;

// ---------------------------------------------------------------------------
// validate_table_path
// ---------------------------------------------------------------------------

#[test]
fn validate_tsv_and_csv_files() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["data.tsv", "data.CSV"] {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap();
        assert!(validate_table_path(&path).is_ok(), "{}", name);
    }
}

#[test]
fn validate_wrong_extension_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::File::create(&path).unwrap();
    assert!(validate_table_path(&path).is_err());
}

#[test]
fn validate_nonexistent_file_errors() {
    assert!(validate_table_path(std::path::Path::new("/nonexistent/path/data.tsv")).is_err());
}

// ---------------------------------------------------------------------------
// train / predict without the binary
// ---------------------------------------------------------------------------

#[test]
fn weighted_training_and_prediction_with_ids() {
    let dir = tempfile::tempdir().unwrap();
    let train = dir.path().join("train.csv");
    let mut contents = String::from("y,w,a\n");
    for i in 0..30 {
        let label = (i % 2) as i32;
        let a = if label == 1 { 1.0 } else { -1.0 } + (i % 5) as f64 * 0.1;
        contents.push_str(&format!("{},{},{}\n", label, 1 + i % 3, a));
    }
    std::fs::write(&train, contents).unwrap();

    let config = PipelineConfig {
        label_column: "y".to_string(),
        weight_column: Some("w".to_string()),
        ..PipelineConfig::default()
    };
    let model_dir = dir.path().join("model");
    let trained = run_training(&TrainArgs {
        config,
        train_data: train,
        validation_data: None,
        output_dir: model_dir.clone(),
        write_report: false,
    })
    .unwrap();
    assert_eq!(trained.metadata.feature_names, vec!["a"]);

    let rows = dir.path().join("rows.tsv");
    std::fs::write(&rows, "key\ta\nfirst\t-1.2\nsecond\t1.3\n").unwrap();
    let out = dir.path().join("verdicts.tsv");
    let scored = run_prediction(&PredictArgs {
        model_dir,
        input: rows,
        output: Some(out.clone()),
        slot: "primary".to_string(),
        id_column: Some("key".to_string()),
    })
    .unwrap();
    assert_eq!(scored, 2);

    let written = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert!(lines[1].starts_with("first\t"));
    assert!(lines[1].ends_with("\t0"));
    assert!(lines[2].starts_with("second\t"));
    assert!(lines[2].ends_with("\t1"));
}

#[test]
fn mismatched_validation_columns_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let train = dir.path().join("train.csv");
    std::fs::write(&train, "label,a,b\n1,1,0\n0,-1,0\n1,2,1\n0,-2,1\n").unwrap();
    let validation = dir.path().join("validation.csv");
    std::fs::write(&validation, "label,b,a\n1,0,1\n0,1,-1\n").unwrap();

    let err = run_training(&TrainArgs {
        config: PipelineConfig::default(),
        train_data: train,
        validation_data: Some(validation),
        output_dir: dir.path().join("model"),
        write_report: false,
    })
    .unwrap_err();
    assert!(format!("{:#}", err).contains("do not match"));
}
