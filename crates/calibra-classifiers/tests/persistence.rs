use calibra_classifiers::config::{Objective, ThresholdConfig, TrainerConfig};
use calibra_classifiers::io::{ArtifactStore, DirectoryStore, MemoryStore, Persist};
use calibra_classifiers::math::Array2;
use calibra_classifiers::models::{IsotonicCalibrator, LogisticRegression, ProbabilisticModel};
use calibra_classifiers::threshold::{ThresholdResult, ThresholdSelector};

fn training_rows() -> (Array2<f64>, Vec<i32>) {
    let x = Array2::from_rows(&[
        [1.0, 0.2],
        [0.8, -0.1],
        [0.9, 0.4],
        [-0.7, 0.3],
        [-1.1, -0.2],
        [-0.4, 0.1],
        [0.2, 0.0],
        [-0.1, 0.5],
    ])
    .expect("rows");
    (x, vec![1, 1, 1, 0, 0, 0, 1, 0])
}

#[test]
fn trainer_round_trips_through_a_file() {
    let (x, y) = training_rows();
    let mut model = LogisticRegression::new(TrainerConfig {
        max_iterations: 300,
        ..TrainerConfig::default()
    });
    model.fit(&x, &y, None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trainer.json");
    model.save(&path).unwrap();
    let loaded = LogisticRegression::load(&path).unwrap();

    let before = model.predict_proba(&x).unwrap();
    let after = loaded.predict_proba(&x).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() <= 1e-9);
    }
    assert_eq!(loaded.history(), model.history());
    assert_eq!(loaded.config(), model.config());
}

#[test]
fn calibrator_and_thresholds_round_trip_through_a_directory_store() {
    let scores = [0.1, 0.3, 0.35, 0.5, 0.62, 0.7, 0.8, 0.95];
    let labels = [0, 0, 1, 0, 1, 1, 0, 1];
    let mut calibrator = IsotonicCalibrator::new();
    calibrator.fit(&scores, &labels, None).unwrap();
    let calibrated = calibrator.predict_proba(&scores).unwrap();
    let thresholds = ThresholdSelector::choose(
        &calibrated,
        &labels,
        &ThresholdConfig::new(Objective::F1, Some(0.75)),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::create(dir.path().join("artifacts")).unwrap();
    calibrator.save_to(&store, "calibrator.json").unwrap();
    thresholds.save_to(&store, "thresholds.json").unwrap();

    let store = DirectoryStore::open(dir.path().join("artifacts")).unwrap();
    let calibrator_back = IsotonicCalibrator::load_from(&store, "calibrator.json").unwrap();
    let thresholds_back = ThresholdResult::load_from(&store, "thresholds.json").unwrap();

    assert_eq!(calibrator_back, calibrator);
    assert_eq!(thresholds_back, thresholds);
    let grid: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
    assert_eq!(
        calibrator_back.predict_proba(&grid).unwrap(),
        calibrator.predict_proba(&grid).unwrap()
    );
}

#[test]
fn unfitted_trainer_round_trips_as_unfitted() {
    let store = MemoryStore::new();
    LogisticRegression::new(TrainerConfig::default())
        .save_to(&store, "trainer.json")
        .unwrap();
    let loaded = LogisticRegression::load_from(&store, "trainer.json").unwrap();
    assert!(!loaded.is_fitted());
}

#[test]
fn corrupt_artifacts_surface_serialization_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"breakpoints\": [").unwrap();
    assert!(matches!(
        IsotonicCalibrator::load(&path),
        Err(calibra_classifiers::ModelError::Serialization(_))
    ));
    assert!(matches!(
        IsotonicCalibrator::load(dir.path().join("absent.json")),
        Err(calibra_classifiers::ModelError::Io(_))
    ));
}

#[test]
fn calibrator_with_invalid_breakpoints_is_rejected_on_load() {
    let store = MemoryStore::new();
    for (name, body) in [
        ("empty.json", r#"{"breakpoints": []}"#),
        (
            "decreasing.json",
            r#"{"breakpoints": [
                {"score": 0.1, "probability": 0.9},
                {"score": 0.5, "probability": 0.2}
            ]}"#,
        ),
        (
            "unsorted.json",
            r#"{"breakpoints": [
                {"score": 0.5, "probability": 0.1},
                {"score": 0.1, "probability": 0.2}
            ]}"#,
        ),
    ] {
        store.put(name, body.as_bytes()).unwrap();
        assert!(
            matches!(
                IsotonicCalibrator::load_from(&store, name),
                Err(calibra_classifiers::ModelError::Serialization(_))
            ),
            "{} was accepted",
            name
        );
    }

    store
        .put("unfitted.json", br#"{"breakpoints": null}"#)
        .unwrap();
    assert!(!IsotonicCalibrator::load_from(&store, "unfitted.json")
        .unwrap()
        .is_fitted());
}
