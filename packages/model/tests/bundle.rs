//! Bootstrap tests for the persisted model bundle.

use iris_model::bundle::BUNDLE_FORMAT_VERSION;
use iris_model::{
    ClassLabels, Classifier, ModelBundle, ModelError, ModelSource, Scaler, load_or_fit,
};

fn classify(bundle: &ModelBundle, sample: [f64; 4]) -> (String, Vec<f64>) {
    let scaled = bundle.scaler.transform(&sample).unwrap();
    let index = bundle.classifier.predict(&scaled).unwrap();
    let proba = bundle.classifier.predict_proba(&scaled).unwrap();
    (bundle.labels.name(index).unwrap().to_string(), proba)
}

#[test]
fn default_model_recognises_classic_exemplars() {
    let bundle = ModelBundle::fit_default().unwrap();
    bundle.validate_against(&ClassLabels::iris()).unwrap();

    let (label, proba) = classify(&bundle, [5.1, 3.5, 1.4, 0.2]);
    assert_eq!(label, "setosa");
    assert!(proba[0] > 0.9, "setosa confidence too low: {proba:?}");

    let (label, _) = classify(&bundle, [7.2, 3.6, 6.1, 2.5]);
    assert_eq!(label, "virginica");

    let (label, _) = classify(&bundle, [6.7, 3.0, 5.2, 2.3]);
    assert_eq!(label, "virginica");
}

#[test]
fn default_model_distribution_sums_to_one() {
    let bundle = ModelBundle::fit_default().unwrap();
    for sample in [
        [5.1, 3.5, 1.4, 0.2],
        [5.9, 3.0, 4.2, 1.5],
        [6.3, 2.9, 5.6, 1.8],
        [4.0, 2.0, 1.0, 0.1],
    ] {
        let (_, proba) = classify(&bundle, sample);
        assert_eq!(proba.len(), 3);
        let sum: f64 = proba.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }
}

#[test]
fn saved_bundle_predicts_identically_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("iris-model.json");

    let bundle = ModelBundle::fit_default().unwrap();
    bundle.save(&path).unwrap();
    let reloaded = ModelBundle::load(&path).unwrap();

    assert_eq!(bundle, reloaded);
    let sample = [6.1, 2.8, 4.7, 1.2];
    assert_eq!(classify(&bundle, sample), classify(&reloaded, sample));
}

#[test]
fn missing_artifact_falls_back_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deploy").join("iris-model.json");

    let loaded = load_or_fit(&path, &ClassLabels::iris(), true).unwrap();
    assert_eq!(loaded.source, ModelSource::Fallback);
    assert!(path.exists());

    let again = load_or_fit(&path, &ClassLabels::iris(), true).unwrap();
    assert_eq!(again.source, ModelSource::Artifact(path.clone()));
    assert_eq!(again.bundle, loaded.bundle);
}

#[test]
fn fallback_is_not_persisted_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iris-model.json");

    let loaded = load_or_fit(&path, &ClassLabels::iris(), false).unwrap();
    assert_eq!(loaded.source, ModelSource::Fallback);
    assert!(!path.exists());
}

#[test]
fn corrupt_artifact_falls_back_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iris-model.json");
    std::fs::write(&path, b"not a model").unwrap();

    let loaded = load_or_fit(&path, &ClassLabels::iris(), true).unwrap();
    assert_eq!(loaded.source, ModelSource::Fallback);
    assert_eq!(std::fs::read(&path).unwrap(), b"not a model");
}

#[test]
fn unsupported_format_version_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iris-model.json");

    let mut bundle = ModelBundle::fit_default().unwrap();
    bundle.format_version = BUNDLE_FORMAT_VERSION + 1;
    bundle.save(&path).unwrap();

    assert!(matches!(
        ModelBundle::load(&path),
        Err(ModelError::UnsupportedFormat(_))
    ));
    let loaded = load_or_fit(&path, &ClassLabels::iris(), true).unwrap();
    assert_eq!(loaded.source, ModelSource::Fallback);
}

#[test]
fn artifact_with_other_labels_refuses_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("iris-model.json");

    let mut bundle = ModelBundle::fit_default().unwrap();
    bundle.labels = ClassLabels::new(
        "iris-v1",
        vec![
            "virginica".to_string(),
            "versicolor".to_string(),
            "setosa".to_string(),
        ],
    );
    bundle.save(&path).unwrap();

    let err = load_or_fit(&path, &ClassLabels::iris(), true).unwrap_err();
    assert!(matches!(err, ModelError::LabelMismatch { .. }));
}

#[test]
fn label_count_must_match_classifier() {
    let mut bundle = ModelBundle::fit_default().unwrap();
    let two = ClassLabels::new("iris-v1", vec!["setosa".into(), "versicolor".into()]);
    bundle.labels = two.clone();

    let err = bundle.validate_against(&two).unwrap_err();
    assert!(matches!(
        err,
        ModelError::ClassCountMismatch {
            classes: 3,
            labels: 2
        }
    ));
}
