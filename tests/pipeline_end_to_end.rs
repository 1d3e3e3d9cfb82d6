use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde_json::json;

use data_onboarding::config::PipelineConfig;
use data_onboarding::context::PipelineContext;
use data_onboarding::observability::{LogLevel, LogSink};
use data_onboarding::pipeline::run;
use data_onboarding::processing::identity::hash_identity;
use data_onboarding::store::{DocumentStore, InMemoryStore};
use data_onboarding::types::{DataType, Field, Schema};
use data_onboarding::OnboardingError;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    fn at(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

fn admissions_schema() -> Schema {
    Schema::new(vec![
        Field::new("Name", DataType::Utf8),
        Field::new("Age", DataType::Int64),
        Field::new("Gender", DataType::Utf8),
        Field::new("Blood Type", DataType::Utf8),
        Field::new("Date of Admission", DataType::Utf8),
        Field::new("Hospital", DataType::Utf8),
        Field::new("Billing Amount", DataType::Float64),
        Field::new("Discharge Date", DataType::Utf8),
    ])
}

fn config(source: &str) -> PipelineConfig {
    PipelineConfig {
        source: PathBuf::from(source),
        schema: admissions_schema(),
        required_columns: ["name", "age", "date_of_admission", "billing_amount"]
            .map(String::from)
            .to_vec(),
        identity_columns: vec!["name".to_string(), "age".to_string()],
        ..PipelineConfig::default()
    }
}

fn ctx(config: PipelineConfig) -> PipelineContext {
    PipelineContext::new(config).with_processing_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
}

#[test]
fn admissions_batch_is_cleaned_identified_and_loaded() {
    let store = InMemoryStore::new();
    let summary = run(&ctx(config("tests/fixtures/admissions.csv")), &store).unwrap();

    assert_eq!(summary.validation.duplicated_rows, 2);
    assert_eq!(summary.validation.removed_duplicates, 1);
    assert_eq!(summary.validation.sign_corrected_columns, vec!["billing_amount"]);
    assert_eq!(summary.load.initial_count, 0);
    assert_eq!(summary.load.inserted, 4);
    assert_eq!(summary.load.final_count, 4);

    let docs = store.documents("admissions").unwrap();
    assert_eq!(docs.len(), 4);

    let keys: Vec<&String> = docs[0].keys().collect();
    assert_eq!(
        keys,
        vec![
            "_id",
            "patient_id",
            "name",
            "age",
            "gender",
            "blood_type",
            "date_of_admission",
            "hospital",
            "billing_amount",
            "discharge_date",
        ]
    );

    let patient = hash_identity("Bobby Jackson30");
    assert_eq!(docs[0]["patient_id"], json!(patient));
    assert_eq!(docs[0]["_id"], json!(format!("{patient}-2024-01-31")));
    assert_eq!(docs[0]["name"], json!("Bobby Jackson"));
    assert_eq!(docs[0]["date_of_admission"], json!("2024-01-31T00:00:00"));
    assert_eq!(docs[3]["billing_amount"], json!(37909.78));

    let ids: HashSet<String> = docs.iter().map(|d| d["_id"].to_string()).collect();
    assert_eq!(ids.len(), 4);

    let meta = store.documents("admissions_info").unwrap();
    assert_eq!(meta.len(), 1);
    assert_eq!(
        serde_json::Value::Object(meta[0].clone()),
        json!({
            "file": "tests/fixtures/admissions.csv",
            "row_count": 4,
            "column_count": 10,
            "execution_date": "2024-03-01",
        })
    );
}

#[test]
fn three_rows_keyed_by_name_and_admission_date() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.csv");
    std::fs::write(
        &path,
        "Name,Age,Gender,Blood Type,Date of Admission,Hospital,Billing Amount,Discharge Date\n\
         ada lovelace,36,Female,O+,2024-01-05,Kim Inc,100.0,2024-01-07\n\
         ada lovelace,36,Female,O+,2024-02-05,Kim Inc,150.0,2024-02-06\n\
         alan turing,41,Male,A-,2024-01-05,Cook PLC,220.5,2024-01-09\n",
    )
    .unwrap();

    let mut config = config(path.to_str().unwrap());
    config.identity_columns = vec!["name".to_string(), "date_of_admission".to_string()];

    let mut runs = Vec::new();
    for _ in 0..2 {
        let store = InMemoryStore::new();
        let summary = run(&ctx(config.clone()), &store).unwrap();
        assert_eq!(summary.load.inserted, 3);
        assert_eq!(summary.load.metadata.row_count, 3);
        assert_eq!(store.count_documents("admissions_info").unwrap(), 1);
        runs.push(store.documents("admissions").unwrap());
    }
    assert_eq!(runs[0], runs[1]);

    let pairs: HashSet<(String, String)> = runs[0]
        .iter()
        .map(|d| (d["_id"].to_string(), d["patient_id"].to_string()))
        .collect();
    assert_eq!(pairs.len(), 3);
    assert_eq!(
        runs[0][0]["patient_id"],
        json!(hash_identity("Ada Lovelace2024-01-05 00:00:00"))
    );
}

#[test]
fn independent_runs_produce_identical_documents() {
    let first = InMemoryStore::new();
    let second = InMemoryStore::new();
    run(&ctx(config("tests/fixtures/admissions.csv")), &first).unwrap();
    run(&ctx(config("tests/fixtures/admissions.csv")), &second).unwrap();

    assert_eq!(
        first.documents("admissions").unwrap(),
        second.documents("admissions").unwrap()
    );
    assert_eq!(
        first.documents("admissions_info").unwrap(),
        second.documents("admissions_info").unwrap()
    );
}

#[test]
fn reloading_the_same_batch_is_rejected_without_side_effects() {
    let store = InMemoryStore::new();
    let ctx = ctx(config("tests/fixtures/admissions.csv"));
    run(&ctx, &store).unwrap();

    let err = run(&ctx, &store).unwrap_err();
    assert!(matches!(err, OnboardingError::Store { .. }));
    assert_eq!(store.count_documents("admissions").unwrap(), 4);
    assert_eq!(store.count_documents("admissions_info").unwrap(), 1);
}

#[test]
fn duplicates_are_logged_as_a_warning() {
    let sink = Arc::new(RecordingSink::default());
    let ctx = ctx(config("tests/fixtures/admissions.csv")).with_sink(sink.clone());
    run(&ctx, &InMemoryStore::new()).unwrap();

    let warnings = sink.at(LogLevel::Warning);
    assert!(warnings.iter().any(|m| m == "dataset contains 2 duplicated lines"));
    assert!(warnings.iter().any(|m| m.contains("'billing_amount'")));
    assert!(sink.at(LogLevel::Error).is_empty());
}

#[test]
fn discharge_before_admission_stops_the_run() {
    let store = InMemoryStore::new();
    let sink = Arc::new(RecordingSink::default());
    let ctx = ctx(config("tests/fixtures/incoherent_dates.csv")).with_sink(sink.clone());

    match run(&ctx, &store) {
        Err(OnboardingError::DataIntegrity {
            incoherent_rows, ..
        }) => assert_eq!(incoherent_rows, 2),
        other => panic!("expected data integrity error, got {other:?}"),
    }
    assert_eq!(store.count_documents("admissions").unwrap(), 0);
    assert_eq!(store.count_documents("admissions_info").unwrap(), 0);
    assert_eq!(sink.at(LogLevel::Error).len(), 1);
}

#[test]
fn nulls_in_required_columns_are_all_reported() {
    let store = InMemoryStore::new();
    match run(&ctx(config("tests/fixtures/missing_values.csv")), &store) {
        Err(OnboardingError::Validation { null_counts }) => {
            let expected: BTreeMap<String, usize> =
                [("age".to_string(), 1), ("name".to_string(), 1)].into_iter().collect();
            assert_eq!(null_counts, expected);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(store.count_documents("admissions").unwrap(), 0);
}

#[test]
fn strict_sign_policy_rejects_negative_amounts() {
    let mut config = config("tests/fixtures/admissions.csv");
    config.replace_negatives = false;

    match run(&ctx(config), &InMemoryStore::new()) {
        Err(OnboardingError::Value { column }) => assert_eq!(column, "billing_amount"),
        other => panic!("expected value error, got {other:?}"),
    }
}

#[test]
fn missing_required_column_is_named() {
    let mut config = config("tests/fixtures/admissions.csv");
    config.required_columns.push("insurance_provider".to_string());

    match run(&ctx(config), &InMemoryStore::new()) {
        Err(OnboardingError::Schema { missing }) => assert_eq!(missing, vec!["insurance_provider"]),
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn every_absent_required_column_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.csv");
    std::fs::write(&path, "Name,Date of Admission\nada lovelace,2024-01-05\n").unwrap();

    let mut config = config(path.to_str().unwrap());
    config.required_columns = ["name", "age", "hospital", "date_of_admission"]
        .map(String::from)
        .to_vec();

    let store = InMemoryStore::new();
    match run(&ctx(config), &store) {
        Err(OnboardingError::Schema { missing }) => assert_eq!(missing, vec!["age", "hospital"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert_eq!(store.count_documents("admissions").unwrap(), 0);
    assert_eq!(store.count_documents("admissions_info").unwrap(), 0);
}

#[test]
fn json_key_absent_from_every_object_is_a_missing_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"[{"name":"a"},{"name":"b"}]"#).unwrap();

    let mut config = config(path.to_str().unwrap());
    config.required_columns = vec!["name".to_string(), "age".to_string()];

    match run(&ctx(config), &InMemoryStore::new()) {
        Err(OnboardingError::Schema { missing }) => assert_eq!(missing, vec!["age"]),
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn undeclared_columns_reach_the_stored_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extra.csv");
    std::fs::write(
        &path,
        "Name,Age,Date of Admission,Billing Amount,Discharge Date,Insurance\n\
         ada lovelace,36,2024-01-05,100.0,2024-01-07,Aetna\n\
         alan turing,41,2024-01-05,220.5,2024-01-09,Cigna\n",
    )
    .unwrap();

    let store = InMemoryStore::new();
    let summary = run(&ctx(config(path.to_str().unwrap())), &store).unwrap();
    assert_eq!(summary.load.metadata.column_count, 8);

    let docs = store.documents("admissions").unwrap();
    assert_eq!(docs[0]["insurance"], json!("Aetna"));
    assert_eq!(docs[1]["insurance"], json!("Cigna"));
    assert!(!docs[0].contains_key("hospital"));
}

#[test]
fn missing_source_is_critical() {
    let sink = Arc::new(RecordingSink::default());
    let ctx = ctx(config("tests/fixtures/nope.csv")).with_sink(sink.clone());

    let err = run(&ctx, &InMemoryStore::new()).unwrap_err();
    assert!(matches!(err, OnboardingError::NotFound { .. }));
    assert!(sink
        .at(LogLevel::Critical)
        .iter()
        .any(|m| m.starts_with("onboarding failed")));
}

#[test]
fn header_only_file_loads_an_empty_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(
        &path,
        "Name,Age,Gender,Blood Type,Date of Admission,Hospital,Billing Amount,Discharge Date\n",
    )
    .unwrap();

    let store = InMemoryStore::new();
    let summary = run(&ctx(config(path.to_str().unwrap())), &store).unwrap();
    assert_eq!(summary.load.inserted, 0);
    assert_eq!(summary.load.metadata.row_count, 0);
    assert_eq!(store.count_documents("admissions_info").unwrap(), 1);
}
