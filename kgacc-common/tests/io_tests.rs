//! Input loaders and dataset writer against on-disk fixtures

use std::fs;
use std::path::Path;

use kgacc_common::io::{
    discover_annotators, discover_llm_files, load_annotations, load_annotators,
    load_batch_metadata, load_error_annotations, load_labeled_dataset, load_llm_annotations,
    load_llm_facts, load_strata_weights, write_labeled_dataset, AnnotatorData,
};
use kgacc_common::{BatchId, Error, Fact, Label, LabeledDataset};
use tempfile::TempDir;

const ANNOTATIONS: &str = "\
Subject,Predicate,Object,Annotation,BatchID
Rome,capitalOf,Italy,Correct,1
Paris,capitalOf,Spain,Incorrect,1
\"Smith, J.\",bornIn,1900,I Don't Know,2
";

const METADATA: &str = r#"{
    "1": {"stratum": 0, "topics": ["geography"]},
    "2": {"stratum": 3, "topics": ["people", "expert"]}
}"#;

fn write_annotator(dir: &Path, annotations: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("annotations.csv"), annotations).unwrap();
    fs::write(dir.join("metadata.json"), METADATA).unwrap();
}

#[test]
fn test_load_annotations_in_row_order() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("annotations.csv");
    fs::write(&path, ANNOTATIONS).unwrap();

    let table = load_annotations(&path).unwrap();
    let facts: Vec<&Fact> = table.facts().collect();
    assert_eq!(facts.len(), 3);
    assert_eq!(facts[0], &Fact::new("Rome", "capitalOf", "Italy"));
    assert_eq!(facts[2], &Fact::new("Smith, J.", "bornIn", "1900"));

    let smith = table.get(&Fact::new("Smith, J.", "bornIn", "1900")).unwrap();
    assert_eq!(smith.label, Label::Idk);
    assert_eq!(smith.batch, BatchId::from("2"));
}

#[test]
fn test_unknown_label_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("annotations.csv");
    fs::write(
        &path,
        "Subject,Predicate,Object,Annotation,BatchID\nRome,capitalOf,Italy,Maybe,1\n",
    )
    .unwrap();

    match load_annotations(&path).unwrap_err() {
        Error::Load { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_batch_metadata() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("metadata.json");
    fs::write(&path, METADATA).unwrap();

    let metadata = load_batch_metadata(&path).unwrap();
    let honeypot = metadata.get(&BatchId::from("2")).unwrap();
    assert_eq!(honeypot.stratum, 3);
    assert!(honeypot.is_honeypot("expert"));
    assert!(!metadata.get(&BatchId::from("1")).unwrap().is_honeypot("expert"));
}

#[test]
fn test_missing_file_is_load_error() {
    let temp = TempDir::new().unwrap();
    let err = load_batch_metadata(&temp.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, Error::Load { .. }));
}

#[test]
fn test_annotators_sorted_by_name() {
    let temp = TempDir::new().unwrap();
    for name in ["zoe", "adam", "mia"] {
        write_annotator(&temp.path().join(name), ANNOTATIONS);
    }
    fs::write(temp.path().join("README"), "not an annotator").unwrap();

    let names: Vec<String> = discover_annotators(temp.path())
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["adam", "mia", "zoe"]);

    let loaded = load_annotators(temp.path()).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0].name, "adam");
    assert_eq!(loaded[0].annotations.len(), 3);
    assert_eq!(loaded[0].metadata.len(), 2);
}

#[test]
fn test_error_annotations() {
    let temp = TempDir::new().unwrap();
    let path = AnnotatorData::error_annotations_path(temp.path());
    fs::write(
        &path,
        "Subject,Predicate,Object,Error\nParis,capitalOf,Spain,Wrong object;Wrong predicate\n",
    )
    .unwrap();

    let table = load_error_annotations(&path).unwrap();
    assert_eq!(
        table.get(&Fact::new("Paris", "capitalOf", "Spain")).map(String::as_str),
        Some("Wrong object;Wrong predicate")
    );
}

#[test]
fn test_labeled_dataset_written_and_reloaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dataset").join("human").join("kg.json");

    let mut dataset = LabeledDataset::new(3);
    dataset.insert(0, Fact::new("Rome", "capitalOf", "Italy"), Label::Correct).unwrap();
    dataset.insert(2, Fact::new("Paris", "capitalOf", "Spain"), Label::Incorrect).unwrap();
    dataset.insert(2, Fact::new("X", "y", "z"), Label::Idk).unwrap();

    write_labeled_dataset(&path, &dataset).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["0"][0][0][0], "Rome");
    assert_eq!(json["0"][0][1], "Correct");
    assert_eq!(json["1"].as_array().unwrap().len(), 0);

    let reloaded = load_labeled_dataset(&path, 3).unwrap();
    assert_eq!(reloaded, dataset);
}

#[test]
fn test_dataset_stratum_out_of_range() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("kg.json");
    fs::write(&path, r#"{"9": [[["a", "b", "c"], "Correct"]]}"#).unwrap();

    let err = load_labeled_dataset(&path, 7).unwrap_err();
    assert!(matches!(err, Error::StratumOutOfRange { stratum: 9, strata: 7 }));
}

#[test]
fn test_strata_weights_first_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("weights.csv");
    fs::write(&path, "s1,s2,s3\n0.5,0.25,0.25\n0.1,0.1,0.8\n").unwrap();

    assert_eq!(load_strata_weights(&path).unwrap(), vec![0.5, 0.25, 0.25]);
}

#[test]
fn test_strata_weights_bad_value() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("weights.csv");
    fs::write(&path, "s1,s2\n0.5,half\n").unwrap();

    assert!(matches!(load_strata_weights(&path), Err(Error::Load { .. })));
}

#[test]
fn test_llm_inputs() {
    let temp = TempDir::new().unwrap();
    let facts_path = temp.path().join("kg.json");
    fs::write(&facts_path, r#"{"0": ["Rome", "capitalOf", "Italy"]}"#).unwrap();
    let llm_dir = temp.path().join("llms");
    fs::create_dir_all(&llm_dir).unwrap();
    fs::write(llm_dir.join("model-b.json"), r#"{"0": {"label": "correct", "retries": 2}}"#).unwrap();
    fs::write(llm_dir.join("model-a.json"), r#"{"0": {"label": "na"}}"#).unwrap();
    fs::write(llm_dir.join("notes.txt"), "ignored").unwrap();

    let facts = load_llm_facts(&facts_path).unwrap();
    assert_eq!(facts["0"], Fact::new("Rome", "capitalOf", "Italy"));

    let files = discover_llm_files(&llm_dir).unwrap();
    let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["model-a", "model-b"]);

    let a = load_llm_annotations(&files[0].1).unwrap();
    assert_eq!(a["0"].label, "na");
    assert_eq!(a["0"].retries, 0);
    let b = load_llm_annotations(&files[1].1).unwrap();
    assert_eq!(b["0"].retries, 2);
}
