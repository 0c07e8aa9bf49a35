//! End-to-end pipeline tests over a small on-disk annotation campaign
//!
//! Two strata. Three agreeing experts judge four facts; three crowd
//! annotators each see one honeypot batch and two regular batches.

use std::fs;
use std::path::Path;

use kgacc_common::config::{DataLayout, TomlConfig};
use kgacc_common::io::load_labeled_dataset;
use kgacc_common::{Error, Fact, Label};
use kgacc_eval::pipeline::{
    run_error_stats, run_estimate, run_evaluate_llm, run_prepare, run_stats, RunContext,
};
use tempfile::TempDir;

const HEADER: &str = "Subject,Predicate,Object,Annotation,BatchID\n";

const EXPERT_ROWS: &str = "\
h1,p,o,Correct,e1
h2,p,o,Incorrect,e1
h3,p,o,Correct,e2
h4,p,o,Correct,e2
";

const EXPERT_METADATA: &str = r#"{
    "e1": {"stratum": 0, "topics": ["sports"]},
    "e2": {"stratum": 1, "topics": ["music"]}
}"#;

const CROWD_ROWS: &str = "\
h1,p,o,Correct,9
h2,p,o,Incorrect,9
x1,p,o,Correct,1
x2,p,o,Correct,1
x3,p,o,Incorrect,1
y1,p,o,Correct,2
y2,p,o,Correct,2
";

const CROWD_METADATA: &str = r#"{
    "1": {"stratum": 0, "topics": ["sports"]},
    "2": {"stratum": 1, "topics": ["music"]},
    "9": {"stratum": 0, "topics": ["sports", "expert"]}
}"#;

fn write_annotator(dir: &Path, rows: &str, metadata: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("annotations.csv"), format!("{}{}", HEADER, rows)).unwrap();
    fs::write(dir.join("metadata.json"), metadata).unwrap();
}

fn write_errors(dir: &Path, rows: &str) {
    fs::write(
        dir.join("errorAnnotations.csv"),
        format!("Subject,Predicate,Object,Error\n{}", rows),
    )
    .unwrap();
}

fn fixture() -> (TempDir, RunContext) {
    let temp = TempDir::new().unwrap();
    let layout = DataLayout::new(temp.path());

    for n in 1..=3 {
        let dir = layout.expert_dir(n);
        write_annotator(&dir, EXPERT_ROWS, EXPERT_METADATA);
        write_errors(&dir, "h2,p,o,Wrong object\n");
    }
    for name in ["cat", "ann", "bob"] {
        write_annotator(&layout.laymen_dir().join(name), CROWD_ROWS, CROWD_METADATA);
    }
    write_errors(
        &layout.laymen_dir().join("ann"),
        "x3,p,o,Wrong object;Wrong predicate\n",
    );

    let weights = layout.strata_weights();
    fs::create_dir_all(weights.parent().unwrap()).unwrap();
    fs::write(&weights, "s1,s2\n0.6,0.4\n").unwrap();

    let config = TomlConfig {
        strata: 2,
        ..TomlConfig::default()
    };
    (temp, RunContext::new(layout, config))
}

#[test]
fn test_prepare_writes_dataset() {
    let (_temp, ctx) = fixture();
    let prepared = run_prepare(&ctx).unwrap();

    assert_eq!(prepared.ground_truth.len(), 4);
    assert_eq!(prepared.weights.len(), 3);
    assert_eq!(prepared.dropped, 0);

    let dataset = load_labeled_dataset(&ctx.layout.human_dataset(), 2).unwrap();
    assert_eq!(dataset, prepared.dataset);
    assert_eq!(dataset.len(), 9);
    assert_eq!(dataset.get(0, &Fact::new("x3", "p", "o")), Some(Label::Incorrect));
    assert_eq!(dataset.get(1, &Fact::new("y2", "p", "o")), Some(Label::Correct));

    let counts = prepared.label_counts();
    assert_eq!(counts.total().correct, 7);
    assert_eq!(counts.total().incorrect, 2);
}

#[test]
fn test_estimate_after_prepare() {
    let (_temp, ctx) = fixture();
    run_prepare(&ctx).unwrap();

    let report = run_estimate(&ctx, None).unwrap();
    // Stratum 1 clusters: honeypot batch [1, 0] and batch 1 [1, 1, 0]
    assert!((report.strata[0].accuracy - 7.0 / 12.0).abs() < 1e-12);
    assert!((report.strata[0].variance - 1.0 / 144.0).abs() < 1e-12);
    // Stratum 2 clusters: crowd batch 2 [1, 1] and expert batch e2 [1, 1]
    assert_eq!(report.strata[1].accuracy, 1.0);
    assert_eq!(report.strata[1].margin_of_error, 0.0);

    assert!((report.overall.accuracy - 0.75).abs() < 1e-12);
    let text = report.to_string();
    assert!(text.starts_with("Stratum 1: 0.58 +/- "));
    assert!(text.contains("Stratum 2: 1.00 +/- 0.00"));
    assert!(text.contains("KG: 0.75 +/- "));
}

#[test]
fn test_estimate_reports_stratum_without_clusters() {
    let (_temp, ctx) = fixture();
    let ctx = RunContext::new(
        ctx.layout.clone(),
        TomlConfig {
            strata: 3,
            ..ctx.config.clone()
        },
    );
    fs::write(ctx.layout.strata_weights(), "s1,s2,s3\n0.6,0.4,0.0\n").unwrap();
    run_prepare(&ctx).unwrap();

    let report = run_estimate(&ctx, None).unwrap();
    assert_eq!(report.strata.len(), 3);
    assert!(!report.strata[2].is_defined());
    assert!((report.overall.accuracy - 0.75).abs() < 1e-12);
    assert!(report.overall.is_defined());

    let text = report.to_string();
    assert!(text.contains("Stratum 3: n/a +/- inf"));
    assert!(text.contains("KG: 0.75 +/- "));
}

#[test]
fn test_estimate_requires_dataset() {
    let (_temp, ctx) = fixture();
    let err = run_estimate(&ctx, None).unwrap_err();
    assert!(matches!(err, Error::Load { .. }));
}

#[test]
fn test_estimate_rejects_invalid_alpha() {
    let (_temp, ctx) = fixture();
    run_prepare(&ctx).unwrap();
    assert!(matches!(run_estimate(&ctx, Some(2.0)), Err(Error::InvalidInput(_))));
}

#[test]
fn test_annotator_without_honeypots_fails_prepare() {
    let (_temp, ctx) = fixture();
    write_annotator(
        &ctx.layout.laymen_dir().join("dan"),
        "x1,p,o,Correct,1\n",
        CROWD_METADATA,
    );

    let err = run_prepare(&ctx).unwrap_err();
    assert!(matches!(err, Error::UndefinedReliability(name) if name == "dan"));
}

#[test]
fn test_stats_report() {
    let (_temp, ctx) = fixture();
    let stats = run_stats(&ctx).unwrap();

    assert_eq!(stats.experts.disagreements, 0);
    assert_eq!(stats.experts.kappa, 1.0);
    assert_eq!(stats.crowd.annotators, 3);
    assert_eq!(stats.crowd.total_annotations, 21);
    assert_eq!(stats.crowd.distinct_facts, 7);
    assert_eq!(stats.crowd.distinct_honeypot_facts, 2);
    assert_eq!(stats.strata.expert[0].total(), 2);
    assert_eq!(stats.strata.crowd_facts, vec![5, 2]);
}

#[test]
fn test_error_stats_report() {
    let (_temp, ctx) = fixture();
    let stats = run_error_stats(&ctx).unwrap();

    assert_eq!(stats.total(), 4);
    assert_eq!(stats.get("Wrong object"), 3);
    assert!(stats.to_string().contains("Wrong object+Wrong predicate: 1 (25%)"));
}

#[test]
fn test_evaluate_llm_report() {
    let (_temp, ctx) = fixture();
    let llm_dataset = ctx.layout.llm_dataset();
    fs::create_dir_all(llm_dataset.parent().unwrap()).unwrap();
    fs::write(
        &llm_dataset,
        r#"{"0": ["h1", "p", "o"], "1": ["h2", "p", "o"], "2": ["h3", "p", "o"], "3": ["h4", "p", "o"]}"#,
    )
    .unwrap();
    let llm_dir = ctx.layout.llm_annotations_dir();
    fs::create_dir_all(&llm_dir).unwrap();
    fs::write(
        llm_dir.join("model.json"),
        r#"{
            "0": {"label": "correct", "retries": 0},
            "1": {"label": "correct", "retries": 0},
            "2": {"label": "idk", "retries": 1},
            "3": {"label": "correct", "retries": 0}
        }"#,
    )
    .unwrap();

    let evaluations = run_evaluate_llm(&ctx).unwrap();
    assert_eq!(evaluations.len(), 1);
    let eval = &evaluations[0];
    assert_eq!(eval.name, "model");
    assert_eq!(eval.compliance, 0.75);
    assert_eq!(eval.accuracy, 0.5);
    assert_eq!(eval.truthfulness, 0.75);
    assert_eq!(eval.informativeness, 0.75);
    assert_eq!(eval.predicted.correct, 3);
}
