use std::collections::HashMap;
use std::fs;

use nora_vas::output::STANDARD_FEATURE_COLUMNS;
use nora_vas::{DataDirectory, Domain, Pipeline, PipelineConfig, PipelineError};

use crate::utils::{
    Case, Fixture, REGISTER_CASES, SURVEY_CASES, answers, interleave, read_rows, register_cases,
    rejected_survey_cases, survey_cases, write_table,
};

fn run(fixture: &Fixture) -> nora_vas::Result<nora_vas::RunSummary> {
    let config = PipelineConfig::from_data_dir(fixture.path())?;
    Pipeline::new(DataDirectory::new(fixture.path()), config).run()
}

fn expected_header() -> Vec<String> {
    std::iter::once("case_id")
        .chain(STANDARD_FEATURE_COLUMNS)
        .chain(["actual_vas_score", "vas_score_ann"])
        .map(str::to_string)
        .collect()
}

/// Replace the survey table with the fixture cases plus `extra`
fn rewrite_survey(fixture: &Fixture, extra: Vec<Case>) -> Vec<Case> {
    let mut cases = survey_cases();
    cases.extend(extra);
    write_table(
        &fixture.path().join("input").join("survey.csv"),
        &interleave(cases.clone(), rejected_survey_cases()),
    );
    cases
}

fn assert_score(value: &str) {
    let score: i64 = value.parse().unwrap();
    assert!((0..=10).contains(&score), "score {score} out of range");
}

/// A full run writes every intermediate and result file
#[test]
fn test_run_writes_all_outputs() {
    let fixture = Fixture::new(&[]);
    let summary = run(&fixture).unwrap();

    assert_eq!(summary.training_rows_read, SURVEY_CASES + 3);
    assert_eq!(summary.training_rows_kept, SURVEY_CASES);
    assert_eq!(summary.training_partition, 40);
    assert_eq!(summary.verification_partition, SURVEY_CASES - 41);
    assert!(!summary.self_evaluation);
    assert!(!summary.model_loaded);
    assert!(summary.verification_accuracy.is_some());
    assert_eq!(summary.register_rows_classified, REGISTER_CASES);

    let train = read_rows(&fixture.temp("train_data.csv"));
    assert_eq!(train.len(), 40);
    assert!(train.iter().all(|row| row.len() == STANDARD_FEATURE_COLUMNS.len() + 1));
    assert_eq!(read_rows(&fixture.temp("verification_data.csv")).len(), SURVEY_CASES - 41);
    assert_eq!(read_rows(&fixture.temp("register_data.csv")).len(), REGISTER_CASES);

    for name in [
        "verification.csv",
        "ann_calculated.csv",
        "model.json",
        "run_summary.json",
        "verification.parquet",
        "ann_calculated.parquet",
    ] {
        assert!(fixture.output(name).is_file(), "{name} missing");
    }

    let summary_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fixture.output("run_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary_json["training_partition"], 40);
}

/// Verification rows carry the identifier, answers and label of their source case
#[test]
fn test_verification_results_reconcile_to_source_cases() {
    let fixture = Fixture::new(&[]);
    run(&fixture).unwrap();

    let cases: HashMap<String, _> = survey_cases()
        .into_iter()
        .map(|case| (case.id.clone(), case))
        .collect();
    let rows = read_rows(&fixture.output("verification.csv"));
    assert_eq!(rows[0], expected_header());
    assert_eq!(rows.len() - 1, SURVEY_CASES - 41);

    for row in &rows[1..] {
        assert_eq!(row.len(), 27);
        let case = &cases[&row[0]];
        assert_eq!(&row[1..25], case.answers.as_slice());
        assert_eq!(row[25], case.label);
        assert_score(&row[26]);
    }
}

/// Register results keep the order of the register file
#[test]
fn test_register_results_preserve_order() {
    let fixture = Fixture::new(&[]);
    run(&fixture).unwrap();

    let rows = read_rows(&fixture.output("ann_calculated.csv"));
    assert_eq!(rows[0], expected_header());

    let expected = register_cases();
    assert_eq!(rows.len() - 1, expected.len());
    for (row, case) in rows[1..].iter().zip(&expected) {
        assert_eq!(row[0], case.id);
        assert_eq!(&row[1..25], case.answers.as_slice());
        assert_eq!(row[25], "");
        assert_score(&row[26]);
    }
}

/// The register limit keeps only the first rows
#[test]
fn test_register_limit_truncates() {
    let fixture = Fixture::new(&[("register.data.limit", "3")]);
    let summary = run(&fixture).unwrap();
    assert_eq!(summary.register_rows_classified, 3);

    let ids: Vec<String> = read_rows(&fixture.output("ann_calculated.csv"))[1..]
        .iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(ids, ["R0", "R1", "R2"]);
}

/// A negative training size verifies on the training rows themselves
#[test]
fn test_self_evaluation() {
    let fixture = Fixture::new(&[("training.data.size", "-1")]);
    let summary = run(&fixture).unwrap();

    assert!(summary.self_evaluation);
    assert_eq!(summary.training_partition, SURVEY_CASES);
    assert_eq!(summary.verification_partition, SURVEY_CASES);
    assert_eq!(read_rows(&fixture.output("verification.csv")).len(), SURVEY_CASES + 1);
}

/// Training size beyond the filtered rows is rejected
#[test]
fn test_oversized_training_partition() {
    let fixture = Fixture::new(&[("training.data.size", "500")]);
    assert!(matches!(run(&fixture), Err(PipelineError::Configuration(_))));
}

/// Two runs with the same seeds give the same predictions
#[test]
fn test_runs_are_reproducible() {
    let first = Fixture::new(&[]);
    let second = Fixture::new(&[]);
    run(&first).unwrap();
    run(&second).unwrap();

    for name in ["verification.csv", "ann_calculated.csv"] {
        assert_eq!(
            fs::read_to_string(first.output(name)).unwrap(),
            fs::read_to_string(second.output(name)).unwrap()
        );
    }
}

/// A saved classifier is reused and the verification table is skipped
#[test]
fn test_saved_model_skips_verification() {
    let fixture = Fixture::new(&[]);
    run(&fixture).unwrap();
    let trained = fs::read_to_string(fixture.output("ann_calculated.csv")).unwrap();

    fs::copy(
        fixture.output("model.json"),
        fixture.path().join("ann").join("saved.json"),
    )
    .unwrap();
    fs::remove_file(fixture.output("verification.csv")).unwrap();
    fixture.configure(&[("ann.use.saved.ann", "true"), ("ann.file.name", "saved.json")]);

    let summary = run(&fixture).unwrap();
    assert!(summary.model_loaded);
    assert!(summary.verification_accuracy.is_none());
    assert!(!fixture.output("verification.csv").exists());
    assert_eq!(
        fs::read_to_string(fixture.output("ann_calculated.csv")).unwrap(),
        trained
    );
}

/// A missing saved classifier fails the run
#[test]
fn test_missing_saved_model() {
    let fixture = Fixture::new(&[("ann.use.saved.ann", "true"), ("ann.file.name", "absent.json")]);
    assert!(matches!(run(&fixture), Err(PipelineError::Io(_))));
}

/// Cases sharing answers but not a label are each reported once with their own label
#[test]
fn test_shared_answers_reconcile_to_each_case() {
    let fixture = Fixture::new(&[
        ("training.data.filter.duplicate", "false"),
        ("training.data.size", "-1"),
    ]);
    let cases = rewrite_survey(
        &fixture,
        vec![Case {
            id: "S5-twin".to_string(),
            answers: answers(5),
            label: "9".to_string(),
        }],
    );
    let summary = run(&fixture).unwrap();
    assert_eq!(summary.confusions, 1);
    assert_eq!(summary.training_rows_kept, SURVEY_CASES + 1);

    let rows = read_rows(&fixture.output("verification.csv"));
    assert_eq!(rows.len() - 1, cases.len());
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for row in &rows[1..] {
        let case = cases.iter().find(|case| case.id == row[0]).unwrap();
        assert_eq!(&row[1..25], case.answers.as_slice());
        assert_eq!(row[25], case.label, "wrong label for {}", case.id);
        *seen.entry(case.id.as_str()).or_default() += 1;
    }
    assert_eq!(seen.len(), cases.len());
    assert!(seen.values().all(|&count| count == 1));
    assert_eq!(seen["S5"], 1);
    assert_eq!(seen["S5-twin"], 1);
}

/// Rows with an empty answer are dropped and counted instead of failing the run
#[test]
fn test_unencodable_training_rows_are_dropped() {
    let fixture = Fixture::new(&[("training.data.size", "-1")]);
    let mut empty = answers(63);
    empty[7] = String::new();
    rewrite_survey(
        &fixture,
        vec![Case {
            id: "S-empty".to_string(),
            answers: empty,
            label: "4".to_string(),
        }],
    );

    let summary = run(&fixture).unwrap();
    assert_eq!(summary.training_rows_kept, SURVEY_CASES);
    assert_eq!(summary.training_rows_unencodable, 1);
    let rows = read_rows(&fixture.output("verification.csv"));
    assert!(rows.iter().all(|row| row[0] != "S-empty"));
}

/// A broken dictionary fails the run before any working directory is created
#[test]
fn test_dictionary_failure_leaves_data_directory_untouched() {
    let fixture = Fixture::new(&[]);
    let dictionaries = fixture.path().join("dictionary");
    fs::create_dir(&dictionaries).unwrap();
    for domain in Domain::ALL {
        fs::write(dictionaries.join(domain.resource_file()), domain.embedded_table()).unwrap();
    }
    fs::write(dictionaries.join("sex.csv"), "zero,female\n").unwrap();

    assert!(matches!(run(&fixture), Err(PipelineError::Configuration(_))));
    for dir in ["temp", "output", "ann"] {
        assert!(!fixture.path().join(dir).exists(), "{dir} was created");
    }
}
