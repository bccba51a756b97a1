use nora_vas::ingest::{Table, detect_conflicts};
use nora_vas::reconcile::{RegisterIndex, TrainingIndex};
use nora_vas::transform::CategoricalTransform;
use nora_vas::{DictionaryRegistry, Header, PipelineError, Record, shuffle};

use crate::utils::{LABEL_POSITION, header, survey_cases};

fn records() -> Vec<Record> {
    survey_cases()
        .iter()
        .map(|case| Record::new(case.record_fields()))
        .collect()
}

/// Shuffled, encoded rows still resolve to the case they were built from
#[test]
fn test_shuffled_rows_resolve_to_their_cases() {
    let registry = DictionaryRegistry::embedded().unwrap();
    let header = Header::new(header());
    let records = records();
    let mut index = TrainingIndex::build(&records, LABEL_POSITION);
    assert_eq!(index.len(), records.len());

    let transform = CategoricalTransform::new(&registry, &header).unwrap();
    let rows = shuffle(transform.transform_all(&records).unwrap(), 7);

    for row in &rows {
        assert!(row.values().iter().all(|v| v.as_f32().is_ok()));
        let resolved = index.resolve(row, &transform).unwrap();
        let case = survey_cases()
            .into_iter()
            .find(|c| c.id == resolved.entry.case_id)
            .unwrap();
        assert_eq!(resolved.features, case.answers);
        assert_eq!(resolved.entry.label, case.label);
    }
}

/// Rows whose answers were never indexed fail with a reconciliation error
#[test]
fn test_unindexed_row_is_reconciliation_error() {
    let registry = DictionaryRegistry::embedded().unwrap();
    let header = Header::new(header());
    let records = records();
    let mut index = TrainingIndex::build(&records[..10], LABEL_POSITION);

    let transform = CategoricalTransform::new(&registry, &header).unwrap();
    let outside = transform.transform(&records[20]).unwrap();
    assert!(matches!(
        index.resolve(&outside, &transform),
        Err(PipelineError::Reconciliation(_))
    ));
}

/// Register identifiers are looked up by position only
#[test]
fn test_register_positions() {
    let records = records();
    let mut index = RegisterIndex::build(&records);
    assert_eq!(index.case_id(0).unwrap(), "S0");
    assert_eq!(index.case_id(59).unwrap(), "S59");

    index.truncate(5);
    assert_eq!(index.len(), 5);
    assert!(matches!(index.case_id(5), Err(PipelineError::Reconciliation(_))));
}

/// Duplicate filtering keeps the first case and reports confusions
#[test]
fn test_duplicates_and_confusions() {
    let content = "\
id,skin,nausea,VAS_MK
a,yes,no,3
b,yes,no,3
c,yes,no,6
d,no,no,2
";
    let table = Table::parse(content, "inline").unwrap();
    let filtered = detect_conflicts(table.clone(), true).unwrap();
    let ids: Vec<&str> = filtered.records.iter().map(Record::case_id).collect();
    assert_eq!(ids, ["a", "d"]);
    assert_eq!(filtered.diagnostics.duplicates, 2);
    assert_eq!(filtered.diagnostics.confusions, 1);

    let confusing: Vec<_> = filtered.diagnostics.confusion_groups().collect();
    assert_eq!(confusing.len(), 1);
    assert_eq!(confusing[0].case_ids, ["a", "b", "c"]);

    let unfiltered = detect_conflicts(table, false).unwrap();
    assert_eq!(unfiltered.records.len(), 4);
}
