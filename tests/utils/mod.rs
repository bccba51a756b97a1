use std::fs;
use std::path::{Path, PathBuf};

use nora_vas::output::STANDARD_FEATURE_COLUMNS;
use tempfile::TempDir;

/// Position of the label column in the fixture tables, identifier included
pub const LABEL_POSITION: usize = 10;

/// Number of valid cases in the survey fixture
pub const SURVEY_CASES: usize = 60;

/// Number of valid cases in the register fixture
pub const REGISTER_CASES: usize = 20;

const ELICITORS: [&str; 5] = ["food", "insects", "drugs", "other", "idiopathic"];

/// One fixture row before it is laid out as a record
#[derive(Debug, Clone)]
pub struct Case {
    pub id: String,
    pub answers: Vec<String>,
    pub label: String,
}

impl Case {
    /// Fields in file order with the label inserted at [`LABEL_POSITION`]
    #[must_use]
    pub fn record_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.answers.len() + 2);
        fields.push(self.id.clone());
        fields.extend(self.answers.iter().cloned());
        fields.insert(LABEL_POSITION, self.label.clone());
        fields
    }
}

/// Header of the fixture tables
#[must_use]
pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = std::iter::once("case_id")
        .chain(STANDARD_FEATURE_COLUMNS)
        .map(str::to_string)
        .collect();
    columns.insert(LABEL_POSITION, "VAS_MK".to_string());
    columns
}

/// Answers of pattern `n`; the low six bits of `n` make the pattern unique
#[must_use]
pub fn answers(n: usize) -> Vec<String> {
    (0..STANDARD_FEATURE_COLUMNS.len())
        .map(|j| match j {
            0..6 => yes_no((n >> j) & 1 == 1),
            22 => yes_no(n % 2 == 0),
            23 => ELICITORS[n % ELICITORS.len()].to_string(),
            _ => yes_no((n + j) % 3 == 0),
        })
        .collect()
}

fn yes_no(yes: bool) -> String {
    if yes { "yes" } else { "no" }.to_string()
}

/// Severity label for pattern `n`, between 1 and 7
#[must_use]
pub fn label(n: usize) -> String {
    (1 + (n & 0x3f).count_ones()).to_string()
}

/// Valid survey cases `S0..S59`
#[must_use]
pub fn survey_cases() -> Vec<Case> {
    (0..SURVEY_CASES)
        .map(|n| Case {
            id: format!("S{n}"),
            answers: answers(n),
            label: label(n),
        })
        .collect()
}

/// Survey rows every training filter must drop
#[must_use]
pub fn rejected_survey_cases() -> Vec<Case> {
    let mut unknown = answers(3);
    unknown[4] = "unknown".to_string();
    vec![
        Case {
            id: "X-unknown".to_string(),
            answers: unknown,
            label: "5".to_string(),
        },
        Case {
            id: "X-unlabelled".to_string(),
            answers: answers(61),
            label: String::new(),
        },
        Case {
            id: "X-zero".to_string(),
            answers: answers(62),
            label: "0".to_string(),
        },
    ]
}

/// Valid register cases `R0..R19`
#[must_use]
pub fn register_cases() -> Vec<Case> {
    (0..REGISTER_CASES)
        .map(|n| Case {
            id: format!("R{n}"),
            answers: answers(n * 3 + 1),
            label: String::new(),
        })
        .collect()
}

/// Register rows the register filter must drop
#[must_use]
pub fn rejected_register_cases() -> Vec<Case> {
    let mut unknown = answers(5);
    unknown[0] = "unknown".to_string();
    let mut empty = answers(6);
    empty[12] = String::new();
    vec![
        Case {
            id: "Q-unknown".to_string(),
            answers: unknown,
            label: String::new(),
        },
        Case {
            id: "Q-empty".to_string(),
            answers: empty,
            label: String::new(),
        },
    ]
}

/// Interleave rejected rows into valid ones at fixed positions
#[must_use]
pub fn interleave(valid: Vec<Case>, rejected: Vec<Case>) -> Vec<Case> {
    let mut rows = valid;
    for (i, case) in rejected.into_iter().enumerate() {
        let at = (i * 7 + 2).min(rows.len());
        rows.insert(at, case);
    }
    rows
}

/// Write a fixture table with its header line
pub fn write_table(path: &Path, cases: &[Case]) {
    let mut content = header().join(",");
    content.push('\n');
    for case in cases {
        content.push_str(&case.record_fields().join(","));
        content.push('\n');
    }
    fs::write(path, content).unwrap();
}

/// Properties text with fixture defaults, overridden by `overrides`
#[must_use]
pub fn properties(overrides: &[(&str, &str)]) -> String {
    let defaults = [
        ("training.data.file", "survey.csv"),
        ("register.data.file", "register.csv"),
        ("training.data.shuffle.seed", "42"),
        ("ann.initalizing.seed", "123"),
        ("training.data.size", "40"),
        ("training.epochs", "60"),
        ("training.evaluate.while.training", "false"),
        ("training.data.ignore.unknown", "true"),
        ("training.data.filter.duplicate", "true"),
        ("register.data.limit", "20"),
        ("output.parquet", "true"),
    ];
    let mut lines = vec!["# fixture configuration".to_string()];
    for (key, value) in defaults {
        let value = overrides
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(value, |(_, v)| *v);
        lines.push(format!("{key}={value}"));
    }
    for (key, value) in overrides {
        if !defaults.iter().any(|(k, _)| k == key) {
            lines.push(format!("{key}={value}"));
        }
    }
    lines.join("\n")
}

/// A data directory holding both fixture tables and a configuration
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// Create the data directory with the given configuration overrides
    #[must_use]
    pub fn new(overrides: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        write_table(
            &input.join("survey.csv"),
            &interleave(survey_cases(), rejected_survey_cases()),
        );
        write_table(
            &input.join("register.csv"),
            &interleave(register_cases(), rejected_register_cases()),
        );
        let fixture = Self { dir };
        fixture.configure(overrides);
        fixture
    }

    /// Replace the configuration file
    pub fn configure(&self, overrides: &[(&str, &str)]) {
        fs::write(self.path().join("config.properties"), properties(overrides)).unwrap();
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn output(&self, name: &str) -> PathBuf {
        self.path().join("output").join(name)
    }

    #[must_use]
    pub fn temp(&self, name: &str) -> PathBuf {
        self.path().join("temp").join(name)
    }
}

/// Lines of a delimited file split into fields
#[must_use]
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}
