//! Bidirectional categorical code tables
//!
//! Each survey domain (yes/no answers, sex, elicitor group, severity scale)
//! maps category labels to integer codes and back. The tables are loaded once
//! at start-up, either from the copies compiled into the binary or from a
//! `dictionary/` directory inside the data directory, and are immutable
//! afterwards.

pub mod domain;

pub use domain::{Domain, TRANSFORM_PRIORITY};

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::util::safe_read_to_string;
use crate::error::{PipelineError, Result};

/// A code table and its exact inverse
#[derive(Debug, Clone)]
pub struct Dictionary {
    domain: Domain,
    labels: BTreeMap<i64, String>,
    codes: FxHashMap<String, i64>,
}

impl Dictionary {
    /// Parse a `code,label` table
    ///
    /// Blank lines are skipped. A line without exactly two fields, a
    /// non-integer code, or a code or label defined twice is rejected,
    /// because either would break the inverse mapping.
    pub fn parse(domain: Domain, content: &str) -> Result<Self> {
        let mut labels = BTreeMap::new();
        let mut codes = FxHashMap::default();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != 2 {
                return Err(PipelineError::configuration(format!(
                    "{domain} dictionary line {}: expected 'code,label' but found {} field(s)",
                    line_no + 1,
                    parts.len()
                )));
            }
            let code: i64 = parts[0].trim().parse().map_err(|_| {
                PipelineError::configuration(format!(
                    "{domain} dictionary line {}: code '{}' is not an integer",
                    line_no + 1,
                    parts[0]
                ))
            })?;
            let label = parts[1].to_string();

            if labels.insert(code, label.clone()).is_some() {
                return Err(PipelineError::configuration(format!(
                    "{domain} dictionary defines code {code} twice"
                )));
            }
            if codes.insert(label.clone(), code).is_some() {
                return Err(PipelineError::configuration(format!(
                    "{domain} dictionary defines label '{label}' twice"
                )));
            }
        }

        if labels.is_empty() {
            return Err(PipelineError::configuration(format!(
                "{domain} dictionary is empty"
            )));
        }

        Ok(Self {
            domain,
            labels,
            codes,
        })
    }

    /// Domain this table belongs to
    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    /// Code for an exact label match
    #[must_use]
    pub fn encode(&self, label: &str) -> Option<i64> {
        self.codes.get(label).copied()
    }

    /// Label for a code
    #[must_use]
    pub fn decode(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    /// Labels in code order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.values().map(String::as_str)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// All domain dictionaries of one run
#[derive(Debug, Clone)]
pub struct DictionaryRegistry {
    dictionaries: BTreeMap<Domain, Dictionary>,
}

impl DictionaryRegistry {
    /// Load every domain from the tables compiled into the binary
    pub fn embedded() -> Result<Self> {
        let mut dictionaries = BTreeMap::new();
        for domain in Domain::ALL {
            dictionaries.insert(domain, Dictionary::parse(domain, domain.embedded_table())?);
        }
        Self::checked(dictionaries)
    }

    /// Load every domain from `<dir>/<resource file>`
    ///
    /// # Errors
    /// Returns a configuration error if any domain's file is missing or
    /// malformed.
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let mut dictionaries = BTreeMap::new();
        for domain in Domain::ALL {
            dictionaries.insert(domain, load_from_directory(dir, domain)?);
        }
        log::info!(
            "Loaded {} dictionaries from {}",
            dictionaries.len(),
            dir.display()
        );
        Self::checked(dictionaries)
    }

    /// Plain yes/no answers must keep their codes in the table that also
    /// allows "unknown"; the transform only consults the latter
    fn checked(dictionaries: BTreeMap<Domain, Dictionary>) -> Result<Self> {
        let plain = &dictionaries[&Domain::NoYes];
        let extended = &dictionaries[&Domain::NoYesUnknown];
        for label in plain.labels() {
            let expected = plain.encode(label);
            let found = extended.encode(label);
            if found != expected {
                return Err(PipelineError::configuration(format!(
                    "answer '{label}' is coded {expected:?} in the {} dictionary but {found:?} in the {} dictionary",
                    Domain::NoYes,
                    Domain::NoYesUnknown
                )));
            }
        }
        Ok(Self { dictionaries })
    }

    /// Dictionary of a domain
    #[must_use]
    pub fn get(&self, domain: Domain) -> &Dictionary {
        // Both constructors populate every domain
        &self.dictionaries[&domain]
    }

    /// Encode a value against the transform priority list
    ///
    /// # Returns
    /// The first matching domain and its code, or `None` when no dictionary
    /// knows the label
    #[must_use]
    pub fn encode(&self, value: &str) -> Option<(Domain, i64)> {
        TRANSFORM_PRIORITY
            .iter()
            .find_map(|&domain| self.get(domain).encode(value).map(|code| (domain, code)))
    }

    /// Decode a code through a specific domain
    pub fn decode(&self, domain: Domain, code: i64) -> Result<&str> {
        self.get(domain).decode(code).ok_or_else(|| {
            PipelineError::reconciliation(format!("code {code} is not defined in the {domain} dictionary"))
        })
    }
}

/// Load a single domain's dictionary from a directory
pub fn load_from_directory(dir: &Path, domain: Domain) -> Result<Dictionary> {
    let path = dir.join(domain.resource_file());
    if !path.is_file() {
        return Err(PipelineError::configuration(format!(
            "Dictionary resource for domain '{domain}' not found: {}",
            path.display()
        )));
    }
    let content = safe_read_to_string(&path, "dictionary")?;
    Dictionary::parse(domain, &content)
}
