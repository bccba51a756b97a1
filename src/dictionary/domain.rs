//! Semantic domains of the survey code tables

use std::fmt;

use serde::{Deserialize, Serialize};

/// A semantic domain with its own categorical code table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Domain {
    /// Plain yes/no answers
    NoYes,
    /// Yes/no answers that allow "unknown"
    NoYesUnknown,
    /// Sex of the patient
    Sex,
    /// Elicitor group of the reaction
    Elicitor,
    /// Severity (VAS) scale, 0..=10
    Severity,
}

/// Order in which the categorical transform tries the domains
pub const TRANSFORM_PRIORITY: [Domain; 4] = [
    Domain::NoYesUnknown,
    Domain::Sex,
    Domain::Elicitor,
    Domain::Severity,
];

impl Domain {
    /// All domains, in load order
    pub const ALL: [Self; 5] = [
        Self::NoYes,
        Self::NoYesUnknown,
        Self::Sex,
        Self::Elicitor,
        Self::Severity,
    ];

    /// File name of the code table backing this domain
    #[must_use]
    pub const fn resource_file(self) -> &'static str {
        match self {
            Self::NoYes => "no_yes_answers.csv",
            Self::NoYesUnknown => "no_yes_unknown_answers.csv",
            Self::Sex => "sex.csv",
            Self::Elicitor => "elicitors.csv",
            Self::Severity => "vas.csv",
        }
    }

    /// Code table compiled into the binary
    #[must_use]
    pub const fn embedded_table(self) -> &'static str {
        match self {
            Self::NoYes => include_str!("../../resources/dictionary/no_yes_answers.csv"),
            Self::NoYesUnknown => {
                include_str!("../../resources/dictionary/no_yes_unknown_answers.csv")
            }
            Self::Sex => include_str!("../../resources/dictionary/sex.csv"),
            Self::Elicitor => include_str!("../../resources/dictionary/elicitors.csv"),
            Self::Severity => include_str!("../../resources/dictionary/vas.csv"),
        }
    }

    /// Short lowercase name used in logs and lookups
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoYes => "no_yes",
            Self::NoYesUnknown => "no_yes_unknown",
            Self::Sex => "sex",
            Self::Elicitor => "elicitor",
            Self::Severity => "severity",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
