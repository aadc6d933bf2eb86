use serde::{Deserialize, Serialize};

/// Grading scheme for a grade level. Qualitative grades use ordinal
/// categories and a single "Unique Score" component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradingMode {
    Quantitative,
    Qualitative,
}

impl GradingMode {
    /// Classifies a grade by name against the configured qualitative grades.
    pub fn for_grade_name<S: AsRef<str>>(grade_name: &str, qualitative_grades: &[S]) -> Self {
        let name = grade_name.trim();
        let hit = qualitative_grades
            .iter()
            .any(|g| g.as_ref().trim().to_lowercase() == name.to_lowercase());
        if hit {
            Self::Qualitative
        } else {
            Self::Quantitative
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quantitative => "quantitative",
            Self::Qualitative => "qualitative",
        }
    }
}

/// Superior, High, Basic, Not yet (sin presentar). Ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualitativeCategory {
    DS,
    DA,
    DB,
    SP,
}

impl QualitativeCategory {
    /// Value stored in the ledger when this category is picked.
    pub fn numeric_equivalent(self) -> f64 {
        match self {
            Self::DS => 5.0,
            Self::DA => 4.0,
            Self::DB => 3.5,
            Self::SP => 3.0,
        }
    }

    /// Output thresholds, evaluated top-down. Not the inverse of
    /// `numeric_equivalent`; both tables are kept as they are.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.6 {
            Self::DS
        } else if score >= 4.0 {
            Self::DA
        } else if score >= 3.5 {
            Self::DB
        } else {
            Self::SP
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DS" => Some(Self::DS),
            "DA" => Some(Self::DA),
            "DB" => Some(Self::DB),
            "SP" => Some(Self::SP),
            _ => None,
        }
    }
}
