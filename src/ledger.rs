use crate::error::{GradebookError, GradebookResult};
use crate::qualitative::{GradingMode, QualitativeCategory};
use crate::schema::GradeComponent;
use std::collections::{BTreeMap, HashSet};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 5.0;

/// What was typed or picked for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreInput {
    Raw(String),
    Category(QualitativeCategory),
}

/// Raw scores per (student, component). `None` is "ungraded", which is not
/// the same as a score of 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreLedger {
    students: Vec<String>,
    entries: BTreeMap<(String, String), Option<f64>>,
}

impl ScoreLedger {
    pub fn new(students: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let students = students
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self {
            students,
            entries: BTreeMap::new(),
        }
    }

    pub fn students(&self) -> &[String] {
        &self.students
    }

    pub fn has_student(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s == student_id)
    }

    /// Validates and stores one cell. Rejected input leaves the entry as it was.
    pub fn set_score(
        &mut self,
        mode: GradingMode,
        student_id: &str,
        component_id: &str,
        input: &ScoreInput,
    ) -> GradebookResult<Option<f64>> {
        if !self.has_student(student_id) {
            return Err(GradebookError::not_found(format!(
                "student not found: {student_id}"
            )));
        }
        let key = (student_id.to_string(), component_id.to_string());
        if !self.entries.contains_key(&key) {
            return Err(GradebookError::not_found(format!(
                "component not found: {component_id}"
            )));
        }

        let value = match (mode, input) {
            (GradingMode::Quantitative, ScoreInput::Raw(raw)) => parse_quantitative(raw)?,
            (GradingMode::Quantitative, ScoreInput::Category(_)) => {
                return Err(GradebookError::validation(
                    "categories are only accepted in qualitative grading",
                ))
            }
            (GradingMode::Qualitative, ScoreInput::Category(c)) => Some(c.numeric_equivalent()),
            (GradingMode::Qualitative, ScoreInput::Raw(raw)) => {
                if raw.trim().is_empty() {
                    None
                } else {
                    let Some(c) = QualitativeCategory::parse(raw) else {
                        return Err(GradebookError::validation(format!(
                            "unknown category '{}' (expected DS, DA, DB or SP)",
                            raw.trim()
                        )));
                    };
                    Some(c.numeric_equivalent())
                }
            }
        };

        self.entries.insert(key, value);
        Ok(value)
    }

    /// Inserts a persisted value as-is, registering unknown students.
    pub fn load_value(&mut self, student_id: &str, component_id: &str, value: Option<f64>) {
        if !self.has_student(student_id) {
            self.students.push(student_id.to_string());
        }
        self.entries
            .insert((student_id.to_string(), component_id.to_string()), value);
    }

    pub fn get_score(&self, student_id: &str, component_id: &str) -> Option<f64> {
        self.entries
            .get(&(student_id.to_string(), component_id.to_string()))
            .copied()
            .flatten()
    }

    pub fn clear_period(&mut self) {
        self.students.clear();
        self.entries.clear();
    }

    /// Makes the key set exactly students x components: missing pairs become
    /// ungraded, orphaned pairs are dropped. Returns how many were dropped.
    pub fn sync_components(&mut self, components: &[GradeComponent]) -> usize {
        let before = self.entries.len();
        let students = &self.students;
        self.entries.retain(|(s, c), _| {
            students.contains(s) && components.iter().any(|comp| comp.id == *c)
        });
        let dropped = before - self.entries.len();

        for s in &self.students {
            for c in components {
                self.entries.entry((s.clone(), c.id.clone())).or_insert(None);
            }
        }
        dropped
    }

    pub fn remove_component(&mut self, component_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, c), _| c != component_id);
        before - self.entries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

fn parse_quantitative(raw: &str) -> GradebookResult<Option<f64>> {
    let t = raw.trim();
    if t.is_empty() {
        return Ok(None);
    }
    let v: f64 = t
        .parse()
        .map_err(|_| GradebookError::validation(format!("'{t}' is not a number")))?;
    if v.is_nan() {
        return Err(GradebookError::validation(format!("'{t}' is not a number")));
    }
    if !(SCORE_MIN..=SCORE_MAX).contains(&v) {
        return Err(GradebookError::validation(format!(
            "score must be between {SCORE_MIN} and {SCORE_MAX}, got {v}"
        )));
    }
    Ok(Some(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: &str) -> GradeComponent {
        GradeComponent {
            id: id.to_string(),
            name: id.to_string(),
            weight_percent: 50.0,
            is_final: false,
        }
    }

    fn ledger() -> ScoreLedger {
        let mut l = ScoreLedger::new(vec!["s1".into(), "s2".into()]);
        l.sync_components(&[component("a"), component("b")]);
        l
    }

    fn raw(s: &str) -> ScoreInput {
        ScoreInput::Raw(s.to_string())
    }

    #[test]
    fn sync_fills_every_pair_as_ungraded() {
        let l = ledger();
        assert_eq!(l.entry_count(), 4);
        assert_eq!(l.get_score("s1", "a"), None);
    }

    #[test]
    fn out_of_range_is_rejected_and_entry_kept() {
        let mut l = ledger();
        l.set_score(GradingMode::Quantitative, "s1", "a", &raw("4.5"))
            .expect("valid");

        let err = l
            .set_score(GradingMode::Quantitative, "s1", "a", &raw("7"))
            .unwrap_err();
        assert!(matches!(err, GradebookError::Validation(_)));
        assert_eq!(l.get_score("s1", "a"), Some(4.5));

        for bad in ["-0.1", "abc", "NaN", "5.01"] {
            assert!(l
                .set_score(GradingMode::Quantitative, "s1", "a", &raw(bad))
                .is_err());
        }
        assert_eq!(l.get_score("s1", "a"), Some(4.5));
    }

    #[test]
    fn empty_input_means_ungraded_not_zero() {
        let mut l = ledger();
        l.set_score(GradingMode::Quantitative, "s1", "a", &raw("0"))
            .expect("zero");
        assert_eq!(l.get_score("s1", "a"), Some(0.0));
        l.set_score(GradingMode::Quantitative, "s1", "a", &raw("  "))
            .expect("blank");
        assert_eq!(l.get_score("s1", "a"), None);
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut l = ledger();
        assert_eq!(
            l.set_score(GradingMode::Quantitative, "s1", "a", &raw("5"))
                .expect("max"),
            Some(5.0)
        );
        assert_eq!(
            l.set_score(GradingMode::Quantitative, "s1", "b", &raw("0.0"))
                .expect("min"),
            Some(0.0)
        );
    }

    #[test]
    fn qualitative_stores_numeric_equivalent() {
        let mut l = ledger();
        l.set_score(
            GradingMode::Qualitative,
            "s1",
            "a",
            &ScoreInput::Category(QualitativeCategory::DB),
        )
        .expect("category");
        assert_eq!(l.get_score("s1", "a"), Some(3.5));

        l.set_score(GradingMode::Qualitative, "s2", "a", &raw("da"))
            .expect("code");
        assert_eq!(l.get_score("s2", "a"), Some(4.0));

        assert!(l
            .set_score(GradingMode::Qualitative, "s2", "a", &raw("4.2"))
            .is_err());
        assert!(l
            .set_score(
                GradingMode::Quantitative,
                "s2",
                "a",
                &ScoreInput::Category(QualitativeCategory::DS)
            )
            .is_err());
    }

    #[test]
    fn unknown_keys_are_not_found() {
        let mut l = ledger();
        assert!(matches!(
            l.set_score(GradingMode::Quantitative, "zz", "a", &raw("1")),
            Err(GradebookError::NotFound(_))
        ));
        assert!(matches!(
            l.set_score(GradingMode::Quantitative, "s1", "zz", &raw("1")),
            Err(GradebookError::NotFound(_))
        ));
    }

    #[test]
    fn sync_drops_orphans_and_removal_clears_column() {
        let mut l = ledger();
        l.set_score(GradingMode::Quantitative, "s1", "b", &raw("3"))
            .expect("set");
        let dropped = l.sync_components(&[component("a"), component("c")]);
        assert_eq!(dropped, 2);
        assert_eq!(l.get_score("s1", "b"), None);
        assert_eq!(l.entry_count(), 4);

        assert_eq!(l.remove_component("c"), 2);
        assert_eq!(l.entry_count(), 2);
    }

    #[test]
    fn duplicate_roster_ids_are_kept_once_in_order() {
        let l = ScoreLedger::new(vec!["s2".into(), "s1".into(), "s2".into()]);
        assert_eq!(l.students(), ["s2".to_string(), "s1".to_string()]);
    }

    #[test]
    fn clear_period_wipes_everything() {
        let mut l = ledger();
        l.clear_period();
        assert_eq!(l.entry_count(), 0);
        assert!(l.students().is_empty());
    }
}
