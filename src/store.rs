use crate::indicators::Indicator;
use serde::{Deserialize, Serialize};

/// Which gradebook is open: one grade, one area, one period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub grade_id: String,
    pub area_id: String,
    pub period: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub id: String,
    pub display_name: String,
}

/// One component cell as exchanged with the store. Hydrated values may be
/// null; saved values never are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreNote {
    pub component_id: String,
    pub name: String,
    pub value: Option<f64>,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentScoreRecord {
    pub student_id: String,
    pub notes: Vec<ScoreNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub grade_id: String,
    pub area_id: String,
    pub period: i64,
    pub scores: Vec<StudentScoreRecord>,
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HydrationData {
    pub grade_name: String,
    pub students: Vec<StudentRef>,
    pub records: Vec<StudentScoreRecord>,
    pub indicators: Vec<Indicator>,
}

/// Persistence collaborator: hydration queries plus the single save mutation.
pub trait GradeStore {
    fn grade_name(&self, grade_id: &str) -> anyhow::Result<Option<String>>;
    fn load_students(&self, grade_id: &str) -> anyhow::Result<Vec<StudentRef>>;
    fn load_scores(&self, selection: &Selection) -> anyhow::Result<Vec<StudentScoreRecord>>;
    fn load_indicators(&self, selection: &Selection) -> anyhow::Result<Vec<Indicator>>;
    fn save(&self, payload: &SavePayload) -> anyhow::Result<SaveOutcome>;

    /// `None` when the grade does not exist.
    fn load_hydration(&self, selection: &Selection) -> anyhow::Result<Option<HydrationData>> {
        let Some(grade_name) = self.grade_name(&selection.grade_id)? else {
            return Ok(None);
        };
        Ok(Some(HydrationData {
            grade_name,
            students: self.load_students(&selection.grade_id)?,
            records: self.load_scores(selection)?,
            indicators: self.load_indicators(selection)?,
        }))
    }
}
