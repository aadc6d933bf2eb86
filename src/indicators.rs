use crate::error::{GradebookError, GradebookResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-text achievement descriptor. Saved with the grades, never scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: String,
    pub text: String,
    pub period: i64,
    pub area_id: String,
    pub grade_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorRegistry {
    grade_id: String,
    area_id: String,
    period: i64,
    items: Vec<Indicator>,
}

impl IndicatorRegistry {
    pub fn new(grade_id: &str, area_id: &str, period: i64, items: Vec<Indicator>) -> Self {
        Self {
            grade_id: grade_id.to_string(),
            area_id: area_id.to_string(),
            period,
            items,
        }
    }

    pub fn items(&self) -> &[Indicator] {
        &self.items
    }

    /// Appends a blank indicator and returns its id.
    pub fn add(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.items.push(Indicator {
            id: id.clone(),
            text: String::new(),
            period: self.period,
            area_id: self.area_id.clone(),
            grade_id: self.grade_id.clone(),
        });
        id
    }

    pub fn update(&mut self, id: &str, text: &str) -> GradebookResult<()> {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return Err(GradebookError::not_found(format!("indicator not found: {id}")));
        };
        item.text = text.to_string();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> GradebookResult<Indicator> {
        let Some(idx) = self.items.iter().position(|i| i.id == id) else {
            return Err(GradebookError::not_found(format!("indicator not found: {id}")));
        };
        Ok(self.items.remove(idx))
    }
}
