use crate::schema::ComponentNames;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Settings key of the grading section.
pub const GRADING_SETTINGS_KEY: &str = "setup.grading";

const MAX_NAME_LEN: usize = 80;
const MAX_QUALITATIVE_GRADES: usize = 64;

/// Workspace grading configuration. Weight policy (final share, tolerance,
/// score range) is fixed and not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingPolicy {
    pub qualitative_grades: Vec<String>,
    pub default_component_name: String,
    pub final_component_name: String,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            qualitative_grades: vec![
                "Prejardín".to_string(),
                "Jardín".to_string(),
                "Transición".to_string(),
            ],
            default_component_name: "Activity 1".to_string(),
            final_component_name: "Final Evaluation".to_string(),
        }
    }
}

impl GradingPolicy {
    pub fn component_names(&self) -> ComponentNames {
        ComponentNames {
            default_component: self.default_component_name.clone(),
            final_component: self.final_component_name.clone(),
        }
    }

    /// Defaults overlaid with whatever saved fields still validate.
    pub fn from_saved(saved: Option<&Value>) -> Self {
        let mut policy = Self::default();
        if let Some(obj) = saved.and_then(|v| v.as_object()) {
            for (k, v) in obj {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                // Malformed historical values must not block opening a gradebook.
                if let Err(e) = policy.merge_patch(&single) {
                    warn!(field = %k, error = %e, "ignoring invalid saved grading setting");
                }
            }
        }
        policy
    }

    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "qualitativeGrades" => {
                    let Some(arr) = v.as_array() else {
                        return Err("qualitativeGrades must be an array of strings".into());
                    };
                    if arr.len() > MAX_QUALITATIVE_GRADES {
                        return Err(format!(
                            "qualitativeGrades must have at most {} entries",
                            MAX_QUALITATIVE_GRADES
                        ));
                    }
                    let mut grades = Vec::with_capacity(arr.len());
                    for item in arr {
                        let name = parse_name(item, k)?;
                        if !grades.iter().any(|g: &String| g.to_lowercase() == name.to_lowercase()) {
                            grades.push(name);
                        }
                    }
                    next.qualitative_grades = grades;
                }
                "defaultComponentName" => {
                    next.default_component_name = parse_name(v, k)?;
                }
                "finalComponentName" => {
                    next.final_component_name = parse_name(v, k)?;
                }
                _ => return Err(format!("unknown grading field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }
}

fn parse_name(v: &Value, key: &str) -> Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be string", key))?
        .trim();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if s.chars().count() > MAX_NAME_LEN {
        return Err(format!("{} length must be <= {}", key, MAX_NAME_LEN));
    }
    Ok(s.to_string())
}
