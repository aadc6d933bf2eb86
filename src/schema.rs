use crate::calc::round_2;
use crate::error::{GradebookError, GradebookResult};
use crate::qualitative::GradingMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved component id of the final evaluation.
pub const FINAL_COMPONENT_ID: &str = "final";
pub const UNIQUE_COMPONENT_ID: &str = "unique";
pub const UNIQUE_SCORE_NAME: &str = "Unique Score";
/// Fixed share of the final evaluation when it is enabled.
pub const FINAL_WEIGHT: f64 = 30.0;
pub const WEIGHT_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeComponent {
    pub id: String,
    pub name: String,
    pub weight_percent: f64,
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidation {
    pub is_valid: bool,
    pub total_regular: f64,
    pub total_final: f64,
    pub total: f64,
}

/// Names used when the schema has to synthesize a component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNames {
    pub default_component: String,
    pub final_component: String,
}

impl Default for ComponentNames {
    fn default() -> Self {
        Self {
            default_component: "Activity 1".to_string(),
            final_component: "Final Evaluation".to_string(),
        }
    }
}

/// What a structural transition did. Removed ids must be dropped from the
/// ledger by the caller in the same step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeSchema {
    mode: GradingMode,
    names: ComponentNames,
    components: Vec<GradeComponent>,
}

impl GradeSchema {
    /// Fallback schema for a period with no persisted components.
    pub fn synthesized(mode: GradingMode, names: ComponentNames) -> Self {
        let component = match mode {
            GradingMode::Quantitative => GradeComponent {
                id: new_component_id(),
                name: names.default_component.clone(),
                weight_percent: 100.0,
                is_final: false,
            },
            GradingMode::Qualitative => unique_score(UNIQUE_COMPONENT_ID.to_string()),
        };
        Self {
            mode,
            names,
            components: vec![component],
        }
    }

    /// Rebuilds a schema from persisted components, taking weights verbatim.
    /// Qualitative schemas collapse onto the first persisted component.
    pub fn hydrate(
        mode: GradingMode,
        names: ComponentNames,
        persisted: Vec<GradeComponent>,
    ) -> (Self, SchemaChange) {
        let mut change = SchemaChange::default();
        if persisted.is_empty() {
            return (Self::synthesized(mode, names), change);
        }

        let components = match mode {
            GradingMode::Qualitative => {
                let mut it = persisted.into_iter();
                let keep = it
                    .next()
                    .map(|c| c.id)
                    .unwrap_or_else(|| UNIQUE_COMPONENT_ID.to_string());
                change.removed = it.map(|c| c.id).collect();
                if !change.removed.is_empty() {
                    change.warnings.push(format!(
                        "qualitative grading keeps a single score; discarded {} extra component(s)",
                        change.removed.len()
                    ));
                }
                vec![unique_score(keep)]
            }
            GradingMode::Quantitative => {
                let mut seen_final = false;
                let mut out = Vec::with_capacity(persisted.len());
                for mut c in persisted {
                    c.is_final = c.id == FINAL_COMPONENT_ID;
                    if c.is_final {
                        if seen_final {
                            change.removed.push(c.id);
                            continue;
                        }
                        seen_final = true;
                    }
                    out.push(c);
                }
                if !out.iter().any(|c| !c.is_final) {
                    let id = new_component_id();
                    out.insert(
                        0,
                        GradeComponent {
                            id: id.clone(),
                            name: names.default_component.clone(),
                            weight_percent: 0.0,
                            is_final: false,
                        },
                    );
                    change.added.push(id);
                }
                out
            }
        };

        let mut schema = Self {
            mode,
            names,
            components,
        };
        // A synthesized regular component has no persisted weight to keep.
        if !change.added.is_empty() {
            schema.redistribute();
        }
        (schema, change)
    }

    pub fn mode(&self) -> GradingMode {
        self.mode
    }

    pub fn components(&self) -> &[GradeComponent] {
        &self.components
    }

    pub fn component(&self, id: &str) -> Option<&GradeComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn has_final(&self) -> bool {
        self.components.iter().any(|c| c.is_final)
    }

    pub fn regular_count(&self) -> usize {
        self.components.iter().filter(|c| !c.is_final).count()
    }

    pub fn add_component(&mut self, name: &str) -> GradebookResult<(String, SchemaChange)> {
        self.require_quantitative("add activities")?;
        let name = non_blank(name)?;
        self.require_even_split(self.has_final(), self.regular_count() + 1)?;

        let id = new_component_id();
        self.components.push(GradeComponent {
            id: id.clone(),
            name,
            weight_percent: 0.0,
            is_final: false,
        });
        self.redistribute();
        Ok((
            id.clone(),
            SchemaChange {
                added: vec![id],
                ..SchemaChange::default()
            },
        ))
    }

    pub fn remove_component(&mut self, id: &str) -> GradebookResult<SchemaChange> {
        self.require_quantitative("remove activities")?;
        let Some(idx) = self.components.iter().position(|c| c.id == id) else {
            return Err(GradebookError::not_found(format!("component not found: {id}")));
        };
        if self.components[idx].is_final {
            return Err(GradebookError::validation(
                "the final evaluation can only be removed by disabling it",
            ));
        }
        if self.regular_count() <= 1 {
            return Err(GradebookError::validation(
                "cannot remove the last remaining activity",
            ));
        }
        self.require_even_split(self.has_final(), self.regular_count() - 1)?;

        let removed = self.components.remove(idx);
        self.redistribute();
        Ok(SchemaChange {
            removed: vec![removed.id],
            ..SchemaChange::default()
        })
    }

    pub fn rename_component(&mut self, id: &str, new_name: &str) -> GradebookResult<()> {
        self.require_quantitative("rename activities")?;
        let name = non_blank(new_name)?;
        let Some(c) = self.components.iter_mut().find(|c| c.id == id) else {
            return Err(GradebookError::not_found(format!("component not found: {id}")));
        };
        c.name = name;
        Ok(())
    }

    /// Explicit transition for the "include final evaluation" switch.
    pub fn set_final_evaluation_enabled(&mut self, include: bool) -> GradebookResult<SchemaChange> {
        self.require_quantitative("toggle the final evaluation")?;
        let mut change = SchemaChange::default();

        if include {
            let finals: Vec<String> = self
                .components
                .iter()
                .filter(|c| c.is_final)
                .map(|c| c.id.clone())
                .collect();
            if finals.is_empty() {
                self.require_even_split(true, self.regular_count())?;
                self.components.push(GradeComponent {
                    id: FINAL_COMPONENT_ID.to_string(),
                    name: self.names.final_component.clone(),
                    weight_percent: FINAL_WEIGHT,
                    is_final: true,
                });
                change.added.push(FINAL_COMPONENT_ID.to_string());
            } else if finals.len() > 1 {
                let extra = finals[1..].to_vec();
                let mut kept = false;
                self.components.retain(|c| {
                    if !c.is_final || !kept {
                        kept |= c.is_final;
                        return true;
                    }
                    false
                });
                change.warnings.push(format!(
                    "found {} final evaluations; kept the first and discarded the rest",
                    finals.len()
                ));
                change.removed = extra;
            }
        } else {
            self.require_even_split(false, self.regular_count())?;
            let (finals, rest): (Vec<_>, Vec<_>) =
                self.components.drain(..).partition(|c| c.is_final);
            self.components = rest;
            change.removed = finals.into_iter().map(|c| c.id).collect();
            if self.components.is_empty() {
                let id = new_component_id();
                self.components.push(GradeComponent {
                    id: id.clone(),
                    name: self.names.default_component.clone(),
                    weight_percent: 100.0,
                    is_final: false,
                });
                change.added.push(id);
            }
        }

        self.redistribute();
        Ok(change)
    }

    /// Derives every weight from the structure: the final evaluation is
    /// pinned at 30 and regular components split the rest evenly.
    pub fn redistribute(&mut self) -> &[GradeComponent] {
        if self.mode == GradingMode::Qualitative {
            for c in &mut self.components {
                c.weight_percent = 100.0;
            }
            return &self.components;
        }

        let regular = self.regular_count();
        let pool = self.regular_pool(self.has_final());
        let share = if regular > 0 {
            round_2(pool / regular as f64)
        } else {
            0.0
        };
        for c in &mut self.components {
            c.weight_percent = if c.is_final { FINAL_WEIGHT } else { share };
        }
        &self.components
    }

    pub fn validate(&self) -> SchemaValidation {
        let total_regular: f64 = self
            .components
            .iter()
            .filter(|c| !c.is_final)
            .map(|c| c.weight_percent)
            .sum();
        let total_final: f64 = self
            .components
            .iter()
            .filter(|c| c.is_final)
            .map(|c| c.weight_percent)
            .sum();
        let total = total_regular + total_final;
        let finals = self.components.iter().filter(|c| c.is_final).count();
        // Small epsilon so that 99.90 still counts after float summation.
        let is_valid = (total - 100.0).abs() <= WEIGHT_TOLERANCE + 1e-9 && finals <= 1;
        SchemaValidation {
            is_valid,
            total_regular: round_2(total_regular),
            total_final: round_2(total_final),
            total: round_2(total),
        }
    }

    fn regular_pool(&self, with_final: bool) -> f64 {
        if with_final {
            100.0 - FINAL_WEIGHT
        } else {
            100.0
        }
    }

    /// Rejects a transition whose even split of `regular` activities would
    /// not total 100 within the tolerance.
    fn require_even_split(&self, with_final: bool, regular: usize) -> GradebookResult<()> {
        if even_split_fits(self.regular_pool(with_final), regular) {
            return Ok(());
        }
        Err(GradebookError::validation(format!(
            "too many activities: {} equal shares of {} do not total 100",
            regular,
            self.regular_pool(with_final)
        )))
    }

    fn require_quantitative(&self, what: &str) -> GradebookResult<()> {
        if self.mode == GradingMode::Qualitative {
            return Err(GradebookError::validation(format!(
                "cannot {what} in qualitative grading"
            )));
        }
        Ok(())
    }
}

/// Whether `regular` two-decimal shares of `pool` still total 100 within
/// the tolerance once the final evaluation is added back.
fn even_split_fits(pool: f64, regular: usize) -> bool {
    if regular == 0 {
        return true;
    }
    let total = round_2(pool / regular as f64) * regular as f64 + (100.0 - pool);
    (total - 100.0).abs() <= WEIGHT_TOLERANCE + 1e-9
}

fn unique_score(id: String) -> GradeComponent {
    GradeComponent {
        id,
        name: UNIQUE_SCORE_NAME.to_string(),
        weight_percent: 100.0,
        is_final: false,
    }
}

fn new_component_id() -> String {
    Uuid::new_v4().to_string()
}

fn non_blank(name: &str) -> GradebookResult<String> {
    let t = name.trim();
    if t.is_empty() {
        return Err(GradebookError::validation("activity name must not be blank"));
    }
    Ok(t.to_string())
}
