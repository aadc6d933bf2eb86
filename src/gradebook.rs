use crate::calc::{self, format_score, format_weight, GradebookSummary};
use crate::config::GradingPolicy;
use crate::error::{GradebookError, GradebookResult};
use crate::indicators::{Indicator, IndicatorRegistry};
use crate::ledger::{ScoreInput, ScoreLedger};
use crate::qualitative::{GradingMode, QualitativeCategory};
use crate::schema::{GradeComponent, GradeSchema, SchemaChange, SchemaValidation};
use crate::store::{
    GradeStore, HydrationData, SaveOutcome, SavePayload, ScoreNote, Selection, StudentRef,
    StudentScoreRecord,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Info,
    Warning,
}

/// Feedback for the presentation layer, drained after each operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradebookEvent {
    pub level: EventLevel,
    pub code: &'static str,
    pub message: String,
}

impl GradebookEvent {
    fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Info,
            code,
            message: message.into(),
        }
    }

    fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warning,
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    selection: Selection,
    grade_name: String,
    roster: Vec<StudentRef>,
    schema: GradeSchema,
    ledger: ScoreLedger,
    indicators: IndicatorRegistry,
}

#[derive(Debug, Clone)]
enum Phase {
    Empty,
    Hydrating(Selection),
    Ready(Box<Session>),
}

/// The open gradebook. Selection changes go through
/// `begin_hydration`/`finish_hydration`; edits are refused in between.
#[derive(Debug, Clone)]
pub struct Gradebook {
    policy: GradingPolicy,
    phase: Phase,
    events: Vec<GradebookEvent>,
}

impl Gradebook {
    pub fn new(policy: GradingPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Empty,
            events: Vec::new(),
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        match &self.phase {
            Phase::Empty => None,
            Phase::Hydrating(sel) => Some(sel),
            Phase::Ready(s) => Some(&s.selection),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    pub fn take_events(&mut self) -> Vec<GradebookEvent> {
        std::mem::take(&mut self.events)
    }

    /// Takes effect at the next hydration.
    pub fn set_policy(&mut self, policy: GradingPolicy) {
        self.policy = policy;
    }

    /// Drops the current period and locks edits until hydration finishes.
    pub fn begin_hydration(&mut self, selection: Selection) {
        if let Phase::Ready(s) = &mut self.phase {
            debug!(entries = s.ledger.entry_count(), "discarding previous period");
            s.ledger.clear_period();
        }
        debug!(?selection, "hydration started");
        self.phase = Phase::Hydrating(selection);
    }

    pub fn abort_hydration(&mut self) {
        if matches!(self.phase, Phase::Hydrating(_)) {
            self.phase = Phase::Empty;
        }
    }

    pub fn finish_hydration(&mut self, data: HydrationData) -> GradebookResult<()> {
        let Phase::Hydrating(selection) = &self.phase else {
            return Err(GradebookError::NotReady(
                "no hydration in progress".to_string(),
            ));
        };
        let selection = selection.clone();
        let mode = GradingMode::for_grade_name(&data.grade_name, &self.policy.qualitative_grades);

        let mut persisted: Vec<GradeComponent> = Vec::new();
        for record in &data.records {
            for note in &record.notes {
                if persisted.iter().any(|c| c.id == note.component_id) {
                    continue;
                }
                persisted.push(GradeComponent {
                    id: note.component_id.clone(),
                    name: note.name.clone(),
                    weight_percent: note.weight_percent,
                    is_final: false,
                });
            }
        }
        if persisted.is_empty() {
            self.events.push(GradebookEvent::info(
                "default_schema",
                "no saved activities for this period; started from a default",
            ));
        }
        let (schema, change) =
            GradeSchema::hydrate(mode, self.policy.component_names(), persisted);

        let mut roster = data.students;
        for record in &data.records {
            if !roster.iter().any(|s| s.id == record.student_id) {
                roster.push(StudentRef {
                    id: record.student_id.clone(),
                    display_name: record.student_id.clone(),
                });
            }
        }

        let mut ledger = ScoreLedger::new(roster.iter().map(|s| s.id.clone()).collect());
        for record in &data.records {
            for note in &record.notes {
                if schema.component(&note.component_id).is_some() {
                    ledger.load_value(&record.student_id, &note.component_id, note.value);
                }
            }
        }
        ledger.sync_components(schema.components());

        let indicators = IndicatorRegistry::new(
            &selection.grade_id,
            &selection.area_id,
            selection.period,
            data.indicators,
        );

        info!(
            grade = %data.grade_name,
            mode = mode.as_str(),
            students = roster.len(),
            components = schema.components().len(),
            entries = ledger.entry_count(),
            "gradebook hydrated"
        );

        self.phase = Phase::Ready(Box::new(Session {
            selection,
            grade_name: data.grade_name,
            roster,
            schema,
            ledger,
            indicators,
        }));
        self.absorb_change(change);
        Ok(())
    }

    /// Hydrates from the store in one call; failures leave the gradebook empty.
    pub fn open(&mut self, store: &dyn GradeStore, selection: Selection) -> GradebookResult<()> {
        self.begin_hydration(selection.clone());
        let data = match store.load_hydration(&selection) {
            Ok(Some(d)) => d,
            Ok(None) => {
                self.abort_hydration();
                return Err(GradebookError::not_found(format!(
                    "grade not found: {}",
                    selection.grade_id
                )));
            }
            Err(e) => {
                self.abort_hydration();
                return Err(e.into());
            }
        };
        self.finish_hydration(data)
    }

    pub fn mode(&self) -> GradebookResult<GradingMode> {
        Ok(self.session()?.schema.mode())
    }

    #[cfg(test)]
    pub fn components(&self) -> GradebookResult<&[GradeComponent]> {
        Ok(self.session()?.schema.components())
    }

    pub fn add_component(&mut self, name: &str) -> GradebookResult<String> {
        let (id, change) = self.session_mut()?.schema.add_component(name)?;
        debug!(component = %id, "activity added");
        self.absorb_change(change);
        self.events
            .push(GradebookEvent::info("component_added", "activity added"));
        Ok(id)
    }

    pub fn remove_component(&mut self, id: &str) -> GradebookResult<()> {
        let change = self.session_mut()?.schema.remove_component(id)?;
        debug!(component = %id, "activity removed");
        self.absorb_change(change);
        self.events
            .push(GradebookEvent::info("component_removed", "activity removed"));
        Ok(())
    }

    pub fn rename_component(&mut self, id: &str, name: &str) -> GradebookResult<()> {
        self.session_mut()?.schema.rename_component(id, name)
    }

    pub fn set_final_evaluation_enabled(&mut self, include: bool) -> GradebookResult<()> {
        let change = self
            .session_mut()?
            .schema
            .set_final_evaluation_enabled(include)?;
        debug!(include, "final evaluation toggled");
        let message = if include {
            "final evaluation enabled"
        } else {
            "final evaluation disabled"
        };
        self.absorb_change(change);
        self.events
            .push(GradebookEvent::info("final_toggled", message));
        Ok(())
    }

    pub fn redistribute(&mut self) -> GradebookResult<Vec<GradeComponent>> {
        let out = self.session_mut()?.schema.redistribute().to_vec();
        self.absorb_change(SchemaChange::default());
        Ok(out)
    }

    pub fn validate(&self) -> GradebookResult<SchemaValidation> {
        Ok(self.session()?.schema.validate())
    }

    pub fn set_score(
        &mut self,
        student_id: &str,
        component_id: &str,
        input: &ScoreInput,
    ) -> GradebookResult<Option<f64>> {
        let s = self.session_mut()?;
        let mode = s.schema.mode();
        s.ledger.set_score(mode, student_id, component_id, input)
    }

    pub fn get_score(&self, student_id: &str, component_id: &str) -> GradebookResult<Option<f64>> {
        let s = self.session()?;
        if !s.ledger.has_student(student_id) {
            return Err(GradebookError::not_found(format!(
                "student not found: {student_id}"
            )));
        }
        if s.schema.component(component_id).is_none() {
            return Err(GradebookError::not_found(format!(
                "component not found: {component_id}"
            )));
        }
        Ok(s.ledger.get_score(student_id, component_id))
    }

    pub fn final_score(&self, student_id: &str) -> GradebookResult<f64> {
        let s = self.session()?;
        if !s.ledger.has_student(student_id) {
            return Err(GradebookError::not_found(format!(
                "student not found: {student_id}"
            )));
        }
        Ok(calc::compute_final_score(&s.schema, &s.ledger, student_id))
    }

    pub fn summary(&self) -> GradebookResult<GradebookSummary> {
        let s = self.session()?;
        Ok(calc::compute_summary(&s.schema, &s.ledger, &display_names(&s.roster)))
    }

    pub fn indicators(&self) -> GradebookResult<&[Indicator]> {
        Ok(self.session()?.indicators.items())
    }

    pub fn add_indicator(&mut self) -> GradebookResult<String> {
        Ok(self.session_mut()?.indicators.add())
    }

    pub fn update_indicator(&mut self, id: &str, text: &str) -> GradebookResult<()> {
        self.session_mut()?.indicators.update(id, text)
    }

    pub fn remove_indicator(&mut self, id: &str) -> GradebookResult<()> {
        self.session_mut()?.indicators.remove(id).map(|_| ())
    }

    /// Serializes schema, ledger and indicators for the save mutation.
    /// Ungraded cells go out as 0.
    pub fn build_save_payload(&self) -> GradebookResult<SavePayload> {
        let s = self.session()?;
        let validation = s.schema.validate();
        if s.schema.mode() == GradingMode::Quantitative && !validation.is_valid {
            return Err(GradebookError::SchemaInvalid {
                total: validation.total,
            });
        }

        let scores = s
            .ledger
            .students()
            .iter()
            .map(|sid| StudentScoreRecord {
                student_id: sid.clone(),
                notes: s
                    .schema
                    .components()
                    .iter()
                    .map(|c| ScoreNote {
                        component_id: c.id.clone(),
                        name: c.name.clone(),
                        value: Some(s.ledger.get_score(sid, &c.id).unwrap_or(0.0)),
                        weight_percent: c.weight_percent,
                    })
                    .collect(),
            })
            .collect();

        Ok(SavePayload {
            grade_id: s.selection.grade_id.clone(),
            area_id: s.selection.area_id.clone(),
            period: s.selection.period,
            scores,
            indicators: s.indicators.items().to_vec(),
        })
    }

    /// Sends the payload once. Failures are returned as-is; local state stays
    /// untouched.
    pub fn save(&mut self, store: &dyn GradeStore) -> GradebookResult<SaveOutcome> {
        let payload = self.build_save_payload()?;
        let outcome = match store.save(&payload) {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "save failed");
                return Err(e.into());
            }
        };
        if !outcome.success {
            warn!(message = %outcome.message, "save rejected");
            return Err(GradebookError::Persistence(outcome.message));
        }
        info!(
            students = payload.scores.len(),
            indicators = payload.indicators.len(),
            "gradebook saved"
        );
        self.events
            .push(GradebookEvent::info("saved", outcome.message.clone()));
        Ok(outcome)
    }

    pub fn view(&self) -> GradebookResult<GradebookView> {
        let s = self.session()?;
        let mode = s.schema.mode();
        let validation = s.schema.validate();

        let components = s
            .schema
            .components()
            .iter()
            .map(|c| ComponentView {
                id: c.id.clone(),
                name: c.name.clone(),
                weight_percent: c.weight_percent,
                weight_display: format_weight(c.weight_percent),
                is_final: c.is_final,
            })
            .collect();

        let summary = calc::compute_summary(&s.schema, &s.ledger, &display_names(&s.roster));
        let students = summary
            .per_student
            .into_iter()
            .map(|f| {
                let cells = s
                    .schema
                    .components()
                    .iter()
                    .map(|c| {
                        let value = s.ledger.get_score(&f.student_id, &c.id);
                        CellView {
                            component_id: c.id.clone(),
                            value,
                            display: value.map(format_score),
                            category: match mode {
                                GradingMode::Qualitative => value.map(QualitativeCategory::from_score),
                                GradingMode::Quantitative => None,
                            },
                        }
                    })
                    .collect();
                StudentRow {
                    student_id: f.student_id,
                    display_name: f.display_name,
                    cells,
                    final_score: f.final_score,
                    final_display: f.final_display,
                    category: f.category,
                }
            })
            .collect();

        Ok(GradebookView {
            selection: s.selection.clone(),
            grade_name: s.grade_name.clone(),
            mode,
            include_final: s.schema.has_final(),
            components,
            validation,
            can_save: mode == GradingMode::Qualitative || validation.is_valid,
            students,
            indicators: s.indicators.items().to_vec(),
        })
    }

    /// Applies a schema transition to the ledger in the same step and
    /// reports anything the user should see.
    fn absorb_change(&mut self, change: SchemaChange) {
        let Phase::Ready(s) = &mut self.phase else {
            return;
        };
        for id in &change.removed {
            s.ledger.remove_component(id);
        }
        s.ledger.sync_components(s.schema.components());

        for w in change.warnings {
            warn!(message = %w, "schema adjusted");
            self.events.push(GradebookEvent::warning("schema_adjusted", w));
        }

        let v = s.schema.validate();
        if s.schema.mode() == GradingMode::Quantitative && !v.is_valid {
            warn!(total = v.total, "weights do not total 100");
            self.events.push(GradebookEvent::warning(
                "schema_invariant",
                format!(
                    "weights total {:.2} instead of 100; redistribute before saving",
                    v.total
                ),
            ));
        }
    }

    fn session(&self) -> GradebookResult<&Session> {
        match &self.phase {
            Phase::Ready(s) => Ok(s.as_ref()),
            Phase::Hydrating(_) => Err(not_ready_hydrating()),
            Phase::Empty => Err(not_ready_empty()),
        }
    }

    fn session_mut(&mut self) -> GradebookResult<&mut Session> {
        match &mut self.phase {
            Phase::Ready(s) => Ok(s.as_mut()),
            Phase::Hydrating(_) => Err(not_ready_hydrating()),
            Phase::Empty => Err(not_ready_empty()),
        }
    }
}

fn not_ready_hydrating() -> GradebookError {
    GradebookError::NotReady("gradebook is still loading the selected period".to_string())
}

fn not_ready_empty() -> GradebookError {
    GradebookError::NotReady("open a gradebook first".to_string())
}

fn display_names(roster: &[StudentRef]) -> HashMap<String, String> {
    roster
        .iter()
        .map(|s| (s.id.clone(), s.display_name.clone()))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentView {
    pub id: String,
    pub name: String,
    pub weight_percent: f64,
    pub weight_display: String,
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    pub component_id: String,
    pub value: Option<f64>,
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<QualitativeCategory>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: String,
    pub display_name: String,
    pub cells: Vec<CellView>,
    pub final_score: f64,
    pub final_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<QualitativeCategory>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookView {
    pub selection: Selection,
    pub grade_name: String,
    pub mode: GradingMode,
    pub include_final: bool,
    pub components: Vec<ComponentView>,
    pub validation: SchemaValidation,
    pub can_save: bool,
    pub students: Vec<StudentRow>,
    pub indicators: Vec<Indicator>,
}
