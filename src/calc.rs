use crate::ledger::ScoreLedger;
use crate::qualitative::{GradingMode, QualitativeCategory};
use crate::schema::GradeSchema;
use serde::Serialize;
use std::collections::HashMap;

/// Half-up 1-decimal rounding used for displayed scores:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn round_2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn format_score(v: f64) -> String {
    format!("{:.1}", round_off_1_decimal(v))
}

/// One decimal when that is exact, otherwise two.
pub fn format_weight(w: f64) -> String {
    let w = round_2(w);
    if ((w * 10.0).round() - w * 10.0).abs() < 1e-9 {
        format!("{:.1}", w)
    } else {
        format!("{:.2}", w)
    }
}

/// Weighted final score with partial-completion normalization: ungraded
/// components are left out of the denominator instead of counting as 0.
pub fn compute_final_score(schema: &GradeSchema, ledger: &ScoreLedger, student_id: &str) -> f64 {
    final_breakdown(schema, ledger, student_id).final_score
}

pub fn compute_qualitative_category(score: f64) -> QualitativeCategory {
    QualitativeCategory::from_score(score)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalBreakdown {
    pub final_score: f64,
    pub weighted_sum: f64,
    pub covered_weight: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

pub fn final_breakdown(
    schema: &GradeSchema,
    ledger: &ScoreLedger,
    student_id: &str,
) -> FinalBreakdown {
    let mut weighted_sum = 0.0_f64;
    let mut covered_weight = 0.0_f64;
    let mut graded_count = 0_usize;
    let mut ungraded_count = 0_usize;

    for c in schema.components() {
        match ledger.get_score(student_id, &c.id) {
            Some(v) => {
                graded_count += 1;
                weighted_sum += v * (c.weight_percent / 100.0);
                covered_weight += c.weight_percent;
            }
            None => ungraded_count += 1,
        }
    }

    let final_score = if covered_weight > 0.0 {
        round_2(weighted_sum * (100.0 / covered_weight))
    } else {
        0.0
    };

    FinalBreakdown {
        final_score,
        weighted_sum,
        covered_weight,
        graded_count,
        ungraded_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentAverage {
    pub avg: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

/// Class average for one component. Ungraded cells are counted but do not
/// enter the denominator.
pub fn component_average<I>(values: I) -> ComponentAverage
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0_f64;
    let mut graded_count = 0_usize;
    let mut ungraded_count = 0_usize;
    for v in values {
        match v {
            Some(v) => {
                graded_count += 1;
                sum += v;
            }
            None => ungraded_count += 1,
        }
    }
    let avg = if graded_count > 0 {
        sum / graded_count as f64
    } else {
        0.0
    };
    ComponentAverage {
        avg,
        graded_count,
        ungraded_count,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFinal {
    pub student_id: String,
    pub display_name: String,
    pub final_score: f64,
    pub final_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<QualitativeCategory>,
    pub covered_weight: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStats {
    pub component_id: String,
    pub name: String,
    pub weight_percent: f64,
    pub is_final: bool,
    pub avg: f64,
    pub graded_count: usize,
    pub ungraded_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradebookSummary {
    pub mode: GradingMode,
    #[serde(rename = "perStudent")]
    pub per_student: Vec<StudentFinal>,
    #[serde(rename = "perComponent")]
    pub per_component: Vec<ComponentStats>,
}

pub fn compute_summary(
    schema: &GradeSchema,
    ledger: &ScoreLedger,
    display_names: &HashMap<String, String>,
) -> GradebookSummary {
    let per_student = ledger
        .students()
        .iter()
        .map(|sid| {
            let b = final_breakdown(schema, ledger, sid);
            let category = match schema.mode() {
                GradingMode::Qualitative if b.graded_count > 0 => {
                    Some(compute_qualitative_category(b.final_score))
                }
                _ => None,
            };
            StudentFinal {
                student_id: sid.clone(),
                display_name: display_names.get(sid).cloned().unwrap_or_else(|| sid.clone()),
                final_score: b.final_score,
                final_display: format_score(b.final_score),
                category,
                covered_weight: round_2(b.covered_weight),
                graded_count: b.graded_count,
                ungraded_count: b.ungraded_count,
            }
        })
        .collect();

    let per_component = schema
        .components()
        .iter()
        .map(|c| {
            let stats = component_average(
                ledger
                    .students()
                    .iter()
                    .map(|sid| ledger.get_score(sid, &c.id)),
            );
            ComponentStats {
                component_id: c.id.clone(),
                name: c.name.clone(),
                weight_percent: c.weight_percent,
                is_final: c.is_final,
                avg: round_2(stats.avg),
                graded_count: stats.graded_count,
                ungraded_count: stats.ungraded_count,
            }
        })
        .collect();

    GradebookSummary {
        mode: schema.mode(),
        per_student,
        per_component,
    }
}
