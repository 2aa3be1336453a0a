use crate::catalog::SubjectDef;
use crate::settings::SubjectSettings;
use serde::Serialize;

pub const MIN_OPTION: i64 = 1;
pub const MAX_OPTION: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Score a submitted answer sheet against the round's answer key.
///
/// Objective items are all-or-nothing: exact option match earns the item's
/// points, anything else earns zero. Free-response values arrive already
/// graded and are only range-checked against the per-item maximum.
pub fn score_submission(
    def: SubjectDef,
    settings: &SubjectSettings,
    marks: &[i64],
    sub_vals: &[f64],
) -> Result<f64, ValidationError> {
    if marks.len() != def.objective {
        return Err(ValidationError::new(
            "validation_failed",
            "objective answer count does not match subject",
        )
        .with_details(serde_json::json!({
            "expected": def.objective,
            "got": marks.len(),
        })));
    }
    if sub_vals.len() != def.subjective {
        return Err(ValidationError::new(
            "validation_failed",
            "free-response count does not match subject",
        )
        .with_details(serde_json::json!({
            "expected": def.subjective,
            "got": sub_vals.len(),
        })));
    }

    for (i, m) in marks.iter().enumerate() {
        if !(MIN_OPTION..=MAX_OPTION).contains(m) {
            return Err(ValidationError::new(
                "validation_failed",
                format!("objective answer {} out of range", i + 1),
            )
            .with_details(serde_json::json!({ "index": i, "value": m })));
        }
    }
    for (i, v) in sub_vals.iter().enumerate() {
        let max = settings.sub_max_scores[i];
        if !(0.0..=max).contains(v) {
            return Err(ValidationError::new(
                "validation_failed",
                format!("free-response score {} out of range", i + 1),
            )
            .with_details(serde_json::json!({ "index": i, "value": v, "max": max })));
        }
    }

    let objective: f64 = marks
        .iter()
        .zip(settings.answer_key.iter())
        .zip(settings.answer_scores.iter())
        .filter(|((mark, key), _)| mark == key)
        .map(|(_, points)| points)
        .sum();
    let subjective: f64 = sub_vals.iter().sum();

    Ok(objective + subjective)
}
