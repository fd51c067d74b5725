// ==========================================
// Cadet Roster - Manual input validation
// ==========================================
// Checks applied to operator-entered data before it reaches a store.
// Imported rows are validated by the normalizer instead.
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{ExamScores, NewPerson};

/// Reason texts longer than this are rejected.
pub const MAX_REASON_LEN: usize = 500;

pub fn validate_new_person(person: &NewPerson) -> ApiResult<()> {
    if !person.name.is_complete() {
        return Err(ApiError::InvalidInput(
            "first and last name are required".to_string(),
        ));
    }
    if let Some(email) = person.email.as_deref() {
        validate_email(email)?;
    }
    if let Some(id) = person.external_id.as_deref() {
        if id.trim().is_empty() || id.chars().any(char::is_whitespace) {
            return Err(ApiError::InvalidInput(format!(
                "external ID must be a single token: {:?}",
                id
            )));
        }
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::InvalidInput(format!("not an email address: {}", trimmed))),
    }
}

pub fn validate_ledger_input(points: u32, reason: &str) -> ApiResult<()> {
    if points == 0 {
        return Err(ApiError::InvalidInput(
            "ledger points must be greater than zero".to_string(),
        ));
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::InvalidInput("a reason is required".to_string()));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ApiError::InvalidInput(format!(
            "reason exceeds {} characters",
            MAX_REASON_LEN
        )));
    }
    Ok(())
}

/// Out-of-range scores are clamped later; only non-numbers are refused.
pub fn validate_exam_scores(scores: &ExamScores) -> ApiResult<()> {
    for (label, value) in [
        ("prelim", scores.prelim),
        ("midterm", scores.midterm),
        ("final", scores.final_exam),
    ] {
        if !value.is_finite() {
            return Err(ApiError::InvalidInput(format!("{} score is not a number", label)));
        }
    }
    Ok(())
}

pub fn validate_title(title: &str) -> ApiResult<()> {
    if title.trim().is_empty() {
        return Err(ApiError::InvalidInput("title is required".to_string()));
    }
    Ok(())
}
