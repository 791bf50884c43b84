//! Intent gate run before a mission executes.
//!
//! An existing diagnosis always wins: the caller is redirected to the
//! diagnosis-driven path whatever the intent says. Rejections are part of
//! the result, not errors.

use crate::diagnosis::Diagnosis;
use crate::paths::DIAGNOSIS_FILE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const NEXT_DIAGNOSIS: &str = "DIAGNOSIS_DETECTED";
pub const NEXT_PROCEED: &str = "PROCEED with execution";
pub const NEXT_ASK_USER: &str = "ASK_USER: What is your intent or goal for this task?";

/// Literal left behind when a command template was invoked without
/// arguments.
const ARGUMENTS_PLACEHOLDER: &str = "$ARGUMENTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub next_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<DiagnosisSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisSummary {
    pub id: String,
    pub root_cause: String,
    pub affected_files: Vec<String>,
}

impl ValidationResult {
    fn verdict(is_valid: bool, message: &str, next_step: &str) -> Self {
        Self {
            is_valid,
            message: Some(message.to_string()),
            next_step: next_step.to_string(),
            diagnosis: None,
        }
    }
}

/// Validate `intent` against the state of `mission_dir` (the `.mission/`
/// directory itself).
pub fn validate(intent: &str, mission_dir: &Path) -> ValidationResult {
    if let Some(summary) = diagnosis_summary(mission_dir) {
        return ValidationResult {
            is_valid: true,
            message: None,
            next_step: NEXT_DIAGNOSIS.to_string(),
            diagnosis: Some(summary),
        };
    }

    match intent.trim() {
        "" => ValidationResult::verdict(false, "Input is empty or whitespace", NEXT_ASK_USER),
        ARGUMENTS_PLACEHOLDER => ValidationResult::verdict(
            false,
            "Input is a placeholder - no intent provided",
            NEXT_ASK_USER,
        ),
        _ => ValidationResult::verdict(true, "Input is valid", NEXT_PROCEED),
    }
}

fn diagnosis_summary(mission_dir: &Path) -> Option<DiagnosisSummary> {
    let path = mission_dir.join(DIAGNOSIS_FILE);
    let diag = match Diagnosis::read(&path) {
        Ok(Some(diag)) => diag,
        Ok(None) => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable diagnosis");
            return None;
        }
    };
    Some(DiagnosisSummary {
        root_cause: diag.root_cause().unwrap_or_default(),
        affected_files: diag.affected_files(),
        id: diag.meta.id,
    })
}
