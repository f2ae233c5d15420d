use serde::{Deserialize, Serialize};

use super::task::Task;
use super::validate::{
    parse_timestamp, validate_window, TaskForm, TimestampField, ValidatedFields, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

/// One step of an AI-proposed breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTask {
    pub content: String,
    pub estimated_duration_hours: f64,
    pub priority: SuggestionPriority,
}

/// Outcome of a breakdown request.
#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    /// No credentials are configured; the feature is off.
    Unavailable,
    /// Zero or more suggestions. Empty also covers failed requests.
    Suggestions(Vec<SuggestedTask>),
}

impl Breakdown {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    pub fn suggestions(&self) -> &[SuggestedTask] {
        match self {
            Self::Unavailable => &[],
            Self::Suggestions(list) => list,
        }
    }

    /// Drop every suggestion with this content, as after accepting it.
    pub fn without(self, content: &str) -> Self {
        match self {
            Self::Unavailable => Self::Unavailable,
            Self::Suggestions(mut list) => {
                list.retain(|s| s.content != content);
                Self::Suggestions(list)
            }
        }
    }
}

/// Turn a suggestion into a task. The window starts at the form's start,
/// lasts the estimated hours, and keeps the form's deadline; the result must
/// pass the same temporal rules as a hand-entered task.
pub fn accept_suggestion(
    form: &TaskForm,
    suggestion: &SuggestedTask,
) -> Result<Task, ValidationError> {
    if suggestion.content.trim().is_empty() || form.deadline.trim().is_empty() {
        return Err(ValidationError::EmptyFields);
    }
    let start = if form.execution_start.trim().is_empty() {
        chrono::Local::now().naive_local()
    } else {
        parse_timestamp(&form.execution_start).ok_or(ValidationError::InvalidTimestamp {
            field: TimestampField::ExecutionStart,
        })?
    };
    let deadline = parse_timestamp(&form.deadline).ok_or(ValidationError::InvalidTimestamp {
        field: TimestampField::Deadline,
    })?;

    let hours = suggestion.estimated_duration_hours;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(ValidationError::InvertedWindow);
    }
    // Durations past chrono's range would end after any deadline.
    let end = chrono::TimeDelta::try_minutes((hours * 60.0).round() as i64)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or(ValidationError::DeadlineExceeded)?;

    validate_window(start, end, deadline)?;

    Ok(Task::from_fields(ValidatedFields {
        content: suggestion.content.trim().to_string(),
        execution_start: start,
        execution_end: end,
        deadline,
    }))
}
