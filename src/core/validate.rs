use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

use super::task::Task;

/// Format produced by a `datetime-local` form input.
pub const FORM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

static LOCAL_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<date>\d{4}-\d{2}-\d{2})[T ](?P<time>\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?)$")
        .unwrap()
});

/// Which of the three timestamps a form failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    ExecutionStart,
    ExecutionEnd,
    Deadline,
}

impl fmt::Display for TimestampField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ExecutionStart => "START",
            Self::ExecutionEnd => "END",
            Self::Deadline => "DEADLINE",
        };
        f.write_str(label)
    }
}

/// Rejections produced while checking a task form. The display strings are
/// the messages shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("COMMAND ERROR: EMPTY FIELDS DETECTED")]
    EmptyFields,
    #[error("INPUT ERROR: UNREADABLE {field} TIMESTAMP")]
    InvalidTimestamp { field: TimestampField },
    #[error("TIME PARADOX: START MUST PRECEDE END")]
    InvertedWindow,
    #[error("CRITICAL: EXECUTION OVERRUNS DEADLINE")]
    DeadlineExceeded,
}

/// The four task fields after a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields {
    pub content: String,
    pub execution_start: NaiveDateTime,
    pub execution_end: NaiveDateTime,
    pub deadline: NaiveDateTime,
}

/// Check raw form input. The first failing rule wins:
///
/// 1. every field is non-blank
/// 2. the three timestamps parse
/// 3. start is strictly before end
/// 4. end is not after the deadline (equal is fine)
pub fn validate(
    content: &str,
    execution_start: &str,
    execution_end: &str,
    deadline: &str,
) -> Result<ValidatedFields, ValidationError> {
    if [content, execution_start, execution_end, deadline]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ValidationError::EmptyFields);
    }

    let start = parse_field(execution_start, TimestampField::ExecutionStart)?;
    let end = parse_field(execution_end, TimestampField::ExecutionEnd)?;
    let deadline = parse_field(deadline, TimestampField::Deadline)?;

    validate_window(start, end, deadline)?;

    Ok(ValidatedFields {
        content: content.trim().to_string(),
        execution_start: start,
        execution_end: end,
        deadline,
    })
}

/// Temporal rules for already-parsed instants.
pub fn validate_window(
    start: NaiveDateTime,
    end: NaiveDateTime,
    deadline: NaiveDateTime,
) -> Result<(), ValidationError> {
    if start >= end {
        return Err(ValidationError::InvertedWindow);
    }
    if end > deadline {
        return Err(ValidationError::DeadlineExceeded);
    }
    Ok(())
}

fn parse_field(input: &str, field: TimestampField) -> Result<NaiveDateTime, ValidationError> {
    parse_timestamp(input).ok_or(ValidationError::InvalidTimestamp { field })
}

/// Parse a form timestamp into local wall-clock time.
///
/// Accepts `YYYY-MM-DDTHH:MM`, optional seconds and fraction, a space in
/// place of the `T`, or a full RFC 3339 string (converted to local time).
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();

    if let Some(caps) = LOCAL_DATETIME_RE.captures(input) {
        let date = NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok()?;
        let time_str = &caps["time"];
        let time = if time_str.len() == 5 {
            NaiveTime::parse_from_str(time_str, "%H:%M").ok()?
        } else {
            NaiveTime::parse_from_str(time_str, "%H:%M:%S%.f").ok()?
        };
        return Some(date.and_time(time));
    }

    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Raw create/edit form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub content: String,
    pub execution_start: String,
    pub execution_end: String,
    pub deadline: String,
}

impl TaskForm {
    /// A blank "add" form: a one-hour window starting at `base`, due when it ends.
    pub fn blank_at(base: NaiveDateTime) -> Self {
        let one_hour_later = base + chrono::Duration::hours(1);
        let end = one_hour_later.format(FORM_DATETIME_FORMAT).to_string();
        Self {
            content: String::new(),
            execution_start: base.format(FORM_DATETIME_FORMAT).to_string(),
            execution_end: end.clone(),
            deadline: end,
        }
    }

    /// An "edit" form pre-filled from an existing task.
    pub fn from_task(task: &Task) -> Self {
        Self {
            content: task.content.clone(),
            execution_start: task.execution_start.format(FORM_DATETIME_FORMAT).to_string(),
            execution_end: task.execution_end.format(FORM_DATETIME_FORMAT).to_string(),
            deadline: task.deadline.format(FORM_DATETIME_FORMAT).to_string(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedFields, ValidationError> {
        validate(
            &self.content,
            &self.execution_start,
            &self.execution_end,
            &self.deadline,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn end_equal_to_deadline_is_accepted() {
        let fields = validate(
            "Write report",
            "2024-05-01T09:00",
            "2024-05-01T10:00",
            "2024-05-01T10:00",
        )
        .unwrap();
        assert_eq!(fields.execution_end, fields.deadline);
        assert_eq!(fields.content, "Write report");
    }

    #[test]
    fn end_one_minute_past_deadline_is_rejected() {
        let err = validate(
            "Write report",
            "2024-05-01T09:00",
            "2024-05-01T10:00",
            "2024-05-01T09:59",
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DeadlineExceeded);
        assert_eq!(err.to_string(), "CRITICAL: EXECUTION OVERRUNS DEADLINE");
    }

    #[test]
    fn start_equal_to_end_is_inverted() {
        let err = validate(
            "Standup",
            "2024-05-01T09:00",
            "2024-05-01T09:00",
            "2024-05-02T09:00",
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvertedWindow);
    }

    #[test]
    fn inverted_window_wins_over_deadline() {
        // End is also past the deadline; the window check runs first.
        let err = validate(
            "Standup",
            "2024-05-01T11:00",
            "2024-05-01T10:00",
            "2024-05-01T08:00",
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvertedWindow);
        assert_eq!(err.to_string(), "TIME PARADOX: START MUST PRECEDE END");
    }

    #[test]
    fn empty_fields_checked_before_window() {
        let err = validate("", "2024-05-01T11:00", "2024-05-01T10:00", "2024-05-01T12:00")
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyFields);
        assert_eq!(err.to_string(), "COMMAND ERROR: EMPTY FIELDS DETECTED");

        for (i, blank) in ["", "   "].iter().enumerate() {
            let mut fields = [
                "Task",
                "2024-05-01T09:00",
                "2024-05-01T10:00",
                "2024-05-01T11:00",
            ];
            fields[i + 1] = *blank;
            assert_eq!(
                validate(fields[0], fields[1], fields[2], fields[3]).unwrap_err(),
                ValidationError::EmptyFields
            );
        }
    }

    #[test]
    fn unreadable_timestamp_names_the_field() {
        let err = validate("Task", "2024-05-01T09:00", "tomorrow", "2024-05-01T11:00")
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTimestamp {
                field: TimestampField::ExecutionEnd
            }
        );
        assert_eq!(err.to_string(), "INPUT ERROR: UNREADABLE END TIMESTAMP");
    }

    #[test]
    fn far_past_and_future_are_legal() {
        assert!(validate("Old", "1901-01-01T00:00", "1901-01-01T01:00", "1901-01-02T00:00").is_ok());
        assert!(validate("New", "2999-12-31T22:00", "2999-12-31T23:00", "2999-12-31T23:00").is_ok());
    }

    #[test]
    fn window_sweep() {
        let base = at("2024-05-01T09:00");
        for start_off in -3i64..3 {
            for end_off in -3i64..3 {
                let start = base + chrono::Duration::minutes(start_off);
                let end = base + chrono::Duration::minutes(end_off);
                let deadline = base + chrono::Duration::minutes(1);
                let result = validate_window(start, end, deadline);
                if start >= end {
                    assert_eq!(result, Err(ValidationError::InvertedWindow));
                } else if end > deadline {
                    assert_eq!(result, Err(ValidationError::DeadlineExceeded));
                } else {
                    assert_eq!(result, Ok(()));
                }
            }
        }
    }

    #[test]
    fn parses_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-05-01T09:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 09:30"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T09:30:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-05-01T09:30:00.000 "), Some(expected));
        assert!(parse_timestamp("2024-05-01T09:30:00Z").is_some());
        assert_eq!(parse_timestamp("2024-13-01T09:30"), None);
        assert_eq!(parse_timestamp("2024-05-01T25:30"), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn blank_form_defaults_to_one_hour_window() {
        let form = TaskForm::blank_at(at("2024-05-01T23:30:45"));
        assert_eq!(form.content, "");
        assert_eq!(form.execution_start, "2024-05-01T23:30");
        assert_eq!(form.execution_end, "2024-05-02T00:30");
        assert_eq!(form.deadline, form.execution_end);
    }

    #[test]
    fn edit_form_round_trips_task_fields() {
        let fields = validate("Plan", "2024-05-01T09:00", "2024-05-01T10:00", "2024-05-03T18:00")
            .unwrap();
        let task = Task::from_fields(fields);
        let form = TaskForm::from_task(&task);
        assert_eq!(form.deadline, "2024-05-03T18:00");
        let again = form.validate().unwrap();
        assert_eq!(again.execution_start, task.execution_start);
    }
}
