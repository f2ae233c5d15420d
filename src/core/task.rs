use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::ValidatedFields;

/// Timestamps as written by a `datetime-local` input: minute precision,
/// with seconds only when they are non-zero. Reads anything
/// `parse_timestamp` accepts.
mod local_timestamp {
    use chrono::{NaiveDateTime, Timelike};
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::core::validate::{parse_timestamp, FORM_DATETIME_FORMAT};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        let text = if dt.second() == 0 && dt.nanosecond() == 0 {
            dt.format(FORM_DATETIME_FORMAT).to_string()
        } else {
            dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
        };
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(d)?;
        parse_timestamp(&text).ok_or_else(|| de::Error::custom(format!("invalid timestamp {:?}", text)))
    }
}

/// Creation time as epoch milliseconds. Also reads a datetime string.
mod epoch_millis {
    use chrono::{Local, TimeZone};
    use serde::{de, Deserialize, Deserializer};

    use crate::core::validate::parse_timestamp;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Stored::deserialize(d)? {
            Stored::Millis(ms) => Ok(ms),
            Stored::Float(ms) if ms.is_finite() => Ok(ms.round() as i64),
            Stored::Float(ms) => Err(de::Error::custom(format!("invalid createdAt {}", ms))),
            Stored::Text(text) => parse_timestamp(&text)
                .and_then(|dt| Local.from_local_datetime(&dt).earliest())
                .map(|dt| dt.timestamp_millis())
                .ok_or_else(|| de::Error::custom(format!("invalid createdAt {:?}", text))),
        }
    }
}

/// A checklist item nested under a task. Its completion is independent of the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: Uuid,
    pub content: String,
    pub is_completed: bool,
}

impl Subtask {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            is_completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub content: String,
    #[serde(with = "local_timestamp")]
    pub execution_start: NaiveDateTime,
    #[serde(with = "local_timestamp")]
    pub execution_end: NaiveDateTime,
    #[serde(with = "local_timestamp")]
    pub deadline: NaiveDateTime,
    pub is_completed: bool,
    /// Epoch milliseconds; informational only.
    #[serde(deserialize_with = "epoch_millis::deserialize")]
    pub created_at: i64,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Create a task from fields that already passed validation.
    pub fn from_fields(fields: ValidatedFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: fields.content,
            execution_start: fields.execution_start,
            execution_end: fields.execution_end,
            deadline: fields.deadline,
            is_completed: false,
            created_at: chrono::Local::now().timestamp_millis(),
            subtasks: Vec::new(),
        }
    }

    /// Apply an edit. Identity, completion, creation time and subtasks are kept.
    pub fn edited(self, fields: ValidatedFields) -> Self {
        Self {
            content: fields.content,
            execution_start: fields.execution_start,
            execution_end: fields.execution_end,
            deadline: fields.deadline,
            ..self
        }
    }

    pub fn toggled(self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self
        }
    }

    pub fn with_subtask(mut self, content: impl Into<String>) -> Self {
        self.subtasks.push(Subtask::new(content));
        self
    }

    pub fn without_subtask(mut self, subtask_id: Uuid) -> Self {
        self.subtasks.retain(|s| s.id != subtask_id);
        self
    }

    pub fn with_subtask_toggled(mut self, subtask_id: Uuid) -> Self {
        if let Some(sub) = self.subtasks.iter_mut().find(|s| s.id == subtask_id) {
            sub.is_completed = !sub.is_completed;
        }
        self
    }

    /// Share of completed subtasks in percent, 0 when there are none.
    pub fn subtask_progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return 0.0;
        }
        let done = self.subtasks.iter().filter(|s| s.is_completed).count();
        done as f64 / self.subtasks.len() as f64 * 100.0
    }

    /// Still open and past its deadline.
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.is_completed && self.deadline < now
    }

    /// `HH:MM > HH:MM` for a same-day window, `MM/DD HH:MM > MM/DD HH:MM` otherwise.
    pub fn window_label(&self) -> String {
        let fmt = if self.execution_start.date() == self.execution_end.date() {
            "%H:%M"
        } else {
            "%m/%d %H:%M"
        };
        format!(
            "{} > {}",
            self.execution_start.format(fmt),
            self.execution_end.format(fmt)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validate::validate;

    fn make_task(start: &str, end: &str, deadline: &str) -> Task {
        Task::from_fields(validate("Base task", start, end, deadline).unwrap())
    }

    #[test]
    fn new_task_is_open_without_subtasks() {
        let t = make_task("2024-05-01T09:00", "2024-05-01T10:00", "2024-05-01T12:00");
        assert!(!t.is_completed);
        assert!(t.subtasks.is_empty());
        assert_eq!(t.subtask_progress(), 0.0);
    }

    #[test]
    fn toggle_flips_completion_and_keeps_identity() {
        let t = make_task("2024-05-01T09:00", "2024-05-01T10:00", "2024-05-01T12:00");
        let id = t.id;
        let done = t.toggled();
        assert!(done.is_completed);
        assert_eq!(done.id, id);
        assert!(!done.toggled().is_completed);
    }

    #[test]
    fn edit_keeps_subtasks_and_completion() {
        let t = make_task("2024-05-01T09:00", "2024-05-01T10:00", "2024-05-01T12:00")
            .with_subtask("Outline")
            .toggled();
        let id = t.id;
        let created = t.created_at;
        let fields =
            validate("Renamed", "2024-05-02T09:00", "2024-05-02T11:00", "2024-05-02T11:00").unwrap();
        let edited = t.edited(fields);
        assert_eq!(edited.id, id);
        assert_eq!(edited.created_at, created);
        assert_eq!(edited.content, "Renamed");
        assert!(edited.is_completed);
        assert_eq!(edited.subtasks.len(), 1);
    }

    #[test]
    fn subtasks_toggle_independently_of_parent() {
        let t = make_task("2024-05-01T09:00", "2024-05-01T10:00", "2024-05-01T12:00")
            .with_subtask("One")
            .with_subtask("Two")
            .with_subtask("Three")
            .with_subtask("Four");
        let first = t.subtasks[0].id;
        let second = t.subtasks[1].id;
        let t = t.with_subtask_toggled(first);
        assert_eq!(t.subtask_progress(), 25.0);
        assert!(!t.is_completed);

        let t = t.without_subtask(second);
        assert_eq!(t.subtasks.len(), 3);
        assert!(t.subtasks[0].is_completed);
        assert_eq!(t.subtasks[1].content, "Three");

        let t = t.with_subtask_toggled(Uuid::new_v4());
        assert_eq!(t.subtasks.iter().filter(|s| s.is_completed).count(), 1);
    }

    #[test]
    fn overdue_only_when_open_and_past_deadline() {
        let t = make_task("2024-05-01T09:00", "2024-05-01T10:00", "2024-05-01T12:00");
        let before = t.deadline - chrono::Duration::minutes(1);
        let after = t.deadline + chrono::Duration::minutes(1);
        assert!(!t.is_overdue(before));
        assert!(!t.is_overdue(t.deadline));
        assert!(t.is_overdue(after));
        assert!(!t.toggled().is_overdue(after));
    }

    #[test]
    fn window_label_depends_on_span() {
        let same = make_task("2024-05-01T09:00", "2024-05-01T10:30", "2024-05-01T12:00");
        assert_eq!(same.window_label(), "09:00 > 10:30");
        let multi = make_task("2024-05-01T22:00", "2024-05-02T01:00", "2024-05-02T12:00");
        assert_eq!(multi.window_label(), "05/01 22:00 > 05/02 01:00");
    }

    #[test]
    fn records_without_subtasks_deserialize() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "content": "Legacy",
            "executionStart": "2024-05-01T09:00:00",
            "executionEnd": "2024-05-01T10:00:00",
            "deadline": "2024-05-01T10:00:00",
            "isCompleted": true,
            "createdAt": "2024-04-30T08:00:00"
        }"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert!(t.is_completed);
        assert!(t.subtasks.is_empty());
        assert!(t.created_at > 0);
    }

    #[test]
    fn minute_precision_records_load_and_write_back_unchanged() {
        let json = r#"{"id":"550e8400-e29b-41d4-a716-446655440000","content":"Ship it","deadline":"2024-05-01T10:00","executionStart":"2024-05-01T09:00","executionEnd":"2024-05-01T10:00","isCompleted":false,"createdAt":1714550400000}"#;
        let t: Task = serde_json::from_str(json).unwrap();
        assert_eq!(t.execution_start.to_string(), "2024-05-01 09:00:00");
        assert_eq!(t.created_at, 1_714_550_400_000);

        let written = serde_json::to_value(&t).unwrap();
        assert_eq!(written["executionStart"], "2024-05-01T09:00");
        assert_eq!(written["deadline"], "2024-05-01T10:00");
        assert_eq!(written["createdAt"], 1_714_550_400_000i64);
        assert_eq!(serde_json::from_value::<Task>(written).unwrap(), t);
    }

    #[test]
    fn seconds_survive_a_round_trip() {
        let t = make_task("2024-05-01T09:00:30", "2024-05-01T10:00", "2024-05-01T12:00");
        let written = serde_json::to_value(&t).unwrap();
        assert_eq!(written["executionStart"], "2024-05-01T09:00:30");
        assert_eq!(serde_json::from_value::<Task>(written).unwrap(), t);
    }

    #[test]
    fn unreadable_timestamp_fails_to_load() {
        let json = r#"{"id":"550e8400-e29b-41d4-a716-446655440000","content":"x","deadline":"soon","executionStart":"2024-05-01T09:00","executionEnd":"2024-05-01T10:00","isCompleted":false,"createdAt":0}"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }
}
