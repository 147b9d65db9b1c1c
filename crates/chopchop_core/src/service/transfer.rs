//! JSON export and import of the daily snapshot.
//!
//! # Responsibility
//! - Serialize `DayData` for backup files.
//! - Validate and decode imported payloads before anything is stored.
//!
//! # Invariants
//! - Import is all-or-nothing: a rejected payload never reaches the store.
//! - A payload without reminders imports with an empty reminder list.

use crate::model::day::DayData;
use crate::store::{ReminderStore, StoreError};
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reasons for imported payloads.
#[derive(Debug)]
pub enum ImportError {
    InvalidJson(serde_json::Error),
    MissingDate,
    TasksNotArray,
    /// Structure is right but a record failed to decode or validate.
    InvalidRecord(String),
    Store(StoreError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "import is not valid JSON: {err}"),
            Self::MissingDate => write!(f, "invalid data structure: `date` is required"),
            Self::TasksNotArray => write!(f, "invalid data structure: `tasks` must be an array"),
            Self::InvalidRecord(message) => write!(f, "invalid record in import: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ImportError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Pretty-printed export document.
pub fn export_json(data: &DayData) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Suggested export file name for `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("chop-chop-{}.json", date.format("%Y-%m-%d"))
}

/// Validates and decodes an import payload.
///
/// Requires a non-empty string `date` and an array `tasks` (legacy
/// `priorities` accepted). Every task and reminder must decode and validate.
pub fn import_json(payload: &str) -> Result<DayData, ImportError> {
    let value: Value = serde_json::from_str(payload).map_err(ImportError::InvalidJson)?;

    match value.get("date") {
        Some(Value::String(date)) if !date.trim().is_empty() => {}
        _ => return Err(ImportError::MissingDate),
    }
    let tasks = value.get("tasks").or_else(|| value.get("priorities"));
    if !matches!(tasks, Some(Value::Array(_))) {
        return Err(ImportError::TasksNotArray);
    }

    let data: DayData =
        serde_json::from_value(value).map_err(|err| ImportError::InvalidRecord(err.to_string()))?;

    for task in &data.tasks {
        task.validate()
            .map_err(|err| ImportError::InvalidRecord(format!("task {}: {err}", task.id)))?;
    }
    for reminder in &data.reminders {
        reminder
            .validate()
            .map_err(|err| ImportError::InvalidRecord(format!("reminder {}: {err}", reminder.id)))?;
    }
    Ok(data)
}

/// Imports `payload` and replaces the stored snapshot only on success.
pub fn import_into<S: ReminderStore + ?Sized>(
    store: &S,
    payload: &str,
) -> Result<DayData, ImportError> {
    let mut data = match import_json(payload) {
        Ok(data) => data,
        Err(err) => {
            warn!("event=import module=transfer status=error error={err}");
            return Err(err);
        }
    };
    data.renumber_tasks();
    store.save(&data)?;
    info!(
        "event=import module=transfer status=ok date={} task_count={} reminder_count={}",
        data.date,
        data.tasks.len(),
        data.reminders.len()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::{export_file_name, import_json, ImportError};
    use chrono::NaiveDate;

    #[test]
    fn file_name_embeds_date() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "chop-chop-2026-03-09.json");
    }

    #[test]
    fn rejects_missing_or_blank_date() {
        assert!(matches!(
            import_json(r#"{"tasks":[]}"#),
            Err(ImportError::MissingDate)
        ));
        assert!(matches!(
            import_json(r#"{"date":"  ","tasks":[]}"#),
            Err(ImportError::MissingDate)
        ));
    }

    #[test]
    fn rejects_non_array_tasks() {
        assert!(matches!(
            import_json(r#"{"date":"2026-03-09","tasks":{}}"#),
            Err(ImportError::TasksNotArray)
        ));
        assert!(matches!(
            import_json(r#"{"date":"2026-03-09"}"#),
            Err(ImportError::TasksNotArray)
        ));
    }

    #[test]
    fn rejects_bad_json_and_bad_records() {
        assert!(matches!(import_json("{"), Err(ImportError::InvalidJson(_))));
        assert!(matches!(
            import_json(r#"{"date":"not-a-date","tasks":[]}"#),
            Err(ImportError::InvalidRecord(_))
        ));
    }
}
