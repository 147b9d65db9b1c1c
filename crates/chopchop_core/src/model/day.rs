//! Daily snapshot model: ordered tasks plus the reminder collection.
//!
//! # Responsibility
//! - Define the persisted `DayData` shape shared by store, import and export.
//! - Keep backward compatibility with older snapshots.
//!
//! # Invariants
//! - `tasks[i].order == i` after every service mutation.
//! - A missing `reminders` field deserializes as an empty list.
//! - Rolling over to a new date clears tasks and keeps reminders.

use super::reminder::RecurringReminder;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TaskId = Uuid;

/// Validation errors for task records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyText,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "task text must not be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One prioritized item of the daily list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    /// Zero-based position in the day's list.
    pub order: u32,
    pub completed: bool,
    /// Free-text/markdown note; empty when unset.
    #[serde(default)]
    pub subnote: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(text: impl Into<String>, order: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into().trim().to_string(),
            order,
            completed: false,
            subnote: String::new(),
            created_at,
            completed_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.text.trim().is_empty() {
            return Err(TaskValidationError::EmptyText);
        }
        Ok(())
    }
}

/// Full persisted snapshot for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayData {
    pub date: NaiveDate,
    #[serde(alias = "priorities")]
    pub tasks: Vec<Task>,
    #[serde(default, alias = "recurringReminders")]
    pub reminders: Vec<RecurringReminder>,
}

impl DayData {
    /// Empty snapshot for `date`.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            tasks: Vec::new(),
            reminders: Vec::new(),
        }
    }

    /// Returns the snapshot as seen on `today`.
    ///
    /// Same date: unchanged. Different date: tasks are dropped and reminders
    /// carried over.
    pub fn rolled_over(self, today: NaiveDate) -> Self {
        if self.date == today {
            return self;
        }
        Self {
            date: today,
            tasks: Vec::new(),
            reminders: self.reminders,
        }
    }

    pub fn reminder(&self, id: super::reminder::ReminderId) -> Option<&RecurringReminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    pub fn reminder_mut(
        &mut self,
        id: super::reminder::ReminderId,
    ) -> Option<&mut RecurringReminder> {
        self.reminders.iter_mut().find(|reminder| reminder.id == id)
    }

    /// Rewrites `order` to match list position.
    pub fn renumber_tasks(&mut self) {
        for (index, task) in self.tasks.iter_mut().enumerate() {
            task.order = index as u32;
        }
    }
}
