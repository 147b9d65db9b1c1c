//! Snapshot store contract and reminder-level helpers.
//!
//! # Responsibility
//! - Define the key-value persistence boundary (`load` / `save` of one
//!   `DayData` snapshot).
//! - Provide read-all, patch-by-id, put-by-id and delete-by-id on top of it.
//!
//! # Invariants
//! - Helpers validate records before writing.
//! - Helpers never create a snapshot implicitly except `insert_reminder`.
//! - Write failures are returned to the caller, never swallowed.

use crate::db::DbError;
use crate::model::day::{DayData, TaskValidationError};
use crate::model::reminder::{RecurringReminder, ReminderId, ReminderValidationError};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence and record-lookup errors.
#[derive(Debug)]
pub enum StoreError {
    /// Backend refused the operation (disk full, locked, injected fault).
    Unavailable(String),
    Db(DbError),
    Serialization(serde_json::Error),
    /// Persisted snapshot exists but cannot be decoded.
    Corrupt(String),
    NotFound(ReminderId),
    Validation(ReminderValidationError),
    TaskValidation(TaskValidationError),
}

impl StoreError {
    /// Whether retrying the same write may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Db(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "snapshot serialization failed: {err}"),
            Self::Corrupt(message) => write!(f, "stored snapshot is corrupt: {message}"),
            Self::NotFound(id) => write!(f, "reminder not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskValidation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::TaskValidation(err) => Some(err),
            Self::Unavailable(_) | Self::Corrupt(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<ReminderValidationError> for StoreError {
    fn from(value: ReminderValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TaskValidationError> for StoreError {
    fn from(value: TaskValidationError) -> Self {
        Self::TaskValidation(value)
    }
}

/// Durable storage of the daily snapshot.
pub trait ReminderStore {
    /// Returns the stored snapshot, or `None` when nothing was saved yet.
    fn load(&self) -> StoreResult<Option<DayData>>;

    /// Replaces the stored snapshot.
    fn save(&self, data: &DayData) -> StoreResult<()>;

    /// Loads the snapshot as seen on `today`: an empty day when nothing is
    /// stored, tasks cleared and reminders kept when the date changed.
    fn load_day(&self, today: NaiveDate) -> StoreResult<DayData> {
        Ok(self
            .load()?
            .map(|data| data.rolled_over(today))
            .unwrap_or_else(|| DayData::empty(today)))
    }
}

impl<S: ReminderStore + ?Sized> ReminderStore for &S {
    fn load(&self) -> StoreResult<Option<DayData>> {
        (**self).load()
    }

    fn save(&self, data: &DayData) -> StoreResult<()> {
        (**self).save(data)
    }
}

impl<S: ReminderStore + ?Sized> ReminderStore for Box<S> {
    fn load(&self) -> StoreResult<Option<DayData>> {
        (**self).load()
    }

    fn save(&self, data: &DayData) -> StoreResult<()> {
        (**self).save(data)
    }
}

/// Returns every stored reminder in insertion order.
pub fn read_reminders<S: ReminderStore + ?Sized>(store: &S) -> StoreResult<Vec<RecurringReminder>> {
    Ok(store.load()?.map(|data| data.reminders).unwrap_or_default())
}

/// Appends a new reminder, creating a snapshot for `today` when none exists.
pub fn insert_reminder<S: ReminderStore + ?Sized>(
    store: &S,
    today: NaiveDate,
    reminder: RecurringReminder,
) -> StoreResult<()> {
    reminder.validate()?;
    let mut data = store.load_day(today)?;
    data.reminders.push(reminder);
    store.save(&data)
}

/// Applies `update` to the stored reminder `id` and writes the result back.
///
/// Returns the updated record. Nothing is written when `update` produces an
/// invalid record.
pub fn patch_reminder<S, F>(store: &S, id: ReminderId, update: F) -> StoreResult<RecurringReminder>
where
    S: ReminderStore + ?Sized,
    F: FnOnce(&mut RecurringReminder),
{
    let mut data = store.load()?.ok_or(StoreError::NotFound(id))?;
    let reminder = data.reminder_mut(id).ok_or(StoreError::NotFound(id))?;
    update(reminder);
    reminder.validate()?;
    let updated = reminder.clone();
    store.save(&data)?;
    Ok(updated)
}

/// Replaces the stored reminder with the same id.
pub fn put_reminder<S: ReminderStore + ?Sized>(
    store: &S,
    reminder: &RecurringReminder,
) -> StoreResult<()> {
    patch_reminder(store, reminder.id, |stored| *stored = reminder.clone()).map(|_| ())
}

/// Removes reminder `id`. Returns `NotFound` when it does not exist.
pub fn delete_reminder<S: ReminderStore + ?Sized>(store: &S, id: ReminderId) -> StoreResult<()> {
    let mut data = store.load()?.ok_or(StoreError::NotFound(id))?;
    let before = data.reminders.len();
    data.reminders.retain(|reminder| reminder.id != id);
    if data.reminders.len() == before {
        return Err(StoreError::NotFound(id));
    }
    store.save(&data)
}
