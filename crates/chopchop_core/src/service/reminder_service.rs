//! Reminder use-case service for user-initiated edits.
//!
//! # Responsibility
//! - Create, edit, pause/resume and delete recurring reminders.
//! - Provide read views (all, active, overdue) at the injected clock's now.
//!
//! # Invariants
//! - New reminders are active and due one interval after creation.
//! - Editing the interval alone never moves `next_due_at`.
//! - Reactivation reschedules from now, never from a stale due time.
//! - Deactivation leaves `next_due_at` untouched.

use crate::clock::Clock;
use crate::model::reminder::{
    clamp_volume, normalize_notes, RecurringReminder, ReminderId, ReminderInterval,
    DEFAULT_SOUND_VOLUME,
};
use crate::schedule::detector::find_overdue;
use crate::store::{
    delete_reminder, insert_reminder, patch_reminder, read_reminders, ReminderStore, StoreResult,
};
use log::info;

/// Input for creating a reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReminder {
    pub title: String,
    pub notes: Option<String>,
    pub interval: ReminderInterval,
    pub sound_enabled: bool,
    /// `None` uses the service default volume.
    pub sound_volume: Option<f32>,
}

impl NewReminder {
    pub fn new(title: impl Into<String>, interval: ReminderInterval) -> Self {
        Self {
            title: title.into(),
            notes: None,
            interval,
            sound_enabled: true,
            sound_volume: None,
        }
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderEdit {
    pub title: Option<String>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
    pub interval: Option<ReminderInterval>,
    pub sound_enabled: Option<bool>,
    pub sound_volume: Option<f32>,
    /// Applied after the other fields, so an interval edit combined with
    /// reactivation schedules with the new interval.
    pub active: Option<bool>,
}

/// Use-case service for recurring reminders.
pub struct ReminderService<S: ReminderStore, C: Clock> {
    store: S,
    clock: C,
    default_volume: f32,
}

impl<S: ReminderStore, C: Clock> ReminderService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_default_volume(store, clock, DEFAULT_SOUND_VOLUME)
    }

    pub fn with_default_volume(store: S, clock: C, default_volume: f32) -> Self {
        Self {
            store,
            clock,
            default_volume: clamp_volume(default_volume),
        }
    }

    /// Creates and stores a new active reminder.
    pub fn add(&self, request: NewReminder) -> StoreResult<RecurringReminder> {
        let now = self.clock.now();
        let volume = request.sound_volume.unwrap_or(self.default_volume);
        let reminder = RecurringReminder::new(request.title, request.notes, request.interval, now)
            .with_sound(request.sound_enabled, volume);
        insert_reminder(&self.store, self.clock.today(), reminder.clone())?;
        info!(
            "event=reminder_create module=reminder_service status=ok reminder_id={} unit={} amount={}",
            reminder.id,
            reminder.interval.unit().as_str(),
            reminder.interval.amount()
        );
        Ok(reminder)
    }

    /// Applies a partial edit.
    pub fn edit(&self, id: ReminderId, edit: ReminderEdit) -> StoreResult<RecurringReminder> {
        let now = self.clock.now();
        let updated = patch_reminder(&self.store, id, |reminder| {
            if let Some(title) = edit.title {
                reminder.title = title.trim().to_string();
            }
            if let Some(notes) = edit.notes {
                reminder.notes = normalize_notes(notes);
            }
            if let Some(interval) = edit.interval {
                reminder.interval = interval;
            }
            if let Some(enabled) = edit.sound_enabled {
                reminder.sound_enabled = enabled;
            }
            if let Some(volume) = edit.sound_volume {
                reminder.sound_volume = clamp_volume(volume);
            }
            match edit.active {
                Some(true) => reminder.activate(now),
                Some(false) => reminder.deactivate(),
                None => {}
            }
        })?;
        info!(
            "event=reminder_edit module=reminder_service status=ok reminder_id={} active={}",
            updated.id, updated.is_active
        );
        Ok(updated)
    }

    /// Pauses an active reminder or resumes a paused one.
    pub fn toggle_active(&self, id: ReminderId) -> StoreResult<RecurringReminder> {
        let now = self.clock.now();
        let updated = patch_reminder(&self.store, id, |reminder| reminder.toggle_active(now))?;
        info!(
            "event=reminder_toggle module=reminder_service status=ok reminder_id={} active={}",
            updated.id, updated.is_active
        );
        Ok(updated)
    }

    pub fn set_active(&self, id: ReminderId, active: bool) -> StoreResult<RecurringReminder> {
        self.edit(
            id,
            ReminderEdit {
                active: Some(active),
                ..ReminderEdit::default()
            },
        )
    }

    pub fn delete(&self, id: ReminderId) -> StoreResult<()> {
        delete_reminder(&self.store, id)?;
        info!("event=reminder_delete module=reminder_service status=ok reminder_id={id}");
        Ok(())
    }

    pub fn list(&self) -> StoreResult<Vec<RecurringReminder>> {
        read_reminders(&self.store)
    }

    pub fn get(&self, id: ReminderId) -> StoreResult<Option<RecurringReminder>> {
        Ok(self.list()?.into_iter().find(|reminder| reminder.id == id))
    }

    pub fn active(&self) -> StoreResult<Vec<RecurringReminder>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|reminder| reminder.is_active)
            .collect())
    }

    /// Reminders due at the clock's current instant.
    pub fn overdue(&self) -> StoreResult<Vec<RecurringReminder>> {
        let reminders = self.list()?;
        let now = self.clock.now();
        Ok(find_overdue(&reminders, now).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{NewReminder, ReminderEdit, ReminderService};
    use crate::clock::ManualClock;
    use crate::model::reminder::ReminderInterval;
    use crate::store::{MemoryStore, StoreError};
    use chrono::{Duration, TimeZone, Utc};

    fn service() -> (ReminderService<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap());
        (ReminderService::new(MemoryStore::new(), clock.clone()), clock)
    }

    #[test]
    fn add_rejects_blank_title() {
        let (service, _) = service();
        let err = service
            .add(NewReminder::new("   ", ReminderInterval::minutes(5).unwrap()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(service.list().unwrap().is_empty());
    }

    #[test]
    fn add_uses_default_volume_when_unset() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap());
        let service = ReminderService::with_default_volume(MemoryStore::new(), clock, 0.25);
        let reminder = service
            .add(NewReminder::new("hydrate", ReminderInterval::hours(1).unwrap()))
            .unwrap();
        assert_eq!(reminder.sound_volume, 0.25);
    }

    #[test]
    fn interval_edit_alone_keeps_next_due() {
        let (service, clock) = service();
        let created = service
            .add(NewReminder::new("walk", ReminderInterval::hours(1).unwrap()))
            .unwrap();
        clock.advance(Duration::minutes(10));

        let edited = service
            .edit(
                created.id,
                ReminderEdit {
                    interval: Some(ReminderInterval::minutes(5).unwrap()),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.next_due_at, created.next_due_at);
        assert_eq!(edited.interval, ReminderInterval::minutes(5).unwrap());
    }

    #[test]
    fn interval_edit_with_reactivation_reschedules_from_now() {
        let (service, clock) = service();
        let created = service
            .add(NewReminder::new("walk", ReminderInterval::hours(1).unwrap()))
            .unwrap();
        service.set_active(created.id, false).unwrap();
        clock.advance(Duration::hours(5));

        let edited = service
            .edit(
                created.id,
                ReminderEdit {
                    interval: Some(ReminderInterval::minutes(5).unwrap()),
                    active: Some(true),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.next_due_at, clock_now(&clock) + Duration::minutes(5));
    }

    #[test]
    fn toggle_pauses_then_resumes_from_now() {
        let (service, clock) = service();
        let created = service
            .add(NewReminder::new("water", ReminderInterval::hours(1).unwrap()))
            .unwrap();

        let paused = service.toggle_active(created.id).unwrap();
        assert!(!paused.is_active);
        assert_eq!(paused.next_due_at, created.next_due_at);

        clock.advance(Duration::days(2));
        let resumed = service.toggle_active(created.id).unwrap();
        assert!(resumed.is_active);
        assert_eq!(resumed.next_due_at, clock_now(&clock) + Duration::hours(1));
    }

    #[test]
    fn edit_clears_notes_and_clamps_volume() {
        let (service, _) = service();
        let mut request = NewReminder::new("read", ReminderInterval::days(1).unwrap());
        request.notes = Some("chapter 3".into());
        let created = service.add(request).unwrap();

        let edited = service
            .edit(
                created.id,
                ReminderEdit {
                    notes: Some(None),
                    sound_volume: Some(-1.0),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.notes, None);
        assert_eq!(edited.sound_volume, 0.0);
    }

    #[test]
    fn overdue_view_follows_clock() {
        let (service, clock) = service();
        service
            .add(NewReminder::new("blink", ReminderInterval::minutes(1).unwrap()))
            .unwrap();
        assert!(service.overdue().unwrap().is_empty());
        clock.advance(Duration::seconds(61));
        assert_eq!(service.overdue().unwrap().len(), 1);
    }

    fn clock_now(clock: &ManualClock) -> chrono::DateTime<Utc> {
        use crate::clock::Clock;
        clock.now()
    }
}
