//! Trigger controller: alert, reschedule and persist one due reminder.
//!
//! # Responsibility
//! - Present the alert (and audio cue) for a due reminder.
//! - Advance `last_fired_at` / `next_due_at` from the firing instant.
//! - Write the updated record back through the store.
//!
//! # Invariants
//! - Alert and tone failures never skip rescheduling or persistence.
//! - Persistence failures are returned in the outcome, never dropped.
//! - Not reentrant per reminder id; callers serialize firings.

use crate::model::reminder::RecurringReminder;
use crate::notify::{Alert, AlertHandle, GatewayError, NotificationGateway, NotificationPermission};
use crate::store::{put_reminder, ReminderStore, StoreResult};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

/// Result of the visual alert step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertOutcome {
    Presented(AlertHandle),
    /// Permission is not granted; no alert was attempted or the gateway
    /// refused it.
    PermissionDenied,
    Failed(GatewayError),
}

/// Result of the audio cue step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToneOutcome {
    /// Sound disabled on the reminder.
    Skipped,
    Played,
    Failed(GatewayError),
}

/// Everything that happened while firing one reminder.
#[derive(Debug)]
pub struct FireOutcome {
    /// Record after rescheduling.
    pub reminder: RecurringReminder,
    pub alert: AlertOutcome,
    pub tone: ToneOutcome,
    pub persisted: StoreResult<()>,
}

impl FireOutcome {
    pub fn alert_shown(&self) -> bool {
        matches!(self.alert, AlertOutcome::Presented(_))
    }
}

/// Fires due reminders against one store and gateway.
pub struct TriggerController<'a, S: ?Sized, G: ?Sized> {
    store: &'a S,
    gateway: &'a G,
    retry_attempts: u32,
}

impl<'a, S, G> TriggerController<'a, S, G>
where
    S: ReminderStore + ?Sized,
    G: NotificationGateway + ?Sized,
{
    pub fn new(store: &'a S, gateway: &'a G, retry_attempts: u32) -> Self {
        Self {
            store,
            gateway,
            retry_attempts: retry_attempts.max(1),
        }
    }

    /// Fires `reminder` at `now`.
    ///
    /// Steps run in order and each may fail independently: alert (+ tone),
    /// `last_fired_at = now`, `next_due_at = now + interval`, persist.
    pub fn fire(&self, reminder: &RecurringReminder, now: DateTime<Utc>) -> FireOutcome {
        let alert = self.present_alert(reminder);
        let tone = self.play_tone(reminder);

        let mut updated = reminder.clone();
        updated.mark_fired(now);

        let persisted = self.persist(&updated);
        match &persisted {
            Ok(()) => info!(
                "event=reminder_fire module=trigger status=ok reminder_id={} alert={} next_due_at={}",
                updated.id,
                alert_label(&alert),
                updated.next_due_at.to_rfc3339()
            ),
            Err(err) => error!(
                "event=reminder_fire module=trigger status=error reminder_id={} error_code=persist_failed error={err}",
                updated.id
            ),
        }

        FireOutcome {
            reminder: updated,
            alert,
            tone,
            persisted,
        }
    }

    fn present_alert(&self, reminder: &RecurringReminder) -> AlertOutcome {
        let permission = self.gateway.query_permission();
        if permission != NotificationPermission::Granted {
            debug!(
                "event=alert_present module=trigger status=skip reminder_id={} permission={}",
                reminder.id,
                permission.as_str()
            );
            return AlertOutcome::PermissionDenied;
        }

        match self.gateway.present(&Alert::for_reminder(reminder)) {
            Ok(handle) => AlertOutcome::Presented(handle),
            Err(GatewayError::PermissionDenied) => {
                warn!(
                    "event=alert_present module=trigger status=error reminder_id={} error_code=permission_denied",
                    reminder.id
                );
                AlertOutcome::PermissionDenied
            }
            Err(err) => {
                warn!(
                    "event=alert_present module=trigger status=error reminder_id={} error_code=gateway_failure error={err}",
                    reminder.id
                );
                AlertOutcome::Failed(err)
            }
        }
    }

    fn play_tone(&self, reminder: &RecurringReminder) -> ToneOutcome {
        if !reminder.sound_enabled {
            return ToneOutcome::Skipped;
        }
        match self.gateway.play_tone(reminder.sound_volume) {
            Ok(()) => ToneOutcome::Played,
            Err(err) => {
                warn!(
                    "event=tone_play module=trigger status=error reminder_id={} error={err}",
                    reminder.id
                );
                ToneOutcome::Failed(err)
            }
        }
    }

    fn persist(&self, reminder: &RecurringReminder) -> StoreResult<()> {
        let mut attempt = 1;
        loop {
            match put_reminder(self.store, reminder) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < self.retry_attempts => {
                    warn!(
                        "event=reminder_persist module=trigger status=retry reminder_id={} attempt={attempt} error={err}",
                        reminder.id
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn alert_label(outcome: &AlertOutcome) -> &'static str {
    match outcome {
        AlertOutcome::Presented(_) => "presented",
        AlertOutcome::PermissionDenied => "permission_denied",
        AlertOutcome::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::{AlertOutcome, ToneOutcome, TriggerController};
    use crate::model::reminder::{RecurringReminder, ReminderInterval};
    use crate::notify::{GatewayError, NotificationPermission};
    use crate::store::{insert_reminder, read_reminders, MemoryStore, StoreError};
    use crate::testing::RecordingGateway;
    use chrono::{Duration, TimeZone, Utc};

    fn setup(sound: bool) -> (MemoryStore, RecurringReminder, chrono::DateTime<Utc>) {
        let t0 = Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap();
        let reminder = RecurringReminder::new("tea", None, ReminderInterval::minutes(1).unwrap(), t0)
            .with_sound(sound, 0.4);
        let store = MemoryStore::new();
        insert_reminder(&store, t0.date_naive(), reminder.clone()).unwrap();
        (store, reminder, t0)
    }

    #[test]
    fn fire_presents_alert_plays_tone_and_reschedules_from_now() {
        let (store, reminder, t0) = setup(true);
        let gateway = RecordingGateway::new(NotificationPermission::Granted);
        let now = t0 + Duration::seconds(70);

        let outcome = TriggerController::new(&store, &gateway, 3).fire(&reminder, now);

        assert!(outcome.alert_shown());
        assert_eq!(outcome.tone, ToneOutcome::Played);
        assert_eq!(gateway.tones(), vec![0.4]);
        assert_eq!(outcome.reminder.last_fired_at, Some(now));
        assert_eq!(outcome.reminder.next_due_at, now + Duration::minutes(1));
        assert!(outcome.persisted.is_ok());
        assert_eq!(read_reminders(&store).unwrap()[0], outcome.reminder);
    }

    #[test]
    fn denied_permission_still_reschedules_and_plays_tone() {
        let (store, reminder, t0) = setup(true);
        let gateway = RecordingGateway::new(NotificationPermission::Denied);
        let now = t0 + Duration::minutes(2);

        let outcome = TriggerController::new(&store, &gateway, 3).fire(&reminder, now);

        assert_eq!(outcome.alert, AlertOutcome::PermissionDenied);
        assert!(gateway.alerts().is_empty());
        assert_eq!(outcome.tone, ToneOutcome::Played);
        assert_eq!(read_reminders(&store).unwrap()[0].last_fired_at, Some(now));
    }

    #[test]
    fn gateway_failure_does_not_block_persistence() {
        let (store, reminder, t0) = setup(false);
        let gateway = RecordingGateway::new(NotificationPermission::Granted);
        gateway.fail_presents(GatewayError::Platform("dbus down".into()));
        let now = t0 + Duration::minutes(5);

        let outcome = TriggerController::new(&store, &gateway, 3).fire(&reminder, now);

        assert!(matches!(outcome.alert, AlertOutcome::Failed(_)));
        assert_eq!(outcome.tone, ToneOutcome::Skipped);
        assert!(outcome.persisted.is_ok());
        assert_eq!(
            read_reminders(&store).unwrap()[0].next_due_at,
            now + Duration::minutes(1)
        );
    }

    #[test]
    fn transient_store_failures_are_retried() {
        let (store, reminder, t0) = setup(false);
        let gateway = RecordingGateway::new(NotificationPermission::Granted);
        store.fail_next_saves(2);

        let outcome =
            TriggerController::new(&store, &gateway, 3).fire(&reminder, t0 + Duration::minutes(1));
        assert!(outcome.persisted.is_ok());
    }

    #[test]
    fn exhausted_retries_surface_the_storage_error() {
        let (store, reminder, t0) = setup(false);
        let gateway = RecordingGateway::new(NotificationPermission::Granted);
        store.fail_next_saves(5);

        let outcome =
            TriggerController::new(&store, &gateway, 2).fire(&reminder, t0 + Duration::minutes(1));
        assert!(matches!(outcome.persisted, Err(StoreError::Unavailable(_))));
        assert_eq!(read_reminders(&store).unwrap()[0].last_fired_at, None);
    }

    #[test]
    fn stale_far_overdue_reminder_advances_one_interval_from_now() {
        let (store, reminder, t0) = setup(false);
        let gateway = RecordingGateway::new(NotificationPermission::Granted);
        let now = t0 + Duration::minutes(42);

        let outcome = TriggerController::new(&store, &gateway, 3).fire(&reminder, now);
        assert_eq!(outcome.reminder.next_due_at, now + Duration::minutes(1));
        assert_eq!(gateway.alerts().len(), 1);
    }
}
