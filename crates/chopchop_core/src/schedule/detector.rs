//! Due-reminder detection over a reminder snapshot.

use super::scheduler::is_overdue;
use crate::model::reminder::RecurringReminder;
use chrono::{DateTime, Utc};

/// Returns reminders that are active and due at `now`, in source order.
pub fn find_overdue(reminders: &[RecurringReminder], now: DateTime<Utc>) -> Vec<&RecurringReminder> {
    reminders
        .iter()
        .filter(|reminder| is_overdue(reminder, now))
        .collect()
}

/// Returns reminders with `is_active == true`, in source order.
pub fn active_reminders(reminders: &[RecurringReminder]) -> Vec<&RecurringReminder> {
    reminders.iter().filter(|reminder| reminder.is_active).collect()
}

#[cfg(test)]
mod tests {
    use super::{active_reminders, find_overdue};
    use crate::model::reminder::{RecurringReminder, ReminderInterval};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn keeps_source_order_and_skips_inactive_or_future() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let minute = ReminderInterval::minutes(1).unwrap();
        let hour = ReminderInterval::hours(1).unwrap();

        let first = RecurringReminder::new("first", None, minute, t0);
        let future = RecurringReminder::new("future", None, hour, t0);
        let mut paused = RecurringReminder::new("paused", None, minute, t0);
        paused.deactivate();
        let last = RecurringReminder::new("last", None, minute, t0);

        let reminders = vec![first.clone(), future, paused, last.clone()];
        let due = find_overdue(&reminders, t0 + Duration::seconds(70));
        let ids: Vec<_> = due.iter().map(|reminder| reminder.id).collect();
        assert_eq!(ids, vec![first.id, last.id]);

        assert_eq!(active_reminders(&reminders).len(), 3);
    }

    #[test]
    fn fired_reminder_is_not_detected_again_at_same_instant() {
        let t0 = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let mut reminder =
            RecurringReminder::new("r", None, ReminderInterval::minutes(1).unwrap(), t0);
        let now = t0 + Duration::seconds(70);
        assert_eq!(find_overdue(std::slice::from_ref(&reminder), now).len(), 1);

        reminder.mark_fired(now);
        assert!(reminder.next_due_at > now);
        assert!(find_overdue(std::slice::from_ref(&reminder), now).is_empty());
    }
}
