//! Pure due-time arithmetic.
//!
//! # Invariants
//! - Functions here never read the clock; callers pass `from`/`now`.
//! - Same inputs always produce the same instant.
//! - Overflow saturates at `DateTime::<Utc>::MAX_UTC` instead of panicking.

use crate::model::reminder::{IntervalUnit, RecurringReminder, ReminderInterval};
use chrono::{DateTime, Days, Local, LocalResult, TimeDelta, TimeZone, Utc};

/// Instant one `interval` after `from`, with day steps taken on the local
/// calendar.
pub fn compute_next_due(interval: ReminderInterval, from: DateTime<Utc>) -> DateTime<Utc> {
    compute_next_due_in(interval, from, &Local)
}

/// Same as [`compute_next_due`] with an explicit calendar timezone.
///
/// Minute and hour steps are fixed durations. Day steps keep the local
/// wall-clock time across DST changes; when the target wall time does not
/// exist the step falls back to 24h per day, and an ambiguous target maps to
/// the earliest instant.
pub fn compute_next_due_in<Tz: TimeZone>(
    interval: ReminderInterval,
    from: DateTime<Utc>,
    tz: &Tz,
) -> DateTime<Utc> {
    let amount = i64::from(interval.amount());
    let next = match interval.unit() {
        IntervalUnit::Minute => add_fixed(from, TimeDelta::try_minutes(amount)),
        IntervalUnit::Hour => add_fixed(from, TimeDelta::try_hours(amount)),
        IntervalUnit::Day => add_calendar_days(from, interval.amount(), tz)
            .or_else(|| add_fixed(from, TimeDelta::try_days(amount))),
    };
    next.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// True iff the reminder is active and its due time has been reached.
pub fn is_overdue(reminder: &RecurringReminder, now: DateTime<Utc>) -> bool {
    reminder.is_active && reminder.next_due_at <= now
}

fn add_fixed(from: DateTime<Utc>, delta: Option<TimeDelta>) -> Option<DateTime<Utc>> {
    from.checked_add_signed(delta?)
}

fn add_calendar_days<Tz: TimeZone>(
    from: DateTime<Utc>,
    days: u32,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let local = from.with_timezone(tz).naive_local();
    let target = local.checked_add_days(Days::new(u64::from(days)))?;
    match tz.from_local_datetime(&target) {
        LocalResult::Single(value) => Some(value.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
