//! Recurring reminder domain model.
//!
//! # Responsibility
//! - Define the canonical reminder record and its interval value type.
//! - Provide lifecycle helpers for activation, firing and user edits.
//!
//! # Invariants
//! - `id` is stable and never reused for another reminder.
//! - `next_due_at` is the single source of truth for due-ness while active.
//! - Reactivation recomputes `next_due_at` from the activation instant.
//! - `interval.amount` is never zero.

use crate::schedule::scheduler::compute_next_due;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a recurring reminder.
pub type ReminderId = Uuid;

/// Volume used when a reminder is created without an explicit one.
pub const DEFAULT_SOUND_VOLUME: f32 = 0.7;

/// Time unit of a reminder cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalUnit {
    #[serde(alias = "minutes")]
    Minute,
    #[serde(alias = "hours")]
    Hour,
    #[serde(alias = "days")]
    Day,
}

impl IntervalUnit {
    /// Inclusive `(min, max)` amount offered by input forms for this unit.
    ///
    /// These are presentation bounds only; scheduling accepts any positive
    /// amount.
    pub fn ui_bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (1, 59),
            Self::Hour => (1, 23),
            Self::Day => (1, 30),
        }
    }

    /// Stable lower-case name used in storage and CLI input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

/// Parses `minute|hour|day` (plural forms accepted).
pub fn parse_interval_unit(value: &str) -> Result<IntervalUnit, IntervalError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "minute" | "minutes" | "m" => Ok(IntervalUnit::Minute),
        "hour" | "hours" | "h" => Ok(IntervalUnit::Hour),
        "day" | "days" | "d" => Ok(IntervalUnit::Day),
        other => Err(IntervalError::UnknownUnit(other.to_string())),
    }
}

/// Interval construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    NonPositiveAmount,
    UnknownUnit(String),
    /// A stored record carries neither `interval` nor `intervalType`/`intervalValue`.
    Missing,
}

impl Display for IntervalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveAmount => write!(f, "interval amount must be positive"),
            Self::UnknownUnit(value) => {
                write!(f, "unknown interval unit `{value}`; expected minute|hour|day")
            }
            Self::Missing => write!(f, "reminder has no interval"),
        }
    }
}

impl Error for IntervalError {}

/// Cadence of a recurring reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReminderInterval {
    unit: IntervalUnit,
    amount: u32,
}

impl ReminderInterval {
    /// Builds an interval, rejecting a zero amount.
    pub fn new(unit: IntervalUnit, amount: u32) -> Result<Self, IntervalError> {
        if amount == 0 {
            return Err(IntervalError::NonPositiveAmount);
        }
        Ok(Self { unit, amount })
    }

    /// Builds an interval with `amount` clamped into the unit's form bounds.
    pub fn clamped(unit: IntervalUnit, amount: u32) -> Self {
        let (min, max) = unit.ui_bounds();
        Self {
            unit,
            amount: amount.clamp(min, max),
        }
    }

    pub fn minutes(amount: u32) -> Result<Self, IntervalError> {
        Self::new(IntervalUnit::Minute, amount)
    }

    pub fn hours(amount: u32) -> Result<Self, IntervalError> {
        Self::new(IntervalUnit::Hour, amount)
    }

    pub fn days(amount: u32) -> Result<Self, IntervalError> {
        Self::new(IntervalUnit::Day, amount)
    }

    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }
}

impl Display for ReminderInterval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let suffix = if self.amount == 1 { "" } else { "s" };
        write!(f, "every {} {}{}", self.amount, self.unit.as_str(), suffix)
    }
}

// Persisted intervals go through `new` so a hand-edited `amount: 0` is
// rejected at load time instead of reaching the scheduler.
impl<'de> Deserialize<'de> for ReminderInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawInterval {
            unit: IntervalUnit,
            amount: u32,
        }

        let raw = RawInterval::deserialize(deserializer)?;
        ReminderInterval::new(raw.unit, raw.amount).map_err(serde::de::Error::custom)
    }
}

/// Validation errors for reminder records.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderValidationError {
    EmptyTitle,
    VolumeOutOfRange(f32),
}

impl Display for ReminderValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "reminder title must not be empty"),
            Self::VolumeOutOfRange(value) => {
                write!(f, "sound volume must be within [0, 1], got {value}")
            }
        }
    }
}

impl Error for ReminderValidationError {}

/// Canonical record for one recurring reminder.
///
/// Serializes in the current shape. Decoding also accepts records written
/// before `interval` became one object (`intervalType` + `intervalValue`,
/// `nextReminderAt`, `lastReminderAt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredReminder")]
pub struct RecurringReminder {
    pub id: ReminderId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub interval: ReminderInterval,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Stale and ignored while `is_active == false`.
    pub next_due_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fired_at: Option<DateTime<Utc>>,
    pub sound_enabled: bool,
    pub sound_volume: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReminder {
    id: ReminderId,
    title: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    interval: Option<ReminderInterval>,
    #[serde(default)]
    interval_type: Option<IntervalUnit>,
    #[serde(default)]
    interval_value: Option<u32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    #[serde(alias = "nextReminderAt")]
    next_due_at: DateTime<Utc>,
    #[serde(default, alias = "lastReminderAt")]
    last_fired_at: Option<DateTime<Utc>>,
    #[serde(default = "default_sound_enabled")]
    sound_enabled: bool,
    #[serde(default = "default_sound_volume")]
    sound_volume: f32,
}

impl TryFrom<StoredReminder> for RecurringReminder {
    type Error = IntervalError;

    fn try_from(stored: StoredReminder) -> Result<Self, Self::Error> {
        let interval = match (stored.interval, stored.interval_type, stored.interval_value) {
            (Some(interval), _, _) => interval,
            (None, Some(unit), Some(amount)) => ReminderInterval::new(unit, amount)?,
            _ => return Err(IntervalError::Missing),
        };
        Ok(Self {
            id: stored.id,
            title: stored.title,
            notes: stored.notes,
            interval,
            is_active: stored.is_active,
            created_at: stored.created_at,
            next_due_at: stored.next_due_at,
            last_fired_at: stored.last_fired_at,
            sound_enabled: stored.sound_enabled,
            sound_volume: stored.sound_volume,
        })
    }
}

fn default_sound_enabled() -> bool {
    true
}

fn default_sound_volume() -> f32 {
    DEFAULT_SOUND_VOLUME
}

impl RecurringReminder {
    /// Creates an active reminder first due one interval after `created_at`.
    ///
    /// Title and notes are trimmed; blank notes become `None`. Sound is
    /// enabled at [`DEFAULT_SOUND_VOLUME`].
    pub fn new(
        title: impl Into<String>,
        notes: Option<String>,
        interval: ReminderInterval,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into().trim().to_string(),
            notes: normalize_notes(notes),
            interval,
            is_active: true,
            created_at,
            next_due_at: compute_next_due(interval, created_at),
            last_fired_at: None,
            sound_enabled: true,
            sound_volume: DEFAULT_SOUND_VOLUME,
        }
    }

    /// Sets sound preferences, clamping volume into `[0, 1]`.
    pub fn with_sound(mut self, enabled: bool, volume: f32) -> Self {
        self.sound_enabled = enabled;
        self.sound_volume = clamp_volume(volume);
        self
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), ReminderValidationError> {
        if self.title.trim().is_empty() {
            return Err(ReminderValidationError::EmptyTitle);
        }
        if !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(ReminderValidationError::VolumeOutOfRange(self.sound_volume));
        }
        Ok(())
    }

    /// Records one firing at `now` and schedules the next occurrence from
    /// `now` (never from the stale due time).
    pub fn mark_fired(&mut self, now: DateTime<Utc>) {
        self.last_fired_at = Some(now);
        self.next_due_at = compute_next_due(self.interval, now);
    }

    /// Activates the reminder, rescheduling from `now`.
    ///
    /// No-op when already active, so an active schedule is never pushed back.
    pub fn activate(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            return;
        }
        self.is_active = true;
        self.next_due_at = compute_next_due(self.interval, now);
    }

    /// Deactivates the reminder. `next_due_at` is left untouched.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Flips activation state; see [`Self::activate`].
    pub fn toggle_active(&mut self, now: DateTime<Utc>) {
        if self.is_active {
            self.deactivate();
        } else {
            self.activate(now);
        }
    }
}

/// Trims notes and maps blank input to `None`.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Clamps a volume into `[0, 1]`; NaN maps to the default volume.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return DEFAULT_SOUND_VOLUME;
    }
    volume.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn interval_rejects_zero_amount() {
        assert_eq!(
            ReminderInterval::new(IntervalUnit::Hour, 0),
            Err(IntervalError::NonPositiveAmount)
        );
    }

    #[test]
    fn interval_accepts_amounts_beyond_form_bounds() {
        let interval = ReminderInterval::minutes(500).expect("large amount is valid");
        assert_eq!(interval.amount(), 500);
    }

    #[test]
    fn clamped_interval_respects_unit_bounds() {
        assert_eq!(ReminderInterval::clamped(IntervalUnit::Minute, 90).amount(), 59);
        assert_eq!(ReminderInterval::clamped(IntervalUnit::Hour, 0).amount(), 1);
        assert_eq!(ReminderInterval::clamped(IntervalUnit::Day, 31).amount(), 30);
    }

    #[test]
    fn parse_unit_accepts_plural_and_short_forms() {
        assert_eq!(parse_interval_unit("Minutes"), Ok(IntervalUnit::Minute));
        assert_eq!(parse_interval_unit("h"), Ok(IntervalUnit::Hour));
        assert!(matches!(
            parse_interval_unit("weeks"),
            Err(IntervalError::UnknownUnit(_))
        ));
    }

    #[test]
    fn new_reminder_is_active_and_due_one_interval_later() {
        let interval = ReminderInterval::minutes(1).unwrap();
        let reminder = RecurringReminder::new("  stretch  ", Some("   ".into()), interval, t0());
        assert!(reminder.is_active);
        assert_eq!(reminder.title, "stretch");
        assert_eq!(reminder.notes, None);
        assert_eq!(reminder.next_due_at, t0() + Duration::minutes(1));
        assert_eq!(reminder.sound_volume, DEFAULT_SOUND_VOLUME);
    }

    #[test]
    fn reactivation_recomputes_from_now() {
        let interval = ReminderInterval::hours(1).unwrap();
        let mut reminder = RecurringReminder::new("water", None, interval, t0());
        reminder.deactivate();
        let stale = reminder.next_due_at;

        let t1 = t0() + Duration::days(3);
        reminder.activate(t1);
        assert_eq!(reminder.next_due_at, t1 + Duration::hours(1));
        assert_ne!(reminder.next_due_at, stale);
    }

    #[test]
    fn activate_on_active_reminder_keeps_schedule() {
        let interval = ReminderInterval::hours(2).unwrap();
        let mut reminder = RecurringReminder::new("water", None, interval, t0());
        let due = reminder.next_due_at;
        reminder.activate(t0() + Duration::minutes(30));
        assert_eq!(reminder.next_due_at, due);
    }

    #[test]
    fn validate_rejects_blank_title_and_bad_volume() {
        let interval = ReminderInterval::minutes(5).unwrap();
        let mut reminder = RecurringReminder::new("ok", None, interval, t0());
        reminder.title = "  ".into();
        assert_eq!(reminder.validate(), Err(ReminderValidationError::EmptyTitle));

        reminder.title = "ok".into();
        reminder.sound_volume = 1.5;
        assert!(matches!(
            reminder.validate(),
            Err(ReminderValidationError::VolumeOutOfRange(_))
        ));
    }

    #[test]
    fn with_sound_clamps_volume() {
        let interval = ReminderInterval::minutes(5).unwrap();
        let reminder = RecurringReminder::new("ok", None, interval, t0()).with_sound(false, 3.0);
        assert!(!reminder.sound_enabled);
        assert_eq!(reminder.sound_volume, 1.0);
    }

    #[test]
    fn deserialize_rejects_zero_amount_interval() {
        let err = serde_json::from_str::<ReminderInterval>(r#"{"unit":"minute","amount":0}"#)
            .expect_err("zero amount must fail");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn serializes_camel_case_fields() {
        let interval = ReminderInterval::days(2).unwrap();
        let reminder = RecurringReminder::new("plants", None, interval, t0());
        let json = serde_json::to_value(&reminder).unwrap();
        assert!(json.get("nextDueAt").is_some());
        assert!(json.get("isActive").is_some());
        assert_eq!(json["interval"]["unit"], "day");
        assert!(json.get("lastFiredAt").is_none());
    }

    #[test]
    fn decodes_records_with_split_interval_fields() {
        let reminder: RecurringReminder = serde_json::from_str(
            r#"{
                "id": "9b2f7c1e-3d4a-4e5b-8c6d-7e8f9a0b1c2d",
                "title": "Drink water",
                "intervalType": "minutes",
                "intervalValue": 30,
                "isActive": true,
                "createdAt": "2026-03-02T09:00:00.000Z",
                "nextReminderAt": "2026-03-02T09:30:00.000Z",
                "lastReminderAt": "2026-03-02T09:00:00.000Z",
                "soundEnabled": false,
                "soundVolume": 0.4
            }"#,
        )
        .unwrap();
        assert_eq!(reminder.interval, ReminderInterval::minutes(30).unwrap());
        assert_eq!(reminder.next_due_at, t0() + Duration::minutes(30));
        assert_eq!(reminder.last_fired_at, Some(t0()));
        assert!(!reminder.sound_enabled);

        let json = serde_json::to_value(&reminder).unwrap();
        assert!(json.get("intervalType").is_none());
        assert_eq!(json["interval"]["amount"], 30);
    }

    #[test]
    fn decode_requires_some_interval() {
        let err = serde_json::from_str::<RecurringReminder>(
            r#"{
                "id": "9b2f7c1e-3d4a-4e5b-8c6d-7e8f9a0b1c2d",
                "title": "Drink water",
                "intervalType": "hours",
                "isActive": true,
                "createdAt": "2026-03-02T09:00:00Z",
                "nextReminderAt": "2026-03-02T10:00:00Z"
            }"#,
        )
        .expect_err("interval amount is missing");
        assert!(err.to_string().contains("no interval"));
    }
}
