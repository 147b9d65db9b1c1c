//! Reminder scheduling: due-time arithmetic and overdue detection.
//!
//! # Responsibility
//! - Compute the next due instant of a reminder cadence.
//! - Select reminders whose due instant has been reached.
//!
//! # Invariants
//! - Everything here is pure; "now" is always an argument.

pub mod detector;
pub mod scheduler;
