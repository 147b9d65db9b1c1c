//! Domain model for daily tasks and recurring reminders.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one persisted snapshot shape (`DayData`) for store and transfer.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Deletion is explicit; nothing expires implicitly.

pub mod day;
pub mod reminder;
