//! Polling lifecycle: the tick state machine and its real-time driver.
//!
//! # Responsibility
//! - Decide when detection runs (`manager`).
//! - Drive the manager against wall-clock time on a background thread
//!   (`runner`).
//!
//! # Invariants
//! - The manager is the only writer of fired schedules.
//! - User edits and ticks never interleave; both go through one owner.

pub mod manager;
pub mod runner;
