//! Core domain logic for chopchop: daily priorities and recurring reminders.
//! This crate is the single source of truth for scheduling invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod notify;
pub mod schedule;
pub mod service;
pub mod store;
pub mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use lifecycle::manager::{
    LifecycleManager, LifecycleState, StartReason, TickKind, TickReport, Visibility,
};
pub use lifecycle::runner::{lock_manager, spawn_runner, RunnerHandle, SharedManager};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::day::{DayData, Task, TaskId, TaskValidationError};
pub use model::reminder::{
    parse_interval_unit, IntervalError, IntervalUnit, RecurringReminder, ReminderId,
    ReminderInterval, ReminderValidationError,
};
pub use notify::{
    Alert, AlertHandle, GatewayError, NotificationGateway, NotificationPermission,
    PermissionPoll, PermissionRequest, PermissionResponder,
};
pub use schedule::detector::find_overdue;
pub use schedule::scheduler::{compute_next_due, compute_next_due_in, is_overdue};
pub use service::priority_service::{PriorityService, PriorityServiceError};
pub use service::reminder_service::{NewReminder, ReminderEdit, ReminderService};
pub use service::transfer::{export_file_name, export_json, import_into, import_json, ImportError};
pub use service::trigger::{AlertOutcome, FireOutcome, ToneOutcome, TriggerController};
pub use store::{MemoryStore, ReminderStore, SqliteStore, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
