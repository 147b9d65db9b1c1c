//! Polling state machine driving detection and firing.
//!
//! # Responsibility
//! - Own the repeating tick (`Stopped` / `Running`) and its restarts.
//! - Run an immediate catch-up pass whenever polling (re)starts.
//! - Suspend while hidden; resume with one catch-up pass when visible.
//! - Track the asynchronous permission prompt.
//! - Keep fired-but-unpersisted schedules so they are not fired again.
//!
//! # Invariants
//! - At most one tick runs per `pump`, however late the pump is.
//! - No tick is scheduled after `stop`.
//! - Within a tick each reminder id fires at most once, in snapshot order.
//! - A failing reminder never stops the loop.

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::model::reminder::{RecurringReminder, ReminderId};
use crate::notify::{NotificationGateway, NotificationPermission, PermissionPoll, PermissionRequest};
use crate::schedule::detector::find_overdue;
use crate::service::reminder_service::ReminderService;
use crate::service::trigger::{FireOutcome, TriggerController};
use crate::store::{patch_reminder, read_reminders, ReminderStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Foreground state of the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Polling timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    /// `generation` identifies the current timer; every restart bumps it.
    Running {
        generation: u64,
        next_tick_at: DateTime<Utc>,
    },
}

/// Why polling (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartReason {
    ReminderSetChanged,
    PermissionChanged,
    BecameVisible,
}

impl StartReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::ReminderSetChanged => "reminder_set_changed",
            Self::PermissionChanged => "permission_changed",
            Self::BecameVisible => "became_visible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Catch-up pass run on entering `Running`.
    Immediate(StartReason),
    Periodic,
}

/// Summary of one detect-and-fire pass.
#[derive(Debug)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub generation: u64,
    pub kind: TickKind,
    pub fired: Vec<FireOutcome>,
    /// Snapshot read and pending-write flush failures.
    pub storage_errors: Vec<StoreError>,
}

impl TickReport {
    fn new(at: DateTime<Utc>, generation: u64, kind: TickKind) -> Self {
        Self {
            at,
            generation,
            kind,
            fired: Vec::new(),
            storage_errors: Vec::new(),
        }
    }

    pub fn fired_ids(&self) -> Vec<ReminderId> {
        self.fired.iter().map(|outcome| outcome.reminder.id).collect()
    }

    /// Number of fired reminders whose schedule could not be persisted.
    pub fn failed_writes(&self) -> usize {
        self.fired
            .iter()
            .filter(|outcome| outcome.persisted.is_err())
            .count()
    }

    pub fn has_storage_errors(&self) -> bool {
        !self.storage_errors.is_empty() || self.failed_writes() > 0
    }
}

/// Owns the polling timer and every scheduling write.
pub struct LifecycleManager<S, G, C> {
    store: S,
    gateway: G,
    clock: C,
    config: EngineConfig,
    state: LifecycleState,
    visibility: Visibility,
    permission: NotificationPermission,
    permission_request: Option<PermissionRequest>,
    observed_active: BTreeSet<ReminderId>,
    pending_writes: HashMap<ReminderId, RecurringReminder>,
    next_generation: u64,
    /// Set by [`Self::stop`]; keeps `pump` from restarting on its own.
    halted: bool,
}

impl<S, G, C> LifecycleManager<S, G, C>
where
    S: ReminderStore,
    G: NotificationGateway,
    C: Clock,
{
    /// Creates a stopped, visible manager. Call [`Self::sync`] to start.
    pub fn new(store: S, gateway: G, clock: C, config: EngineConfig) -> Self {
        let permission = gateway.query_permission();
        Self {
            store,
            gateway,
            clock,
            config,
            state: LifecycleState::Stopped,
            visibility: Visibility::Visible,
            permission,
            permission_request: None,
            observed_active: BTreeSet::new(),
            pending_writes: HashMap::new(),
            next_generation: 1,
            halted: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LifecycleState::Running { .. })
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn permission(&self) -> NotificationPermission {
        self.permission
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Fired reminders whose schedule is only held in memory.
    pub fn pending_write_count(&self) -> usize {
        self.pending_writes.len()
    }

    /// When the next periodic tick is due, if running.
    pub fn next_tick_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            LifecycleState::Running { next_tick_at, .. } => Some(next_tick_at),
            LifecycleState::Stopped => None,
        }
    }

    /// Reconciles the timer with the stored active set.
    ///
    /// Starts when reminders are active and visible, stops when none are,
    /// restarts when the active set differs from the last observed one, and
    /// otherwise leaves a running timer alone.
    pub fn sync(&mut self) -> Option<TickReport> {
        self.halted = false;
        let active = self.load_active_ids()?;
        let changed = active != self.observed_active;
        self.observed_active = active;

        if !self.should_run() {
            self.stop_with("no_active_reminders_or_hidden");
            return None;
        }
        if self.is_running() && !changed {
            return None;
        }
        Some(self.enter_running(StartReason::ReminderSetChanged))
    }

    /// Tears down and restarts the timer after an edit of the reminder set.
    pub fn on_reminders_changed(&mut self) -> Option<TickReport> {
        self.halted = false;
        self.observed_active = self.load_active_ids()?;
        if !self.should_run() {
            self.stop_with("no_active_reminders_or_hidden");
            return None;
        }
        Some(self.enter_running(StartReason::ReminderSetChanged))
    }

    /// Records a permission change and restarts a running timer.
    ///
    /// A stopped timer stays stopped; the new permission applies from its
    /// next start.
    pub fn on_permission_changed(
        &mut self,
        permission: NotificationPermission,
    ) -> Option<TickReport> {
        if permission == self.permission {
            return None;
        }
        info!(
            "event=permission_change module=lifecycle status=ok from={} to={}",
            self.permission.as_str(),
            permission.as_str()
        );
        self.permission = permission;
        if !self.is_running() || !self.should_run() {
            return None;
        }
        Some(self.enter_running(StartReason::PermissionChanged))
    }

    /// Suspends polling when hidden; resumes with a catch-up pass when visible.
    pub fn on_visibility_changed(&mut self, visibility: Visibility) -> Option<TickReport> {
        if visibility == self.visibility {
            return None;
        }
        self.visibility = visibility;
        match visibility {
            Visibility::Hidden => {
                self.stop_with("hidden");
                None
            }
            Visibility::Visible => {
                self.halted = false;
                self.observed_active = self.load_active_ids()?;
                if !self.should_run() {
                    return None;
                }
                Some(self.enter_running(StartReason::BecameVisible))
            }
        }
    }

    /// Advances the state machine to the clock's current instant.
    ///
    /// Resolves a pending permission prompt, reconciles the stored active
    /// set and runs the periodic tick if it is due. A visible, stopped
    /// manager starts as soon as an active reminder appears in the store,
    /// unless it was halted with [`Self::stop`]. A pump that arrives several
    /// periods late still runs only one tick.
    pub fn pump(&mut self) -> Vec<TickReport> {
        let mut reports = Vec::new();

        let permission = self
            .poll_permission_request()
            .unwrap_or_else(|| self.gateway.query_permission());
        if let Some(report) = self.on_permission_changed(permission) {
            reports.push(report);
        }

        let may_start = self.visibility == Visibility::Visible && !self.halted;
        if self.is_running() || may_start {
            if let Some(report) = self.sync() {
                reports.push(report);
            }
        }

        if let LifecycleState::Running {
            generation,
            next_tick_at,
        } = self.state
        {
            let now = self.clock.now();
            if now >= next_tick_at {
                let report = self.run_tick(generation, TickKind::Periodic);
                self.schedule_next_tick(generation);
                reports.push(report);
            }
        }

        reports
    }

    /// Stops polling. Safe at any time; only an explicit `sync`, reminder
    /// edit or visibility change starts it again.
    pub fn stop(&mut self) {
        self.halted = true;
        self.stop_with("requested");
    }

    /// Runs a user edit through the reminder service, then restarts polling
    /// so the edit is picked up with a fresh catch-up pass.
    ///
    /// Pending in-memory schedules are flushed first so the edit sees them.
    /// Flush failures are prepended to the restart report's
    /// `storage_errors`, or logged when polling does not restart.
    pub fn edit_reminders<T, F>(&mut self, edit: F) -> StoreResult<(T, Option<TickReport>)>
    where
        F: FnOnce(&ReminderService<&S, &C>) -> StoreResult<T>,
    {
        let mut flush_errors = Vec::new();
        self.flush_pending_writes(&mut flush_errors);

        let value = {
            let service = ReminderService::with_default_volume(
                &self.store,
                &self.clock,
                self.config.default_sound_volume,
            );
            edit(&service)?
        };

        let mut report = self.on_reminders_changed();
        if !flush_errors.is_empty() {
            match report.as_mut() {
                Some(report) => {
                    flush_errors.append(&mut report.storage_errors);
                    report.storage_errors = flush_errors;
                }
                None => warn!(
                    "event=reminder_edit module=lifecycle status=error error_code=pending_flush_failed error_count={}",
                    flush_errors.len()
                ),
            }
        }
        Ok((value, report))
    }

    fn should_run(&self) -> bool {
        self.visibility == Visibility::Visible && !self.observed_active.is_empty()
    }

    fn enter_running(&mut self, reason: StartReason) -> TickReport {
        let generation = self.next_generation;
        self.next_generation += 1;
        let restarted = self.is_running();

        self.ensure_permission_requested();
        info!(
            "event=timer_start module=lifecycle status=ok reason={} generation={} restart={} active_count={}",
            reason.as_str(),
            generation,
            restarted,
            self.observed_active.len()
        );

        let report = self.run_tick(generation, TickKind::Immediate(reason));
        self.schedule_next_tick(generation);
        report
    }

    fn schedule_next_tick(&mut self, generation: u64) {
        let next_tick_at = self.clock.now() + self.config.poll_delta();
        self.state = LifecycleState::Running {
            generation,
            next_tick_at,
        };
    }

    fn stop_with(&mut self, reason: &'static str) {
        if let LifecycleState::Running { generation, .. } = self.state {
            info!(
                "event=timer_stop module=lifecycle status=ok reason={reason} generation={generation}"
            );
        }
        self.state = LifecycleState::Stopped;
    }

    fn ensure_permission_requested(&mut self) {
        if self.permission != NotificationPermission::Unprompted
            || self.permission_request.is_some()
        {
            return;
        }
        info!("event=permission_request module=lifecycle status=start");
        self.permission_request = Some(self.gateway.request_permission());
    }

    fn poll_permission_request(&mut self) -> Option<NotificationPermission> {
        let poll = self.permission_request.as_ref()?.poll();
        match poll {
            PermissionPoll::Pending => None,
            PermissionPoll::Resolved(granted) => {
                self.permission_request = None;
                info!("event=permission_request module=lifecycle status=ok granted={granted}");
                Some(if granted {
                    NotificationPermission::Granted
                } else {
                    NotificationPermission::Denied
                })
            }
            PermissionPoll::Abandoned => {
                self.permission_request = None;
                warn!(
                    "event=permission_request module=lifecycle status=error error_code=abandoned"
                );
                None
            }
        }
    }

    fn load_active_ids(&mut self) -> Option<BTreeSet<ReminderId>> {
        match self.snapshot() {
            Ok(reminders) => Some(
                reminders
                    .iter()
                    .filter(|reminder| reminder.is_active)
                    .map(|reminder| reminder.id)
                    .collect(),
            ),
            Err(err) => {
                error!(
                    "event=active_set_load module=lifecycle status=error error_code=store_read_failed error={err}"
                );
                None
            }
        }
    }

    /// Stored reminders with in-memory schedules applied on top.
    fn snapshot(&self) -> StoreResult<Vec<RecurringReminder>> {
        let mut reminders = read_reminders(&self.store)?;
        for reminder in &mut reminders {
            if let Some(pending) = self.pending_writes.get(&reminder.id) {
                merge_schedule(reminder, pending);
            }
        }
        Ok(reminders)
    }

    fn run_tick(&mut self, generation: u64, kind: TickKind) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::new(now, generation, kind);

        self.flush_pending_writes(&mut report.storage_errors);

        let reminders = match self.snapshot() {
            Ok(reminders) => reminders,
            Err(err) => {
                error!(
                    "event=tick module=lifecycle status=error generation={generation} error_code=store_read_failed error={err}"
                );
                report.storage_errors.push(err);
                return report;
            }
        };

        let controller = TriggerController::new(
            &self.store,
            &self.gateway,
            self.config.effective_retry_attempts(),
        );
        let mut fired_ids = HashSet::new();
        for reminder in find_overdue(&reminders, now) {
            if !fired_ids.insert(reminder.id) {
                continue;
            }
            let outcome = controller.fire(reminder, now);
            if let Err(err) = &outcome.persisted {
                if !matches!(err, StoreError::NotFound(_)) {
                    self.pending_writes
                        .insert(outcome.reminder.id, outcome.reminder.clone());
                }
            }
            report.fired.push(outcome);
        }

        debug!(
            "event=tick module=lifecycle status=ok generation={generation} kind={} due_count={} pending_writes={}",
            match kind {
                TickKind::Immediate(_) => "immediate",
                TickKind::Periodic => "periodic",
            },
            report.fired.len(),
            self.pending_writes.len()
        );
        report
    }

    /// Writes held schedules back to the store.
    ///
    /// A stored record that was paused, deleted or already rescheduled
    /// later wins over the held schedule.
    fn flush_pending_writes(&mut self, errors: &mut Vec<StoreError>) {
        if self.pending_writes.is_empty() {
            return;
        }
        let ids: Vec<ReminderId> = self.pending_writes.keys().copied().collect();
        for id in ids {
            let Some(pending) = self.pending_writes.get(&id).cloned() else {
                continue;
            };
            match patch_reminder(&self.store, id, |stored| merge_schedule(stored, &pending)) {
                Ok(_) | Err(StoreError::NotFound(_)) => {
                    self.pending_writes.remove(&id);
                    info!(
                        "event=pending_flush module=lifecycle status=ok reminder_id={id}"
                    );
                }
                Err(err) => {
                    warn!(
                        "event=pending_flush module=lifecycle status=error reminder_id={id} error={err}"
                    );
                    errors.push(err);
                }
            }
        }
    }
}

/// Applies a held schedule onto `stored` unless `stored` is paused or
/// already due later.
fn merge_schedule(stored: &mut RecurringReminder, pending: &RecurringReminder) {
    if stored.is_active && stored.next_due_at < pending.next_due_at {
        stored.next_due_at = pending.next_due_at;
        stored.last_fired_at = pending.last_fired_at;
    }
}

#[cfg(test)]
mod tests {
    use super::merge_schedule;
    use crate::model::reminder::{RecurringReminder, ReminderInterval};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn merge_keeps_paused_and_later_stored_schedules() {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let base = RecurringReminder::new("m", None, ReminderInterval::minutes(1).unwrap(), t0);
        let mut pending = base.clone();
        pending.mark_fired(t0 + Duration::minutes(3));

        let mut stored = base.clone();
        merge_schedule(&mut stored, &pending);
        assert_eq!(stored.next_due_at, pending.next_due_at);

        let mut paused = base.clone();
        paused.deactivate();
        merge_schedule(&mut paused, &pending);
        assert_eq!(paused.next_due_at, base.next_due_at);

        let mut later = base.clone();
        later.next_due_at = t0 + Duration::hours(1);
        merge_schedule(&mut later, &pending);
        assert_eq!(later.next_due_at, t0 + Duration::hours(1));
    }
}
