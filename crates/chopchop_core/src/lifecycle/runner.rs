//! Background thread pumping a shared [`LifecycleManager`] in real time.

use super::manager::{LifecycleManager, TickReport};
use crate::clock::Clock;
use crate::notify::NotificationGateway;
use crate::store::ReminderStore;
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on one sleep, so stop requests and permission answers are
/// noticed promptly even with long poll intervals.
const MAX_SLEEP: Duration = Duration::from_millis(250);

pub type SharedManager<S, G, C> = Arc<Mutex<LifecycleManager<S, G, C>>>;

/// Handle of a running pump thread. Dropping it stops the thread.
pub struct RunnerHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl RunnerHandle {
    /// Signals the thread to exit and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("event=runner_stop module=runner status=error error_code=thread_panicked");
            }
        }
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Locks the shared manager, recovering from a panic in an earlier holder.
pub fn lock_manager<S, G, C>(
    manager: &SharedManager<S, G, C>,
) -> MutexGuard<'_, LifecycleManager<S, G, C>> {
    manager
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spawns a thread that syncs the manager once, then pumps it until stopped.
///
/// `on_report` sees every tick report. A panic inside one pump is logged and
/// the loop continues.
pub fn spawn_runner<S, G, C, F>(manager: SharedManager<S, G, C>, mut on_report: F) -> RunnerHandle
where
    S: ReminderStore + Send + 'static,
    G: NotificationGateway + Send + 'static,
    C: Clock + 'static,
    F: FnMut(&TickReport) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let join = thread::spawn(move || {
        info!("event=runner_start module=runner status=ok");
        {
            let mut guard = lock_manager(&manager);
            if let Some(report) = guard.sync() {
                on_report(&report);
            }
        }

        while !thread_stop.load(Ordering::SeqCst) {
            let sleep_for = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut guard = lock_manager(&manager);
                for report in guard.pump() {
                    on_report(&report);
                }
                sleep_budget(&guard)
            }))
            .unwrap_or_else(|_| {
                error!("event=runner_pump module=runner status=error error_code=pump_panicked");
                MAX_SLEEP
            });

            thread::sleep(sleep_for);
        }
        info!("event=runner_stop module=runner status=ok");
    });

    RunnerHandle {
        stop,
        join: Some(join),
    }
}

fn sleep_budget<S, G, C>(manager: &LifecycleManager<S, G, C>) -> Duration
where
    S: ReminderStore,
    G: NotificationGateway,
    C: Clock,
{
    manager
        .next_tick_at()
        .map(|next| {
            (next - manager.clock().now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
        .map_or(MAX_SLEEP, |until| until.min(MAX_SLEEP))
}
