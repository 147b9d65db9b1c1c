use chopchop_core::testing::{ManualClock, RecordingGateway};
use chopchop_core::{
    lock_manager, spawn_runner, DayData, EngineConfig, LifecycleManager, MemoryStore,
    NotificationPermission, RecurringReminder, ReminderInterval, StartReason, TickKind,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

#[test]
fn runner_starts_polling_and_fires_overdue_reminder() {
    let now = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
    let reminder = RecurringReminder::new(
        "lunch",
        None,
        ReminderInterval::minutes(10).unwrap(),
        now - Duration::minutes(25),
    );
    let mut data = DayData::empty(now.date_naive());
    data.reminders.push(reminder.clone());

    let gateway = RecordingGateway::new(NotificationPermission::Granted);
    let manager = Arc::new(Mutex::new(LifecycleManager::new(
        MemoryStore::with_data(&data).unwrap(),
        gateway.clone(),
        ManualClock::new(now),
        EngineConfig::default(),
    )));

    let (tx, rx) = mpsc::channel();
    let handle = spawn_runner(Arc::clone(&manager), move |report| {
        let _ = tx.send((report.kind, report.fired_ids()));
    });

    let (kind, fired) = rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .unwrap();
    assert_eq!(kind, TickKind::Immediate(StartReason::ReminderSetChanged));
    assert_eq!(fired, vec![reminder.id]);

    handle.stop();
    assert!(lock_manager(&manager).is_running());
    assert_eq!(gateway.alerts().len(), 1);
}
