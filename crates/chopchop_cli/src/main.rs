//! chopchop command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto the core services over a SQLite snapshot store.
//! - Host the foreground polling loop for `run`.

mod cli;
mod console;

use chopchop_core::store::read_reminders;
use chopchop_core::{
    default_log_level, export_file_name, export_json, import_into, init_logging, lock_manager,
    spawn_runner, Clock, DayData, EngineConfig, LifecycleManager, NewReminder, PriorityService,
    RecurringReminder, ReminderEdit, ReminderId, ReminderService, ReminderStore, SharedManager,
    SqliteStore, SystemClock, Task, TaskId, TickReport, Visibility,
};
use chrono::Local;
use clap::Parser;
use cli::{Cli, Command, RemindAction, TaskAction};
use console::ConsoleGateway;
use log::info;
use std::error::Error;
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Some(log_dir) = &cli.log_dir {
        let log_dir = std::path::absolute(log_dir)?;
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, &log_dir.to_string_lossy())?;
    }

    let store = SqliteStore::open(&cli.data)?;
    match cli.command {
        Command::Remind { action } => remind(&store, action),
        Command::Task { action } => task(&store, action),
        Command::Export { out } => export(&store, out.as_deref()),
        Command::Import { file } => {
            let payload = std::fs::read_to_string(&file)?;
            let data = import_into(&store, &payload)?;
            println!(
                "imported {} ({} tasks, {} reminders)",
                data.date,
                data.tasks.len(),
                data.reminders.len()
            );
            Ok(())
        }
        Command::Run { no_alerts } => {
            let config =
                EngineConfig::default().with_poll_interval(Duration::from_secs(cli.poll_secs));
            run_loop(store, config, !no_alerts)
        }
    }
}

fn remind(store: &SqliteStore, action: RemindAction) -> CliResult<()> {
    let service = ReminderService::new(store, SystemClock);
    match action {
        RemindAction::Add {
            title,
            every,
            notes,
            mute,
            volume,
        } => {
            let reminder = service.add(NewReminder {
                title,
                notes,
                interval: every,
                sound_enabled: !mute,
                sound_volume: volume,
            })?;
            print_reminder(&reminder);
        }
        RemindAction::List => {
            let reminders = service.list()?;
            if reminders.is_empty() {
                println!("no reminders");
            }
            reminders.iter().for_each(print_reminder);
        }
        RemindAction::Edit {
            id,
            title,
            notes,
            every,
            sound,
            volume,
        } => {
            let id = resolve_reminder(&service.list()?, &id)?;
            let reminder = service.edit(
                id,
                ReminderEdit {
                    title,
                    notes: notes.map(Some),
                    interval: every,
                    sound_enabled: sound,
                    sound_volume: volume,
                    active: None,
                },
            )?;
            print_reminder(&reminder);
        }
        RemindAction::Toggle { id } => {
            let id = resolve_reminder(&service.list()?, &id)?;
            print_reminder(&service.toggle_active(id)?);
        }
        RemindAction::Delete { id } => {
            let id = resolve_reminder(&service.list()?, &id)?;
            service.delete(id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn task(store: &SqliteStore, action: TaskAction) -> CliResult<()> {
    let service = PriorityService::new(store, SystemClock);
    match action {
        TaskAction::Add { text } => print_task(&service.add(text)?),
        TaskAction::List => {
            let tasks = service.list()?;
            if tasks.is_empty() {
                println!("no tasks for today");
            }
            tasks.iter().for_each(print_task);
        }
        TaskAction::Done { id } => {
            let id = resolve_task(&service.list()?, &id)?;
            print_task(&service.toggle_complete(id)?);
        }
        TaskAction::Rename { id, text } => {
            let id = resolve_task(&service.list()?, &id)?;
            print_task(&service.update_text(id, text)?);
        }
        TaskAction::Note { id, subnote } => {
            let id = resolve_task(&service.list()?, &id)?;
            print_task(&service.set_subnote(id, subnote)?);
        }
        TaskAction::Move { from, to } => {
            let tasks = service.reorder(from.saturating_sub(1), to.saturating_sub(1))?;
            tasks.iter().for_each(print_task);
        }
        TaskAction::Delete { id } => {
            let id = resolve_task(&service.list()?, &id)?;
            service.delete(id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn export(store: &SqliteStore, out: Option<&Path>) -> CliResult<()> {
    let data = store_day(store)?;
    let json = export_json(&data)?;
    match out {
        Some(path) if path == Path::new("-") => println!("{json}"),
        Some(path) => {
            std::fs::write(path, json)?;
            println!("exported to {}", path.display());
        }
        None => {
            let path = export_file_name(data.date);
            std::fs::write(&path, json)?;
            println!("exported to {path}");
        }
    }
    Ok(())
}

fn store_day(store: &SqliteStore) -> CliResult<DayData> {
    Ok(store.load_day(SystemClock.today())?)
}

fn run_loop(store: SqliteStore, config: EngineConfig, alerts_enabled: bool) -> CliResult<()> {
    let manager: SharedManager<_, _, _> = Arc::new(Mutex::new(LifecycleManager::new(
        store,
        ConsoleGateway::new(alerts_enabled),
        SystemClock,
        config,
    )));
    let handle = spawn_runner(Arc::clone(&manager), report_problems);
    info!("event=cli_run module=cli status=start");
    println!("polling; commands: list, hide, show, pause <id>, resume <id>, status, quit");

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let mut guard = lock_manager(&manager);
        match (command, words.next()) {
            ("quit" | "exit", _) => break,
            ("hide", _) => {
                guard.on_visibility_changed(Visibility::Hidden);
                println!("hidden; polling suspended");
            }
            ("show", _) => {
                if let Some(report) = guard.on_visibility_changed(Visibility::Visible) {
                    report_problems(&report);
                }
                println!("visible; polling {}", running_label(guard.is_running()));
            }
            ("status", _) => println!(
                "polling {} permission={}",
                running_label(guard.is_running()),
                guard.permission().as_str()
            ),
            ("list", _) => match read_reminders(guard.store()) {
                Ok(reminders) => reminders.iter().for_each(print_reminder),
                Err(err) => eprintln!("error: {err}"),
            },
            (verb @ ("pause" | "resume"), Some(prefix)) => {
                let active = verb == "resume";
                let result = read_reminders(guard.store())
                    .map_err(Box::<dyn Error>::from)
                    .and_then(|reminders| resolve_reminder(&reminders, prefix))
                    .and_then(|id| {
                        guard
                            .edit_reminders(|service| service.set_active(id, active))
                            .map_err(Box::<dyn Error>::from)
                    });
                match result {
                    Ok((reminder, report)) => {
                        print_reminder(&reminder);
                        if let Some(report) = report {
                            report_problems(&report);
                        }
                    }
                    Err(err) => eprintln!("error: {err}"),
                }
            }
            _ => eprintln!("unknown command `{line}`"),
        }
    }

    handle.stop();
    info!("event=cli_run module=cli status=ok");
    Ok(())
}

fn report_problems(report: &TickReport) {
    for err in &report.storage_errors {
        eprintln!("storage error: {err}");
    }
    for outcome in report.fired.iter().filter(|o| o.persisted.is_err()) {
        eprintln!(
            "could not save schedule of {}; it will not fire again until saved",
            outcome.reminder.id
        );
    }
}

fn running_label(running: bool) -> &'static str {
    if running {
        "running"
    } else {
        "stopped"
    }
}

fn resolve_reminder(reminders: &[RecurringReminder], prefix: &str) -> CliResult<ReminderId> {
    let ids: Vec<ReminderId> = reminders.iter().map(|r| r.id).collect();
    resolve_prefix(&ids, prefix, "reminder")
}

fn resolve_task(tasks: &[Task], prefix: &str) -> CliResult<TaskId> {
    let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
    resolve_prefix(&ids, prefix, "task")
}

fn resolve_prefix(ids: &[uuid::Uuid], prefix: &str, kind: &str) -> CliResult<uuid::Uuid> {
    let prefix = prefix.trim().to_ascii_lowercase();
    let matches: Vec<_> = ids
        .iter()
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(**id),
        [] => Err(format!("no {kind} matches `{prefix}`").into()),
        _ => Err(format!("`{prefix}` matches several {kind}s; use a longer prefix").into()),
    }
}

fn print_reminder(reminder: &RecurringReminder) {
    let status = if reminder.is_active {
        format!(
            "next {}",
            reminder.next_due_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )
    } else {
        "paused".to_string()
    };
    let sound = if reminder.sound_enabled {
        format!("sound {:.0}%", reminder.sound_volume * 100.0)
    } else {
        "muted".to_string()
    };
    println!(
        "{}  {}  {}  {}  {}",
        short_id(&reminder.id),
        reminder.title,
        reminder.interval,
        status,
        sound
    );
}

fn print_task(task: &Task) {
    let mark = if task.completed { "x" } else { " " };
    println!(
        "{}. [{}] {}  {}",
        task.order + 1,
        mark,
        task.text,
        short_id(&task.id)
    );
    if !task.subnote.is_empty() {
        println!("       {}", task.subnote);
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
