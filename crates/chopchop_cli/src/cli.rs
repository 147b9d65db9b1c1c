//! Command-line schema for the chopchop binary.

use chopchop_core::{parse_interval_unit, IntervalUnit, ReminderInterval};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chopchop")]
#[command(about = "Daily priorities and recurring reminders")]
#[command(version)]
pub struct Cli {
    /// SQLite file holding the daily snapshot.
    #[arg(long, value_name = "PATH", default_value = "chopchop.db")]
    pub data: PathBuf,

    /// Directory for rolling log files. Logging is off when omitted.
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Seconds between polling ticks in `run`.
    #[arg(long, default_value_t = 5)]
    pub poll_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage recurring reminders
    Remind {
        #[command(subcommand)]
        action: RemindAction,
    },
    /// Manage today's priority list
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Write today's snapshot as JSON
    Export {
        /// Output file; defaults to `chop-chop-<date>.json`. Use `-` for stdout.
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
    /// Replace the stored snapshot with a JSON export
    Import { file: PathBuf },
    /// Poll reminders in the foreground until `quit` or end of input
    Run {
        /// Treat alert permission as denied; tones still play.
        #[arg(long)]
        no_alerts: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemindAction {
    Add {
        title: String,
        /// Cadence such as `45m`, `2h` or `1d`; a bare number means minutes.
        #[arg(long, value_parser = parse_every)]
        every: ReminderInterval,
        #[arg(long)]
        notes: Option<String>,
        /// Create without the audio cue.
        #[arg(long)]
        mute: bool,
        /// Tone volume in [0, 1].
        #[arg(long)]
        volume: Option<f32>,
    },
    List,
    Edit {
        /// Reminder id or unique id prefix.
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Empty string clears the notes.
        #[arg(long)]
        notes: Option<String>,
        #[arg(long, value_parser = parse_every)]
        every: Option<ReminderInterval>,
        #[arg(long)]
        sound: Option<bool>,
        #[arg(long)]
        volume: Option<f32>,
    },
    /// Pause an active reminder or resume a paused one
    Toggle { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskAction {
    Add { text: String },
    List,
    /// Toggle completion
    Done { id: String },
    Rename { id: String, text: String },
    Note { id: String, subnote: String },
    /// Move the task at position FROM to position TO (1-based)
    Move { from: usize, to: usize },
    Delete { id: String },
}

/// Parses cadences like `30`, `30m`, `2 hours` or `1d`.
pub fn parse_every(value: &str) -> Result<ReminderInterval, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u32 = digits
        .parse()
        .map_err(|_| format!("`{value}` must start with a whole number"))?;
    let unit = match unit.trim() {
        "" => IntervalUnit::Minute,
        other => parse_interval_unit(other).map_err(|err| err.to_string())?,
    };
    ReminderInterval::new(unit, amount).map_err(|err| err.to_string())
}
