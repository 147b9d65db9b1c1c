//! Engine tuning knobs.

use crate::model::reminder::DEFAULT_SOUND_VOLUME;
use std::time::Duration;

/// Default period between polling ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of attempts for one scheduling write.
pub const DEFAULT_STORAGE_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Tick period. Must stay short relative to one minute, the smallest
    /// interval unit.
    pub poll_interval: Duration,
    /// Attempts per write of a fired reminder; values below 1 act as 1.
    pub storage_retry_attempts: u32,
    /// Volume for reminders created without an explicit volume.
    pub default_sound_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            storage_retry_attempts: DEFAULT_STORAGE_RETRY_ATTEMPTS,
            default_sound_volume: DEFAULT_SOUND_VOLUME,
        }
    }
}

impl EngineConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll interval as a chrono delta, floored at one millisecond.
    pub(crate) fn poll_delta(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::from_std(self.poll_interval)
            .ok()
            .filter(|delta| *delta > chrono::TimeDelta::zero())
            .unwrap_or_else(|| chrono::TimeDelta::milliseconds(1))
    }

    pub(crate) fn effective_retry_attempts(&self) -> u32 {
        self.storage_retry_attempts.max(1)
    }
}
