//! Notification gateway boundary.
//!
//! # Responsibility
//! - Abstract the OS/desktop notification facility behind one trait.
//! - Model the asynchronous permission prompt as a polled one-shot result.
//!
//! # Invariants
//! - Core scheduling never depends on a concrete platform API.
//! - Gateway failures are values, never panics.

use crate::model::reminder::{RecurringReminder, ReminderId};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Body used when a reminder has no notes.
pub const DEFAULT_ALERT_BODY: &str = "Time for your reminder!";

/// Current notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Unprompted,
}

impl NotificationPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unprompted => "unprompted",
        }
    }
}

/// User-facing alert for one due reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub reminder_id: ReminderId,
    pub title: String,
    pub body: String,
    /// Alert stays visible until dismissed.
    pub persistent: bool,
}

impl Alert {
    pub fn for_reminder(reminder: &RecurringReminder) -> Self {
        Self {
            reminder_id: reminder.id,
            title: format!("⏰ {}", reminder.title),
            body: reminder
                .notes
                .clone()
                .unwrap_or_else(|| DEFAULT_ALERT_BODY.to_string()),
            persistent: true,
        }
    }
}

/// Opaque handle of a presented alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertHandle(pub u64);

/// Gateway-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Permission is not granted for visual alerts.
    PermissionDenied,
    /// The platform has no notification facility.
    Unsupported,
    /// Platform call failed.
    Platform(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission not granted"),
            Self::Unsupported => write!(f, "notifications are not supported on this platform"),
            Self::Platform(message) => write!(f, "notification platform error: {message}"),
        }
    }
}

impl Error for GatewayError {}

/// Outcome of polling a [`PermissionRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPoll {
    Pending,
    Resolved(bool),
    /// The responder was dropped without answering.
    Abandoned,
}

/// Pending answer to a permission prompt.
#[derive(Debug)]
pub struct PermissionRequest {
    rx: Receiver<bool>,
}

/// Sending half of a [`PermissionRequest`].
#[derive(Debug)]
pub struct PermissionResponder {
    tx: Sender<bool>,
}

impl PermissionRequest {
    /// Creates a request whose answer is delivered later through the responder.
    pub fn channel() -> (PermissionResponder, PermissionRequest) {
        let (tx, rx) = mpsc::channel();
        (PermissionResponder { tx }, PermissionRequest { rx })
    }

    /// Creates an already-answered request.
    pub fn resolved(granted: bool) -> Self {
        let (responder, request) = Self::channel();
        responder.respond(granted);
        request
    }

    /// Non-blocking check for the answer.
    pub fn poll(&self) -> PermissionPoll {
        match self.rx.try_recv() {
            Ok(granted) => PermissionPoll::Resolved(granted),
            Err(TryRecvError::Empty) => PermissionPoll::Pending,
            Err(TryRecvError::Disconnected) => PermissionPoll::Abandoned,
        }
    }
}

impl PermissionResponder {
    pub fn respond(self, granted: bool) {
        // Receiver may already be gone when the manager stopped waiting.
        let _ = self.tx.send(granted);
    }
}

/// Platform notification facility.
pub trait NotificationGateway {
    fn query_permission(&self) -> NotificationPermission;

    /// Starts a permission prompt without blocking.
    fn request_permission(&self) -> PermissionRequest;

    fn present(&self, alert: &Alert) -> Result<AlertHandle, GatewayError>;

    /// Plays the audio cue at `volume` in `[0, 1]`.
    fn play_tone(&self, volume: f32) -> Result<(), GatewayError>;
}
