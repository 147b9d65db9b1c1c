//! Terminal-backed notification gateway.

use chopchop_core::{
    Alert, AlertHandle, GatewayError, NotificationGateway, NotificationPermission,
    PermissionRequest,
};
use chrono::Local;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prints alerts to stdout and rings the terminal bell for tones.
pub struct ConsoleGateway {
    permission: NotificationPermission,
    next_handle: AtomicU64,
}

impl ConsoleGateway {
    pub fn new(alerts_enabled: bool) -> Self {
        let permission = if alerts_enabled {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        Self {
            permission,
            next_handle: AtomicU64::new(1),
        }
    }
}

impl NotificationGateway for ConsoleGateway {
    fn query_permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&self) -> PermissionRequest {
        PermissionRequest::resolved(self.permission == NotificationPermission::Granted)
    }

    fn present(&self, alert: &Alert) -> Result<AlertHandle, GatewayError> {
        if self.permission != NotificationPermission::Granted {
            return Err(GatewayError::PermissionDenied);
        }
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "[{}] {}\n    {}",
            Local::now().format("%H:%M"),
            alert.title,
            alert.body
        )
        .and_then(|_| stdout.flush())
        .map_err(|err| GatewayError::Platform(err.to_string()))?;
        Ok(AlertHandle(self.next_handle.fetch_add(1, Ordering::SeqCst)))
    }

    fn play_tone(&self, volume: f32) -> Result<(), GatewayError> {
        if volume <= 0.0 {
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|err| GatewayError::Platform(err.to_string()))
    }
}
