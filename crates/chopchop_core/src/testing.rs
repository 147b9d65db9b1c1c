//! Deterministic collaborators for tests and demos.
//!
//! `RecordingGateway` records every alert and tone instead of touching a
//! platform API. Clones share state, so a test can keep one handle while the
//! lifecycle manager owns another.

pub use crate::clock::ManualClock;

use crate::notify::{
    Alert, AlertHandle, GatewayError, NotificationGateway, NotificationPermission,
    PermissionRequest, PermissionResponder,
};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct GatewayState {
    permission: NotificationPermission,
    alerts: Vec<Alert>,
    tones: Vec<f32>,
    present_failure: Option<GatewayError>,
    tone_failure: Option<GatewayError>,
    auto_answer: Option<bool>,
    pending: Option<PermissionResponder>,
    permission_requests: usize,
    next_handle: u64,
}

#[derive(Debug, Clone)]
pub struct RecordingGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl RecordingGateway {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            state: Arc::new(Mutex::new(GatewayState {
                permission,
                alerts: Vec::new(),
                tones: Vec::new(),
                present_failure: None,
                tone_failure: None,
                auto_answer: None,
                pending: None,
                permission_requests: 0,
                next_handle: 1,
            })),
        }
    }

    pub fn set_permission(&self, permission: NotificationPermission) {
        self.lock().permission = permission;
    }

    /// Every later `present` fails with `err`.
    pub fn fail_presents(&self, err: GatewayError) {
        self.lock().present_failure = Some(err);
    }

    /// Every later `play_tone` fails with `err`.
    pub fn fail_tones(&self, err: GatewayError) {
        self.lock().tone_failure = Some(err);
    }

    /// Permission prompts resolve immediately with `granted`.
    pub fn answer_requests_with(&self, granted: bool) {
        self.lock().auto_answer = Some(granted);
    }

    /// Answers the outstanding prompt, if any. Returns whether one existed.
    pub fn respond_pending(&self, granted: bool) -> bool {
        let responder = {
            let mut state = self.lock();
            let responder = state.pending.take();
            if responder.is_some() {
                state.permission = permission_for(granted);
            }
            responder
        };
        match responder {
            Some(responder) => {
                responder.respond(granted);
                true
            }
            None => false,
        }
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    pub fn tones(&self) -> Vec<f32> {
        self.lock().tones.clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.lock().permission_requests
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationGateway for RecordingGateway {
    fn query_permission(&self) -> NotificationPermission {
        self.lock().permission
    }

    fn request_permission(&self) -> PermissionRequest {
        let mut state = self.lock();
        state.permission_requests += 1;
        if let Some(granted) = state.auto_answer {
            state.permission = permission_for(granted);
            return PermissionRequest::resolved(granted);
        }
        let (responder, request) = PermissionRequest::channel();
        state.pending = Some(responder);
        request
    }

    fn present(&self, alert: &Alert) -> Result<AlertHandle, GatewayError> {
        let mut state = self.lock();
        if let Some(err) = state.present_failure.clone() {
            return Err(err);
        }
        if state.permission != NotificationPermission::Granted {
            return Err(GatewayError::PermissionDenied);
        }
        state.alerts.push(alert.clone());
        let handle = AlertHandle(state.next_handle);
        state.next_handle += 1;
        Ok(handle)
    }

    fn play_tone(&self, volume: f32) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if let Some(err) = state.tone_failure.clone() {
            return Err(err);
        }
        state.tones.push(volume);
        Ok(())
    }
}

fn permission_for(granted: bool) -> NotificationPermission {
    if granted {
        NotificationPermission::Granted
    } else {
        NotificationPermission::Denied
    }
}
