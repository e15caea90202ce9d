use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::event::{Action, ActionLog, Keycode};

/// Recording flag, last-event timestamp and the action log, shared between
/// the listener, the player and the front-end.
#[derive(Debug, Default)]
pub struct Session {
    pub is_recording: bool,
    pub last_event: Option<Instant>,
    pub log: ActionLog,
}

pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn start_recording(&mut self) {
        self.is_recording = true;
        self.log.clear();
        self.last_event = None;
    }

    pub fn stop_recording(&mut self) {
        self.is_recording = false;
    }

    /// Appends `keycode` if recording, timed against the previous held key.
    /// `last_event` moves to `now` whether or not anything was recorded.
    pub fn on_key_held(&mut self, keycode: Keycode, now: Instant) -> Option<Action> {
        let recorded = if self.is_recording {
            let delay_ms = self
                .last_event
                .map(|last| now.saturating_duration_since(last).as_millis())
                .unwrap_or(0);
            let action = Action::new(keycode, u64::try_from(delay_ms).unwrap_or(u64::MAX));
            self.log.push(action);
            Some(action)
        } else {
            None
        };
        self.last_event = Some(now);
        recorded
    }

    /// Replaces the log wholesale, e.g. with a file picked by the user.
    pub fn replace_log(&mut self, log: ActionLog) {
        self.is_recording = false;
        self.last_event = None;
        self.log = log;
    }
}

/// Locks the session. The session holds plain data, so a panic while it was
/// held leaves nothing half-updated that matters and the guard is recovered.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
