use crate::config::Hotkeys;
use crate::event::{KeyEvent, KeyKind, Status, StatusListener};
use crate::keycodes;
use crate::play::Player;
use crate::record::{self, SharedSession};

/// What a key event did to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not a hotkey; recorded if a recording is running.
    Passthrough,
    Started,
    Stopped,
    PlayQueued,
    PlaybackCancelled,
    /// Play hotkey with an empty log; recording stops, nothing is queued.
    NothingToPlay,
    /// Dropped because a playback is running.
    Ignored,
}

/// Turns held keys into recording, stop and play commands.
pub struct Controller {
    session: SharedSession,
    hotkeys: Hotkeys,
    record_hotkeys: bool,
    player: Player,
    on_status: StatusListener,
}

impl Controller {
    pub fn new(
        session: SharedSession,
        hotkeys: Hotkeys,
        record_hotkeys: bool,
        player: Player,
        on_status: StatusListener,
    ) -> Self {
        Self {
            session,
            hotkeys,
            record_hotkeys,
            player,
            on_status,
        }
    }

    pub fn handle(&self, event: KeyEvent) -> Transition {
        if event.kind != KeyKind::Held {
            return Transition::Passthrough;
        }
        let keycode = event.keycode;

        // The hook also sees the keys the player injects.
        if self.player.is_busy() {
            if keycode == self.hotkeys.stop {
                log::info!("Stop hotkey detected. Stopping playback...");
                self.player.cancel();
                return Transition::PlaybackCancelled;
            }
            log::trace!("Ignoring {} during playback", keycodes::name(keycode));
            return Transition::Ignored;
        }

        let is_hotkey = self.hotkeys.contains(keycode);
        let mut session = record::lock(&self.session);
        if is_hotkey && !self.record_hotkeys {
            session.last_event = Some(event.at);
        } else if let Some(action) = session.on_key_held(keycode, event.at) {
            log::info!(
                "Recorded key: {}, Delay: {} ms",
                keycodes::name(action.keycode),
                action.delay_ms
            );
        }

        if keycode == self.hotkeys.start {
            session.start_recording();
            drop(session);
            log::info!("Recording started...");
            (self.on_status)(Status::Recording);
            Transition::Started
        } else if keycode == self.hotkeys.stop {
            session.stop_recording();
            drop(session);
            log::info!("Recording stopped.");
            (self.on_status)(Status::Idle);
            Transition::Stopped
        } else if keycode == self.hotkeys.play {
            session.stop_recording();
            let snapshot = session.log.clone();
            drop(session);
            if snapshot.is_empty() {
                log::warn!("Nothing recorded yet; play hotkey ignored.");
                (self.on_status)(Status::Idle);
                return Transition::NothingToPlay;
            }
            if self.player.play(snapshot) {
                Transition::PlayQueued
            } else {
                log::warn!("Playback already running.");
                Transition::Ignored
            }
        } else {
            Transition::Passthrough
        }
    }
}
