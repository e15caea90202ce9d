use std::sync::Arc;
use std::time::{Duration, Instant};

use rdev::{Event, EventType};
use serde::{Deserialize, Serialize};

use crate::keycodes;

/// Platform-neutral key identifier, see [`crate::keycodes`].
pub type Keycode = u32;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Key is down. Auto-repeat delivers this kind repeatedly.
    Held,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: Keycode,
    pub kind: KeyKind,
    pub at: Instant,
}

impl KeyEvent {
    /// Keyboard events only; mouse and wheel events, and keys without a
    /// keycode, yield `None`.
    pub fn from_rdev(event: &Event, at: Instant) -> Option<Self> {
        let (key, kind) = match event.event_type {
            EventType::KeyPress(key) => (key, KeyKind::Held),
            EventType::KeyRelease(key) => (key, KeyKind::Released),
            _ => return None,
        };
        Some(Self {
            keycode: keycodes::from_key(key)?,
            kind,
            at,
        })
    }
}

/// What the recorder is doing, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Recording,
    Playing,
}

/// Called from the listener and player threads whenever [`Status`] changes.
pub type StatusListener = Arc<dyn Fn(Status) + Send + Sync>;

/// One recorded key tap and the pause that preceded it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub keycode: Keycode,
    pub delay_ms: u64,
}

impl Action {
    pub fn new(keycode: Keycode, delay_ms: u64) -> Self {
        Self { keycode, delay_ms }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Recorded actions in replay order.
///
/// Only ever appended to or reset as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Sum of all delays, i.e. the minimum wall-clock length of one replay.
    pub fn total_delay(&self) -> Duration {
        let ms = self
            .actions
            .iter()
            .fold(0u64, |acc, a| acc.saturating_add(a.delay_ms));
        Duration::from_millis(ms)
    }
}

impl From<Vec<Action>> for ActionLog {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl FromIterator<Action> for ActionLog {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdev::{Button, Key};
    use std::time::SystemTime;

    fn rdev_event(event_type: EventType) -> Event {
        Event {
            time: SystemTime::now(),
            name: None,
            event_type,
        }
    }

    #[test]
    fn key_press_becomes_held_event() {
        let at = Instant::now();
        let event = KeyEvent::from_rdev(&rdev_event(EventType::KeyPress(Key::F2)), at).unwrap();
        assert_eq!(event.keycode, 60);
        assert_eq!(event.kind, KeyKind::Held);
        assert_eq!(event.at, at);

        let event = KeyEvent::from_rdev(&rdev_event(EventType::KeyRelease(Key::F2)), at).unwrap();
        assert_eq!(event.kind, KeyKind::Released);
    }

    #[test]
    fn mouse_events_are_ignored() {
        let at = Instant::now();
        let press = rdev_event(EventType::ButtonPress(Button::Left));
        assert!(KeyEvent::from_rdev(&press, at).is_none());
        assert!(
            KeyEvent::from_rdev(&rdev_event(EventType::MouseMove { x: 1.0, y: 2.0 }), at).is_none()
        );
    }

    #[test]
    fn total_delay_sums_actions() {
        let log: ActionLog =
            vec![Action::new(30, 0), Action::new(48, 150), Action::new(46, 250)].into();
        assert_eq!(log.total_delay(), Duration::from_millis(400));
        assert_eq!(log.len(), 3);
    }
}
