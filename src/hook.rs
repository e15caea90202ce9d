use std::thread::{self, JoinHandle};
use std::time::Instant;

use rdev::{Event, EventType};

use crate::controller::Controller;
use crate::error::{Error, Result};
use crate::event::KeyEvent;

/// Installs the global keyboard hook and feeds every key event to `sink`,
/// in the order the OS delivers them. Blocks for the life of the process;
/// returns only if the hook cannot be installed.
///
/// macOS needs the accessibility permission and Linux an X11 session.
pub fn listen<F>(mut sink: F) -> Result<()>
where
    F: FnMut(KeyEvent) + 'static,
{
    rdev::listen(move |event: Event| {
        let at = Instant::now();
        match KeyEvent::from_rdev(&event, at) {
            Some(key_event) => sink(key_event),
            None => {
                if let EventType::KeyPress(key) = event.event_type {
                    log::debug!("No keycode for {:?}, skipped", key);
                }
            }
        }
    })
    .map_err(|e| Error::Hook(format!("{:?}", e)))
}

/// Runs the hook on its own thread, dispatching held keys to `controller`.
/// `on_error` is called once if the hook cannot be installed.
pub fn spawn_listener<E>(controller: Controller, on_error: E) -> JoinHandle<()>
where
    E: FnOnce(Error) + Send + 'static,
{
    thread::spawn(move || {
        log::info!("Listening for global key events...");
        if let Err(e) = listen(move |event| {
            log::trace!("Key event: {:?}", event);
            controller.handle(event);
        }) {
            log::error!("Listener error: {}", e);
            on_error(e);
        }
    })
}
