use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use rdev::{EventType, simulate};

use crate::error::{Error, Result};
use crate::event::{ActionLog, Keycode, Status, StatusListener};
use crate::keycodes;

/// Longest uninterrupted sleep; bounds how late a stop request is noticed.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Sends one synthetic key tap to the OS.
pub trait KeyInjector {
    fn tap(&mut self, keycode: Keycode) -> Result<()>;
}

/// Injects through `rdev::simulate`: press, hold briefly, release.
pub struct RdevInjector {
    hold: Duration,
}

impl RdevInjector {
    pub fn new(hold: Duration) -> Self {
        Self { hold }
    }
}

impl KeyInjector for RdevInjector {
    fn tap(&mut self, keycode: Keycode) -> Result<()> {
        let key = keycodes::to_key(keycode).ok_or(Error::UnmappedKeycode(keycode))?;
        send(&EventType::KeyPress(key))?;
        // Some platforms drop the release if it follows the press too closely.
        thread::sleep(self.hold);
        send(&EventType::KeyRelease(key))
    }
}

fn send(event_type: &EventType) -> Result<()> {
    simulate(event_type).map_err(|e| Error::Inject {
        key: format!("{:?}", event_type),
        reason: format!("{:?}", e),
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Delays are divided by this. 2.0 plays twice as fast.
    pub speed: f64,
    /// Number of passes over the log; 0 repeats until stopped.
    pub repeat_count: u32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat_count: 1,
        }
    }
}

impl PlaybackOptions {
    fn scale(&self, delay: Duration) -> Duration {
        if self.speed == 1.0 {
            return delay;
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            log::warn!("Ignoring playback speed {}", self.speed);
            return delay;
        }
        Duration::from_secs_f64(delay.as_secs_f64() / self.speed)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub injected: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Replays `log` on the calling thread: for each action, sleep its delay and
/// tap its key. Injection errors are logged and skipped. Checks `stop_flag`
/// while sleeping and between actions.
pub fn do_playback(
    log: &ActionLog,
    options: &PlaybackOptions,
    injector: &mut dyn KeyInjector,
    stop_flag: &AtomicBool,
) -> PlaybackReport {
    let mut report = PlaybackReport::default();
    let mut count = 0;
    loop {
        if options.repeat_count > 0 && count >= options.repeat_count {
            break;
        }
        if count > 0 {
            log::info!("Repeat #{}", count + 1);
        }

        for action in log {
            if !sleep_unless_stopped(options.scale(action.delay()), stop_flag) {
                log::info!("Playback stopped by user.");
                report.cancelled = true;
                return report;
            }
            match injector.tap(action.keycode) {
                Ok(()) => {
                    report.injected += 1;
                    log::debug!("Simulated key press: {}", keycodes::name(action.keycode));
                }
                Err(e) => {
                    report.failed += 1;
                    log::error!("We could not send {}: {}", keycodes::name(action.keycode), e);
                }
            }
        }
        count += 1;

        // An empty log would otherwise spin forever on infinite repeat.
        if log.is_empty() {
            break;
        }
    }
    log::info!(
        "Playback finished: {} keys sent, {} failed.",
        report.injected,
        report.failed
    );
    report
}

/// Sleeps for `delay` in short slices. Returns `false` as soon as `stop_flag`
/// is set, including when it was already set on entry.
fn sleep_unless_stopped(delay: Duration, stop_flag: &AtomicBool) -> bool {
    let mut remaining = delay;
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            return false;
        }
        if remaining.is_zero() {
            return true;
        }
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining -= slice;
    }
}

/// Runs playbacks on a dedicated thread so the key hook never blocks.
pub struct Player {
    tx: Sender<ActionLog>,
    busy: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
}

impl Player {
    pub fn spawn<I>(mut injector: I, options: PlaybackOptions, on_status: StatusListener) -> Self
    where
        I: KeyInjector + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<ActionLog>();
        let busy = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let busy_worker = busy.clone();
        let stop_worker = stop_flag.clone();
        thread::spawn(move || {
            while let Ok(log) = rx.recv() {
                log::info!("Playing back {} recorded actions...", log.len());
                on_status(Status::Playing);
                do_playback(&log, &options, &mut injector, &stop_worker);
                on_status(Status::Idle);
                busy_worker.store(false, Ordering::SeqCst);
            }
            log::debug!("Player thread exiting");
        });

        Self {
            tx,
            busy,
            stop_flag,
        }
    }

    /// Queues `log` for playback. Returns `false` without queuing if a
    /// playback is already running.
    pub fn play(&self, log: ActionLog) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.stop_flag.store(false, Ordering::SeqCst);
        if self.tx.send(log).is_err() {
            log::error!("Player thread is gone; cannot play back");
            self.busy.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    pub fn cancel(&self) {
        if self.is_busy() {
            self.stop_flag.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
