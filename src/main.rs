use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyreplay::config::{self, Config};
use keyreplay::controller::Controller;
use keyreplay::event::{Keycode, Status, StatusListener};
use keyreplay::play::{self, PlaybackOptions, Player, RdevInjector};
use keyreplay::record::{self, Session};
use keyreplay::{hook, keycodes, persist};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod bar_app;
use bar_app::{AppEvent, BarApp};

use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoopBuilder};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Keycode that starts a recording
    #[arg(long, global = true)]
    start_key: Option<Keycode>,
    /// Keycode that stops recording or playback
    #[arg(long, global = true)]
    stop_key: Option<Keycode>,
    /// Keycode that plays the recording back
    #[arg(long, global = true)]
    play_key: Option<Keycode>,
    /// Record hotkey presses as actions too
    #[arg(long, global = true, default_value_t = false)]
    record_hotkeys: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record and play back with the hotkeys, without the tray icon
    Headless {
        /// Where to save the recorded actions on Ctrl-C
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Play back a saved actions file
    Play {
        /// Input file path
        input: PathBuf,
        /// Playback speed factor (e.g., 2.0 for 2x speed, 0.5 for half speed)
        #[arg(long, default_value_t = 1.0, value_parser = parse_speed)]
        speed: f64,
        /// Number of times to repeat playback (0 for infinite)
        #[arg(long, default_value_t = 1)]
        repeat_count: u32,
    },
    /// List the keycodes of every known key
    Keys,
}

fn parse_speed(s: &str) -> std::result::Result<f64, String> {
    let speed: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err("speed must be a positive number".to_string())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    log::debug!("Config: {:?}", config);

    match cli.command {
        Some(Commands::Headless { output }) => run_headless(config, output),
        Some(Commands::Play {
            input,
            speed,
            repeat_count,
        }) => run_play(config, input, PlaybackOptions { speed, repeat_count }),
        Some(Commands::Keys) => {
            for (code, key) in keycodes::table() {
                println!("{:>6}  {:?}", code, key);
            }
            Ok(())
        }
        None => run_gui(config),
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let mut config = config::load_config(&path).with_context(|| format!("loading {:?}", path))?;
    if let Some(code) = cli.start_key {
        config.hotkeys.start = code;
    }
    if let Some(code) = cli.stop_key {
        config.hotkeys.stop = code;
    }
    if let Some(code) = cli.play_key {
        config.hotkeys.play = code;
    }
    config.record_hotkeys |= cli.record_hotkeys;
    Ok(config)
}

fn build_controller(
    config: &Config,
    session: record::SharedSession,
    on_status: StatusListener,
) -> Controller {
    let injector = RdevInjector::new(Duration::from_millis(config.tap_hold_ms));
    let player = Player::spawn(injector, PlaybackOptions::default(), on_status.clone());
    Controller::new(session, config.hotkeys, config.record_hotkeys, player, on_status)
}

fn run_gui(config: Config) -> Result<()> {
    log::info!("Starting keyboard recorder...");

    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();
    let session = Session::shared();

    // The hook and player threads report status through the event loop.
    let status_proxy = Mutex::new(event_loop.create_proxy());
    let on_status: StatusListener = Arc::new(move |status: Status| {
        let proxy = status_proxy.lock().unwrap_or_else(|p| p.into_inner());
        let _ = proxy.send_event(AppEvent::Status(status));
    });
    let controller = build_controller(&config, session.clone(), on_status);

    let error_proxy = event_loop.create_proxy();
    hook::spawn_listener(controller, move |e| {
        let _ = error_proxy.send_event(AppEvent::HookFailed(e.to_string()));
    });

    let menu_proxy = event_loop.create_proxy();
    let mut menu_proxy = Some(menu_proxy);
    let mut app: Option<BarApp> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            // The tray icon has to be created once the loop is running.
            Event::NewEvents(StartCause::Init) => {
                if let Some(proxy) = menu_proxy.take() {
                    match BarApp::new(proxy, session.clone(), config.clone()) {
                        Ok(bar) => app = Some(bar),
                        Err(e) => {
                            log::error!("Failed to create tray icon: {:#}", e);
                            *control_flow = ControlFlow::ExitWithCode(1);
                        }
                    }
                }
            }
            Event::UserEvent(AppEvent::Menu(menu_event)) => {
                if let Some(app) = app.as_mut() {
                    app.handle_menu_event(menu_event, control_flow);
                }
            }
            Event::UserEvent(AppEvent::Status(status)) => {
                if let Some(app) = app.as_mut() {
                    app.handle_status(status);
                }
            }
            Event::UserEvent(AppEvent::HookFailed(message)) => match app.as_mut() {
                Some(app) => app.handle_hook_failed(&message, control_flow),
                None => *control_flow = ControlFlow::ExitWithCode(1),
            },
            _ => {}
        }
    })
}

fn run_headless(config: Config, output: Option<PathBuf>) -> Result<()> {
    log::info!("{}", config.idle_hint());

    let session = Session::shared();
    let on_status: StatusListener = Arc::new(|status: Status| log::info!("Status: {:?}", status));
    let controller = build_controller(&config, session.clone(), on_status);

    let exit_session = session.clone();
    ctrlc::set_handler(move || {
        if let Some(path) = &output {
            let log = record::lock(&exit_session).log.clone();
            if let Err(e) = persist::save_to_path(&log, path) {
                log::error!("Failed to save actions to {:?}: {}", path, e);
            }
        }
        std::process::exit(0);
    })
    .context("installing Ctrl-C handler")?;

    hook::listen(move |event| {
        controller.handle(event);
    })
    .context("listening for global key events")?;
    Ok(())
}

fn run_play(config: Config, input: PathBuf, options: PlaybackOptions) -> Result<()> {
    println!("Preparing to play back from {:?}...", input);
    let log = persist::load_from_path(&input).with_context(|| format!("reading {:?}", input))?;
    println!("Loaded {} actions.", log.len());

    if options.speed != 1.0 {
        println!("Playback speed: {:.2}x", options.speed);
    }
    if options.repeat_count == 0 {
        println!("Repeat: Infinite");
    } else if options.repeat_count > 1 {
        println!("Repeat: {} times", options.repeat_count);
    }
    println!("Stop Playback: {} or Ctrl-C", keycodes::name(config.hotkeys.stop));

    let stop_flag = Arc::new(AtomicBool::new(false));

    let stop_ctrlc = stop_flag.clone();
    ctrlc::set_handler(move || stop_ctrlc.store(true, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    // Listen for the stop hotkey; Ctrl-C still works if the hook is unavailable.
    let stop_hotkey = stop_flag.clone();
    let stop_key = config.hotkeys.stop;
    std::thread::spawn(move || {
        let result = hook::listen(move |event| {
            if event.kind == keyreplay::event::KeyKind::Held && event.keycode == stop_key {
                println!("Stop hotkey detected. Stopping playback...");
                stop_hotkey.store(true, Ordering::SeqCst);
            }
        });
        if let Err(e) = result {
            log::warn!("Stop hotkey unavailable: {}", e);
        }
    });

    let mut injector = RdevInjector::new(Duration::from_millis(config.tap_hold_ms));
    let report = play::do_playback(&log, &options, &mut injector, &stop_flag);
    if report.cancelled {
        println!("Playback stopped after {} keys.", report.injected);
    } else {
        println!("Playback complete.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config_hotkeys() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let cli = Cli::parse_from([
            "keyreplay",
            "--config",
            config_path.to_str().unwrap(),
            "--start-key",
            "59",
            "--record-hotkeys",
            "keys",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.hotkeys.start, 59);
        assert_eq!(config.hotkeys.stop, 68);
        assert!(config.record_hotkeys);
    }

    #[test]
    fn speed_must_be_positive() {
        assert_eq!(parse_speed("2.5"), Ok(2.5));
        assert!(parse_speed("0").is_err());
        assert!(parse_speed("-1").is_err());
        assert!(parse_speed("fast").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
