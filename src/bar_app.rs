use anyhow::{Context, Result};
use chrono::Local;

use std::fs;
use std::path::PathBuf;

use tao::event_loop::{ControlFlow, EventLoopProxy};
use tray_icon::menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

use keyreplay::config::Config;
use keyreplay::event::Status;
use keyreplay::persist;
use keyreplay::record::{self, SharedSession};

#[derive(Debug)]
pub enum AppEvent {
    Menu(MenuEvent),
    Status(Status),
    HookFailed(String),
}

pub struct BarApp {
    pub session: SharedSession,
    pub config: Config,
    pub status: Status,
    pub tray_icon: Option<TrayIcon>,
    pub status_item: MenuItem,
    pub save_item: MenuItem,
    pub load_item: MenuItem,
    pub quit_i: MenuItem,
    pub icon_idle: Icon,
    pub icon_recording: Icon,
    pub icon_playing: Icon,
}

impl BarApp {
    pub fn new(
        proxy: EventLoopProxy<AppEvent>,
        session: SharedSession,
        config: Config,
    ) -> Result<Self> {
        // Icons
        let icon_idle = create_icon(255, 255, 255, 255)?; // White
        let icon_recording = create_icon(255, 86, 86, 255)?; // #FF5656
        let icon_playing = create_icon(115, 175, 111, 255)?; // #73AF6F

        // Menu
        let tray_menu = Menu::new();
        let app_title_item = MenuItem::new(
            concat!("Keyboard Recorder ", env!("CARGO_PKG_VERSION")),
            false,
            None,
        );
        let status_item = MenuItem::new(status_text(Status::Idle, &config), false, None);
        let save_item = MenuItem::new("Save Actions", true, None);
        let load_item = MenuItem::new("Load Actions", true, None);
        let quit_i = MenuItem::new("Quit", true, None);

        tray_menu.append(&app_title_item)?;
        tray_menu.append(&status_item)?;
        tray_menu.append(&PredefinedMenuItem::separator())?;
        tray_menu.append(&save_item)?;
        tray_menu.append(&load_item)?;
        tray_menu.append(&PredefinedMenuItem::separator())?;
        tray_menu.append(&quit_i)?;

        let tray_icon = Some(
            TrayIconBuilder::new()
                .with_menu(Box::new(tray_menu))
                .with_tooltip("Keyboard Recorder")
                .with_icon(icon_idle.clone())
                .build()?,
        );

        // Listen for menu events in a separate thread
        std::thread::spawn(move || {
            while let Ok(event) = MenuEvent::receiver().recv() {
                let _ = proxy.send_event(AppEvent::Menu(event));
            }
        });

        Ok(Self {
            session,
            config,
            status: Status::Idle,
            tray_icon,
            status_item,
            save_item,
            load_item,
            quit_i,
            icon_idle,
            icon_recording,
            icon_playing,
        })
    }

    pub fn handle_status(&mut self, status: Status) {
        log::debug!("Status: {:?}", status);
        self.status = status;
        self.update_menu_state();
    }

    pub fn handle_menu_event(&mut self, event: MenuEvent, control_flow: &mut ControlFlow) {
        if event.id == self.quit_i.id() {
            *control_flow = ControlFlow::Exit;
        } else if event.id == self.save_item.id() {
            self.handle_save();
        } else if event.id == self.load_item.id() {
            self.handle_load();
        }
    }

    pub fn handle_save(&self) {
        // Snapshot first: the dialog must not hold the session lock.
        let log = record::lock(&self.session).log.clone();
        if log.is_empty() {
            log::info!("Saving an empty action log.");
        }

        let recording_dir = self.recordings_dir();
        let default_name = format!("actions_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));

        log::info!("Opening file picker to save actions...");

        let file_handle = rfd::FileDialog::new()
            .set_directory(&recording_dir)
            .set_file_name(&default_name)
            .add_filter("Actions", &["txt"])
            .save_file();

        let Some(target_path) = file_handle else {
            log::info!("Save canceled.");
            return;
        };

        match persist::save_to_path(&log, &target_path) {
            Ok(report) if report.failed == 0 => log::info!("Actions saved successfully."),
            Ok(report) => {
                log::warn!("Saved with {} of {} lines failing", report.failed, log.len());
                show_error(
                    "Save Incomplete",
                    &format!("{} of {} actions could not be written.", report.failed, log.len()),
                );
            }
            Err(e) => {
                log::error!("Failed to save actions to {:?}: {}", target_path, e);
                show_error("Save Failed", &format!("Failed to save actions: {}", e));
            }
        }
    }

    pub fn handle_load(&mut self) {
        if self.status != Status::Idle {
            log::warn!("Cannot load actions while {:?}.", self.status);
            return;
        }

        log::info!("Opening file picker to load actions...");

        let file_handle = rfd::FileDialog::new()
            .set_directory(self.recordings_dir())
            .add_filter("Actions", &["txt"])
            .pick_file();

        let Some(path) = file_handle else {
            return;
        };
        match persist::load_from_path(&path) {
            Ok(log) => {
                log::info!("Selected recording: {:?}", path);
                record::lock(&self.session).replace_log(log);
                self.update_menu_state();
            }
            Err(e) => {
                log::error!("Failed to load {:?}: {}", path, e);
                show_error("Load Failed", &format!("Failed to load actions: {}", e));
            }
        }
    }

    /// Shows the hook error and exits; without the hook nothing else works.
    pub fn handle_hook_failed(&mut self, message: &str, control_flow: &mut ControlFlow) {
        show_error(
            "Keyboard Hook Unavailable",
            &format!(
                "Could not listen for global key events: {}\n\n\
                 On macOS, grant Accessibility access and restart.",
                message
            ),
        );
        *control_flow = ControlFlow::ExitWithCode(1);
    }

    pub fn update_menu_state(&mut self) {
        let action_count = record::lock(&self.session).log.len();
        let idle = self.status == Status::Idle;

        self.status_item.set_text(status_text(self.status, &self.config));
        self.save_item.set_enabled(idle && action_count > 0);
        self.load_item.set_enabled(idle);
        self.save_item.set_text(if action_count > 0 {
            format!("Save Actions ({})", action_count)
        } else {
            "Save Actions".to_string()
        });

        let icon = match self.status {
            Status::Idle => &self.icon_idle,
            Status::Recording => &self.icon_recording,
            Status::Playing => &self.icon_playing,
        };
        if let Some(tray) = &mut self.tray_icon {
            let _ = tray.set_icon(Some(icon.clone()));
        }
    }

    fn recordings_dir(&self) -> PathBuf {
        let dir = self.config.recordings_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("Could not create {:?}: {}", dir, e);
        }
        dir
    }
}

pub fn status_text(status: Status, config: &Config) -> String {
    match status {
        Status::Idle => config.idle_hint(),
        Status::Recording => "Recording...".to_string(),
        Status::Playing => "Playing back recorded actions...".to_string(),
    }
}

fn show_error(title: &str, description: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(description)
        .show();
}

fn create_icon(r: u8, g: u8, b: u8, a: u8) -> Result<Icon> {
    let width = 22;
    let height = 22;
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = (width as f32 / 2.0) - 3.0;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - center_x + 0.5; // +0.5 to center in pixel
            let dy = y as f32 - center_y + 0.5;
            let inside = (dx * dx + dy * dy).sqrt() <= radius;
            if inside {
                rgba.extend_from_slice(&[r, g, b, a]);
            } else {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
    Icon::from_rgba(rgba, width, height).context("Failed to create icon")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_per_state() {
        let config = Config::default();
        assert_eq!(
            status_text(Status::Idle, &config),
            "Press F2 to start recording, F10 to stop, and F4 to play."
        );
        assert_eq!(status_text(Status::Recording, &config), "Recording...");
    }
}
