use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use dirs::document_dir;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::Keycode;
use crate::keycodes;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    pub start: Keycode,
    pub stop: Keycode,
    pub play: Keycode,
}

impl Hotkeys {
    pub fn contains(&self, keycode: Keycode) -> bool {
        keycode == self.start || keycode == self.stop || keycode == self.play
    }
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            start: keycodes::F2,
            stop: keycodes::F10,
            play: keycodes::F4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub hotkeys: Hotkeys,
    /// Append hotkey presses to the log while recording.
    pub record_hotkeys: bool,
    /// How long an injected key stays down before it is released.
    pub tap_hold_ms: u64,
    /// Where the save and load dialogs open. Defaults to `~/Documents/Macros`.
    pub save_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkeys: Hotkeys::default(),
            record_hotkeys: false,
            tap_hold_ms: 20,
            save_dir: None,
        }
    }
}

impl Config {
    pub fn recordings_dir(&self) -> PathBuf {
        self.save_dir
            .clone()
            .unwrap_or_else(|| document_dir().unwrap_or(PathBuf::from(".")).join("Macros"))
    }

    /// Status line shown while idle.
    pub fn idle_hint(&self) -> String {
        format!(
            "Press {} to start recording, {} to stop, and {} to play.",
            keycodes::name(self.hotkeys.start),
            keycodes::name(self.hotkeys.stop),
            keycodes::name(self.hotkeys.play),
        )
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "keyreplay", "keyreplay").ok_or(Error::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.json"))
}

/// Reads the config at `path`, or the defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)?;
    let config = serde_json::from_str(&raw).map_err(|source| Error::Config {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.hotkeys.start, 60);
        assert_eq!(config.hotkeys.stop, 68);
        assert_eq!(config.hotkeys.play, 62);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "hotkeys": { "start": 59, "stop": 67, "play": 61 }, "record_hotkeys": true }"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.hotkeys.start, 59);
        assert!(config.record_hotkeys);
        assert_eq!(config.tap_hold_ms, 20);
        assert_eq!(config.save_dir, None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(Error::Config { .. })));
    }

    #[test]
    fn idle_hint_names_function_keys() {
        assert_eq!(
            Config::default().idle_hint(),
            "Press F2 to start recording, F10 to stop, and F4 to play."
        );
    }
}
