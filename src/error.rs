use std::path::PathBuf;

use thiserror::Error;

use crate::event::Keycode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The OS keyboard hook could not be installed.
    #[error("could not install global keyboard hook: {0}")]
    Hook(String),

    #[error("keycode {0} has no key to inject")]
    UnmappedKeycode(Keycode),

    #[error("could not inject {key}: {reason}")]
    Inject { key: String, reason: String },

    /// A persisted record that is not `keycode,delay`.
    #[error("line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no config directory available on this platform")]
    NoConfigDir,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
