//! Records global keyboard input and replays it with the original timing.
//!
//! The hook thread feeds [`controller::Controller`], which records into a
//! shared [`record::Session`] and hands finished logs to a
//! [`play::Player`] thread. [`persist`] reads and writes the
//! `keycode,delay` file format.

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod hook;
pub mod keycodes;
pub mod persist;
pub mod play;
pub mod record;

pub use error::{Error, Result};
