//! Hardware-independent core library for simon-rs
//!
//! This crate contains all platform-agnostic logic for the networked memory
//! game: button debouncing, audio cue tables, the sequence game state machine,
//! the MQTT packet codec, pairing and score-report messages, and the
//! application context that runs one cooperative loop iteration.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-C3) and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod game;
pub mod leds;
pub mod mqtt;
pub mod net;

#[cfg(test)]
mod testing;

/// Number of LED/button pairs on the board.
pub const BUTTON_COUNT: usize = 4;
