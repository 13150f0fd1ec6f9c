//! Hardware-independent core library for the lockout demonstrator
//!
//! This crate contains the watchdog-supervised lockout state machine: timeout
//! accounting persisted across resets, debounced button liveness signaling,
//! and the terminal locked mode with its fault blink. Peripherals are reached
//! only through the capability traits in [`hal`], so the same logic runs on
//! the ESP32-S3 firmware and on desktop hosts (simulator and tests).
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts.

#![no_std]

extern crate alloc;

pub mod config;
pub mod counter;
pub mod critical;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod fault;
pub mod hal;
pub mod liveness;
pub mod lockout;
pub mod mode;
pub mod shared;
pub mod storage;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{LockoutConfig, WatchdogTimeout};
pub use error::LockoutError;
pub use lockout::{Board, BoardParts, Lockout};
pub use mode::SystemMode;
