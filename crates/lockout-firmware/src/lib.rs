//! ESP32-S3 board support for the lockout demonstrator
//!
//! [`board`] adapts the esp-hal drivers to the capability traits of
//! `lockout-core`; [`pins`] fixes which pins and memory they use.

#![no_std]

pub mod board;
pub mod pins;
