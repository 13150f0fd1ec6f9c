//! Fault blink shown while the device is locked
//!
//! The blink timer runs from boot onwards in both modes. While running its
//! expiries do nothing visible; once locked each expiry toggles the LED.
//! Keeping the timer armed the whole time means locking never has to start
//! it, so there is no window where the mode says locked but nothing blinks.

use core::time::Duration;

use embedded_hal::digital::StatefulOutputPin;
use log::error;

use crate::error::LockoutError;
use crate::hal::{Timer, TimerMode};
use crate::mode::SystemMode;

pub struct FaultIndicator<L, T> {
    led: L,
    timer: T,
    period: Duration,
    toggles: u32,
}

impl<L, T> FaultIndicator<L, T>
where
    L: StatefulOutputPin,
    T: Timer,
{
    pub fn new(led: L, timer: T, period: Duration) -> Self {
        Self {
            led,
            timer,
            period,
            toggles: 0,
        }
    }

    /// Turn the LED off and start the blink timer
    pub fn start(&mut self) -> Result<(), LockoutError> {
        self.timer.arm(TimerMode::Periodic, self.period);
        self.led.set_low().map_err(|e| {
            error!("Failed to clear fault LED: {:?}", e);
            LockoutError::output(&e)
        })
    }

    /// Blink timer expired
    pub fn on_tick(&mut self, mode: SystemMode) {
        self.timer.arm(TimerMode::Periodic, self.period);

        if !mode.is_locked() {
            return;
        }

        match self.led.toggle() {
            Ok(()) => self.toggles = self.toggles.wrapping_add(1),
            Err(e) => error!("Failed to toggle fault LED: {:?}", e),
        }
    }

    /// Number of visible toggles so far
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    /// Stop the blink timer and release the peripherals
    pub fn release(mut self) -> (L, T) {
        self.timer.disarm();
        (self.led, self.timer)
    }
}
