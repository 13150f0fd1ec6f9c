//! Button debounce by interrupt suppression
//!
//! A single press bounces for a few milliseconds and would otherwise arrive
//! as a burst of edges. Instead of filtering edges, the gate switches the
//! button interrupt off for a fixed window after an accepted press and lets a
//! one-shot timer switch it back on. Edges inside the window never reach a
//! handler at all.
//!
//! The gate owns the button's interrupt control, so it is also what latches
//! the button off for good when the device locks.

use core::time::Duration;

use log::debug;

use crate::hal::{ButtonInterrupt, Timer, TimerMode};

pub struct DebounceGate<T, B> {
    timer: T,
    button: B,
    window: Duration,
    /// Set while the window is open and the button interrupt is off
    suppressed: bool,
    /// Set once the button is disabled for the rest of the power cycle
    latched: bool,
}

impl<T, B> DebounceGate<T, B>
where
    T: Timer,
    B: ButtonInterrupt,
{
    pub fn new(timer: T, button: B, window: Duration) -> Self {
        Self {
            timer,
            button,
            window,
            suppressed: false,
            latched: false,
        }
    }

    /// Enable button interrupts at boot
    pub fn start(&mut self) {
        if !self.latched {
            self.button.enable_interrupt();
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Get a reference to the button
    pub fn button(&self) -> &B {
        &self.button
    }

    /// Open the suppression window after an accepted press.
    pub fn open(&mut self) {
        if self.latched {
            return;
        }
        self.suppressed = true;
        self.button.disable_interrupt();
        self.timer.arm(TimerMode::OneShot, self.window);
    }

    /// Debounce timer expired: close the window.
    ///
    /// The button comes back only if it was not latched off in the meantime,
    /// so a lock that happens inside the window stays permanent.
    pub fn on_elapsed(&mut self) {
        if !self.suppressed {
            debug!("Debounce timer fired with no open window");
            return;
        }
        self.suppressed = false;

        if self.latched {
            debug!("Debounce window closed, button stays latched off");
            return;
        }
        self.button.enable_interrupt();
    }

    /// Disable the button for the rest of the power cycle.
    pub fn latch(&mut self) {
        self.latched = true;
        self.button.disable_interrupt();
    }

    /// Stop the debounce timer and release the peripherals
    pub fn release(mut self) -> (T, B) {
        self.timer.disarm();
        (self.timer, self.button)
    }
}
