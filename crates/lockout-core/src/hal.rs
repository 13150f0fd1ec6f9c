//! Capability traits for the peripherals the state machine drives
//!
//! The firmware implements these on top of esp-hal drivers and the simulator
//! on top of a virtual clock. The lockout logic never touches a register.
//!
//! Two more collaborators are taken straight from the ecosystem traits:
//! the fault LED is an [`embedded_hal::digital::StatefulOutputPin`] and the
//! counter storage is an [`embedded_storage::Storage`]. The diagnostic serial
//! line is any [`core::fmt::Write`].

use core::time::Duration;

/// How a [`Timer`] behaves once it expires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fire once, stay disarmed until armed again
    OneShot,
    /// Fire every period until disarmed
    Periodic,
}

/// A general purpose hardware timer with an interrupt vector.
pub trait Timer {
    /// Start the countdown. Re-arming an armed timer restarts it.
    fn arm(&mut self, mode: TimerMode, duration: Duration);

    /// Stop the countdown; no further interrupts until armed again.
    fn disarm(&mut self);
}

/// The supervisory watchdog, used in interrupt mode only.
pub trait Watchdog {
    /// Configure the period and enable the timeout interrupt.
    ///
    /// The watchdog must never be left able to reset the system; only the
    /// interrupt stage is used.
    fn start(&mut self, timeout: Duration);

    /// Re-enable the timeout interrupt after it fired, restarting the
    /// countdown. Must be called from every timeout handler.
    fn rearm_interrupt(&mut self);

    /// Restart the countdown from its full period (feed).
    fn restart(&mut self);

    /// Disable the watchdog entirely.
    fn stop(&mut self);
}

/// Which way the button moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Interrupt control for the liveness button.
///
/// Edges themselves are delivered by the platform's interrupt vector, which
/// calls [`crate::Lockout::on_button_edge`].
pub trait ButtonInterrupt {
    fn enable_interrupt(&mut self);

    fn disable_interrupt(&mut self);
}
