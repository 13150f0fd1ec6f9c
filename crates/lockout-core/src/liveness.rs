//! Button presses as liveness signals
//!
//! An accepted press proves someone is there: the timeout count goes back to
//! zero, the watchdog countdown restarts from its full period and the
//! debounce window opens. Releases carry no meaning. Presses while locked,
//! or while the window is open, cannot normally arrive because the button
//! interrupt is off in both cases; if one does, it is ignored.

use core::fmt::{Debug, Write};

use embedded_storage::Storage;
use log::{debug, error};

use crate::counter::PersistentCounter;
use crate::debounce::DebounceGate;
use crate::diagnostics::{Console, Diagnostic};
use crate::hal::{ButtonEdge, ButtonInterrupt, Timer, Watchdog};
use crate::mode::SystemMode;
use crate::supervisor::LockoutSupervisor;

/// What became of a button edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The press was taken as a liveness signal
    Accepted,
    /// A release, nothing to do
    Released,
    /// The device is locked
    IgnoredLocked,
    /// The debounce window is still open
    IgnoredSuppressed,
}

#[derive(Debug, Default)]
pub struct LivenessMonitor {
    accepted: u32,
}

impl LivenessMonitor {
    pub const fn new() -> Self {
        Self { accepted: 0 }
    }

    /// Presses accepted since boot
    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub fn on_edge<S, W, T, B, C>(
        &mut self,
        edge: ButtonEdge,
        mode: SystemMode,
        counter: &mut PersistentCounter<S>,
        supervisor: &mut LockoutSupervisor<W>,
        gate: &mut DebounceGate<T, B>,
        console: &mut Console<C>,
    ) -> EdgeOutcome
    where
        S: Storage,
        S::Error: Debug,
        W: Watchdog,
        T: Timer,
        B: ButtonInterrupt,
        C: Write,
    {
        if edge == ButtonEdge::Released {
            return EdgeOutcome::Released;
        }
        if mode.is_locked() {
            debug!("Button press while locked, ignored");
            return EdgeOutcome::IgnoredLocked;
        }
        if gate.is_suppressed() {
            debug!("Button press inside debounce window, ignored");
            return EdgeOutcome::IgnoredSuppressed;
        }

        if let Err(e) = counter.reset() {
            error!("Failed to persist timeout count reset: {}", e);
        }
        supervisor.restart_countdown();
        console.emit(Diagnostic::LivenessReset);
        gate.open();

        self.accepted = self.accepted.wrapping_add(1);
        EdgeOutcome::Accepted
    }
}
