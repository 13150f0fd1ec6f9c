//! Supervisory watchdog handling and the lock transition
//!
//! Every watchdog expiry is a missed check-in. The supervisor counts it,
//! persists the count, re-arms the watchdog interrupt and, when the count
//! reaches the limit, moves the device into [`SystemMode::Locked`].
//!
//! The watchdog is re-armed on every path through [`LockoutSupervisor::on_timeout`],
//! including after locking. An unserviced watchdog would leave the device
//! running with nothing supervising it.

use core::fmt::{Debug, Write};
use core::time::Duration;

use embedded_storage::Storage;
use log::{debug, error, info};

use crate::counter::PersistentCounter;
use crate::debounce::DebounceGate;
use crate::diagnostics::{Console, Diagnostic};
use crate::hal::{ButtonInterrupt, Timer, Watchdog};
use crate::mode::SystemMode;

pub struct LockoutSupervisor<W> {
    watchdog: W,
    period: Duration,
    max_timeouts: u8,
}

impl<W: Watchdog> LockoutSupervisor<W> {
    pub fn new(watchdog: W, period: Duration, max_timeouts: u8) -> Self {
        Self {
            watchdog,
            period,
            max_timeouts,
        }
    }

    /// Start the watchdog in interrupt mode
    pub fn start(&mut self) {
        self.watchdog.start(self.period);
    }

    /// Restart the countdown after a liveness signal
    pub fn restart_countdown(&mut self) {
        self.watchdog.restart();
    }

    /// Get a reference to the watchdog
    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    pub fn max_timeouts(&self) -> u8 {
        self.max_timeouts
    }

    /// Watchdog expired.
    ///
    /// Once locked, expiries only re-arm the watchdog: the count is not
    /// touched again and the lock side effects do not repeat.
    pub fn on_timeout<S, T, B, C>(
        &mut self,
        mode: &mut SystemMode,
        counter: &mut PersistentCounter<S>,
        gate: &mut DebounceGate<T, B>,
        console: &mut Console<C>,
    ) where
        S: Storage,
        S::Error: Debug,
        T: Timer,
        B: ButtonInterrupt,
        C: Write,
    {
        if mode.is_locked() {
            self.watchdog.rearm_interrupt();
            debug!("Watchdog timeout while locked, ignored");
            return;
        }

        let count = counter.increment().unwrap_or_else(|e| {
            error!("Failed to persist timeout count: {}", e);
            counter.value()
        });
        console.emit(Diagnostic::Timeout {
            count,
            max: self.max_timeouts,
        });

        self.watchdog.rearm_interrupt();

        if count >= self.max_timeouts {
            self.lock(mode, count, gate, console);
        }
    }

    /// Move into the locked mode. Does nothing if already locked.
    pub fn lock<T, B, C>(
        &mut self,
        mode: &mut SystemMode,
        count: u8,
        gate: &mut DebounceGate<T, B>,
        console: &mut Console<C>,
    ) where
        T: Timer,
        B: ButtonInterrupt,
        C: Write,
    {
        if mode.is_locked() {
            return;
        }

        *mode = SystemMode::Locked;
        gate.latch();
        info!("Entered {} mode", mode.label());
        console.emit(Diagnostic::Locked { count });
    }

    /// Disable the watchdog and release it
    pub fn release(mut self) -> W {
        self.watchdog.stop();
        self.watchdog
    }
}
