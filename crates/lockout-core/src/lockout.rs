//! The lockout context: all state the interrupt handlers share
//!
//! [`Lockout`] owns every component and every peripheral. Each interrupt
//! vector maps to exactly one `on_*` method, and each piece of state has a
//! single writer:
//!
//! | state                | written by                                  |
//! |----------------------|---------------------------------------------|
//! | mode                 | [`LockoutSupervisor`] (Running → Locked)    |
//! | timeout count        | supervisor (+1), [`LivenessMonitor`] (→ 0)  |
//! | debounce suppression | [`DebounceGate`]                            |
//! | LED level            | [`FaultIndicator`]                          |
//!
//! Platforms describe their peripherals with a [`Board`] and hand them over
//! in [`BoardParts`].

use core::fmt::{Debug, Write};

use embedded_hal::digital::StatefulOutputPin;
use embedded_storage::{ReadStorage, Storage};
use log::warn;

use crate::config::LockoutConfig;
use crate::counter::{BootKind, PersistentCounter};
use crate::debounce::DebounceGate;
use crate::diagnostics::{Console, Diagnostic};
use crate::error::LockoutError;
use crate::fault::FaultIndicator;
use crate::hal::{ButtonEdge, ButtonInterrupt, Timer, Watchdog};
use crate::liveness::{EdgeOutcome, LivenessMonitor};
use crate::mode::SystemMode;
use crate::supervisor::LockoutSupervisor;

/// Peripheral types of a platform
pub trait Board {
    type Watchdog: Watchdog;
    type Button: ButtonInterrupt;
    type DebounceTimer: Timer;
    type BlinkTimer: Timer;
    type Led: StatefulOutputPin;
    type Serial: Write;
    type Storage: Storage;
}

/// The peripherals a [`Lockout`] takes ownership of
pub struct BoardParts<B: Board> {
    pub watchdog: B::Watchdog,
    pub button: B::Button,
    pub debounce_timer: B::DebounceTimer,
    pub blink_timer: B::BlinkTimer,
    pub led: B::Led,
    pub serial: B::Serial,
    pub storage: B::Storage,
}

type StorageError<B> = <<B as Board>::Storage as ReadStorage>::Error;

pub struct Lockout<B: Board> {
    config: LockoutConfig,
    mode: SystemMode,
    boot: BootKind,
    counter: PersistentCounter<B::Storage>,
    supervisor: LockoutSupervisor<B::Watchdog>,
    liveness: LivenessMonitor,
    gate: DebounceGate<B::DebounceTimer, B::Button>,
    fault: FaultIndicator<B::Led, B::BlinkTimer>,
    console: Console<B::Serial>,
}

impl<B: Board> Lockout<B>
where
    StorageError<B>: Debug,
{
    /// Bring the system up.
    ///
    /// Restores the timeout count (initializing it on first boot), starts
    /// the blink timer, enables the button and starts the watchdog in
    /// interrupt mode. A count restored at the limit puts the device
    /// straight back into the locked mode, with the button never enabled.
    pub fn start(parts: BoardParts<B>, config: LockoutConfig) -> Result<Self, LockoutError> {
        let (counter, boot) =
            PersistentCounter::load(parts.storage, config.counter_address, config.max_timeouts)?;

        let mut lockout = Self {
            config,
            mode: SystemMode::Running,
            boot,
            counter,
            supervisor: LockoutSupervisor::new(
                parts.watchdog,
                config.watchdog_timeout.as_duration(),
                config.max_timeouts,
            ),
            liveness: LivenessMonitor::new(),
            gate: DebounceGate::new(parts.debounce_timer, parts.button, config.debounce_window),
            fault: FaultIndicator::new(parts.led, parts.blink_timer, config.blink_period),
            console: Console::new(parts.serial),
        };

        lockout.fault.start()?;

        lockout.console.emit(Diagnostic::Boot {
            count: lockout.counter.value(),
            max: config.max_timeouts,
            first_boot: boot == BootKind::FirstBoot,
        });

        if lockout.counter.is_exhausted() {
            warn!("Timeout count restored at its limit, staying locked");
            let count = lockout.counter.value();
            lockout.supervisor.lock(
                &mut lockout.mode,
                count,
                &mut lockout.gate,
                &mut lockout.console,
            );
        }

        lockout.gate.start();
        lockout.supervisor.start();

        Ok(lockout)
    }

    /// Supervisory watchdog interrupt
    pub fn on_watchdog_timeout(&mut self) {
        self.supervisor.on_timeout(
            &mut self.mode,
            &mut self.counter,
            &mut self.gate,
            &mut self.console,
        );
    }

    /// Button pin-change interrupt
    pub fn on_button_edge(&mut self, edge: ButtonEdge) -> EdgeOutcome {
        self.liveness.on_edge(
            edge,
            self.mode,
            &mut self.counter,
            &mut self.supervisor,
            &mut self.gate,
            &mut self.console,
        )
    }

    /// Debounce timer interrupt
    pub fn on_debounce_elapsed(&mut self) {
        self.gate.on_elapsed();
    }

    /// Blink timer interrupt
    pub fn on_blink_tick(&mut self) {
        self.fault.on_tick(self.mode);
    }

    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    pub fn timeout_count(&self) -> u8 {
        self.counter.value()
    }

    pub fn boot_kind(&self) -> BootKind {
        self.boot
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_button_suppressed(&self) -> bool {
        self.gate.is_suppressed()
    }

    pub fn is_button_latched(&self) -> bool {
        self.gate.is_latched()
    }

    /// Presses accepted as liveness signals since boot
    pub fn accepted_presses(&self) -> u32 {
        self.liveness.accepted()
    }

    /// Visible fault LED toggles since boot
    pub fn fault_toggles(&self) -> u32 {
        self.fault.toggles()
    }

    /// Get a reference to the serial sink
    pub fn serial(&self) -> &B::Serial {
        self.console.serial()
    }

    /// Get a reference to the non-volatile storage
    pub fn storage(&self) -> &B::Storage {
        self.counter.storage()
    }

    /// Stop every timer and hand the peripherals back.
    ///
    /// This is the only way to clear the watchdog; nothing in the lock path
    /// calls it. Used to model a processor reset: starting a new `Lockout`
    /// from the returned parts behaves like the next boot.
    pub fn shutdown(self) -> BoardParts<B> {
        let watchdog = self.supervisor.release();
        let (debounce_timer, button) = self.gate.release();
        let (led, blink_timer) = self.fault.release();

        BoardParts {
            watchdog,
            button,
            debounce_timer,
            blink_timer,
            led,
            serial: self.console.into_inner(),
            storage: self.counter.into_storage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBoard, MockButton, MockLed, MockTimer, MockWatchdog};
    use crate::storage::MemoryStorage;
    use alloc::string::String;

    fn parts(storage: MemoryStorage) -> BoardParts<MockBoard> {
        BoardParts {
            watchdog: MockWatchdog::default(),
            button: MockButton::default(),
            debounce_timer: MockTimer::default(),
            blink_timer: MockTimer::default(),
            led: MockLed::default(),
            serial: String::new(),
            storage,
        }
    }

    fn storage_with_count(count: u8) -> MemoryStorage {
        let mut storage = MemoryStorage::default();
        storage
            .write(100, &[count, crate::counter::FORMAT_MARKER])
            .unwrap();
        storage
    }

    fn boot(storage: MemoryStorage) -> Lockout<MockBoard> {
        Lockout::start(parts(storage), LockoutConfig::DEFAULT).unwrap()
    }

    /// Processor reset: same storage, fresh everything else
    fn reset(lockout: Lockout<MockBoard>) -> Lockout<MockBoard> {
        boot(lockout.shutdown().storage)
    }

    #[test]
    fn test_first_boot() {
        let lockout = boot(MemoryStorage::default());

        assert_eq!(lockout.boot_kind(), BootKind::FirstBoot);
        assert_eq!(lockout.mode(), SystemMode::Running);
        assert_eq!(lockout.timeout_count(), 0);
        assert!(lockout.gate.button().enabled);
        assert_eq!(lockout.gate.button().enables, 1);
        assert_eq!(
            lockout.supervisor.watchdog().period,
            Some(core::time::Duration::from_millis(8192))
        );
        assert_eq!(
            lockout.serial(),
            "Boot: first start, watchdog timeouts 0/5\r\n"
        );
    }

    #[test]
    fn test_scenario_fourth_count_locks_on_next_timeout() {
        let mut lockout = boot(storage_with_count(4));
        lockout.on_watchdog_timeout();

        assert_eq!(lockout.timeout_count(), 5);
        assert_eq!(lockout.mode(), SystemMode::Locked);
        assert!(lockout.is_button_latched());

        lockout.on_blink_tick();
        lockout.on_blink_tick();
        lockout.on_blink_tick();
        assert_eq!(lockout.fault_toggles(), 3);
    }

    #[test]
    fn test_scenario_press_at_three_resets() {
        let mut lockout = boot(storage_with_count(3));

        assert_eq!(lockout.on_button_edge(ButtonEdge::Pressed), EdgeOutcome::Accepted);
        assert_eq!(lockout.timeout_count(), 0);
        assert_eq!(lockout.mode(), SystemMode::Running);
        assert_eq!(lockout.supervisor.watchdog().restarts, 1);
    }

    #[test]
    fn test_no_blink_while_running() {
        let mut lockout = boot(MemoryStorage::default());
        for _ in 0..100 {
            lockout.on_blink_tick();
        }
        assert_eq!(lockout.fault_toggles(), 0);
    }

    #[test]
    fn test_presses_between_timeouts_never_lock() {
        let mut lockout = boot(MemoryStorage::default());
        for _ in 0..50 {
            lockout.on_watchdog_timeout();
            lockout.on_button_edge(ButtonEdge::Pressed);
            lockout.on_button_edge(ButtonEdge::Released);
            lockout.on_debounce_elapsed();
        }
        assert_eq!(lockout.mode(), SystemMode::Running);
        assert_eq!(lockout.timeout_count(), 0);
        assert_eq!(lockout.accepted_presses(), 50);
    }

    #[test]
    fn test_count_survives_reset() {
        let mut lockout = boot(MemoryStorage::default());
        lockout.on_watchdog_timeout();
        lockout.on_watchdog_timeout();

        let lockout = reset(lockout);
        assert_eq!(lockout.boot_kind(), BootKind::Restored);
        assert_eq!(lockout.timeout_count(), 2);
        assert_eq!(lockout.mode(), SystemMode::Running);
        assert_eq!(lockout.serial(), "Boot: watchdog timeouts 2/5\r\n");
    }

    #[test]
    fn test_lock_survives_reset() {
        let mut lockout = boot(storage_with_count(4));
        lockout.on_watchdog_timeout();
        assert_eq!(lockout.mode(), SystemMode::Locked);

        let mut lockout = reset(lockout);
        assert_eq!(lockout.mode(), SystemMode::Locked);
        assert_eq!(lockout.timeout_count(), 5);
        // The button was never switched on during this boot
        assert!(!lockout.gate.button().enabled);
        assert_eq!(lockout.gate.button().enables, 0);
        assert_eq!(
            lockout.on_button_edge(ButtonEdge::Pressed),
            EdgeOutcome::IgnoredLocked
        );
        assert_eq!(
            lockout.serial(),
            "Boot: watchdog timeouts 5/5\r\nSystem locked after 5 watchdog timeouts\r\n"
        );
    }

    #[test]
    fn test_shutdown_stops_all_timers() {
        let mut lockout = boot(MemoryStorage::default());
        lockout.on_button_edge(ButtonEdge::Pressed);

        let parts = lockout.shutdown();
        assert!(parts.watchdog.stopped);
        assert_eq!(parts.debounce_timer.armed, None);
        assert_eq!(parts.blink_timer.armed, None);
    }

    #[test]
    fn test_broken_led_fails_boot() {
        let mut parts = parts(MemoryStorage::default());
        parts.led.broken = true;
        let result = Lockout::start(parts, LockoutConfig::DEFAULT);
        assert!(matches!(result, Err(LockoutError::Output(_))));
    }
}
