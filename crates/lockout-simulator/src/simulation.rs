//! Event-ordered simulation of the lockout device
//!
//! [`Simulation::advance`] walks the virtual clock forward one due interrupt
//! at a time and dispatches each to the matching [`Lockout`] handler, so
//! handlers observe exactly the timing the hardware would give them.

use std::mem;

use log::{debug, info};

use lockout_core::hal::ButtonEdge;
use lockout_core::liveness::EdgeOutcome;
use lockout_core::storage::MemoryStorage;
use lockout_core::{BoardParts, Lockout, LockoutConfig, LockoutError};

use crate::board::{
    HardwareHandle, SimBoard, SimButton, SimLed, SimSerial, SimTimer, SimWatchdog, Source,
    TimerSlot, VirtualHardware,
};

pub struct Simulation {
    hw: HardwareHandle,
    config: LockoutConfig,
    lockout: Lockout<SimBoard>,
    /// Edges that arrived while the button interrupt was off
    dropped_edges: u32,
}

impl Simulation {
    /// Power the device on with the given non-volatile memory
    pub fn power_on(storage: MemoryStorage) -> Result<Self, LockoutError> {
        Self::power_on_with(storage, LockoutConfig::DEFAULT)
    }

    pub fn power_on_with(
        storage: MemoryStorage,
        config: LockoutConfig,
    ) -> Result<Self, LockoutError> {
        let hw = VirtualHardware::new_handle();
        let parts = BoardParts::<SimBoard> {
            watchdog: SimWatchdog(hw.clone()),
            button: SimButton(hw.clone()),
            debounce_timer: SimTimer::new(hw.clone(), TimerSlot::Debounce),
            blink_timer: SimTimer::new(hw.clone(), TimerSlot::Blink),
            led: SimLed(hw.clone()),
            serial: SimSerial(hw.clone()),
            storage,
        };

        let lockout = Lockout::start(parts, config)?;
        info!(
            "Powered on in {} mode, timeout count {}",
            lockout.mode().label(),
            lockout.timeout_count()
        );

        Ok(Self {
            hw,
            config,
            lockout,
            dropped_edges: 0,
        })
    }

    /// Milliseconds since power on
    pub fn now_ms(&self) -> u64 {
        self.hw.borrow().now_ms
    }

    pub fn lockout(&self) -> &Lockout<SimBoard> {
        &self.lockout
    }

    /// Let `ms` milliseconds pass, servicing every interrupt that falls due.
    pub fn advance(&mut self, ms: u64) {
        let target = self.now_ms() + ms;

        loop {
            // The borrow must end before dispatch, handlers touch the hardware.
            let due = self.hw.borrow().next_due(target);
            let Some((at, source)) = due else {
                break;
            };

            self.hw.borrow_mut().fire(at, source);
            match source {
                Source::Watchdog => self.lockout.on_watchdog_timeout(),
                Source::Debounce => self.lockout.on_debounce_elapsed(),
                Source::Blink => self.lockout.on_blink_tick(),
            }
        }

        self.hw.borrow_mut().now_ms = target;
    }

    /// Button goes down. Returns `None` if the interrupt was off.
    pub fn press(&mut self) -> Option<EdgeOutcome> {
        self.edge(ButtonEdge::Pressed)
    }

    /// Button comes back up. Returns `None` if the interrupt was off.
    pub fn release(&mut self) -> Option<EdgeOutcome> {
        self.edge(ButtonEdge::Released)
    }

    fn edge(&mut self, edge: ButtonEdge) -> Option<EdgeOutcome> {
        if !self.hw.borrow().button_irq {
            self.dropped_edges += 1;
            debug!("{:?} edge dropped, button interrupt off", edge);
            return None;
        }
        Some(self.lockout.on_button_edge(edge))
    }

    pub fn dropped_edges(&self) -> u32 {
        self.dropped_edges
    }

    pub fn led_is_on(&self) -> bool {
        self.hw.borrow().led_high
    }

    /// Times at which the LED changed level
    #[cfg(test)]
    pub fn led_changes(&self) -> Vec<u64> {
        self.hw.borrow().led_changes.clone()
    }

    /// Drain the serial output written so far
    pub fn take_serial(&mut self) -> String {
        mem::take(&mut self.hw.borrow_mut().serial)
    }

    /// Processor reset: RAM and peripherals start over, NV memory persists.
    pub fn reset(self) -> Result<Self, LockoutError> {
        let config = self.config;
        info!("Processor reset");
        Self::power_on_with(self.into_storage(), config)
    }

    /// Power off and keep only the NV memory
    pub fn into_storage(self) -> MemoryStorage {
        self.lockout.shutdown().storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockout_core::WatchdogTimeout;
    use lockout_core::counter::BootKind;
    use lockout_core::SystemMode;

    const PERIOD: u64 = 8192;
    const WINDOW: u64 = 300;

    fn fresh() -> Simulation {
        Simulation::power_on(MemoryStorage::default()).unwrap()
    }

    fn click(sim: &mut Simulation) -> Option<EdgeOutcome> {
        let outcome = sim.press();
        sim.release();
        outcome
    }

    #[test]
    fn test_regular_presses_never_lock() {
        let mut sim = fresh();

        // Ten minutes with a check-in every eight seconds
        for _ in 0..75 {
            sim.advance(8000);
            assert_eq!(click(&mut sim), Some(EdgeOutcome::Accepted));
        }

        assert_eq!(sim.lockout().mode(), SystemMode::Running);
        assert_eq!(sim.lockout().timeout_count(), 0);
        let serial = sim.take_serial();
        assert!(!serial.contains("Watchdog timeout"));
        assert_eq!(serial.matches("Watchdog reset performed").count(), 75);
    }

    #[test]
    fn test_locks_after_max_consecutive_timeouts() {
        let mut sim = fresh();

        sim.advance(5 * PERIOD - 1);
        assert_eq!(sim.lockout().mode(), SystemMode::Running);
        assert_eq!(sim.lockout().timeout_count(), 4);

        sim.advance(1);
        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
        assert_eq!(sim.lockout().timeout_count(), 5);
        assert_eq!(
            sim.take_serial(),
            "Boot: first start, watchdog timeouts 0/5\r\n\
             Watchdog timeout 1/5\r\n\
             Watchdog timeout 2/5\r\n\
             Watchdog timeout 3/5\r\n\
             Watchdog timeout 4/5\r\n\
             Watchdog timeout 5/5\r\n\
             System locked after 5 watchdog timeouts\r\n"
        );
    }

    #[test]
    fn test_locked_is_terminal_until_reset() {
        let mut sim = fresh();
        sim.advance(5 * PERIOD);
        sim.take_serial();

        sim.advance(10 * PERIOD);
        assert_eq!(click(&mut sim), None);

        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
        assert_eq!(sim.lockout().timeout_count(), 5);
        assert_eq!(sim.take_serial(), "");
    }

    #[test]
    fn test_fault_blinks_only_after_lock() {
        let mut sim = fresh();
        sim.advance(5 * PERIOD - 1);
        assert!(sim.led_changes().is_empty());

        sim.advance(1);
        let locked_at = sim.now_ms();
        sim.advance(1000);

        let changes = sim.led_changes();
        assert_eq!(changes.len(), 20);
        assert!(changes[0] > locked_at);
        assert!(changes[0] - locked_at <= 50);
        assert!(changes.windows(2).all(|w| w[1] - w[0] == 50));
    }

    #[test]
    fn test_bounce_inside_window_is_dropped() {
        let mut sim = fresh();
        sim.advance(1000);

        assert_eq!(sim.press(), Some(EdgeOutcome::Accepted));
        assert!(sim.lockout().is_button_suppressed());

        for gap in [5, 95, 199] {
            sim.advance(gap);
            assert_eq!(sim.press(), None);
        }
        assert_eq!(sim.dropped_edges(), 3);
        assert_eq!(sim.lockout().accepted_presses(), 1);

        // 1000 + 300: the window closes exactly here
        sim.advance(1);
        assert!(!sim.lockout().is_button_suppressed());
        assert_eq!(sim.press(), Some(EdgeOutcome::Accepted));
        assert_eq!(sim.lockout().accepted_presses(), 2);
    }

    #[test]
    fn test_press_restarts_full_countdown() {
        let mut sim = fresh();
        sim.advance(3 * PERIOD + 1000);
        assert_eq!(sim.lockout().timeout_count(), 3);

        assert_eq!(click(&mut sim), Some(EdgeOutcome::Accepted));
        assert_eq!(sim.lockout().timeout_count(), 0);

        sim.advance(PERIOD - 1);
        assert_eq!(sim.lockout().timeout_count(), 0);
        sim.advance(1);
        assert_eq!(sim.lockout().timeout_count(), 1);
    }

    #[test]
    fn test_count_persists_across_reset() {
        let mut sim = fresh();
        sim.advance(3 * PERIOD);

        let mut sim = sim.reset().unwrap();
        assert_eq!(sim.now_ms(), 0);
        assert_eq!(sim.lockout().boot_kind(), BootKind::Restored);
        assert_eq!(sim.lockout().timeout_count(), 3);
        assert_eq!(sim.take_serial(), "Boot: watchdog timeouts 3/5\r\n");

        // Two more misses are enough now
        sim.advance(2 * PERIOD);
        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
    }

    #[test]
    fn test_lock_persists_across_reset() {
        let mut sim = fresh();
        sim.advance(5 * PERIOD);

        let mut sim = sim.reset().unwrap();
        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
        assert_eq!(click(&mut sim), None);

        sim.advance(200);
        assert_eq!(sim.led_changes().len(), 4);
    }

    #[test]
    fn test_erased_memory_boots_fresh() {
        let mut sim = fresh();
        sim.advance(4 * PERIOD);

        let mut storage = sim.into_storage();
        storage.erase();
        let mut sim = Simulation::power_on(storage).unwrap();

        assert_eq!(sim.lockout().boot_kind(), BootKind::FirstBoot);
        assert_eq!(sim.lockout().timeout_count(), 0);
        assert_eq!(
            sim.take_serial(),
            "Boot: first start, watchdog timeouts 0/5\r\n"
        );
    }

    #[test]
    fn test_fourth_count_locks_on_next_timeout() {
        let mut sim = fresh();
        sim.advance(4 * PERIOD);
        let mut sim = sim.reset().unwrap();
        assert_eq!(sim.lockout().timeout_count(), 4);

        sim.advance(PERIOD);
        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
        sim.advance(500);
        assert_eq!(sim.lockout().fault_toggles(), 10);
    }

    #[test]
    fn test_lock_inside_debounce_window_keeps_button_off() {
        // A watchdog period shorter than the debounce window lets the
        // device lock while the window is still open.
        let config = LockoutConfig {
            watchdog_timeout: WatchdogTimeout::Ms16,
            ..LockoutConfig::DEFAULT
        };
        let mut sim = Simulation::power_on_with(MemoryStorage::default(), config).unwrap();

        assert_eq!(click(&mut sim), Some(EdgeOutcome::Accepted));
        sim.advance(5 * 16);
        assert_eq!(sim.lockout().mode(), SystemMode::Locked);
        assert!(sim.lockout().is_button_suppressed());

        sim.advance(WINDOW);
        assert!(!sim.lockout().is_button_suppressed());
        assert!(sim.lockout().is_button_latched());
        assert_eq!(sim.press(), None);
    }

    #[test]
    fn test_led_off_while_running() {
        let mut sim = fresh();
        sim.advance(4 * PERIOD);
        assert!(!sim.led_is_on());
        assert!(sim.led_changes().is_empty());
    }
}
