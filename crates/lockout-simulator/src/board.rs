//! Virtual peripherals driven by a simulated clock
//!
//! All peripherals share one [`VirtualHardware`] through an `Rc<RefCell<_>>`,
//! the way real peripherals share one register file. Timers only record
//! deadlines; [`crate::simulation::Simulation`] decides when they fire.

use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use lockout_core::Board;
use lockout_core::hal::{ButtonInterrupt, Timer, TimerMode, Watchdog};
use lockout_core::storage::MemoryStorage;

pub type HardwareHandle = Rc<RefCell<VirtualHardware>>;

/// Interrupt sources, in the order they are serviced when due together
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Watchdog,
    Debounce,
    Blink,
}

/// Identifies one of the two general purpose timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    Debounce,
    Blink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub deadline: u64,
    pub mode: TimerMode,
    pub period: u64,
}

#[derive(Debug, Default)]
pub struct WatchdogState {
    pub enabled: bool,
    /// The timeout interrupt is armed
    pub listening: bool,
    pub period: u64,
    pub deadline: Option<u64>,
}

/// Register-level state of the simulated board
#[derive(Debug, Default)]
pub struct VirtualHardware {
    pub now_ms: u64,
    pub watchdog: WatchdogState,
    pub debounce: Option<ArmedTimer>,
    pub blink: Option<ArmedTimer>,
    pub button_irq: bool,
    pub led_high: bool,
    /// Times at which the LED changed level
    pub led_changes: Vec<u64>,
    pub serial: String,
}

impl VirtualHardware {
    pub fn new_handle() -> HardwareHandle {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Earliest pending interrupt due at or before `until`
    pub fn next_due(&self, until: u64) -> Option<(u64, Source)> {
        let watchdog = self
            .watchdog
            .deadline
            .filter(|_| self.watchdog.enabled && self.watchdog.listening)
            .map(|at| (at, Source::Watchdog));
        let debounce = self.debounce.map(|t| (t.deadline, Source::Debounce));
        let blink = self.blink.map(|t| (t.deadline, Source::Blink));

        [watchdog, debounce, blink]
            .into_iter()
            .flatten()
            .filter(|&(at, _)| at <= until)
            .min()
    }

    /// Advance the clock to `at` and latch the interrupt from `source`.
    pub fn fire(&mut self, at: u64, source: Source) {
        self.now_ms = at;

        match source {
            Source::Watchdog => {
                // Interrupt mode: the interrupt disarms itself and must be re-armed.
                self.watchdog.listening = false;
                self.watchdog.deadline = None;
            }
            Source::Debounce => self.debounce = reload(self.debounce),
            Source::Blink => self.blink = reload(self.blink),
        }
    }

    fn timer_mut(&mut self, slot: TimerSlot) -> &mut Option<ArmedTimer> {
        match slot {
            TimerSlot::Debounce => &mut self.debounce,
            TimerSlot::Blink => &mut self.blink,
        }
    }
}

fn reload(timer: Option<ArmedTimer>) -> Option<ArmedTimer> {
    timer.and_then(|t| match t.mode {
        TimerMode::OneShot => None,
        TimerMode::Periodic => Some(ArmedTimer {
            deadline: t.deadline + t.period,
            ..t
        }),
    })
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

pub struct SimWatchdog(pub HardwareHandle);

impl Watchdog for SimWatchdog {
    fn start(&mut self, timeout: Duration) {
        let mut hw = self.0.borrow_mut();
        let now = hw.now_ms;
        hw.watchdog = WatchdogState {
            enabled: true,
            listening: true,
            period: millis(timeout),
            deadline: Some(now + millis(timeout)),
        };
    }

    fn rearm_interrupt(&mut self) {
        let mut hw = self.0.borrow_mut();
        let now = hw.now_ms;
        hw.watchdog.listening = true;
        hw.watchdog.deadline = Some(now + hw.watchdog.period);
    }

    fn restart(&mut self) {
        let mut hw = self.0.borrow_mut();
        let now = hw.now_ms;
        if hw.watchdog.listening {
            hw.watchdog.deadline = Some(now + hw.watchdog.period);
        }
    }

    fn stop(&mut self) {
        self.0.borrow_mut().watchdog = WatchdogState::default();
    }
}

pub struct SimTimer {
    hw: HardwareHandle,
    slot: TimerSlot,
}

impl SimTimer {
    pub fn new(hw: HardwareHandle, slot: TimerSlot) -> Self {
        Self { hw, slot }
    }
}

impl Timer for SimTimer {
    fn arm(&mut self, mode: TimerMode, duration: Duration) {
        let mut hw = self.hw.borrow_mut();
        let now = hw.now_ms;
        *hw.timer_mut(self.slot) = Some(ArmedTimer {
            deadline: now + millis(duration),
            mode,
            period: millis(duration),
        });
    }

    fn disarm(&mut self) {
        *self.hw.borrow_mut().timer_mut(self.slot) = None;
    }
}

pub struct SimButton(pub HardwareHandle);

impl ButtonInterrupt for SimButton {
    fn enable_interrupt(&mut self) {
        self.0.borrow_mut().button_irq = true;
    }

    fn disable_interrupt(&mut self) {
        self.0.borrow_mut().button_irq = false;
    }
}

pub struct SimLed(pub HardwareHandle);

impl SimLed {
    fn set_level(&mut self, high: bool) {
        let mut hw = self.0.borrow_mut();
        if hw.led_high != high {
            hw.led_high = high;
            let now = hw.now_ms;
            hw.led_changes.push(now);
        }
    }
}

impl ErrorType for SimLed {
    type Error = Infallible;
}

impl OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimLed {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow().led_high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow().led_high)
    }
}

pub struct SimSerial(pub HardwareHandle);

impl fmt::Write for SimSerial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.borrow_mut().serial.push_str(s);
        Ok(())
    }
}

pub struct SimBoard;

impl Board for SimBoard {
    type Watchdog = SimWatchdog;
    type Button = SimButton;
    type DebounceTimer = SimTimer;
    type BlinkTimer = SimTimer;
    type Led = SimLed;
    type Serial = SimSerial;
    type Storage = MemoryStorage;
}
