//! Recording peripherals for host tests

use core::cell::Cell;
use core::time::Duration;

use alloc::string::String;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin};
use embedded_storage::{ReadStorage, Storage};

use crate::hal::{ButtonInterrupt, Timer, TimerMode, Watchdog};
use crate::lockout::Board;
use crate::storage::{MemoryStorage, MemoryStorageError};

#[derive(Debug, Default)]
pub struct MockWatchdog {
    pub period: Option<Duration>,
    pub rearms: u32,
    pub restarts: u32,
    pub stopped: bool,
}

impl Watchdog for MockWatchdog {
    fn start(&mut self, timeout: Duration) {
        self.period = Some(timeout);
        self.stopped = false;
    }

    fn rearm_interrupt(&mut self) {
        self.rearms += 1;
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

#[derive(Debug, Default)]
pub struct MockTimer {
    pub armed: Option<(TimerMode, Duration)>,
    pub arms: u32,
}

impl Timer for MockTimer {
    fn arm(&mut self, mode: TimerMode, duration: Duration) {
        self.armed = Some((mode, duration));
        self.arms += 1;
    }

    fn disarm(&mut self) {
        self.armed = None;
    }
}

#[derive(Debug, Default)]
pub struct MockButton {
    pub enabled: bool,
    pub enables: u32,
}

impl ButtonInterrupt for MockButton {
    fn enable_interrupt(&mut self) {
        self.enabled = true;
        self.enables += 1;
    }

    fn disable_interrupt(&mut self) {
        self.enabled = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLedError;

impl embedded_hal::digital::Error for MockLedError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
pub struct MockLed {
    pub high: bool,
    pub broken: bool,
}

impl ErrorType for MockLed {
    type Error = MockLedError;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(MockLedError);
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.broken {
            return Err(MockLedError);
        }
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for MockLed {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Memory whose writes can be made to fail
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail: Cell<bool>,
}

impl FlakyStorage {
    pub fn fail_writes(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl ReadStorage for FlakyStorage {
    type Error = MemoryStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl Storage for FlakyStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(MemoryStorageError::OutOfBounds {
                offset,
                len: bytes.len(),
            });
        }
        self.inner.write(offset, bytes)
    }
}

pub struct MockBoard;

impl Board for MockBoard {
    type Watchdog = MockWatchdog;
    type Button = MockButton;
    type DebounceTimer = MockTimer;
    type BlinkTimer = MockTimer;
    type Led = MockLed;
    type Serial = String;
    type Storage = MemoryStorage;
}
