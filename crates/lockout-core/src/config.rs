//! Fixed configuration for the lockout state machine
//!
//! Everything here is decided at build time. The running device never
//! changes its periods or limits; [`LockoutConfig`] only exists so the
//! simulator and tests can name the values they run against.

use core::time::Duration;

/// Number of consecutive missed check-ins before the device locks.
pub const MAX_TIMEOUTS: u8 = 5;

/// Suppression window after an accepted button press.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Period of the fault blink timer.
pub const BLINK_PERIOD: Duration = Duration::from_millis(50);

/// Non-volatile address of the timeout counter byte.
pub const COUNTER_ADDRESS: u32 = 100;

/// Baud rate of the diagnostic serial line.
pub const SERIAL_BAUD: u32 = 9600;

/// Supervisory periods supported by the watchdog hardware.
///
/// The watchdog prescaler only offers power-of-two steps, so the period is
/// picked from this set rather than given as an arbitrary duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WatchdogTimeout {
    Ms16,
    Ms32,
    Ms64,
    Ms128,
    Ms256,
    Ms512,
    Ms1024,
    Ms2048,
    Ms4096,
    Ms8192,
}

impl WatchdogTimeout {
    /// Get the period in milliseconds
    pub const fn as_millis(self) -> u32 {
        match self {
            Self::Ms16 => 16,
            Self::Ms32 => 32,
            Self::Ms64 => 64,
            Self::Ms128 => 128,
            Self::Ms256 => 256,
            Self::Ms512 => 512,
            Self::Ms1024 => 1024,
            Self::Ms2048 => 2048,
            Self::Ms4096 => 4096,
            Self::Ms8192 => 8192,
        }
    }

    /// Get the period as a [`Duration`]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.as_millis() as u64)
    }

    /// Pick the longest supported period that does not exceed `millis`.
    ///
    /// Returns `None` when `millis` is shorter than the shortest period.
    pub const fn at_most(millis: u32) -> Option<Self> {
        const ALL: [WatchdogTimeout; 10] = [
            WatchdogTimeout::Ms8192,
            WatchdogTimeout::Ms4096,
            WatchdogTimeout::Ms2048,
            WatchdogTimeout::Ms1024,
            WatchdogTimeout::Ms512,
            WatchdogTimeout::Ms256,
            WatchdogTimeout::Ms128,
            WatchdogTimeout::Ms64,
            WatchdogTimeout::Ms32,
            WatchdogTimeout::Ms16,
        ];

        let mut i = 0;
        while i < ALL.len() {
            if ALL[i].as_millis() <= millis {
                return Some(ALL[i]);
            }
            i += 1;
        }
        None
    }
}

/// Complete set of lockout parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutConfig {
    /// Missed check-ins tolerated before locking
    pub max_timeouts: u8,
    /// Supervisory (watchdog) period
    pub watchdog_timeout: WatchdogTimeout,
    /// Button suppression window after a press
    pub debounce_window: Duration,
    /// Fault blink period
    pub blink_period: Duration,
    /// Non-volatile address of the counter byte
    pub counter_address: u32,
}

impl LockoutConfig {
    /// The configuration the device ships with.
    pub const DEFAULT: Self = Self {
        max_timeouts: MAX_TIMEOUTS,
        watchdog_timeout: WatchdogTimeout::Ms8192,
        debounce_window: DEBOUNCE_WINDOW,
        blink_period: BLINK_PERIOD,
        counter_address: COUNTER_ADDRESS,
    };
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
