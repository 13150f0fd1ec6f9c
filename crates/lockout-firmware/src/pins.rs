//! Pin and memory assignment
//!
//! | Signal        | Pin     | Notes                              |
//! |---------------|---------|------------------------------------|
//! | Fault LED     | GPIO2   | Active high                        |
//! | Button        | GPIO0   | BOOT button, active low, pull-up   |
//! | Serial TX     | GPIO43  | UART0, 9600 baud                   |
//! | Serial RX     | GPIO44  | UART0, unused                      |
//!
//! esp-hal hands out pins as distinct peripheral types, so the pins
//! themselves are picked in [`crate::board::take`]; this table and the
//! constants below are the single reference for them.

use esp_hal::uart;
use lockout_core::LockoutConfig;
use lockout_core::config::{COUNTER_ADDRESS, SERIAL_BAUD};

/// Start of the default NVS partition, where the counter bytes live
pub const NV_REGION_BASE: u32 = 0x9000;

/// UART settings for the diagnostic line
pub fn serial_config() -> uart::Config {
    uart::Config::default().with_baudrate(SERIAL_BAUD)
}

/// Lockout configuration with the counter placed inside the NV region
pub const fn lockout_config() -> LockoutConfig {
    LockoutConfig {
        counter_address: NV_REGION_BASE + COUNTER_ADDRESS,
        ..LockoutConfig::DEFAULT
    }
}
