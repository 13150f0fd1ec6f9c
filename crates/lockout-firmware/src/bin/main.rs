#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]

use esp_hal::clock::CpuClock;
use esp_hal::handler;
use esp_hal::main;
use log::{LevelFilter, info};

use lockout_core::Lockout;
use lockout_core::critical::InterruptGuard;
use lockout_core::shared::Shared;
use lockout_firmware::board::{self, EspBoard, InterruptHandlers};
use lockout_firmware::pins;

/// Everything the interrupt handlers operate on
static LOCKOUT: Shared<Lockout<EspBoard>> = Shared::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[handler]
fn on_watchdog() {
    LOCKOUT.with(|lockout| lockout.on_watchdog_timeout());
}

#[handler]
fn on_button() {
    if let Some(edge) = board::take_button_edge() {
        LOCKOUT.with(|lockout| lockout.on_button_edge(edge));
    }
}

#[handler]
fn on_debounce() {
    board::acknowledge_debounce();
    LOCKOUT.with(|lockout| lockout.on_debounce_elapsed());
}

#[handler]
fn on_blink() {
    board::acknowledge_blink();
    LOCKOUT.with(|lockout| lockout.on_blink_tick());
}

#[main]
fn main() -> ! {
    rtt_target::rtt_init_log!(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 4096);

    let parts = board::take(
        peripherals,
        InterruptHandlers {
            watchdog: on_watchdog,
            button: on_button,
            debounce: on_debounce,
            blink: on_blink,
        },
    )
    .expect("Failed to configure the serial port");

    {
        // No handler may run before the context is installed
        let _guard = InterruptGuard::acquire();
        let lockout = Lockout::start(parts, pins::lockout_config())
            .expect("Failed to start the lockout context");
        LOCKOUT.install(lockout);
    }

    info!("Lockout running, all work happens in interrupt handlers");

    loop {
        core::hint::spin_loop();
    }
}
