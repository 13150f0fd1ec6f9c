//! esp-hal drivers behind the `lockout-core` capability traits
//!
//! The watchdog, LED, UART and flash are owned by the lockout context. The
//! button and both timers also need their interrupt flags acknowledged from
//! the vector before the context runs, so they live in statics of their own
//! and the context only gets zero-sized handles to them.

use core::time::Duration;

use esp_hal::Blocking;
use esp_hal::gpio::{Event, Input, InputConfig, Io, Level, Output, OutputConfig, Pull};
use esp_hal::interrupt::InterruptHandler;
use esp_hal::peripherals::Peripherals;
use esp_hal::rtc_cntl::{Rtc, RwdtStage};
use esp_hal::timer::timg::TimerGroup;
use esp_hal::timer::{OneShotTimer, PeriodicTimer};
use esp_hal::uart::{ConfigError, Uart};
use esp_storage::FlashStorage;
use log::{error, warn};

use lockout_core::critical::timed_sequence;
use lockout_core::hal::{ButtonEdge, ButtonInterrupt, Timer, TimerMode, Watchdog};
use lockout_core::shared::Shared;
use lockout_core::{Board, BoardParts};

use crate::pins;

static BUTTON_PIN: Shared<Input<'static>> = Shared::new();
static DEBOUNCE_TIMER: Shared<OneShotTimer<'static, Blocking>> = Shared::new();
static BLINK_TIMER: Shared<PeriodicTimer<'static, Blocking>> = Shared::new();

fn hal_duration(duration: Duration) -> esp_hal::time::Duration {
    esp_hal::time::Duration::from_millis(duration.as_millis() as u64)
}

/// The RTC watchdog with only its interrupt stage in use
pub struct SupervisoryWatchdog {
    rtc: Rtc<'static>,
}

impl Watchdog for SupervisoryWatchdog {
    fn start(&mut self, timeout: Duration) {
        let rwdt = &mut self.rtc.rwdt;
        // Enabling loads the default stage 0 action (system reset), so the
        // interrupt action has to be in place before anything can expire.
        timed_sequence(|| {
            rwdt.set_timeout(RwdtStage::Stage0, hal_duration(timeout));
            rwdt.enable();
            rwdt.listen();
            rwdt.feed();
        });
    }

    fn rearm_interrupt(&mut self) {
        let rwdt = &mut self.rtc.rwdt;
        rwdt.clear_interrupt();
        rwdt.feed();
    }

    fn restart(&mut self) {
        self.rtc.rwdt.feed();
    }

    fn stop(&mut self) {
        self.rtc.rwdt.disable();
    }
}

/// Handle to the one-shot debounce timer
pub struct DebounceTimer;

impl Timer for DebounceTimer {
    fn arm(&mut self, mode: TimerMode, duration: Duration) {
        if mode != TimerMode::OneShot {
            warn!("Debounce timer only runs one-shot, ignoring {:?}", mode);
        }
        DEBOUNCE_TIMER.with(|timer| {
            timer.clear_interrupt();
            if let Err(e) = timer.schedule(hal_duration(duration)) {
                error!("Failed to arm debounce timer: {:?}", e);
                return;
            }
            timer.listen();
        });
    }

    fn disarm(&mut self) {
        DEBOUNCE_TIMER.with(|timer| {
            timer.unlisten();
            timer.stop();
        });
    }
}

/// Handle to the periodic blink timer
pub struct BlinkTimer;

impl Timer for BlinkTimer {
    fn arm(&mut self, mode: TimerMode, duration: Duration) {
        if mode != TimerMode::Periodic {
            warn!("Blink timer only runs periodic, ignoring {:?}", mode);
        }
        BLINK_TIMER.with(|timer| {
            if let Err(e) = timer.start(hal_duration(duration)) {
                error!("Failed to arm blink timer: {:?}", e);
                return;
            }
            timer.listen();
        });
    }

    fn disarm(&mut self) {
        BLINK_TIMER.with(|timer| {
            timer.unlisten();
            timer.stop();
        });
    }
}

/// Handle to the button's pin-change interrupt
pub struct ButtonLine;

impl ButtonInterrupt for ButtonLine {
    fn enable_interrupt(&mut self) {
        BUTTON_PIN.with(|pin| {
            // Drop any edge latched while disabled
            pin.clear_interrupt();
            pin.listen(Event::AnyEdge);
        });
    }

    fn disable_interrupt(&mut self) {
        BUTTON_PIN.with(|pin| pin.unlisten());
    }
}

/// Acknowledge a button interrupt and read which way the button moved.
///
/// Returns `None` if the button did not raise the interrupt.
pub fn take_button_edge() -> Option<ButtonEdge> {
    BUTTON_PIN
        .with(|pin| {
            if !pin.is_interrupt_set() {
                return None;
            }
            pin.clear_interrupt();
            Some(if pin.is_low() {
                ButtonEdge::Pressed
            } else {
                ButtonEdge::Released
            })
        })
        .flatten()
}

pub fn acknowledge_debounce() {
    DEBOUNCE_TIMER.with(|timer| timer.clear_interrupt());
}

pub fn acknowledge_blink() {
    BLINK_TIMER.with(|timer| timer.clear_interrupt());
}

pub struct EspBoard;

impl Board for EspBoard {
    type Watchdog = SupervisoryWatchdog;
    type Button = ButtonLine;
    type DebounceTimer = DebounceTimer;
    type BlinkTimer = BlinkTimer;
    type Led = Output<'static>;
    type Serial = Uart<'static, Blocking>;
    type Storage = FlashStorage<'static>;
}

/// Interrupt vectors to bind, one per source
pub struct InterruptHandlers {
    pub watchdog: InterruptHandler,
    pub button: InterruptHandler,
    pub debounce: InterruptHandler,
    pub blink: InterruptHandler,
}

/// Claim the board's peripherals and bind the interrupt vectors.
///
/// Nothing is enabled at peripheral level yet; that happens when the lockout
/// context starts.
pub fn take(
    peripherals: Peripherals,
    handlers: InterruptHandlers,
) -> Result<BoardParts<EspBoard>, ConfigError> {
    let mut rtc = Rtc::new(peripherals.LPWR);
    rtc.set_interrupt_handler(handlers.watchdog);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut debounce = OneShotTimer::new(timg0.timer0);
    debounce.set_interrupt_handler(handlers.debounce);
    let mut blink = PeriodicTimer::new(timg0.timer1);
    blink.set_interrupt_handler(handlers.blink);

    let mut io = Io::new(peripherals.IO_MUX);
    io.set_interrupt_handler(handlers.button);
    let button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );

    let led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());

    let serial = Uart::new(peripherals.UART0, pins::serial_config())?
        .with_tx(peripherals.GPIO43)
        .with_rx(peripherals.GPIO44);

    let storage = FlashStorage::new(peripherals.FLASH);

    BUTTON_PIN.install(button);
    DEBOUNCE_TIMER.install(debounce);
    BLINK_TIMER.install(blink);

    Ok(BoardParts {
        watchdog: SupervisoryWatchdog { rtc },
        button: ButtonLine,
        debounce_timer: DebounceTimer,
        blink_timer: BlinkTimer,
        led,
        serial,
        storage,
    })
}
