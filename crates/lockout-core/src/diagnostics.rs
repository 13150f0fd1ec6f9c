//! Diagnostic lines written to the serial console
//!
//! Every event worth reporting is a [`Diagnostic`]. The [`Console`] renders it
//! as one CRLF-terminated line on the serial port and mirrors it to the log.
//! Serial output is fire-and-forget: a failed write is logged and dropped.

use core::fmt::{self, Write};

use log::{info, warn};

/// Reportable events of the lockout state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Setup finished with the restored (or freshly initialized) count
    Boot { count: u8, max: u8, first_boot: bool },
    /// The supervisory timer expired without a check-in
    Timeout { count: u8, max: u8 },
    /// A liveness press reset the watchdog and the count
    LivenessReset,
    /// The device entered the terminal locked mode
    Locked { count: u8 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Boot {
                count,
                max,
                first_boot: true,
            } => write!(f, "Boot: first start, watchdog timeouts {}/{}", count, max),
            Self::Boot { count, max, .. } => {
                write!(f, "Boot: watchdog timeouts {}/{}", count, max)
            }
            Self::Timeout { count, max } => write!(f, "Watchdog timeout {}/{}", count, max),
            Self::LivenessReset => f.write_str("Watchdog reset performed"),
            Self::Locked { count } => {
                write!(f, "System locked after {} watchdog timeouts", count)
            }
        }
    }
}

/// Serial console for diagnostics
pub struct Console<W> {
    serial: W,
}

impl<W: Write> Console<W> {
    pub fn new(serial: W) -> Self {
        Self { serial }
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        info!("{}", diagnostic);
        if write!(self.serial, "{}\r\n", diagnostic).is_err() {
            warn!("Serial write failed, dropped diagnostic: {:?}", diagnostic);
        }
    }

    /// Get a reference to the serial sink
    pub fn serial(&self) -> &W {
        &self.serial
    }

    pub fn into_inner(self) -> W {
        self.serial
    }
}
