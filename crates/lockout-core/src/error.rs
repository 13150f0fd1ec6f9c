//! Error types for the lockout core

use core::fmt::{Debug, Write};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockoutError {
    #[error("Non-volatile storage failed at address {address}: {details}")]
    Storage {
        address: u32,
        details: heapless::String<64>,
    },
    #[error("Fault output failed: {0}")]
    Output(heapless::String<64>),
}

impl LockoutError {
    pub fn storage(address: u32, err: &impl Debug) -> Self {
        Self::Storage {
            address,
            details: describe(err),
        }
    }

    pub fn output(err: &impl Debug) -> Self {
        Self::Output(describe(err))
    }
}

/// Render a driver error into a bounded string.
fn describe(err: &impl Debug) -> heapless::String<64> {
    let mut details = heapless::String::new();
    // A detail that does not fit is dropped, the variant still says what failed.
    let _ = write!(details, "{:?}", err);
    details
}
