//! Timeout counter persisted in non-volatile memory
//!
//! ## Layout
//!
//! Two bytes starting at the configured address:
//!
//! | offset | content                         |
//! |--------|---------------------------------|
//! | 0      | consecutive timeouts (`0..=max`) |
//! | 1      | [`FORMAT_MARKER`]               |
//!
//! A missing marker means nothing has written the record since the device
//! was flashed. That is the only case in which the count is set to zero
//! without a liveness press.

use core::fmt::Debug;

use embedded_storage::Storage;
use log::{error, info, warn};

use crate::error::LockoutError;

/// Marks an initialized counter record.
pub const FORMAT_MARKER: u8 = 0xA5;

/// How the counter came up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootKind {
    /// No record existed, the count was initialized to zero
    FirstBoot,
    /// The count was restored from a previous run
    Restored,
}

/// Timeout count cached in RAM and written through to storage
pub struct PersistentCounter<S> {
    storage: S,
    address: u32,
    max: u8,
    value: u8,
}

impl<S> PersistentCounter<S>
where
    S: Storage,
    S::Error: Debug,
{
    /// Read the counter record, initializing it on first boot.
    ///
    /// A stored count above `max` can only come from corruption and is
    /// clamped to `max`, so a damaged record fails towards locking.
    pub fn load(mut storage: S, address: u32, max: u8) -> Result<(Self, BootKind), LockoutError> {
        let mut record = [0u8; 2];
        storage.read(address, &mut record).map_err(|e| {
            error!("Failed to read counter record at {}: {:?}", address, e);
            LockoutError::storage(address, &e)
        })?;

        let [stored, marker] = record;

        if marker != FORMAT_MARKER {
            info!("No counter record at {}, initializing to 0", address);
            storage.write(address, &[0, FORMAT_MARKER]).map_err(|e| {
                error!("Failed to initialize counter record at {}: {:?}", address, e);
                LockoutError::storage(address, &e)
            })?;

            let counter = Self {
                storage,
                address,
                max,
                value: 0,
            };
            return Ok((counter, BootKind::FirstBoot));
        }

        let value = if stored > max {
            warn!("Stored timeout count {} exceeds {}, clamping", stored, max);
            max
        } else {
            stored
        };

        let counter = Self {
            storage,
            address,
            max,
            value,
        };
        Ok((counter, BootKind::Restored))
    }

    /// Current count
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Whether the count has reached its maximum
    pub fn is_exhausted(&self) -> bool {
        self.value >= self.max
    }

    /// Add one timeout and persist it. Never exceeds the maximum.
    ///
    /// The RAM copy is updated even if the write fails, so the current power
    /// cycle still locks on time.
    pub fn increment(&mut self) -> Result<u8, LockoutError> {
        self.value = self.value.saturating_add(1).min(self.max);
        self.persist()?;
        Ok(self.value)
    }

    /// Clear the count and persist it.
    pub fn reset(&mut self) -> Result<(), LockoutError> {
        self.value = 0;
        self.persist()
    }

    /// Get a reference to the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Give the storage back, e.g. to reload it after a simulated reset
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&mut self) -> Result<(), LockoutError> {
        self.storage
            .write(self.address, &[self.value])
            .map_err(|e| LockoutError::storage(self.address, &e))
    }
}
