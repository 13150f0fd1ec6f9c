//! In-memory non-volatile storage
//!
//! [`MemoryStorage`] stands in for EEPROM or flash wherever there is no real
//! part: host tests and the simulator. It starts erased (all `0xFF`) like a
//! freshly flashed device, and serializes with serde so the simulator can
//! keep an image between runs.

use alloc::vec;
use alloc::vec::Vec;

use embedded_storage::{ReadStorage, Storage};
use serde::{Deserialize, Serialize};

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// Default capacity, matching a 1 KiB EEPROM.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryStorageError {
    /// The access ran past the end of the memory
    OutOfBounds { offset: u32, len: usize },
}

/// Byte-addressable storage held in RAM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
    /// Number of write operations performed, for endurance bookkeeping
    writes: u32,
}

impl MemoryStorage {
    /// Create an erased memory of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
            writes: 0,
        }
    }

    /// Erase every byte, as reflashing the device would
    pub fn erase(&mut self) {
        self.bytes.fill(ERASED);
    }

    /// Number of write operations since creation
    pub fn write_count(&self) -> u32 {
        self.writes
    }

    /// Raw view of the memory contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MemoryStorageError> {
        let start = offset as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryStorageError::OutOfBounds { offset, len }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ReadStorage for MemoryStorage {
    type Error = MemoryStorageError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for MemoryStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        self.writes = self.writes.saturating_add(1);
        Ok(())
    }
}
