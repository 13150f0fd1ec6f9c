//! Simulated EEPROM contents kept on disk between runs

use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use lockout_core::storage::MemoryStorage;

/// Environment variable naming the image file
pub const IMAGE_PATH_VAR: &str = "LOCKOUT_SIM_IMAGE";

/// Image file used when the variable is unset
pub const DEFAULT_IMAGE_PATH: &str = "lockout-nv.bin";

/// Load the NV image, or start from erased memory if there is none.
///
/// An unreadable or corrupt image is treated like a blank part.
pub fn load(path: &Path) -> MemoryStorage {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("No NV image at {}, starting erased", path.display());
            return MemoryStorage::default();
        }
        Err(e) => {
            warn!("Failed to read NV image {}: {}", path.display(), e);
            return MemoryStorage::default();
        }
    };

    match postcard::from_bytes(&bytes) {
        Ok(storage) => {
            info!("Loaded NV image from {}", path.display());
            storage
        }
        Err(e) => {
            warn!("Corrupt NV image {}: {}", path.display(), e);
            MemoryStorage::default()
        }
    }
}

pub fn save(path: &Path, storage: &MemoryStorage) -> io::Result<()> {
    let bytes = postcard::to_allocvec(storage).map_err(io::Error::other)?;
    fs::write(path, bytes)
}
