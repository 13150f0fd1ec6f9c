//! Static home for the context shared by interrupt handlers
//!
//! Interrupt vectors are plain functions, so the context they operate on has
//! to live in a `static`. [`Shared`] is that static: it starts empty, gets
//! the context installed once at boot, and lends it out inside a critical
//! section so handler bodies never interleave.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

pub struct Shared<T> {
    inner: CriticalSectionMutex<RefCell<Option<T>>>,
}

impl<T> Shared<T> {
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionMutex::new(RefCell::new(None)),
        }
    }

    /// Install the value, returning the one it replaced
    pub fn install(&self, value: T) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().replace(value))
    }

    /// Remove and return the value
    pub fn take(&self) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    /// Run `f` on the value with interrupts masked.
    ///
    /// Returns `None` when nothing is installed yet, which happens if an
    /// interrupt fires between enabling it and installing the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.lock(|cell| cell.borrow_mut().as_mut().map(f))
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self::new()
    }
}
