//! Scoped interrupt masking for timed register sequences
//!
//! Some peripheral updates only work if a handful of writes land back to back
//! (a watchdog change-enable followed by the new configuration, for
//! example). [`InterruptGuard`] masks interrupts for as long as it lives and
//! restores the previous state when dropped, on every exit path.

use core::marker::PhantomData;

use critical_section::RestoreState;

/// Interrupts stay masked while this guard is alive.
///
/// Guards are released in the reverse order they were acquired as long as
/// they are only ever held on the stack, which is why the type is neither
/// `Send` nor `Clone`. Do not `mem::forget` a guard.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct InterruptGuard {
    state: RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl InterruptGuard {
    /// Mask interrupts until the returned guard is dropped
    pub fn acquire() -> Self {
        // SAFETY: the matching release happens in Drop, and the guard cannot
        // leave the current thread, so nesting stays properly ordered.
        let state = unsafe { critical_section::acquire() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        // SAFETY: `state` came from the acquire in `InterruptGuard::acquire`.
        unsafe { critical_section::release(self.state) };
    }
}

/// Run `f` with interrupts masked.
pub fn timed_sequence<R>(f: impl FnOnce() -> R) -> R {
    let _guard = InterruptGuard::acquire();
    f()
}
