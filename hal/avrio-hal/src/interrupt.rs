//! Scoped global-interrupt disable
//!
//! The status register's global interrupt enable is an ordinary bitfield
//! (bit 7 on every AVR core), so a critical section is built from the same
//! register primitives as everything else.

use core::marker::PhantomData;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::field::Flag;
use crate::register::Register8;

/// Global interrupt enable bit in the status register.
pub const GLOBAL_INTERRUPT_ENABLE: u8 = 7;

/// Interrupts stay disabled while this value is alive.
///
/// Creating the guard saves the whole status register and clears the global
/// interrupt enable; dropping it writes the saved value back, so nesting
/// guards is fine and an outer "disabled" state is preserved.
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct InterruptGuard<S: Register8> {
    saved: u8,
    _status: PhantomData<fn() -> S>,
}

impl<S: Register8> InterruptGuard<S> {
    /// Save the status register and clear its global interrupt enable bit.
    pub fn acquire() -> Self {
        let saved = S::read();
        Flag::<S, GLOBAL_INTERRUPT_ENABLE>::set(false);
        compiler_fence(Ordering::SeqCst);
        Self {
            saved,
            _status: PhantomData,
        }
    }

    /// Status register contents at the time the guard was taken.
    pub fn saved(&self) -> u8 {
        self.saved
    }

    /// Whether interrupts were enabled before the guard was taken.
    pub fn were_enabled(&self) -> bool {
        self.saved & (1 << GLOBAL_INTERRUPT_ENABLE) != 0
    }
}

impl<S: Register8> Drop for InterruptGuard<S> {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        S::write(self.saved);
    }
}

impl<S: Register8> core::fmt::Debug for InterruptGuard<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("saved", &self.saved)
            .finish()
    }
}

/// Run `f` with interrupts disabled, restoring the previous state after.
#[inline(always)]
pub fn free<S: Register8, T>(f: impl FnOnce() -> T) -> T {
    let _guard = InterruptGuard::<S>::acquire();
    f()
}
