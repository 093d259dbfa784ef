//! AVR CPU core: status register and stack pointer
//!
//! The status register flags are ordinary bitfields, so the global interrupt
//! enable is handled with the same primitives as any peripheral field (see
//! [`CriticalSection`]).

use core::marker::PhantomData;

use avrio_hal::{register8, DataBus, Flag, InterruptGuard, Mmio, Pair, Register8};

register8! {
    /// Stack pointer low byte
    pub SPL @ 0x5D;
    /// Stack pointer high byte
    pub SPH @ 0x5E;
    /// Status register
    pub SREG @ 0x5F;
}

/// SPH:SPL
pub type StackPointer<B = Mmio> = Pair<SPL<B>, SPH<B>>;

/// Interrupts disabled until dropped; restores SREG as it was.
pub type CriticalSection<B = Mmio> = InterruptGuard<SREG<B>>;

type GlobalInterruptEnable<B> = Flag<SREG<B>, 7>;
type BitCopyStorage<B> = Flag<SREG<B>, 6>;
type HalfCarry<B> = Flag<SREG<B>, 5>;
type Sign<B> = Flag<SREG<B>, 4>;
type TwosComplementOverflow<B> = Flag<SREG<B>, 3>;
type Negative<B> = Flag<SREG<B>, 2>;
type Zero<B> = Flag<SREG<B>, 1>;
type Carry<B> = Flag<SREG<B>, 0>;

/// Handle to the CPU core registers.
#[derive(Debug, Clone, Copy)]
pub struct Cpu<B = Mmio>(PhantomData<fn() -> B>);

impl<B> Cpu<B> {
    /// Handle to the CPU core registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for Cpu<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus> Cpu<B> {
    /// Raw SREG contents.
    pub fn status(&self) -> u8 {
        SREG::<B>::read()
    }

    /// Global interrupt enable (I). Cleared by hardware on interrupt entry,
    /// set again by RETI.
    pub fn interrupts_enabled(&self) -> bool {
        GlobalInterruptEnable::<B>::get()
    }

    /// Set or clear I. Prefer [`Cpu::critical_section`] for scoped disabling.
    pub fn set_interrupts_enabled(&self, enabled: bool) {
        GlobalInterruptEnable::<B>::set(enabled);
    }

    /// Bit copy storage (T), the operand of BLD and BST.
    pub fn bit_copy_storage(&self) -> bool {
        BitCopyStorage::<B>::get()
    }

    /// Set T.
    pub fn set_bit_copy_storage(&self, value: bool) {
        BitCopyStorage::<B>::set(value);
    }

    /// H: half carry flag.
    pub fn half_carry(&self) -> bool {
        HalfCarry::<B>::get()
    }

    /// Set H.
    pub fn set_half_carry(&self, value: bool) {
        HalfCarry::<B>::set(value);
    }

    /// Sign (S), always N xor V after an arithmetic instruction.
    pub fn sign(&self) -> bool {
        Sign::<B>::get()
    }

    /// Set S.
    pub fn set_sign(&self, value: bool) {
        Sign::<B>::set(value);
    }

    /// V: two's complement overflow flag.
    pub fn twos_complement_overflow(&self) -> bool {
        TwosComplementOverflow::<B>::get()
    }

    /// Set V.
    pub fn set_twos_complement_overflow(&self, value: bool) {
        TwosComplementOverflow::<B>::set(value);
    }

    /// N: negative flag.
    pub fn negative(&self) -> bool {
        Negative::<B>::get()
    }

    /// Set N.
    pub fn set_negative(&self, value: bool) {
        Negative::<B>::set(value);
    }

    /// Z: zero flag.
    pub fn zero(&self) -> bool {
        Zero::<B>::get()
    }

    /// Set Z.
    pub fn set_zero(&self, value: bool) {
        Zero::<B>::set(value);
    }

    /// C: carry flag.
    pub fn carry(&self) -> bool {
        Carry::<B>::get()
    }

    /// Set C.
    pub fn set_carry(&self, value: bool) {
        Carry::<B>::set(value);
    }

    /// SPH:SPL.
    pub fn stack_pointer(&self) -> u16 {
        StackPointer::<B>::read()
    }

    /// Move the stack pointer. Both halves are written with interrupts off
    /// so no interrupt can push onto a half-updated stack.
    pub fn set_stack_pointer(&self, value: u16) {
        let _cs = self.critical_section();
        StackPointer::<B>::write(value);
    }

    /// Disable interrupts until the returned guard is dropped.
    pub fn critical_section(&self) -> CriticalSection<B> {
        CriticalSection::<B>::acquire()
    }

    /// Run `f` with interrupts disabled.
    pub fn interrupt_free<T>(&self, f: impl FnOnce() -> T) -> T {
        avrio_hal::interrupt::free::<SREG<B>, T>(f)
    }
}

/// Run `f` with interrupts disabled on the device.
#[inline(always)]
pub fn interrupt_free<T>(f: impl FnOnce() -> T) -> T {
    avrio_hal::interrupt::free::<SREG<Mmio>, T>(f)
}

/// Disable interrupts and return SREG as it was. The caller owns the
/// restore: pass the value to [`restore_interrupts`].
#[cfg(any(test, feature = "critical-section-impl"))]
fn disable_interrupts<B: DataBus>() -> u8 {
    let guard = CriticalSection::<B>::acquire();
    let saved = guard.saved();
    core::mem::forget(guard);
    saved
}

#[cfg(any(test, feature = "critical-section-impl"))]
fn restore_interrupts<B: DataBus>(saved: u8) {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
    SREG::<B>::write(saved);
}

#[cfg(feature = "critical-section-impl")]
mod critical_section_impl {
    use avrio_hal::Mmio;
    use critical_section::RawRestoreState;

    use super::{disable_interrupts, restore_interrupts};

    struct SregCriticalSection;
    critical_section::set_impl!(SregCriticalSection);

    unsafe impl critical_section::Impl for SregCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            disable_interrupts::<Mmio>()
        }

        unsafe fn release(saved: RawRestoreState) {
            restore_interrupts::<Mmio>(saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::Sim;

    #[test]
    fn test_status_flags() {
        Sim::reset();
        let cpu = Cpu::<Sim>::new();

        cpu.set_carry(true);
        cpu.set_zero(true);
        cpu.set_twos_complement_overflow(true);
        assert_eq!(cpu.status(), 0b0000_1011);

        cpu.set_zero(false);
        cpu.set_bit_copy_storage(true);
        assert_eq!(cpu.status(), 0b0100_1001);
        assert!(cpu.bit_copy_storage());
        assert!(cpu.twos_complement_overflow());
        assert!(!cpu.sign());
    }

    #[test]
    fn test_critical_section_restores_sreg() {
        Sim::reset();
        let cpu = Cpu::<Sim>::new();
        cpu.set_interrupts_enabled(true);
        cpu.set_carry(true);

        let inside = cpu.interrupt_free(|| cpu.interrupts_enabled());

        assert!(!inside);
        assert!(cpu.interrupts_enabled());
        assert_eq!(Sim::peek(0x5F), 0b1000_0001);
    }

    #[test]
    fn test_raw_critical_section_nests() {
        Sim::reset();
        Sim::poke(0x5F, 0b1000_0001);

        let outer = disable_interrupts::<Sim>();
        assert_eq!(outer, 0b1000_0001);
        assert_eq!(Sim::peek(0x5F), 0b0000_0001);

        let inner = disable_interrupts::<Sim>();
        assert_eq!(inner, 0b0000_0001);
        restore_interrupts::<Sim>(inner);
        assert_eq!(Sim::peek(0x5F), 0b0000_0001);

        restore_interrupts::<Sim>(outer);
        assert_eq!(Sim::peek(0x5F), 0b1000_0001);
    }

    #[test]
    fn test_stack_pointer() {
        Sim::reset();
        let cpu = Cpu::<Sim>::new();
        cpu.set_interrupts_enabled(true);

        cpu.set_stack_pointer(0x08FF);

        assert_eq!(cpu.stack_pointer(), 0x08FF);
        assert_eq!(Sim::peek(0x5E), 0x08);
        assert_eq!(Sim::peek(0x5D), 0xFF);
        assert!(cpu.interrupts_enabled());
    }
}
