use core::marker::PhantomData;

use avrio_hal::{register8, DataBus, Flag, Mmio, ReadOnly, Register8};

use super::{AsyncClockSelect, Psrasy, Timer8, Timer8Registers};

register8! {
    /// Timer2 control register A
    pub TCCR2A @ 0xB0;
    /// Timer2 control register B
    pub TCCR2B @ 0xB1;
    /// Timer2 counter
    pub TCNT2 @ 0xB2;
    /// Timer2 output compare register A
    pub OCR2A @ 0xB3;
    /// Timer2 output compare register B
    pub OCR2B @ 0xB4;
    /// Asynchronous status register
    pub ASSR @ 0xB6;
    /// Timer2 interrupt mask register
    pub TIMSK2 @ 0x70;
    /// Timer2 interrupt flag register
    pub TIFR2 @ 0x37, clear_on_one = 0x07;
}

/// Register set of Timer2.
#[derive(Debug, Clone, Copy)]
pub struct Timer2Registers<B = Mmio>(PhantomData<fn() -> B>);

impl<B: DataBus> Timer8Registers for Timer2Registers<B> {
    type Bus = B;
    type ControlA = TCCR2A<B>;
    type ControlB = TCCR2B<B>;
    type Counter = TCNT2<B>;
    type CompareA = OCR2A<B>;
    type CompareB = OCR2B<B>;
    type InterruptMask = TIMSK2<B>;
    type InterruptFlags = TIFR2<B>;
    type Clock = AsyncClockSelect;
}

/// 8-bit Timer/Counter2 with PWM and asynchronous operation.
pub type Timer2<B = Mmio> = Timer8<Timer2Registers<B>>;

type Exclk<B> = Flag<ASSR<B>, 6>;
type As2<B> = Flag<ASSR<B>, 5>;
type Tcn2ub<B> = Flag<ASSR<B>, 4, ReadOnly>;
type Ocr2aub<B> = Flag<ASSR<B>, 3, ReadOnly>;
type Ocr2bub<B> = Flag<ASSR<B>, 2, ReadOnly>;
type Tcr2aub<B> = Flag<ASSR<B>, 1, ReadOnly>;
type Tcr2bub<B> = Flag<ASSR<B>, 0, ReadOnly>;

/// TCN2UB through TCR2BUB.
const UPDATE_BUSY_MASK: u8 = 0b0001_1111;

impl<B: DataBus> Timer8<Timer2Registers<B>> {
    /// Resets the Timer2 prescaler. With the asynchronous clock the bit
    /// stays set until the reset has been performed.
    pub fn reset_prescaler(&self) {
        Psrasy::<B>::trigger();
    }

    /// EXCLK: clock from an external source on TOSC1 instead of a crystal.
    pub fn external_clock_input(&self) -> bool {
        Exclk::<B>::get()
    }

    /// Must be written before asynchronous operation is selected.
    pub fn set_external_clock_input(&self, enabled: bool) {
        Exclk::<B>::set(enabled);
    }

    /// AS2: Timer2 runs from the TOSC1 pin instead of clk_io.
    pub fn asynchronous(&self) -> bool {
        As2::<B>::get()
    }

    /// Switching the clock source may corrupt TCNT2, OCR2x and TCCR2x.
    pub fn set_asynchronous(&self, enabled: bool) {
        As2::<B>::set(enabled);
    }

    /// TCN2UB: a TCNT2 write is still being synchronised.
    pub fn counter_update_busy(&self) -> bool {
        Tcn2ub::<B>::get()
    }

    /// OCR2AUB: an OCR2A write is still being synchronised.
    pub fn compare_a_update_busy(&self) -> bool {
        Ocr2aub::<B>::get()
    }

    /// OCR2BUB: an OCR2B write is still being synchronised.
    pub fn compare_b_update_busy(&self) -> bool {
        Ocr2bub::<B>::get()
    }

    /// TCR2AUB: a TCCR2A write is still being synchronised.
    pub fn control_a_update_busy(&self) -> bool {
        Tcr2aub::<B>::get()
    }

    /// TCR2BUB: a TCCR2B write is still being synchronised.
    pub fn control_b_update_busy(&self) -> bool {
        Tcr2bub::<B>::get()
    }

    /// Spins until every pending asynchronous register write has reached
    /// the timer clock domain.
    pub fn wait_for_async_updates(&self) {
        while ASSR::<B>::read() & UPDATE_BUSY_MASK != 0 {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::Sim;

    fn timer2() -> Timer2<Sim> {
        Sim::reset();
        Timer8::new()
    }

    #[test]
    fn test_reset_prescaler_sets_psrasy() {
        let timer = timer2();

        timer.reset_prescaler();

        assert_eq!(Sim::peek(0x43), 0b0000_0010);
    }

    #[test]
    fn test_async_status_bits() {
        let timer = timer2();
        timer.set_asynchronous(true);
        assert_eq!(Sim::peek(0xB6), 0b0010_0000);
        assert!(!timer.external_clock_input());

        Sim::poke(0xB6, 0b0001_0101);
        assert!(timer.counter_update_busy());
        assert!(!timer.compare_a_update_busy());
        assert!(timer.compare_b_update_busy());
        assert!(!timer.control_a_update_busy());
        assert!(timer.control_b_update_busy());
    }

    #[test]
    fn test_wait_for_async_updates_ignores_clock_bits() {
        let timer = timer2();
        Sim::poke(0xB6, 0b0110_0000);

        timer.wait_for_async_updates();

        assert!(timer.asynchronous());
        assert!(timer.external_clock_input());
    }
}
