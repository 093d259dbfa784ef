use core::marker::PhantomData;

use avrio_hal::{register8, DataBus, Mmio};

use super::{ClockSelect, Psrsync, Timer8, Timer8Registers};

register8! {
    /// Timer0 control register A
    pub TCCR0A @ 0x44;
    /// Timer0 control register B
    pub TCCR0B @ 0x45;
    /// Timer0 counter
    pub TCNT0 @ 0x46;
    /// Timer0 output compare register A
    pub OCR0A @ 0x47;
    /// Timer0 output compare register B
    pub OCR0B @ 0x48;
    /// Timer0 interrupt mask register
    pub TIMSK0 @ 0x6E;
    /// Timer0 interrupt flag register
    pub TIFR0 @ 0x35, clear_on_one = 0x07;
}

/// Register set of Timer0.
#[derive(Debug, Clone, Copy)]
pub struct Timer0Registers<B = Mmio>(PhantomData<fn() -> B>);

impl<B: DataBus> Timer8Registers for Timer0Registers<B> {
    type Bus = B;
    type ControlA = TCCR0A<B>;
    type ControlB = TCCR0B<B>;
    type Counter = TCNT0<B>;
    type CompareA = OCR0A<B>;
    type CompareB = OCR0B<B>;
    type InterruptMask = TIMSK0<B>;
    type InterruptFlags = TIFR0<B>;
    type Clock = ClockSelect;
}

/// 8-bit Timer/Counter0 with PWM.
pub type Timer0<B = Mmio> = Timer8<Timer0Registers<B>>;

impl<B: DataBus> Timer8<Timer0Registers<B>> {
    /// Resets the prescaler shared with Timer1. Both timers see the reset.
    pub fn reset_prescaler(&self) {
        Psrsync::<B>::trigger();
    }
}
