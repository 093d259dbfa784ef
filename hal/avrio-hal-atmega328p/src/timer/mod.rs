//! Timer/counters
//!
//! Timer0 and Timer2 are 8-bit timers with the same register layout and
//! share one implementation, [`Timer8`], over the [`Timer8Registers`]
//! trait. They differ only in clock selection: Timer0 can count an external
//! pin, Timer2 has its own prescaler and can run from a 32 kHz crystal.
//! Timer1 is 16 bits wide and has its own type.
//!
//! ```text
//!             TCCRnA                       TCCRnB
//! ┌────┬────┬────┬────┬───┬───┬────┬────┐  ┌────┬────┬───┬───┬────┬──────────┐
//! │COMA│COMA│COMB│COMB│ - │ - │WGM1│WGM0│  │FOCA│FOCB│ - │ - │WGM2│ CS2:0    │
//! └────┴────┴────┴────┴───┴───┴────┴────┘  └────┴────┴───┴───┴────┴──────────┘
//! ```

mod timer0;
mod timer1;
mod timer2;

use core::marker::PhantomData;

use avrio_hal::{
    field_enum, register8, ClearOnOne, DataBus, Field, FieldValue, Flag, Joined, Register8,
    Strobe,
};

pub use timer0::{Timer0, Timer0Registers, OCR0A, OCR0B, TCCR0A, TCCR0B, TCNT0, TIFR0, TIMSK0};
pub use timer1::{
    CaptureEdge, Timer1, ICR1H, ICR1L, OCR1AH, OCR1AL, OCR1BH, OCR1BL, TCCR1A, TCCR1B, TCCR1C,
    TCNT1H, TCNT1L, TIFR1, TIMSK1,
};
pub use timer2::{
    Timer2, Timer2Registers, ASSR, OCR2A, OCR2B, TCCR2A, TCCR2B, TCNT2, TIFR2, TIMSK2,
};

register8! {
    /// General timer/counter control register
    pub GTCCR @ 0x43;
}

/// TSM: hold the prescaler reset bits so timers can be started in sync.
pub(crate) type Tsm<B> = Flag<GTCCR<B>, 7>;
/// PSRASY: reset the Timer2 prescaler.
pub(crate) type Psrasy<B> = Flag<GTCCR<B>, 1, Strobe>;
/// PSRSYNC: reset the prescaler shared by Timer0 and Timer1.
pub(crate) type Psrsync<B> = Flag<GTCCR<B>, 0, Strobe>;

field_enum! {
    /// Compare output mode (COMnx1:0). What `Clear` and `Set` mean depends
    /// on the waveform mode: in the PWM modes `Clear` is non-inverting and
    /// `Set` inverting output, and `Toggle` is only valid for OCnA with
    /// WGM2 set.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum CompareOutputMode: default Disconnected {
        /// Normal port operation, OCnx disconnected
        Disconnected = 0,
        /// Toggle OCnx on compare match
        Toggle = 1,
        /// Clear OCnx on compare match
        Clear = 2,
        /// Set OCnx on compare match
        Set = 3,
    }
}

field_enum! {
    /// 8-bit timer waveform generation mode (WGMn2:0). Reserved codes read
    /// back as `Normal`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum WaveformMode8: default Normal {
        /// Count to 0xFF and overflow
        Normal = 0,
        /// Phase correct PWM, TOP = 0xFF
        PhaseCorrectPwm = 1,
        /// Clear timer on compare match, TOP = OCRnA
        Ctc = 2,
        /// Fast PWM, TOP = 0xFF
        FastPwm = 3,
        /// Phase correct PWM, TOP = OCRnA
        PhaseCorrectPwmOcra = 5,
        /// Fast PWM, TOP = OCRnA
        FastPwmOcra = 7,
    }
}

field_enum! {
    /// 16-bit timer waveform generation mode (WGM13:0). The reserved code
    /// reads back as `Normal`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum WaveformMode16: default Normal {
        Normal = 0,
        PhaseCorrectPwm8Bit = 1,
        PhaseCorrectPwm9Bit = 2,
        PhaseCorrectPwm10Bit = 3,
        /// Clear timer on compare match, TOP = OCR1A
        CtcOcra = 4,
        FastPwm8Bit = 5,
        FastPwm9Bit = 6,
        FastPwm10Bit = 7,
        PhaseFrequencyCorrectPwmIcr = 8,
        PhaseFrequencyCorrectPwmOcra = 9,
        PhaseCorrectPwmIcr = 10,
        PhaseCorrectPwmOcra = 11,
        /// Clear timer on compare match, TOP = ICR1
        CtcIcr = 12,
        FastPwmIcr = 14,
        FastPwmOcra = 15,
    }
}

field_enum! {
    /// Clock select for Timer0 and Timer1 (CSn2:0)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ClockSelect: default Stopped {
        /// No clock source, timer stopped
        Stopped = 0,
        /// clk_io, no prescaling
        Div1 = 1,
        Div8 = 2,
        Div64 = 3,
        Div256 = 4,
        Div1024 = 5,
        /// External clock on Tn, falling edge
        ExternalFalling = 6,
        /// External clock on Tn, rising edge
        ExternalRising = 7,
    }
}

field_enum! {
    /// Clock select for Timer2 (CS22:0), from its own prescaler
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum AsyncClockSelect: default Stopped {
        Stopped = 0,
        Div1 = 1,
        Div8 = 2,
        Div32 = 3,
        Div64 = 4,
        Div128 = 5,
        Div256 = 6,
        Div1024 = 7,
    }
}

/// Register set of an 8-bit timer.
pub trait Timer8Registers {
    type Bus: DataBus;
    type ControlA: Register8<Bus = Self::Bus>;
    type ControlB: Register8<Bus = Self::Bus>;
    type Counter: Register8<Bus = Self::Bus>;
    type CompareA: Register8<Bus = Self::Bus>;
    type CompareB: Register8<Bus = Self::Bus>;
    type InterruptMask: Register8<Bus = Self::Bus>;
    type InterruptFlags: Register8<Bus = Self::Bus>;
    /// Clock select encoding of this timer.
    type Clock: FieldValue;
}

type ComA<T> = Field<<T as Timer8Registers>::ControlA, CompareOutputMode, 6, 2>;
type ComB<T> = Field<<T as Timer8Registers>::ControlA, CompareOutputMode, 4, 2>;
type WgmLow<T> = Field<<T as Timer8Registers>::ControlA, u8, 0, 2>;
type WgmHigh<T> = Field<<T as Timer8Registers>::ControlB, u8, 3, 1>;
type Wgm<T> = Joined<WgmLow<T>, WgmHigh<T>, WaveformMode8>;
type FocA<T> = Flag<<T as Timer8Registers>::ControlB, 7, Strobe>;
type FocB<T> = Flag<<T as Timer8Registers>::ControlB, 6, Strobe>;
type Cs<T> = Field<<T as Timer8Registers>::ControlB, <T as Timer8Registers>::Clock, 0, 3>;

type Toie<T> = Flag<<T as Timer8Registers>::InterruptMask, 0>;
type OcieA<T> = Flag<<T as Timer8Registers>::InterruptMask, 1>;
type OcieB<T> = Flag<<T as Timer8Registers>::InterruptMask, 2>;

type Tov<T> = Flag<<T as Timer8Registers>::InterruptFlags, 0, ClearOnOne>;
type OcfA<T> = Flag<<T as Timer8Registers>::InterruptFlags, 1, ClearOnOne>;
type OcfB<T> = Flag<<T as Timer8Registers>::InterruptFlags, 2, ClearOnOne>;

/// An 8-bit timer/counter.
#[derive(Debug, Clone, Copy)]
pub struct Timer8<T>(PhantomData<fn() -> T>);

impl<T> Timer8<T> {
    /// Handle to the timer's registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Timer8<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Timer8Registers> Timer8<T> {
    /// COMnA1:0: OCnA pin behaviour on compare match.
    pub fn compare_output_mode_a(&self) -> CompareOutputMode {
        ComA::<T>::get()
    }

    /// Select the OCnA behaviour. The pin must be an output to be driven.
    pub fn set_compare_output_mode_a(&self, mode: CompareOutputMode) {
        ComA::<T>::set(mode);
    }

    /// COMnB1:0: OCnB pin behaviour on compare match.
    pub fn compare_output_mode_b(&self) -> CompareOutputMode {
        ComB::<T>::get()
    }

    /// Select the OCnB behaviour. The pin must be an output to be driven.
    pub fn set_compare_output_mode_b(&self, mode: CompareOutputMode) {
        ComB::<T>::set(mode);
    }

    /// WGMn2:0: counting sequence and TOP.
    pub fn waveform_mode(&self) -> WaveformMode8 {
        Wgm::<T>::get()
    }

    /// Writes WGMn1:0 in TCCRnA, then WGMn2 in TCCRnB.
    pub fn set_waveform_mode(&self, mode: WaveformMode8) {
        Wgm::<T>::set(mode);
    }

    /// CSn2:0: clock source.
    pub fn clock_select(&self) -> T::Clock {
        Cs::<T>::get()
    }

    /// Any value other than stopped starts the timer.
    pub fn set_clock_select(&self, clock: T::Clock) {
        Cs::<T>::set(clock);
    }

    /// Force a compare match on output A. Only valid in non-PWM modes; does
    /// not raise the interrupt or reset the timer in CTC mode.
    pub fn force_output_compare_a(&self) {
        FocA::<T>::trigger();
    }

    /// Force a compare match on output B.
    pub fn force_output_compare_b(&self) {
        FocB::<T>::trigger();
    }

    /// TCNTn.
    pub fn counter(&self) -> u8 {
        T::Counter::read()
    }

    /// Writing the counter blocks the compare match on the next timer clock.
    pub fn set_counter(&self, value: u8) {
        T::Counter::write(value);
    }

    /// OCRnA.
    pub fn output_compare_a(&self) -> u8 {
        T::CompareA::read()
    }

    /// Write OCRnA. In PWM modes the value is double buffered until TOP or BOTTOM.
    pub fn set_output_compare_a(&self, value: u8) {
        T::CompareA::write(value);
    }

    /// OCRnB.
    pub fn output_compare_b(&self) -> u8 {
        T::CompareB::read()
    }

    /// Write OCRnB. In PWM modes the value is double buffered until TOP or BOTTOM.
    pub fn set_output_compare_b(&self, value: u8) {
        T::CompareB::write(value);
    }

    /// TOIEn: overflow interrupt enable.
    pub fn overflow_interrupt_enabled(&self) -> bool {
        Toie::<T>::get()
    }

    /// Set TOIEn.
    pub fn set_overflow_interrupt_enabled(&self, enabled: bool) {
        Toie::<T>::set(enabled);
    }

    /// OCIEnA: compare match A interrupt enable.
    pub fn compare_a_interrupt_enabled(&self) -> bool {
        OcieA::<T>::get()
    }

    /// Set OCIEnA.
    pub fn set_compare_a_interrupt_enabled(&self, enabled: bool) {
        OcieA::<T>::set(enabled);
    }

    /// OCIEnB: compare match B interrupt enable.
    pub fn compare_b_interrupt_enabled(&self) -> bool {
        OcieB::<T>::get()
    }

    /// Set OCIEnB.
    pub fn set_compare_b_interrupt_enabled(&self, enabled: bool) {
        OcieB::<T>::set(enabled);
    }

    /// TOVn: counter overflowed.
    pub fn overflow_flag(&self) -> bool {
        Tov::<T>::get()
    }

    /// Clear TOVn by writing a one to it.
    pub fn clear_overflow_flag(&self) {
        Tov::<T>::clear();
    }

    /// OCFnA: compare match A occurred.
    pub fn compare_a_flag(&self) -> bool {
        OcfA::<T>::get()
    }

    /// Clear OCFnA by writing a one to it.
    pub fn clear_compare_a_flag(&self) {
        OcfA::<T>::clear();
    }

    /// OCFnB: compare match B occurred.
    pub fn compare_b_flag(&self) -> bool {
        OcfB::<T>::get()
    }

    /// Clear OCFnB by writing a one to it.
    pub fn clear_compare_b_flag(&self) {
        OcfB::<T>::clear();
    }

    /// Timer/counter synchronization mode (TSM, shared by all timers).
    pub fn synchronization_mode(&self) -> bool {
        Tsm::<T::Bus>::get()
    }

    /// While set, the prescaler reset bits stay set, holding the affected
    /// prescalers in reset until this is cleared.
    pub fn set_synchronization_mode(&self, enabled: bool) {
        Tsm::<T::Bus>::set(enabled);
    }
}
