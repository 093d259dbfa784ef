use core::marker::PhantomData;

use avrio_hal::{
    field_enum, register8, ClearOnOne, DataBus, Field, Flag, Joined, Mmio, Pair, Strobe,
};

use super::{ClockSelect, CompareOutputMode, Psrsync, Tsm, WaveformMode16};
use crate::cpu::CriticalSection;

register8! {
    /// Timer1 control register A
    pub TCCR1A @ 0x80;
    /// Timer1 control register B
    pub TCCR1B @ 0x81;
    /// Timer1 control register C
    pub TCCR1C @ 0x82;
    /// Timer1 counter, low byte
    pub TCNT1L @ 0x84;
    /// Timer1 counter, high byte
    pub TCNT1H @ 0x85;
    /// Timer1 input capture register, low byte
    pub ICR1L @ 0x86;
    /// Timer1 input capture register, high byte
    pub ICR1H @ 0x87;
    /// Timer1 output compare register A, low byte
    pub OCR1AL @ 0x88;
    /// Timer1 output compare register A, high byte
    pub OCR1AH @ 0x89;
    /// Timer1 output compare register B, low byte
    pub OCR1BL @ 0x8A;
    /// Timer1 output compare register B, high byte
    pub OCR1BH @ 0x8B;
    /// Timer1 interrupt mask register
    pub TIMSK1 @ 0x6F;
    /// Timer1 interrupt flag register
    pub TIFR1 @ 0x36, clear_on_one = 0x27;
}

field_enum! {
    /// Edge on ICP1 that triggers an input capture (ICES1)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum CaptureEdge: default Falling {
        Falling = 0,
        Rising = 1,
    }
}

type Tcnt1<B> = Pair<TCNT1L<B>, TCNT1H<B>>;
type Icr1<B> = Pair<ICR1L<B>, ICR1H<B>>;
type Ocr1a<B> = Pair<OCR1AL<B>, OCR1AH<B>>;
type Ocr1b<B> = Pair<OCR1BL<B>, OCR1BH<B>>;

type Com1a<B> = Field<TCCR1A<B>, CompareOutputMode, 6, 2>;
type Com1b<B> = Field<TCCR1A<B>, CompareOutputMode, 4, 2>;
type Wgm1<B> = Joined<Field<TCCR1A<B>, u8, 0, 2>, Field<TCCR1B<B>, u8, 3, 2>, WaveformMode16>;
type Icnc1<B> = Flag<TCCR1B<B>, 7>;
type Ices1<B> = Field<TCCR1B<B>, CaptureEdge, 6, 1>;
type Cs1<B> = Field<TCCR1B<B>, ClockSelect, 0, 3>;
type Foc1a<B> = Flag<TCCR1C<B>, 7, Strobe>;
type Foc1b<B> = Flag<TCCR1C<B>, 6, Strobe>;

type Icie1<B> = Flag<TIMSK1<B>, 5>;
type Ocie1b<B> = Flag<TIMSK1<B>, 2>;
type Ocie1a<B> = Flag<TIMSK1<B>, 1>;
type Toie1<B> = Flag<TIMSK1<B>, 0>;

type Icf1<B> = Flag<TIFR1<B>, 5, ClearOnOne>;
type Ocf1b<B> = Flag<TIFR1<B>, 2, ClearOnOne>;
type Ocf1a<B> = Flag<TIFR1<B>, 1, ClearOnOne>;
type Tov1<B> = Flag<TIFR1<B>, 0, ClearOnOne>;

/// 16-bit Timer/Counter1 with PWM and input capture.
///
/// The 16-bit registers share one TEMP latch in hardware, so every 16-bit
/// access runs with interrupts disabled.
#[derive(Debug, Clone, Copy)]
pub struct Timer1<B = Mmio>(PhantomData<fn() -> B>);

impl<B> Timer1<B> {
    /// Handle to the Timer1 registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for Timer1<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus> Timer1<B> {
    /// COM1A1:0: OC1A pin behaviour on compare match.
    pub fn compare_output_mode_a(&self) -> CompareOutputMode {
        Com1a::<B>::get()
    }

    /// Select the OC1A behaviour.
    pub fn set_compare_output_mode_a(&self, mode: CompareOutputMode) {
        Com1a::<B>::set(mode);
    }

    /// COM1B1:0: OC1B pin behaviour on compare match.
    pub fn compare_output_mode_b(&self) -> CompareOutputMode {
        Com1b::<B>::get()
    }

    /// Select the OC1B behaviour.
    pub fn set_compare_output_mode_b(&self, mode: CompareOutputMode) {
        Com1b::<B>::set(mode);
    }

    /// WGM13:0: counting sequence and TOP.
    pub fn waveform_mode(&self) -> WaveformMode16 {
        Wgm1::<B>::get()
    }

    /// Writes WGM11:10 in TCCR1A, then WGM13:12 in TCCR1B.
    pub fn set_waveform_mode(&self, mode: WaveformMode16) {
        Wgm1::<B>::set(mode);
    }

    /// CS12:0: clock source.
    pub fn clock_select(&self) -> ClockSelect {
        Cs1::<B>::get()
    }

    /// Any value other than stopped starts the timer.
    pub fn set_clock_select(&self, clock: ClockSelect) {
        Cs1::<B>::set(clock);
    }

    /// ICNC1: filter ICP1 over four samples, delaying the capture by four
    /// clock cycles.
    pub fn input_capture_noise_canceler(&self) -> bool {
        Icnc1::<B>::get()
    }

    /// Set ICNC1.
    pub fn set_input_capture_noise_canceler(&self, enabled: bool) {
        Icnc1::<B>::set(enabled);
    }

    /// ICES1: ICP1 edge that triggers a capture.
    pub fn input_capture_edge(&self) -> CaptureEdge {
        Ices1::<B>::get()
    }

    /// Changing the edge can raise ICF1, so clear the flag afterwards.
    pub fn set_input_capture_edge(&self, edge: CaptureEdge) {
        Ices1::<B>::set(edge);
    }

    /// Force a compare match on output A. Only valid in non-PWM modes.
    pub fn force_output_compare_a(&self) {
        Foc1a::<B>::trigger();
    }

    /// Force a compare match on output B. Only valid in non-PWM modes.
    pub fn force_output_compare_b(&self) {
        Foc1b::<B>::trigger();
    }

    /// TCNT1.
    pub fn counter(&self) -> u16 {
        let _cs = CriticalSection::<B>::acquire();
        Tcnt1::<B>::read()
    }

    /// Write TCNT1. Blocks the compare match on the next timer clock.
    pub fn set_counter(&self, value: u16) {
        let _cs = CriticalSection::<B>::acquire();
        Tcnt1::<B>::write(value);
    }

    /// Counter value latched on the last input capture event.
    pub fn input_capture(&self) -> u16 {
        let _cs = CriticalSection::<B>::acquire();
        Icr1::<B>::read()
    }

    /// ICR1 is only writable when a waveform mode uses it as TOP.
    pub fn set_input_capture(&self, value: u16) {
        let _cs = CriticalSection::<B>::acquire();
        Icr1::<B>::write(value);
    }

    /// OCR1A.
    pub fn output_compare_a(&self) -> u16 {
        let _cs = CriticalSection::<B>::acquire();
        Ocr1a::<B>::read()
    }

    /// Write OCR1A.
    pub fn set_output_compare_a(&self, value: u16) {
        let _cs = CriticalSection::<B>::acquire();
        Ocr1a::<B>::write(value);
    }

    /// OCR1B.
    pub fn output_compare_b(&self) -> u16 {
        let _cs = CriticalSection::<B>::acquire();
        Ocr1b::<B>::read()
    }

    /// Write OCR1B.
    pub fn set_output_compare_b(&self, value: u16) {
        let _cs = CriticalSection::<B>::acquire();
        Ocr1b::<B>::write(value);
    }

    /// ICIE1: input capture interrupt enable.
    pub fn input_capture_interrupt_enabled(&self) -> bool {
        Icie1::<B>::get()
    }

    /// Set ICIE1.
    pub fn set_input_capture_interrupt_enabled(&self, enabled: bool) {
        Icie1::<B>::set(enabled);
    }

    /// OCIE1B: compare match B interrupt enable.
    pub fn compare_b_interrupt_enabled(&self) -> bool {
        Ocie1b::<B>::get()
    }

    /// Set OCIE1B.
    pub fn set_compare_b_interrupt_enabled(&self, enabled: bool) {
        Ocie1b::<B>::set(enabled);
    }

    /// OCIE1A: compare match A interrupt enable.
    pub fn compare_a_interrupt_enabled(&self) -> bool {
        Ocie1a::<B>::get()
    }

    /// Set OCIE1A.
    pub fn set_compare_a_interrupt_enabled(&self, enabled: bool) {
        Ocie1a::<B>::set(enabled);
    }

    /// TOIE1: overflow interrupt enable.
    pub fn overflow_interrupt_enabled(&self) -> bool {
        Toie1::<B>::get()
    }

    /// Set TOIE1.
    pub fn set_overflow_interrupt_enabled(&self, enabled: bool) {
        Toie1::<B>::set(enabled);
    }

    /// ICF1: a capture was latched into ICR1.
    pub fn input_capture_flag(&self) -> bool {
        Icf1::<B>::get()
    }

    /// Clear ICF1 by writing a one to it.
    pub fn clear_input_capture_flag(&self) {
        Icf1::<B>::clear();
    }

    /// OCF1B: compare match B occurred.
    pub fn compare_b_flag(&self) -> bool {
        Ocf1b::<B>::get()
    }

    /// Clear OCF1B by writing a one to it.
    pub fn clear_compare_b_flag(&self) {
        Ocf1b::<B>::clear();
    }

    /// OCF1A: compare match A occurred.
    pub fn compare_a_flag(&self) -> bool {
        Ocf1a::<B>::get()
    }

    /// Clear OCF1A by writing a one to it.
    pub fn clear_compare_a_flag(&self) {
        Ocf1a::<B>::clear();
    }

    /// TOV1: counter overflowed.
    pub fn overflow_flag(&self) -> bool {
        Tov1::<B>::get()
    }

    /// Clear TOV1 by writing a one to it.
    pub fn clear_overflow_flag(&self) {
        Tov1::<B>::clear();
    }

    /// Resets the prescaler shared with Timer0.
    pub fn reset_prescaler(&self) {
        Psrsync::<B>::trigger();
    }

    /// TSM: timer/counter synchronization mode (shared by all timers).
    pub fn synchronization_mode(&self) -> bool {
        Tsm::<B>::get()
    }

    /// Set TSM. The prescaler reset bits stay set until it is cleared.
    pub fn set_synchronization_mode(&self, enabled: bool) {
        Tsm::<B>::set(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::sim::Access;
    use avrio_hal::{FieldValue, Sim};
    use proptest::prelude::*;

    fn timer1() -> Timer1<Sim> {
        Sim::reset();
        Timer1::new()
    }

    #[test]
    fn test_counter_written_high_first_with_interrupts_off() {
        let timer = timer1();
        Sim::poke(0x5F, 0b1000_0000);
        Sim::clear_accesses();

        timer.set_counter(0x1234);

        assert_eq!(
            Sim::accesses().as_slice(),
            &[
                Access::Read(0x5F),
                Access::Read(0x5F),
                Access::Write(0x5F, 0b0000_0000),
                Access::Write(0x85, 0x12),
                Access::Write(0x84, 0x34),
                Access::Write(0x5F, 0b1000_0000),
            ]
        );
        assert_eq!(timer.counter(), 0x1234);
    }

    #[test]
    fn test_waveform_mode_spans_two_registers() {
        let timer = timer1();
        timer.set_clock_select(ClockSelect::Div8);
        timer.set_compare_output_mode_a(CompareOutputMode::Clear);

        timer.set_waveform_mode(WaveformMode16::FastPwmIcr);

        assert_eq!(Sim::peek(0x80), 0b1000_0010);
        assert_eq!(Sim::peek(0x81), 0b0001_1010);
        assert_eq!(timer.waveform_mode(), WaveformMode16::FastPwmIcr);

        for &mode in WaveformMode16::VARIANTS {
            timer.set_waveform_mode(mode);
            assert_eq!(timer.waveform_mode(), mode);
        }
        assert_eq!(timer.clock_select(), ClockSelect::Div8);
    }

    #[test]
    fn test_reserved_waveform_decodes_to_normal() {
        let timer = timer1();
        Sim::poke(0x80, 0b01);
        Sim::poke(0x81, 0b11 << 3);

        assert_eq!(timer.waveform_mode(), WaveformMode16::Normal);
        assert_eq!(CaptureEdge::from_bits(1), CaptureEdge::Rising);
    }

    #[test]
    fn test_input_capture_configuration() {
        let timer = timer1();

        timer.set_input_capture_noise_canceler(true);
        timer.set_input_capture_edge(CaptureEdge::Rising);
        timer.set_input_capture_interrupt_enabled(true);
        timer.set_overflow_interrupt_enabled(true);

        assert_eq!(Sim::peek(0x81), 0b1100_0000);
        assert_eq!(Sim::peek(0x6F), 0b0010_0001);
        assert_eq!(timer.input_capture_edge(), CaptureEdge::Rising);
    }

    #[test]
    fn test_clear_input_capture_flag_only() {
        let timer = timer1();
        Sim::poke(0x36, 0b0010_0111);

        timer.clear_input_capture_flag();

        assert_eq!(Sim::accesses().last(), Some(&Access::Write(0x36, 0b0010_0000)));
    }

    #[test]
    fn test_force_output_compare() {
        let timer = timer1();

        timer.force_output_compare_b();

        assert_eq!(Sim::peek(0x82), 0b0100_0000);
    }

    proptest! {
        #[test]
        fn prop_sixteen_bit_registers_round_trip(a: u16, b: u16, icr: u16) {
            let timer = timer1();

            timer.set_output_compare_a(a);
            timer.set_output_compare_b(b);
            timer.set_input_capture(icr);

            prop_assert_eq!(timer.output_compare_a(), a);
            prop_assert_eq!(timer.output_compare_b(), b);
            prop_assert_eq!(timer.input_capture(), icr);
            prop_assert_eq!(Sim::peek(0x89), (a >> 8) as u8);
            prop_assert_eq!(Sim::peek(0x8A), b as u8);
        }
    }
}
