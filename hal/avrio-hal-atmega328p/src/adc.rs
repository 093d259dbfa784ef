//! Analog-to-digital converter
//!
//! 10-bit successive approximation ADC with an 8-channel input multiplexer
//! (ADC6/ADC7 only on 32-pin packages), the internal temperature sensor on
//! ADC8, and the 1.1 V bandgap.

use core::marker::PhantomData;

use avrio_hal::{
    field_enum, register8, ClearOnOne, DataBus, Field, Flag, Mmio, Pair, ReadOnly, Strobe,
};

register8! {
    /// ADC data register, low byte
    pub ADCL @ 0x78;
    /// ADC data register, high byte
    pub ADCH @ 0x79;
    /// ADC control and status register A
    pub ADCSRA @ 0x7A, clear_on_one = 0b0001_0000;
    /// ADC control and status register B
    pub ADCSRB @ 0x7B;
    /// ADC multiplexer selection register
    pub ADMUX @ 0x7C;
    /// Digital input disable register 0
    pub DIDR0 @ 0x7E;
}

/// ADCH:ADCL. ADCL must be read first; reading it locks the data register
/// until ADCH is read.
///
/// The result is written by the converter only:
///
/// ```compile_fail
/// use avrio_hal_atmega328p::{adc::DataRegister, Mmio};
///
/// let _ = DataRegister::<Mmio>::read;
/// DataRegister::<Mmio>::write(0x0123);
/// ```
pub type DataRegister<B = Mmio> = Pair<ADCL<B>, ADCH<B>, ReadOnly>;

field_enum! {
    /// Voltage reference (REFS1:0). The reserved code reads back as `Aref`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum VoltageReference: default Aref {
        /// External AREF pin, internal reference off
        Aref = 0,
        /// AVcc with external capacitor at AREF
        Avcc = 1,
        /// Internal 1.1 V with external capacitor at AREF
        Internal1V1 = 3,
    }
}

field_enum! {
    /// Input channel (MUX3:0). Reserved codes 9 to 13 read back as `Ground`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Channel: default Ground {
        Adc0 = 0,
        Adc1 = 1,
        Adc2 = 2,
        Adc3 = 3,
        Adc4 = 4,
        Adc5 = 5,
        Adc6 = 6,
        Adc7 = 7,
        /// Temperature sensor
        Adc8 = 8,
        /// 1.1 V bandgap
        Bandgap = 14,
        Ground = 15,
    }
}

field_enum! {
    /// ADC clock prescaler (ADPS2:0). Code 1 is a second /2 setting and
    /// reads back as `Div2`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Prescaler: default Div2 {
        Div2 = 0,
        Div4 = 2,
        Div8 = 3,
        Div16 = 4,
        Div32 = 5,
        Div64 = 6,
        Div128 = 7,
    }
}

field_enum! {
    /// Auto trigger source (ADTS2:0)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum AutoTriggerSource: default FreeRunning {
        FreeRunning = 0,
        AnalogComparator = 1,
        ExternalInterrupt0 = 2,
        Timer0CompareMatchA = 3,
        Timer0Overflow = 4,
        Timer1CompareMatchB = 5,
        Timer1Overflow = 6,
        Timer1CaptureEvent = 7,
    }
}

type Refs<B> = Field<ADMUX<B>, VoltageReference, 6, 2>;
type Adlar<B> = Flag<ADMUX<B>, 5>;
type Mux<B> = Field<ADMUX<B>, Channel, 0, 4>;

type Aden<B> = Flag<ADCSRA<B>, 7>;
type AdscStart<B> = Flag<ADCSRA<B>, 6, Strobe>;
type AdscBusy<B> = Flag<ADCSRA<B>, 6, ReadOnly>;
type Adate<B> = Flag<ADCSRA<B>, 5>;
type Adif<B> = Flag<ADCSRA<B>, 4, ClearOnOne>;
type Adie<B> = Flag<ADCSRA<B>, 3>;
type Adps<B> = Field<ADCSRA<B>, Prescaler, 0, 3>;

type Adts<B> = Field<ADCSRB<B>, AutoTriggerSource, 0, 3>;

/// Number of ADC inputs with a digital input buffer that can be disabled.
pub const DIGITAL_INPUT_CHANNELS: u8 = 6;

/// Analog-to-digital converter.
#[derive(Debug, Clone, Copy)]
pub struct Adc<B = Mmio>(PhantomData<fn() -> B>);

impl<B> Adc<B> {
    /// Handle to the ADC registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for Adc<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus> Adc<B> {
    /// Reference voltage. A change during a conversion applies from the
    /// next conversion.
    pub fn voltage_reference(&self) -> VoltageReference {
        Refs::<B>::get()
    }

    /// Select the reference. Do not select an internal reference while AREF is driven externally.
    pub fn set_voltage_reference(&self, reference: VoltageReference) {
        Refs::<B>::set(reference);
    }

    /// Left-adjust the 10-bit result so that ADCH alone holds the top 8 bits.
    pub fn left_adjust_result(&self) -> bool {
        Adlar::<B>::get()
    }

    /// Set ADLAR.
    pub fn set_left_adjust_result(&self, left: bool) {
        Adlar::<B>::set(left);
    }

    /// MUX3:0: input channel.
    pub fn channel(&self) -> Channel {
        Mux::<B>::get()
    }

    /// Select the input channel. Takes effect at the start of the next conversion.
    pub fn set_channel(&self, channel: Channel) {
        Mux::<B>::set(channel);
    }

    /// ADEN: ADC enable.
    pub fn is_enabled(&self) -> bool {
        Aden::<B>::get()
    }

    /// Turning the ADC off aborts any conversion in progress.
    pub fn set_enabled(&self, enabled: bool) {
        Aden::<B>::set(enabled);
    }

    /// Start a conversion (or the first of a free-running series).
    ///
    /// Writing zero to ADSC has no effect, so there is no way to stop a
    /// conversion through this bit.
    pub fn start_conversion(&self) {
        AdscStart::<B>::trigger();
    }

    /// ADSC reads one while a conversion is in progress.
    pub fn is_converting(&self) -> bool {
        AdscBusy::<B>::get()
    }

    /// ADATE: start conversions on the selected trigger source.
    pub fn auto_trigger_enabled(&self) -> bool {
        Adate::<B>::get()
    }

    /// Set ADATE.
    pub fn set_auto_trigger_enabled(&self, enabled: bool) {
        Adate::<B>::set(enabled);
    }

    /// Conversion complete flag (ADIF). Cleared by hardware when the
    /// interrupt vector runs, or by [`clear_interrupt_flag`](Self::clear_interrupt_flag).
    pub fn interrupt_flag(&self) -> bool {
        Adif::<B>::get()
    }

    /// Clear ADIF by writing a one to it.
    pub fn clear_interrupt_flag(&self) {
        Adif::<B>::clear();
    }

    /// ADIE: conversion complete interrupt enable.
    pub fn interrupt_enabled(&self) -> bool {
        Adie::<B>::get()
    }

    /// Set ADIE.
    pub fn set_interrupt_enabled(&self, enabled: bool) {
        Adie::<B>::set(enabled);
    }

    /// ADPS2:0: ADC clock divider.
    pub fn prescaler(&self) -> Prescaler {
        Adps::<B>::get()
    }

    /// Select the ADC clock divider. Full resolution needs 50 to 200 kHz.
    pub fn set_prescaler(&self, prescaler: Prescaler) {
        Adps::<B>::set(prescaler);
    }

    /// ADTS2:0: auto trigger source.
    pub fn auto_trigger_source(&self) -> AutoTriggerSource {
        Adts::<B>::get()
    }

    /// Select the auto trigger source.
    pub fn set_auto_trigger_source(&self, source: AutoTriggerSource) {
        Adts::<B>::set(source);
    }

    /// Last conversion result.
    pub fn data(&self) -> u16 {
        DataRegister::<B>::read()
    }

    /// Whether the digital input buffer on ADC`N` is disabled.
    pub fn digital_input_disabled<const N: u8>(&self) -> bool {
        const { assert!(N < DIGITAL_INPUT_CHANNELS, "ADC6 and up have no digital input buffer") };
        Flag::<DIDR0<B>, N>::get()
    }

    /// Disable the digital input buffer on ADC`N` to save power while the pin
    /// carries an analog signal.
    pub fn set_digital_input_disabled<const N: u8>(&self, disabled: bool) {
        const { assert!(N < DIGITAL_INPUT_CHANNELS, "ADC6 and up have no digital input buffer") };
        Flag::<DIDR0<B>, N>::set(disabled);
    }

    /// Select `channel`, run a single conversion and return the result.
    ///
    /// The ADC must already be enabled with a suitable prescaler.
    pub fn read_blocking(&self, channel: Channel) -> u16 {
        self.set_channel(channel);
        self.start_conversion();
        while self.is_converting() {}
        self.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::{FieldValue, Sim};
    use proptest::prelude::*;

    fn adc() -> Adc<Sim> {
        Sim::reset();
        Adc::new()
    }

    /// Finish a conversion the moment it is started: store a result, drop
    /// ADSC and raise ADIF.
    fn instant_conversion(address: u16, _previous: u8, written: u8) -> u8 {
        if address == 0x7A && written & 0b0100_0000 != 0 {
            Sim::poke(0x78, 0x9A);
            Sim::poke(0x79, 0x02);
            (written & !0b0100_0000) | 0b0001_0000
        } else {
            written
        }
    }

    #[test]
    fn test_reserved_channel_decodes_to_ground() {
        let adc = adc();
        for code in 9..=13 {
            Sim::poke(0x7C, code);
            assert_eq!(adc.channel(), Channel::Ground);
        }
        assert_eq!(Channel::from_bits(14), Channel::Bandgap);
    }

    #[test]
    fn test_reserved_reference_and_prescaler() {
        let adc = adc();
        Sim::poke(0x7C, 0b1000_0000);
        assert_eq!(adc.voltage_reference(), VoltageReference::Aref);

        Sim::poke(0x7A, 0b0000_0001);
        assert_eq!(adc.prescaler(), Prescaler::Div2);
    }

    #[test]
    fn test_admux_layout() {
        let adc = adc();
        adc.set_voltage_reference(VoltageReference::Avcc);
        adc.set_left_adjust_result(true);
        adc.set_channel(Channel::Adc3);

        assert_eq!(Sim::peek(0x7C), 0b0110_0011);
    }

    #[test]
    fn test_start_conversion_keeps_pending_flag() {
        let adc = adc();
        Sim::poke(0x7A, 0b1001_0111);

        adc.start_conversion();

        // ADIF is written as zero so the pending conversion result survives
        assert_eq!(Sim::peek(0x7A), 0b1100_0111);
    }

    #[test]
    fn test_clear_interrupt_flag() {
        let adc = adc();
        Sim::poke(0x7A, 0b1001_1111);

        adc.clear_interrupt_flag();

        assert_eq!(Sim::peek(0x7A), 0b1001_1111);
        assert!(adc.interrupt_enabled());
    }

    #[test]
    fn test_data_reads_low_byte_first() {
        let adc = adc();
        Sim::poke(0x78, 0xFF);
        Sim::poke(0x79, 0x03);

        assert_eq!(adc.data(), 0x03FF);
        assert_eq!(
            Sim::accesses().as_slice(),
            &[
                avrio_hal::sim::Access::Read(0x78),
                avrio_hal::sim::Access::Read(0x79)
            ]
        );
    }

    #[test]
    fn test_read_blocking() {
        let adc = adc();
        Sim::set_write_hook(Some(instant_conversion));
        adc.set_enabled(true);
        adc.set_prescaler(Prescaler::Div128);

        let value = adc.read_blocking(Channel::Adc5);

        assert_eq!(value, 0x029A);
        assert_eq!(adc.channel(), Channel::Adc5);
        assert!(adc.interrupt_flag());
        assert!(!adc.is_converting());
    }

    #[test]
    fn test_digital_input_disable() {
        let adc = adc();
        adc.set_digital_input_disabled::<0>(true);
        adc.set_digital_input_disabled::<5>(true);

        assert_eq!(Sim::peek(0x7E), 0b0010_0001);
        assert!(adc.digital_input_disabled::<5>());
        assert!(!adc.digital_input_disabled::<3>());
    }

    #[test]
    fn test_auto_trigger_source() {
        let adc = adc();
        for &source in AutoTriggerSource::VARIANTS {
            adc.set_auto_trigger_source(source);
            assert_eq!(adc.auto_trigger_source(), source);
        }
    }

    proptest! {
        #[test]
        fn prop_channel_isolated(initial: u8, index in 0..Channel::VARIANTS.len()) {
            let adc = adc();
            Sim::poke(0x7C, initial);
            let channel = Channel::VARIANTS[index];

            adc.set_channel(channel);

            prop_assert_eq!(adc.channel(), channel);
            prop_assert_eq!(Sim::peek(0x7C) & 0xF0, initial & 0xF0);
        }

        #[test]
        fn prop_prescaler_keeps_control_bits(initial: u8, index in 0..Prescaler::VARIANTS.len()) {
            let adc = adc();
            Sim::poke(0x7A, initial);
            let prescaler = Prescaler::VARIANTS[index];

            adc.set_prescaler(prescaler);

            prop_assert_eq!(adc.prescaler(), prescaler);
            // Upper control bits survive; ADIF is never written back as one
            prop_assert_eq!(Sim::peek(0x7A) & 0b1110_1000, initial & 0b1110_1000);
            prop_assert_eq!(Sim::peek(0x7A) & 0b0001_0000, 0);
        }
    }
}
