//! Port and pin addressing
//!
//! A port groups the registers behind one bank of general-purpose pins. A
//! [`Pin`] pairs a port type with a const bit position, so one generic
//! implementation serves every pin of every port:
//!
//! ```text
//! Pin<PortB, 5>  ──► PORTB bit 5 (level out)
//!                ──► DDRB  bit 5 (direction)
//!                ──► PINB  bit 5 (level in)
//! ```
//!
//! Direction and level are independent. Changing from an input without
//! pull-up to an output driving high passes through either "input with
//! pull-up" or "output low" depending on which is changed first; callers
//! pick the order.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::digital::DigitalValue;
use crate::field::{Bit, Field, FieldValue};
use crate::register::Register8;

/// Pin direction as stored in a data direction register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataDirection {
    /// DDxn clear.
    #[default]
    Input,
    /// DDxn set.
    Output,
}

impl FieldValue for DataDirection {
    #[inline(always)]
    fn from_bits(bits: u8) -> Self {
        if bits != 0 {
            Self::Output
        } else {
            Self::Input
        }
    }

    #[inline(always)]
    fn into_bits(self) -> u8 {
        matches!(self, Self::Output) as u8
    }
}

/// A port with a data register and an input register but no direction
/// control.
pub trait PartialPort {
    /// Output level latch (`PORTx`). With the pin as input, a one here
    /// enables the pull-up.
    type Data: Register8;

    /// Pin level as sampled by the input synchroniser (`PINx`).
    type Input: Register8<Bus = <Self::Data as Register8>::Bus>;
}

/// A port with a data direction register.
pub trait Port: PartialPort {
    /// Direction (`DDRx`): one is output.
    type Direction: Register8<Bus = <Self::Data as Register8>::Bus>;
}

/// One digital line: bit `N` of port `P`.
pub struct Pin<P, const N: u8>(PhantomData<fn() -> P>);

impl<P, const N: u8> Pin<P, N> {
    /// Handle to bit `N` of port `P`.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<P, const N: u8> Default for Pin<P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, const N: u8> Clone for Pin<P, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, const N: u8> Copy for Pin<P, N> {}

impl<P, const N: u8> core::fmt::Debug for Pin<P, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Pin<{}>", N)
    }
}

impl<P: PartialPort, const N: u8> Pin<P, N> {
    /// Mask of this pin in each of the port's registers.
    pub const MASK: u8 = Bit::<N>::SET_MASK;

    /// Drive the output latch. One read-modify-write of the data register.
    #[inline(always)]
    pub fn set_value(&self, value: DigitalValue) {
        Field::<P::Data, DigitalValue, N, 1>::set(value);
    }

    /// Drive the pin high (or enable the pull-up when it is an input).
    #[inline(always)]
    pub fn set_high(&self) {
        self.set_value(DigitalValue::High);
    }

    /// Drive the pin low (or disable the pull-up when it is an input).
    #[inline(always)]
    pub fn set_low(&self) {
        self.set_value(DigitalValue::Low);
    }

    /// Level actually present on the pin, from the input register.
    #[inline(always)]
    pub fn value(&self) -> DigitalValue {
        Field::<P::Input, DigitalValue, N, 1>::get()
    }

    /// Level last written to the output latch.
    #[inline(always)]
    pub fn output_value(&self) -> DigitalValue {
        Field::<P::Data, DigitalValue, N, 1>::get()
    }

    /// Invert the output latch.
    #[inline(always)]
    pub fn toggle(&self) {
        P::Data::modify(|r| r ^ Self::MASK);
    }
}

impl<P: Port, const N: u8> Pin<P, N> {
    /// Set this pin's bit in the direction register; other pins keep theirs.
    #[inline(always)]
    pub fn set_data_direction(&self, direction: DataDirection) {
        Field::<P::Direction, DataDirection, N, 1>::set(direction);
    }

    /// Current direction from the direction register.
    #[inline(always)]
    pub fn data_direction(&self) -> DataDirection {
        Field::<P::Direction, DataDirection, N, 1>::get()
    }

    /// Make the pin an output. The level is whatever the data register holds.
    pub fn into_output(self) -> Self {
        self.set_data_direction(DataDirection::Output);
        self
    }

    /// Make the pin an input. A high data bit leaves the pull-up on.
    pub fn into_input(self) -> Self {
        self.set_data_direction(DataDirection::Input);
        self
    }
}

impl<P: PartialPort, const N: u8> ErrorType for Pin<P, N> {
    type Error = Infallible;
}

impl<P: PartialPort, const N: u8> OutputPin for Pin<P, N> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Pin::set_low(self);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Pin::set_high(self);
        Ok(())
    }
}

impl<P: PartialPort, const N: u8> StatefulOutputPin for Pin<P, N> {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.output_value().is_high())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.output_value().is_low())
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        Pin::toggle(self);
        Ok(())
    }
}

impl<P: PartialPort, const N: u8> InputPin for Pin<P, N> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.value().is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.value().is_low())
    }
}
