//! Register accessors
//!
//! A register is a zero-sized type carrying a fixed data-space address and a
//! bus. It is never instantiated in a meaningful way: all access goes
//! through associated functions, so `PORTB::write(x)` compiles to exactly
//! one store.

use core::marker::PhantomData;

use crate::bus::DataBus;
use crate::field::{Readable, ReadWrite};

/// An 8-bit memory-mapped register.
///
/// # Safety
/// `ADDRESS` must be a byte-wide I/O register on `Bus` for every device the
/// implementing type is used with, `CLEAR_ON_ONE` must cover exactly the
/// bits that hardware clears when a one is written to them, and
/// `WRITE_AS_ZERO` must cover the bits the datasheet requires to be written
/// as zero. Use
/// [`register8!`](crate::register8) rather than implementing this by hand.
pub unsafe trait Register8 {
    /// Bus the register lives on.
    type Bus: DataBus;

    /// Data-space address.
    const ADDRESS: u16;

    /// Flag bits that are cleared by writing a one to them.
    ///
    /// [`modify`](Self::modify) never writes these bits back as one, so a
    /// read-modify-write of some other field cannot clear a pending flag.
    const CLEAR_ON_ONE: u8 = 0;

    /// Read-only status bits that must always be written as zero.
    ///
    /// [`modify`](Self::modify) strips these as well.
    const WRITE_AS_ZERO: u8 = 0;

    /// Volatile read of the whole register.
    #[inline(always)]
    fn read() -> u8 {
        // Safety: the implementor guaranteed ADDRESS is a register on Bus.
        unsafe { Self::Bus::read_byte(Self::ADDRESS) }
    }

    /// Volatile write of the whole register.
    #[inline(always)]
    fn write(value: u8) {
        // Safety: the implementor guaranteed ADDRESS is a register on Bus.
        unsafe { Self::Bus::write_byte(Self::ADDRESS, value) }
    }

    /// Read-modify-write.
    ///
    /// This is one read and one write, not an atomic operation. An interrupt
    /// that writes the same register in between loses its update.
    #[inline(always)]
    fn modify(f: impl FnOnce(u8) -> u8) {
        let current = Self::read();
        Self::write(f(current) & !(Self::CLEAR_ON_ONE | Self::WRITE_AS_ZERO));
    }
}

/// Declare 8-bit register types.
///
/// Each entry becomes a zero-sized type generic over the bus, defaulting to
/// [`Mmio`](crate::bus::Mmio). Registers holding write-one-to-clear flags
/// name them with `clear_on_one`; status bits that must be written as zero
/// are named with `write_zero`.
///
/// ```
/// avrio_hal::register8! {
///     /// Port B data register
///     pub PORTB @ 0x25;
///     /// Timer/Counter0 interrupt flag register
///     pub TIFR0 @ 0x35, clear_on_one = 0b0000_0111;
///     /// USART0 control and status register A
///     pub UCSR0A @ 0xC0, clear_on_one = 0b0100_0000, write_zero = 0b0001_1100;
/// }
/// ```
#[macro_export]
macro_rules! register8 {
    ($(
        $(#[$meta:meta])*
        $vis:vis $name:ident @ $address:literal
            $(, clear_on_one = $clear:literal)?
            $(, write_zero = $zero:literal)?;
    )+) => {$(
        $(#[$meta])*
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy)]
        $vis struct $name<B = $crate::bus::Mmio>(::core::marker::PhantomData<fn() -> B>);

        // Safety: the address and flag mask are taken from the device register summary.
        unsafe impl<B: $crate::bus::DataBus> $crate::register::Register8 for $name<B> {
            type Bus = B;
            const ADDRESS: u16 = $address;
            const CLEAR_ON_ONE: u8 = 0 $(| $clear)?;
            const WRITE_AS_ZERO: u8 = 0 $(| $zero)?;
        }
    )+};
}

/// A 16-bit register made of two 8-bit halves.
///
/// megaAVR 16-bit registers share a TEMP latch: reading the low byte latches
/// the high byte, and writing the high byte only lands when the low byte is
/// written. `Pair` therefore always reads low then high and writes high then
/// low. Registers that do not use TEMP (ADC data, USART baud rate) accept
/// the same order.
///
/// `A` is the access mode of the pair. A [`ReadOnly`](crate::field::ReadOnly)
/// pair, such as the ADC result, has no `write`:
///
/// ```compile_fail
/// use avrio_hal::{register8, Pair, ReadOnly};
///
/// register8! {
///     ADCL @ 0x78;
///     ADCH @ 0x79;
/// }
///
/// type Conversion = Pair<ADCL, ADCH, ReadOnly>;
/// Conversion::write(0x1234);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pair<Low, High, A = ReadWrite>(PhantomData<fn() -> (Low, High, A)>);

impl<Low, High, A> Pair<Low, High, A>
where
    Low: Register8,
    High: Register8<Bus = Low::Bus>,
    A: Readable,
{
    /// Read the full 16-bit value, low byte first.
    #[inline(always)]
    pub fn read() -> u16 {
        let low = Low::read();
        let high = High::read();
        u16::from_be_bytes([high, low])
    }
}

impl<Low, High> Pair<Low, High, ReadWrite>
where
    Low: Register8,
    High: Register8<Bus = Low::Bus>,
{
    /// Write the full 16-bit value, high byte first.
    #[inline(always)]
    pub fn write(value: u16) {
        let [high, low] = value.to_be_bytes();
        High::write(high);
        Low::write(low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Access, Sim};
    use proptest::prelude::*;

    crate::register8! {
        COUNTER_LOW @ 0x84;
        COUNTER_HIGH @ 0x85;
        FLAGS @ 0x36, clear_on_one = 0b0010_0111;
        STATUS @ 0xC0, clear_on_one = 0b0100_0000, write_zero = 0b0001_1100;
        RESULT_LOW @ 0x78;
        RESULT_HIGH @ 0x79;
    }

    type Counter = Pair<COUNTER_LOW<Sim>, COUNTER_HIGH<Sim>>;
    type Conversion = Pair<RESULT_LOW<Sim>, RESULT_HIGH<Sim>, crate::field::ReadOnly>;

    #[test]
    fn test_register_read_write() {
        Sim::reset();
        COUNTER_LOW::<Sim>::write(0xA5);
        assert_eq!(Sim::peek(0x84), 0xA5);
        assert_eq!(COUNTER_LOW::<Sim>::read(), 0xA5);
    }

    #[test]
    fn test_pair_halves() {
        Sim::reset();
        Counter::write(0x1234);

        assert_eq!(Counter::read(), 0x1234);
        assert_eq!(COUNTER_HIGH::<Sim>::read(), 0x12);
        assert_eq!(COUNTER_LOW::<Sim>::read(), 0x34);
    }

    #[test]
    fn test_pair_access_order() {
        Sim::reset();
        Counter::write(0xBEEF);
        let _ = Counter::read();

        let log = Sim::accesses();
        assert_eq!(
            log.as_slice(),
            &[
                Access::Write(0x85, 0xBE),
                Access::Write(0x84, 0xEF),
                Access::Read(0x84),
                Access::Read(0x85),
            ]
        );
    }

    #[test]
    fn test_modify_never_writes_flag_ones() {
        Sim::reset();
        Sim::poke(0x36, 0b0010_0111);

        FLAGS::<Sim>::modify(|r| r | 0b1000_0000);

        // Only the plain bit was written; the flag bits went out as zero
        assert_eq!(Sim::peek(0x36), 0b1000_0000);
    }

    #[test]
    fn test_modify_writes_status_bits_as_zero() {
        Sim::reset();
        Sim::poke(0xC0, 0b1111_1100);

        STATUS::<Sim>::modify(|r| r | 0b0000_0010);

        assert_eq!(Sim::accesses().last(), Some(&Access::Write(0xC0, 0b1010_0010)));
    }

    #[test]
    fn test_read_only_pair_reads_low_first() {
        Sim::reset();
        Sim::poke(0x78, 0xFF);
        Sim::poke(0x79, 0x03);

        assert_eq!(Conversion::read(), 0x03FF);
        assert_eq!(
            Sim::accesses().as_slice(),
            &[Access::Read(0x78), Access::Read(0x79)]
        );
    }

    proptest! {
        #[test]
        fn prop_pair_round_trip(value: u16) {
            Sim::reset();
            Counter::write(value);
            prop_assert_eq!(Counter::read(), value);
            prop_assert_eq!(COUNTER_HIGH::<Sim>::read(), (value >> 8) as u8);
            prop_assert_eq!(COUNTER_LOW::<Sim>::read(), value as u8);
        }
    }
}
