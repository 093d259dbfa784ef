//! Bit and bitfield descriptors
//!
//! A [`Field`] is a contiguous run of bits inside one [`Register8`], bound at
//! the type level to that register, the value type it decodes to, and an
//! access mode. Every write is a read-modify-write of the owning register
//! that leaves every bit outside the field's mask untouched.
//!
//! Access modes encode the hardware's behaviour in the shape of the API:
//!
//! | Mode         | Operations            | Typical use                     |
//! |--------------|-----------------------|---------------------------------|
//! | [`ReadWrite`]  | `get`, `set`        | enables, mode selectors         |
//! | [`ReadOnly`]   | `get`               | busy and status bits            |
//! | [`Strobe`]     | `trigger`           | start conversion, force compare |
//! | [`ClearOnOne`] | `get`, `clear`      | interrupt flags                 |

use core::marker::PhantomData;

use crate::register::Register8;

/// A value that a bitfield decodes to.
///
/// Decoding is total: every raw bit pattern maps to some value, with
/// reserved patterns mapping to a documented default.
pub trait FieldValue: Copy {
    /// Decode the field's raw bits (already shifted down to bit 0).
    fn from_bits(bits: u8) -> Self;

    /// Encode to raw bits, before shifting into position.
    fn into_bits(self) -> u8;
}

impl FieldValue for bool {
    #[inline(always)]
    fn from_bits(bits: u8) -> Self {
        bits != 0
    }

    #[inline(always)]
    fn into_bits(self) -> u8 {
        self as u8
    }
}

impl FieldValue for u8 {
    #[inline(always)]
    fn from_bits(bits: u8) -> Self {
        bits
    }

    #[inline(always)]
    fn into_bits(self) -> u8 {
        self
    }
}

/// Declare a `#[repr(u8)]` enum of hardware codes that decodes as a
/// [`FieldValue`].
///
/// The variant named after `default` is returned for every code not listed,
/// and is also the enum's [`Default`].
///
/// ```
/// avrio_hal::field_enum! {
///     /// Sleep mode select
///     pub enum SleepMode: default Idle {
///         Idle = 0,
///         PowerDown = 2,
///     }
/// }
///
/// use avrio_hal::FieldValue;
/// assert_eq!(SleepMode::from_bits(1), SleepMode::Idle);
/// ```
#[macro_export]
macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: default $default:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $code:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $code,
            )+
        }

        impl $name {
            /// Every listed variant, in declaration order.
            pub const VARIANTS: &'static [Self] = &[$(Self::$variant),+];
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $crate::field::FieldValue for $name {
            fn from_bits(bits: u8) -> Self {
                $(
                    if bits == Self::$variant as u8 {
                        return Self::$variant;
                    }
                )+
                Self::$default
            }

            #[inline(always)]
            fn into_bits(self) -> u8 {
                self as u8
            }
        }
    };
}

/// Mask covering `width` bits starting at `shift`.
///
/// Panics (at compile time when used in a constant) if the field is empty or
/// does not fit in eight bits.
pub const fn field_mask(shift: u8, width: u8) -> u8 {
    assert!(
        width >= 1 && shift as u16 + width as u16 <= 8,
        "bitfield must be non-empty and fit inside an 8-bit register"
    );
    (((1u16 << width) - 1) << shift) as u8
}

/// Replace the bits under `mask` in `register` with `raw << shift`.
#[inline(always)]
pub const fn insert(register: u8, mask: u8, shift: u8, raw: u8) -> u8 {
    (register & !mask) | ((raw << shift) & mask)
}

/// The bits under `mask` in `register`, shifted down to bit 0.
#[inline(always)]
pub const fn extract(register: u8, mask: u8, shift: u8) -> u8 {
    (register & mask) >> shift
}

mod sealed {
    pub trait Sealed {}
}

/// Access mode marker.
pub trait Access: sealed::Sealed {}

/// Access modes that permit `get`.
pub trait Readable: Access {}

/// Ordinary read/write bits.
#[derive(Debug, Clone, Copy)]
pub enum ReadWrite {}

/// Status bits driven by hardware; writes are ignored.
#[derive(Debug, Clone, Copy)]
pub enum ReadOnly {}

/// Command bits: writing one starts an action, writing zero does nothing,
/// and reads are meaningless or always zero.
#[derive(Debug, Clone, Copy)]
pub enum Strobe {}

/// Flags set by hardware and cleared by writing a one.
#[derive(Debug, Clone, Copy)]
pub enum ClearOnOne {}

impl sealed::Sealed for ReadWrite {}
impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for Strobe {}
impl sealed::Sealed for ClearOnOne {}

impl Access for ReadWrite {}
impl Access for ReadOnly {}
impl Access for Strobe {}
impl Access for ClearOnOne {}

impl Readable for ReadWrite {}
impl Readable for ReadOnly {}
impl Readable for ClearOnOne {}

/// `WIDTH` bits at `SHIFT` in register `R`, decoded as `V`.
#[derive(Debug, Clone, Copy)]
pub struct Field<R, V, const SHIFT: u8, const WIDTH: u8, A = ReadWrite>(
    PhantomData<fn() -> (R, V, A)>,
);

/// A single-bit boolean field.
pub type Flag<R, const BIT: u8, A = ReadWrite> = Field<R, bool, BIT, 1, A>;

impl<R, V, const SHIFT: u8, const WIDTH: u8, A> Field<R, V, SHIFT, WIDTH, A>
where
    R: Register8,
    V: FieldValue,
    A: Access,
{
    /// The field's bits within the register.
    pub const MASK: u8 = field_mask(SHIFT, WIDTH);
}

impl<R, V, const SHIFT: u8, const WIDTH: u8, A> Field<R, V, SHIFT, WIDTH, A>
where
    R: Register8,
    V: FieldValue,
    A: Readable,
{
    /// Read the register and decode this field.
    #[inline(always)]
    pub fn get() -> V {
        V::from_bits(extract(R::read(), Self::MASK, SHIFT))
    }
}

impl<R, V, const SHIFT: u8, const WIDTH: u8> Field<R, V, SHIFT, WIDTH, ReadWrite>
where
    R: Register8,
    V: FieldValue,
{
    /// Write this field, leaving every other bit of the register as it was.
    #[inline(always)]
    pub fn set(value: V) {
        let raw = value.into_bits();
        R::modify(|r| insert(r, Self::MASK, SHIFT, raw));
    }
}

impl<R: Register8, const BIT: u8> Field<R, bool, BIT, 1, Strobe> {
    /// Write a one to the command bit.
    #[inline(always)]
    pub fn trigger() {
        R::modify(|r| r | Self::MASK);
    }
}

impl<R: Register8, const BIT: u8> Field<R, bool, BIT, 1, ClearOnOne> {
    /// Clear this flag without touching any other flag in the register.
    #[inline(always)]
    pub fn clear() {
        let current = R::read();
        R::write((current & !(R::CLEAR_ON_ONE | R::WRITE_AS_ZERO)) | Self::MASK);
    }
}

/// Untyped access to a writable field, used to stitch split fields
/// together with [`Joined`].
pub trait RawField {
    /// Number of bits in the field.
    const WIDTH: u8;

    /// Raw field bits, shifted down to bit 0.
    fn read_bits() -> u8;

    /// Write raw bits; anything above `WIDTH` is discarded.
    fn write_bits(bits: u8);
}

impl<R, V, const SHIFT: u8, const WIDTH: u8> RawField for Field<R, V, SHIFT, WIDTH, ReadWrite>
where
    R: Register8,
    V: FieldValue,
{
    const WIDTH: u8 = WIDTH;

    #[inline(always)]
    fn read_bits() -> u8 {
        extract(R::read(), Self::MASK, SHIFT)
    }

    #[inline(always)]
    fn write_bits(bits: u8) {
        R::modify(|r| insert(r, Self::MASK, SHIFT, bits));
    }
}

/// A logical field split in two, e.g. a waveform mode whose low bits sit in
/// one control register and high bits in another.
///
/// The combined value is `Low | High << Low::WIDTH`. Each half is written
/// with its own read-modify-write, low half first.
#[derive(Debug, Clone, Copy)]
pub struct Joined<Low, High, V>(PhantomData<fn() -> (Low, High, V)>);

impl<Low: RawField, High: RawField, V: FieldValue> Joined<Low, High, V> {
    /// Mask of the low half within the combined value.
    const LOW_MASK: u8 = {
        assert!(
            Low::WIDTH as u16 + High::WIDTH as u16 <= 8,
            "joined field wider than 8 bits"
        );
        field_mask(0, Low::WIDTH)
    };

    /// Read both halves and decode the combined value.
    #[inline(always)]
    pub fn get() -> V {
        let low = Low::read_bits() & Self::LOW_MASK;
        let high = High::read_bits() << Low::WIDTH;
        V::from_bits(low | high)
    }

    /// Write the low half, then the high half.
    #[inline(always)]
    pub fn set(value: V) {
        let bits = value.into_bits();
        Low::write_bits(bits & Self::LOW_MASK);
        High::write_bits(bits >> Low::WIDTH);
    }
}

/// A bit position within an 8-bit register.
#[derive(Debug, Clone, Copy)]
pub struct Bit<const N: u8>;

impl<const N: u8> Bit<N> {
    /// Only bit `N` set.
    pub const SET_MASK: u8 = field_mask(N, 1);
    /// Every bit but `N` set.
    pub const CLEAR_MASK: u8 = !Self::SET_MASK;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Sim;
    use proptest::prelude::*;

    crate::register8! {
        CONTROL @ 0x40;
        MODE_HIGH @ 0x41;
        FLAGS @ 0x42, clear_on_one = 0b0000_0111;
    }

    crate::field_enum! {
        enum Prescale: default Off {
            Off = 0,
            Div1 = 1,
            Div8 = 2,
            Div64 = 3,
            Div256 = 4,
            Div1024 = 5,
        }
    }

    type Low3 = Field<CONTROL<Sim>, u8, 1, 3>;
    type Upper2 = Field<CONTROL<Sim>, u8, 5, 2>;
    type Clock = Field<CONTROL<Sim>, Prescale, 1, 3>;
    type Enable = Flag<CONTROL<Sim>, 0>;
    type Busy = Flag<CONTROL<Sim>, 7, ReadOnly>;
    type Start = Flag<CONTROL<Sim>, 7, Strobe>;
    type Overflow = Flag<FLAGS<Sim>, 0, ClearOnOne>;
    type Compare = Flag<FLAGS<Sim>, 1, ClearOnOne>;
    type Interrupts = Flag<FLAGS<Sim>, 6>;

    type ModeLow = Field<CONTROL<Sim>, u8, 0, 2>;
    type ModeHigh = Field<MODE_HIGH<Sim>, u8, 3, 2>;
    type Mode = Joined<ModeLow, ModeHigh, u8>;

    #[test]
    fn test_masks() {
        assert_eq!(field_mask(0, 1), 0b0000_0001);
        assert_eq!(field_mask(1, 3), 0b0000_1110);
        assert_eq!(field_mask(6, 2), 0b1100_0000);
        assert_eq!(field_mask(0, 8), 0xFF);
        assert_eq!(Bit::<3>::SET_MASK, 0b0000_1000);
        assert_eq!(Bit::<3>::CLEAR_MASK, 0b1111_0111);
        assert_eq!(Upper2::MASK, 0b0110_0000);
    }

    #[test]
    #[should_panic]
    fn test_mask_outside_register() {
        field_mask(6, 3);
    }

    #[test]
    fn test_set_discards_excess_bits() {
        Sim::reset();
        Low3::set(0xFF);
        assert_eq!(Sim::peek(0x40), 0b0000_1110);
    }

    #[test]
    fn test_enum_round_trip() {
        for &value in Prescale::VARIANTS {
            Sim::reset();
            Sim::poke(0x40, 0b1111_0001);
            Clock::set(value);
            assert_eq!(Clock::get(), value);
            assert_eq!(Sim::peek(0x40) & !Clock::MASK, 0b1111_0001);
        }
    }

    #[test]
    fn test_reserved_code_decodes_to_default() {
        Sim::reset();
        for code in 6..8 {
            Low3::set(code);
            assert_eq!(Clock::get(), Prescale::Off);
        }
        assert_eq!(Prescale::default(), Prescale::Off);
    }

    #[test]
    fn test_bool_flag() {
        Sim::reset();
        Enable::set(true);
        assert!(Enable::get());
        assert_eq!(Sim::peek(0x40), 0b0000_0001);
        Enable::set(false);
        assert!(!Enable::get());
        assert_eq!(Sim::peek(0x40), 0);
    }

    #[test]
    fn test_read_only_and_strobe() {
        Sim::reset();
        Sim::poke(0x40, 0b0000_0101);
        assert!(!Busy::get());

        Start::trigger();
        assert_eq!(Sim::peek(0x40), 0b1000_0101);
        assert!(Busy::get());
    }

    /// Hardware behaviour of the flag register: ones clear flags, zeros
    /// leave them alone.
    fn clear_on_one_hook(address: u16, previous: u8, written: u8) -> u8 {
        if address != 0x42 {
            return written;
        }
        let flags = previous & 0b0000_0111 & !written;
        flags | (written & !0b0000_0111)
    }

    #[test]
    fn test_clear_touches_only_own_flag() {
        Sim::reset();
        Sim::poke(0x42, 0b0100_0011);

        Compare::clear();

        // Overflow goes out as zero; on hardware that leaves it pending
        assert_eq!(Sim::accesses().last(), Some(&crate::sim::Access::Write(0x42, 0b0100_0010)));

        Sim::reset();
        Sim::set_write_hook(Some(clear_on_one_hook));
        Sim::poke(0x42, 0b0100_0011);

        Compare::clear();

        assert!(!Compare::get());
        assert!(Overflow::get());
        assert!(Interrupts::get());
    }

    #[test]
    fn test_set_keeps_pending_flags() {
        Sim::reset();
        Sim::set_write_hook(Some(clear_on_one_hook));
        Sim::poke(0x42, 0b0000_0011);

        Interrupts::set(true);

        assert_eq!(Sim::peek(0x42), 0b0100_0011);
        assert!(Overflow::get());
        assert!(Compare::get());
    }

    #[test]
    fn test_joined_field() {
        Sim::reset();
        Sim::poke(0x40, 0b1111_0000);
        Sim::poke(0x41, 0b1000_0001);

        Mode::set(0b1110);

        assert_eq!(Sim::peek(0x40), 0b1111_0010);
        assert_eq!(Sim::peek(0x41), 0b1001_1001);
        assert_eq!(Mode::get(), 0b1110);
    }

    proptest! {
        #[test]
        fn prop_write_isolated(initial: u8, value in 0u8..8) {
            Sim::reset();
            Sim::poke(0x40, initial);
            let other = Upper2::get();

            Low3::set(value);

            let after = Sim::peek(0x40);
            prop_assert_eq!(Low3::get(), value);
            prop_assert_eq!(Upper2::get(), other);
            prop_assert_eq!(after & !Low3::MASK, initial & !Low3::MASK);
        }

        #[test]
        fn prop_joined_round_trip(initial_low: u8, initial_high: u8, value in 0u8..16) {
            Sim::reset();
            Sim::poke(0x40, initial_low);
            Sim::poke(0x41, initial_high);

            Mode::set(value);

            prop_assert_eq!(Mode::get(), value);
            prop_assert_eq!(Sim::peek(0x40) & !0b0000_0011, initial_low & !0b0000_0011);
            prop_assert_eq!(Sim::peek(0x41) & !0b0001_1000, initial_high & !0b0001_1000);
        }
    }
}
