//! Digital logic levels

use core::ops::{BitAnd, BitOr, Not};

use embedded_hal::digital::PinState;

use crate::field::FieldValue;

/// A two-state logic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DigitalValue {
    /// Logic 0.
    #[default]
    Low,
    /// Logic 1.
    High,
}

impl DigitalValue {
    /// Flip the level in place.
    pub fn toggle(&mut self) {
        *self = !*self;
    }

    /// `true` for [`DigitalValue::High`].
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// `true` for [`DigitalValue::Low`].
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }
}

impl Not for DigitalValue {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl BitAnd for DigitalValue {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        (self.is_high() && rhs.is_high()).into()
    }
}

impl BitOr for DigitalValue {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        (self.is_high() || rhs.is_high()).into()
    }
}

impl From<bool> for DigitalValue {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<DigitalValue> for bool {
    fn from(value: DigitalValue) -> Self {
        value.is_high()
    }
}

impl From<PinState> for DigitalValue {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => Self::Low,
            PinState::High => Self::High,
        }
    }
}

impl From<DigitalValue> for PinState {
    fn from(value: DigitalValue) -> Self {
        match value {
            DigitalValue::Low => PinState::Low,
            DigitalValue::High => PinState::High,
        }
    }
}

impl FieldValue for DigitalValue {
    #[inline(always)]
    fn from_bits(bits: u8) -> Self {
        (bits != 0).into()
    }

    #[inline(always)]
    fn into_bits(self) -> u8 {
        self.is_high() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::DigitalValue::{High, Low};
    use super::*;

    #[test]
    fn test_and() {
        assert_eq!(High & High, High);
        assert_eq!(High & Low, Low);
        assert_eq!(Low & High, Low);
        assert_eq!(Low & Low, Low);
    }

    #[test]
    fn test_or() {
        assert_eq!(High | High, High);
        assert_eq!(High | Low, High);
        assert_eq!(Low | High, High);
        assert_eq!(Low | Low, Low);
    }

    #[test]
    fn test_not() {
        assert_eq!(!High, Low);
        assert_eq!(!Low, High);
    }

    #[test]
    fn test_toggle_twice() {
        for original in [Low, High] {
            let mut value = original;
            value.toggle();
            assert_eq!(value, !original);
            value.toggle();
            assert_eq!(value, original);
        }
    }

    #[test]
    fn test_conversions() {
        assert_eq!(DigitalValue::from(true), High);
        assert!(!bool::from(Low));
        assert_eq!(PinState::from(High), PinState::High);
        assert_eq!(DigitalValue::from(PinState::Low), Low);
        assert_eq!(DigitalValue::default(), Low);
    }

    #[test]
    fn test_field_bits() {
        assert_eq!(DigitalValue::from_bits(0), Low);
        assert_eq!(DigitalValue::from_bits(1), High);
        assert_eq!(High.into_bits(), 1);
        assert_eq!(Low.into_bits(), 0);
    }
}
