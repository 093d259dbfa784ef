//! ATmega328P register catalog for avrio
//!
//! Register addresses and bit layouts for the ATmega48A/88A/168A/328/P
//! family, expressed with the `avrio-hal` register model. Addresses are data
//! space addresses (I/O space + 0x20), as used by LD/ST.
//!
//! Peripherals covered:
//!
//! - CPU status register, stack pointer and critical sections
//! - GPIO ports B, C and D
//! - ADC
//! - SPI
//! - USART0
//! - Timer/counters 0, 1 and 2
//! - Sleep modes and power reduction
//!
//! Every handle is a zero-sized value. Creating several handles for the same
//! peripheral is allowed and they all act on the same hardware; the
//! [`Peripherals`] bundle is a convenience, not an ownership token.
//!
//! ```ignore
//! use avrio_hal_atmega328p::Peripherals;
//!
//! let dp = Peripherals::new();
//! dp.pins.pb5.into_output();
//! dp.pins.pb5.set_high();
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod adc;
pub mod cpu;
pub mod gpio;
pub mod power;
pub mod spi;
pub mod timer;
pub mod usart;

pub use avrio_hal::{DataBus, DataDirection, DigitalValue, Mmio};

pub use adc::Adc;
pub use cpu::{interrupt_free, CriticalSection, Cpu};
pub use gpio::Pins;
pub use power::Power;
pub use spi::{Spi, SpiConfig, SpiError};
pub use timer::{Timer0, Timer1, Timer2, Timer8};
pub use usart::{UartConfig, UartError, Usart0, DEFAULT_CPU_HZ};

/// Handles for every peripheral in this catalog.
#[derive(Debug, Clone, Copy)]
pub struct Peripherals<B = Mmio, const CPU_HZ: u32 = DEFAULT_CPU_HZ> {
    /// Status register and stack pointer.
    pub cpu: Cpu<B>,
    /// GPIO ports B, C and D.
    pub pins: Pins<B>,
    /// Analog to digital converter.
    pub adc: Adc<B>,
    /// SPI master/slave.
    pub spi: Spi<B>,
    /// USART0.
    pub usart0: Usart0<B, CPU_HZ>,
    /// 8-bit Timer/Counter0.
    pub timer0: Timer0<B>,
    /// 16-bit Timer/Counter1.
    pub timer1: Timer1<B>,
    /// 8-bit asynchronous Timer/Counter2.
    pub timer2: Timer2<B>,
    /// Sleep modes and power reduction.
    pub power: Power<B>,
}

impl<B, const CPU_HZ: u32> Peripherals<B, CPU_HZ> {
    /// Handles to every peripheral.
    pub const fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            pins: Pins::new(),
            adc: Adc::new(),
            spi: Spi::new(),
            usart0: Usart0::new(),
            timer0: Timer8::new(),
            timer1: Timer1::new(),
            timer2: Timer8::new(),
            power: Power::new(),
        }
    }
}

impl<B, const CPU_HZ: u32> Default for Peripherals<B, CPU_HZ> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::Sim;

    #[test]
    fn test_bundle_handles_share_hardware() {
        Sim::reset();
        let dp = Peripherals::<Sim>::new();

        dp.pins.pb5.into_output();
        dp.pins.pb5.set_high();
        dp.power.set_timer1_powered_down(true);

        assert_eq!(Sim::peek(0x24), 0b0010_0000);
        assert_eq!(Sim::peek(0x25), 0b0010_0000);
        assert!(Power::<Sim>::new().timer1_powered_down());
    }
}
