//! General-purpose I/O ports B, C and D
//!
//! All three ports have data, direction and input registers. Port C has no
//! bit 7 (PC6 doubles as RESET), so no `PC7` is declared.
//!
//! ```ignore
//! let pins = Pins::<Mmio>::new();
//! let led = pins.pb5.into_output();
//! led.set_value(DigitalValue::High);
//! ```

use core::marker::PhantomData;

use avrio_hal::{register8, DataBus, Mmio, PartialPort, Pin, Port};

register8! {
    /// Port B input pins
    pub PINB @ 0x23;
    /// Port B data direction
    pub DDRB @ 0x24;
    /// Port B data
    pub PORTB @ 0x25;
    /// Port C input pins
    pub PINC @ 0x26;
    /// Port C data direction
    pub DDRC @ 0x27;
    /// Port C data
    pub PORTC @ 0x28;
    /// Port D input pins
    pub PIND @ 0x29;
    /// Port D data direction
    pub DDRD @ 0x2A;
    /// Port D data
    pub PORTD @ 0x2B;
}

macro_rules! ports {
    ($($(#[$meta:meta])* $port:ident: $input:ident, $direction:ident, $data:ident;)+) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $port<B = Mmio>(PhantomData<fn() -> B>);

        impl<B: DataBus> PartialPort for $port<B> {
            type Data = $data<B>;
            type Input = $input<B>;
        }

        impl<B: DataBus> Port for $port<B> {
            type Direction = $direction<B>;
        }
    )+};
}

ports! {
    /// Port B: SPI, Timer1/Timer2 outputs, crystal
    PortB: PINB, DDRB, PORTB;
    /// Port C: analog inputs, TWI, RESET
    PortC: PINC, DDRC, PORTC;
    /// Port D: USART, external interrupts, Timer0 outputs
    PortD: PIND, DDRD, PORTD;
}

pub type PB0<B = Mmio> = Pin<PortB<B>, 0>;
pub type PB1<B = Mmio> = Pin<PortB<B>, 1>;
/// SPI slave select
pub type PB2<B = Mmio> = Pin<PortB<B>, 2>;
/// SPI MOSI
pub type PB3<B = Mmio> = Pin<PortB<B>, 3>;
/// SPI MISO
pub type PB4<B = Mmio> = Pin<PortB<B>, 4>;
/// SPI SCK
pub type PB5<B = Mmio> = Pin<PortB<B>, 5>;
pub type PB6<B = Mmio> = Pin<PortB<B>, 6>;
pub type PB7<B = Mmio> = Pin<PortB<B>, 7>;

pub type PC0<B = Mmio> = Pin<PortC<B>, 0>;
pub type PC1<B = Mmio> = Pin<PortC<B>, 1>;
pub type PC2<B = Mmio> = Pin<PortC<B>, 2>;
pub type PC3<B = Mmio> = Pin<PortC<B>, 3>;
pub type PC4<B = Mmio> = Pin<PortC<B>, 4>;
pub type PC5<B = Mmio> = Pin<PortC<B>, 5>;
pub type PC6<B = Mmio> = Pin<PortC<B>, 6>;

/// USART RXD
pub type PD0<B = Mmio> = Pin<PortD<B>, 0>;
/// USART TXD
pub type PD1<B = Mmio> = Pin<PortD<B>, 1>;
pub type PD2<B = Mmio> = Pin<PortD<B>, 2>;
pub type PD3<B = Mmio> = Pin<PortD<B>, 3>;
pub type PD4<B = Mmio> = Pin<PortD<B>, 4>;
pub type PD5<B = Mmio> = Pin<PortD<B>, 5>;
pub type PD6<B = Mmio> = Pin<PortD<B>, 6>;
pub type PD7<B = Mmio> = Pin<PortD<B>, 7>;

/// Every GPIO pin on the device.
#[derive(Debug, Clone, Copy)]
pub struct Pins<B = Mmio> {
    pub pb0: PB0<B>,
    pub pb1: PB1<B>,
    pub pb2: PB2<B>,
    pub pb3: PB3<B>,
    pub pb4: PB4<B>,
    pub pb5: PB5<B>,
    pub pb6: PB6<B>,
    pub pb7: PB7<B>,
    pub pc0: PC0<B>,
    pub pc1: PC1<B>,
    pub pc2: PC2<B>,
    pub pc3: PC3<B>,
    pub pc4: PC4<B>,
    pub pc5: PC5<B>,
    pub pc6: PC6<B>,
    pub pd0: PD0<B>,
    pub pd1: PD1<B>,
    pub pd2: PD2<B>,
    pub pd3: PD3<B>,
    pub pd4: PD4<B>,
    pub pd5: PD5<B>,
    pub pd6: PD6<B>,
    pub pd7: PD7<B>,
}

impl<B> Pins<B> {
    /// Handles to every pin.
    pub const fn new() -> Self {
        Self {
            pb0: Pin::new(),
            pb1: Pin::new(),
            pb2: Pin::new(),
            pb3: Pin::new(),
            pb4: Pin::new(),
            pb5: Pin::new(),
            pb6: Pin::new(),
            pb7: Pin::new(),
            pc0: Pin::new(),
            pc1: Pin::new(),
            pc2: Pin::new(),
            pc3: Pin::new(),
            pc4: Pin::new(),
            pc5: Pin::new(),
            pc6: Pin::new(),
            pd0: Pin::new(),
            pd1: Pin::new(),
            pd2: Pin::new(),
            pd3: Pin::new(),
            pd4: Pin::new(),
            pd5: Pin::new(),
            pd6: Pin::new(),
            pd7: Pin::new(),
        }
    }
}

impl<B> Default for Pins<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::{DataDirection, DigitalValue, Sim};
    use embedded_hal::digital::{InputPin, OutputPin};

    #[test]
    fn test_port_addresses() {
        Sim::reset();
        let pins = Pins::<Sim>::new();

        pins.pb5.set_high();
        pins.pc0.set_data_direction(DataDirection::Output);
        pins.pd7.set_high();

        assert_eq!(Sim::peek(0x25), 0b0010_0000);
        assert_eq!(Sim::peek(0x27), 0b0000_0001);
        assert_eq!(Sim::peek(0x2B), 0b1000_0000);
    }

    #[test]
    fn test_pins_share_port_register() {
        Sim::reset();
        let pins = Pins::<Sim>::new();

        pins.pd3.set_value(DigitalValue::High);
        pins.pd5.set_value(DigitalValue::High);
        assert_eq!(Sim::peek(0x2B), 0b0010_1000);

        pins.pd3.set_value(DigitalValue::Low);
        assert_eq!(Sim::peek(0x2B), 0b0010_0000);
    }

    #[test]
    fn test_input_reads_pin_register() {
        Sim::reset();
        let mut pins = Pins::<Sim>::new();
        Sim::poke(0x29, 0b0000_0001);

        assert!(pins.pd0.is_high().unwrap());
        assert!(pins.pd1.is_low().unwrap());

        OutputPin::set_low(&mut pins.pc6).unwrap();
        assert_eq!(pins.pc6.output_value(), DigitalValue::Low);
    }
}
