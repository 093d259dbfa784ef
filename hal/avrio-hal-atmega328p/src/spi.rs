//! Serial peripheral interface
//!
//! Master-mode set-up and blocking byte transfers on PB2 (SS), PB3 (MOSI),
//! PB4 (MISO) and PB5 (SCK). Implements [`embedded_hal::spi::SpiBus`].

use core::marker::PhantomData;

use avrio_hal::{
    field_enum, register8, DataBus, DataDirection, DigitalValue, Field, Flag, Joined, Mmio,
    ReadOnly, Register8,
};

use crate::cpu::CriticalSection;
use crate::gpio::{PB2, PB3, PB5};

register8! {
    /// SPI control register
    pub SPCR @ 0x4C;
    /// SPI status register
    pub SPSR @ 0x4D;
    /// SPI data register
    pub SPDR @ 0x4E;
}

field_enum! {
    /// Bit order on the wire (DORD)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum DataOrder: default MsbFirst {
        MsbFirst = 0,
        LsbFirst = 1,
    }
}

field_enum! {
    /// Master/slave select (MSTR)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Role: default Slave {
        Slave = 0,
        Master = 1,
    }
}

field_enum! {
    /// SPI clock polarity (CPOL)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Polarity: default IdleLow {
        /// Clock idles low, leading edge rising
        IdleLow = 0,
        /// Clock idles high, leading edge falling
        IdleHigh = 1,
    }
}

field_enum! {
    /// SPI clock phase (CPHA)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Phase: default CaptureOnFirstTransition {
        /// Sample on the leading edge, set up on the trailing edge
        CaptureOnFirstTransition = 0,
        /// Set up on the leading edge, sample on the trailing edge
        CaptureOnSecondTransition = 1,
    }
}

field_enum! {
    /// SPI mode: CPOL:CPHA as one two-bit field
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Mode: default Mode0 {
        /// CPOL=0, CPHA=0
        Mode0 = 0,
        /// CPOL=0, CPHA=1
        Mode1 = 1,
        /// CPOL=1, CPHA=0
        Mode2 = 2,
        /// CPOL=1, CPHA=1
        Mode3 = 3,
    }
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

impl From<(Polarity, Phase)> for Mode {
    fn from((polarity, phase): (Polarity, Phase)) -> Self {
        match (polarity, phase) {
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => Mode::Mode0,
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => Mode::Mode1,
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => Mode::Mode2,
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => Mode::Mode3,
        }
    }
}

field_enum! {
    /// SCK frequency as a fraction of the CPU clock (SPI2X:SPR1:SPR0).
    /// Only meaningful in master mode.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ClockRate: default Div4 {
        Div4 = 0,
        Div16 = 1,
        Div64 = 2,
        Div128 = 3,
        Div2 = 4,
        Div8 = 5,
        Div32 = 6,
        /// Same rate as `Div64`, reached with SPI2X set
        Div64Doubled = 7,
    }
}

/// SPI errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiError {
    /// SPDR was written while a transfer was still shifting out
    WriteCollision,
}

impl embedded_hal::spi::Error for SpiError {
    fn kind(&self) -> embedded_hal::spi::ErrorKind {
        embedded_hal::spi::ErrorKind::Other
    }
}

/// SPI master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock polarity and phase
    pub mode: Mode,
    /// SCK divider
    pub clock_rate: ClockRate,
    /// Bit order
    pub data_order: DataOrder,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Mode0,
            clock_rate: ClockRate::Div4,
            data_order: DataOrder::MsbFirst,
        }
    }
}

type Spie<B> = Flag<SPCR<B>, 7>;
type Spe<B> = Flag<SPCR<B>, 6>;
type Dord<B> = Field<SPCR<B>, DataOrder, 5, 1>;
type Mstr<B> = Field<SPCR<B>, Role, 4, 1>;
type Cpol<B> = Field<SPCR<B>, Polarity, 3, 1>;
type Cpha<B> = Field<SPCR<B>, Phase, 2, 1>;
type SpiMode<B> = Field<SPCR<B>, Mode, 2, 2>;
type Spr<B> = Field<SPCR<B>, u8, 0, 2>;

type Spif<B> = Flag<SPSR<B>, 7, ReadOnly>;
type Wcol<B> = Flag<SPSR<B>, 6, ReadOnly>;
type Spi2x<B> = Flag<SPSR<B>, 0>;

type Rate<B> = Joined<Spr<B>, Field<SPSR<B>, u8, 0, 1>, ClockRate>;

/// SPI peripheral.
#[derive(Debug, Clone, Copy)]
pub struct Spi<B = Mmio>(PhantomData<fn() -> B>);

impl<B> Spi<B> {
    /// Handle to the SPI registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B> Default for Spi<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus> Spi<B> {
    /// SPIE: serial transfer complete interrupt enable.
    pub fn interrupt_enabled(&self) -> bool {
        Spie::<B>::get()
    }

    /// Raise the SPI interrupt on transfer complete. Needs the global
    /// interrupt enable as well.
    pub fn set_interrupt_enabled(&self, enabled: bool) {
        Spie::<B>::set(enabled);
    }

    /// SPE: SPI enable.
    pub fn is_enabled(&self) -> bool {
        Spe::<B>::get()
    }

    /// Enable or disable the SPI.
    pub fn set_enabled(&self, enabled: bool) {
        Spe::<B>::set(enabled);
    }

    /// DORD: bit order on the wire.
    pub fn data_order(&self) -> DataOrder {
        Dord::<B>::get()
    }

    /// Select LSB or MSB first.
    pub fn set_data_order(&self, order: DataOrder) {
        Dord::<B>::set(order);
    }

    /// Master or slave. If SS is an input and is driven low while in master
    /// mode, hardware drops back to slave and sets SPIF.
    pub fn role(&self) -> Role {
        Mstr::<B>::get()
    }

    /// MSTR: select master or slave.
    pub fn set_role(&self, role: Role) {
        Mstr::<B>::set(role);
    }

    /// CPOL: SCK level when idle.
    pub fn clock_polarity(&self) -> Polarity {
        Cpol::<B>::get()
    }

    /// Set CPOL.
    pub fn set_clock_polarity(&self, polarity: Polarity) {
        Cpol::<B>::set(polarity);
    }

    /// CPHA: edge on which data is sampled.
    pub fn clock_phase(&self) -> Phase {
        Cpha::<B>::get()
    }

    /// Set CPHA.
    pub fn set_clock_phase(&self, phase: Phase) {
        Cpha::<B>::set(phase);
    }

    /// CPOL and CPHA as one SPI mode.
    pub fn mode(&self) -> Mode {
        SpiMode::<B>::get()
    }

    /// Set polarity and phase in one write.
    pub fn set_mode(&self, mode: Mode) {
        SpiMode::<B>::set(mode);
    }

    /// SCK rate relative to the CPU clock (SPR1:0 with SPI2X).
    pub fn clock_rate(&self) -> ClockRate {
        Rate::<B>::get()
    }

    /// Writes SPR1:0 in SPCR, then SPI2X in SPSR.
    pub fn set_clock_rate(&self, rate: ClockRate) {
        Rate::<B>::set(rate);
    }

    /// SPI2X: double the SCK rate in master mode.
    pub fn double_speed(&self) -> bool {
        Spi2x::<B>::get()
    }

    /// Set SPI2X.
    pub fn set_double_speed(&self, enabled: bool) {
        Spi2x::<B>::set(enabled);
    }

    /// SPIF: a transfer completed. Cleared by reading SPSR with the flag set
    /// and then accessing SPDR.
    pub fn transfer_complete(&self) -> bool {
        Spif::<B>::get()
    }

    /// WCOL: SPDR was written during a transfer. Cleared like SPIF.
    pub fn write_collision(&self) -> bool {
        Wcol::<B>::get()
    }

    /// Configure as bus master and enable the peripheral.
    ///
    /// SS is made an output and driven high before MSTR is set, so the
    /// peripheral cannot fall back to slave mode. SCK and MOSI become
    /// outputs only after SPE is set, so no stray edge is clocked out while
    /// the pins change hands. The sequence runs with interrupts disabled.
    pub fn init_master(&self, config: &SpiConfig) {
        #[cfg(feature = "defmt")]
        defmt::debug!("SPI init master: {}", config);

        let ss = PB2::<B>::new();
        ss.set_data_direction(DataDirection::Output);

        let _cs = CriticalSection::<B>::acquire();
        ss.set_value(DigitalValue::High);

        self.set_mode(config.mode);
        self.set_clock_rate(config.clock_rate);
        self.set_data_order(config.data_order);
        self.set_role(Role::Master);
        self.set_enabled(true);

        PB5::<B>::new().set_data_direction(DataDirection::Output);
        PB3::<B>::new().set_data_direction(DataDirection::Output);
    }

    /// Shift one byte out and return the byte shifted in.
    pub fn transfer_byte(&self, byte: u8) -> Result<u8, SpiError> {
        SPDR::<B>::write(byte);
        while !self.transfer_complete() {}

        let collided = self.write_collision();
        // Reading SPDR after SPSR clears SPIF and WCOL
        let received = SPDR::<B>::read();

        if collided {
            Err(SpiError::WriteCollision)
        } else {
            Ok(received)
        }
    }
}

impl<B: DataBus> embedded_hal::spi::ErrorType for Spi<B> {
    type Error = SpiError;
}

impl<B: DataBus> embedded_hal::spi::SpiBus<u8> for Spi<B> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words.iter_mut() {
            *word = self.transfer_byte(0x00)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for &word in words {
            self.transfer_byte(word)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let len = read.len().max(write.len());
        for i in 0..len {
            let received = self.transfer_byte(write.get(i).copied().unwrap_or(0x00))?;
            if let Some(slot) = read.get_mut(i) {
                *slot = received;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words.iter_mut() {
            *word = self.transfer_byte(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Every transfer waits for SPIF before returning
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avrio_hal::sim::Access;
    use avrio_hal::Sim;
    use embedded_hal::spi::SpiBus;

    /// Loopback slave that answers with the inverted byte and completes
    /// every transfer at once.
    fn inverting_slave(address: u16, _previous: u8, written: u8) -> u8 {
        if address == 0x4E {
            Sim::poke(0x4D, Sim::peek(0x4D) | 0b1000_0000);
            !written
        } else {
            written
        }
    }

    #[test]
    fn test_clock_rate_joined() {
        Sim::reset();
        let spi = Spi::<Sim>::new();
        Sim::poke(0x4C, 0b0101_0000);

        spi.set_clock_rate(ClockRate::Div32);

        assert_eq!(Sim::peek(0x4C), 0b0101_0010);
        assert_eq!(Sim::peek(0x4D), 0b0000_0001);
        assert!(spi.double_speed());
        assert_eq!(spi.clock_rate(), ClockRate::Div32);

        for &rate in ClockRate::VARIANTS {
            spi.set_clock_rate(rate);
            assert_eq!(spi.clock_rate(), rate);
        }
    }

    #[test]
    fn test_mode_matches_polarity_and_phase() {
        Sim::reset();
        let spi = Spi::<Sim>::new();

        for &mode in Mode::VARIANTS {
            spi.set_mode(mode);
            let (polarity, phase) = mode.into();
            assert_eq!(spi.clock_polarity(), polarity);
            assert_eq!(spi.clock_phase(), phase);
            assert_eq!(Mode::from((polarity, phase)), mode);
        }
    }

    #[test]
    fn test_init_master() {
        Sim::reset();
        Sim::poke(0x5F, 0b1000_0000);
        let spi = Spi::<Sim>::new();

        spi.init_master(&SpiConfig {
            mode: Mode::Mode3,
            clock_rate: ClockRate::Div16,
            data_order: DataOrder::LsbFirst,
        });

        // SPE | DORD | MSTR | CPOL | CPHA | SPR0
        assert_eq!(Sim::peek(0x4C), 0b0111_1101);
        assert_eq!(Sim::peek(0x24), 0b0010_1100);
        assert_eq!(Sim::peek(0x25), 0b0000_0100);
        assert_eq!(Sim::peek(0x5F), 0b1000_0000);
        assert_eq!(spi.role(), Role::Master);
    }

    #[test]
    fn test_init_master_sequence() {
        Sim::reset();
        Sim::poke(0x5F, 0b1000_0000);

        Spi::<Sim>::new().init_master(&SpiConfig::default());

        let log = Sim::accesses();
        let position = |access: Access| log.iter().position(|&a| a == access);
        let writes_to = |address: u16| {
            log.iter()
                .enumerate()
                .filter(move |(_, a)| matches!(a, Access::Write(addr, _) if *addr == address))
                .map(|(i, _)| i)
        };

        let disabled = position(Access::Write(0x5F, 0)).unwrap();
        let restored = position(Access::Write(0x5F, 0b1000_0000)).unwrap();
        let ss_output = position(Access::Write(0x24, 0b0000_0100)).unwrap();
        let ss_high = position(Access::Write(0x25, 0b0000_0100)).unwrap();
        let enabled = position(Access::Write(0x4C, 0b0101_0000)).unwrap();
        let sck_output = position(Access::Write(0x24, 0b0010_0100)).unwrap();

        assert!(ss_output < disabled);
        assert!(disabled < ss_high);
        assert!(ss_high < enabled);
        assert!(enabled < sck_output);
        assert!(writes_to(0x4C).all(|i| disabled < i && i < restored));
        assert!(writes_to(0x24).skip(1).all(|i| i < restored));
    }

    #[test]
    fn test_transfer_byte() {
        Sim::reset();
        Sim::set_write_hook(Some(inverting_slave));
        let spi = Spi::<Sim>::new();

        assert_eq!(spi.transfer_byte(0x0F), Ok(0xF0));
    }

    #[test]
    fn test_write_collision() {
        Sim::reset();
        Sim::poke(0x4D, 0b1100_0000);
        let spi = Spi::<Sim>::new();

        assert_eq!(spi.transfer_byte(0x55), Err(SpiError::WriteCollision));
    }

    #[test]
    fn test_spi_bus_transfer() {
        Sim::reset();
        Sim::set_write_hook(Some(inverting_slave));
        let mut spi = Spi::<Sim>::new();

        let mut read = [0u8; 3];
        spi.transfer(&mut read, &[0x01, 0x02]).unwrap();
        assert_eq!(read, [0xFE, 0xFD, 0xFF]);

        let mut buf = [0xAA, 0x55];
        spi.transfer_in_place(&mut buf).unwrap();
        assert_eq!(buf, [0x55, 0xAA]);

        SpiBus::<u8>::write(&mut spi, &[1, 2, 3]).unwrap();
        SpiBus::<u8>::flush(&mut spi).unwrap();
    }
}
