//! USART0 serial port
//!
//! Blocking byte-level driver over the USART0 registers, with
//! [`embedded_io`] and [`core::fmt::Write`] implementations on top.
//!
//! The CPU clock is a const generic on the handle so baud rate arithmetic
//! resolves at compile time:
//!
//! ```ignore
//! let serial: Usart0<Mmio, 8_000_000> = Usart0::new();
//! serial.configure(&UartConfig::default());
//! writeln!(serial, "adc = {}", value).ok();
//! ```

use core::marker::PhantomData;

use avrio_hal::{
    field_enum, register8, ClearOnOne, DataBus, Field, Flag, Joined, Mmio, Pair, ReadOnly,
    Register8,
};

register8! {
    /// USART0 control and status register A
    pub UCSR0A @ 0xC0, clear_on_one = 0b0100_0000, write_zero = 0b0001_1100;
    /// USART0 control and status register B
    pub UCSR0B @ 0xC1;
    /// USART0 control and status register C
    pub UCSR0C @ 0xC2;
    /// USART0 baud rate register, low byte
    pub UBRR0L @ 0xC4;
    /// USART0 baud rate register, high byte (bits 11:8)
    pub UBRR0H @ 0xC5;
    /// USART0 I/O data register
    pub UDR0 @ 0xC6;
}

/// UBRR0H:UBRR0L
pub type BaudRateRegister<B = Mmio> = Pair<UBRR0L<B>, UBRR0H<B>>;

/// UBRR0 is twelve bits wide.
pub const BAUD_RATE_REGISTER_MAX: u16 = 0x0FFF;

/// CPU clock assumed when none is given.
pub const DEFAULT_CPU_HZ: u32 = 16_000_000;

field_enum! {
    /// Operating mode (UMSEL01:0)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Mode: default Asynchronous {
        Asynchronous = 0,
        Synchronous = 1,
        MasterSpi = 3,
    }
}

field_enum! {
    /// Parity (UPM01:0). The reserved code reads back as `Disabled`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum Parity: default Disabled {
        Disabled = 0,
        Even = 2,
        Odd = 3,
    }
}

field_enum! {
    /// Stop bits (USBS0); the receiver ignores this setting
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum StopBits: default One {
        One = 0,
        Two = 1,
    }
}

field_enum! {
    /// Character size (UCSZ02 in UCSR0B joined with UCSZ01:0 in UCSR0C).
    /// Reserved codes read back as `Eight`.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum DataBits: default Eight {
        Five = 0,
        Six = 1,
        Seven = 2,
        Eight = 3,
        Nine = 7,
    }
}

field_enum! {
    /// Synchronous clock polarity (UCPOL0)
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum ClockPolarity: default Rising {
        /// Transmit on rising XCK edge, sample on falling
        Rising = 0,
        /// Transmit on falling XCK edge, sample on rising
        Falling = 1,
    }
}

/// Receive errors, sampled from UCSR0A before the data register is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// The stop bit of the received character was zero
    Frame,
    /// The receive buffer was full when a new start bit arrived
    Overrun,
    /// The received character failed the parity check
    Parity,
}

impl embedded_io::Error for UartError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            UartError::Frame | UartError::Parity => embedded_io::ErrorKind::InvalidData,
            UartError::Overrun => embedded_io::ErrorKind::Other,
        }
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Number of data bits
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Halve the baud divisor (U2X0) for better rate accuracy
    pub double_speed: bool,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::Disabled,
            stop_bits: StopBits::One,
            double_speed: false,
        }
    }
}

type Rxc<B> = Flag<UCSR0A<B>, 7, ReadOnly>;
type Txc<B> = Flag<UCSR0A<B>, 6, ClearOnOne>;
type Udre<B> = Flag<UCSR0A<B>, 5, ReadOnly>;
type Fe<B> = Flag<UCSR0A<B>, 4, ReadOnly>;
type Dor<B> = Flag<UCSR0A<B>, 3, ReadOnly>;
type Upe<B> = Flag<UCSR0A<B>, 2, ReadOnly>;
type U2x<B> = Flag<UCSR0A<B>, 1>;
type Mpcm<B> = Flag<UCSR0A<B>, 0>;

type Rxcie<B> = Flag<UCSR0B<B>, 7>;
type Txcie<B> = Flag<UCSR0B<B>, 6>;
type Udrie<B> = Flag<UCSR0B<B>, 5>;
type Rxen<B> = Flag<UCSR0B<B>, 4>;
type Txen<B> = Flag<UCSR0B<B>, 3>;
type Ucsz2<B> = Field<UCSR0B<B>, u8, 2, 1>;
type Rxb8<B> = Flag<UCSR0B<B>, 1, ReadOnly>;
type Txb8<B> = Flag<UCSR0B<B>, 0>;

type Umsel<B> = Field<UCSR0C<B>, Mode, 6, 2>;
type Upm<B> = Field<UCSR0C<B>, Parity, 4, 2>;
type Usbs<B> = Field<UCSR0C<B>, StopBits, 3, 1>;
type Ucsz<B> = Field<UCSR0C<B>, u8, 1, 2>;
type Ucpol<B> = Field<UCSR0C<B>, ClockPolarity, 0, 1>;

type CharacterSize<B> = Joined<Ucsz<B>, Ucsz2<B>, DataBits>;

/// USART0 with a CPU clock of `CPU_HZ`.
#[derive(Debug, Clone, Copy)]
pub struct Usart0<B = Mmio, const CPU_HZ: u32 = DEFAULT_CPU_HZ>(PhantomData<fn() -> B>);

impl<B, const CPU_HZ: u32> Usart0<B, CPU_HZ> {
    /// Handle to the USART0 registers.
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<B, const CPU_HZ: u32> Default for Usart0<B, CPU_HZ> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: DataBus, const CPU_HZ: u32> Usart0<B, CPU_HZ> {
    /// UMSEL01:0: operating mode.
    pub fn mode(&self) -> Mode {
        Umsel::<B>::get()
    }

    /// Select the operating mode.
    pub fn set_mode(&self, mode: Mode) {
        Umsel::<B>::set(mode);
    }

    /// UPM01:0: parity mode.
    pub fn parity(&self) -> Parity {
        Upm::<B>::get()
    }

    /// Select the parity mode.
    pub fn set_parity(&self, parity: Parity) {
        Upm::<B>::set(parity);
    }

    /// USBS0: stop bits sent by the transmitter.
    pub fn stop_bits(&self) -> StopBits {
        Usbs::<B>::get()
    }

    /// Select one or two stop bits.
    pub fn set_stop_bits(&self, stop_bits: StopBits) {
        Usbs::<B>::set(stop_bits);
    }

    /// UCSZ02:0: character size.
    pub fn data_bits(&self) -> DataBits {
        CharacterSize::<B>::get()
    }

    /// Select the character size (UCSZ01:0 in UCSR0C, UCSZ02 in UCSR0B).
    pub fn set_data_bits(&self, data_bits: DataBits) {
        CharacterSize::<B>::set(data_bits);
    }

    /// UCPOL0: clock edge used in synchronous mode.
    pub fn clock_polarity(&self) -> ClockPolarity {
        Ucpol::<B>::get()
    }

    /// Only used in synchronous mode; write `Rising` otherwise.
    pub fn set_clock_polarity(&self, polarity: ClockPolarity) {
        Ucpol::<B>::set(polarity);
    }

    /// U2X0: asynchronous double speed.
    pub fn double_speed(&self) -> bool {
        U2x::<B>::get()
    }

    /// Asynchronous mode only. Changes the effective baud rate, so set it
    /// before [`set_baud_rate`](Self::set_baud_rate).
    pub fn set_double_speed(&self, enabled: bool) {
        U2x::<B>::set(enabled);
    }

    /// MPCM0: ignore frames that are not addresses.
    pub fn multi_processor_mode(&self) -> bool {
        Mpcm::<B>::get()
    }

    /// Set MPCM0.
    pub fn set_multi_processor_mode(&self, enabled: bool) {
        Mpcm::<B>::set(enabled);
    }

    /// RXEN0: receiver enable.
    pub fn receiver_enabled(&self) -> bool {
        Rxen::<B>::get()
    }

    /// Enable or disable the receiver. Disabling flushes the receive buffer.
    pub fn set_receiver_enabled(&self, enabled: bool) {
        Rxen::<B>::set(enabled);
    }

    /// TXEN0: transmitter enable.
    pub fn transmitter_enabled(&self) -> bool {
        Txen::<B>::get()
    }

    /// Enable or disable the transmitter. Disabling waits for pending frames.
    pub fn set_transmitter_enabled(&self, enabled: bool) {
        Txen::<B>::set(enabled);
    }

    /// RXCIE0: receive complete interrupt enable.
    pub fn rx_complete_interrupt_enabled(&self) -> bool {
        Rxcie::<B>::get()
    }

    /// Set RXCIE0.
    pub fn set_rx_complete_interrupt_enabled(&self, enabled: bool) {
        Rxcie::<B>::set(enabled);
    }

    /// TXCIE0: transmit complete interrupt enable.
    pub fn tx_complete_interrupt_enabled(&self) -> bool {
        Txcie::<B>::get()
    }

    /// Set TXCIE0.
    pub fn set_tx_complete_interrupt_enabled(&self, enabled: bool) {
        Txcie::<B>::set(enabled);
    }

    /// UDRIE0: data register empty interrupt enable.
    pub fn data_register_empty_interrupt_enabled(&self) -> bool {
        Udrie::<B>::get()
    }

    /// Set UDRIE0.
    pub fn set_data_register_empty_interrupt_enabled(&self, enabled: bool) {
        Udrie::<B>::set(enabled);
    }

    /// Unread data is waiting in the receive buffer.
    pub fn rx_complete(&self) -> bool {
        Rxc::<B>::get()
    }

    /// The transmit shift register is empty and no new data is queued.
    pub fn tx_complete(&self) -> bool {
        Txc::<B>::get()
    }

    /// Clear TXC0 by writing a one to it.
    pub fn clear_tx_complete(&self) {
        Txc::<B>::clear();
    }

    /// The transmit buffer can take another byte.
    pub fn data_register_empty(&self) -> bool {
        Udre::<B>::get()
    }

    /// FE0: the character in the receive buffer had a bad stop bit.
    pub fn frame_error(&self) -> bool {
        Fe::<B>::get()
    }

    /// DOR0: a character was lost because the receive buffer was full.
    pub fn data_overrun(&self) -> bool {
        Dor::<B>::get()
    }

    /// UPE0: the character in the receive buffer failed the parity check.
    pub fn parity_error(&self) -> bool {
        Upe::<B>::get()
    }

    /// Ninth bit of the received character in 9-bit mode. Read before the
    /// data register.
    pub fn received_ninth_bit(&self) -> bool {
        Rxb8::<B>::get()
    }

    /// Ninth bit of the next character in 9-bit mode. Write before the data
    /// register.
    pub fn set_transmit_ninth_bit(&self, bit: bool) {
        Txb8::<B>::set(bit);
    }

    /// Raw 12-bit UBRR0 value.
    pub fn baud_rate_register(&self) -> u16 {
        BaudRateRegister::<B>::read() & BAUD_RATE_REGISTER_MAX
    }

    /// Write UBRR0. Bits above the twelfth are reserved and written as zero.
    pub fn set_baud_rate_register(&self, value: u16) {
        BaudRateRegister::<B>::write(value & BAUD_RATE_REGISTER_MAX);
    }

    fn baud_divisor(&self) -> u32 {
        if self.double_speed() {
            8
        } else {
            16
        }
    }

    /// Baud rate produced by the current UBRR0 and U2X0 settings.
    pub fn baud_rate(&self) -> u32 {
        let register = u32::from(self.baud_rate_register());
        CPU_HZ / (self.baud_divisor() * (register + 1))
    }

    /// Program UBRR0 for `baud`, rounding the divisor down so the actual
    /// rate is at or above the request. Rates too low for twelve bits clamp
    /// to the slowest setting.
    pub fn set_baud_rate(&self, baud: u32) {
        let register = CPU_HZ
            .checked_div(self.baud_divisor().saturating_mul(baud))
            .unwrap_or(u32::MAX)
            .saturating_sub(1)
            .min(u32::from(BAUD_RATE_REGISTER_MAX));

        #[cfg(feature = "defmt")]
        defmt::debug!("USART0 baud {} -> UBRR0 {}", baud, register);

        // Fits: clamped to twelve bits above
        self.set_baud_rate_register(register as u16);
    }

    /// Set up an asynchronous frame and enable the receiver and
    /// transmitter.
    pub fn configure(&self, config: &UartConfig) {
        #[cfg(feature = "defmt")]
        defmt::debug!("USART0 configure: {}", config);

        self.set_double_speed(config.double_speed);
        self.set_baud_rate(config.baud_rate);
        self.set_mode(Mode::Asynchronous);
        self.set_data_bits(config.data_bits);
        self.set_parity(config.parity);
        self.set_stop_bits(config.stop_bits);
        self.set_receiver_enabled(true);
        self.set_transmitter_enabled(true);
    }

    /// Wait for room in the transmit buffer, then queue `byte`.
    pub fn write_byte(&self, byte: u8) {
        while !self.data_register_empty() {}
        UDR0::<B>::write(byte);
    }

    /// Wait for a received byte.
    ///
    /// The error flags belong to the character at the head of the receive
    /// buffer, so they are sampled before UDR0 is read. The byte is consumed
    /// even when an error is returned.
    pub fn read_byte(&self) -> Result<u8, UartError> {
        while !self.rx_complete() {}

        let status = UCSR0A::<B>::read();
        let byte = UDR0::<B>::read();

        match Self::receive_error(status) {
            Some(error) => Err(error),
            None => Ok(byte),
        }
    }

    /// Error reported for the character at the head of the receive buffer.
    fn receive_error(status: u8) -> Option<UartError> {
        if status & Fe::<B>::MASK != 0 {
            Some(UartError::Frame)
        } else if status & Dor::<B>::MASK != 0 {
            Some(UartError::Overrun)
        } else if status & Upe::<B>::MASK != 0 {
            Some(UartError::Parity)
        } else {
            None
        }
    }

    /// A received byte is ready to read.
    pub fn available(&self) -> bool {
        self.rx_complete()
    }

    /// Wait until the transmit buffer has drained into the shift register.
    pub fn flush(&self) {
        while !self.data_register_empty() {}
    }
}

impl<B: DataBus, const CPU_HZ: u32> core::fmt::Write for Usart0<B, CPU_HZ> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

impl<B: DataBus, const CPU_HZ: u32> embedded_io::ErrorType for Usart0<B, CPU_HZ> {
    type Error = UartError;
}

impl<B: DataBus, const CPU_HZ: u32> embedded_io::Read for Usart0<B, CPU_HZ> {
    /// Blocks for the first byte, then takes whatever else is already
    /// waiting.
    ///
    /// An error is only returned for the first byte. A later byte with a
    /// receive error is left unread in UDR0, so the bytes already taken are
    /// returned and the next call reports the error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some((first, rest)) = buf.split_first_mut() else {
            return Ok(0);
        };

        *first = self.read_byte()?;
        let mut count = 1;
        for slot in rest {
            let status = UCSR0A::<B>::read();
            if status & Rxc::<B>::MASK == 0 || Self::receive_error(status).is_some() {
                break;
            }
            *slot = UDR0::<B>::read();
            count += 1;
        }
        Ok(count)
    }
}

impl<B: DataBus, const CPU_HZ: u32> embedded_io::Write for Usart0<B, CPU_HZ> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.write_byte(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Usart0::flush(self);
        Ok(())
    }
}

impl<B: DataBus, const CPU_HZ: u32> embedded_io::ReadReady for Usart0<B, CPU_HZ> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.available())
    }
}

impl<B: DataBus, const CPU_HZ: u32> embedded_io::WriteReady for Usart0<B, CPU_HZ> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.data_register_empty())
    }
}
