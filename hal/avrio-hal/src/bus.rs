//! Raw data-space access
//!
//! A bus is the pair of primitives every register access ends in: read one
//! byte at a data-space address, write one byte at a data-space address. The
//! bus is a type parameter of every register, so the choice between real
//! hardware and the host simulation is made at compile time and costs
//! nothing at run time.

/// Byte-wide access to the data space.
///
/// Implementations are stateless; every register type names its bus as an
/// associated type and calls these functions directly.
pub trait DataBus {
    /// Read the byte at `address`.
    ///
    /// # Safety
    /// `address` must be a readable I/O register (or RAM) on the device.
    /// Reads may have hardware side effects such as popping a receive FIFO.
    unsafe fn read_byte(address: u16) -> u8;

    /// Write `value` to the byte at `address`.
    ///
    /// # Safety
    /// `address` must be a writable I/O register (or RAM) on the device.
    unsafe fn write_byte(address: u16, value: u8);
}

/// Memory-mapped I/O on the device itself.
///
/// Accesses are volatile: the compiler will neither elide nor reorder them
/// relative to other volatile accesses.
#[derive(Debug, Clone, Copy)]
pub enum Mmio {}

impl DataBus for Mmio {
    #[inline(always)]
    unsafe fn read_byte(address: u16) -> u8 {
        // Safety: the caller guarantees `address` is a readable register.
        unsafe { core::ptr::read_volatile(address as usize as *const u8) }
    }

    #[inline(always)]
    unsafe fn write_byte(address: u16, value: u8) {
        // Safety: the caller guarantees `address` is a writable register.
        unsafe { core::ptr::write_volatile(address as usize as *mut u8, value) }
    }
}
