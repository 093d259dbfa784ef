//! avrio Hardware Abstraction Layer core
//!
//! This crate defines the register model that chip-specific catalogs
//! (ATmega328P, etc.) plug their register maps into. Every peripheral
//! accessor, from a GPIO pin to a timer prescaler, is built from the same
//! handful of generic pieces and resolves at compile time to a volatile
//! read, a volatile write, or a read-modify-write of one byte.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application firmware                   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  avrio-hal-<chip> (register catalog)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  avrio-hal (this crate - model)         │
//! │  Field / Joined / Pin / InterruptGuard  │
//! │  Register8 / Pair                       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ bus::Mmio     │       │ sim::Sim      │
//! │ (hardware)    │       │ (host tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Concurrency
//!
//! Registers are shared, device-lifetime state and nothing here locks them.
//! A bitfield write is a read followed by a write: if an interrupt handler
//! changes the same register in between, that change is lost. Code that
//! shares a register with an interrupt handler must run the update inside an
//! [`interrupt::InterruptGuard`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod bus;
pub mod digital;
pub mod field;
pub mod interrupt;
pub mod pin;
pub mod register;
#[cfg(any(test, feature = "std"))]
pub mod sim;

// Re-export key types at crate root for convenience
pub use bus::{DataBus, Mmio};
pub use digital::DigitalValue;
pub use field::{
    Bit, ClearOnOne, Field, FieldValue, Flag, Joined, RawField, ReadOnly, ReadWrite, Strobe,
};
pub use interrupt::InterruptGuard;
pub use pin::{DataDirection, PartialPort, Pin, Port};
pub use register::{Pair, Register8};
#[cfg(any(test, feature = "std"))]
pub use sim::Sim;
