//! Host-side register simulation
//!
//! `Sim` is a [`DataBus`] backed by a per-thread 256-byte data space. It lets
//! every accessor in this crate and in chip catalogs run under `cargo test`
//! on the host, and records each bus access so tests can check ordering.
//!
//! State is thread-local, so tests running in parallel never observe each
//! other. Call [`Sim::reset`] at the start of each test.

use core::cell::RefCell;

use heapless::{Deque, Vec};

use crate::bus::DataBus;

/// Number of accesses kept in the log; older entries are dropped first.
pub const LOG_CAPACITY: usize = 64;

/// Size of the simulated data space (covers all of the I/O and extended I/O
/// ranges).
pub const MEMORY_SIZE: usize = 0x100;

/// One bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u16),
    Write(u16, u8),
}

/// Called on every bus write with `(address, previous, written)`; returns
/// the byte actually stored. Used to model hardware that reacts to writes,
/// e.g. a conversion-complete bit that clears itself.
pub type WriteHook = fn(address: u16, previous: u8, written: u8) -> u8;

struct State {
    memory: [u8; MEMORY_SIZE],
    log: Deque<Access, LOG_CAPACITY>,
    hook: Option<WriteHook>,
}

impl State {
    const fn new() -> Self {
        Self {
            memory: [0; MEMORY_SIZE],
            log: Deque::new(),
            hook: None,
        }
    }

    fn record(&mut self, access: Access) {
        if self.log.is_full() {
            self.log.pop_front();
        }
        // Cannot fail: a slot was just freed if needed
        let _ = self.log.push_back(access);
    }
}

std::thread_local! {
    static STATE: RefCell<State> = const { RefCell::new(State::new()) };
}

fn index(address: u16) -> usize {
    let index = usize::from(address);
    assert!(
        index < MEMORY_SIZE,
        "address {address:#06x} is outside the simulated data space"
    );
    index
}

/// Simulated data bus.
#[derive(Debug, Clone, Copy)]
pub enum Sim {}

impl Sim {
    /// Zero all memory, clear the access log and remove any write hook.
    pub fn reset() {
        STATE.with(|state| *state.borrow_mut() = State::new());
    }

    /// Read a byte without going through the bus (not logged).
    pub fn peek(address: u16) -> u8 {
        STATE.with(|state| state.borrow().memory[index(address)])
    }

    /// Store a byte without going through the bus (not logged, no hook).
    pub fn poke(address: u16, value: u8) {
        STATE.with(|state| state.borrow_mut().memory[index(address)] = value);
    }

    /// Snapshot of the access log, oldest first.
    pub fn accesses() -> Vec<Access, LOG_CAPACITY> {
        STATE.with(|state| state.borrow().log.iter().copied().collect())
    }

    /// Forget logged accesses, keeping memory as is.
    pub fn clear_accesses() {
        STATE.with(|state| state.borrow_mut().log.clear());
    }

    /// Install (or remove) the write hook.
    pub fn set_write_hook(hook: Option<WriteHook>) {
        STATE.with(|state| state.borrow_mut().hook = hook);
    }
}

impl DataBus for Sim {
    unsafe fn read_byte(address: u16) -> u8 {
        STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.record(Access::Read(address));
            state.memory[index(address)]
        })
    }

    unsafe fn write_byte(address: u16, value: u8) {
        let (previous, hook) = STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.record(Access::Write(address, value));
            (state.memory[index(address)], state.hook)
        });

        // The borrow is released here so the hook may poke other addresses
        let stored = match hook {
            Some(hook) => hook(address, previous, value),
            None => value,
        };

        Self::poke(address, stored);
    }
}
