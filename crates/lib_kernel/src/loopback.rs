//! Loopback register model
//!
//! Stands in for the board's device windows in host tests. Each address
//! holds one value, so whatever a driver writes it reads back, unless the
//! address has been given device-like behavior:
//!
//! - split: reads and writes hit different registers at one address (ATA
//!   status/command, DUART status/clock-select). Writes are only visible
//!   through the access log; reads return what the "device" put there.
//! - clear on read: a read returns the value, then the register drops to a
//!   configured idle value, like a latched interrupt condition.
//! - fifo: a 16-bit port where writes append and reads pop.
//!
//! Every bus cycle is recorded in order.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use spin::Mutex;

use crate::mmio::{Reg16, Reg8, RegisterBus};

/// Value an unbacked address reads as
pub const FLOATING: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read8(usize, u8),
    Write8(usize, u8),
    Read16(usize, u16),
    Write16(usize, u16),
}

impl Access {
    pub fn addr(&self) -> usize {
        match *self {
            Access::Read8(a, _) | Access::Write8(a, _) => a,
            Access::Read16(a, _) | Access::Write16(a, _) => a,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Access::Write8(..) | Access::Write16(..))
    }
}

#[derive(Default)]
struct State {
    bytes: BTreeMap<usize, u8>,
    words: BTreeMap<usize, u16>,
    split: BTreeSet<usize>,
    clear_on_read: BTreeMap<usize, u8>,
    fifos: BTreeMap<usize, VecDeque<u16>>,
    log: Vec<Access>,
}

#[derive(Default)]
pub struct LoopbackBus {
    state: Mutex<State>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make reads and writes at `reg` independent registers.
    pub fn split(&self, reg: Reg8) -> &Self {
        self.state.lock().split.insert(reg.addr());
        self
    }

    /// After each read, `reg` reads as `cleared` until the device sets it again.
    pub fn clear_on_read(&self, reg: Reg8, cleared: u8) -> &Self {
        self.state.lock().clear_on_read.insert(reg.addr(), cleared);
        self
    }

    pub fn fifo(&self, reg: Reg16) -> &Self {
        self.state.lock().fifos.entry(reg.addr()).or_default();
        self
    }

    /// Device side: change what `reg` reads as. Not recorded.
    pub fn set(&self, reg: Reg8, value: u8) {
        self.state.lock().bytes.insert(reg.addr(), value);
    }

    /// Device side: queue a word for the driver to read.
    pub fn push_word(&self, reg: Reg16, value: u16) {
        let mut state = self.state.lock();
        state.fifos.entry(reg.addr()).or_default().push_back(value);
    }

    /// Device side: take everything the driver wrote to a fifo port.
    pub fn drain_words(&self, reg: Reg16) -> Vec<u16> {
        let mut state = self.state.lock();
        state
            .fifos
            .get_mut(&reg.addr())
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// What `reg` would read as, without the read's side effects.
    pub fn peek(&self, reg: Reg8) -> u8 {
        self.state.lock().bytes.get(&reg.addr()).copied().unwrap_or(FLOATING)
    }

    /// Last value written to `reg`, if any.
    pub fn latched(&self, reg: Reg8) -> Option<u8> {
        let state = self.state.lock();
        state.log.iter().rev().find_map(|a| match *a {
            Access::Write8(addr, v) if addr == reg.addr() => Some(v),
            _ => None,
        })
    }

    pub fn accesses(&self) -> Vec<Access> {
        self.state.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    pub fn count(&self, pred: impl Fn(&Access) -> bool) -> usize {
        self.state.lock().log.iter().filter(|a| pred(a)).count()
    }

    /// Values written to `reg`, in order.
    pub fn writes_to(&self, reg: Reg8) -> Vec<u8> {
        let state = self.state.lock();
        state
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write8(addr, v) if addr == reg.addr() => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl RegisterBus for LoopbackBus {
    fn read8(&self, reg: Reg8) -> u8 {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let addr = reg.addr();
        let value = state.bytes.get(&addr).copied().unwrap_or(FLOATING);
        if let Some(&cleared) = state.clear_on_read.get(&addr) {
            state.bytes.insert(addr, cleared);
        }
        state.log.push(Access::Read8(addr, value));
        value
    }

    fn write8(&self, reg: Reg8, value: u8) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let addr = reg.addr();
        // Split registers: the write goes to the device, reads are unaffected.
        if !state.split.contains(&addr) {
            state.bytes.insert(addr, value);
        }
        state.log.push(Access::Write8(addr, value));
    }

    fn read16(&self, reg: Reg16) -> u16 {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let addr = reg.addr();
        let value = match state.fifos.get_mut(&addr) {
            Some(queue) => queue.pop_front().unwrap_or(0xFFFF),
            None => state.words.get(&addr).copied().unwrap_or(0xFFFF),
        };
        state.log.push(Access::Read16(addr, value));
        value
    }

    fn write16(&self, reg: Reg16, value: u16) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let addr = reg.addr();
        match state.fifos.get_mut(&addr) {
            Some(queue) => queue.push_back(value),
            None => {
                state.words.insert(addr, value);
            }
        }
        state.log.push(Access::Write16(addr, value));
    }
}
