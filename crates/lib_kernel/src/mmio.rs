//! Memory-mapped register access
//!
//! Every call is exactly one bus cycle, issued in program order. Nothing is
//! cached or merged: on this hardware a read can clear a latched condition or
//! pop a FIFO, and a write can change which interrupts fire next.

use alloc::sync::Arc;
use volatile::Volatile;

/// Address of an 8-bit wide register
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg8(usize);

/// Address of a 16-bit wide register
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg16(usize);

impl Reg8 {
    pub const fn at(base: usize, offset: usize) -> Self {
        Reg8(base + offset)
    }

    pub const fn addr(self) -> usize {
        self.0
    }
}

impl Reg16 {
    pub const fn at(base: usize, offset: usize) -> Self {
        Reg16(base + offset)
    }

    pub const fn addr(self) -> usize {
        self.0
    }
}

/// Raw register bus.
///
/// Takes `&self` for writes as well: device registers are shared state that
/// the owning driver serializes with its own lock. No access ever fails; an
/// absent device just reads back whatever the bus floats to.
pub trait RegisterBus {
    fn read8(&self, reg: Reg8) -> u8;
    fn write8(&self, reg: Reg8, value: u8);
    fn read16(&self, reg: Reg16) -> u16;
    fn write16(&self, reg: Reg16, value: u16);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read8(&self, reg: Reg8) -> u8 {
        (**self).read8(reg)
    }

    fn write8(&self, reg: Reg8, value: u8) {
        (**self).write8(reg, value)
    }

    fn read16(&self, reg: Reg16) -> u16 {
        (**self).read16(reg)
    }

    fn write16(&self, reg: Reg16, value: u16) {
        (**self).write16(reg, value)
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for Arc<T> {
    fn read8(&self, reg: Reg8) -> u8 {
        (**self).read8(reg)
    }

    fn write8(&self, reg: Reg8, value: u8) {
        (**self).write8(reg, value)
    }

    fn read16(&self, reg: Reg16) -> u16 {
        (**self).read16(reg)
    }

    fn write16(&self, reg: Reg16, value: u16) {
        (**self).write16(reg, value)
    }
}

/// The physical bus: volatile loads and stores at absolute addresses.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every `Reg8`/`Reg16` later passed to this bus must name mapped device
    /// memory (or otherwise valid memory) of the tagged width, and 16-bit
    /// registers must be 2-byte aligned. The board's register maps satisfy
    /// this on the 68k targets, where the device windows are identity mapped.
    pub const unsafe fn new() -> Self {
        Mmio { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read8(&self, reg: Reg8) -> u8 {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        let cell = unsafe { &*(reg.addr() as *const u8) };
        Volatile::new_read_only(cell).read()
    }

    #[inline]
    fn write8(&self, reg: Reg8, value: u8) {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        let cell = unsafe { &mut *(reg.addr() as *mut u8) };
        Volatile::new_write_only(cell).write(value);
    }

    #[inline]
    fn read16(&self, reg: Reg16) -> u16 {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        let cell = unsafe { &*(reg.addr() as *const u16) };
        Volatile::new_read_only(cell).read()
    }

    #[inline]
    fn write16(&self, reg: Reg16, value: u16) {
        // SAFETY: guaranteed by the contract of `Mmio::new`.
        let cell = unsafe { &mut *(reg.addr() as *mut u16) };
        Volatile::new_write_only(cell).write(value);
    }
}
