//! One DUART channel at register level
//!
//! No waiting and no shadow state: the hardware is the state. Callers that
//! share the channel with the interrupt handler go through the port's lock.

use lib_kernel::board::{self, BoardVariant, DISABLED_MASK};
use lib_kernel::mmio::RegisterBus;

use crate::regs::{sr, DuartRegs, RxChar, RxStatus};

pub struct DuartChannel<B> {
    bus: B,
    regs: DuartRegs,
}

impl<B: RegisterBus> DuartChannel<B> {
    pub const fn new(bus: B, regs: DuartRegs) -> Self {
        DuartChannel { bus, regs }
    }

    pub fn regs(&self) -> &DuartRegs {
        &self.regs
    }

    /// Transmit holding register can take a byte.
    pub fn tx_ready(&self) -> bool {
        self.bus.read8(self.regs.sr) & sr::TXRDY != 0
    }

    /// Write one byte to the transmitter. Does not check `tx_ready`; a byte
    /// written while the holder is full may be lost.
    pub fn put_char(&self, ch: u8) {
        self.bus.write8(self.regs.rhr, ch);
    }

    /// Send everything `source` yields, one `put_char` per byte, and return
    /// how many went out.
    pub fn drain_transmit<I>(&self, source: I) -> usize
    where
        I: IntoIterator<Item = u8>,
    {
        source.into_iter().fold(0, |sent, ch| {
            self.put_char(ch);
            sent + 1
        })
    }

    /// Consume one received character. Data is read before status so the
    /// status describes the character just taken.
    pub fn receive_one(&self) -> RxChar {
        let ch = self.bus.read8(self.regs.rhr);
        let status = RxStatus(self.bus.read8(self.regs.sr));
        RxChar { ch, status }
    }

    pub fn write_interrupt_mask(&self, mask: u8) {
        self.bus.write8(self.regs.imr, mask);
    }

    /// Reception off, counter as the variant needs it. Held while the
    /// interrupt handler is being attached.
    pub fn quiesce_reception(&self, variant: BoardVariant) {
        self.write_interrupt_mask(board::startup_mask_for(variant));
    }

    /// A single write of the variant's running mask. Idempotent.
    pub fn enable_reception(&self, variant: BoardVariant) {
        self.write_interrupt_mask(board::running_mask_for(variant));
    }

    pub fn disable_reception(&self) {
        self.write_interrupt_mask(DISABLED_MASK);
    }

    pub fn set_interrupt_vector_base(&self, vector: u8) {
        self.bus.write8(self.regs.ivr, vector);
    }
}
