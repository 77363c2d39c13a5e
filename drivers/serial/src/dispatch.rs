//! DUART interrupt handler
//!
//! Only receive-ready is serviced. The masked interrupt status register is
//! not decoded: every invocation takes exactly one character.

use core::sync::atomic::Ordering;
use lib_kernel::{
    irq::{IrqHandler, IrqReturn},
    mmio::RegisterBus,
};

use crate::port::{DuartPort, IRQ_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatchState {
    Idle = 0,
    Servicing = 1,
}

impl<B> DuartPort<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    pub fn dispatch_state(&self) -> DispatchState {
        match self.state.load(Ordering::Acquire) {
            0 => DispatchState::Idle,
            _ => DispatchState::Servicing,
        }
    }

    /// Take one character under the lock and park it in the hand-off slot.
    fn rx_chars(&self) {
        let chan = self.channel.lock();
        let rx = chan.receive_one();
        self.icount.rx.fetch_add(1, Ordering::Relaxed);
        if self.rx_slot.push(rx).is_err() {
            self.icount.overrun.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Deliver whatever is parked to the tty layer. Runs unlocked.
    fn flush_rx(&self) {
        let ldisc = &self.host.ldisc;
        while let Some(rx) = self.rx_slot.pop() {
            ldisc.insert_char(rx.ch, rx.status);
        }
        ldisc.push();
    }
}

impl<B> IrqHandler for DuartPort<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        IRQ_NAME
    }

    fn handle(&self, _irq: u8) -> IrqReturn {
        if self
            .state
            .compare_exchange(
                DispatchState::Idle as u8,
                DispatchState::Servicing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return IrqReturn::None;
        }

        self.rx_chars();
        self.flush_rx();

        self.state.store(DispatchState::Idle as u8, Ordering::Release);
        IrqReturn::Handled
    }
}
