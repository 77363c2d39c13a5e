// lib.rs - Taskfile transport for the Y Ddraig IDE interface
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::sync::Arc;
use lib_kernel::{
    board::IRQ_NUM_IDE,
    log_info,
    mmio::RegisterBus,
    KernelError, KernelResult,
};

pub mod consts;
pub mod types;
use consts::*;
pub use types::{Chipset, HostFlags, IdePortInfo, IdeRegs, Taskfile, TfValid};

/// Register-level operations the block layer drives a command with.
///
/// This is a mapper, not a sequencer: nothing here waits, retries or times
/// out. The caller owns command ordering and error recovery.
pub trait TaskfileOps: Send + Sync {
    /// Read the status register. Clears the device's pending interrupt.
    fn read_status(&self) -> u8;
    fn exec_command(&self, cmd: u8);
    /// Read the alternate status register. Leaves interrupt state alone.
    fn read_alt_status(&self) -> u8;
    fn write_device_control(&self, ctl: u8);
    fn select_device(&self, select: u8);
    fn load_taskfile(&self, tf: &Taskfile, valid: TfValid);
    fn read_taskfile(&self, tf: &mut Taskfile, valid: TfValid);
    /// Fill `buf` from the data port. Returns the bytes stored.
    fn stream_in(&self, buf: &mut [u8]) -> usize;
    /// Send `buf` through the data port. Returns the words written.
    fn stream_out(&self, buf: &[u8]) -> usize;
}

/* ============================================================================
 * TASKFILE TRANSPORT
 * ============================================================================ */

pub struct IdeTransport<B> {
    bus: B,
    regs: IdeRegs,
}

impl<B: RegisterBus> IdeTransport<B> {
    pub const fn new(bus: B, regs: IdeRegs) -> Self {
        IdeTransport { bus, regs }
    }

    pub fn regs(&self) -> &IdeRegs {
        &self.regs
    }

    pub fn read_status(&self) -> u8 {
        self.bus.read8(self.regs.status)
    }

    pub fn exec_command(&self, cmd: u8) {
        self.bus.write8(self.regs.status, cmd);
    }

    pub fn read_alt_status(&self) -> u8 {
        self.bus.read8(self.regs.altstatus)
    }

    pub fn write_device_control(&self, ctl: u8) {
        self.bus.write8(self.regs.altstatus, ctl);
    }

    pub fn select_device(&self, select: u8) {
        self.bus.write8(self.regs.device, select | ATA_DEVICE_OBS);
    }

    /// Write the fields named in `valid`. Registers are independent, so the
    /// order below is just register order.
    pub fn load_taskfile(&self, tf: &Taskfile, valid: TfValid) {
        let r = &self.regs;
        if valid.has(TfValid::FEATURE) {
            self.bus.write8(r.feature, tf.feature);
        }
        if valid.has(TfValid::NSECT) {
            self.bus.write8(r.nsect, tf.nsect);
        }
        if valid.has(TfValid::LBAL) {
            self.bus.write8(r.lbal, tf.lbal);
        }
        if valid.has(TfValid::LBAM) {
            self.bus.write8(r.lbam, tf.lbam);
        }
        if valid.has(TfValid::LBAH) {
            self.bus.write8(r.lbah, tf.lbah);
        }
        if valid.has(TfValid::DEVICE) {
            self.bus.write8(r.device, tf.device);
        }
    }

    /// Read the fields named in `valid` into `tf`; the rest keep whatever the
    /// caller put there.
    pub fn read_taskfile(&self, tf: &mut Taskfile, valid: TfValid) {
        let r = &self.regs;
        if valid.has(TfValid::ERROR) {
            tf.feature = self.bus.read8(r.feature);
        }
        if valid.has(TfValid::NSECT) {
            tf.nsect = self.bus.read8(r.nsect);
        }
        if valid.has(TfValid::LBAL) {
            tf.lbal = self.bus.read8(r.lbal);
        }
        if valid.has(TfValid::LBAM) {
            tf.lbam = self.bus.read8(r.lbam);
        }
        if valid.has(TfValid::LBAH) {
            tf.lbah = self.bus.read8(r.lbah);
        }
        if valid.has(TfValid::DEVICE) {
            tf.device = self.bus.read8(r.device);
        }
    }

    /// Reads `ceil(len / 2)` words, high byte first. For an odd length the
    /// final word is still read in full; its second byte is dropped.
    pub fn stream_in(&self, buf: &mut [u8]) -> usize {
        for chunk in buf.chunks_mut(2) {
            let word = self.bus.read16(self.regs.data).to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        buf.len()
    }

    /// Writes `ceil(len / 2)` words, high byte first. For an odd length the
    /// final word's second byte is zero.
    pub fn stream_out(&self, buf: &[u8]) -> usize {
        let mut words = 0;
        for chunk in buf.chunks(2) {
            let lo = chunk.get(1).copied().unwrap_or(0);
            self.bus.write16(self.regs.data, u16::from_be_bytes([chunk[0], lo]));
            words += 1;
        }
        words
    }
}

impl<B: RegisterBus + Send + Sync> TaskfileOps for IdeTransport<B> {
    fn read_status(&self) -> u8 {
        IdeTransport::read_status(self)
    }

    fn exec_command(&self, cmd: u8) {
        IdeTransport::exec_command(self, cmd)
    }

    fn read_alt_status(&self) -> u8 {
        IdeTransport::read_alt_status(self)
    }

    fn write_device_control(&self, ctl: u8) {
        IdeTransport::write_device_control(self, ctl)
    }

    fn select_device(&self, select: u8) {
        IdeTransport::select_device(self, select)
    }

    fn load_taskfile(&self, tf: &Taskfile, valid: TfValid) {
        IdeTransport::load_taskfile(self, tf, valid)
    }

    fn read_taskfile(&self, tf: &mut Taskfile, valid: TfValid) {
        IdeTransport::read_taskfile(self, tf, valid)
    }

    fn stream_in(&self, buf: &mut [u8]) -> usize {
        IdeTransport::stream_in(self, buf)
    }

    fn stream_out(&self, buf: &[u8]) -> usize {
        IdeTransport::stream_out(self, buf)
    }
}

/* ============================================================================
 * HOST REGISTRATION
 * ============================================================================ */

/// Opaque host handed out by the block layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdeHostHandle(pub u32);

/// The generic IDE layer, as seen from this driver.
pub trait IdeHostRegistry {
    /// `None` when the host structure cannot be allocated.
    fn host_alloc(&self, info: &IdePortInfo, ops: Arc<dyn TaskfileOps>) -> Option<IdeHostHandle>;
    /// Probe and register; a non-zero status is the block layer's own error.
    fn host_register(&self, host: IdeHostHandle, info: &IdePortInfo) -> Result<(), i32>;
    fn host_free(&self, host: IdeHostHandle);
}

pub fn port_info(regs: &IdeRegs) -> IdePortInfo {
    IdePortInfo {
        name: "ddraig-ide",
        host_flags: HostFlags::NO_DMA,
        chipset: Chipset::Generic,
        irq: IRQ_NUM_IDE,
        data_addr: regs.base(),
    }
}

/// Bring up the IDE interface: allocate a host, register it, and hand the
/// block layer our taskfile operations.
pub fn init<B>(transport: Arc<IdeTransport<B>>, hosts: &dyn IdeHostRegistry) -> KernelResult<IdeHostHandle>
where
    B: RegisterBus + Send + Sync + 'static,
{
    log_info!("Y Ddraig IDE driver");

    let info = port_info(transport.regs());
    let host = hosts
        .host_alloc(&info, transport)
        .ok_or(KernelError::OutOfMemory)?;

    if let Err(rc) = hosts.host_register(host, &info) {
        hosts.host_free(host);
        return Err(KernelError::Collaborator(rc));
    }

    Ok(host)
}

#[cfg(test)]
mod tests;
