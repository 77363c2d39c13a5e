//! Polled console on a registered DUART port
//!
//! Fixed at 9600 8N1. Writes take the port lock with interrupts masked, so
//! they interleave cleanly with the receive handler.

use alloc::sync::Arc;
use core::hint::spin_loop;
use lib_kernel::{mmio::RegisterBus, KernelError, KernelResult};

use crate::channel::DuartChannel;
use crate::port::{DuartPort, Termios, UartOps};
use crate::registry::{PortRegistry, DUART_MAX_PORTS};

pub const CONSOLE_NAME: &str = "ttyS";

/// Status polls per character before writing anyway
pub const CONSOLE_TX_SPIN: usize = 10_000;

/// Byte sink the logger and print macros write through
pub trait ConsoleSink: Send + Sync {
    fn write_bytes(&self, bytes: &[u8]);
}

pub struct Console<B> {
    index: usize,
    port: Arc<DuartPort<B>>,
    termios: Termios,
}

impl<B> Console<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    /// Bind the console to port `index`. An index outside the port table
    /// falls back to 0. `options` are accepted for the command-line form
    /// but the line settings never change.
    pub fn setup(registry: &PortRegistry<B>, index: isize, _options: Option<&str>) -> KernelResult<Self> {
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < DUART_MAX_PORTS)
            .unwrap_or(0);
        let port = registry.get(index).ok_or(KernelError::NoDevice)?;

        let termios = Termios::CONSOLE;
        port.set_termios(&termios, None);
        Ok(Console { index, port, termios })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn termios(&self) -> Termios {
        self.termios
    }

    pub fn write(&self, bytes: &[u8]) {
        let chan = self.port.lock();
        for &b in bytes {
            if b == b'\n' {
                put_polled(&chan, b'\r');
            }
            put_polled(&chan, b);
        }
    }
}

fn put_polled<B: RegisterBus>(chan: &DuartChannel<B>, ch: u8) {
    for _ in 0..CONSOLE_TX_SPIN {
        if chan.tx_ready() {
            break;
        }
        spin_loop();
    }
    chan.put_char(ch);
}

impl<B> ConsoleSink for Console<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    fn write_bytes(&self, bytes: &[u8]) {
        self.write(bytes);
    }
}
