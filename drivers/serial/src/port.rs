//! The DUART as a uart port
//!
//! `DuartPort` owns the channel behind an irq-save lock and carries what
//! the tty layer expects of a port: lifecycle (startup attaches the
//! interrupt handler, shutdown detaches it), the uart ops table and the
//! per-port counters.

use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};
use crossbeam_queue::ArrayQueue;
use lib_kernel::{
    board::{BoardConfig, BoardVariant, DUART_CLOCK_HZ, IRQ_NUM_DUART, VECTOR_BASE},
    irq::{InterruptController, InterruptMask, IrqGuard, IrqHandler, IrqLock},
    log_error,
    mmio::RegisterBus,
    KernelError, KernelResult,
};

use crate::channel::DuartChannel;
use crate::dispatch::DispatchState;
use crate::regs::{Channel, DuartRegs, RxChar, RxStatus};

pub const PORT_UNKNOWN: u16 = 0;
pub const PORT_XR68C681: u16 = 2000;
pub const PORT_TYPE_NAME: &str = "XR68C681 DUART module";

/// Hardware receive FIFO depth
pub const DUART_FIFO_SIZE: u8 = 3;

/// Name the interrupt handler is attached under
pub const IRQ_NAME: &str = "XR68C681UART";

// Modem status bits reported by `get_mctrl`
pub const TIOCM_CAR: u32 = 0x040;
pub const TIOCM_CTS: u32 = 0x020;
pub const TIOCM_DSR: u32 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Line settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termios {
    pub baud: u32,
    pub bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub flow_control: bool,
}

impl Termios {
    /// The console's one configuration, 9600 8N1
    pub const CONSOLE: Termios = Termios {
        baud: 9600,
        bits: 8,
        parity: Parity::None,
        stop_bits: 1,
        flow_control: false,
    };
}

/// Receive side of the tty layer. Called from interrupt context, so both
/// methods must only buffer.
pub trait FlipBuffer: Send + Sync {
    fn insert_char(&self, ch: u8, status: RxStatus);
    /// Make inserted characters visible to readers.
    fn push(&self);
}

/// Port operations the tty core drives. Defaults are the no-ops this
/// hardware needs.
pub trait UartOps: Send + Sync {
    fn tx_empty(&self) -> bool;

    /// No modem lines are wired; report them as permanently asserted.
    fn get_mctrl(&self) -> u32 {
        TIOCM_CTS | TIOCM_DSR | TIOCM_CAR
    }

    fn set_mctrl(&self, _sigs: u32) {}

    /// Send what the transmit queue holds. Returns the bytes sent.
    fn start_tx(&self, xmit: &mut dyn Iterator<Item = u8>) -> usize;

    fn stop_tx(&self) {}

    fn stop_rx(&self) {}

    fn enable_ms(&self) {}

    fn break_ctl(&self, _on: bool) {}

    fn startup(&self) -> KernelResult<()>;

    fn shutdown(&self);

    fn set_termios(&self, _new: &Termios, _old: Option<&Termios>) {}

    fn type_name(&self) -> Option<&'static str>;

    fn release_port(&self) {}

    fn request_port(&self) -> KernelResult<()> {
        Ok(())
    }

    fn config_port(&self, flags: u32);

    fn verify_port(&self, port_type: u16) -> KernelResult<()>;
}

#[derive(Debug, Default)]
pub struct UartIcount {
    pub rx: AtomicU32,
    pub tx: AtomicU32,
    pub overrun: AtomicU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IcountSnapshot {
    pub rx: u32,
    pub tx: u32,
    pub overrun: u32,
}

impl UartIcount {
    pub fn snapshot(&self) -> IcountSnapshot {
        IcountSnapshot {
            rx: self.rx.load(Ordering::Relaxed),
            tx: self.tx.load(Ordering::Relaxed),
            overrun: self.overrun.load(Ordering::Relaxed),
        }
    }
}

/// Kernel services a port is wired to
#[derive(Clone)]
pub struct PortHost {
    pub irqs: Arc<dyn InterruptController>,
    pub ipl: Arc<dyn InterruptMask>,
    pub ldisc: Arc<dyn FlipBuffer>,
}

pub struct DuartPort<B> {
    line: usize,
    irq: u8,
    uartclk: u32,
    variant: BoardVariant,
    pub(crate) channel: IrqLock<DuartChannel<B>>,
    pub(crate) host: PortHost,
    /// At most one received character between the handler and the tty layer
    pub(crate) rx_slot: ArrayQueue<RxChar>,
    pub(crate) state: AtomicU8,
    pub(crate) icount: UartIcount,
    port_type: AtomicU16,
    fifosize: AtomicU8,
    attached: AtomicBool,
    this: Weak<DuartPort<B>>,
}

impl<B> DuartPort<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    /// Channel B of the configured DUART, wired to `host`.
    pub fn new(line: usize, config: &BoardConfig, bus: B, host: PortHost) -> Arc<Self> {
        let regs = DuartRegs::new(config.duart, Channel::B);
        Arc::new_cyclic(|this| DuartPort {
            line,
            irq: IRQ_NUM_DUART,
            uartclk: DUART_CLOCK_HZ,
            variant: config.variant,
            channel: IrqLock::new(DuartChannel::new(bus, regs)),
            host,
            rx_slot: ArrayQueue::new(1),
            state: AtomicU8::new(DispatchState::Idle as u8),
            icount: UartIcount::default(),
            port_type: AtomicU16::new(PORT_UNKNOWN),
            fifosize: AtomicU8::new(0),
            attached: AtomicBool::new(false),
            this: this.clone(),
        })
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn irq(&self) -> u8 {
        self.irq
    }

    pub fn uartclk(&self) -> u32 {
        self.uartclk
    }

    pub fn variant(&self) -> BoardVariant {
        self.variant
    }

    pub fn port_type(&self) -> u16 {
        self.port_type.load(Ordering::Acquire)
    }

    pub fn fifosize(&self) -> u8 {
        self.fifosize.load(Ordering::Acquire)
    }

    pub fn icount(&self) -> IcountSnapshot {
        self.icount.snapshot()
    }

    /// Interrupt handler is attached
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Take the port lock from process context.
    pub fn lock(&self) -> IrqGuard<'_, DuartChannel<B>> {
        self.channel.lock_irqsave(&*self.host.ipl)
    }

    pub fn is_locked(&self) -> bool {
        self.channel.is_locked()
    }

    fn vector(&self) -> u8 {
        VECTOR_BASE + self.irq
    }

    /// Attach under the lock; on success switch to the running mask.
    fn attach(&self) -> KernelResult<()> {
        let chan = self.lock();
        chan.set_interrupt_vector_base(self.vector());
        chan.quiesce_reception(self.variant);

        let handler: Arc<dyn IrqHandler> = self.this.upgrade().ok_or(KernelError::NoDevice)?;
        self.host
            .irqs
            .request_irq(self.irq, handler)
            .map_err(|_| KernelError::IrqUnavailable)?;
        self.attached.store(true, Ordering::Release);

        chan.enable_reception(self.variant);
        Ok(())
    }
}

impl<B> UartOps for DuartPort<B>
where
    B: RegisterBus + Send + Sync + 'static,
{
    fn tx_empty(&self) -> bool {
        self.lock().tx_ready()
    }

    fn start_tx(&self, xmit: &mut dyn Iterator<Item = u8>) -> usize {
        let sent = self.lock().drain_transmit(xmit);
        self.icount.tx.fetch_add(sent as u32, Ordering::Relaxed);
        sent
    }

    /// Program the vector, hold reception off while the handler is
    /// attached, then enable it. An attach failure leaves the port without
    /// reception but is not an error for the caller.
    fn startup(&self) -> KernelResult<()> {
        // The lock is released by the time we log: the console may be the
        // logger's sink and takes the same lock.
        if let Err(err) = self.attach() {
            log_error!(
                "{}: unable to attach {} {} interrupt vector={} ({})",
                IRQ_NAME,
                IRQ_NAME,
                self.line,
                self.irq,
                err
            );
        }
        Ok(())
    }

    fn shutdown(&self) {
        let chan = self.lock();
        chan.disable_reception();
        if self.attached.swap(false, Ordering::AcqRel) {
            self.host.irqs.free_irq(self.irq, IRQ_NAME);
        }
    }

    fn type_name(&self) -> Option<&'static str> {
        (self.port_type() == PORT_XR68C681).then_some(PORT_TYPE_NAME)
    }

    fn config_port(&self, _flags: u32) {
        self.port_type.store(PORT_XR68C681, Ordering::Release);
        self.fifosize.store(DUART_FIFO_SIZE, Ordering::Release);
    }

    fn verify_port(&self, port_type: u16) -> KernelResult<()> {
        match port_type {
            PORT_UNKNOWN | PORT_XR68C681 => Ok(()),
            _ => Err(KernelError::InvalidArgument),
        }
    }
}
