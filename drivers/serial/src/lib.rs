// lib.rs - XR68C681 DUART serial driver for the Y Ddraig board
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::sync::Arc;
use lib_kernel::{
    board::BoardConfig,
    log_error, log_info,
    mmio::RegisterBus,
    KernelError, KernelResult,
};

pub mod channel;
pub mod console;
pub mod dispatch;
pub mod port;
pub mod regs;
pub mod registry;

pub use channel::DuartChannel;
pub use console::{Console, ConsoleSink};
pub use dispatch::DispatchState;
pub use port::{DuartPort, FlipBuffer, PortHost, Termios, UartOps};
pub use regs::{Channel, DuartRegs, RxChar, RxStatus};
pub use registry::{PortRegistry, DUART_MAX_PORTS};

pub const DRIVER_NAME: &str = "xr68c681-serial";
pub const TTY_MAJOR: u32 = 4;
pub const XR68C681_SERIAL_MINOR: u32 = 64;

/// What the tty core is told about this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartDriver {
    pub driver_name: &'static str,
    pub dev_name: &'static str,
    pub major: u32,
    pub minor: u32,
    pub nr: usize,
}

pub const DRIVER: UartDriver = UartDriver {
    driver_name: DRIVER_NAME,
    dev_name: console::CONSOLE_NAME,
    major: TTY_MAJOR,
    minor: XR68C681_SERIAL_MINOR,
    nr: DUART_MAX_PORTS,
};

/// The tty core, as seen from this driver. Status codes are the core's own
/// and are handed back untouched.
pub trait SerialCore {
    fn register_driver(&self, driver: &UartDriver) -> Result<(), i32>;
    fn unregister_driver(&self, driver: &UartDriver);
    fn add_one_port(&self, driver: &UartDriver, line: usize, ops: Arc<dyn UartOps>) -> Result<(), i32>;
    fn remove_one_port(&self, driver: &UartDriver, line: usize);
}

/// Register the driver with the tty core.
pub fn register(core: &dyn SerialCore) -> KernelResult<()> {
    log_info!("XR68C681 serial driver");

    core.register_driver(&DRIVER).map_err(|rc| {
        log_error!("Failed to register uart driver");
        KernelError::Collaborator(rc)
    })
}

pub fn unregister(core: &dyn SerialCore) {
    core.unregister_driver(&DRIVER);
}

/// Create the port for `line`, record it in `registry` and hand it to the
/// tty core. The port is configured (type and fifo depth) before the core
/// sees it.
pub fn probe<B>(
    line: usize,
    config: &BoardConfig,
    bus: B,
    host: PortHost,
    registry: &PortRegistry<B>,
    core: &dyn SerialCore,
) -> KernelResult<Arc<DuartPort<B>>>
where
    B: RegisterBus + Send + Sync + 'static,
{
    let port = DuartPort::new(line, config, bus, host);
    port.config_port(0);
    registry.add_port(line, port.clone())?;

    if let Err(rc) = core.add_one_port(&DRIVER, line, port.clone()) {
        registry.remove_port(line);
        log_error!("Failed to add serial port {}", line);
        return Err(KernelError::Collaborator(rc));
    }

    Ok(port)
}

pub fn remove<B>(line: usize, registry: &PortRegistry<B>, core: &dyn SerialCore) -> Option<Arc<DuartPort<B>>> {
    let port = registry.remove_port(line)?;
    core.remove_one_port(&DRIVER, line);
    Some(port)
}
