//! Y Ddraig board bring-up
//!
//! Picks the board revision, starts the IDE host where the revision has
//! one, registers the DUART port with the tty core and offers its console.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::sync::Arc;
use ide::{IdeHostHandle, IdeHostRegistry, IdeRegs, IdeTransport};
use lib_kernel::{
    board::{self, BoardConfig},
    irq::{InterruptController, InterruptMask},
    log_info,
    mmio::RegisterBus,
    KernelResult,
};
use serial::{Console, DuartPort, FlipBuffer, PortHost, PortRegistry, SerialCore};

pub mod console;

/// Line the console port is registered on
pub const CONSOLE_LINE: usize = 0;

/// Kernel services the board's drivers are wired to
#[derive(Clone)]
pub struct Platform {
    pub irqs: Arc<dyn InterruptController>,
    pub ipl: Arc<dyn InterruptMask>,
    pub ldisc: Arc<dyn FlipBuffer>,
    pub block: Arc<dyn IdeHostRegistry + Send + Sync>,
    pub tty: Arc<dyn SerialCore + Send + Sync>,
}

impl Platform {
    fn port_host(&self) -> PortHost {
        PortHost {
            irqs: self.irqs.clone(),
            ipl: self.ipl.clone(),
            ldisc: self.ldisc.clone(),
        }
    }
}

/// Publish the board configuration for the rest of the kernel. One shot.
pub fn select_variant(config: BoardConfig) -> KernelResult<&'static BoardConfig> {
    board::select(config)
}

pub struct Board<B> {
    config: BoardConfig,
    ports: PortRegistry<B>,
    ide: Option<IdeHostHandle>,
}

impl<B> Board<B>
where
    B: RegisterBus + Clone + Send + Sync + 'static,
{
    /// Start the drivers for `config`. Any failure is returned as-is after
    /// the steps that already succeeded are undone.
    pub fn bring_up(config: BoardConfig, bus: B, platform: &Platform) -> KernelResult<Self> {
        log_info!("Y Ddraig board {:?}, DUART at {:#x}", config.variant, config.duart.base);

        let ide = match config.ide_base {
            Some(base) => {
                let transport = Arc::new(IdeTransport::new(bus.clone(), IdeRegs::ddraig(base)));
                Some(ide::init(transport, platform.block.as_ref())?)
            }
            None => None,
        };

        match Self::start_serial(&config, bus, platform) {
            Ok(ports) => Ok(Board { config, ports, ide }),
            Err(err) => {
                if let Some(host) = ide {
                    platform.block.host_free(host);
                }
                Err(err)
            }
        }
    }

    fn start_serial(config: &BoardConfig, bus: B, platform: &Platform) -> KernelResult<PortRegistry<B>> {
        serial::register(platform.tty.as_ref())?;
        let ports = PortRegistry::new();
        if let Err(err) = serial::probe(
            CONSOLE_LINE,
            config,
            bus,
            platform.port_host(),
            &ports,
            platform.tty.as_ref(),
        ) {
            serial::unregister(platform.tty.as_ref());
            return Err(err);
        }
        Ok(ports)
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn ide_host(&self) -> Option<IdeHostHandle> {
        self.ide
    }

    pub fn ports(&self) -> &PortRegistry<B> {
        &self.ports
    }

    pub fn port(&self, line: usize) -> Option<Arc<DuartPort<B>>> {
        self.ports.get(line)
    }

    pub fn console(&self, index: isize, options: Option<&str>) -> KernelResult<Console<B>> {
        Console::setup(&self.ports, index, options)
    }

    /// Set up the console on the console line and route printing and
    /// logging through it.
    pub fn attach_console(&self) -> KernelResult<()> {
        let console = self.console(CONSOLE_LINE as isize, None)?;
        console::install(Arc::new(console))
    }

    /// Hand the ports back and unregister the serial driver.
    pub fn tear_down(self, platform: &Platform) {
        serial::remove(CONSOLE_LINE, &self.ports, platform.tty.as_ref());
        serial::unregister(platform.tty.as_ref());
    }
}

#[cfg(test)]
mod tests;
