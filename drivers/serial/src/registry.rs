//! Registered ports, indexed by line number

use alloc::sync::Arc;
use core::array;
use spin::RwLock;
use lib_kernel::{KernelError, KernelResult};

use crate::port::DuartPort;

/// Only channel B is wired out on the board.
pub const DUART_MAX_PORTS: usize = 1;

pub struct PortRegistry<B> {
    ports: RwLock<[Option<Arc<DuartPort<B>>>; DUART_MAX_PORTS]>,
}

impl<B> PortRegistry<B> {
    pub fn new() -> Self {
        PortRegistry {
            ports: RwLock::new(array::from_fn(|_| None)),
        }
    }

    pub fn add_port(&self, line: usize, port: Arc<DuartPort<B>>) -> KernelResult<()> {
        let mut ports = self.ports.write();
        let slot = ports.get_mut(line).ok_or(KernelError::InvalidArgument)?;
        if slot.is_some() {
            return Err(KernelError::Busy);
        }
        *slot = Some(port);
        Ok(())
    }

    pub fn get(&self, line: usize) -> Option<Arc<DuartPort<B>>> {
        self.ports.read().get(line).and_then(Option::clone)
    }

    pub fn remove_port(&self, line: usize) -> Option<Arc<DuartPort<B>>> {
        self.ports.write().get_mut(line).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.ports.read().iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B> Default for PortRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
