//! Interrupt plumbing
//!
//! The board has one autovectored line per device. [`IrqTable`] maps an irq
//! number to the handlers attached to it and is what the platform's exception
//! vector calls into. [`IrqLock`] is the irq-save spinlock drivers use to keep
//! process context and their own handler apart.

use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU16, Ordering};
use spin::{Mutex, MutexGuard, RwLock};

use crate::error::{KernelError, KernelResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not ours (or could not be serviced)
    None,
    Handled,
}

/// Something that can service a hardware interrupt.
///
/// Runs in interrupt context: must not block and must not allocate.
pub trait IrqHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn handle(&self, irq: u8) -> IrqReturn;
}

/// Attach/detach interface drivers see.
pub trait InterruptController: Send + Sync {
    fn request_irq(&self, irq: u8, handler: Arc<dyn IrqHandler>) -> KernelResult<()>;
    fn free_irq(&self, irq: u8, name: &'static str);
}

/// Handlers registered per interrupt line
pub struct IrqTable {
    handlers: RwLock<BTreeMap<u8, Vec<Arc<dyn IrqHandler>>>>,
}

impl IrqTable {
    pub const fn new() -> Self {
        IrqTable {
            handlers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Handle hardware interrupt
    ///
    /// Takes the table read lock, then whatever the handler locks. Drivers
    /// attach and detach while holding their own irq-save lock, which is the
    /// opposite order. That is only sound on a single CPU where the irq-save
    /// lock masks the line, so this cannot run while the driver lock is held.
    pub fn dispatch(&self, irq: u8) -> IrqReturn {
        let handlers = self.handlers.read();
        let mut ret = IrqReturn::None;
        if let Some(list) = handlers.get(&irq) {
            for handler in list {
                if handler.handle(irq) == IrqReturn::Handled {
                    ret = IrqReturn::Handled;
                }
            }
        }
        ret
    }

    pub fn handler_count(&self, irq: u8) -> usize {
        self.handlers.read().get(&irq).map_or(0, Vec::len)
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController for IrqTable {
    fn request_irq(&self, irq: u8, handler: Arc<dyn IrqHandler>) -> KernelResult<()> {
        let mut handlers = self.handlers.write();
        let list = handlers.entry(irq).or_insert_with(Vec::new);
        if list.iter().any(|h| h.name() == handler.name()) {
            return Err(KernelError::Busy);
        }
        list.push(handler);
        Ok(())
    }

    fn free_irq(&self, irq: u8, name: &'static str) {
        let mut handlers = self.handlers.write();
        if let Some(list) = handlers.get_mut(&irq) {
            list.retain(|h| h.name() != name);
            if list.is_empty() {
                handlers.remove(&irq);
            }
        }
    }
}

/// Saved interrupt priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqFlags(pub u16);

/// CPU-level interrupt masking, i.e. `local_irq_save`/`local_irq_restore`.
pub trait InterruptMask: Send + Sync {
    fn save_and_disable(&self) -> IrqFlags;
    fn restore(&self, flags: IrqFlags);
}

/// Highest 68k interrupt priority level; masks everything but NMI.
pub const IPL_MASK_ALL: u16 = 7;

/// Software model of the 68k status register's priority field.
///
/// Used where the real SR is not reachable, and by the host test suites to
/// observe that critical sections really run masked.
pub struct SoftIpl {
    level: AtomicU16,
}

impl SoftIpl {
    pub const fn new() -> Self {
        SoftIpl {
            level: AtomicU16::new(0),
        }
    }

    pub fn level(&self) -> u16 {
        self.level.load(Ordering::Acquire)
    }

    pub fn is_masked(&self) -> bool {
        self.level() == IPL_MASK_ALL
    }
}

impl Default for SoftIpl {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptMask for SoftIpl {
    fn save_and_disable(&self) -> IrqFlags {
        IrqFlags(self.level.swap(IPL_MASK_ALL, Ordering::AcqRel))
    }

    fn restore(&self, flags: IrqFlags) {
        self.level.store(flags.0, Ordering::Release);
    }
}

/// Spinlock whose process-context acquisition masks interrupts first.
pub struct IrqLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqLock<T> {
    pub const fn new(value: T) -> Self {
        IrqLock {
            inner: Mutex::new(value),
        }
    }

    /// Process context: mask interrupts, then take the lock. Dropping the
    /// guard releases the lock before restoring the saved level.
    pub fn lock_irqsave<'a>(&'a self, mask: &'a dyn InterruptMask) -> IrqGuard<'a, T> {
        let flags = mask.save_and_disable();
        IrqGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            mask,
            flags,
        }
    }

    /// Interrupt context, where the line is already masked.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

pub struct IrqGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    mask: &'a dyn InterruptMask,
    flags: IrqFlags,
}

impl<T> Deref for IrqGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the guard is dropped exactly once, here.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.mask.restore(self.flags);
    }
}
