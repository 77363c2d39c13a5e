//! Kernel support shared by the Y Ddraig board drivers.
//!
//! Everything here is hardware-facing plumbing that the IDE and DUART drivers
//! build on: width-typed register access, the two known board revisions,
//! interrupt attachment and irq-save locking, the error type, and the
//! ring-buffer logger.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod board;
pub mod error;
pub mod irq;
pub mod logger;
pub mod mmio;

#[cfg(any(test, feature = "loopback"))]
pub mod loopback;

pub use error::{KernelError, KernelResult};
