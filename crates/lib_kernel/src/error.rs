//! Kernel Error Types
//!
//! Only configuration-time failures live here. Device-reported conditions
//! (bad sector, parity error, ...) stay as status register bits and are
//! handed to the caller untouched.

use core::fmt;

pub const ENXIO: i32 = 6;
pub const ENOMEM: i32 = 12;
pub const EBUSY: i32 = 16;
pub const EEXIST: i32 = 17;
pub const ENODEV: i32 = 19;
pub const EINVAL: i32 = 22;

/// Kernel error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Controlling structure could not be allocated
    OutOfMemory,

    /// Invalid parameters, or a port type the driver does not handle
    InvalidArgument,

    /// No device registered at the requested index
    NoDevice,

    /// Slot or line already in use
    Busy,

    /// One-shot configuration was already published
    AlreadyInitialized,

    /// The interrupt line could not be attached
    IrqUnavailable,

    /// Status code returned by an external collaborator, passed through as-is
    Collaborator(i32),
}

impl KernelError {
    /// Get a human-readable description of the error
    pub fn description(self) -> &'static str {
        match self {
            KernelError::OutOfMemory => "out of memory",
            KernelError::InvalidArgument => "invalid argument",
            KernelError::NoDevice => "no such device",
            KernelError::Busy => "resource busy",
            KernelError::AlreadyInitialized => "already initialized",
            KernelError::IrqUnavailable => "unable to attach interrupt",
            KernelError::Collaborator(_) => "collaborator reported failure",
        }
    }

    /// Negative status code, as returned across the driver boundary
    pub fn errno(self) -> i32 {
        match self {
            KernelError::OutOfMemory => -ENOMEM,
            KernelError::InvalidArgument => -EINVAL,
            KernelError::NoDevice => -ENODEV,
            KernelError::Busy => -EBUSY,
            KernelError::AlreadyInitialized => -EEXIST,
            KernelError::IrqUnavailable => -ENXIO,
            KernelError::Collaborator(rc) => rc,
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Collaborator(rc) => write!(f, "{} ({})", self.description(), rc),
            _ => write!(f, "{} ({})", self.description(), self.errno()),
        }
    }
}

/// Result type for kernel and driver operations
pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_values_are_negative_kernel_codes() {
        assert_eq!(KernelError::OutOfMemory.errno(), -12);
        assert_eq!(KernelError::InvalidArgument.errno(), -22);
        assert_eq!(KernelError::NoDevice.errno(), -19);
        assert_eq!(KernelError::Collaborator(-5).errno(), -5);
    }

    #[test]
    fn display_includes_code() {
        let text = std::format!("{}", KernelError::InvalidArgument);
        assert_eq!(text, "invalid argument (-22)");
    }
}
