//! Kernel logging system with circular ring buffer
//!
//! Log calls never allocate and never block, so they are usable from the
//! DUART interrupt handler and before the console exists.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lib_kernel::{log_info, log_error};
//!
//! log_info!("Y Ddraig IDE driver");
//! log_error!("unable to attach interrupt {}", irq);
//! ```
//!
//! Once a console is up, [`set_sink`] mirrors every accepted entry to it as
//! `[LEVEL] [file:line] message\n`.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicUsize, Ordering};
use heapless::String;
use spin::Mutex;

/// Number of entries kept before the oldest is overwritten
pub const LOG_BUFFER_SIZE: usize = 64;

/// Maximum message length per log entry (bytes)
pub const MAX_MESSAGE_LEN: usize = 128;

const LINE_LEN: usize = MAX_MESSAGE_LEN + 96;

/// Log levels for kernel logging
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    TRACE = 0,
    DEBUG = 1,
    INFO = 2,
    WARN = 3,
    ERROR = 4,
    /// Errors that may lead to a system halt
    CRITICAL = 5,
}

impl LogLevel {
    /// 5-character padded tag
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::TRACE => "TRACE",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::INFO => "INFO ",
            LogLevel::WARN => "WARN ",
            LogLevel::ERROR => "ERROR",
            LogLevel::CRITICAL => "CRIT ",
        }
    }
}

/// A single log entry in the circular buffer
#[derive(Clone)]
pub struct LogEntry {
    level: LogLevel,
    file: &'static str,
    line: u32,
    /// Truncated to `MAX_MESSAGE_LEN`
    message: String<MAX_MESSAGE_LEN>,
}

impl LogEntry {
    pub const fn new() -> Self {
        Self {
            level: LogLevel::INFO,
            file: "",
            line: 0,
            message: String::new(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes into a fixed-capacity string, silently dropping what doesn't fit.
struct Truncating<'a, const N: usize>(&'a mut String<N>);

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

const EMPTY_ENTRY: LogEntry = LogEntry::new();

/// Kernel logger with circular ring buffer
///
/// When the buffer is full, old entries are overwritten.
pub struct KernelLogger {
    entries: [LogEntry; LOG_BUFFER_SIZE],
    /// Next slot to write
    write_pos: usize,
    /// Entries currently held (saturates at `LOG_BUFFER_SIZE`)
    len: usize,
    min_level: LogLevel,
    sink: Option<fn(&[u8])>,
}

impl KernelLogger {
    pub const fn new() -> Self {
        Self {
            entries: [EMPTY_ENTRY; LOG_BUFFER_SIZE],
            write_pos: 0,
            len: 0,
            min_level: LogLevel::TRACE,
            sink: None,
        }
    }

    /// Record a message. Returns `false` if it was filtered out.
    pub fn log(&mut self, level: LogLevel, file: &'static str, line: u32, args: fmt::Arguments) -> bool {
        if level < self.min_level {
            return false;
        }

        let entry = &mut self.entries[self.write_pos];
        entry.level = level;
        entry.file = file;
        entry.line = line;
        entry.message.clear();
        let _ = Truncating(&mut entry.message).write_fmt(args);

        if let Some(sink) = self.sink {
            let mut text: String<LINE_LEN> = String::new();
            let _ = write!(
                Truncating(&mut text),
                "[{}] [{}:{}] {}\n",
                level.as_str(),
                file,
                line,
                entry.message
            );
            sink(text.as_bytes());
        }

        self.write_pos = (self.write_pos + 1) % LOG_BUFFER_SIZE;
        self.len = (self.len + 1).min(LOG_BUFFER_SIZE);
        true
    }

    /// Set the minimum log level to record
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_sink(&mut self, sink: fn(&[u8])) {
        self.sink = Some(sink);
    }

    /// Held entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        let start = (self.write_pos + LOG_BUFFER_SIZE - self.len) % LOG_BUFFER_SIZE;
        (0..self.len).map(move |i| &self.entries[(start + i) % LOG_BUFFER_SIZE])
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries().last()
    }
}

impl Default for KernelLogger {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_LOGGER: Mutex<KernelLogger> = Mutex::new(KernelLogger::new());
static TOTAL_LOGS: AtomicUsize = AtomicUsize::new(0);
static DROPPED_LOGS: AtomicUsize = AtomicUsize::new(0);

/// Entry point for the logging macros.
///
/// If the logger is already held (an interrupt arrived mid-log) the message
/// is counted as dropped instead of spinning.
pub fn log_args(level: LogLevel, file: &'static str, line: u32, args: fmt::Arguments) {
    match GLOBAL_LOGGER.try_lock() {
        Some(mut logger) => {
            if logger.log(level, file, line, args) {
                TOTAL_LOGS.fetch_add(1, Ordering::Relaxed);
            } else {
                DROPPED_LOGS.fetch_add(1, Ordering::Relaxed);
            }
        }
        None => {
            DROPPED_LOGS.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Mirror accepted entries to an output device (usually the serial console)
pub fn set_sink(sink: fn(&[u8])) {
    GLOBAL_LOGGER.lock().set_sink(sink);
}

pub fn set_min_level(level: LogLevel) {
    GLOBAL_LOGGER.lock().set_min_level(level);
}

/// Run `f` over the global logger, e.g. to dump it after a fault.
pub fn with_logger<R>(f: impl FnOnce(&KernelLogger) -> R) -> R {
    f(&GLOBAL_LOGGER.lock())
}

/// `(total_logs, dropped_logs)`
pub fn stats() -> (usize, usize) {
    (
        TOTAL_LOGS.load(Ordering::Relaxed),
        DROPPED_LOGS.load(Ordering::Relaxed),
    )
}

// ============================================================================
// LOGGING MACROS
// ============================================================================

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {
        $crate::logger::log_args($level, file!(), line!(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::TRACE, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::DEBUG, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::INFO, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::WARN, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::ERROR, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => {
        $crate::klog!($crate::logger::LogLevel::CRITICAL, $($arg)*)
    };
}
