//! Board console: print macros and the logger's output sink.

use alloc::sync::Arc;
use conquer_once::spin::OnceCell;
use core::fmt::{self, Write};
use lib_kernel::{logger, KernelError, KernelResult};
use serial::ConsoleSink;

static CONSOLE: OnceCell<Arc<dyn ConsoleSink>> = OnceCell::uninit();

/// Make `console` the target of `serial_print!` and of the kernel log.
/// Can only happen once.
pub fn install(console: Arc<dyn ConsoleSink>) -> KernelResult<()> {
    CONSOLE
        .try_init_once(|| console)
        .map_err(|_| KernelError::AlreadyInitialized)?;
    logger::set_sink(log_sink);
    Ok(())
}

pub fn is_installed() -> bool {
    CONSOLE.is_initialized()
}

fn log_sink(line: &[u8]) {
    if let Some(console) = CONSOLE.get() {
        console.write_bytes(line);
    }
}

struct ConsoleWriter<'a>(&'a dyn ConsoleSink);

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // Output before the console is up goes nowhere.
    if let Some(console) = CONSOLE.get() {
        let _ = ConsoleWriter(console.as_ref()).write_fmt(args);
    }
}

/// Prints to the board console.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::console::_print(format_args!($($arg)*))
    };
}

/// Prints to the board console, appending a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($fmt:expr) => ($crate::serial_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::serial_print!(
        concat!($fmt, "\n"), $($arg)*));
}
