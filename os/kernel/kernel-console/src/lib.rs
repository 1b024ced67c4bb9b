//! # Kernel Console and Logging
//!
//! Kernel diagnostics go through the [`log`] facade. This crate provides the
//! backend: [`ConsoleLogger`] formats each record as
//!
//! ```text
//! [LEVEL] target: message
//! ```
//!
//! and hands the line to the kernel console. The console writes to the host's
//! standard error, or into an in-memory buffer while output is being
//! captured (see [`console::capture`]).
//!
//! ```text
//! log::info!(...)             kprintf!(...)
//!        ↓                          │
//! ConsoleLogger (log::Log)          │
//!        ↓                          ↓
//!        └──────→ console::write_fmt ──→ stderr | capture buffer
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use kernel_console::ConsoleLogger;
//! use log::{LevelFilter, info};
//!
//! // A second installation fails; that is fine for tests.
//! let _ = ConsoleLogger::new(LevelFilter::Debug).init();
//! info!("coremap ready");
//! ```
//!
//! Each line is formatted completely before it is written under the console
//! lock, so lines from concurrent kernel threads never interleave.

mod logger;

pub use logger::ConsoleLogger;

pub mod console {
    use core::fmt::{self, Write};
    use kernel_sync::SpinMutex;
    use std::io::Write as _;

    enum Target {
        Stderr,
        Capture(String),
    }

    static CONSOLE: SpinMutex<Target> = SpinMutex::new(Target::Stderr);

    /// Writes formatted output to the console as one unit.
    pub fn write_fmt(args: fmt::Arguments<'_>) {
        let mut line = String::new();
        // Formatting into a String only fails if a Display impl does.
        if line.write_fmt(args).is_err() {
            return;
        }

        let mut console = CONSOLE.lock();
        match &mut *console {
            Target::Stderr => {
                // Best effort: there is nowhere to report a console failure.
                let _ = std::io::stderr().lock().write_all(line.as_bytes());
            }
            Target::Capture(buf) => buf.push_str(&line),
        }
    }

    /// Starts capturing console output in memory. Output written before the
    /// call is not included.
    pub fn capture() {
        *CONSOLE.lock() = Target::Capture(String::new());
    }

    /// Stops capturing and returns everything written since [`capture`].
    #[must_use]
    pub fn release() -> String {
        match core::mem::replace(&mut *CONSOLE.lock(), Target::Stderr) {
            Target::Capture(buf) => buf,
            Target::Stderr => String::new(),
        }
    }
}

/// Prints to the kernel console.
#[macro_export]
macro_rules! kprintf {
    ($($arg:tt)*) => {{
        $crate::console::write_fmt(::core::format_args!($($arg)*));
    }};
}
