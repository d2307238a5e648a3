#![deny(missing_docs)]
//! Logging macros for the scene batch workspace.
//!
//! Every `scene_*` macro goes through the `log` facade and prefixes the line
//! with the current dispatch tick, so a log file reads as a timeline of the
//! run. Callers must depend on `log` themselves.

use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatch ticks processed so far. There is one coordinator per process,
/// and its task may hop between runtime threads, so this is process-wide.
static DISPATCH_TICK: AtomicU64 = AtomicU64::new(0);

/// Records the latest dispatch tick. Called by the coordinator on every
/// timer tick.
pub fn set_dispatch_tick(tick: u64) {
    DISPATCH_TICK.store(tick, Ordering::Relaxed);
}

/// The latest dispatch tick, 0 before the first one.
pub fn dispatch_tick() -> u64 {
    DISPATCH_TICK.load(Ordering::Relaxed)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __scene_log {
    ($level:expr, $($arg:tt)*) => {
        log::log!($level, "[t{}] {}", $crate::dispatch_tick(), format_args!($($arg)*))
    };
}

/// Trace-level line.
#[macro_export]
macro_rules! scene_trace {
    ($($arg:tt)*) => {
        $crate::__scene_log!(log::Level::Trace, $($arg)*)
    };
}

/// Debug-level line.
#[macro_export]
macro_rules! scene_debug {
    ($($arg:tt)*) => {
        $crate::__scene_log!(log::Level::Debug, $($arg)*)
    };
}

/// Info-level line.
#[macro_export]
macro_rules! scene_info {
    ($($arg:tt)*) => {
        $crate::__scene_log!(log::Level::Info, $($arg)*)
    };
}

/// Warn-level line.
#[macro_export]
macro_rules! scene_warn {
    ($($arg:tt)*) => {
        $crate::__scene_log!(log::Level::Warn, $($arg)*)
    };
}

/// Error-level line.
#[macro_export]
macro_rules! scene_error {
    ($($arg:tt)*) => {
        $crate::__scene_log!(log::Level::Error, $($arg)*)
    };
}

/// Installs a stderr logger for tests; a no-op when one is already set.
/// Stdout stays untouched because the host writes frames there.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}
