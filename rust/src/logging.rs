//! Logging macros for the planning run with verbosity level control.
//!
//! Output goes to stderr and costs nothing when disabled (verbosity=0).
//! - 0: SILENT
//! - 1: SUMMARY (stage counts, matched rules, critical path)
//! - 2: DECISIONS (per-task duration choices, per-task planned dates)
//! - 3: DEBUG (per-edge constraint values)

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_SUMMARY: u8 = 1;
pub const VERBOSITY_DECISIONS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at SUMMARY level (verbosity >= 1).
#[macro_export]
macro_rules! log_summary {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_SUMMARY {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DECISIONS level (verbosity >= 2).
///
/// Used for: which override row won, resolved task durations and dates.
#[macro_export]
macro_rules! log_decisions {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DECISIONS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}
