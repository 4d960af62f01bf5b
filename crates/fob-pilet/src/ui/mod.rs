//! Terminal status output.
//!
//! Human-facing status lines for the dev server lifecycle. Diagnostic detail
//! goes through `tracing` instead.

mod messages;

pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR environment variables, falls back to
/// terminal capability detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Decide whether terminal output should carry ANSI colors.
///
/// `--no-color` always wins over environment detection.
pub fn colors_enabled(no_color: bool) -> bool {
    !no_color && should_use_color()
}
