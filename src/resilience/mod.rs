//! Resilience: panic hooks, crash logging, and checkpoint scheduling.
//!
//! Echobeats runs headless with no terminal state to restore, so the
//! panic hook's only job is to log the crash and hand off to the
//! default (color_eyre) reporter.

pub mod crash_log;
pub mod checkpoint;
pub mod supervisor;

use std::panic;

/// Install panic hooks for crash reporting.
///
/// # What it does
///
/// 1. Installs `color_eyre` for pretty panic reports.
/// 2. Wraps the default hook so every panic is also logged to
///    `logs/panic_*.json` for post-mortem analysis.
pub fn install_panic_hooks() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = crash_log::log_panic(panic_info) {
            eprintln!("failed to log crash: {e}");
        }

        eprintln!();
        eprintln!("=== echobeats crashed ===");
        eprintln!("crash details logged under logs/");
        eprintln!();

        default_hook(panic_info);
    }));

    Ok(())
}
