//! Pure step→stream scheduling tables for the 12-step cycle.
//!
//! Kept separate from the scheduler's execution loop so the assignment
//! itself is trivially testable without an engine, a clock, or memory.

use crate::core::types::StreamId;

/// Which streams run at a given 1-based step index.
///
/// Steps 1 and 7 are pivots: step 1 runs alpha alone, step 7 runs all
/// three streams in parallel (the reference policy for the pivot case).
/// Steps 2..6 and 8..12 each run exactly one stream, round-robining.
///
/// # Panics
///
/// Panics if `step` is outside `1..=12`.
#[must_use]
pub fn streams_for_step(step: u8) -> Vec<StreamId> {
    use StreamId::{Alpha, Beta, Gamma};
    match step {
        1 => vec![Alpha],
        7 => vec![Alpha, Beta, Gamma],
        2 => vec![Beta],
        3 => vec![Gamma],
        4 => vec![Alpha],
        5 => vec![Beta],
        6 => vec![Gamma],
        8 => vec![Gamma],
        9 => vec![Alpha],
        10 => vec![Beta],
        11 => vec![Gamma],
        12 => vec![Alpha],
        other => panic!("step index out of range 1..=12: {other}"),
    }
}
