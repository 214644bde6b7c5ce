//! Checkpoint Module
//!
//! Decides *when* to persist a snapshot; actual persistence is
//! delegated to [`crate::snapshot::write_atomic`] and
//! [`crate::snapshot::load`], per the §6 `snapshotIntervalMs` config.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Configuration for checkpoint scheduling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Checkpoint after at least this many cycles since the last one.
    pub cycle_interval: u64,

    /// Checkpoint after at least this much wall-clock time since the
    /// last one, regardless of cycle count.
    pub time_interval: Duration,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            cycle_interval: 100,
            time_interval: Duration::from_secs(30),
        }
    }
}

/// Tracks when the last checkpoint happened and decides when the next
/// one is due. Does not perform I/O itself.
#[derive(Debug)]
pub struct CheckpointScheduler {
    config: CheckpointConfig,
    last_cycle: u64,
    last_checkpoint_at: Instant,
}

impl CheckpointScheduler {
    #[must_use]
    pub fn new(config: CheckpointConfig) -> Self {
        Self { config, last_cycle: 0, last_checkpoint_at: Instant::now() }
    }

    /// Returns true if a checkpoint is due given the current cycle
    /// count, either because enough cycles have elapsed or enough
    /// wall-clock time has passed since the last one.
    #[must_use]
    pub fn is_due(&self, current_cycle: u64) -> bool {
        let cycles_elapsed = current_cycle.saturating_sub(self.last_cycle);
        cycles_elapsed >= self.config.cycle_interval
            || self.last_checkpoint_at.elapsed() >= self.config.time_interval
    }

    /// Records that a checkpoint was just taken at `current_cycle`.
    pub fn record_checkpoint(&mut self, current_cycle: u64) {
        self.last_cycle = current_cycle;
        self.last_checkpoint_at = Instant::now();
    }
}
