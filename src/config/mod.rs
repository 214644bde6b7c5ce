//! Ambient configuration (§6, §10.2): a single plain-data record built
//! programmatically at startup and handed to every component. No file
//! or environment-variable loading happens in the core — that is the
//! peripheral's job, same division the teacher draws around
//! `CognitiveConfig`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::echobeats::EchobeatsConfig;
use crate::jobs::JobStoreConfig;
use crate::memory::MemoryConfig;
use crate::opponent::OpponentConfig;
use crate::wake::WakeConfig;

/// Top-level configuration record, mirroring §6's recognized options
/// plus nested sub-configs for the weighted concerns (memory, wake,
/// echobeats, jobs, opponent) each component already owns.
#[derive(Debug, Clone, Copy)]
pub struct EchoConfig {
    pub streams: StreamCount,
    pub buffer_capacity: usize,
    pub snapshot_interval: Duration,
    pub memory: MemoryConfig,
    pub wake: WakeConfig,
    pub echobeats: EchobeatsConfig,
    pub jobs: JobStoreConfig,
    pub opponent: OpponentConfig,
}

/// The spec fixes the stream count at exactly three; this type exists
/// so a config value can still be passed around and asserted on
/// without silently allowing 1, 2, or 4 to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCount(u8);

impl StreamCount {
    pub const THREE: Self = Self(3);

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for StreamCount {
    fn default() -> Self {
        Self::THREE
    }
}

impl EchoConfig {
    /// Human-scale timing: generous deadlines, large caps, the profile
    /// a long-running process uses in production.
    #[must_use]
    pub const fn human() -> Self {
        Self {
            streams: StreamCount::THREE,
            buffer_capacity: 10_000,
            snapshot_interval: Duration::from_secs(60),
            memory: MemoryConfig::human(),
            wake: WakeConfig::human(),
            echobeats: EchobeatsConfig::human(),
            jobs: JobStoreConfig::human(),
            opponent: OpponentConfig::human(),
        }
    }

    /// Low-latency profile for tests: small caps, millisecond
    /// deadlines, fast fatigue thresholds so wake/dream transitions
    /// can be exercised without waiting on real clocks.
    #[must_use]
    pub const fn fast_test() -> Self {
        Self {
            streams: StreamCount::THREE,
            buffer_capacity: 256,
            snapshot_interval: Duration::from_millis(200),
            memory: MemoryConfig::fast(),
            wake: WakeConfig::fast_test(),
            echobeats: EchobeatsConfig::fast_test(),
            jobs: JobStoreConfig::fast_test(),
            opponent: OpponentConfig::human(),
        }
    }
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self::human()
    }
}
