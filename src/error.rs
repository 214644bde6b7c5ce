//! Crate-level error aggregator.
//!
//! Components never swallow each other's error kinds silently; each one
//! exposes its own `thiserror`-derived enum (§7 taxonomy). `EchoError`
//! exists only for callers that cross component boundaries — the CLI and
//! `main`, not the components themselves.

use thiserror::Error;

use crate::dream::DreamError;
use crate::engine::EngineError;
use crate::jobs::JobStoreError;
use crate::memory::MemoryError;
use crate::snapshot::SnapshotError;
use crate::wake::WakeError;

#[derive(Debug, Error)]
pub enum EchoError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Dream(#[from] DreamError),
    #[error(transparent)]
    Wake(#[from] WakeError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    JobStore(#[from] JobStoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}
