#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! echobeats — a self-driving cognitive inference scheduler.
//!
//! A background process that runs an unbounded sequence of cognitive
//! cycles over a hypergraph memory, periodically consolidating via a
//! dream cycle, gated by a fatigue-driven wake/rest controller, with
//! durable job recovery and crash-safe snapshotting. See `SPEC_FULL.md`
//! for the full component breakdown (C1–C10).
//!
//! # Components
//!
//! - [`clock`] — cancellable, deadline-aware execution context (C1)
//! - [`memory`] — hypergraph working/long-term memory (C2)
//! - [`episodic`] — fixed-capacity ring buffer of recent thoughts (C3)
//! - [`dream`] — consolidation over the episodic buffer (C4)
//! - [`wake`] — fatigue accumulator gating the scheduler (C5)
//! - [`echobeats`] — the 12-step, 3-stream scheduler (C6)
//! - [`engine`] — inference engine pool, one per stream (C7)
//! - [`jobs`] — durable job store with crash recovery (C8)
//! - [`identity`] / [`snapshot`] — lifetime identity and snapshot I/O (C9)
//! - [`opponent`] — opponent-process regulator (C10)
//! - [`config`] — ambient configuration shared by every component
//! - [`resilience`] — panic hooks, crash logging, checkpoint scheduling
//! - [`error`] — crate-level error aggregation

pub mod clock;
pub mod config;
pub mod core;
pub mod memory;
pub mod episodic;
pub mod dream;
pub mod wake;
pub mod echobeats;
pub mod engine;
pub mod jobs;
pub mod identity;
pub mod opponent;
pub mod snapshot;
pub mod resilience;
pub mod error;
