//! Shared data-model types (§3) used across component boundaries.

pub mod types;
