//! Pattern and Wisdom: the artifacts a dream cycle produces.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::episodic::EpisodicId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WisdomId(pub Uuid);

impl WisdomId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WisdomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WisdomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Created by the consolidator only; immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub description: String,
    pub frequency: u32,
    pub strength: f32,
    pub created_at: DateTime<Utc>,
    pub source_episodes: HashSet<EpisodicId>,
}

impl Pattern {
    #[must_use]
    pub fn new(description: impl Into<String>, frequency: u32, strength: f32, source_episodes: HashSet<EpisodicId>) -> Self {
        Self {
            id: PatternId::new(),
            description: description.into(),
            frequency,
            strength: strength.clamp(0.0, 1.0),
            created_at: Utc::now(),
            source_episodes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wisdom {
    pub id: WisdomId,
    pub insight: String,
    pub source_patterns: HashSet<PatternId>,
    pub depth: f32,
    pub applicability: f32,
    pub created_at: DateTime<Utc>,
}

impl Wisdom {
    /// # Panics
    ///
    /// Panics if `source_patterns` is empty — a `Wisdom` without a source
    /// pattern cannot be constructed.
    #[must_use]
    pub fn new(insight: impl Into<String>, source_patterns: HashSet<PatternId>, depth: f32, applicability: f32) -> Self {
        assert!(!source_patterns.is_empty(), "wisdom requires at least one source pattern");
        Self {
            id: WisdomId::new(),
            insight: insight.into(),
            source_patterns,
            depth: depth.clamp(0.0, 1.0),
            applicability: applicability.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DreamError {
    #[error("consolidation blocked: memory store could not accept new nodes")]
    ConsolidationBlocked,
}

/// Summary of one completed (or early-aborted) dream cycle.
#[derive(Debug, Clone, Default)]
pub struct DreamReport {
    pub episodes_decayed: usize,
    pub episodes_strengthened: usize,
    pub episodes_consolidated: usize,
    pub patterns_created: usize,
    pub wisdom_created: usize,
    pub aborted: bool,
}
