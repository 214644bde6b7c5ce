//! Episodic buffer (C3): a bounded ring of recent experiences feeding the
//! dream consolidator (C4).

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodicId(pub Uuid);

impl EpisodicId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EpisodicId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EpisodicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned exclusively by the buffer until consolidated, at which point C2
/// holds the authoritative node and the buffer keeps only the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicMemory {
    pub id: EpisodicId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub importance: f32,
    pub valence: f32,
    pub tags: HashSet<String>,
    pub consolidated: bool,
}

impl EpisodicMemory {
    #[must_use]
    pub fn new(content: impl Into<String>, importance: f32, valence: f32) -> Self {
        Self {
            id: EpisodicId::new(),
            content: content.into(),
            timestamp: Utc::now(),
            importance: importance.clamp(0.0, 1.0),
            valence: valence.clamp(-1.0, 1.0),
            tags: HashSet::new(),
            consolidated: false,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// A fixed-capacity ring buffer. `push` overwrites the oldest slot once
/// full; `drain` removes up to `k` oldest entries in FIFO order.
#[derive(Debug)]
pub struct EpisodicBuffer {
    capacity: usize,
    entries: VecDeque<EpisodicMemory>,
}

impl EpisodicBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, memory: EpisodicMemory) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(memory);
    }

    /// Removes up to `k` oldest entries and returns them FIFO-ordered.
    /// Postcondition: `len() == max(0, len_before - k)`.
    pub fn drain(&mut self, k: usize) -> Vec<EpisodicMemory> {
        let n = k.min(self.entries.len());
        self.entries.drain(0..n).collect()
    }

    pub fn view(&self) -> impl Iterator<Item = &EpisodicMemory> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EpisodicMemory> {
        self.entries.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
