//! Identity & Persistence (C9): a process-wide identity vector, updated
//! by every significant thought and checkpointed on dream completion and
//! on shutdown.

use serde::{Deserialize, Serialize};

use crate::core::types::Thought;

/// Emotional state carried on the identity record, mirroring the
/// valence/arousal pair used elsewhere in the runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmotionalState {
    pub valence: f32,
    pub arousal: f32,
}

impl EmotionalState {
    #[must_use]
    pub const fn neutral() -> Self {
        Self { valence: 0.0, arousal: 0.5 }
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Protected by a single writer; snapshot readers take a read lease
/// (modeled here as a plain `&Identity` borrow since C9 has exactly one
/// owning task, matching §5's concurrency model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub embedding: Vec<f32>,
    pub coherence: f32,
    pub iterations: u64,
    pub emotional_state: EmotionalState,
}

impl Identity {
    #[must_use]
    pub fn new(name: impl Into<String>, embedding_dim: usize) -> Self {
        Self {
            name: name.into(),
            embedding: vec![0.0; embedding_dim],
            coherence: 1.0,
            iterations: 0,
            emotional_state: EmotionalState::neutral(),
        }
    }

    /// Folds a significant thought into identity: nudges the embedding
    /// toward the thought's associations count (a cheap proxy absent a
    /// real embedding model), blends emotional state by valence, and
    /// counts the iteration.
    pub fn integrate(&mut self, thought: &Thought) {
        self.iterations += 1;
        let blend = 0.05;
        self.emotional_state.valence = self.emotional_state.valence * (1.0 - blend) + thought.valence * blend;
        self.coherence = (self.coherence * (1.0 - blend) + thought.importance * blend).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ThoughtSource, ThoughtType};

    #[test]
    fn integrate_increments_iterations_and_blends_state() {
        let mut identity = Identity::new("echobeats", 8);
        let thought = Thought::new("insight", ThoughtType::Insight, ThoughtSource::Internal, 1.0, 1.0);
        identity.integrate(&thought);
        assert_eq!(identity.iterations, 1);
        assert!(identity.emotional_state.valence > 0.0);
    }

    #[test]
    fn new_identity_has_full_coherence_and_zero_iterations() {
        let identity = Identity::new("echobeats", 16);
        assert_eq!(identity.embedding.len(), 16);
        assert!((identity.coherence - 1.0).abs() < f32::EPSILON);
        assert_eq!(identity.iterations, 0);
    }
}
