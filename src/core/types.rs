//! Core data model shared across the cognitive runtime
//!
//! These types are the vocabulary every component (C2-C10) speaks: the
//! three concurrent inference streams, the twelve-step cycle, the
//! inference request/response envelope, and the `Thought` a cycle produces.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the three concurrent cognitive streams.
///
/// Each stream has a fixed phase offset into the 12-step cycle and a fixed
/// triad of "home" steps: α:{1,5,9}, β:{2,6,10}, γ:{3,7,11}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamId {
    Alpha,
    Beta,
    Gamma,
}

impl StreamId {
    pub const ALL: [StreamId; 3] = [StreamId::Alpha, StreamId::Beta, StreamId::Gamma];

    /// Phase offset into the 12-step cycle (0, 4, 8).
    #[must_use]
    pub const fn phase_offset(self) -> u8 {
        match self {
            Self::Alpha => 0,
            Self::Beta => 4,
            Self::Gamma => 8,
        }
    }

    /// The stream's triad of home steps.
    #[must_use]
    pub const fn home_steps(self) -> [u8; 3] {
        match self {
            Self::Alpha => [1, 5, 9],
            Self::Beta => [2, 6, 10],
            Self::Gamma => [3, 7, 11],
        }
    }

    /// Index into a fixed-size `[T; 3]` slot array, stable across the crate.
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Alpha => 0,
            Self::Beta => 1,
            Self::Gamma => 2,
        }
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Alpha => write!(f, "alpha"),
            Self::Beta => write!(f, "beta"),
            Self::Gamma => write!(f, "gamma"),
        }
    }
}

/// The cognitive operation a step performs.
///
/// Derived from the step index by a total, non-injective function: steps 1
/// and 7 perform relevance realization, steps 2..6 perform affordance
/// interaction, and steps 8..12 perform salience simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepType {
    RelevanceRealization,
    AffordanceInteraction,
    SalienceSimulation,
}

/// Maps a 1-based step index (1..=12) to its `StepType`.
///
/// # Panics
///
/// Panics if `step` is outside `1..=12` — callers control step generation
/// internally and never pass an out-of-range value.
#[must_use]
pub fn step_type_of(step: u8) -> StepType {
    match step {
        1 | 7 => StepType::RelevanceRealization,
        2..=6 => StepType::AffordanceInteraction,
        8..=12 => StepType::SalienceSimulation,
        other => panic!("step index out of range 1..=12: {other}"),
    }
}

/// Unique identifier for a `Thought`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThoughtId(pub Uuid);

impl ThoughtId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ThoughtId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThoughtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of cognitive content a `Thought` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThoughtType {
    Perception,
    Reflection,
    MetaCognitive,
    Question,
    Insight,
    Plan,
    Memory,
    Imagination,
}

/// Where a `Thought` originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThoughtSource {
    External,
    Internal,
    Dream,
    Memory,
    Reasoning,
}

/// An assembled cognitive unit produced by a step execution.
///
/// Created in the scheduler (C6) or by the inference engine pool (C7), or
/// injected by an external event. Appended to the episodic buffer (C3) and,
/// if salient enough, copied into the hypergraph memory (C2) as a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub id: ThoughtId,
    pub content: String,
    pub thought_type: ThoughtType,
    pub timestamp: DateTime<Utc>,
    pub source: ThoughtSource,
    pub importance: f32,
    pub valence: f32,
    pub associations: HashSet<ThoughtId>,
}

impl Thought {
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        thought_type: ThoughtType,
        source: ThoughtSource,
        importance: f32,
        valence: f32,
    ) -> Self {
        Self {
            id: ThoughtId::new(),
            content: content.into(),
            thought_type,
            timestamp: Utc::now(),
            source,
            importance: importance.clamp(0.0, 1.0),
            valence: valence.clamp(-1.0, 1.0),
            associations: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_association(mut self, other: ThoughtId) -> Self {
        self.associations.insert(other);
        self
    }
}

/// A request dispatched to a stream's inference engine for one step.
///
/// Invariant: `(step, stream_id)` must be consistent with the stream's
/// phase, or `step` must be pivotal (1, 7, 12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub step: u8,
    pub step_type: StepType,
    pub stream_id: StreamId,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub metadata: HashMap<String, String>,
}

impl InferenceRequest {
    #[must_use]
    pub fn new(step: u8, stream_id: StreamId, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            step,
            step_type: step_type_of(step),
            stream_id,
            prompt: prompt.into(),
            max_tokens: max_tokens.max(1),
            temperature: 0.7,
            metadata: HashMap::new(),
        }
    }

    /// Whether `(step, stream_id)` is consistent with the schedule, or the
    /// step is pivotal. Delegates to the schedule table itself rather than
    /// a stream's home-step triad, since the round-robin rotation assigns
    /// streams to non-home steps too.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if matches!(self.step, 1 | 7 | 12) {
            return true;
        }
        crate::echobeats::streams_for_step(self.step).contains(&self.stream_id)
    }
}

/// A response returned by an inference engine for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub stream_id: StreamId,
    pub step: u8,
    pub output: String,
    pub tokens: Vec<i32>,
    pub latency_ms: u64,
    pub tokens_per_sec: f32,
    pub metadata: HashMap<String, String>,
}

impl InferenceResponse {
    #[must_use]
    pub fn from_request(
        request: &InferenceRequest,
        output: impl Into<String>,
        tokens: Vec<i32>,
        latency_ms: u64,
    ) -> Self {
        let tokens_per_sec = if latency_ms > 0 {
            (tokens.len() as f32) / (latency_ms as f32 / 1000.0)
        } else {
            0.0
        };
        Self {
            stream_id: request.stream_id,
            step: request.step,
            output: output.into(),
            tokens,
            latency_ms,
            tokens_per_sec,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_type_mapping_matches_spec() {
        let expected = [
            StepType::RelevanceRealization,
            StepType::AffordanceInteraction,
            StepType::AffordanceInteraction,
            StepType::AffordanceInteraction,
            StepType::AffordanceInteraction,
            StepType::AffordanceInteraction,
            StepType::RelevanceRealization,
            StepType::SalienceSimulation,
            StepType::SalienceSimulation,
            StepType::SalienceSimulation,
            StepType::SalienceSimulation,
            StepType::SalienceSimulation,
        ];
        for (i, expect) in expected.iter().enumerate() {
            let step = (i + 1) as u8;
            assert_eq!(step_type_of(step), *expect, "step {step}");
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn step_type_of_rejects_zero() {
        let _ = step_type_of(0);
    }

    #[test]
    fn stream_phase_offsets_and_home_steps() {
        assert_eq!(StreamId::Alpha.phase_offset(), 0);
        assert_eq!(StreamId::Beta.phase_offset(), 4);
        assert_eq!(StreamId::Gamma.phase_offset(), 8);

        assert_eq!(StreamId::Alpha.home_steps(), [1, 5, 9]);
        assert_eq!(StreamId::Beta.home_steps(), [2, 6, 10]);
        assert_eq!(StreamId::Gamma.home_steps(), [3, 7, 11]);
    }

    #[test]
    fn request_well_formed_at_pivots_and_home_steps() {
        let pivot = InferenceRequest::new(7, StreamId::Beta, "p", 10);
        assert!(pivot.is_well_formed());

        let home = InferenceRequest::new(2, StreamId::Beta, "p", 10);
        assert!(home.is_well_formed());

        let mismatched = InferenceRequest::new(2, StreamId::Alpha, "p", 10);
        assert!(!mismatched.is_well_formed());
    }

    #[test]
    fn response_inherits_stream_and_step_from_request() {
        let req = InferenceRequest::new(1, StreamId::Alpha, "p", 10);
        let resp = InferenceResponse::from_request(&req, "out", vec![1, 2, 3], 100);
        assert_eq!(resp.stream_id, req.stream_id);
        assert_eq!(resp.step, req.step);
        assert!((resp.tokens_per_sec - 30.0).abs() < 0.01);
    }

    #[test]
    fn thought_clamps_importance_and_valence() {
        let t = Thought::new("x", ThoughtType::Insight, ThoughtSource::Internal, 5.0, -5.0);
        assert!((t.importance - 1.0).abs() < f32::EPSILON);
        assert!((t.valence - (-1.0)).abs() < f32::EPSILON);
    }
}
